//! Blends the CSV-derived GPA with user ratings.
//!
//! User ratings are on a 1–5 scale and are mapped onto the 0–4 GPA scale. The
//! CSV side keeps at least [`MIN_CSV_WEIGHT`] of the influence no matter how
//! many reviews arrive.

/// Lower bound of the CSV share in a blended score.
pub const MIN_CSV_WEIGHT: f64 = 0.3;

/// How quickly each review shifts weight away from the CSV GPA.
const REVIEW_DECAY: f64 = 0.1;

/// A usable user-rating sample: a mean over at least one review.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserRating {
    pub mean: f64,
    pub count: u64,
}

/// Maps a 1–5 star rating onto the 0–4 GPA scale.
pub fn normalize_rating(mean: f64) -> f64 {
    ((mean - 1.0) / 4.0) * 4.0
}

/// Share of the blended score that comes from the CSV GPA.
///
/// 1.0 with no reviews, falling toward [`MIN_CSV_WEIGHT`] as reviews grow.
pub fn csv_weight(review_count: u64) -> f64 {
    (1.0 / (1.0 + review_count as f64 * REVIEW_DECAY)).max(MIN_CSV_WEIGHT)
}

/// Produces the exposed score from whichever sources are present.
///
/// The result keeps full precision.
pub fn fuse(csv_gpa: Option<f64>, rating: Option<UserRating>) -> Option<f64> {
    match (csv_gpa, rating) {
        (None, None) => None,
        (Some(gpa), None) => Some(gpa),
        (None, Some(rating)) => Some(normalize_rating(rating.mean)),
        (Some(gpa), Some(rating)) => {
            let weight = csv_weight(rating.count);
            Some(weight * gpa + (1.0 - weight) * normalize_rating(rating.mean))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::utility::round_to;

    fn rating(mean: f64, count: u64) -> Option<UserRating> {
        Some(UserRating { mean, count })
    }

    #[test]
    fn test_fuse_without_any_source() {
        assert_eq!(fuse(None, None), None);
    }

    #[test]
    fn test_fuse_csv_only() {
        assert_eq!(fuse(Some(3.5), None), Some(3.5));
    }

    #[test]
    fn test_fuse_ratings_only_are_normalized() {
        assert_eq!(fuse(None, rating(5.0, 3)), Some(4.0));
        assert_eq!(fuse(None, rating(1.0, 3)), Some(0.0));
        assert_eq!(fuse(None, rating(4.0, 1)), Some(3.0));
    }

    #[test]
    fn test_fuse_many_reviews_hits_floor() {
        let blended = fuse(Some(3.5), rating(4.0, 50)).unwrap();
        assert_eq!(round_to(blended, 2), 3.15);
    }

    #[test]
    fn test_fuse_few_reviews() {
        // csv_weight(10) = 0.5
        let blended = fuse(Some(2.0), rating(5.0, 10)).unwrap();
        assert!((blended - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_csv_weight_boundaries() {
        assert_eq!(csv_weight(0), 1.0);
        assert_eq!(csv_weight(10), 0.5);
        assert_eq!(csv_weight(50), MIN_CSV_WEIGHT);
        assert_eq!(csv_weight(u64::MAX), MIN_CSV_WEIGHT);
    }

    #[test]
    fn test_csv_weight_floor_and_monotonic() {
        let mut previous = csv_weight(0);
        for n in 1..500 {
            let w = csv_weight(n);
            assert!(w >= MIN_CSV_WEIGHT);
            assert!(w <= previous);
            previous = w;
        }
    }
}
