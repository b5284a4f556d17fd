//! Trait and types for looking up user ratings of courses and professors.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::analyzers::fusion::UserRating;
use crate::analyzers::types::EntityKind;

/// Aggregate of user reviews for one entity, as reported by a rating source.
///
/// `mean_rating` is on the 1–5 scale and is `None` when nobody has reviewed
/// the entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingSample {
    pub mean_rating: Option<f64>,
    #[serde(default)]
    pub review_count: u64,
}

impl RatingSample {
    /// Returns the sample as a fusion input, or `None` when it has no mean or
    /// no reviews behind it.
    pub fn usable(&self) -> Option<UserRating> {
        match self.mean_rating {
            Some(mean) if self.review_count > 0 && mean.is_finite() => Some(UserRating {
                mean,
                count: self.review_count,
            }),
            _ => None,
        }
    }
}

/// Abstraction over the store holding user reviews.
#[async_trait::async_trait]
pub trait RatingSource: Send + Sync {
    /// Returns the review aggregate for `target_id` of the given kind.
    async fn rating_sample(&self, kind: EntityKind, target_id: &str) -> Result<RatingSample>;
}

/// Rating source with no reviews at all; every entity scores from CSV only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRatings;

#[async_trait::async_trait]
impl RatingSource for NoRatings {
    async fn rating_sample(&self, _kind: EntityKind, _target_id: &str) -> Result<RatingSample> {
        Ok(RatingSample::default())
    }
}
