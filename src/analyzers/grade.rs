use std::collections::BTreeMap;

/// Grade points for every letter grade that counts toward a GPA.
///
/// | Grade | Points |
/// |-------|--------|
/// | A     | 4.00   |
/// | A-    | 3.67   |
/// | B+    | 3.33   |
/// | B     | 3.00   |
/// | B-    | 2.67   |
/// | C+    | 2.33   |
/// | C     | 2.00   |
/// | C-    | 1.67   |
/// | D+    | 1.33   |
/// | D     | 1.00   |
/// | F     | 0.00   |
static GRADE_POINTS: &[(&str, f64)] = &[
    ("A", 4.0),
    ("A-", 3.67),
    ("B+", 3.33),
    ("B", 3.0),
    ("B-", 2.67),
    ("C+", 2.33),
    ("C", 2.0),
    ("C-", 1.67),
    ("D+", 1.33),
    ("D", 1.0),
    ("F", 0.0),
];

/// Returns the grade points for `grade`, or `None` for marks such as `W`,
/// `I`, `S` or `N` that carry no points.
pub fn grade_points(grade: &str) -> Option<f64> {
    GRADE_POINTS
        .iter()
        .find(|(letter, _)| *letter == grade)
        .map(|(_, points)| *points)
}

/// Computes the GPA of a grade distribution.
///
/// Only students holding a letter grade with points are counted, in both the
/// numerator and the denominator. Returns `None` when there are none.
pub fn calculate_gpa(distribution: &BTreeMap<String, u64>) -> Option<f64> {
    let mut total_points = 0.0;
    let mut counted = 0u64;

    for (grade, &count) in distribution {
        if let Some(points) = grade_points(grade) {
            total_points += points * count as f64;
            counted += count;
        }
    }

    if counted == 0 {
        None
    } else {
        Some(total_points / counted as f64)
    }
}
