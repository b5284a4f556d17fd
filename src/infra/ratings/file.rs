use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::analyzers::types::EntityKind;
use crate::services::rating_source::{RatingSample, RatingSource};

/// Rating samples read once from a JSON file.
///
/// ```json
/// {
///   "course":    { "CSCI 1001": { "mean_rating": 4.2, "review_count": 12 } },
///   "professor": { "Smith, Ann": { "mean_rating": 3.8, "review_count": 4 } }
/// }
/// ```
///
/// Entities missing from the file have no reviews.
#[derive(Debug, Default, Deserialize)]
pub struct RatingFile {
    #[serde(default)]
    course: HashMap<String, RatingSample>,
    #[serde(default)]
    professor: HashMap<String, RatingSample>,
}

impl RatingFile {
    /// Loads samples from the JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rating file {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    fn entries(&self, kind: EntityKind) -> &HashMap<String, RatingSample> {
        match kind {
            EntityKind::Course => &self.course,
            EntityKind::Professor => &self.professor,
        }
    }
}

#[async_trait::async_trait]
impl RatingSource for RatingFile {
    async fn rating_sample(&self, kind: EntityKind, target_id: &str) -> Result<RatingSample> {
        Ok(self
            .entries(kind)
            .get(target_id)
            .copied()
            .unwrap_or_default())
    }
}
