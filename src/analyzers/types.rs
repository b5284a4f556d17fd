//! Data types used by the aggregation pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::analyzers::utility::round_to;

/// Which side of the grade data an entity is grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Course,
    Professor,
}

impl EntityKind {
    /// Discriminator used by the reviews store (`review_type` column).
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Course => "course",
            EntityKind::Professor => "professor",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finalized course or professor aggregate.
///
/// `csv_average_gpa` keeps full precision; rounding happens when the entity is
/// turned into a summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub id: String,
    pub kind: EntityKind,
    pub subject: String,
    pub catalog_number: String,
    pub description: String,
    pub total_students: u64,
    pub grade_distribution: BTreeMap<String, u64>,
    pub grade_percentages: BTreeMap<String, f64>,
    pub csv_average_gpa: Option<f64>,
    pub average_gpa: Option<f64>,
    /// Instructors of a course, or courses taught by a professor. Sorted.
    pub related: Vec<String>,
}

impl Entity {
    /// Builds the consumer-facing summary, carrying the table's own score.
    pub fn summary(&self) -> EntitySummary {
        EntitySummary {
            id: self.id.clone(),
            subject: self.subject.clone(),
            catalog_number: self.catalog_number.clone(),
            description: self.description.clone(),
            total_students: self.total_students,
            average_gpa: self.average_gpa.map(|gpa| round_to(gpa, 2)),
            related: self.related.clone(),
        }
    }

    /// Builds the detail view around an already enriched summary.
    pub fn detail(&self, summary: EntitySummary) -> EntityDetail {
        EntityDetail {
            summary,
            grade_distribution: self.grade_distribution.clone(),
            grade_percentages: self.grade_percentages.clone(),
            csv_average_gpa: self.csv_average_gpa.map(|gpa| round_to(gpa, 2)),
        }
    }
}

/// Search and listing result for one entity.
///
/// `average_gpa` is `None` when the entity has neither a recognized grade nor
/// any user ratings; callers show it as "not yet rated".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySummary {
    pub id: String,
    pub subject: String,
    pub catalog_number: String,
    pub description: String,
    pub total_students: u64,
    pub average_gpa: Option<f64>,
    pub related: Vec<String>,
}

/// Single-entity lookup result: the enriched summary plus the grade breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityDetail {
    #[serde(flatten)]
    pub summary: EntitySummary,
    pub grade_distribution: BTreeMap<String, u64>,
    pub grade_percentages: BTreeMap<String, f64>,
    pub csv_average_gpa: Option<f64>,
}

/// Entities of one kind in first-seen order, indexed by id.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityTable {
    entities: Vec<Entity>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl EntityTable {
    pub fn new(entities: Vec<Entity>) -> Self {
        let index = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
        Self { entities, index }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Looks up an entity by id: exact match first, then case-insensitive.
    pub fn get(&self, id: &str) -> Option<&Entity> {
        if let Some(&i) = self.index.get(id) {
            return Some(&self.entities[i]);
        }

        let wanted = id.to_lowercase();
        self.entities.iter().find(|e| e.id.to_lowercase() == wanted)
    }
}

/// Both entity tables from one aggregation pass.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub built_at: DateTime<Utc>,
    pub courses: EntityTable,
    pub professors: EntityTable,
}

impl Snapshot {
    pub fn table(&self, kind: EntityKind) -> &EntityTable {
        match kind {
            EntityKind::Course => &self.courses,
            EntityKind::Professor => &self.professors,
        }
    }
}
