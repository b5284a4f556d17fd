use crate::analyzers::grade::calculate_gpa;
use crate::analyzers::types::{Entity, EntityKind, EntityTable};
use crate::analyzers::utility::{parse_count, pct, round_to};
use crate::parser::Row;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Column names in the cleaned grade exports.
pub mod columns {
    pub const FULL_NAME: &str = "FULL_NAME";
    pub const SUBJECT: &str = "SUBJECT";
    pub const CATALOG_NBR: &str = "CATALOG_NBR";
    pub const DESCR: &str = "DESCR";
    pub const INSTRUCTOR: &str = "HR_NAME";
    pub const GRADE: &str = "CRSE_GRADE_OFF";
    pub const HEADCOUNT: &str = "GRADE_HDCNT";
}

use columns::*;

/// Chooses which entity a row belongs to and what it is related to.
pub trait Grouping {
    fn kind(&self) -> EntityKind;

    /// Identity of the entity the row is counted toward.
    fn key(&self, row: &Row) -> Option<String>;

    /// Identity of the entity on the other side (instructor of a course,
    /// course of an instructor).
    fn related(&self, row: &Row) -> Option<String>;
}

/// Groups rows into courses, relating each course to its instructors.
pub struct ByCourse;

/// Groups rows into professors, relating each professor to their courses.
pub struct ByProfessor;

/// Course identity: `FULL_NAME`, or `"{SUBJECT} {CATALOG_NBR}"` when that is
/// blank.
pub fn course_key(row: &Row) -> Option<String> {
    if let Some(full_name) = row.non_empty(FULL_NAME) {
        return Some(full_name.to_string());
    }

    match (row.non_empty(SUBJECT), row.non_empty(CATALOG_NBR)) {
        (Some(subject), Some(catalog)) => Some(format!("{subject} {catalog}")),
        _ => None,
    }
}

fn instructor_key(row: &Row) -> Option<String> {
    row.non_empty(INSTRUCTOR).map(str::to_string)
}

impl Grouping for ByCourse {
    fn kind(&self) -> EntityKind {
        EntityKind::Course
    }

    fn key(&self, row: &Row) -> Option<String> {
        course_key(row)
    }

    fn related(&self, row: &Row) -> Option<String> {
        instructor_key(row)
    }
}

impl Grouping for ByProfessor {
    fn kind(&self) -> EntityKind {
        EntityKind::Professor
    }

    fn key(&self, row: &Row) -> Option<String> {
        instructor_key(row)
    }

    fn related(&self, row: &Row) -> Option<String> {
        course_key(row)
    }
}

/// Running totals for one entity while rows are folded in.
struct Accumulator {
    id: String,
    subject: String,
    catalog_number: String,
    description: String,
    total_students: u64,
    grade_distribution: BTreeMap<String, u64>,
    related: HashSet<String>,
}

impl Accumulator {
    fn from_first_row(id: String, row: &Row) -> Self {
        let text = |column: &str| row.get(column).unwrap_or_default().to_string();

        Self {
            id,
            subject: text(SUBJECT),
            catalog_number: text(CATALOG_NBR),
            description: text(DESCR),
            total_students: 0,
            grade_distribution: BTreeMap::new(),
            related: HashSet::new(),
        }
    }

    fn add(&mut self, grade: &str, count: u64, related: Option<String>) {
        self.total_students += count;
        *self.grade_distribution.entry(grade.to_string()).or_default() += count;
        if let Some(related) = related {
            self.related.insert(related);
        }
    }

    fn finalize(self, kind: EntityKind) -> Entity {
        let grade_percentages = self
            .grade_distribution
            .iter()
            .map(|(grade, &count)| {
                (grade.clone(), round_to(pct(count, self.total_students), 1))
            })
            .collect();

        let csv_average_gpa = calculate_gpa(&self.grade_distribution);

        let mut related: Vec<String> = self.related.into_iter().collect();
        related.sort();

        Entity {
            id: self.id,
            kind,
            subject: self.subject,
            catalog_number: self.catalog_number,
            description: self.description,
            total_students: self.total_students,
            grade_distribution: self.grade_distribution,
            grade_percentages,
            csv_average_gpa,
            average_gpa: csv_average_gpa,
            related,
        }
    }
}

/// Folds grade rows into an [`EntityTable`] keyed by `grouping`.
///
/// Rows without a key, without a grade, or with a zero headcount are skipped.
/// Metadata comes from the first row seen for each entity.
#[tracing::instrument(skip_all, fields(kind = %grouping.kind(), rows = rows.len()))]
pub fn aggregate<G: Grouping>(grouping: &G, rows: &[Row]) -> EntityTable {
    let mut order: Vec<Accumulator> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut skipped = 0usize;

    for row in rows {
        let key = grouping.key(row);
        let grade = row.non_empty(GRADE);
        let count = row.get(HEADCOUNT).map(parse_count).unwrap_or(0);

        let (Some(key), Some(grade)) = (key, grade) else {
            skipped += 1;
            continue;
        };
        if count == 0 {
            skipped += 1;
            continue;
        }

        let position = match positions.get(&key) {
            Some(&i) => i,
            None => {
                positions.insert(key.clone(), order.len());
                order.push(Accumulator::from_first_row(key, row));
                order.len() - 1
            }
        };

        order[position].add(grade, count, grouping.related(row));
    }

    let kind = grouping.kind();
    let entities: Vec<Entity> = order.into_iter().map(|acc| acc.finalize(kind)).collect();

    debug!(entities = entities.len(), skipped, "Aggregation finished");

    EntityTable::new(entities)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().copied().collect()
    }

    fn scenario_rows() -> Vec<Row> {
        vec![
            row(&[
                (FULL_NAME, "CSCI 1001"),
                (GRADE, "A"),
                (HEADCOUNT, "10"),
                (INSTRUCTOR, "Smith"),
            ]),
            row(&[(FULL_NAME, "CSCI 1001"), (GRADE, "B"), (HEADCOUNT, "10")]),
        ]
    }

    #[test]
    fn test_course_scenario_accumulates() {
        let table = aggregate(&ByCourse, &scenario_rows());

        assert_eq!(table.len(), 1);
        let course = table.get("CSCI 1001").unwrap();
        assert_eq!(course.kind, EntityKind::Course);
        assert_eq!(course.total_students, 20);
        assert_eq!(course.grade_distribution.get("A"), Some(&10));
        assert_eq!(course.grade_distribution.get("B"), Some(&10));
        assert_eq!(course.grade_percentages.get("A"), Some(&50.0));
        assert!((course.csv_average_gpa.unwrap() - 3.5).abs() < 1e-9);
        assert_eq!(course.average_gpa, course.csv_average_gpa);
        assert_eq!(course.related, vec!["Smith"]);
    }

    #[test]
    fn test_skips_rows_without_signal() {
        let rows = vec![
            row(&[(FULL_NAME, "CSCI 1001"), (GRADE, "A"), (HEADCOUNT, "abc")]),
            row(&[(FULL_NAME, "CSCI 1001"), (GRADE, ""), (HEADCOUNT, "4")]),
            row(&[(FULL_NAME, ""), (GRADE, "A"), (HEADCOUNT, "4")]),
            row(&[(FULL_NAME, "CSCI 1001"), (GRADE, "A"), (HEADCOUNT, "0")]),
            row(&[(FULL_NAME, "CSCI 1001"), (GRADE, "A")]),
        ];

        assert!(aggregate(&ByCourse, &rows).is_empty());
    }

    #[test]
    fn test_course_key_falls_back_to_subject_and_catalog() {
        let r = row(&[(FULL_NAME, ""), (SUBJECT, "MATH"), (CATALOG_NBR, "1271")]);
        assert_eq!(course_key(&r), Some("MATH 1271".to_string()));

        let r = row(&[(SUBJECT, "MATH")]);
        assert_eq!(course_key(&r), None);
    }

    #[test]
    fn test_unrecognized_grades_count_toward_totals_only() {
        let rows = vec![
            row(&[(FULL_NAME, "CSCI 1001"), (GRADE, "A"), (HEADCOUNT, "3")]),
            row(&[(FULL_NAME, "CSCI 1001"), (GRADE, "W"), (HEADCOUNT, "1")]),
        ];
        let course = aggregate(&ByCourse, &rows).get("CSCI 1001").cloned().unwrap();

        assert_eq!(course.total_students, 4);
        assert_eq!(course.grade_percentages.get("A"), Some(&75.0));
        assert_eq!(course.grade_percentages.get("W"), Some(&25.0));
        assert_eq!(course.csv_average_gpa, Some(4.0));
    }

    #[test]
    fn test_only_unrecognized_grades_leaves_gpa_absent() {
        let rows = vec![row(&[(FULL_NAME, "CSCI 1001"), (GRADE, "S"), (HEADCOUNT, "8")])];
        let course = aggregate(&ByCourse, &rows).get("CSCI 1001").cloned().unwrap();

        assert_eq!(course.total_students, 8);
        assert_eq!(course.csv_average_gpa, None);
        assert_eq!(course.average_gpa, None);
    }

    #[test]
    fn test_metadata_comes_from_first_row() {
        let rows = vec![
            row(&[
                (FULL_NAME, "CSCI 1001"),
                (SUBJECT, "CSCI"),
                (DESCR, "Intro"),
                (GRADE, "A"),
                (HEADCOUNT, "1"),
            ]),
            row(&[
                (FULL_NAME, "CSCI 1001"),
                (SUBJECT, "XXXX"),
                (DESCR, "Renamed"),
                (GRADE, "A"),
                (HEADCOUNT, "1"),
            ]),
        ];
        let course = aggregate(&ByCourse, &rows).get("CSCI 1001").cloned().unwrap();

        assert_eq!(course.subject, "CSCI");
        assert_eq!(course.description, "Intro");
        assert_eq!(course.total_students, 2);
    }

    #[test]
    fn test_professor_grouping_relates_courses() {
        let rows = vec![
            row(&[(FULL_NAME, "CSCI 2041"), (INSTRUCTOR, "Smith"), (GRADE, "B"), (HEADCOUNT, "5")]),
            row(&[(FULL_NAME, "CSCI 1001"), (INSTRUCTOR, "Smith"), (GRADE, "A"), (HEADCOUNT, "5")]),
            row(&[(FULL_NAME, "CSCI 1001"), (INSTRUCTOR, "Smith"), (GRADE, "C"), (HEADCOUNT, "2")]),
            row(&[(FULL_NAME, "CSCI 1001"), (INSTRUCTOR, ""), (GRADE, "A"), (HEADCOUNT, "9")]),
        ];
        let table = aggregate(&ByProfessor, &rows);

        assert_eq!(table.len(), 1);
        let smith = table.get("Smith").unwrap();
        assert_eq!(smith.kind, EntityKind::Professor);
        assert_eq!(smith.total_students, 12);
        assert_eq!(smith.related, vec!["CSCI 1001", "CSCI 2041"]);
    }

    #[test]
    fn test_preserves_first_seen_order() {
        let rows = vec![
            row(&[(FULL_NAME, "STAT 3011"), (GRADE, "A"), (HEADCOUNT, "1")]),
            row(&[(FULL_NAME, "ACCT 2050"), (GRADE, "A"), (HEADCOUNT, "1")]),
            row(&[(FULL_NAME, "STAT 3011"), (GRADE, "B"), (HEADCOUNT, "1")]),
        ];
        let ids: Vec<_> = aggregate(&ByCourse, &rows).iter().map(|e| e.id.clone()).collect();

        assert_eq!(ids, vec!["STAT 3011", "ACCT 2050"]);
    }

    #[test]
    fn test_totals_match_distribution_and_percentages_sum() {
        let rows = vec![
            row(&[(FULL_NAME, "CSCI 1001"), (GRADE, "A"), (HEADCOUNT, "1")]),
            row(&[(FULL_NAME, "CSCI 1001"), (GRADE, "B"), (HEADCOUNT, "1")]),
            row(&[(FULL_NAME, "CSCI 1001"), (GRADE, "C"), (HEADCOUNT, "1")]),
        ];
        let course = aggregate(&ByCourse, &rows).get("CSCI 1001").cloned().unwrap();

        let sum: u64 = course.grade_distribution.values().sum();
        assert_eq!(course.total_students, sum);

        let pct_sum: f64 = course.grade_percentages.values().sum();
        let tolerance = 0.1 * course.grade_percentages.len() as f64;
        assert!((pct_sum - 100.0).abs() <= tolerance);
    }
}
