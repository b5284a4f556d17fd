use grade_rater::analyzers::analyzer::build_snapshot;
use grade_rater::analyzers::types::EntityKind;
use grade_rater::catalog::{Catalog, default_max_age};
use grade_rater::infra::ratings::{RatingFile, SqlRatingStore};
use grade_rater::query::{QueryService, SearchFilters};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/class_data")
}

fn rating_file() -> RatingFile {
    RatingFile::load(&Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/ratings.json"))
        .expect("Failed to load rating fixture")
}

async fn fixture_service(ratings: Arc<dyn grade_rater::services::RatingSource>) -> QueryService {
    let catalog = Arc::new(Catalog::new(fixture_dir(), default_max_age()));
    catalog.ensure_fresh().await.expect("Failed to build fixtures");
    QueryService::new(catalog, ratings, 3)
}

#[test]
fn test_full_pipeline() {
    let snapshot = build_snapshot(&fixture_dir()).expect("Failed to aggregate fixtures");

    let course_ids: Vec<_> = snapshot.courses.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(
        course_ids,
        vec!["CSCI 1001", "CSCI 2041", "MATH 1271", "STAT 3011", "MATH 1272"]
    );

    // Combined export is skipped, so CSCI 1001 is only counted once.
    let intro = snapshot.courses.get("CSCI 1001").unwrap();
    assert_eq!(intro.total_students, 32);
    assert_eq!(intro.description, "Introduction to the Computing World");
    assert_eq!(intro.related, vec!["Nguyen, Bao", "Smith, Ann"]);
    assert_eq!(intro.grade_percentages.get("A"), Some(&46.9));
    assert_eq!(intro.grade_percentages.get("W"), Some(&6.3));
    assert!((intro.csv_average_gpa.unwrap() - 3.0).abs() < 1e-9);

    let stats = snapshot.courses.get("STAT 3011").unwrap();
    assert_eq!(stats.description, "Introduction to Statistics, Part 1");

    let calc = snapshot.courses.get("MATH 1271").unwrap();
    assert_eq!(calc.total_students, 40);
    assert_eq!(calc.csv_average_gpa, None);

    let calc2 = snapshot.courses.get("MATH 1272").unwrap();
    assert_eq!(calc2.subject, "MATH");
    assert_eq!(calc2.catalog_number, "1272");

    let professor_ids: Vec<_> = snapshot.professors.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(professor_ids, vec!["Smith, Ann", "Nguyen, Bao", "Okafor, Chidi"]);
    assert_eq!(
        snapshot.professors.get("Okafor, Chidi").unwrap().related,
        vec!["MATH 1271", "MATH 1272"]
    );
}

#[test]
fn test_entity_invariants_hold() {
    let snapshot = build_snapshot(&fixture_dir()).unwrap();

    for entity in snapshot.courses.iter().chain(snapshot.professors.iter()) {
        let sum: u64 = entity.grade_distribution.values().sum();
        assert_eq!(entity.total_students, sum, "{}", entity.id);

        if let Some(gpa) = entity.csv_average_gpa {
            assert!((0.0..=4.0).contains(&gpa), "{} has gpa {}", entity.id, gpa);
        }

        let pct_sum: f64 = entity.grade_percentages.values().sum();
        let tolerance = 0.1 * entity.grade_percentages.len() as f64;
        assert!(
            (pct_sum - 100.0).abs() <= tolerance + 1e-9,
            "{} percentages sum to {}",
            entity.id,
            pct_sum
        );
    }
}

#[test]
fn test_aggregation_is_idempotent() {
    let first = build_snapshot(&fixture_dir()).unwrap();
    let second = build_snapshot(&fixture_dir()).unwrap();

    assert_eq!(
        serde_json::to_string(&first.courses).unwrap(),
        serde_json::to_string(&second.courses).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&first.professors).unwrap(),
        serde_json::to_string(&second.professors).unwrap()
    );
}

#[tokio::test]
async fn test_queries_blend_file_ratings() {
    let service = fixture_service(Arc::new(rating_file())).await;

    let results = service
        .search(EntityKind::Course, "csci", &SearchFilters::default())
        .await;
    let scores: Vec<_> = results
        .iter()
        .map(|r| (r.id.as_str(), r.average_gpa))
        .collect();
    assert_eq!(
        scores,
        vec![("CSCI 1001", Some(3.7)), ("CSCI 2041", Some(3.22))]
    );

    let calc = service
        .get_one(EntityKind::Course, "math 1271")
        .await
        .unwrap();
    assert_eq!(calc.summary.average_gpa, Some(4.0));

    let smith = service
        .get_one(EntityKind::Professor, "smith, ann")
        .await
        .unwrap();
    assert_eq!(smith.summary.average_gpa, Some(2.23));
    assert_eq!(smith.csv_average_gpa, Some(3.46));
}

#[tokio::test]
async fn test_list_and_filter() {
    let service = fixture_service(Arc::new(rating_file())).await;

    let all: Vec<_> = service
        .list_all(EntityKind::Course)
        .await
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(
        all,
        vec!["CSCI 1001", "CSCI 2041", "MATH 1271", "MATH 1272", "STAT 3011"]
    );

    let filters = SearchFilters {
        related: Some("math".to_string()),
    };
    let professors = service
        .search(EntityKind::Professor, "", &filters)
        .await;
    assert_eq!(professors.len(), 1);
    assert_eq!(professors[0].id, "Okafor, Chidi");
    assert_eq!(professors[0].average_gpa, Some(2.67));
}

#[tokio::test]
async fn test_sql_ratings_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("reviews.db").display());

    let store = SqlRatingStore::connect(&url).await.unwrap();
    store.ensure_schema().await.unwrap();

    let pool = sqlx::SqlitePool::connect(&url).await.unwrap();
    for _ in 0..8 {
        sqlx::query("INSERT INTO reviews (review_type, target_id, rating) VALUES (?, ?, ?)")
            .bind("course")
            .bind("STAT 3011")
            .bind(5)
            .execute(&pool)
            .await
            .unwrap();
    }

    let service = fixture_service(Arc::new(store)).await;
    let stats = service
        .get_one(EntityKind::Course, "STAT 3011")
        .await
        .unwrap();

    // csv_weight(8) = 1 / 1.8, blended with a normalized 4.0
    assert_eq!(stats.summary.average_gpa, Some(3.63));
    assert_eq!(stats.csv_average_gpa, Some(3.33));
}
