mod common;

use deployrisk::data::{
    load_table, write_dataset, Labels, CATEGORICAL_FEATURES, ENVIRONMENTS, META_COLUMNS, MODULES,
    NUMERICAL_FEATURES,
};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_same_seed_gives_identical_csv() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("a.csv");
    let second = dir.path().join("b.csv");
    write_dataset(&first, &common::releases(250, 42)).unwrap();
    write_dataset(&second, &common::releases(250, 42)).unwrap();
    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());

    let other = dir.path().join("c.csv");
    write_dataset(&other, &common::releases(250, 43)).unwrap();
    assert_ne!(fs::read(&first).unwrap(), fs::read(&other).unwrap());
}

#[test]
fn test_low_coverage_prod_fails_more_than_high_coverage_dev() {
    let records = common::releases(100_000, 7);
    let rate = |select: &dyn Fn(&deployrisk::ReleaseRecord) -> bool| {
        let chosen: Vec<_> = records.iter().filter(|r| select(r)).collect();
        assert!(!chosen.is_empty());
        chosen.iter().filter(|r| r.deploy_failed == 1).count() as f64 / chosen.len() as f64
    };
    let risky = rate(&|r| r.environment == "prod" && r.test_coverage < 0.5);
    let safe = rate(&|r| r.environment == "dev" && r.test_coverage > 0.9);
    assert!(risky > safe, "risky {risky} <= safe {safe}");
}

#[test]
fn test_generated_rows_stay_in_schema() {
    let anchor = common::anchor();
    let earliest = anchor - chrono::Days::new(365);
    for record in common::releases(2_000, 11) {
        assert!(MODULES.contains(&record.module.as_str()));
        assert!(ENVIRONMENTS.contains(&record.environment.as_str()));
        assert!((0.2..=0.99).contains(&record.test_coverage));
        assert!((0.4..=1.0).contains(&record.build_success_rate));
        assert!((1.0..=30.0).contains(&record.lead_time_days));
        assert!((0.5..=20.0).contains(&record.cycle_time_days));
        assert!((0.2..=8.0).contains(&record.team_experience_years));
        assert!(record.lines_changed >= 1);
        assert!(record.prior_failed_deploys <= 3);
        assert!(record.hour_of_day < 24 && record.day_of_week < 7);
        assert!(record.deploy_failed <= 1);
        let date = record.release_datetime.date();
        assert!(date <= anchor && date > earliest);
    }
}

#[test]
fn test_csv_header_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.csv");
    write_dataset(&path, &common::releases(40, 3)).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let header: Vec<&str> = content.lines().next().unwrap().split(',').collect();
    for column in META_COLUMNS
        .iter()
        .chain(CATEGORICAL_FEATURES.iter())
        .chain(NUMERICAL_FEATURES.iter())
    {
        assert!(header.contains(column), "missing {column}");
    }
    assert_eq!(header.last(), Some(&"deploy_failed"));

    let table = load_table(&path, Labels::Required("deploy_failed")).unwrap();
    assert_eq!(table.len(), 40);
}

#[test]
fn test_empty_dataset_still_has_header() {
    let dir = TempDir::new().unwrap();
    let full = dir.path().join("full.csv");
    let empty = dir.path().join("empty.csv");
    write_dataset(&full, &common::releases(3, 1)).unwrap();
    write_dataset(&empty, &common::releases(0, 1)).unwrap();

    let expected = fs::read_to_string(&full).unwrap();
    let expected_header = expected.lines().next().unwrap();
    assert_eq!(fs::read_to_string(&empty).unwrap(), format!("{expected_header}\n"));
}
