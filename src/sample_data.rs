// MIT License
// Copyright (c) 2024 Graham King

use std::fs;
use std::path::Path;

use crate::error::{AdminError, Result};
use crate::report::{FailurePolicy, Report};
use crate::session::Session;
use crate::sql;

pub const DEFAULT_DATA: &str = "sample_data.json";

// One category in the JSON file: {"data": [[row_id, "text"], ...]}
#[derive(Debug, serde::Deserialize)]
struct CategoryJson {
    data: Vec<(i32, String)>,
}

/// Rows for one sample table
#[derive(Debug, PartialEq)]
pub struct Category {
    pub name: String,
    pub rows: Vec<(i32, String)>,
}

impl Category {
    pub fn table(&self) -> String {
        sql::sample_table(&self.name)
    }
}

/// Sample data, categories in file order
#[derive(Debug)]
pub struct SampleData {
    pub categories: Vec<Category>,
}

impl SampleData {
    pub fn load(path: &Path) -> Result<SampleData> {
        if !path.exists() {
            return Err(AdminError::FileNotFound(path.to_path_buf()));
        }
        let s = fs::read_to_string(path)?;
        SampleData::parse(&s)
    }

    pub fn parse(s: &str) -> Result<SampleData> {
        let top: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(s).map_err(|e| AdminError::Data(e.to_string()))?;
        let mut categories = Vec::with_capacity(top.len());
        for (name, value) in top {
            let content: CategoryJson = serde_json::from_value(value)
                .map_err(|e| AdminError::Data(format!("{name}: {e}")))?;
            sql::check_name(&sql::sample_table(&name))?;
            categories.push(Category {
                name,
                rows: content.data,
            });
        }
        Ok(SampleData { categories })
    }
}

/// Create `<owner>.input_<category>` for each category and bulk load its rows.
/// With `FailFast` the first failing category stops the whole load.
pub fn load(
    session: &mut dyn Session,
    owner: &str,
    data: &SampleData,
    policy: FailurePolicy,
) -> Result<Report> {
    sql::check_name(owner)?;
    let mut report = Report::default();
    for category in &data.categories {
        let table = category.table();
        let res = load_category(session, owner, &table, category);
        report.record(policy, &table, res)?;
    }
    Ok(report)
}

fn load_category(
    session: &mut dyn Session,
    owner: &str,
    table: &str,
    category: &Category,
) -> Result<()> {
    tracing::info!(owner, table, "creating table");
    session.execute(&sql::create_sample_table(owner, table))?;

    // Removed when `csv_file` drops, whichever way we leave
    let mut csv_file = tempfile::Builder::new()
        .prefix(&format!("temp_{}_", category.name))
        .suffix(".csv")
        .tempfile()?;
    write_csv(&mut csv_file, &category.rows)?;

    tracing::info!(rows = category.rows.len(), table, "batch inserting");
    let inserted = session.bulk_load(&sql::insert_sample_row(owner, table), csv_file.path())?;
    tracing::info!(inserted, table, "table created and populated");
    Ok(())
}

fn write_csv<W: std::io::Write>(w: W, rows: &[(i32, String)]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(w);
    writer.write_record(["row_id", "txt"])?;
    for (row_id, txt) in rows {
        writer.serialize((row_id, txt))?;
    }
    writer.flush()?;
    Ok(())
}

/// Drop the table of each category. With `BestEffort` a missing table
/// is a warning and the others are still dropped.
pub fn remove(
    session: &mut dyn Session,
    owner: &str,
    data: &SampleData,
    policy: FailurePolicy,
) -> Result<Report> {
    sql::check_name(owner)?;
    let mut report = Report::default();
    for category in &data.categories {
        let table = category.table();
        tracing::info!(owner, table, "dropping table");
        let res = session.execute(&sql::drop_table(owner, &table)).map(|_| ());
        report.record(policy, &table, res)?;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::FakeEngine;

    const SAMPLE: &str = r#"{
        "faq": {"data": [[1, "How do I reset my password?"], [2, "Où est la gare?"], [3, "Quote \"this\", please"]]},
        "reviews": {"data": [[10, "Great product"], [11, "Arrived broken,\nwould not buy again"]]},
        "empty": {"data": []}
    }"#;

    fn sample() -> SampleData {
        SampleData::parse(SAMPLE).unwrap()
    }

    #[test]
    fn parse_keeps_file_order() {
        let data = sample();
        let names: Vec<&str> = data.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["faq", "reviews", "empty"]);
        assert_eq!(data.categories[0].rows[1], (2, "Où est la gare?".to_string()));
        assert_eq!(data.categories[0].table(), "input_faq");
    }

    #[test]
    fn parse_rejects_bad_shapes() {
        for bad in [
            "[]",
            r#"{"faq": [[1, "x"]]}"#,
            r#"{"faq": {"data": [["one", "x"]]}}"#,
            r#"{"faq": {"data": [[1]]}}"#,
        ] {
            assert!(
                matches!(SampleData::parse(bad), Err(AdminError::Data(_))),
                "{bad}"
            );
        }
        assert!(matches!(
            SampleData::parse(r#"{"bad name": {"data": []}}"#),
            Err(AdminError::Configuration(_))
        ));
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_DATA);
        assert!(matches!(
            SampleData::load(&path),
            Err(AdminError::FileNotFound(_))
        ));
        fs::write(&path, SAMPLE).unwrap();
        assert_eq!(SampleData::load(&path).unwrap().categories.len(), 3);
    }

    #[test]
    fn one_table_per_category_with_all_rows() {
        let mut engine = FakeEngine::new(1).with_user("demo_user");
        let data = sample();
        let report = load(&mut engine, "demo_user", &data, FailurePolicy::FailFast).unwrap();
        assert_eq!(
            report.succeeded,
            vec!["input_faq", "input_reviews", "input_empty"]
        );
        assert_eq!(engine.tables.len(), 3);
        assert_eq!(engine.rows_in("demo_user.input_faq"), Some(3));
        assert_eq!(engine.rows_in("demo_user.input_reviews"), Some(2));
        assert_eq!(engine.rows_in("demo_user.input_empty"), Some(0));

        // Text survives the CSV file unchanged, ids go in as integers
        let faq = &engine.tables["demo_user.input_faq"];
        assert_eq!(
            faq[1],
            vec![serde_json::json!(2), serde_json::json!("Où est la gare?")]
        );
        assert_eq!(faq[2][1], serde_json::json!("Quote \"this\", please"));
        let reviews = &engine.tables["demo_user.input_reviews"];
        assert_eq!(
            reviews[1][1],
            serde_json::json!("Arrived broken,\nwould not buy again")
        );
        for row in engine.tables.values().flatten() {
            assert!(row[0].is_i64() && row[1].is_string(), "{row:?}");
        }

        let creates = engine
            .statements
            .iter()
            .filter(|s| s.starts_with("CREATE TABLE"))
            .count();
        assert_eq!(creates, 3);
        assert!(engine.statements.contains(
            &"CREATE TABLE demo_user.input_faq ( row_id INTEGER, txt VARCHAR(5000) CHARACTER SET UNICODE ) PRIMARY INDEX (row_id)"
                .to_string()
        ));
    }

    #[test]
    fn numeric_looking_text_stays_text() {
        let data = SampleData::parse(
            r#"{"codes": {"data": [[1, "007"], [2, "2024"], [3, "1e3"], [4, " 42 "]]}}"#,
        )
        .unwrap();
        let mut engine = FakeEngine::new(1).with_user("demo_user");
        load(&mut engine, "demo_user", &data, FailurePolicy::FailFast).unwrap();
        let txt: Vec<&serde_json::Value> = engine.tables["demo_user.input_codes"]
            .iter()
            .map(|row| &row[1])
            .collect();
        assert_eq!(
            txt,
            vec![
                &serde_json::json!("007"),
                &serde_json::json!("2024"),
                &serde_json::json!("1e3"),
                &serde_json::json!(" 42 "),
            ]
        );
    }

    #[test]
    fn temp_files_removed_after_success() {
        let mut engine = FakeEngine::new(1).with_user("demo_user");
        load(&mut engine, "demo_user", &sample(), FailurePolicy::FailFast).unwrap();
        assert_eq!(engine.loaded_files.len(), 3);
        for (path, existed) in &engine.loaded_files {
            assert!(existed, "{} missing during load", path.display());
            assert!(!path.exists(), "{} left behind", path.display());
            let name = path.file_name().unwrap().to_string_lossy();
            assert!(name.starts_with("temp_") && name.ends_with(".csv"), "{name}");
        }
    }

    #[test]
    fn fail_fast_stops_and_cleans_up() {
        let mut engine = FakeEngine::new(1)
            .with_user("demo_user")
            .fail_when("INSERT INTO demo_user.input_faq", "[Error 2673] bad data");
        let err = load(&mut engine, "demo_user", &sample(), FailurePolicy::FailFast).unwrap_err();
        assert_eq!(err.diagnostic(), "[Error 2673] bad data");
        // The faq table was created, nothing after it was touched
        assert_eq!(engine.tables.len(), 1);
        assert_eq!(engine.loaded_files.len(), 1);
        assert!(!engine.loaded_files[0].0.exists());
    }

    #[test]
    fn best_effort_load_continues() {
        let mut engine = FakeEngine::new(1)
            .with_user("demo_user")
            .fail_when("CREATE TABLE demo_user.input_reviews", "[Error 3803] exists");
        let report = load(&mut engine, "demo_user", &sample(), FailurePolicy::BestEffort).unwrap();
        assert_eq!(report.succeeded, vec!["input_faq", "input_empty"]);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(engine.rows_in("demo_user.input_empty"), Some(0));
    }

    #[test]
    fn remove_reports_only_dropped_tables() {
        let mut engine = FakeEngine::new(1).with_user("demo_user");
        engine
            .execute(&sql::create_sample_table("demo_user", "input_faq"))
            .unwrap();
        let report = remove(&mut engine, "demo_user", &sample(), FailurePolicy::BestEffort).unwrap();
        assert_eq!(report.succeeded, vec!["input_faq"]);
        let warned: Vec<&str> = report.warnings.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(warned, vec!["input_reviews", "input_empty"]);
        assert!(engine.tables.is_empty());
    }

    #[test]
    fn strict_remove_stops_at_missing_table() {
        let mut engine = FakeEngine::new(1).with_user("demo_user");
        let err = remove(&mut engine, "demo_user", &sample(), FailurePolicy::FailFast).unwrap_err();
        assert!(err.diagnostic().contains("does not exist"));
        assert_eq!(engine.statements.len(), 1);
    }

    #[test]
    fn load_then_remove() {
        let mut engine = FakeEngine::new(1).with_user("demo_user");
        let data = sample();
        load(&mut engine, "demo_user", &data, FailurePolicy::FailFast).unwrap();
        let report = remove(&mut engine, "demo_user", &data, FailurePolicy::BestEffort).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.succeeded.len(), 3);
        assert!(engine.tables.is_empty());
    }
}
