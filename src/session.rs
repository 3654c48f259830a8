// MIT License
// Copyright (c) 2024 Graham King

use std::path::Path;

use crate::error::{AdminError, Result};

/// One result row, column values in select order
pub type Row = Vec<serde_json::Value>;

/// An open connection to the database. Statements run one at a time and
/// each call waits for the engine's answer. Implementations release the
/// connection when dropped.
pub trait Session {
    /// Run one statement. Returns the rows of its result set, empty for DDL.
    fn execute(&mut self, statement: &str) -> Result<Vec<Row>>;

    /// Run the parameterised `insert` once per record of the CSV file at
    /// `csv_path` (header row skipped). Returns the number of rows inserted.
    fn bulk_load(&mut self, insert: &str, csv_path: &Path) -> Result<u64>;
}

/// Run a query that returns a single integer
pub fn query_u64(session: &mut dyn Session, statement: &str) -> Result<u64> {
    let rows = session.execute(statement)?;
    let Some(value) = rows.first().and_then(|r| r.first()) else {
        return Err(AdminError::statement(statement, "query returned no rows"));
    };
    let n = match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    n.ok_or_else(|| AdminError::statement(statement, format!("expected an integer, got {value}")))
}

/// Rows of a sample CSV file (header skipped) as insert parameters:
/// `row_id` as an integer, `txt` always as text.
pub fn read_sample_rows(csv_path: &Path) -> Result<Vec<Row>> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let (Some(row_id), Some(txt), 2) = (record.get(0), record.get(1), record.len()) else {
            return Err(AdminError::Data(format!(
                "{} record {}: expected row_id,txt",
                csv_path.display(),
                idx + 1
            )));
        };
        let row_id: i32 = row_id.trim().parse().map_err(|_| {
            AdminError::Data(format!(
                "{} record {}: row_id '{row_id}' is not an integer",
                csv_path.display(),
                idx + 1
            ))
        })?;
        rows.push(vec![
            serde_json::Value::from(row_id),
            serde_json::Value::from(txt),
        ]);
    }
    Ok(rows)
}
