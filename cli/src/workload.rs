//! Building work lists for the engine.

use crate::error::{AppError, AppResult};
use engine::{Operation, Record, RecordQuery, RecordSource, retrieve_all};
use std::path::Path;
use uuid::Uuid;

/// Columns retrieved for records that are about to be updated or deleted.
const TARGET_COLUMNS: [&str; 1] = ["name"];

/// `count` fresh records of `entity`, each with a `name` and `createdon`.
pub fn generate_records(entity: &str, count: usize) -> Vec<Record> {
    let created_on = chrono::Utc::now().to_rfc3339();
    (0..count)
        .map(|i| {
            Record::new(entity, Uuid::new_v4())
                .with_attribute("name", format!("{entity} {}", i + 1))
                .with_attribute("createdon", created_on.clone())
        })
        .collect()
}

/// Stamps each record with a `modifiedon` value so the update changes it.
pub fn mark_modified(records: Vec<Record>) -> Vec<Record> {
    let modified_on = chrono::Utc::now().to_rfc3339();
    records
        .into_iter()
        .map(|record| record.with_attribute("modifiedon", modified_on.clone()))
        .collect()
}

/// Retrieves every record of `entity` page by page, keeping at most `limit`.
pub async fn fetch_targets<S>(
    source: &S,
    entity: &str,
    limit: Option<usize>,
) -> AppResult<Vec<Record>>
where
    S: RecordSource + ?Sized,
{
    let query = RecordQuery::new(entity).with_columns(TARGET_COLUMNS);
    let mut records = retrieve_all(source, &query).await?;
    if let Some(limit) = limit {
        records.truncate(limit);
    }
    log::info!("Retrieved {} {entity} record(s) to process", records.len());
    Ok(records)
}

/// Parses a JSON array of operations, e.g.
/// `[{"op": "delete", "target": {"entity": "account", "id": "..."}}]`.
pub fn parse_operations(json: &str) -> AppResult<Vec<Operation>> {
    Ok(serde_json::from_str(json)?)
}

pub fn read_operations(path: &Path) -> AppResult<Vec<Operation>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::Input(format!("Cannot read '{}': {e}", path.display()))
    })?;
    parse_operations(&content)
}
