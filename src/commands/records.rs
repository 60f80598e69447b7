use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::Value;

use crate::models::{DailyRecord, RecordTotals};
use crate::services::backup::parse_backup;
use crate::services::migrator::{migrate_record, StoredDailyRecord};
use crate::services::state::AppState;
use crate::services::validator::is_daily_record;
use crate::utils::normalize_date;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    #[serde(flatten)]
    pub record: DailyRecord,
    pub totals: RecordTotals,
}

impl From<DailyRecord> for RecordView {
    fn from(record: DailyRecord) -> Self {
        RecordView {
            totals: record.totals(),
            record,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported: usize,
    pub legacy_format: bool,
    pub review_items: Vec<String>,
    pub digest: String,
}

pub fn parse_date(input: &str) -> Result<String> {
    normalize_date(input).ok_or_else(|| anyhow!("Invalid date: {}", input))
}

/// Newest first.
pub async fn list_records(state: &AppState) -> Result<Vec<RecordView>> {
    let mut records = state.ledger.load_records().await?;
    records.reverse();
    Ok(records.into_iter().map(RecordView::from).collect())
}

pub async fn get_record(state: &AppState, date: &str) -> Result<Option<RecordView>> {
    let date = parse_date(date)?;
    Ok(state.ledger.get_record(&date).await?.map(RecordView::from))
}

pub async fn new_record(state: &AppState, date: &str) -> Result<DailyRecord> {
    let date = parse_date(date)?;
    Ok(state.ledger.new_record(&date).await?)
}

/// Accepts a record document in current or legacy shape; derived fields are dropped.
pub async fn save_record(state: &AppState, payload: Value) -> Result<DailyRecord> {
    if !is_daily_record(&payload) {
        return Err(anyhow!("Not a valid daily record"));
    }
    let stored: StoredDailyRecord = serde_json::from_value(payload).context("Record payload")?;
    let record = migrate_record(stored).value;
    state.ledger.save_record(&record).await?;
    Ok(record)
}

pub async fn delete_record(state: &AppState, date: &str) -> Result<bool> {
    let date = parse_date(date)?;
    Ok(state.ledger.delete_record(&date).await?)
}

/// Adds the records of a backup or bare record array; nothing else is cleared.
pub async fn import_records(state: &AppState, raw: &str) -> Result<ImportSummary> {
    let parsed = parse_backup(raw)?;
    let imported = state.ledger.import_records(&parsed.data.records).await?;
    Ok(ImportSummary {
        imported,
        legacy_format: parsed.legacy_format,
        review_items: parsed.review_items,
        digest: parsed.digest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use crate::models::AppSettings;
    use serde_json::json;
    use tempfile::TempDir;

    async fn setup_test_state() -> (AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open(&temp_dir.path().join("daybook.sqlite"))
            .await
            .unwrap();
        (AppState::new(store, AppSettings::default()), temp_dir)
    }

    #[tokio::test]
    async fn save_strips_derived_fields_and_lists_newest_first() {
        let (state, _temp_dir) = setup_test_state().await;
        save_record(
            &state,
            json!({"id": "2024-07-01", "date": "2024-07-01", "totalSales": 10, "nightSales": 10}),
        )
        .await
        .unwrap();
        save_record(
            &state,
            json!({"id": "2024-07-02", "date": "2024-07-02", "totalSales": 1000, "morningSales": 400}),
        )
        .await
        .unwrap();

        let raw = state.store.get_record("2024-07-01").await.unwrap().unwrap();
        assert!(raw.get("nightSales").is_none());

        let listed = list_records(&state).await.unwrap();
        assert_eq!(listed[0].record.date, "2024-07-02");
        assert_eq!(listed[0].totals.night_sales, 600.0);
    }

    #[tokio::test]
    async fn rejects_invalid_payloads() {
        let (state, _temp_dir) = setup_test_state().await;
        assert!(save_record(&state, json!({"id": "2024-07-01"})).await.is_err());
        assert!(get_record(&state, "someday").await.is_err());
    }

    #[tokio::test]
    async fn import_keeps_existing_records() {
        let (state, _temp_dir) = setup_test_state().await;
        state.ledger.save_record(&DailyRecord::new("2024-01-01")).await.unwrap();

        let raw = json!([{"id": "2024-02-01", "date": "2024-02-01", "totalSales": 5}]).to_string();
        let summary = import_records(&state, &raw).await.unwrap();
        assert_eq!(summary.imported, 1);
        assert!(summary.legacy_format);
        assert_eq!(state.ledger.load_records().await.unwrap().len(), 2);
        assert!(get_record(&state, "01.02.2024").await.unwrap().is_some());
    }
}
