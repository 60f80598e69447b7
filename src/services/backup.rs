use serde::Deserialize;
use serde_json::Value;

use crate::error::BackupError;
use crate::models::{BackupData, CustomExpenseStructure, DailyRecord, CURRENT_BACKUP_VERSION};
use crate::services::migrator::{migrate_records, migrate_structure, StoredDailyRecord, StoredStructure};
use crate::services::validator::{is_backup_data, is_legacy_record_list};
use crate::utils::{is_record_date, sha256_hex};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredBackup {
    version: f64,
    records: Vec<StoredDailyRecord>,
    custom_structure: StoredStructure,
}

/// A validated, migrated backup ready for the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedBackup {
    pub data: BackupData,
    /// Bare record array: custom categories are not part of it.
    pub legacy_format: bool,
    /// Any record or the structure needed an upgrade.
    pub migrated: bool,
    pub review_items: Vec<String>,
    /// SHA-256 of the raw document.
    pub digest: String,
}

/// Pretty-printed backup document with a stable key order.
pub fn serialize_backup(
    records: &[DailyRecord],
    structure: &CustomExpenseStructure,
) -> Result<String, serde_json::Error> {
    let backup = BackupData {
        version: CURRENT_BACKUP_VERSION,
        records: records.to_vec(),
        custom_structure: structure.clone(),
    };
    serde_json::to_string_pretty(&backup)
}

/// Nothing is written here; a rejected document never reaches the store.
pub fn parse_backup(raw: &str) -> Result<ParsedBackup, BackupError> {
    let value: Value = serde_json::from_str(raw)?;
    let digest = sha256_hex(raw.as_bytes());

    let (version, records, structure, legacy_format) = if is_backup_data(&value) {
        let stored: StoredBackup =
            serde_json::from_value(value).map_err(|_| BackupError::InvalidStructure)?;
        if stored.version > CURRENT_BACKUP_VERSION as f64 {
            tracing::warn!(version = stored.version, "backup was written by a newer format");
        }
        (
            stored.version as u32,
            stored.records,
            stored.custom_structure,
            false,
        )
    } else if is_legacy_record_list(&value) {
        let records: Vec<StoredDailyRecord> =
            serde_json::from_value(value).map_err(|_| BackupError::InvalidStructure)?;
        tracing::warn!(
            count = records.len(),
            "legacy record-only backup; custom categories will not be restored"
        );
        (0, records, StoredStructure::default(), true)
    } else {
        return Err(BackupError::InvalidStructure);
    };

    let records = migrate_records(records);
    if let Some(bad) = records
        .value
        .iter()
        .find(|record| !is_record_date(&record.id) || record.id != record.date)
    {
        tracing::warn!(record = %bad.id, date = %bad.date, "backup record is not keyed by its date");
        return Err(BackupError::InvalidStructure);
    }
    let structure = migrate_structure(structure);

    Ok(ParsedBackup {
        data: BackupData {
            version,
            records: records.value,
            custom_structure: structure.value,
        },
        legacy_format,
        migrated: records.changed || structure.changed,
        review_items: records.review_items,
        digest,
    })
}
