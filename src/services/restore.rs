use serde::Serialize;

use crate::db::Collection;
use crate::error::RestoreError;
use crate::models::DailyRecord;
use crate::services::backup::ParsedBackup;
use crate::services::ledger::Ledger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Staleness {
    /// Backup reaches at least as far as local data, or there is nothing to compare.
    NotOlder,
    /// Local data has dates past the backup's latest record.
    Older,
}

pub fn max_record_date(records: &[DailyRecord]) -> Option<&str> {
    records.iter().map(|record| record.date.as_str()).max()
}

/// `YYYY-MM-DD` strings order the same way as the dates they name.
pub fn is_backup_older_than_current(current: &[DailyRecord], backup: &[DailyRecord]) -> bool {
    match (max_record_date(current), max_record_date(backup)) {
        (Some(local), Some(incoming)) => incoming < local,
        _ => false,
    }
}

/// A classified restore waiting for the user's go-ahead.
#[derive(Debug, Clone)]
pub struct RestorePlan {
    backup: ParsedBackup,
    pub staleness: Staleness,
    pub local_records: usize,
    pub local_latest: Option<String>,
    pub backup_latest: Option<String>,
}

impl RestorePlan {
    pub fn backup(&self) -> &ParsedBackup {
        &self.backup
    }

    pub fn is_older(&self) -> bool {
        self.staleness == Staleness::Older
    }

    /// The explicit confirmation `apply` requires.
    pub fn confirm(self) -> ConfirmedRestore {
        ConfirmedRestore(self)
    }
}

#[derive(Debug)]
pub struct ConfirmedRestore(RestorePlan);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub restored_records: usize,
    pub structure_categories: usize,
    pub staleness: Staleness,
    pub legacy_format: bool,
    pub kept_local_structure: bool,
    pub review_items: Vec<String>,
    pub digest: String,
}

#[derive(Clone)]
pub struct RestoreReconciler {
    ledger: Ledger,
}

impl RestoreReconciler {
    pub fn new(ledger: Ledger) -> Self {
        RestoreReconciler { ledger }
    }

    /// Classifies the backup against local data. Never blocks the restore.
    pub async fn plan(&self, backup: ParsedBackup) -> Result<RestorePlan, RestoreError> {
        let current = self.ledger.load_records().await.map_err(RestoreError::Aborted)?;
        let staleness = if is_backup_older_than_current(&current, &backup.data.records) {
            Staleness::Older
        } else {
            Staleness::NotOlder
        };
        let local_latest = max_record_date(&current).map(str::to_string);
        let backup_latest = max_record_date(&backup.data.records).map(str::to_string);

        if staleness == Staleness::Older {
            tracing::warn!(
                local_latest = ?local_latest,
                backup_latest = ?backup_latest,
                "backup is older than local data"
            );
        }

        Ok(RestorePlan {
            backup,
            staleness,
            local_records: current.len(),
            local_latest,
            backup_latest,
        })
    }

    /// Replaces all records and the custom structure in one transaction, then
    /// counts what landed. A legacy record-only backup keeps the local structure.
    pub async fn apply(&self, confirmed: ConfirmedRestore) -> Result<RestoreReport, RestoreError> {
        let plan = confirmed.0;
        let backup = plan.backup;
        let records = backup.data.records;

        let (structure, kept_local_structure) = if backup.legacy_format {
            let local = self
                .ledger
                .load_structure()
                .await
                .map_err(RestoreError::Aborted)?;
            (local, true)
        } else {
            (backup.data.custom_structure, false)
        };

        let store = self.ledger.store();
        store
            .replace_all(&records, &structure)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "restore rolled back");
                RestoreError::Aborted(e)
            })?;

        let found = store.count(Collection::Records).await.map_err(|e| {
            tracing::error!(error = %e, "restore could not be verified");
            RestoreError::Unverified(e)
        })?;
        if found != records.len() {
            tracing::error!(expected = records.len(), found, "restore left the store incomplete");
            return Err(RestoreError::DataLoss {
                expected: records.len(),
                found,
            });
        }

        tracing::info!(
            records = found,
            digest = %backup.digest,
            staleness = ?plan.staleness,
            "backup restored"
        );
        Ok(RestoreReport {
            restored_records: found,
            structure_categories: structure.0.len(),
            staleness: plan.staleness,
            legacy_format: backup.legacy_format,
            kept_local_structure,
            review_items: backup.review_items,
            digest: backup.digest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use crate::error::StoreError;
    use crate::models::{CustomExpenseStructure, StructureEntry};
    use crate::services::backup::{parse_backup, serialize_backup};
    use tempfile::TempDir;

    fn records(dates: &[&str]) -> Vec<DailyRecord> {
        dates.iter().map(|date| DailyRecord::new(date)).collect()
    }

    async fn setup_test_reconciler() -> (RestoreReconciler, Ledger, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open(&temp_dir.path().join("daybook.sqlite"))
            .await
            .unwrap();
        let ledger = Ledger::new(store);
        (RestoreReconciler::new(ledger.clone()), ledger, temp_dir)
    }

    fn structure(category: &str) -> CustomExpenseStructure {
        let mut structure = CustomExpenseStructure::default();
        structure.0.insert(
            category.to_string(),
            vec![StructureEntry {
                name: "Item".to_string(),
                default_value: 1.0,
            }],
        );
        structure
    }

    #[test]
    fn staleness_compares_latest_dates() {
        let local = records(&["2024-07-01", "2024-07-20"]);
        let backup = records(&["2024-07-15", "2024-06-01"]);
        assert!(is_backup_older_than_current(&local, &backup));

        let same = records(&["2024-07-20"]);
        assert!(!is_backup_older_than_current(&local, &same));
        let newer = records(&["2024-08-01"]);
        assert!(!is_backup_older_than_current(&local, &newer));
    }

    #[test]
    fn empty_sets_are_never_older() {
        assert!(!is_backup_older_than_current(&[], &records(&["2020-01-01"])));
        assert!(!is_backup_older_than_current(&records(&["2024-01-01"]), &[]));
    }

    #[tokio::test]
    async fn restore_replaces_everything() {
        let (reconciler, ledger, _temp_dir) = setup_test_reconciler().await;
        ledger
            .import_records(&records(&["2024-07-01", "2024-07-02"]))
            .await
            .unwrap();
        ledger.save_structure(&structure("Old")).await.unwrap();

        let raw = serialize_backup(&records(&["2024-08-01"]), &structure("New")).unwrap();
        let plan = reconciler.plan(parse_backup(&raw).unwrap()).await.unwrap();
        assert_eq!(plan.staleness, Staleness::NotOlder);
        assert_eq!(plan.local_records, 2);

        let report = reconciler.apply(plan.confirm()).await.unwrap();
        assert_eq!(report.restored_records, 1);
        assert!(!report.kept_local_structure);

        let loaded = ledger.load_records().await.unwrap();
        assert_eq!(loaded, records(&["2024-08-01"]));
        assert_eq!(ledger.load_structure().await.unwrap(), structure("New"));
    }

    #[tokio::test]
    async fn older_backup_is_classified_not_blocked() {
        let (reconciler, ledger, _temp_dir) = setup_test_reconciler().await;
        ledger
            .import_records(&records(&["2024-07-20"]))
            .await
            .unwrap();

        let raw = serialize_backup(&records(&["2024-07-15"]), &structure("K")).unwrap();
        let plan = reconciler.plan(parse_backup(&raw).unwrap()).await.unwrap();
        assert!(plan.is_older());
        assert_eq!(plan.local_latest.as_deref(), Some("2024-07-20"));
        assert_eq!(plan.backup_latest.as_deref(), Some("2024-07-15"));

        let report = reconciler.apply(plan.confirm()).await.unwrap();
        assert_eq!(report.staleness, Staleness::Older);
        assert_eq!(ledger.load_records().await.unwrap(), records(&["2024-07-15"]));
    }

    #[tokio::test]
    async fn empty_local_store_is_never_older() {
        let (reconciler, _ledger, _temp_dir) = setup_test_reconciler().await;
        let raw = serialize_backup(&records(&["2001-01-01"]), &structure("K")).unwrap();
        let plan = reconciler.plan(parse_backup(&raw).unwrap()).await.unwrap();
        assert_eq!(plan.staleness, Staleness::NotOlder);
    }

    #[tokio::test]
    async fn failed_restore_leaves_local_data_intact() {
        let (reconciler, ledger, _temp_dir) = setup_test_reconciler().await;
        let local = records(&["2024-07-01", "2024-07-02"]);
        ledger.import_records(&local).await.unwrap();

        // Two records for one date break the uniqueness constraint mid-insert.
        let raw = serialize_backup(&records(&["2024-09-01", "2024-09-01"]), &structure("K")).unwrap();
        let plan = reconciler.plan(parse_backup(&raw).unwrap()).await.unwrap();
        let err = reconciler.apply(plan.confirm()).await.unwrap_err();

        assert!(matches!(err, RestoreError::Aborted(StoreError::Sqlite(_))));
        assert!(!err.is_critical());
        assert_eq!(ledger.load_records().await.unwrap(), local);
    }

    #[tokio::test]
    async fn legacy_backup_keeps_local_structure() {
        let (reconciler, ledger, _temp_dir) = setup_test_reconciler().await;
        ledger.save_structure(&structure("Kitchen")).await.unwrap();

        let raw = r#"[{"id": "2022-01-01", "date": "2022-01-01", "totalSales": 10}]"#;
        let plan = reconciler.plan(parse_backup(raw).unwrap()).await.unwrap();
        let report = reconciler.apply(plan.confirm()).await.unwrap();

        assert!(report.legacy_format);
        assert!(report.kept_local_structure);
        assert_eq!(ledger.load_structure().await.unwrap(), structure("Kitchen"));
        assert_eq!(ledger.load_records().await.unwrap().len(), 1);
    }
}
