use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use crate::services::backup::{parse_backup, serialize_backup};
use crate::services::csv_export::export_records_csv;
use crate::services::restore::{RestorePlan, RestoreReport};
use crate::services::state::{AppState, LAST_BACKUP_AT_KEY};
use crate::utils::{now_rfc3339, sha256_hex};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub path: String,
    pub records: usize,
    pub digest: String,
    pub exported_at: String,
}

/// Writes the backup and stamps `lastBackupAt`.
pub async fn export_backup(state: &AppState, path: &Path) -> Result<ExportSummary> {
    let records = state.ledger.load_records().await?;
    let structure = state.ledger.load_structure().await?;
    let raw = serialize_backup(&records, &structure)?;
    std::fs::write(path, &raw).with_context(|| format!("Write backup {}", path.display()))?;

    let exported_at = now_rfc3339();
    state.store.set_setting(LAST_BACKUP_AT_KEY, &exported_at).await?;
    let mut settings = state.settings()?;
    settings.last_backup_at = Some(exported_at.clone());
    state.update_settings(settings)?;

    let digest = sha256_hex(raw.as_bytes());
    tracing::info!(path = %path.display(), records = records.len(), digest = %digest, "backup exported");
    Ok(ExportSummary {
        path: path.display().to_string(),
        records: records.len(),
        digest,
        exported_at,
    })
}

/// Reads and classifies a backup without touching local data.
pub async fn plan_restore(state: &AppState, path: &Path) -> Result<RestorePlan> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Read backup {}", path.display()))?;
    let parsed = parse_backup(&raw)?;
    Ok(state.reconciler.plan(parsed).await?)
}

/// Applies a planned restore. An older backup needs `allow_older` on top of
/// the general confirmation.
pub async fn restore_backup(
    state: &AppState,
    plan: RestorePlan,
    allow_older: bool,
) -> Result<RestoreReport> {
    if plan.is_older() && !allow_older {
        return Err(anyhow!(
            "Backup ends at {} but local data reaches {}; confirm an older restore explicitly",
            plan.backup_latest.as_deref().unwrap_or("-"),
            plan.local_latest.as_deref().unwrap_or("-"),
        ));
    }
    Ok(state.reconciler.apply(plan.confirm()).await?)
}

pub async fn export_csv(state: &AppState, path: &Path) -> Result<usize> {
    let records = state.ledger.load_records().await?;
    let csv = export_records_csv(&records)?;
    std::fs::write(path, csv).with_context(|| format!("Write CSV {}", path.display()))?;
    Ok(records.len())
}
