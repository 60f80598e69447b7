use anyhow::{anyhow, Result};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::db::Store;
use crate::models::AppSettings;
use crate::services::gas::GasLedger;
use crate::services::ledger::Ledger;
use crate::services::restore::RestoreReconciler;

pub const CURRENCY_KEY: &str = "currency";
pub const LAST_BACKUP_AT_KEY: &str = "lastBackupAt";

/// Everything the command layer needs, built once at startup around one store.
pub struct AppState {
    pub store: Store,
    pub ledger: Ledger,
    pub reconciler: RestoreReconciler,
    pub gas: GasLedger,
    pub settings: Arc<Mutex<AppSettings>>,
}

impl AppState {
    pub async fn open(db_path: &Path) -> Result<Self> {
        let store = Store::open(db_path).await?;
        let settings = load_settings(&store).await;
        Ok(AppState::new(store, settings))
    }

    pub fn new(store: Store, settings: AppSettings) -> Self {
        let ledger = Ledger::new(store.clone());
        AppState {
            reconciler: RestoreReconciler::new(ledger.clone()),
            gas: GasLedger::new(store.clone()),
            ledger,
            store,
            settings: Arc::new(Mutex::new(settings)),
        }
    }

    pub fn settings(&self) -> Result<AppSettings> {
        Ok(self.settings.lock().map_err(|_| anyhow!("Settings lock"))?.clone())
    }

    pub fn update_settings(&self, settings: AppSettings) -> Result<()> {
        let mut locked = self.settings.lock().map_err(|_| anyhow!("Settings lock"))?;
        *locked = settings;
        Ok(())
    }
}

/// Missing or unreadable keys fall back to their defaults.
pub async fn load_settings(store: &Store) -> AppSettings {
    let defaults = AppSettings::default();
    let currency = store
        .get_setting::<String>(CURRENCY_KEY)
        .await
        .ok()
        .flatten()
        .unwrap_or(defaults.currency);
    let last_backup_at = store
        .get_setting::<String>(LAST_BACKUP_AT_KEY)
        .await
        .ok()
        .flatten();
    AppSettings {
        currency,
        last_backup_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn settings_default_until_saved() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("daybook.sqlite");

        let state = AppState::open(&path).await.unwrap();
        assert_eq!(state.settings().unwrap(), AppSettings::default());

        state.store.set_setting(CURRENCY_KEY, "EUR").await.unwrap();
        state.store.set_setting(LAST_BACKUP_AT_KEY, &42).await.unwrap();
        let loaded = load_settings(&state.store).await;
        assert_eq!(loaded.currency, "EUR");
        assert_eq!(loaded.last_backup_at, None);
    }
}
