use anyhow::{anyhow, Context, Result};
use serde_json::Value;

use crate::models::{AppSettings, CustomExpenseStructure};
use crate::services::migrator::{migrate_structure, StoredStructure};
use crate::services::state::{load_settings, AppState};
use crate::services::validator::is_custom_structure;

pub async fn get_settings(state: &AppState) -> Result<AppSettings> {
    state.settings()
}

pub async fn get_setting(state: &AppState, key: &str) -> Result<Option<Value>> {
    Ok(state.store.get_setting(key).await?)
}

pub async fn get_all_settings(state: &AppState) -> Result<Vec<(String, Value)>> {
    Ok(state.store.get_all_settings().await?)
}

/// Stores `raw` as JSON when it parses, otherwise as a plain string.
pub async fn save_setting(state: &AppState, key: &str, raw: &str) -> Result<()> {
    let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    state.store.set_setting(key, &value).await?;

    let settings = load_settings(&state.store).await;
    state.update_settings(settings)
}

pub async fn delete_setting(state: &AppState, key: &str) -> Result<bool> {
    let removed = state.store.delete_setting(key).await?;
    let settings = load_settings(&state.store).await;
    state.update_settings(settings)?;
    Ok(removed)
}

pub async fn get_structure(state: &AppState) -> Result<CustomExpenseStructure> {
    Ok(state.ledger.load_structure().await?)
}

pub async fn save_structure(state: &AppState, payload: Value) -> Result<CustomExpenseStructure> {
    if !is_custom_structure(&payload) {
        return Err(anyhow!("Not a valid custom expense structure"));
    }
    let stored: StoredStructure = serde_json::from_value(payload).context("Structure payload")?;
    let structure = migrate_structure(stored).value;
    state.ledger.save_structure(&structure).await?;
    Ok(structure)
}
