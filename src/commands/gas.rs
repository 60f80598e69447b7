use anyhow::Result;

use crate::models::{GasLog, GasLogType};
use crate::services::state::AppState;

pub async fn get_gas_logs(state: &AppState) -> Result<Vec<GasLog>> {
    Ok(state.gas.list().await?)
}

pub async fn add_gas_log(state: &AppState, kind: GasLogType, count: i64) -> Result<GasLog> {
    Ok(state.gas.record(kind, count).await?)
}

pub async fn delete_gas_log(state: &AppState, id: &str) -> Result<bool> {
    Ok(state.gas.delete(id).await?)
}

pub async fn get_gas_stock(state: &AppState) -> Result<i64> {
    Ok(state.gas.stock().await?)
}
