use crate::db::Store;
use crate::error::StoreError;
use crate::models::{GasLog, GasLogType};
use crate::utils::now_rfc3339;

pub const GAS_LOGS_KEY: &str = "gasLogs";

/// Cylinder refill/connect events, kept as one list in the settings collection.
#[derive(Clone)]
pub struct GasLedger {
    store: Store,
}

impl GasLedger {
    pub fn new(store: Store) -> Self {
        GasLedger { store }
    }

    /// Newest first.
    pub async fn list(&self) -> Result<Vec<GasLog>, StoreError> {
        let mut logs: Vec<GasLog> = self.store.get_setting(GAS_LOGS_KEY).await?.unwrap_or_default();
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(logs)
    }

    pub async fn record(&self, kind: GasLogType, count: i64) -> Result<GasLog, StoreError> {
        if count < 1 {
            return Err(StoreError::InvalidRecord {
                id: GAS_LOGS_KEY.to_string(),
                reason: format!("cylinder count must be at least 1, got {}", count),
            });
        }
        let log = GasLog {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: now_rfc3339(),
            kind,
            count,
        };

        let mut logs = self.list().await?;
        logs.insert(0, log.clone());
        self.store.set_setting(GAS_LOGS_KEY, &logs).await?;
        tracing::info!(kind = ?log.kind, count, "gas log recorded");
        Ok(log)
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut logs = self.list().await?;
        let before = logs.len();
        logs.retain(|log| log.id != id);
        if logs.len() == before {
            return Ok(false);
        }
        self.store.set_setting(GAS_LOGS_KEY, &logs).await?;
        Ok(true)
    }

    /// Cylinders on hand: refills minus connections.
    pub async fn stock(&self) -> Result<i64, StoreError> {
        Ok(self.list().await?.iter().map(GasLog::stock_delta).sum())
    }
}
