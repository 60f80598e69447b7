use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::db::{Collection, Database, Doc, CUSTOM_STRUCTURE_KEY};
use crate::error::StoreError;
use crate::models::{CustomExpenseStructure, DailyRecord};
use crate::utils::is_record_date;

/// Owned async handle to the on-disk store. Construct once at startup and
/// clone it into every consumer; clones share one live connection.
#[derive(Clone)]
pub struct Store {
    db: Arc<Mutex<Database>>,
}

impl Store {
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let path = path.to_path_buf();
        let db = tokio::task::spawn_blocking(move || Database::new(&path))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))??;
        tracing::info!(version = db.store_version()?, "store opened");
        Ok(Store {
            db: Arc::new(Mutex::new(db)),
        })
    }

    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Database) -> Result<T, StoreError> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = db.lock().map_err(|_| StoreError::LockPoisoned)?;
            op(&mut *guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    pub async fn store_version(&self) -> Result<i64, StoreError> {
        self.run(|db| db.store_version()).await
    }

    /// Raw documents of the records collection, oldest date first. Documents
    /// may still carry a legacy shape; the migrator upgrades them.
    pub async fn get_all_records(&self) -> Result<Vec<Value>, StoreError> {
        let docs = self.run(|db| db.get_all(Collection::Records)).await?;
        docs.iter()
            .map(|(_, doc)| serde_json::from_str(doc).map_err(StoreError::from))
            .collect()
    }

    pub async fn get_record(&self, id: &str) -> Result<Option<Value>, StoreError> {
        let id = id.to_string();
        let doc = self.run(move |db| db.get(Collection::Records, &id)).await?;
        doc.map(|doc| serde_json::from_str(&doc).map_err(StoreError::from))
            .transpose()
    }

    pub async fn put_record(&self, record: &DailyRecord) -> Result<(), StoreError> {
        let (id, doc) = encode_record(record)?;
        self.run(move |db| db.put(Collection::Records, &id, &doc)).await?;
        tracing::debug!(record = %record.id, "record saved");
        Ok(())
    }

    pub async fn delete_record(&self, id: &str) -> Result<bool, StoreError> {
        let id = id.to_string();
        self.run(move |db| db.delete(Collection::Records, &id)).await
    }

    /// Every record is checked and encoded before the write transaction opens;
    /// one bad record fails the whole batch.
    pub async fn bulk_put_records(&self, records: &[DailyRecord]) -> Result<(), StoreError> {
        let docs = records
            .iter()
            .map(encode_record)
            .collect::<Result<Vec<Doc>, _>>()?;
        let count = docs.len();
        self.run(move |db| db.bulk_put(Collection::Records, &docs)).await?;
        tracing::debug!(count, "records bulk saved");
        Ok(())
    }

    pub async fn clear(&self, collection: Collection) -> Result<usize, StoreError> {
        self.run(move |db| db.clear(collection)).await
    }

    pub async fn count(&self, collection: Collection) -> Result<usize, StoreError> {
        self.run(move |db| db.count(collection)).await
    }

    /// Raw custom-structure document, if one was ever saved.
    pub async fn get_custom_structure(&self) -> Result<Option<Value>, StoreError> {
        let doc = self
            .run(|db| db.get(Collection::CustomStructure, CUSTOM_STRUCTURE_KEY))
            .await?;
        doc.map(|doc| serde_json::from_str(&doc).map_err(StoreError::from))
            .transpose()
    }

    pub async fn put_custom_structure(
        &self,
        structure: &CustomExpenseStructure,
    ) -> Result<(), StoreError> {
        let doc = serde_json::to_string(structure)?;
        self.run(move |db| db.put(Collection::CustomStructure, CUSTOM_STRUCTURE_KEY, &doc))
            .await
    }

    pub async fn get_setting<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let key = key.to_string();
        let doc = self.run(move |db| db.get(Collection::Settings, &key)).await?;
        doc.map(|doc| serde_json::from_str(&doc).map_err(StoreError::from))
            .transpose()
    }

    pub async fn set_setting<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let key = key.to_string();
        let doc = serde_json::to_string(value)?;
        self.run(move |db| db.put(Collection::Settings, &key, &doc)).await
    }

    pub async fn get_all_settings(&self) -> Result<Vec<(String, Value)>, StoreError> {
        let docs = self.run(|db| db.get_all(Collection::Settings)).await?;
        docs.into_iter()
            .map(|(key, doc)| -> Result<(String, Value), StoreError> {
                Ok((key, serde_json::from_str(&doc)?))
            })
            .collect()
    }

    pub async fn delete_setting(&self, key: &str) -> Result<bool, StoreError> {
        let key = key.to_string();
        self.run(move |db| db.delete(Collection::Settings, &key)).await
    }

    /// Replaces every record and the custom structure in one transaction.
    pub async fn replace_all(
        &self,
        records: &[DailyRecord],
        structure: &CustomExpenseStructure,
    ) -> Result<(), StoreError> {
        let docs = records
            .iter()
            .map(encode_record)
            .collect::<Result<Vec<Doc>, _>>()?;
        let structure_doc = serde_json::to_string(structure)?;
        self.run(move |db| db.replace_all(&docs, &structure_doc)).await
    }
}

fn encode_record(record: &DailyRecord) -> Result<Doc, StoreError> {
    if !is_record_date(&record.id) {
        return Err(StoreError::InvalidRecord {
            id: record.id.clone(),
            reason: "id must be a YYYY-MM-DD date".to_string(),
        });
    }
    if record.id != record.date {
        return Err(StoreError::InvalidRecord {
            id: record.id.clone(),
            reason: format!("id does not match date {}", record.date),
        });
    }
    Ok((record.id.clone(), serde_json::to_string(record)?))
}
