use crate::db::Store;
use crate::error::StoreError;
use crate::models::{CustomExpenseStructure, DailyRecord, ExpenseCategory, ExpenseItem};
use crate::services::migrator::{
    migrate_record, migrate_records, migrate_structure, StoredDailyRecord, StoredStructure,
};

/// Records and the custom structure, read through the migrator.
#[derive(Clone)]
pub struct Ledger {
    store: Store,
}

impl Ledger {
    pub fn new(store: Store) -> Self {
        Ledger { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Full snapshot, oldest date first. Documents still in a legacy shape are
    /// upgraded and written back in one batch.
    pub async fn load_records(&self) -> Result<Vec<DailyRecord>, StoreError> {
        let docs = self.store.get_all_records().await?;
        let stored = docs
            .into_iter()
            .map(serde_json::from_value::<StoredDailyRecord>)
            .collect::<Result<Vec<_>, _>>()?;

        let migrated = migrate_records(stored);
        if migrated.changed {
            self.store.bulk_put_records(&migrated.value).await?;
            tracing::info!(count = migrated.value.len(), "re-saved migrated records");
        }
        for item in &migrated.review_items {
            tracing::warn!(item = %item, "stored item needs review: both photo fields were set");
        }
        Ok(migrated.value)
    }

    pub async fn get_record(&self, date: &str) -> Result<Option<DailyRecord>, StoreError> {
        let Some(doc) = self.store.get_record(date).await? else {
            return Ok(None);
        };
        let migrated = migrate_record(serde_json::from_value(doc)?);
        if migrated.changed {
            self.store.put_record(&migrated.value).await?;
        }
        Ok(Some(migrated.value))
    }

    /// Create-or-replace of the whole record document.
    pub async fn save_record(&self, record: &DailyRecord) -> Result<(), StoreError> {
        self.store.put_record(record).await
    }

    pub async fn delete_record(&self, date: &str) -> Result<bool, StoreError> {
        let removed = self.store.delete_record(date).await?;
        if removed {
            tracing::info!(record = %date, "record deleted");
        }
        Ok(removed)
    }

    /// Adds or replaces the given records without touching any others.
    pub async fn import_records(&self, records: &[DailyRecord]) -> Result<usize, StoreError> {
        self.store.bulk_put_records(records).await?;
        tracing::info!(count = records.len(), "records imported");
        Ok(records.len())
    }

    pub async fn load_structure(&self) -> Result<CustomExpenseStructure, StoreError> {
        let Some(doc) = self.store.get_custom_structure().await? else {
            return Ok(CustomExpenseStructure::default());
        };
        let stored: StoredStructure = serde_json::from_value(doc)?;
        let migrated = migrate_structure(stored);
        if migrated.changed {
            self.store.put_custom_structure(&migrated.value).await?;
        }
        Ok(migrated.value)
    }

    pub async fn save_structure(&self, structure: &CustomExpenseStructure) -> Result<(), StoreError> {
        self.store.put_custom_structure(structure).await
    }

    pub async fn new_record(&self, date: &str) -> Result<DailyRecord, StoreError> {
        let structure = self.load_structure().await?;
        Ok(record_from_template(date, &structure))
    }
}

/// A fresh record for `date` with one category per template entry list,
/// each item pre-filled with its default value.
pub fn record_from_template(date: &str, structure: &CustomExpenseStructure) -> DailyRecord {
    let mut record = DailyRecord::new(date);
    record.expenses = structure
        .categories()
        .map(|(name, entries)| ExpenseCategory {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.clone(),
            items: entries
                .iter()
                .map(|entry| ExpenseItem {
                    id: uuid::Uuid::new_v4().to_string(),
                    name: entry.name.clone(),
                    amount: entry.default_value,
                    photos: Vec::new(),
                })
                .collect(),
        })
        .collect();
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Collection, Database, CUSTOM_STRUCTURE_KEY};
    use crate::models::StructureEntry;
    use tempfile::TempDir;

    async fn setup_test_ledger() -> (Ledger, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open(&temp_dir.path().join("daybook.sqlite"))
            .await
            .unwrap();
        (Ledger::new(store), temp_dir)
    }

    #[tokio::test]
    async fn legacy_documents_are_migrated_and_resaved() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("daybook.sqlite");
        {
            let db = Database::new(&path).unwrap();
            db.put(
                Collection::Records,
                "2023-05-01",
                r#"{"id":"2023-05-01","date":"2023-05-01","totalSales":300,
                    "expenses":[{"id":"c","name":"Kitchen","items":[
                        {"id":"i","name":"Milk","amount":4.5,"photo":"img"}]}]}"#,
            )
            .unwrap();
            db.put(
                Collection::CustomStructure,
                CUSTOM_STRUCTURE_KEY,
                r#"{"Kitchen":["Milk","Bread"]}"#,
            )
            .unwrap();
        }

        let ledger = Ledger::new(Store::open(&path).await.unwrap());
        let records = ledger.load_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].morning_sales, 0.0);
        assert_eq!(records[0].expenses[0].items[0].photos, vec!["img".to_string()]);

        let raw = ledger.store().get_record("2023-05-01").await.unwrap().unwrap();
        assert_eq!(raw["isClosed"], false);
        assert!(raw["expenses"][0]["items"][0].get("photo").is_none());

        let structure = ledger.load_structure().await.unwrap();
        assert_eq!(structure.0["Kitchen"][1].name, "Bread");
        let raw_structure = ledger.store().get_custom_structure().await.unwrap().unwrap();
        assert_eq!(raw_structure["Kitchen"][0]["defaultValue"], 0.0);
    }

    #[tokio::test]
    async fn save_get_delete_round_trip() {
        let (ledger, _temp_dir) = setup_test_ledger().await;
        let mut record = DailyRecord::new("2024-07-20");
        record.total_sales = 900.0;
        ledger.save_record(&record).await.unwrap();

        assert_eq!(ledger.get_record("2024-07-20").await.unwrap(), Some(record));
        assert!(ledger.delete_record("2024-07-20").await.unwrap());
        assert!(ledger.get_record("2024-07-20").await.unwrap().is_none());
        assert!(!ledger.delete_record("2024-07-20").await.unwrap());
    }

    #[tokio::test]
    async fn template_keeps_category_entry_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("daybook.sqlite");
        {
            let db = Database::new(&path).unwrap();
            db.put(
                Collection::CustomStructure,
                CUSTOM_STRUCTURE_KEY,
                r#"{"Rent":["Shop"],"Kitchen":["Milk"],"Bar":["Ice"]}"#,
            )
            .unwrap();
        }

        let ledger = Ledger::new(Store::open(&path).await.unwrap());
        let structure = ledger.load_structure().await.unwrap();
        let names: Vec<&str> = structure.0.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Rent", "Kitchen", "Bar"]);

        let reloaded = ledger.load_structure().await.unwrap();
        let record = record_from_template("2024-07-22", &reloaded);
        let categories: Vec<&str> = record.expenses.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(categories, vec!["Rent", "Kitchen", "Bar"]);
    }

    #[tokio::test]
    async fn new_record_follows_template() {
        let (ledger, _temp_dir) = setup_test_ledger().await;
        let mut structure = CustomExpenseStructure::default();
        structure.0.insert(
            "Kitchen".to_string(),
            vec![
                StructureEntry {
                    name: "Milk".to_string(),
                    default_value: 20.0,
                },
                StructureEntry {
                    name: "Gas".to_string(),
                    default_value: 0.0,
                },
            ],
        );
        ledger.save_structure(&structure).await.unwrap();

        let record = ledger.new_record("2024-07-21").await.unwrap();
        assert_eq!(record.id, "2024-07-21");
        assert_eq!(record.expenses.len(), 1);
        let items = &record.expenses[0].items;
        assert_eq!(items[0].name, "Milk");
        assert_eq!(items[0].amount, 20.0);
        assert_eq!(items[1].amount, 0.0);
        assert_ne!(items[0].id, items[1].id);
    }
}
