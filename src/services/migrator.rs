//! Upgrades stored or imported documents into the current in-memory shapes.
//! Legacy shapes are resolved here once; nothing downstream sees them.

use serde::{Deserialize, Serialize};
use indexmap::IndexMap;

use crate::models::{
    CustomExpenseStructure, DailyRecord, ExpenseCategory, ExpenseItem, StructureEntry,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredExpenseItem {
    pub id: String,
    pub name: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredExpenseCategory {
    pub id: String,
    pub name: String,
    pub items: Vec<StoredExpenseItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDailyRecord {
    pub id: String,
    pub date: String,
    pub total_sales: f64,
    #[serde(default)]
    pub morning_sales: Option<f64>,
    #[serde(default)]
    pub is_closed: Option<bool>,
    #[serde(default)]
    pub expenses: Option<Vec<StoredExpenseCategory>>,
}

/// Photo attachment of a stored item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemPhotos {
    LegacySinglePhoto(String),
    CurrentPhotoList(Vec<String>),
}

impl ItemPhotos {
    pub fn into_list(self) -> Vec<String> {
        match self {
            ItemPhotos::LegacySinglePhoto(photo) if photo.is_empty() => Vec::new(),
            ItemPhotos::LegacySinglePhoto(photo) => vec![photo],
            ItemPhotos::CurrentPhotoList(photos) => photos,
        }
    }
}

/// Values of a stored custom structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StructureEntries {
    CurrentStructuredList(Vec<StructureEntry>),
    LegacyStringList(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredStructure(pub IndexMap<String, StructureEntries>);

#[derive(Debug, Clone, PartialEq)]
pub struct Migrated<T> {
    pub value: T,
    /// Whether anything was added, converted, or removed.
    pub changed: bool,
    /// Item ids that carried both photo fields; `photos` won.
    pub review_items: Vec<String>,
}

pub fn migrate_structure(stored: StoredStructure) -> Migrated<CustomExpenseStructure> {
    let mut changed = false;
    let categories = stored
        .0
        .into_iter()
        .map(|(category, entries)| {
            let entries = match entries {
                StructureEntries::CurrentStructuredList(entries) => entries,
                StructureEntries::LegacyStringList(names) => {
                    changed = changed || !names.is_empty();
                    names
                        .into_iter()
                        .map(|name| StructureEntry {
                            name,
                            default_value: 0.0,
                        })
                        .collect()
                }
            };
            (category, entries)
        })
        .collect();

    if changed {
        tracing::info!("migrated custom structure from string lists");
    }
    Migrated {
        value: CustomExpenseStructure(categories),
        changed,
        review_items: Vec::new(),
    }
}

/// Each backfill is gated on its own field.
pub fn migrate_record(stored: StoredDailyRecord) -> Migrated<DailyRecord> {
    let mut changed = false;
    let mut review_items = Vec::new();

    let morning_sales = stored.morning_sales.unwrap_or_else(|| {
        changed = true;
        0.0
    });
    let is_closed = stored.is_closed.unwrap_or_else(|| {
        changed = true;
        false
    });
    let categories = stored.expenses.unwrap_or_else(|| {
        changed = true;
        Vec::new()
    });

    let expenses = categories
        .into_iter()
        .map(|category| ExpenseCategory {
            id: category.id,
            name: category.name,
            items: category
                .items
                .into_iter()
                .map(|item| {
                    let item = migrate_item(item);
                    changed = changed || item.changed;
                    review_items.extend(item.review_items);
                    item.value
                })
                .collect(),
        })
        .collect();

    Migrated {
        value: DailyRecord {
            id: stored.id,
            date: stored.date,
            total_sales: stored.total_sales,
            morning_sales,
            is_closed,
            expenses,
        },
        changed,
        review_items,
    }
}

fn migrate_item(item: StoredExpenseItem) -> Migrated<ExpenseItem> {
    let mut review_items = Vec::new();
    let (photos, changed) = match (item.photo, item.photos) {
        (Some(_), Some(photos)) => {
            tracing::warn!(item = %item.id, "item carries both photo fields; keeping photos");
            review_items.push(item.id.clone());
            (ItemPhotos::CurrentPhotoList(photos), true)
        }
        (Some(photo), None) => (ItemPhotos::LegacySinglePhoto(photo), true),
        (None, Some(photos)) => (ItemPhotos::CurrentPhotoList(photos), false),
        (None, None) => (ItemPhotos::CurrentPhotoList(Vec::new()), false),
    };

    Migrated {
        value: ExpenseItem {
            id: item.id,
            name: item.name,
            amount: item.amount,
            photos: photos.into_list(),
        },
        changed,
        review_items,
    }
}

/// Migrates a batch and reports which record ids changed.
pub fn migrate_records(stored: Vec<StoredDailyRecord>) -> Migrated<Vec<DailyRecord>> {
    let mut updated = 0usize;
    let mut review_items = Vec::new();
    let records: Vec<DailyRecord> = stored
        .into_iter()
        .map(|record| {
            let migrated = migrate_record(record);
            if migrated.changed {
                updated += 1;
            }
            review_items.extend(migrated.review_items);
            migrated.value
        })
        .collect();

    if updated > 0 {
        tracing::info!(updated, total = records.len(), "migrated legacy records");
    }
    Migrated {
        value: records,
        changed: updated > 0,
        review_items,
    }
}

impl From<DailyRecord> for StoredDailyRecord {
    fn from(record: DailyRecord) -> Self {
        StoredDailyRecord {
            id: record.id,
            date: record.date,
            total_sales: record.total_sales,
            morning_sales: Some(record.morning_sales),
            is_closed: Some(record.is_closed),
            expenses: Some(
                record
                    .expenses
                    .into_iter()
                    .map(|category| StoredExpenseCategory {
                        id: category.id,
                        name: category.name,
                        items: category
                            .items
                            .into_iter()
                            .map(|item| StoredExpenseItem {
                                id: item.id,
                                name: item.name,
                                amount: item.amount,
                                photo: None,
                                photos: Some(item.photos),
                            })
                            .collect(),
                    })
                    .collect(),
            ),
        }
    }
}
