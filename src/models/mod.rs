use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::utils::{round_currency, to_cents};

/// Backup document format tag written by this build.
pub const CURRENT_BACKUP_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseItem {
    pub id: String,
    pub name: String,
    pub amount: f64,
    #[serde(default)]
    pub photos: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseCategory {
    pub id: String,
    pub name: String,
    pub items: Vec<ExpenseItem>,
}

/// One day of the ledger. `id` and `date` are the same `YYYY-MM-DD` string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub id: String,
    pub date: String,
    pub total_sales: f64,
    pub morning_sales: f64,
    pub is_closed: bool,
    pub expenses: Vec<ExpenseCategory>,
}

impl DailyRecord {
    pub fn new(date: &str) -> Self {
        DailyRecord {
            id: date.to_string(),
            date: date.to_string(),
            total_sales: 0.0,
            morning_sales: 0.0,
            is_closed: false,
            expenses: Vec::new(),
        }
    }

    /// Derived, never stored.
    pub fn night_sales(&self) -> f64 {
        round_currency(self.total_sales - self.morning_sales)
    }

    pub fn total_expenses(&self) -> f64 {
        calculate_total_expenses(&self.expenses)
    }

    pub fn totals(&self) -> RecordTotals {
        let total_expenses = self.total_expenses();
        RecordTotals {
            total_sales: round_currency(self.total_sales),
            morning_sales: round_currency(self.morning_sales),
            night_sales: self.night_sales(),
            total_expenses,
            profit: round_currency(self.total_sales - total_expenses),
        }
    }
}

/// Sums every item amount in whole cents, so the result does not depend on
/// category or item order and carries no floating-point drift. Saturates
/// instead of overflowing.
pub fn calculate_total_expenses(categories: &[ExpenseCategory]) -> f64 {
    let cents = categories
        .iter()
        .flat_map(|category| category.items.iter())
        .map(|item| to_cents(item.amount))
        .fold(0i64, i64::saturating_add);
    cents as f64 / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureEntry {
    pub name: String,
    pub default_value: f64,
}

/// Template for new records: category name to its ordered entries. Categories
/// keep the order they were entered in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomExpenseStructure(pub IndexMap<String, Vec<StructureEntry>>);

impl CustomExpenseStructure {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn categories(&self) -> impl Iterator<Item = (&String, &Vec<StructureEntry>)> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GasLogType {
    Refill,
    Connect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasLog {
    pub id: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: GasLogType,
    pub count: i64,
}

impl GasLog {
    /// Signed effect on cylinder stock.
    pub fn stock_delta(&self) -> i64 {
        match self.kind {
            GasLogType::Refill => self.count,
            GasLogType::Connect => -self.count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupData {
    pub version: u32,
    pub records: Vec<DailyRecord>,
    pub custom_structure: CustomExpenseStructure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub currency: String,
    pub last_backup_at: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            currency: "USD".to_string(),
            last_backup_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordTotals {
    pub total_sales: f64,
    pub morning_sales: f64,
    pub night_sales: f64,
    pub total_expenses: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    pub year_month: String,
    pub record_count: usize,
    pub closed_count: usize,
    pub total_sales: f64,
    pub total_expenses: f64,
    pub profit: f64,
}
