use anyhow::{anyhow, Result};
use chrono::{Datelike, Local};

use crate::models::MonthlySummary;
use crate::services::state::AppState;
use crate::services::summary::month_series;

/// Monthly totals for the `months` months ending at `year_month` (default: this month).
pub async fn get_monthly_summary(
    state: &AppState,
    year_month: Option<String>,
    months: u32,
) -> Result<Vec<MonthlySummary>> {
    let now = Local::now();
    let current_year_month =
        year_month.unwrap_or_else(|| format!("{}-{:02}", now.year(), now.month()));

    let records = state.ledger.load_records().await?;
    month_series(&records, &current_year_month, months.max(1))
        .ok_or_else(|| anyhow!("Invalid month: {}", current_year_month))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use crate::models::{AppSettings, DailyRecord};
    use tempfile::TempDir;

    #[tokio::test]
    async fn summarizes_requested_month() {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open(&temp_dir.path().join("daybook.sqlite"))
            .await
            .unwrap();
        let state = AppState::new(store, AppSettings::default());
        let mut record = DailyRecord::new("2024-03-10");
        record.total_sales = 250.0;
        state.ledger.save_record(&record).await.unwrap();

        let summary = get_monthly_summary(&state, Some("2024-03".to_string()), 1)
            .await
            .unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].total_sales, 250.0);
        assert!(get_monthly_summary(&state, Some("March".to_string()), 1)
            .await
            .is_err());
    }
}
