use chrono::{Datelike, Months, NaiveDate};

use crate::models::{DailyRecord, MonthlySummary};
use crate::utils::{round_currency, to_cents, DATE_FORMAT};

/// Totals for every record whose date falls in `year_month` (`YYYY-MM`).
pub fn monthly_summary(records: &[DailyRecord], year_month: &str) -> MonthlySummary {
    let prefix = format!("{}-", year_month);
    let mut record_count = 0;
    let mut closed_count = 0;
    let mut sales_cents = 0i64;
    let mut expense_cents = 0i64;

    for record in records.iter().filter(|r| r.date.starts_with(&prefix)) {
        record_count += 1;
        if record.is_closed {
            closed_count += 1;
        }
        sales_cents = sales_cents.saturating_add(to_cents(record.total_sales));
        expense_cents = expense_cents.saturating_add(to_cents(record.total_expenses()));
    }

    MonthlySummary {
        year_month: year_month.to_string(),
        record_count,
        closed_count,
        total_sales: sales_cents as f64 / 100.0,
        total_expenses: expense_cents as f64 / 100.0,
        profit: round_currency(sales_cents.saturating_sub(expense_cents) as f64 / 100.0),
    }
}

/// The `months` months ending at `year_month`, oldest first.
pub fn month_series(
    records: &[DailyRecord],
    year_month: &str,
    months: u32,
) -> Option<Vec<MonthlySummary>> {
    let base = NaiveDate::parse_from_str(&format!("{}-01", year_month), DATE_FORMAT).ok()?;

    (0..months)
        .rev()
        .map(|offset| {
            let date = base.checked_sub_months(Months::new(offset))?;
            let ym = format!("{}-{:02}", date.year(), date.month());
            Some(monthly_summary(records, &ym))
        })
        .collect()
}
