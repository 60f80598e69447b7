use anyhow::{Context, Result};
use csv::Writer;

use crate::models::DailyRecord;
use crate::utils::format_decimal;

const HEADER: [&str; 10] = [
    "Date",
    "Total Sales",
    "Morning Sales",
    "Night Sales",
    "Total Expenses",
    "Profit/Loss",
    "Expense Category",
    "Expense Item",
    "Expense Amount",
    "Bill Photo Attached",
];

/// One row per non-zero expense item, oldest date first. Summary columns are
/// only filled on the first row of each record.
pub fn export_records_csv(records: &[DailyRecord]) -> Result<String> {
    let mut sorted: Vec<&DailyRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));

    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;

    for record in sorted {
        let totals = record.totals();
        let summary = [
            record.date.clone(),
            format_decimal(totals.total_sales),
            format_decimal(totals.morning_sales),
            format_decimal(totals.night_sales),
            format_decimal(totals.total_expenses),
            format_decimal(totals.profit),
        ];

        let items: Vec<_> = record
            .expenses
            .iter()
            .flat_map(|category| category.items.iter().map(move |item| (category, item)))
            .filter(|(_, item)| item.amount != 0.0)
            .collect();

        if items.is_empty() {
            let mut row = summary.to_vec();
            row.extend(["N/A", "N/A", "N/A", "N/A"].map(String::from));
            writer.write_record(&row)?;
            continue;
        }

        for (index, (category, item)) in items.into_iter().enumerate() {
            let mut row = if index == 0 {
                summary.to_vec()
            } else {
                vec![String::new(); summary.len()]
            };
            row.push(category.name.clone());
            row.push(item.name.clone());
            row.push(format_decimal(item.amount));
            row.push(if item.photos.is_empty() { "No" } else { "Yes" }.to_string());
            writer.write_record(&row)?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e))?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}
