use chrono::{NaiveDate, Utc};
use sha2::{Digest, Sha256};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

pub fn today() -> String {
    Utc::now().date_naive().format(DATE_FORMAT).to_string()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn format_decimal(value: f64) -> String {
    format!("{:.2}", value)
}

pub fn to_cents(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

/// Canonical 2-decimal currency rounding.
pub fn round_currency(value: f64) -> f64 {
    to_cents(value) as f64 / 100.0
}

/// True for a real calendar date written exactly as `YYYY-MM-DD`.
pub fn is_record_date(value: &str) -> bool {
    value.len() == 10 && NaiveDate::parse_from_str(value, DATE_FORMAT).is_ok()
}

/// Accepts the date spellings people type and returns `YYYY-MM-DD`.
pub fn normalize_date(value: &str) -> Option<String> {
    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    let formats = [DATE_FORMAT, "%d.%m.%Y", "%d/%m/%Y", "%Y/%m/%d", "%Y.%m.%d"];
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(|date| date.format(DATE_FORMAT).to_string())
}
