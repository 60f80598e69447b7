//! Structural checks for untrusted JSON. Every check is a plain predicate:
//! it never fails, extra fields are ignored, and known legacy shapes pass.

use jsonschema::JSONSchema;
use serde_json::{json, Value};
use std::sync::OnceLock;

static EXPENSE_ITEM: OnceLock<Option<JSONSchema>> = OnceLock::new();
static EXPENSE_CATEGORY: OnceLock<Option<JSONSchema>> = OnceLock::new();
static DAILY_RECORD: OnceLock<Option<JSONSchema>> = OnceLock::new();
static CUSTOM_STRUCTURE: OnceLock<Option<JSONSchema>> = OnceLock::new();
static BACKUP_DATA: OnceLock<Option<JSONSchema>> = OnceLock::new();

/// Largest magnitude accepted for any money field; keeps cent sums in `i64`.
pub const MAX_AMOUNT: f64 = 1e12;

pub fn is_expense_item(value: &Value) -> bool {
    validate_json(&EXPENSE_ITEM, expense_item_schema, value)
}

pub fn is_expense_category(value: &Value) -> bool {
    validate_json(&EXPENSE_CATEGORY, expense_category_schema, value)
}

/// `morningSales` and `isClosed` may be missing; backfilling them is the
/// migrator's job.
pub fn is_daily_record(value: &Value) -> bool {
    validate_json(&DAILY_RECORD, daily_record_schema, value)
}

/// An object whose values are all string lists (legacy) or all
/// `{name, defaultValue}` lists (current).
pub fn is_custom_structure(value: &Value) -> bool {
    validate_json(&CUSTOM_STRUCTURE, custom_structure_schema, value)
}

pub fn is_backup_data(value: &Value) -> bool {
    validate_json(&BACKUP_DATA, backup_data_schema, value)
}

/// A bare array of records, the oldest export format.
pub fn is_legacy_record_list(value: &Value) -> bool {
    value
        .as_array()
        .map(|records| records.iter().all(is_daily_record))
        .unwrap_or(false)
}

fn validate_json(
    cell: &'static OnceLock<Option<JSONSchema>>,
    schema: fn() -> Value,
    value: &Value,
) -> bool {
    cell.get_or_init(|| compile(&schema()))
        .as_ref()
        .map(|compiled| compiled.is_valid(value))
        .unwrap_or(false)
}

fn compile(schema: &Value) -> Option<JSONSchema> {
    match JSONSchema::compile(schema) {
        Ok(compiled) => Some(compiled),
        Err(e) => {
            tracing::error!(error = %e, "validator schema failed to compile");
            None
        }
    }
}

fn amount_schema() -> Value {
    json!({"type": "number", "minimum": -MAX_AMOUNT, "maximum": MAX_AMOUNT})
}

fn expense_item_schema() -> Value {
    json!({
        "type": "object",
        "required": ["id", "name", "amount"],
        "properties": {
            "id": {"type": "string"},
            "name": {"type": "string"},
            "amount": amount_schema(),
            "photo": {"type": ["string", "null"]},
            "photos": {"type": "array", "items": {"type": "string"}}
        }
    })
}

fn expense_category_schema() -> Value {
    json!({
        "type": "object",
        "required": ["id", "name", "items"],
        "properties": {
            "id": {"type": "string"},
            "name": {"type": "string"},
            "items": {"type": "array", "items": expense_item_schema()}
        }
    })
}

fn daily_record_schema() -> Value {
    json!({
        "type": "object",
        "required": ["id", "date", "totalSales"],
        "properties": {
            "id": {"type": "string"},
            "date": {"type": "string"},
            "totalSales": amount_schema(),
            "morningSales": {
                "type": ["number", "null"],
                "minimum": -MAX_AMOUNT,
                "maximum": MAX_AMOUNT
            },
            "isClosed": {"type": ["boolean", "null"]},
            "expenses": {
                "type": ["array", "null"],
                "items": expense_category_schema()
            }
        }
    })
}

fn custom_structure_schema() -> Value {
    json!({
        "type": "object",
        "anyOf": [
            {
                "additionalProperties": {
                    "type": "array",
                    "items": {"type": "string"}
                }
            },
            {
                "additionalProperties": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["name", "defaultValue"],
                        "properties": {
                            "name": {"type": "string"},
                            "defaultValue": amount_schema()
                        }
                    }
                }
            }
        ]
    })
}

fn backup_data_schema() -> Value {
    json!({
        "type": "object",
        "required": ["version", "records", "customStructure"],
        "properties": {
            "version": {"type": "number", "minimum": 0, "multipleOf": 1},
            "records": {"type": "array", "items": daily_record_schema()},
            "customStructure": custom_structure_schema()
        }
    })
}
