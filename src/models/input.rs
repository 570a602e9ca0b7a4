//! Lenient numeric input and text rules
//!
//! Counts and durations arrive from librarian forms as numbers or as text.
//! Coercion never fails: unusable input yields `None` and the caller picks
//! the fallback. Text fields are strict instead: a blank name is rejected.

use serde_json::Value;
use validator::ValidationError;

/// Read an integer from a JSON number or a numeric string.
///
/// Fractional numbers and strings with trailing garbage are rejected.
pub fn coerce_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Validation rule for names and titles: whitespace alone is not a value
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
