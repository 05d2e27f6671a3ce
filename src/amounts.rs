use serde_json::Value;

/// Converts a spreadsheet cell into an amount.
///
/// Numbers pass through unchanged (negatives included). Strings have their comma
/// thousands-separators stripped before parsing. Anything unparsable, null, or
/// non-finite becomes `0.0`, so the result is never NaN.
pub fn clean_amount(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_amount_str(s),
        _ => 0.0,
    };

    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

/// Same rules as [`clean_amount`] for a cell that may be absent.
pub fn clean_optional_amount(value: Option<&Value>) -> f64 {
    value.map(clean_amount).unwrap_or(0.0)
}

fn parse_amount_str(raw: &str) -> f64 {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return 0.0;
    }
    cleaned.parse::<f64>().unwrap_or(0.0)
}
