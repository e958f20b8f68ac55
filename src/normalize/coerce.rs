// src/normalize/coerce.rs
//
// Total coercions: every function returns `None` instead of failing.

use serde_json::Value;
use std::borrow::Cow;

pub const BEV_LABEL: &str = "Battery Electric Vehicle (BEV)";
pub const PHEV_LABEL: &str = "Plug-in Hybrid Electric Vehicle (PHEV)";

/// Text form of a cell: strings verbatim, scalars as JSON text, `null` as `None`.
pub fn value_text(v: &Value) -> Option<Cow<'_, str>> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        other => Some(Cow::Owned(other.to_string())),
    }
}

/// Owned text attribute.
pub fn to_text(v: Option<&Value>) -> Option<String> {
    v.and_then(value_text).map(Cow::into_owned)
}

fn trimmed(v: Option<&Value>) -> Option<Cow<'_, str>> {
    let text = match v.and_then(value_text)? {
        Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
        Cow::Owned(s) => Cow::Owned(s.trim().to_string()),
    };
    (!text.is_empty()).then_some(text)
}

/// Base-10 integer, whitespace trimmed. `"2020.0"` is not an integer.
pub fn to_int(v: Option<&Value>) -> Option<i32> {
    trimmed(v)?.parse().ok()
}

/// Decimal with thousands separators removed. Non-finite values are rejected.
pub fn to_decimal(v: Option<&Value>) -> Option<f64> {
    let cleaned = trimmed(v)?.replace(',', "");
    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|x| x.is_finite())
}

/// Collapse the dataset's vehicle-type wording onto the two report labels.
pub fn normalize_ev_type(v: Option<&Value>) -> Option<String> {
    let s = trimmed(v)?;
    if s.starts_with("Battery Electric") {
        Some(BEV_LABEL.to_string())
    } else if s.starts_with("Plug-in Hybrid") {
        Some(PHEV_LABEL.to_string())
    } else {
        Some(s.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integers() {
        let row = [json!("123"), Value::Null, json!("45")];
        assert_eq!(to_int(Some(&row[0])), Some(123));
        assert_eq!(to_int(Some(&row[1])), None);
        assert_eq!(to_int(Some(&row[2])), Some(45));
        assert_eq!(to_int(Some(&json!("  2021 "))), Some(2021));
        assert_eq!(to_int(Some(&json!(0))), Some(0));
        assert_eq!(to_int(Some(&json!(""))), None);
        assert_eq!(to_int(Some(&json!("   "))), None);
        assert_eq!(to_int(Some(&json!("12a"))), None);
        assert_eq!(to_int(Some(&json!("2020.0"))), None);
        assert_eq!(to_int(Some(&json!(true))), None);
        assert_eq!(to_int(None), None);
    }

    #[test]
    fn decimals() {
        assert_eq!(to_decimal(Some(&json!("1,234.50"))), Some(1234.50));
        assert_eq!(to_decimal(Some(&json!(" 69,900 "))), Some(69900.0));
        assert_eq!(to_decimal(Some(&json!(31950))), Some(31950.0));
        assert_eq!(to_decimal(Some(&json!("0"))), Some(0.0));
        assert_eq!(to_decimal(Some(&json!(""))), None);
        assert_eq!(to_decimal(Some(&json!("n/a"))), None);
        assert_eq!(to_decimal(Some(&json!("NaN"))), None);
        assert_eq!(to_decimal(Some(&json!("inf"))), None);
        assert_eq!(to_decimal(None), None);
    }

    #[test]
    fn vehicle_types() {
        assert_eq!(
            normalize_ev_type(Some(&json!("Battery Electric Vehicle"))).as_deref(),
            Some(BEV_LABEL)
        );
        assert_eq!(
            normalize_ev_type(Some(&json!("Plug-in Hybrid Electric Vehicle"))).as_deref(),
            Some(PHEV_LABEL)
        );
        assert_eq!(
            normalize_ev_type(Some(&json!("  Battery Electric Vehicle (BEV) "))).as_deref(),
            Some(BEV_LABEL)
        );
        assert_eq!(
            normalize_ev_type(Some(&json!(" Hybrid "))).as_deref(),
            Some("Hybrid")
        );
        assert_eq!(normalize_ev_type(Some(&json!(""))), None);
        assert_eq!(normalize_ev_type(None), None);
    }

    #[test]
    fn text_cells() {
        assert_eq!(to_text(Some(&json!(" King "))).as_deref(), Some(" King "));
        assert_eq!(to_text(Some(&json!(98101))).as_deref(), Some("98101"));
        assert_eq!(to_text(Some(&json!(["a"]))).as_deref(), Some(r#"["a"]"#));
        assert_eq!(to_text(Some(&Value::Null)), None);
        assert_eq!(to_text(None), None);
    }
}
