//! Coercion table for built-in field types.
//!
//! Casts are loose: strings convert to numbers through their leading numeric
//! prefix, and nothing here ever fails. A value counts as absent when the key
//! is missing or holds `null`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::types::FieldType;
use super::Record;

/// Leading numeric prefix of a string, after optional whitespace.
static NUMERIC_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?").unwrap());

/// Significant digits kept when stringifying a float.
const FLOAT_PRECISION: i32 = 14;

/// True when the value is present and not `null`.
pub fn is_set(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}

/// Bools, numbers and strings.
pub fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::Bool(_) | Value::Number(_) | Value::String(_))
}

/// Cast a record field to a built-in type.
pub fn cast_field(field_type: FieldType, row: &Record, field: &str, nullable: bool) -> Value {
    let value = row.get(field);
    if nullable && !is_set(value) {
        return Value::Null;
    }
    let value = value.unwrap_or(&Value::Null);

    match field_type {
        FieldType::String => Value::String(to_string(value)),
        FieldType::Float => float_value(to_float(value)),
        FieldType::Integer => Value::from(to_int(value)),
        FieldType::Boolean => Value::Bool(to_bool(value)),
        FieldType::Array => to_array(value),
    }
}

/// String form of a value. `null` is the empty string.
pub fn to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if !n.is_i64() && !n.is_u64() => format_float(f),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

pub fn to_int(value: &Value) -> i64 {
    match value {
        Value::Null => 0,
        Value::Bool(b) => i64::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i
            } else if n.is_u64() {
                i64::MAX
            } else {
                // `as` truncates toward zero and saturates; NaN becomes 0
                n.as_f64().map(|f| f as i64).unwrap_or(0)
            }
        }
        Value::String(s) => parse_int_prefix(s),
        Value::Array(items) => i64::from(!items.is_empty()),
        Value::Object(map) => i64::from(!map.is_empty()),
    }
}

pub fn to_float(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_float_prefix(s),
        Value::Array(items) => f64::from(u8::from(!items.is_empty())),
        Value::Object(map) => f64::from(u8::from(!map.is_empty())),
    }
}

/// Truthiness. `""` and `"0"` are the only false strings.
pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !(s.is_empty() || s == "0"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Lists and objects pass through; `null` is empty; scalars are wrapped.
pub fn to_array(value: &Value) -> Value {
    match value {
        Value::Null => Value::Array(Vec::new()),
        Value::Array(_) | Value::Object(_) => value.clone(),
        scalar => Value::Array(vec![scalar.clone()]),
    }
}

/// JSON number for a float, with non-finite values mapped to `0.0`.
pub fn float_value(f: f64) -> Value {
    Value::from(if f.is_finite() { f } else { 0.0 })
}

/// Floats print with 14 significant digits. Exponents below -4 or of 14
/// and above switch to `1.0E+20` notation.
fn format_float(f: f64) -> String {
    if f == 0.0 {
        return "0".to_string();
    }
    let digits = (FLOAT_PRECISION - 1) as usize;
    let scientific = format!("{:.*e}", digits, f);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= FLOAT_PRECISION {
        let mantissa = trim_fraction(mantissa);
        let mantissa = if mantissa.contains('.') {
            mantissa.to_string()
        } else {
            format!("{mantissa}.0")
        };
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}E{sign}{}", exponent.abs())
    } else {
        let decimals = (FLOAT_PRECISION - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, f)).to_string()
    }
}

/// Drop trailing zeros after the decimal point, and the point itself.
fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn numeric_prefix(s: &str) -> Option<&str> {
    NUMERIC_PREFIX.find(s).map(|m| m.as_str().trim_start())
}

fn parse_int_prefix(s: &str) -> i64 {
    let Some(prefix) = numeric_prefix(s) else {
        return 0;
    };
    if !prefix.contains(['.', 'e', 'E']) {
        if let Ok(i) = prefix.parse::<i64>() {
            return i;
        }
    }
    prefix.parse::<f64>().map(|f| f as i64).unwrap_or(0)
}

fn parse_float_prefix(s: &str) -> f64 {
    numeric_prefix(s)
        .and_then(|prefix| prefix.parse::<f64>().ok())
        .filter(|f| f.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_to_string() {
        assert_eq!(to_string(&json!(null)), "");
        assert_eq!(to_string(&json!(true)), "1");
        assert_eq!(to_string(&json!(false)), "");
        assert_eq!(to_string(&json!(42)), "42");
        assert_eq!(to_string(&json!(-3)), "-3");
        assert_eq!(to_string(&json!(2.0)), "2");
        assert_eq!(to_string(&json!(1.5)), "1.5");
        assert_eq!(to_string(&json!(-0.25)), "-0.25");
        assert_eq!(to_string(&json!("abc")), "abc");
        assert_eq!(to_string(&json!([1, 2])), "[1,2]");
        assert_eq!(to_string(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_to_string_float_precision() {
        assert_eq!(to_string(&json!(0.1 + 0.2)), "0.3");
        assert_eq!(to_string(&json!(1.0 / 3.0)), "0.33333333333333");
        assert_eq!(to_string(&json!(1e15)), "1.0E+15");
        assert_eq!(to_string(&json!(99999999999999.0)), "99999999999999");
        assert_eq!(to_string(&json!(1e20)), "1.0E+20");
        assert_eq!(to_string(&json!(-1.5e-7)), "-1.5E-7");
        assert_eq!(to_string(&json!(0.0001)), "0.0001");
    }

    #[test]
    fn test_to_int() {
        assert_eq!(to_int(&json!("7")), 7);
        assert_eq!(to_int(&json!(" 12abc")), 12);
        assert_eq!(to_int(&json!("3.9")), 3);
        assert_eq!(to_int(&json!("-3.9")), -3);
        assert_eq!(to_int(&json!("1e3")), 1000);
        assert_eq!(to_int(&json!("abc")), 0);
        assert_eq!(to_int(&json!("")), 0);
        assert_eq!(to_int(&json!("99999999999999999999")), i64::MAX);
        assert_eq!(to_int(&json!(4.99)), 4);
        assert_eq!(to_int(&json!(u64::MAX)), i64::MAX);
        assert_eq!(to_int(&json!(true)), 1);
        assert_eq!(to_int(&json!([])), 0);
        assert_eq!(to_int(&json!([0])), 1);
        assert_eq!(to_int(&json!(null)), 0);
    }

    #[test]
    fn test_to_float() {
        assert_eq!(to_float(&json!("1.25")), 1.25);
        assert_eq!(to_float(&json!(".5x")), 0.5);
        assert_eq!(to_float(&json!("2.5e2")), 250.0);
        assert_eq!(to_float(&json!("1e999")), 0.0);
        assert_eq!(to_float(&json!("n/a")), 0.0);
        assert_eq!(to_float(&json!(3)), 3.0);
        assert_eq!(to_float(&json!(false)), 0.0);
    }

    #[test]
    fn test_to_bool() {
        assert!(!to_bool(&json!("")));
        assert!(!to_bool(&json!("0")));
        assert!(to_bool(&json!("false")));
        assert!(to_bool(&json!("0.0")));
        assert!(!to_bool(&json!(0)));
        assert!(!to_bool(&json!(0.0)));
        assert!(to_bool(&json!(-1)));
        assert!(!to_bool(&json!({})));
        assert!(to_bool(&json!({"a": null})));
    }

    #[test]
    fn test_to_array() {
        assert_eq!(to_array(&json!(null)), json!([]));
        assert_eq!(to_array(&json!("x")), json!(["x"]));
        assert_eq!(to_array(&json!([1])), json!([1]));
        assert_eq!(to_array(&json!({"k": 1})), json!({"k": 1}));
    }

    #[test]
    fn test_cast_field_nullable() {
        let r = row(json!({"a": null, "b": "5"}));

        assert_eq!(cast_field(FieldType::Integer, &r, "a", true), Value::Null);
        assert_eq!(cast_field(FieldType::Integer, &r, "missing", true), Value::Null);
        assert_eq!(cast_field(FieldType::Integer, &r, "b", true), json!(5));
        assert_eq!(cast_field(FieldType::Array, &r, "a", true), Value::Null);
    }

    #[test]
    fn test_cast_field_non_nullable_defaults() {
        let r = row(json!({"a": null}));

        assert_eq!(cast_field(FieldType::String, &r, "missing", false), json!(""));
        assert_eq!(cast_field(FieldType::Integer, &r, "a", false), json!(0));
        assert_eq!(cast_field(FieldType::Float, &r, "a", false), json!(0.0));
        assert_eq!(cast_field(FieldType::Boolean, &r, "a", false), json!(false));
        assert_eq!(cast_field(FieldType::Array, &r, "missing", false), json!([]));
    }

    #[test]
    fn test_is_set() {
        assert!(!is_set(None));
        assert!(!is_set(Some(&Value::Null)));
        assert!(is_set(Some(&json!(""))));
        assert!(is_set(Some(&json!(0))));
    }
}
