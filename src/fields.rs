use std::collections::HashMap;
use std::fmt;

use crate::errors::ValidationError;
use crate::Result;

/// Scalar kinds a configuration field can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    Int,
    Float,
    Bool,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Str => "Str",
            FieldKind::Int => "Int",
            FieldKind::Float => "Float",
            FieldKind::Bool => "Bool",
        };
        f.write_str(name)
    }
}

/// One configuration value.
///
/// Values travel through every backend as plain strings; the typed form
/// only exists in process memory. [`FieldValue::to_wire`] and
/// [`FieldValue::from_wire`] define the JSON scalar rendering both
/// transports share, so typed values round-trip losslessly between
/// replicas. A stored raw string that is not valid JSON reads back as
/// `Str` (tolerance for foreign writers).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// All fields of one namespace, keyed by field name.
pub type FieldMap = HashMap<String, FieldValue>;

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Str(_) => FieldKind::Str,
            FieldValue::Int(_) => FieldKind::Int,
            FieldValue::Float(_) => FieldKind::Float,
            FieldValue::Bool(_) => FieldKind::Bool,
        }
    }

    /// JSON scalar rendering stored in the backend.
    ///
    /// Floats keep their fractional form, so `2.0` survives a round trip
    /// instead of collapsing into the integer `2`. Non-finite floats have
    /// no JSON rendering and fall back to their string form.
    pub fn to_wire(&self) -> String {
        match self {
            FieldValue::Str(v) => serde_json::Value::String(v.clone()).to_string(),
            FieldValue::Int(v) => serde_json::Value::from(*v).to_string(),
            FieldValue::Float(v) => match serde_json::Number::from_f64(*v) {
                Some(n) => serde_json::Value::Number(n).to_string(),
                None => serde_json::Value::String(v.to_string()).to_string(),
            },
            FieldValue::Bool(v) => serde_json::Value::Bool(*v).to_string(),
        }
    }

    /// Recovers the typed form from the backend rendering.
    pub fn from_wire(raw: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Bool(v)) => FieldValue::Bool(v),
            Ok(serde_json::Value::Number(n)) => {
                if let Some(v) = n.as_i64() {
                    FieldValue::Int(v)
                } else if let Some(v) = n.as_f64() {
                    FieldValue::Float(v)
                } else {
                    FieldValue::Str(raw.to_string())
                }
            }
            Ok(serde_json::Value::String(v)) => FieldValue::Str(v),
            _ => FieldValue::Str(raw.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(v) => f.write_str(v),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

/// Canonical field name: trimmed, non-empty.
pub(crate) fn canonical_field(raw: &str) -> Result<String> {
    let field = raw.trim();
    if field.is_empty() {
        return Err(ValidationError::EmptyField.into());
    }
    Ok(field.to_string())
}

/// Renders a typed map into its backend form.
pub(crate) fn to_wire_map(fields: &FieldMap) -> HashMap<String, String> {
    fields.iter().map(|(k, v)| (k.clone(), v.to_wire())).collect()
}

/// Recovers a typed map from its backend form.
pub(crate) fn from_wire_map(raw: HashMap<String, String>) -> FieldMap {
    raw.into_iter().map(|(k, v)| (k, FieldValue::from_wire(&v))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_round_trip_keeps_kinds() {
        let cases = vec![
            FieldValue::Str("on".to_string()),
            FieldValue::Int(-42),
            FieldValue::Float(2.0),
            FieldValue::Bool(true),
        ];
        for value in cases {
            let wired = value.to_wire();
            assert_eq!(FieldValue::from_wire(&wired), value, "wire form: {}", wired);
        }
    }

    #[test]
    fn test_float_does_not_collapse_into_int() {
        assert_eq!(FieldValue::Float(2.0).to_wire(), "2.0");
        assert_eq!(FieldValue::from_wire("2.0"), FieldValue::Float(2.0));
        assert_eq!(FieldValue::from_wire("2"), FieldValue::Int(2));
    }

    #[test]
    fn test_strings_are_quoted_on_the_wire() {
        assert_eq!(FieldValue::Str("100".to_string()).to_wire(), "\"100\"");
        assert_eq!(FieldValue::from_wire("\"100\""), FieldValue::Str("100".to_string()));
    }

    #[test]
    fn test_foreign_raw_strings_read_back_as_str() {
        assert_eq!(
            FieldValue::from_wire("not json at all"),
            FieldValue::Str("not json at all".to_string())
        );
        assert_eq!(
            FieldValue::from_wire("[1,2]"),
            FieldValue::Str("[1,2]".to_string())
        );
    }

    #[test]
    fn test_non_finite_floats_fall_back_to_str() {
        let wired = FieldValue::Float(f64::NAN).to_wire();
        assert_eq!(FieldValue::from_wire(&wired), FieldValue::Str("NaN".to_string()));
    }

    #[test]
    fn test_canonical_field_trims_and_rejects_empty() {
        assert_eq!(canonical_field(" max ").unwrap(), "max");
        assert!(canonical_field("   ").is_err());
    }

    #[test]
    fn test_wire_map_round_trip() {
        let mut fields = FieldMap::new();
        fields.insert("max".to_string(), FieldValue::Int(100));
        fields.insert("enabled".to_string(), FieldValue::Bool(false));
        assert_eq!(from_wire_map(to_wire_map(&fields)), fields);
    }
}
