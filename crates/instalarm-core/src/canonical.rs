//! Alarm canonicalization.
//!
//! Turns a loose `field name → raw string` bag into typed values, drops
//! every field that carries no information, and serializes the rest
//! deterministically. The SHA-256 of the serialized bytes is the content
//! key an external config tool compares to decide whether an alarm
//! definition changed.
//!
//! # Field classification
//!
//! ```text
//! boolean  ActionsEnabled                       "1" / "true" (any case)
//! decimal  Threshold                            exact decimal, never f64
//! list     AlarmActions, Dimensions,            JSON array
//!          InsufficientDataActions, OKActions
//! integer  EvaluationPeriods, Period,           exact integer
//!          DatapointsToAlarm
//! text     everything else                      passed through
//! ```

use std::collections::BTreeMap;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use serde::ser::{Error as _, Serialize, Serializer};
use serde_json::Value;
use serde_json::value::RawValue;
use sha2::{Digest, Sha256};

use crate::error::{AlarmError, AlarmResult};

const BOOLEAN_FIELDS: &[&str] = &["ActionsEnabled"];
const DECIMAL_FIELDS: &[&str] = &["Threshold"];
const LIST_FIELDS: &[&str] = &[
    "AlarmActions",
    "Dimensions",
    "InsufficientDataActions",
    "OKActions",
];
const INTEGER_FIELDS: &[&str] = &["EvaluationPeriods", "Period", "DatapointsToAlarm"];

/// Coercion category of an alarm field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Boolean,
    Decimal,
    List,
    Integer,
    Text,
}

impl FieldKind {
    pub fn of(field: &str) -> Self {
        if BOOLEAN_FIELDS.contains(&field) {
            FieldKind::Boolean
        } else if DECIMAL_FIELDS.contains(&field) {
            FieldKind::Decimal
        } else if LIST_FIELDS.contains(&field) {
            FieldKind::List
        } else if INTEGER_FIELDS.contains(&field) {
            FieldKind::Integer
        } else {
            FieldKind::Text
        }
    }
}

/// A coerced alarm field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Decimal(BigDecimal),
    List(Vec<Value>),
    Integer(i64),
    Text(String),
}

impl FieldValue {
    /// Coerce raw text according to the field's [`FieldKind`].
    ///
    /// Blank text for a typed field yields that type's zero value, which
    /// canonicalization then drops.
    pub fn coerce(field: &str, raw: &str) -> AlarmResult<Self> {
        let kind = FieldKind::of(field);
        let trimmed = raw.trim();

        let value = match kind {
            FieldKind::Boolean => {
                let lower = trimmed.to_ascii_lowercase();
                FieldValue::Bool(lower == "1" || lower == "true")
            }
            FieldKind::Text => FieldValue::Text(raw.to_string()),
            _ if trimmed.is_empty() => FieldValue::zero(kind),
            FieldKind::Decimal => BigDecimal::from_str(trimmed)
                .map(FieldValue::Decimal)
                .map_err(|e| AlarmError::coercion(field, format!("not a decimal: {e}")))?,
            FieldKind::Integer => trimmed
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|e| AlarmError::coercion(field, format!("not an integer: {e}")))?,
            // `null` reads as an empty list.
            FieldKind::List => serde_json::from_str::<Option<Vec<Value>>>(trimmed)
                .map(|items| {
                    FieldValue::List(items.unwrap_or_default().into_iter().map(sort_keys).collect())
                })
                .map_err(|e| AlarmError::coercion(field, format!("not a JSON list: {e}")))?,
        };
        Ok(value)
    }

    fn zero(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Boolean => FieldValue::Bool(false),
            FieldKind::Decimal => FieldValue::Decimal(BigDecimal::zero()),
            FieldKind::List => FieldValue::List(Vec::new()),
            FieldKind::Integer => FieldValue::Integer(0),
            FieldKind::Text => FieldValue::Text(String::new()),
        }
    }

    /// `true` for `""`, `0`, `false` and `[]`.
    pub fn is_falsy(&self) -> bool {
        match self {
            FieldValue::Bool(b) => !b,
            FieldValue::Decimal(d) => d.is_zero(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Integer(n) => *n == 0,
            FieldValue::Text(s) => s.is_empty(),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            // Emitted as a JSON number carrying the exact decimal digits.
            FieldValue::Decimal(d) => RawValue::from_string(d.to_string())
                .map_err(S::Error::custom)?
                .serialize(serializer),
            FieldValue::List(items) => items.serialize(serializer),
            FieldValue::Integer(n) => serializer.serialize_i64(*n),
            FieldValue::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Rebuild objects with their keys inserted in sorted order, so nested
/// output stays sorted even if serde_json preserves insertion order.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(key, value)| (key, sort_keys(value)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Coerce every raw field. Falsy values are kept.
pub fn coerce_fields<I, K, V>(raw: I) -> AlarmResult<BTreeMap<String, FieldValue>>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    raw.into_iter()
        .map(|(field, value)| {
            let field = field.as_ref();
            FieldValue::coerce(field, value.as_ref()).map(|v| (field.to_string(), v))
        })
        .collect()
}

/// A normalized alarm field mapping with its serialized form and digest.
///
/// Canonicalization is a pure function of the set of non-falsy fields:
/// input order never affects `source` or `digest`.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    fields: BTreeMap<String, FieldValue>,
    source: String,
    digest: String,
}

/// What the templating filter prints for an external config tool.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CanonicalOutput {
    pub key: String,
    pub source: String,
    pub etag: String,
}

impl CanonicalRecord {
    /// Coerce, elide and serialize a raw field bag.
    pub fn from_raw<I, K, V>(raw: I) -> AlarmResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::from_coerced(coerce_fields(raw)?)
    }

    /// Elide falsy fields from an already coerced mapping and serialize.
    pub fn from_coerced(mut fields: BTreeMap<String, FieldValue>) -> AlarmResult<Self> {
        fields.retain(|_, value| !value.is_falsy());

        // Top-level keys sorted by the BTreeMap, nested ones at coercion.
        let source = serde_json::to_string_pretty(&fields)
            .map_err(|e| AlarmError::invalid(format!("canonical serialization: {e}")))?;
        let digest = hex::encode(Sha256::digest(source.as_bytes()));

        Ok(Self {
            fields,
            source,
            digest,
        })
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Serialized canonical JSON (sorted keys, two-space indent).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Hex SHA-256 of [`Self::source`].
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn to_output(&self) -> CanonicalOutput {
        CanonicalOutput {
            key: self.digest.clone(),
            source: self.source.clone(),
            etag: self.digest.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_kinds() {
        assert_eq!(FieldKind::of("ActionsEnabled"), FieldKind::Boolean);
        assert_eq!(FieldKind::of("Threshold"), FieldKind::Decimal);
        assert_eq!(FieldKind::of("Dimensions"), FieldKind::List);
        assert_eq!(FieldKind::of("OKActions"), FieldKind::List);
        assert_eq!(FieldKind::of("EvaluationPeriods"), FieldKind::Integer);
        assert_eq!(FieldKind::of("Period"), FieldKind::Integer);
        assert_eq!(FieldKind::of("MetricName"), FieldKind::Text);
        assert_eq!(FieldKind::of("threshold"), FieldKind::Text);
    }

    #[test]
    fn boolean_coercion_is_case_insensitive() {
        for raw in ["1", "true", "TRUE", "True", " true "] {
            assert_eq!(
                FieldValue::coerce("ActionsEnabled", raw).unwrap(),
                FieldValue::Bool(true),
                "{raw:?}"
            );
        }
        for raw in ["0", "false", "yes", ""] {
            assert_eq!(
                FieldValue::coerce("ActionsEnabled", raw).unwrap(),
                FieldValue::Bool(false),
                "{raw:?}"
            );
        }
    }

    #[test]
    fn decimal_keeps_exact_digits() {
        let value = FieldValue::coerce("Threshold", "0.1").unwrap();
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "0.1");

        let value = FieldValue::coerce("Threshold", "80").unwrap();
        assert_eq!(serde_json::to_string(&value).unwrap(), "80");
    }

    #[test]
    fn malformed_values_name_the_field() {
        let err = FieldValue::coerce("Threshold", "eighty").unwrap_err();
        assert!(matches!(&err, AlarmError::Coercion { field, .. } if field == "Threshold"));

        let err = FieldValue::coerce("EvaluationPeriods", "2.5").unwrap_err();
        assert!(matches!(&err, AlarmError::Coercion { field, .. } if field == "EvaluationPeriods"));

        let err = FieldValue::coerce("AlarmActions", "arn:aws:sns:x").unwrap_err();
        assert!(matches!(&err, AlarmError::Coercion { field, .. } if field == "AlarmActions"));

        let err = FieldValue::coerce("Dimensions", r#"{"Name":"InstanceId"}"#).unwrap_err();
        assert!(err.to_string().contains("Dimensions"));
    }

    #[test]
    fn null_list_is_empty() {
        assert_eq!(
            FieldValue::coerce("AlarmActions", "null").unwrap(),
            FieldValue::List(Vec::new())
        );
        let record = CanonicalRecord::from_raw([("OKActions", "null"), ("MetricName", "m")]).unwrap();
        assert!(!record.source().contains("OKActions"));
    }

    #[test]
    fn nested_numbers_keep_source_digits() {
        let value = FieldValue::coerce(
            "Dimensions",
            r#"[{"Name": "Ratio", "Value": 0.100000000000000000001}]"#,
        )
        .unwrap();
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"[{"Name":"Ratio","Value":0.100000000000000000001}]"#
        );
    }

    #[test]
    fn falsy_fields_are_elided() {
        let record = CanonicalRecord::from_raw([
            ("AlarmDescription", ""),
            ("Threshold", "0"),
            ("EvaluationPeriods", "0"),
            ("ActionsEnabled", "false"),
            ("OKActions", "[]"),
            ("AlarmActions", ""),
            ("MetricName", "CPUUtilization"),
        ])
        .unwrap();

        let keys: Vec<&str> = record.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["MetricName"]);
        assert!(!record.source().contains("Threshold"));
        assert!(!record.source().contains("OKActions"));
    }

    #[test]
    fn input_order_does_not_change_output() {
        let a = CanonicalRecord::from_raw([
            ("MetricName", "CPUUtilization"),
            ("Threshold", "80"),
            ("Dimensions", r#"[{"Value":"i-1","Name":"InstanceId"}]"#),
            ("OKActions", ""),
        ])
        .unwrap();
        let b = CanonicalRecord::from_raw([
            ("Dimensions", r#"[{"Name":"InstanceId","Value":"i-1"}]"#),
            ("Threshold", "80"),
            ("MetricName", "CPUUtilization"),
        ])
        .unwrap();

        assert_eq!(a.source(), b.source());
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn digest_is_sha256_of_source() {
        let record = CanonicalRecord::from_raw([("MetricName", "CPUUtilization")]).unwrap();
        let expected = hex::encode(Sha256::digest(record.source().as_bytes()));
        assert_eq!(record.digest(), expected);

        let output = record.to_output();
        assert_eq!(output.key, output.etag);
        assert_eq!(output.source, record.source());
    }

    #[test]
    fn canonical_source_layout() {
        let record = CanonicalRecord::from_raw([
            ("Threshold", "80.5"),
            ("MetricName", "CPUUtilization"),
            ("ActionsEnabled", "true"),
            ("EvaluationPeriods", "2"),
            ("AlarmActions", r#"["arn:aws:sns:eu-west-1:123:ops"]"#),
        ])
        .unwrap();

        insta::assert_snapshot!(record.source(), @r#"
        {
          "ActionsEnabled": true,
          "AlarmActions": [
            "arn:aws:sns:eu-west-1:123:ops"
          ],
          "EvaluationPeriods": 2,
          "MetricName": "CPUUtilization",
          "Threshold": 80.5
        }
        "#);
    }
}
