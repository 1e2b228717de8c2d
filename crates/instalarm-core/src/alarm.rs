//! Typed metric-alarm definition.
//!
//! Built from coerced template fields. Unknown fields and values of the
//! wrong shape are rejected here, so a backend only ever sees a definition
//! whose every parameter has a known meaning.

use std::collections::BTreeMap;

use bigdecimal::{BigDecimal, Zero};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::FieldValue;
use crate::error::{AlarmError, AlarmResult};
use crate::naming::AlarmName;

/// A metric dimension, e.g. `InstanceId = i-1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

/// A fully rendered alarm, ready for a create-or-replace call.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmDefinition {
    pub name: AlarmName,
    pub description: Option<String>,
    pub actions_enabled: Option<bool>,
    pub ok_actions: Vec<String>,
    pub alarm_actions: Vec<String>,
    pub insufficient_data_actions: Vec<String>,
    pub metric_name: Option<String>,
    pub namespace: Option<String>,
    pub statistic: Option<String>,
    pub extended_statistic: Option<String>,
    pub dimensions: Vec<Dimension>,
    pub period: Option<i32>,
    pub unit: Option<String>,
    pub evaluation_periods: i32,
    pub datapoints_to_alarm: Option<i32>,
    /// Exact decimal threshold. `None` when the template gave none.
    pub threshold: Option<BigDecimal>,
    pub comparison_operator: String,
    pub treat_missing_data: Option<String>,
    pub evaluate_low_sample_count_percentile: Option<String>,
    pub threshold_metric_id: Option<String>,
}

impl AlarmDefinition {
    /// Build a definition from coerced fields.
    ///
    /// Any `AlarmName` field is ignored: the name always comes from
    /// [`AlarmName`] so the alarm can be found again.
    pub fn from_fields(
        name: AlarmName,
        fields: &BTreeMap<String, FieldValue>,
    ) -> AlarmResult<Self> {
        let mut def = AlarmDefinition {
            name,
            description: None,
            actions_enabled: None,
            ok_actions: Vec::new(),
            alarm_actions: Vec::new(),
            insufficient_data_actions: Vec::new(),
            metric_name: None,
            namespace: None,
            statistic: None,
            extended_statistic: None,
            dimensions: Vec::new(),
            period: None,
            unit: None,
            evaluation_periods: 0,
            datapoints_to_alarm: None,
            threshold: None,
            comparison_operator: String::new(),
            treat_missing_data: None,
            evaluate_low_sample_count_percentile: None,
            threshold_metric_id: None,
        };
        let mut evaluation_periods = None;
        let mut comparison_operator = None;

        for (field, value) in fields {
            let f = field.as_str();
            match f {
                "AlarmName" => {}
                "AlarmDescription" => def.description = text(f, value)?,
                "ActionsEnabled" => def.actions_enabled = Some(boolean(f, value)?),
                "OKActions" => def.ok_actions = list(f, value)?,
                "AlarmActions" => def.alarm_actions = list(f, value)?,
                "InsufficientDataActions" => def.insufficient_data_actions = list(f, value)?,
                "MetricName" => def.metric_name = text(f, value)?,
                "Namespace" => def.namespace = text(f, value)?,
                "Statistic" => def.statistic = text(f, value)?,
                "ExtendedStatistic" => def.extended_statistic = text(f, value)?,
                "Dimensions" => def.dimensions = list(f, value)?,
                "Period" => def.period = Some(integer(f, value)?),
                "Unit" => def.unit = text(f, value)?,
                "EvaluationPeriods" => evaluation_periods = Some(integer(f, value)?),
                "DatapointsToAlarm" => def.datapoints_to_alarm = Some(integer(f, value)?),
                "Threshold" => def.threshold = Some(decimal(f, value)?),
                "ComparisonOperator" => comparison_operator = text(f, value)?,
                "TreatMissingData" => def.treat_missing_data = text(f, value)?,
                "EvaluateLowSampleCountPercentile" => {
                    def.evaluate_low_sample_count_percentile = text(f, value)?
                }
                "ThresholdMetricId" => def.threshold_metric_id = text(f, value)?,
                _ => return Err(AlarmError::coercion(f, "unknown alarm field")),
            }
        }

        def.evaluation_periods = evaluation_periods
            .ok_or_else(|| AlarmError::coercion("EvaluationPeriods", "required field missing"))?;
        def.comparison_operator = comparison_operator
            .ok_or_else(|| AlarmError::coercion("ComparisonOperator", "required field missing"))?;
        Ok(def)
    }

    /// Threshold to send to the backend.
    ///
    /// Alarms compared against another metric (`ThresholdMetricId`) take no
    /// static threshold; all others default to zero when none was given.
    pub fn effective_threshold(&self) -> Option<BigDecimal> {
        if self.threshold_metric_id.is_some() {
            return None;
        }
        Some(self.threshold.clone().unwrap_or_else(BigDecimal::zero))
    }
}

fn mismatch(field: &str, expected: &str, got: &FieldValue) -> AlarmError {
    AlarmError::coercion(field, format!("expected {expected}, got {got:?}"))
}

/// Non-empty text, or `None` for an empty string.
fn text(field: &str, value: &FieldValue) -> AlarmResult<Option<String>> {
    match value {
        FieldValue::Text(s) if s.is_empty() => Ok(None),
        FieldValue::Text(s) => Ok(Some(s.clone())),
        other => Err(mismatch(field, "text", other)),
    }
}

fn boolean(field: &str, value: &FieldValue) -> AlarmResult<bool> {
    match value {
        FieldValue::Bool(b) => Ok(*b),
        other => Err(mismatch(field, "boolean", other)),
    }
}

fn integer(field: &str, value: &FieldValue) -> AlarmResult<i32> {
    match value {
        FieldValue::Integer(n) => i32::try_from(*n)
            .map_err(|_| AlarmError::coercion(field, format!("{n} out of range"))),
        other => Err(mismatch(field, "integer", other)),
    }
}

fn decimal(field: &str, value: &FieldValue) -> AlarmResult<BigDecimal> {
    match value {
        FieldValue::Decimal(d) => Ok(d.clone()),
        other => Err(mismatch(field, "decimal", other)),
    }
}

fn list<T: DeserializeOwned>(field: &str, value: &FieldValue) -> AlarmResult<Vec<T>> {
    match value {
        FieldValue::List(items) => serde_json::from_value(Value::Array(items.clone()))
            .map_err(|e| AlarmError::coercion(field, format!("bad list element: {e}"))),
        other => Err(mismatch(field, "list", other)),
    }
}
