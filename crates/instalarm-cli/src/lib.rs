//! Templating filter used by external configuration tooling.
//!
//! Input on stdin is a flat JSON object of alarm parameter names to
//! string values; output is the canonical record:
//!
//! ```text
//! {"Threshold": "80", "MetricName": "CPUUtilization"}
//!   → {"key": <sha256>, "source": <canonical JSON>, "etag": <sha256>}
//! ```

use std::collections::BTreeMap;

use instalarm_core::{AlarmError, AlarmResult, CanonicalRecord};

/// Canonicalize one raw parameter object, returning the filter's stdout.
pub fn canonicalize(input: &str) -> AlarmResult<String> {
    let raw: BTreeMap<String, String> = serde_json::from_str(input).map_err(|e| {
        AlarmError::invalid(format!("input must be a JSON object of strings: {e}"))
    })?;

    let output = CanonicalRecord::from_raw(&raw)?.to_output();
    let mut text = serde_json::to_string_pretty(&output)
        .map_err(|e| AlarmError::invalid(format!("serializing output: {e}")))?;
    text.push('\n');
    Ok(text)
}
