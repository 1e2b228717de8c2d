//! Trigger events.
//!
//! Two envelopes are understood:
//!
//! ```text
//! {"kind": "launch", "group_name": "g1", "instance_id": "i-1"}
//! {"kind": "terminate", "instance_id": "i-1"}
//!
//! {"detail-type": "EC2 Instance Launch Successful",
//!  "detail": {"AutoScalingGroupName": "g1", "EC2InstanceId": "i-1"}}
//! {"detail-type": "EC2 Instance Terminate Successful",
//!  "detail": {"EC2InstanceId": "i-1"}}
//! ```
//!
//! Anything else, scheduled events included, triggers a full sweep.

use serde_json::Value;

use instalarm_core::{AlarmError, AlarmResult};

const LAUNCH_DETAIL_TYPE: &str = "EC2 Instance Launch Successful";
const TERMINATE_DETAIL_TYPE: &str = "EC2 Instance Terminate Successful";

/// What a single invocation should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Launch {
        group_name: String,
        instance_id: String,
    },
    Terminate {
        instance_id: String,
    },
    Sweep,
}

impl LifecycleEvent {
    /// Parse event JSON text.
    pub fn parse(text: &str) -> AlarmResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| AlarmError::invalid(format!("event is not JSON: {e}")))?;
        Self::from_json(&value)
    }

    /// Classify an event. A launch or terminate envelope missing its
    /// identifiers is an error, not a sweep.
    pub fn from_json(value: &Value) -> AlarmResult<Self> {
        if let Some(kind) = value.get("kind").and_then(Value::as_str) {
            return match kind {
                "launch" => Ok(LifecycleEvent::Launch {
                    group_name: required(value, "group_name")?,
                    instance_id: required(value, "instance_id")?,
                }),
                "terminate" => Ok(LifecycleEvent::Terminate {
                    instance_id: required(value, "instance_id")?,
                }),
                _ => Ok(LifecycleEvent::Sweep),
            };
        }

        if let Some(detail_type) = value.get("detail-type").and_then(Value::as_str) {
            let detail = value.get("detail").unwrap_or(&Value::Null);
            return match detail_type {
                LAUNCH_DETAIL_TYPE => Ok(LifecycleEvent::Launch {
                    group_name: required(detail, "AutoScalingGroupName")?,
                    instance_id: required(detail, "EC2InstanceId")?,
                }),
                TERMINATE_DETAIL_TYPE => Ok(LifecycleEvent::Terminate {
                    instance_id: required(detail, "EC2InstanceId")?,
                }),
                _ => Ok(LifecycleEvent::Sweep),
            };
        }

        Ok(LifecycleEvent::Sweep)
    }
}

fn required(value: &Value, field: &str) -> AlarmResult<String> {
    match value.get(field).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(AlarmError::invalid(format!("event is missing {field}"))),
    }
}
