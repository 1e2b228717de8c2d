//! Alarm naming.
//!
//! The alarm name is the only link between an alarm and the instance it
//! watches. There is no side index: terminating an instance deletes every
//! alarm under [`AlarmName::instance_prefix`], and a full sweep recognises
//! its own alarms by [`ALARM_NAME_PREFIX`].

use std::fmt;

use crate::error::{AlarmError, AlarmResult};

/// Prefix shared by alarm names and the group tags that request them.
pub const ALARM_NAME_PREFIX: &str = "InstanceAlarm:";

const SEPARATOR: char = ':';

/// A validated `<prefix><instance-id>:<alarm-key>` alarm name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AlarmName {
    name: String,
    /// Byte offset of the separator between instance id and alarm key.
    split: usize,
}

impl AlarmName {
    /// Build the alarm name for an (instance, alarm key) pair.
    ///
    /// The instance id must be non-empty and free of `:` so the name can be
    /// split back unambiguously. The alarm key may contain anything but
    /// must be non-empty.
    pub fn new(instance_id: &str, alarm_key: &str) -> AlarmResult<Self> {
        if instance_id.is_empty() {
            return Err(AlarmError::invalid("instance id is empty"));
        }
        if instance_id.contains(SEPARATOR) {
            return Err(AlarmError::invalid(format!(
                "instance id {instance_id:?} contains '{SEPARATOR}'"
            )));
        }
        if alarm_key.is_empty() {
            return Err(AlarmError::invalid(format!(
                "empty alarm key for instance {instance_id}"
            )));
        }

        let name = format!("{ALARM_NAME_PREFIX}{instance_id}{SEPARATOR}{alarm_key}");
        let split = ALARM_NAME_PREFIX.len() + instance_id.len();
        Ok(Self { name, split })
    }

    /// Parse an existing alarm name. Returns `None` for names this crate
    /// did not produce.
    pub fn parse(name: &str) -> Option<Self> {
        let rest = name.strip_prefix(ALARM_NAME_PREFIX)?;
        let (instance_id, alarm_key) = rest.split_once(SEPARATOR)?;
        Self::new(instance_id, alarm_key).ok()
    }

    /// Prefix under which every alarm of one instance lives, e.g.
    /// `InstanceAlarm:i-1:`. The trailing separator keeps `i-1` from
    /// matching alarms of `i-10`.
    pub fn instance_prefix(instance_id: &str) -> AlarmResult<String> {
        if instance_id.is_empty() || instance_id.contains(SEPARATOR) {
            return Err(AlarmError::invalid(format!(
                "bad instance id {instance_id:?}"
            )));
        }
        Ok(format!("{ALARM_NAME_PREFIX}{instance_id}{SEPARATOR}"))
    }

    pub fn instance_id(&self) -> &str {
        &self.name[ALARM_NAME_PREFIX.len()..self.split]
    }

    pub fn alarm_key(&self) -> &str {
        &self.name[self.split + SEPARATOR.len_utf8()..]
    }

    /// Split back into `(instance_id, alarm_key)`.
    pub fn decompose(&self) -> (&str, &str) {
        (self.instance_id(), self.alarm_key())
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for AlarmName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl AsRef<str> for AlarmName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl From<AlarmName> for String {
    fn from(name: AlarmName) -> Self {
        name.name
    }
}
