//! Data model pulled from the scaling and alarm services.
//!
//! Nothing here is persisted. Groups and alarms are fetched fresh on every
//! reconciliation pass and dropped at the end of it.

use crate::naming::ALARM_NAME_PREFIX;

/// Identifier of an auto-scaling group.
pub type GroupName = String;

/// Identifier of a compute instance.
pub type InstanceId = String;

// ── Group ─────────────────────────────────────────────────────────

/// An auto-scaling group as reported by the scaling service.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: GroupName,
    /// Tags in the order the service reported them. Keys are unique.
    pub tags: Vec<GroupTag>,
    pub instances: Vec<GroupInstance>,
}

/// A key/value tag on a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTag {
    pub key: String,
    pub value: String,
}

/// A member instance of a group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupInstance {
    pub id: InstanceId,
    pub lifecycle_state: LifecycleState,
}

impl Group {
    /// Alarm keys requested by this group's tags, in tag order.
    ///
    /// A tag `InstanceAlarm:cpu-high` yields `cpu-high`. Tags without the
    /// prefix are ignored.
    pub fn alarm_keys(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .filter_map(|tag| tag.key.strip_prefix(ALARM_NAME_PREFIX))
    }

    /// Members currently in service. Only these are owed alarms.
    pub fn in_service_instances(&self) -> impl Iterator<Item = &GroupInstance> {
        self.instances
            .iter()
            .filter(|instance| instance.lifecycle_state.is_in_service())
    }
}

// ── Lifecycle ─────────────────────────────────────────────────────

/// Lifecycle state of a group member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Pending,
    InService,
    Standby,
    Detaching,
    Terminating,
    Terminated,
    /// A state this crate does not know about, kept verbatim.
    Other(String),
}

impl LifecycleState {
    /// Parse a scaling-service state string.
    ///
    /// Hook sub-states such as `Pending:Wait` or `Terminating:Proceed`
    /// collapse to their base state.
    pub fn parse(s: &str) -> Self {
        let base = s.split(':').next().unwrap_or(s);
        match base {
            "Pending" => LifecycleState::Pending,
            "InService" => LifecycleState::InService,
            "Standby" => LifecycleState::Standby,
            "Detaching" | "Detached" => LifecycleState::Detaching,
            "Terminating" => LifecycleState::Terminating,
            "Terminated" => LifecycleState::Terminated,
            _ => LifecycleState::Other(s.to_string()),
        }
    }

    pub fn is_in_service(&self) -> bool {
        matches!(self, LifecycleState::InService)
    }
}

// ── Alarm ─────────────────────────────────────────────────────────

/// An existing alarm as reported by the alarm service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRecord {
    pub name: String,
}
