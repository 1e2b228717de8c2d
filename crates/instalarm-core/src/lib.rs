//! instalarm-core — shared types for per-instance alarm management.
//!
//! Auto-scaling groups request alarms through tags of the form
//! `InstanceAlarm:<alarm-key>`. Every in-service instance of such a group
//! gets one alarm per alarm key, named so it can be found again from the
//! instance id alone:
//!
//! ```text
//! InstanceAlarm:<instance-id>:<alarm-key>
//! ```
//!
//! This crate holds the pieces that need no backend access: the data model
//! pulled from the scaling service, alarm naming, field coercion and
//! canonicalization, the typed [`AlarmDefinition`], and the config file.

pub mod alarm;
pub mod canonical;
pub mod config;
pub mod error;
pub mod naming;
pub mod types;

pub use alarm::{AlarmDefinition, Dimension};
pub use canonical::{CanonicalOutput, CanonicalRecord, FieldKind, FieldValue, coerce_fields};
pub use config::{AwsConfig, InstalarmConfig, MAX_DELETE_BATCH};
pub use error::{AlarmError, AlarmResult};
pub use naming::{ALARM_NAME_PREFIX, AlarmName};
pub use types::*;

/// Boxed future returned by backend traits, keeping them object-safe.
pub type BoxFuture<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
