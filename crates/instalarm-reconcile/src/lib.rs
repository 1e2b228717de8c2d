//! instalarm-reconcile — keeps per-instance alarms in step with groups.
//!
//! Three entry points, each a single sequential pass with no state kept
//! between passes:
//!
//! ```text
//! launch(group, instance)   list group → render each tagged template → put
//! terminate(instance)       list alarms under "InstanceAlarm:<id>:" → delete
//! full_sweep()              found    = alarms under "InstanceAlarm:"
//!                           expected = names owed to in-service instances
//!                                      (missing ones created on the way)
//!                           delete found − expected
//! ```
//!
//! Any failed backend call aborts the pass with [`AlarmError::Backend`];
//! the invoking runtime retries the whole pass.
//!
//! [`AlarmError::Backend`]: instalarm_core::AlarmError::Backend

pub mod backend;
pub mod batch;
pub mod event;
pub mod memory;
pub mod reconciler;

pub use backend::{AlarmBackend, GroupFilter, Page, ScalingBackend};
pub use batch::BatchDeleter;
pub use event::LifecycleEvent;
pub use reconciler::{ReconcileReport, Reconciler};
