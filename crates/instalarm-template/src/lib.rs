//! instalarm-template — alarm templates.
//!
//! A template is raw JSON text stored under its alarm key, with
//! `{{variable}}` placeholders:
//!
//! ```text
//! {
//!   "MetricName": "CPUUtilization",
//!   "Dimensions": [{"Name": "InstanceId", "Value": "{{instance.InstanceId}}"}],
//!   "Threshold": "{{asg.Tags.Threshold}}",
//!   ...
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! TemplateRenderer
//!   ├── TemplateCache (fetch once per key, then reuse)
//!   │   └── dyn TemplateSource (blob storage)
//!   ├── substitute() → rendered JSON text
//!   └── coerce_fields() + AlarmDefinition::from_fields()
//! ```
//!
//! Templates are assumed immutable for the lifetime of the cache, which
//! is owned by one reconciliation engine and never evicts.

pub mod render;
pub mod store;

pub use render::{TemplateRenderer, TemplateVariables, substitute};
pub use store::{TemplateCache, TemplateSource};
