//! instalarm-aws — AWS implementations of the Instalarm backends.
//!
//! ```text
//! ScalingBackend  → AutoScalingGroups  (DescribeAutoScalingGroups)
//! AlarmBackend    → CloudWatchAlarms   (DescribeAlarms, PutMetricAlarm, DeleteAlarms)
//! TemplateSource  → S3Templates        (GetObject)
//! ```
//!
//! Every call maps a non-success response to `AlarmError::Backend`; no call
//! is retried here beyond what the SDK's own retry policy does.

pub mod autoscaling;
pub mod cloudwatch;
pub mod s3;

use aws_config::{BehaviorVersion, Region, SdkConfig};

pub use autoscaling::AutoScalingGroups;
pub use cloudwatch::CloudWatchAlarms;
pub use s3::S3Templates;

/// Load shared SDK config from the environment, optionally pinning a region.
pub async fn load_sdk_config(region: Option<String>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region));
    }
    loader.load().await
}

/// SDK accessors return `&str` for required members and `Option<&str>` for
/// optional ones; both land here as an owned string.
pub(crate) fn owned<'a>(value: impl Into<Option<&'a str>>) -> String {
    value.into().unwrap_or_default().to_string()
}
