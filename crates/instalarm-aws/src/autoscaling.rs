//! Auto Scaling group listing.

use aws_config::SdkConfig;
use aws_sdk_autoscaling::Client;
use aws_sdk_autoscaling::error::DisplayErrorContext;
use aws_sdk_autoscaling::types::{
    AutoScalingGroup, Instance, LifecycleState as AsgLifecycleState, TagDescription,
};
use tracing::debug;

use instalarm_core::{
    AlarmError, AlarmResult, BoxFuture, Group, GroupInstance, GroupTag, LifecycleState,
};
use instalarm_reconcile::{GroupFilter, Page, ScalingBackend};

use crate::owned;

const OPERATION: &str = "DescribeAutoScalingGroups";

/// Scaling backend over the Auto Scaling API.
#[derive(Clone)]
pub struct AutoScalingGroups {
    client: Client,
}

impl AutoScalingGroups {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

impl ScalingBackend for AutoScalingGroups {
    fn describe_groups<'a>(
        &'a self,
        filter: &'a GroupFilter,
        next_token: Option<String>,
    ) -> BoxFuture<'a, AlarmResult<Page<Group>>> {
        Box::pin(async move {
            let names = match filter {
                GroupFilter::All => None,
                GroupFilter::Named(names) => Some(names.clone()),
            };

            let output = self
                .client
                .describe_auto_scaling_groups()
                .set_auto_scaling_group_names(names)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| AlarmError::backend(OPERATION, DisplayErrorContext(&e)))?;

            let items: Vec<Group> = output
                .auto_scaling_groups()
                .iter()
                .map(convert_group)
                .collect();
            debug!(groups = items.len(), "group page received");

            Ok(Page {
                items,
                next_token: output.next_token().map(str::to_string),
            })
        })
    }
}

fn convert_group(asg: &AutoScalingGroup) -> Group {
    Group {
        name: owned(asg.auto_scaling_group_name()),
        tags: asg.tags().iter().map(convert_tag).collect(),
        instances: asg.instances().iter().map(convert_instance).collect(),
    }
}

fn convert_tag(tag: &TagDescription) -> GroupTag {
    GroupTag {
        key: owned(tag.key()),
        value: owned(tag.value()),
    }
}

fn convert_instance(instance: &Instance) -> GroupInstance {
    let state: Option<&AsgLifecycleState> = instance.lifecycle_state().into();
    GroupInstance {
        id: owned(instance.instance_id()),
        lifecycle_state: state
            .map(|s| LifecycleState::parse(s.as_str()))
            .unwrap_or_else(|| LifecycleState::Other(String::new())),
    }
}
