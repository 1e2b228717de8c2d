//! CloudWatch metric alarms.

use aws_config::SdkConfig;
use aws_sdk_cloudwatch::Client;
use aws_sdk_cloudwatch::error::DisplayErrorContext;
use aws_sdk_cloudwatch::types::{ComparisonOperator, Dimension, StandardUnit, Statistic};
use bigdecimal::ToPrimitive;
use tracing::debug;

use instalarm_core::{AlarmDefinition, AlarmError, AlarmRecord, AlarmResult, BoxFuture};
use instalarm_reconcile::{AlarmBackend, Page};

/// Alarm backend over the CloudWatch API.
#[derive(Clone)]
pub struct CloudWatchAlarms {
    client: Client,
}

impl CloudWatchAlarms {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

fn non_empty(actions: &[String]) -> Option<Vec<String>> {
    (!actions.is_empty()).then(|| actions.to_vec())
}

fn dimensions(alarm: &AlarmDefinition) -> AlarmResult<Option<Vec<Dimension>>> {
    if alarm.dimensions.is_empty() {
        return Ok(None);
    }
    alarm
        .dimensions
        .iter()
        .map(|d| {
            Ok(Dimension::builder()
                .name(&d.name)
                .value(&d.value)
                .build())
        })
        .collect::<AlarmResult<Vec<_>>>()
        .map(Some)
}

impl AlarmBackend for CloudWatchAlarms {
    fn describe_alarms<'a>(
        &'a self,
        name_prefix: &'a str,
        next_token: Option<String>,
    ) -> BoxFuture<'a, AlarmResult<Page<AlarmRecord>>> {
        Box::pin(async move {
            let output = self
                .client
                .describe_alarms()
                .alarm_name_prefix(name_prefix)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| AlarmError::backend("DescribeAlarms", DisplayErrorContext(&e)))?;

            let items: Vec<AlarmRecord> = output
                .metric_alarms()
                .iter()
                .filter_map(|alarm| alarm.alarm_name())
                .map(|name| AlarmRecord {
                    name: name.to_string(),
                })
                .collect();
            debug!(%name_prefix, alarms = items.len(), "alarm page received");

            Ok(Page {
                items,
                next_token: output.next_token().map(str::to_string),
            })
        })
    }

    fn put_alarm<'a>(&'a self, alarm: &'a AlarmDefinition) -> BoxFuture<'a, AlarmResult<()>> {
        Box::pin(async move {
            // The API takes a double; the conversion happens only here.
            let threshold = alarm
                .effective_threshold()
                .map(|t| {
                    t.to_f64()
                        .ok_or_else(|| AlarmError::coercion("Threshold", format!("{t} out of range")))
                })
                .transpose()?;

            self.client
                .put_metric_alarm()
                .alarm_name(alarm.name.as_str())
                .set_alarm_description(alarm.description.clone())
                .set_actions_enabled(alarm.actions_enabled)
                .set_ok_actions(non_empty(&alarm.ok_actions))
                .set_alarm_actions(non_empty(&alarm.alarm_actions))
                .set_insufficient_data_actions(non_empty(&alarm.insufficient_data_actions))
                .set_metric_name(alarm.metric_name.clone())
                .set_namespace(alarm.namespace.clone())
                .set_statistic(alarm.statistic.as_deref().map(Statistic::from))
                .set_extended_statistic(alarm.extended_statistic.clone())
                .set_dimensions(dimensions(alarm)?)
                .set_period(alarm.period)
                .set_unit(alarm.unit.as_deref().map(StandardUnit::from))
                .evaluation_periods(alarm.evaluation_periods)
                .set_datapoints_to_alarm(alarm.datapoints_to_alarm)
                .set_threshold(threshold)
                .comparison_operator(ComparisonOperator::from(alarm.comparison_operator.as_str()))
                .set_treat_missing_data(alarm.treat_missing_data.clone())
                .set_evaluate_low_sample_count_percentile(
                    alarm.evaluate_low_sample_count_percentile.clone(),
                )
                .set_threshold_metric_id(alarm.threshold_metric_id.clone())
                .send()
                .await
                .map_err(|e| AlarmError::backend("PutMetricAlarm", DisplayErrorContext(&e)))?;
            Ok(())
        })
    }

    fn delete_alarms<'a>(&'a self, names: &'a [String]) -> BoxFuture<'a, AlarmResult<()>> {
        Box::pin(async move {
            self.client
                .delete_alarms()
                .set_alarm_names(Some(names.to_vec()))
                .send()
                .await
                .map_err(|e| AlarmError::backend("DeleteAlarms", DisplayErrorContext(&e)))?;
            Ok(())
        })
    }
}
