//! Reconciler — computes and applies the alarm create/delete diff.
//!
//! Each entry point is one sequential pass that recomputes everything from
//! current backend state. Nothing is persisted between passes and no lock
//! is held against concurrent passes: creates replace by name and deletes
//! of missing names are no-ops, so the next full sweep repairs any race.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use instalarm_core::{ALARM_NAME_PREFIX, AlarmError, AlarmName, AlarmResult, Group};
use instalarm_template::{TemplateCache, TemplateRenderer, TemplateSource, TemplateVariables};

use crate::backend::{AlarmBackend, GroupFilter, ScalingBackend, list_alarms, list_groups};
use crate::batch::BatchDeleter;
use crate::event::LifecycleEvent;

/// Actions taken by one pass, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: Vec<AlarmName>,
    pub deleted: Vec<String>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty()
    }
}

/// The reconciliation engine.
///
/// Owns the template cache, so templates are fetched at most once per
/// key for the engine's lifetime.
pub struct Reconciler {
    scaling: Arc<dyn ScalingBackend>,
    alarms: Arc<dyn AlarmBackend>,
    renderer: TemplateRenderer,
    deleter: BatchDeleter,
}

impl Reconciler {
    pub fn new(
        scaling: Arc<dyn ScalingBackend>,
        alarms: Arc<dyn AlarmBackend>,
        templates: Arc<dyn TemplateSource>,
    ) -> Self {
        Self {
            scaling,
            alarms,
            renderer: TemplateRenderer::new(TemplateCache::new(templates)),
            deleter: BatchDeleter::default(),
        }
    }

    pub fn with_deleter(mut self, deleter: BatchDeleter) -> Self {
        self.deleter = deleter;
        self
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    /// Dispatch a trigger event to its entry point.
    pub async fn handle(&self, event: &LifecycleEvent) -> AlarmResult<ReconcileReport> {
        debug!(?event, "handling event");
        match event {
            LifecycleEvent::Launch {
                group_name,
                instance_id,
            } => self.on_launch(group_name, instance_id).await,
            LifecycleEvent::Terminate { instance_id } => self.on_terminate(instance_id).await,
            LifecycleEvent::Sweep => self.full_sweep().await,
        }
    }

    /// Create every alarm the instance's group asks for.
    ///
    /// No existence check: the create call replaces an alarm of the same
    /// name, so a redelivered launch event is harmless.
    pub async fn on_launch(
        &self,
        group_name: &str,
        instance_id: &str,
    ) -> AlarmResult<ReconcileReport> {
        if group_name.is_empty() {
            return Err(AlarmError::invalid("group name is empty"));
        }
        AlarmName::instance_prefix(instance_id)?;

        let filter = GroupFilter::Named(vec![group_name.to_string()]);
        let groups = list_groups(self.scaling.as_ref(), &filter).await?;
        if groups.is_empty() {
            warn!(group = %group_name, instance = %instance_id, "group not found, nothing to create");
        }

        let mut report = ReconcileReport::default();
        for group in &groups {
            for name in alarm_names(group, instance_id)? {
                let alarm = self
                    .renderer
                    .render(&name, &TemplateVariables::for_instance(group, instance_id))
                    .await?;
                info!(alarm = %name, group = %group.name, "creating alarm");
                self.alarms.put_alarm(&alarm).await?;
                report.created.push(name);
            }
        }
        Ok(report)
    }

    /// Delete every alarm belonging to the instance.
    ///
    /// Only the alarm naming convention is used; the instance may already
    /// be gone from the scaling service.
    pub async fn on_terminate(&self, instance_id: &str) -> AlarmResult<ReconcileReport> {
        let prefix = AlarmName::instance_prefix(instance_id)?;
        let names: Vec<String> = list_alarms(self.alarms.as_ref(), &prefix)
            .await?
            .into_iter()
            .map(|alarm| alarm.name)
            .collect();

        let mut report = ReconcileReport::default();
        if names.is_empty() {
            debug!(instance = %instance_id, "no alarms to delete");
            return Ok(report);
        }

        info!(instance = %instance_id, alarms = ?names, "deleting alarms");
        self.deleter.delete(self.alarms.as_ref(), &names).await?;
        report.deleted = names;
        Ok(report)
    }

    /// Converge the whole account: create missing alarms for every
    /// in-service instance, then delete every prefixed alarm nobody owns.
    pub async fn full_sweep(&self) -> AlarmResult<ReconcileReport> {
        let found: BTreeSet<String> = list_alarms(self.alarms.as_ref(), ALARM_NAME_PREFIX)
            .await?
            .into_iter()
            .map(|alarm| alarm.name)
            .collect();
        debug!(found = found.len(), "existing instance alarms");

        let mut report = ReconcileReport::default();
        let mut expected: BTreeSet<String> = BTreeSet::new();

        for group in list_groups(self.scaling.as_ref(), &GroupFilter::All).await? {
            for instance in group.in_service_instances() {
                for name in alarm_names(&group, &instance.id)? {
                    if !expected.insert(name.to_string()) || found.contains(name.as_str()) {
                        continue;
                    }
                    let alarm = self
                        .renderer
                        .render(&name, &TemplateVariables::for_instance(&group, &instance.id))
                        .await?;
                    info!(alarm = %name, group = %group.name, "creating missing alarm");
                    self.alarms.put_alarm(&alarm).await?;
                    report.created.push(name);
                }
            }
        }

        let orphans: Vec<String> = found.difference(&expected).cloned().collect();
        if !orphans.is_empty() {
            info!(count = orphans.len(), alarms = ?orphans, "deleting orphan alarms");
            self.deleter.delete(self.alarms.as_ref(), &orphans).await?;
            report.deleted = orphans;
        }

        info!(
            expected = expected.len(),
            created = report.created.len(),
            deleted = report.deleted.len(),
            "full sweep complete"
        );
        Ok(report)
    }
}

/// Alarm names a group owes one of its instances.
///
/// A bare `InstanceAlarm:` tag names no template and is skipped.
fn alarm_names(group: &Group, instance_id: &str) -> AlarmResult<Vec<AlarmName>> {
    let mut names = Vec::new();
    for key in group.alarm_keys() {
        if key.is_empty() {
            warn!(group = %group.name, "ignoring alarm tag with empty alarm key");
            continue;
        }
        names.push(AlarmName::new(instance_id, key)?);
    }
    Ok(names)
}
