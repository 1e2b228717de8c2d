//! End-to-end reconciliation scenarios against the in-memory backends.
//!
//! Covers the three entry points, convergence of the full sweep, and
//! abort-on-failure behavior.

use std::sync::Arc;

use instalarm_core::{AlarmError, Group, GroupInstance, GroupTag, LifecycleState};
use instalarm_reconcile::memory::{MemoryAlarms, MemoryScaling, MemoryTemplates};
use instalarm_reconcile::{BatchDeleter, LifecycleEvent, Reconciler};

const CPU_TEMPLATE: &str = r#"{
    "MetricName": "CPUUtilization",
    "Namespace": "AWS/EC2",
    "Statistic": "Average",
    "Dimensions": [{"Name": "InstanceId", "Value": "{{instance.InstanceId}}"}],
    "Period": "300",
    "EvaluationPeriods": "2",
    "Threshold": "{{asg.Tags.Threshold}}",
    "ComparisonOperator": "GreaterThanThreshold",
    "AlarmDescription": "{{asg.AutoScalingGroupName}} CPU"
}"#;

const DISK_TEMPLATE: &str = r#"{
    "MetricName": "disk_used_percent",
    "Namespace": "CWAgent",
    "Dimensions": [{"Name": "InstanceId", "Value": "{{instance.InstanceId}}"}],
    "Period": 60,
    "EvaluationPeriods": 5,
    "Threshold": 90,
    "ComparisonOperator": "GreaterThanOrEqualToThreshold"
}"#;

struct Harness {
    scaling: Arc<MemoryScaling>,
    alarms: Arc<MemoryAlarms>,
    templates: Arc<MemoryTemplates>,
    reconciler: Reconciler,
}

fn harness(groups: Vec<Group>) -> Harness {
    let scaling = Arc::new(MemoryScaling::new(groups));
    let alarms = Arc::new(MemoryAlarms::new());
    let templates = Arc::new(
        MemoryTemplates::new()
            .with_template("cpu-high", CPU_TEMPLATE)
            .with_template("disk", DISK_TEMPLATE),
    );
    let reconciler = Reconciler::new(scaling.clone(), alarms.clone(), templates.clone());
    Harness {
        scaling,
        alarms,
        templates,
        reconciler,
    }
}

fn group(name: &str, tags: &[(&str, &str)], instances: &[(&str, LifecycleState)]) -> Group {
    Group {
        name: name.to_string(),
        tags: tags
            .iter()
            .map(|(k, v)| GroupTag {
                key: k.to_string(),
                value: v.to_string(),
            })
            .collect(),
        instances: instances
            .iter()
            .map(|(id, state)| GroupInstance {
                id: id.to_string(),
                lifecycle_state: state.clone(),
            })
            .collect(),
    }
}

fn cpu_group(instances: &[(&str, LifecycleState)]) -> Group {
    group(
        "g1",
        &[("InstanceAlarm:cpu-high", ""), ("Threshold", "80")],
        instances,
    )
}

// ── Launch ────────────────────────────────────────────────────────

#[tokio::test]
async fn launch_creates_tagged_alarm() {
    let h = harness(vec![cpu_group(&[("i-1", LifecycleState::InService)])]);

    let report = h.reconciler.on_launch("g1", "i-1").await.unwrap();

    assert_eq!(report.created.len(), 1);
    assert_eq!(report.created[0].as_str(), "InstanceAlarm:i-1:cpu-high");
    assert!(report.deleted.is_empty());

    assert_eq!(h.alarms.alarm_names(), vec!["InstanceAlarm:i-1:cpu-high"]);
    let def = h.alarms.definition("InstanceAlarm:i-1:cpu-high").unwrap();
    assert_eq!(def.threshold.map(|t| t.to_string()).as_deref(), Some("80"));
    assert_eq!(def.dimensions[0].value, "i-1");
    assert_eq!(def.description.as_deref(), Some("g1 CPU"));
}

#[tokio::test]
async fn launch_twice_replaces_by_name() {
    let h = harness(vec![cpu_group(&[("i-1", LifecycleState::InService)])]);

    h.reconciler.on_launch("g1", "i-1").await.unwrap();
    h.reconciler.on_launch("g1", "i-1").await.unwrap();

    assert_eq!(h.alarms.put_calls().len(), 2);
    assert_eq!(h.alarms.alarm_names().len(), 1);
}

#[tokio::test]
async fn launch_in_unknown_group_creates_nothing() {
    let h = harness(vec![cpu_group(&[])]);

    let report = h.reconciler.on_launch("missing", "i-1").await.unwrap();
    assert!(report.is_noop());
    assert!(h.alarms.put_calls().is_empty());
}

#[tokio::test]
async fn launch_with_bad_template_fails_without_creating() {
    let h = harness(vec![group(
        "g1",
        &[("InstanceAlarm:cpu-high", "")],
        &[("i-1", LifecycleState::InService)],
    )]);

    // No Threshold tag, so {{asg.Tags.Threshold}} is unbound.
    let err = h.reconciler.on_launch("g1", "i-1").await.unwrap_err();
    assert!(matches!(err, AlarmError::Template { .. }));
    assert!(h.alarms.put_calls().is_empty());
}

#[tokio::test]
async fn launch_rejects_malformed_identifiers() {
    let h = harness(vec![]);
    assert!(matches!(
        h.reconciler.on_launch("", "i-1").await,
        Err(AlarmError::InvalidArgument(_))
    ));
    assert!(matches!(
        h.reconciler.on_launch("g1", "").await,
        Err(AlarmError::InvalidArgument(_))
    ));
}

// ── Terminate ─────────────────────────────────────────────────────

#[tokio::test]
async fn terminate_removes_only_that_instances_alarms() {
    let h = harness(vec![]);
    h.alarms.seed("InstanceAlarm:i-1:cpu-high");
    h.alarms.seed("InstanceAlarm:i-1:disk");
    h.alarms.seed("InstanceAlarm:i-10:cpu-high");
    h.alarms.seed("InstanceAlarm:i-2:cpu-high");
    h.alarms.seed("Unrelated");

    let report = h.reconciler.on_terminate("i-1").await.unwrap();

    assert_eq!(
        report.deleted,
        vec!["InstanceAlarm:i-1:cpu-high", "InstanceAlarm:i-1:disk"]
    );
    assert_eq!(
        h.alarms.alarm_names(),
        vec![
            "InstanceAlarm:i-10:cpu-high",
            "InstanceAlarm:i-2:cpu-high",
            "Unrelated"
        ]
    );
}

#[tokio::test]
async fn terminate_without_alarms_makes_no_delete_call() {
    let h = harness(vec![]);
    let report = h.reconciler.on_terminate("i-1").await.unwrap();
    assert!(report.is_noop());
    assert!(h.alarms.delete_calls().is_empty());
}

// ── Full sweep ────────────────────────────────────────────────────

#[tokio::test]
async fn sweep_deletes_orphan_and_creates_nothing() {
    let h = harness(vec![cpu_group(&[("i-1", LifecycleState::InService)])]);
    h.alarms.seed("InstanceAlarm:i-1:cpu-high");
    h.alarms.seed("InstanceAlarm:i-9:cpu-high");

    let report = h.reconciler.full_sweep().await.unwrap();

    assert!(report.created.is_empty());
    assert_eq!(report.deleted, vec!["InstanceAlarm:i-9:cpu-high"]);
    assert_eq!(h.alarms.alarm_names(), vec!["InstanceAlarm:i-1:cpu-high"]);
    assert!(h.alarms.put_calls().is_empty());
}

#[tokio::test]
async fn sweep_is_idempotent() {
    let h = harness(vec![
        group(
            "web",
            &[
                ("InstanceAlarm:cpu-high", ""),
                ("InstanceAlarm:disk", ""),
                ("Threshold", "75.5"),
            ],
            &[
                ("i-1", LifecycleState::InService),
                ("i-2", LifecycleState::InService),
                ("i-3", LifecycleState::InService),
            ],
        ),
        group("untagged", &[("Name", "batch")], &[("i-4", LifecycleState::InService)]),
    ]);
    h.alarms.seed("InstanceAlarm:i-old:disk");

    let first = h.reconciler.full_sweep().await.unwrap();
    assert_eq!(first.created.len(), 6);
    assert_eq!(first.deleted, vec!["InstanceAlarm:i-old:disk"]);

    let second = h.reconciler.full_sweep().await.unwrap();
    assert!(second.is_noop(), "second sweep did work: {second:?}");
    assert_eq!(h.alarms.alarm_names().len(), 6);
}

#[tokio::test]
async fn sweep_ignores_instances_not_in_service() {
    let h = harness(vec![cpu_group(&[
        ("i-1", LifecycleState::InService),
        ("i-2", LifecycleState::Pending),
        ("i-3", LifecycleState::Terminating),
        ("i-4", LifecycleState::Standby),
    ])]);
    h.alarms.seed("InstanceAlarm:i-3:cpu-high");

    let report = h.reconciler.full_sweep().await.unwrap();

    let created: Vec<&str> = report.created.iter().map(|n| n.as_str()).collect();
    assert_eq!(created, vec!["InstanceAlarm:i-1:cpu-high"]);
    assert_eq!(report.deleted, vec!["InstanceAlarm:i-3:cpu-high"]);
}

#[tokio::test]
async fn sweep_follows_membership_changes() {
    let h = harness(vec![cpu_group(&[
        ("i-1", LifecycleState::InService),
        ("i-2", LifecycleState::InService),
    ])]);
    h.reconciler.full_sweep().await.unwrap();

    h.scaling.set_groups(vec![cpu_group(&[
        ("i-2", LifecycleState::InService),
        ("i-3", LifecycleState::InService),
    ])]);
    let report = h.reconciler.full_sweep().await.unwrap();

    let created: Vec<&str> = report.created.iter().map(|n| n.as_str()).collect();
    assert_eq!(created, vec!["InstanceAlarm:i-3:cpu-high"]);
    assert_eq!(report.deleted, vec!["InstanceAlarm:i-1:cpu-high"]);
    assert_eq!(
        h.alarms.alarm_names(),
        vec!["InstanceAlarm:i-2:cpu-high", "InstanceAlarm:i-3:cpu-high"]
    );
}

#[tokio::test]
async fn sweep_fetches_each_template_once() {
    let instances: Vec<(String, LifecycleState)> = (0..7)
        .map(|i| (format!("i-{i}"), LifecycleState::InService))
        .collect();
    let refs: Vec<(&str, LifecycleState)> = instances
        .iter()
        .map(|(id, s)| (id.as_str(), s.clone()))
        .collect();
    let h = harness(vec![cpu_group(&refs)]);

    h.reconciler.full_sweep().await.unwrap();
    h.reconciler.on_launch("g1", "i-99").await.unwrap();

    assert_eq!(h.templates.fetch_count("cpu-high"), 1);
    assert_eq!(h.templates.fetch_count("disk"), 0);
}

#[tokio::test]
async fn sweep_deletes_orphans_in_bounded_batches() {
    let h = harness(vec![cpu_group(&[])]);
    for i in 0..5 {
        h.alarms.seed(&format!("InstanceAlarm:i-{i}:cpu-high"));
    }
    let reconciler = Reconciler::new(h.scaling.clone(), h.alarms.clone(), h.templates.clone())
        .with_deleter(BatchDeleter::new(2).unwrap());

    let report = reconciler.full_sweep().await.unwrap();

    assert_eq!(report.deleted.len(), 5);
    let sizes: Vec<usize> = h.alarms.delete_calls().iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
    assert!(h.alarms.alarm_names().is_empty());
}

#[tokio::test]
async fn failed_delete_aborts_the_sweep() {
    let h = harness(vec![cpu_group(&[])]);
    h.alarms.seed("InstanceAlarm:i-9:cpu-high");
    h.alarms.fail_delete_call(0);

    let err = h.reconciler.full_sweep().await.unwrap_err();
    assert!(matches!(err, AlarmError::Backend { operation: "DeleteAlarms", .. }));
    assert_eq!(h.alarms.alarm_names(), vec!["InstanceAlarm:i-9:cpu-high"]);
}

// ── Events ────────────────────────────────────────────────────────

#[tokio::test]
async fn handle_dispatches_events() {
    let h = harness(vec![cpu_group(&[("i-1", LifecycleState::InService)])]);

    let launch = LifecycleEvent::parse(
        r#"{"detail-type":"EC2 Instance Launch Successful",
            "detail":{"AutoScalingGroupName":"g1","EC2InstanceId":"i-1"}}"#,
    )
    .unwrap();
    let report = h.reconciler.handle(&launch).await.unwrap();
    assert_eq!(report.created.len(), 1);

    let sweep = LifecycleEvent::parse(r#"{"detail-type":"Scheduled Event"}"#).unwrap();
    assert!(h.reconciler.handle(&sweep).await.unwrap().is_noop());

    let terminate = LifecycleEvent::parse(r#"{"kind":"terminate","instance_id":"i-1"}"#).unwrap();
    let report = h.reconciler.handle(&terminate).await.unwrap();
    assert_eq!(report.deleted, vec!["InstanceAlarm:i-1:cpu-high"]);
    assert!(h.alarms.alarm_names().is_empty());
}
