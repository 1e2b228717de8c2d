//! instalarmd — the Instalarm daemon.
//!
//! Each invocation runs exactly one reconciliation pass against AWS and
//! exits; the invoking runtime supplies the trigger and retries failures.
//!
//! # Usage
//!
//! ```text
//! instalarmd --bucket my-alarm-templates handle --event event.json
//! instalarmd launch --group web-asg --instance i-0abc
//! instalarmd terminate --instance i-0abc
//! instalarmd --config /etc/instalarm.toml sweep
//! ```

mod settings;

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use instalarm_aws::{AutoScalingGroups, CloudWatchAlarms, S3Templates};
use instalarm_core::InstalarmConfig;
use instalarm_reconcile::{BatchDeleter, LifecycleEvent, Reconciler};

use crate::settings::Overrides;

#[derive(Parser)]
#[command(name = "instalarmd", about = "Per-instance CloudWatch alarm reconciler", version)]
struct Cli {
    /// Path to an instalarm.toml config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bucket holding one alarm template per alarm key.
    #[arg(long, global = true, env = "ALARM_TEMPLATES_BUCKET")]
    bucket: Option<String>,

    /// AWS region; falls back to the SDK's default chain.
    #[arg(long, global = true, env = "AWS_REGION")]
    region: Option<String>,

    /// Alarm names per delete call (1..=100).
    #[arg(long, global = true)]
    delete_batch_size: Option<usize>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dispatch a lifecycle or scheduled event (JSON from a file or stdin).
    Handle {
        /// Event file; stdin when omitted.
        #[arg(long)]
        event: Option<PathBuf>,
    },
    /// Create the alarms owed to a newly launched instance.
    Launch {
        #[arg(long)]
        group: String,
        #[arg(long)]
        instance: String,
    },
    /// Delete every alarm of a terminated instance.
    Terminate {
        #[arg(long)]
        instance: String,
    },
    /// Converge all alarms against all groups.
    Sweep,
}

impl Command {
    fn into_event(self) -> anyhow::Result<LifecycleEvent> {
        Ok(match self {
            Command::Handle { event } => {
                let text = match event {
                    Some(path) => std::fs::read_to_string(&path)
                        .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?,
                    None => {
                        let mut text = String::new();
                        std::io::stdin().read_to_string(&mut text)?;
                        text
                    }
                };
                LifecycleEvent::parse(&text)?
            }
            Command::Launch { group, instance } => LifecycleEvent::Launch {
                group_name: group,
                instance_id: instance,
            },
            Command::Terminate { instance } => LifecycleEvent::Terminate {
                instance_id: instance,
            },
            Command::Sweep => LifecycleEvent::Sweep,
        })
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,instalarm=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = settings::resolve(
        cli.config.as_deref(),
        Overrides {
            bucket: cli.bucket,
            region: cli.region,
            delete_batch_size: cli.delete_batch_size,
        },
    )?;
    let event = cli.command.into_event()?;

    run(config, event).await
}

async fn run(config: InstalarmConfig, event: LifecycleEvent) -> anyhow::Result<()> {
    let bucket = config
        .templates
        .bucket
        .clone()
        .ok_or_else(|| anyhow::anyhow!("templates.bucket is required"))?;
    info!(?event, %bucket, "instalarmd starting");

    // ── AWS clients ────────────────────────────────────────────

    let sdk = instalarm_aws::load_sdk_config(config.region().map(str::to_string)).await;
    let reconciler = Reconciler::new(
        Arc::new(AutoScalingGroups::new(&sdk)),
        Arc::new(CloudWatchAlarms::new(&sdk)),
        Arc::new(S3Templates::new(&sdk, bucket)),
    )
    .with_deleter(BatchDeleter::new(config.alarms.delete_batch_size)?);

    // ── One pass ───────────────────────────────────────────────

    let report = reconciler.handle(&event).await?;
    info!(
        created = report.created.len(),
        deleted = report.deleted.len(),
        "pass complete"
    );
    if !report.is_noop() {
        let created: Vec<&str> = report.created.iter().map(|n| n.as_str()).collect();
        let summary = serde_json::json!({
            "created": created,
            "deleted": report.deleted,
        });
        info!(%summary, "actions taken");
    }
    Ok(())
}
