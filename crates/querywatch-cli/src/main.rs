//! querywatch CLI
//!
//! Prints the admin task / outdated-query reports as JSON, runs retention
//! sweeps, and can drive a small local simulation of executor + refresher.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use querywatch_core::app::{
    RetentionSweeper, SnapshotPublisher, SnapshotReader, StatusReporter, TaskListLimits,
    TaskTracker,
};
use querywatch_core::config::TrackerConfig;
use querywatch_core::domain::{QueryId, Stage, TrackerError};
use querywatch_core::impls::InMemoryStore;
use querywatch_core::observability::init_tracing;
use querywatch_core::ports::{Clock, IdGenerator, SharedStore, SystemClock, UlidGenerator};

#[derive(Parser)]
#[command(name = "querywatch")]
#[command(about = "Inspect query task queues and outdated queries")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML/YAML/JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Redis URL of the shared store (requires the `redis` feature).
    /// Without it an in-memory store is used.
    #[arg(long, global = true)]
    redis_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Most recent tasks per stage
    Tasks {
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long)]
        waiting_limit: Option<i64>,
        #[arg(long)]
        progress_limit: Option<i64>,
        #[arg(long)]
        done_limit: Option<i64>,
    },
    /// Outdated queries from the staleness snapshot
    Outdated,
    /// Task counts per stage (holes included)
    Counts,
    /// Run one retention sweep
    Sweep,
    /// Register, run and finish some tasks against the store, publish a snapshot,
    /// then print both reports
    Simulate {
        #[arg(long, default_value_t = 5)]
        tasks: usize,
    },
}

async fn open_store(redis_url: Option<&str>) -> Result<Arc<dyn SharedStore>> {
    match redis_url {
        #[cfg(feature = "redis")]
        Some(url) => {
            let store = querywatch_core::impls::RedisStore::connect(url)
                .await
                .context("connecting to Redis")?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis"))]
        Some(_) => anyhow::bail!("--redis-url needs a build with the `redis` feature"),
        None => {
            warn!("No --redis-url given, using a process-local in-memory store");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn simulate(
    tracker: &TaskTracker,
    publisher: &SnapshotPublisher,
    clock: Arc<dyn Clock>,
    tasks: usize,
) -> Result<()> {
    let ids = UlidGenerator::new(clock.clone());
    let mut outdated = Vec::new();

    for n in 0..tasks {
        let task_id = ids.generate_task_id();
        let query_id = QueryId::new(format!("{}", n + 1));
        tracker
            .register(
                task_id.clone(),
                query_id.clone(),
                serde_json::json!({
                    "task_id": task_id.as_str(),
                    "query_id": query_id.as_str(),
                    "username": "scheduler",
                }),
            )
            .await?;

        // Leave the first task waiting, run the rest, finish every other one.
        if n == 0 {
            continue;
        }
        tracker.transition(&task_id, Stage::InProgress).await?;
        if n % 2 == 0 {
            tracker.transition(&task_id, Stage::Done).await?;
            outdated.push(query_id);
        }
    }

    // An executor transitioning a task that was already evicted logs and moves on.
    let ghost = ids.generate_task_id();
    match tracker.transition(&ghost, Stage::Done).await {
        Err(TrackerError::UnknownTask(id)) => info!(task_id = %id, "Dropped transition"),
        other => {
            other?;
        }
    }

    publisher.publish(outdated, clock.now()).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("querywatch_core=info,querywatch_cli=info");
    let cli = Cli::parse();

    let config = TrackerConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let store = open_store(cli.redis_url.as_deref()).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    info!(backend = store.backend_name(), prefix = %config.key_prefix, "Store ready");

    let tracker = TaskTracker::new(store.clone(), clock.clone(), config.clone());
    let reporter = StatusReporter::new(tracker.clone(), SnapshotReader::new(store.clone(), &config));

    match cli.command {
        Commands::Tasks {
            limit,
            waiting_limit,
            progress_limit,
            done_limit,
        } => {
            let limits = TaskListLimits::resolve(limit, waiting_limit, progress_limit, done_limit);
            print_json(&reporter.tasks(limits).await?)?;
        }
        Commands::Outdated => print_json(&reporter.outdated().await?)?,
        Commands::Counts => print_json(&tracker.counts().await?)?,
        Commands::Sweep => {
            let report = RetentionSweeper::new(tracker.clone()).sweep_once().await?;
            println!(
                "evicted={} holes_removed={}",
                report.evicted, report.holes_removed
            );
        }
        Commands::Simulate { tasks } => {
            let publisher = SnapshotPublisher::new(store.clone(), &config);
            simulate(&tracker, &publisher, clock.clone(), tasks).await?;
            print_json(&serde_json::json!({
                "tasks": reporter.tasks(TaskListLimits::default()).await?,
                "outdated": reporter.outdated().await?,
            }))?;
        }
    }

    Ok(())
}
