//! codr worker entry point.
//!
//! Usage:
//!     codr-worker --redis-url redis://127.0.0.1:6379

use clap::Parser;
use codr_bus::{RedisBus, RedisJobStore};
use codr_logging::LogConfig;
use codr_worker::{Worker, WorkerConfig};
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(name = "codr-worker", about = "Execution worker for codr")]
struct Args {
    /// Override REDIS_URL from the environment
    #[arg(long)]
    redis_url: Option<String>,

    /// Worker id (auto-generated if not provided)
    #[arg(long)]
    worker_id: Option<String>,

    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    codr_logging::init_logging(LogConfig {
        app_name: "codr_worker",
        verbose: args.verbose,
    })?;

    let mut config = codr_protocol::Config::from_env()?;
    if let Some(redis_url) = args.redis_url {
        config.redis_url = redis_url;
    }
    let worker_id = args
        .worker_id
        .or(config.worker_id.clone())
        .unwrap_or_else(|| format!("worker-{}", uuid::Uuid::new_v4()));

    tracing::info!(worker_id = %worker_id, redis_url = %config.redis_url, "starting codr worker");

    let (conn, client) = codr_bus::connect(&config.redis_url).await?;
    let store = RedisJobStore::new(conn.clone(), config.redis_ttl_secs);
    let bus = RedisBus::new(conn, client, config.job_queue_name.clone());

    let worker_config = WorkerConfig {
        queue_name: config.job_queue_name.clone(),
        poll_timeout_secs: config.worker_poll_timeout_secs,
        execution_timeout_secs: config.execution_timeout_secs,
        max_memory_mb: config.max_memory_mb,
        max_file_size_mb: config.max_file_size_mb,
        compilation_timeout_secs: config.compilation_timeout_secs,
        worker_id,
    };

    let worker = Worker::new(store, bus, worker_config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received, draining in-flight job");
        let _ = shutdown_tx.send(true);
    });

    worker.run(shutdown_rx).await;
    tracing::info!(failures = worker.failure_count(), "codr worker exiting");

    Ok(())
}
