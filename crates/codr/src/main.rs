//! Unified launcher.
//!
//! Usage:
//!     codr gateway --port 8000
//!     codr worker --worker-id w1

use clap::{Parser, Subcommand};
use codr_bus::{RedisBus, RedisJobStore};
use codr_gateway::{router, AppState};
use codr_logging::LogConfig;
use codr_security::TokenService;
use codr_worker::{Worker, WorkerConfig};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Parser, Debug)]
#[command(name = "codr", about = "Unified launcher for the codr execution service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the WebSocket gateway.
    Gateway {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        verbose: bool,
    },
    /// Run an execution worker.
    Worker {
        #[arg(long)]
        redis_url: Option<String>,
        #[arg(long)]
        worker_id: Option<String>,
        #[arg(long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Gateway { host, port, verbose } => run_gateway(host, port, verbose).await,
        Commands::Worker {
            redis_url,
            worker_id,
            verbose,
        } => run_worker(redis_url, worker_id, verbose).await,
    }
}

async fn run_gateway(host: Option<String>, port: Option<u16>, verbose: bool) -> anyhow::Result<()> {
    codr_logging::init_logging(LogConfig {
        app_name: "codr_gateway",
        verbose,
    })?;

    let mut config = codr_protocol::Config::from_env()?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    let (conn, client) = codr_bus::connect(&config.redis_url).await?;
    let store = RedisJobStore::new(conn.clone(), config.redis_ttl_secs);
    let bus = RedisBus::new(conn, client, config.job_queue_name.clone());
    let token_service = TokenService::new(config.jwt_secret.clone(), config.jwt_expiration_minutes);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(%addr, "starting codr gateway");

    let cors_origins = config.cors_origins_list();
    let cors = if cors_origins == vec!["*".to_string()] {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    };

    let state = AppState::new(store, bus, token_service, config);
    let app = router(state).layer(cors).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

async fn run_worker(redis_url: Option<String>, worker_id: Option<String>, verbose: bool) -> anyhow::Result<()> {
    codr_logging::init_logging(LogConfig {
        app_name: "codr_worker",
        verbose,
    })?;

    let mut config = codr_protocol::Config::from_env()?;
    if let Some(redis_url) = redis_url {
        config.redis_url = redis_url;
    }
    let worker_id = worker_id
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
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(true);
    });

    worker.run(shutdown_rx).await;
    Ok(())
}
