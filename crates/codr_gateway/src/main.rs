//! codr gateway entry point.
//!
//! Usage:
//!     codr-gateway --host 0.0.0.0 --port 8000

use clap::Parser;
use codr_bus::{RedisBus, RedisJobStore};
use codr_gateway::{router, AppState};
use codr_logging::LogConfig;
use codr_security::TokenService;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Parser, Debug)]
#[command(name = "codr-gateway", about = "WebSocket gateway for codr")]
struct Args {
    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    codr_logging::init_logging(LogConfig {
        app_name: "codr_gateway",
        verbose: args.verbose,
    })?;

    let mut config = codr_protocol::Config::from_env()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
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
        let origins: Vec<_> = cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    };

    let state = AppState::new(store, bus, token_service, config);
    let app = router(state).layer(cors).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("gateway shutdown signal received");
}
