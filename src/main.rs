use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::prelude::*;

use busbot::bot::{Database, Engine, SmsClient};
use busbot::config::Config;
use busbot::server::{AppState, build_router};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "busbot.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("busbot.log"))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file in {}: {e}", log_dir.display());
            std::process::exit(1);
        }
    };
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚌 Starting busbot...");
    info!("Loaded config from {config_path}");
    info!("Superuser: {}", config.superuser);
    let database = match Database::open(&config.database_path()) {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {e}");
            std::process::exit(1);
        }
    };

    let sms = SmsClient::new(config.sms.clone());
    if sms.is_dry_run() {
        info!("DRY RUN mode enabled, messages will only be logged");
    }

    let state = Arc::new(AppState {
        engine: Engine::new(Arc::new(database), config.settings()),
        sms,
    });
    let app = build_router(state);

    let listener = match tokio::net::TcpListener::bind(&config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {e}", config.listen_addr);
            std::process::exit(1);
        }
    };
    info!("Listening on {}", config.listen_addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}
