//! edugame-ai - AI Services Microservice
//!
//! HTTP façade over speech transcription, audio and text emotion
//! classification, and the tutor agent. Models are reached through
//! configurable backends and loaded on first use.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edugame_ai::backends::factory::BackendFactory;
use edugame_ai::config::{CliOverrides, ServiceConfig};
use edugame_ai::services::{AgentSettings, ModelRegistry, PedagogicalRecommender};
use edugame_ai::AppState;
use edugame_common::config::ConfigResolver;

/// Command-line arguments for edugame-ai
#[derive(Parser, Debug)]
#[command(name = "edugame-ai")]
#[command(about = "AI services microservice for EduGame")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "EDUGAME_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "EDUGAME_AI_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "EDUGAME_AI_PORT")]
    port: Option<u16>,

    /// Log level when RUST_LOG is unset
    #[arg(long, env = "EDUGAME_LOG_LEVEL")]
    log_level: Option<String>,

    /// Replacement recommendation table (TOML)
    #[arg(long, env = "EDUGAME_RECOMMENDATION_TABLE")]
    recommendation_table: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before the subscriber exists so its level can apply;
    // resolution problems are reported once logging is up.
    let resolver = ConfigResolver::new("ai-services");
    let toml_config = resolver.load(args.config.as_deref());
    let overrides = CliOverrides {
        host: args.host.clone(),
        port: args.port,
        log_level: args.log_level.clone(),
        table_path: args.recommendation_table.clone(),
    };
    let default_level = overrides
        .log_level
        .clone()
        .or_else(|| toml_config.as_ref().ok().map(|c| c.logging.level.clone()))
        .unwrap_or_else(|| "info".to_string());

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("edugame_ai={0},edugame_common={0},tower_http=info", default_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting edugame-ai (AI Services) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
    );

    if let Some(path) = resolver.resolve_path(args.config.as_deref()) {
        if path.exists() {
            info!("Config file: {}", path.display());
        } else {
            info!("No config file at {}, using built-in defaults", path.display());
        }
    }

    let config = ServiceConfig::from_toml(toml_config.context("Failed to load configuration")?)
        .with_overrides(&overrides);
    config.validate().context("Invalid configuration")?;
    config.log_summary();

    let recommender = PedagogicalRecommender::from_path(config.table_path.as_deref())
        .context("Failed to load recommendation table")?;
    info!(
        emotions = recommender.table().recommendations.len(),
        "Recommendation table ready"
    );

    let registry = Arc::new(ModelRegistry::new(
        Arc::new(BackendFactory::new(config.models.clone())),
        Arc::new(recommender),
        config.transcriber_settings(),
        AgentSettings::default(),
    ));

    let bind_addr = config.bind_addr();
    let state = AppState::new(registry, Arc::new(config));
    let app = edugame_ai::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);
    info!("Models load on first use");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
