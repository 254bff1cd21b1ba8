//! Play-by-mail engine - Main entry point.
//!
//! Runs the job queues and the turn scheduler until Ctrl-C.

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use playbymail_engine::app::App;
use playbymail_engine::config::EngineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine is usually run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playbymail_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting play-by-mail engine");

    let config = EngineConfig::from_env()?;
    tracing::info!(
        database_url = %config.database_url,
        renderer_url = %config.renderer_url,
        scheduler_interval_secs = config.scheduler_interval.as_secs(),
        game_queue_workers = config.game_queue_workers,
        default_queue_workers = config.default_queue_workers,
        "Configuration loaded"
    );

    let app = App::from_config(&config).await?;

    let shutdown = CancellationToken::new();
    let handles = app.spawn_workers(&config, shutdown.clone());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested, waiting for in-flight jobs");
    shutdown.cancel();

    for handle in handles {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Worker task ended abnormally");
        }
    }

    tracing::info!("Play-by-mail engine stopped");
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
