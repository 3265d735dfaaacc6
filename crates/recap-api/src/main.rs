use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recap_api::{build_router, config::Config, state::AppState};
use recap_summarize::Summarizer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting Recap API server");
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        backend = ?config.storage.backend,
        models = ?config.summarization.candidate_models,
        "Config loaded"
    );

    let (state, worker) = AppState::from_config(config.clone()).await?;
    let worker_handle = worker.spawn();
    let sweeper_handle = spawn_sweeper(
        state.summarizer.clone(),
        Duration::from_secs(config.server.sweep_interval_secs.max(1)),
    );

    let app = build_router(Arc::new(state));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Once every summarizer handle is dropped the worker drains its queue and exits
    sweeper_handle.abort();
    if let Err(e) = worker_handle.await {
        tracing::error!(error = %e, "Summary worker panicked");
    }

    Ok(())
}

fn spawn_sweeper(summarizer: Summarizer, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match summarizer.sweep_stale_summaries().await {
                Ok(0) => {}
                Ok(swept) => tracing::warn!(swept, "Failed stale summaries"),
                Err(e) => tracing::error!(error = %e, "Stale summary sweep failed"),
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
