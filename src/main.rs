use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taskweave::config::Config;
use taskweave::data::BusinessDataset;
use taskweave::llm::{NarrativeClient, OllamaBackend};
use taskweave::routes::create_router;
use taskweave::{db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskweave=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    let dataset = BusinessDataset::load(&config.orchestrator.data_file);

    let backend = OllamaBackend::new(&config.ollama)
        .map_err(|e| anyhow::anyhow!("Failed to set up narrative backend: {e}"))?;
    let narrative = NarrativeClient::new(Box::new(backend));
    let availability = narrative.check_availability().await;
    if availability.available {
        info!(models = ?availability.models, "Narrative backend available");
    } else {
        warn!(
            error = ?availability.error,
            "Narrative backend unreachable, fallback responses will be used"
        );
    }

    let pool = db::create_pool(&config.database).await;

    let port = config.server.port;
    let state = AppState::new(config, dataset, narrative, pool);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {e}"))?;

    Ok(())
}
