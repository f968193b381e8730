//! Labsight server — caches AI-generated insights for diagnostic test
//! results and runs analysis-engine calls in the background.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use labsight::api::{insights_router, ApiContext};
use labsight::config;
use labsight::core_state::CoreState;
use labsight::pipeline::analysis::HttpAnalysisClient;
use labsight::pipeline::InsightOrchestrator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let db_path = config::default_db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let state = Arc::new(CoreState::new(db_path));
    // Open once at startup so migrations run before the first request
    state.open_db()?;

    let client = Arc::new(HttpAnalysisClient::from_env());
    let orchestrator = Arc::new(InsightOrchestrator::new(state, client));
    let app = insights_router(ApiContext::new(orchestrator));

    let addr = config::bind_addr();
    tracing::info!("Listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
