use consulting_agent::{api::start_server, logging, AppConfig, Orchestrator};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();
    logging::init("info");

    let config = AppConfig::from_env()?;
    if config.gemini_api_key.is_empty() {
        warn!("⚠️  GEMINI_API_KEY not set; model calls will fail");
        warn!("📌 See .env.example for setup instructions");
    }

    info!("🚀 소상공인 컨설팅 에이전트 - API Server");
    info!("📍 Port: {}", config.port);

    let orchestrator = Arc::new(Orchestrator::from_config(&config));

    info!("✅ Orchestrator initialized");
    info!("📡 Starting API server...");

    start_server(orchestrator, config.port).await?;

    Ok(())
}
