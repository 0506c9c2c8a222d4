use std::sync::Arc;

use tokio::net::TcpListener;

use hrp_optimizer_backend::config::{AppConfig, ProviderKind};
use hrp_optimizer_backend::external::mock::MockProvider;
use hrp_optimizer_backend::external::price_provider::PriceProvider;
use hrp_optimizer_backend::external::yahoo::YahooProvider;
use hrp_optimizer_backend::logging::{init_logging, LoggingConfig};
use hrp_optimizer_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env())?;

    let config = AppConfig::from_env();
    config.validate().map_err(anyhow::Error::msg)?;

    let provider: Arc<dyn PriceProvider> = match config.provider_kind().map_err(anyhow::Error::msg)? {
        ProviderKind::Yahoo => {
            tracing::info!("📊 Using price provider: Yahoo Finance");
            Arc::new(YahooProvider::new())
        }
        ProviderKind::Mock => {
            tracing::info!("📊 Using price provider: deterministic mock data");
            Arc::new(MockProvider::new())
        }
    };

    let addr = config.socket_addr().map_err(anyhow::Error::msg)?;
    let state = AppState {
        price_provider: provider,
        config: Arc::new(config),
    };
    let app = hrp_optimizer_backend::app::create_app(state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🚀 HRP optimizer backend running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
