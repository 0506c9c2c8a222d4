use std::sync::Arc;

use crate::config::AppConfig;
use crate::external::price_provider::PriceProvider;

#[derive(Clone)]
pub struct AppState {
    pub price_provider: Arc<dyn PriceProvider>,
    pub config: Arc<AppConfig>,
}
