use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::parse_date;
use crate::errors::AppError;
use crate::models::{OptimizationRequest, OptimizationResult};
use crate::services::optimization_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/api/optimize", post(optimize_portfolio))
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "HRP Optimizer API is running" }))
}

/// Trim, upper-case and de-duplicate symbols, keeping first-seen order.
pub fn normalize_tickers(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for ticker in raw {
        let t = ticker.trim().to_uppercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

/// POST /api/optimize
///
/// Example body: `{"tickers": ["AAPL", "MSFT", "GLD"], "start_date": "2018-01-01"}`
pub async fn optimize_portfolio(
    State(state): State<AppState>,
    Json(payload): Json<OptimizationRequest>,
) -> Result<Json<OptimizationResult>, AppError> {
    let tickers = normalize_tickers(&payload.tickers);
    if tickers.is_empty() {
        return Err(AppError::Validation("At least one ticker is required".to_string()));
    }

    let start = match payload.start_date.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => state.config.start_date()?,
    };

    let timeout = state.config.provider_timeout()?;

    info!("POST /api/optimize - {} tickers since {}", tickers.len(), start);

    let result = optimization_service::optimize(
        state.price_provider.as_ref(),
        &tickers,
        start,
        timeout,
    )
    .await;

    match result {
        OptimizationResult::Error { message } => {
            warn!("Optimization request rejected: {}", message);
            Err(AppError::Optimization(message))
        }
        success => Ok(Json(success)),
    }
}
