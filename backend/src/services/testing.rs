//! Test doubles shared by the service and route tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};

use crate::external::price_provider::{ExternalPricePoint, PriceProvider, PriceProviderError};

/// Provider serving canned series; unknown tickers answer with a 404-style error.
#[derive(Default)]
pub struct StaticProvider {
    series: HashMap<String, Vec<ExternalPricePoint>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, ticker: &str, points: Vec<ExternalPricePoint>) -> Self {
        self.series.insert(ticker.to_string(), points);
        self
    }

    /// Add a ticker whose prices follow the given per-period returns.
    pub fn with_returns(self, ticker: &str, start: NaiveDate, returns: &[f64]) -> Self {
        let points = prices_from_returns(start, 100.0, returns);
        self.with_series(ticker, points)
    }
}

#[async_trait]
impl PriceProvider for StaticProvider {
    async fn fetch_daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        self.series
            .get(ticker)
            .map(|points| points.iter().filter(|p| p.date >= start).cloned().collect())
            .ok_or_else(|| PriceProviderError::BadResponse(format!("404: unknown symbol {}", ticker)))
    }
}

/// Daily price path starting at `base` on `start` and compounding `returns`.
pub fn prices_from_returns(start: NaiveDate, base: f64, returns: &[f64]) -> Vec<ExternalPricePoint> {
    let mut price = base;
    let mut points = vec![ExternalPricePoint { date: start, close: price }];
    for (i, r) in returns.iter().enumerate() {
        price *= 1.0 + r;
        points.push(ExternalPricePoint {
            date: start + Duration::days(i as i64 + 1),
            close: price,
        });
    }
    points
}

/// Deterministic, non-degenerate return path; `phase` and `scale` vary the asset.
pub fn synthetic_returns(periods: usize, phase: f64, scale: f64) -> Vec<f64> {
    (0..periods)
        .map(|i| {
            let t = i as f64;
            scale * ((t * 0.7 + phase).sin() + 0.5 * (t * 0.31 + 2.0 * phase).cos()) + 0.0003
        })
        .collect()
}
