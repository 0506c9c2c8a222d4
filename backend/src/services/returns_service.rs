use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::join_all;
use ndarray::Array2;
use tracing::{info, warn};

use crate::errors::OptimizationError;
use crate::external::price_provider::{ExternalPricePoint, PriceProvider, PriceProviderError};
use crate::models::{ReturnsTable, MIN_ASSETS};

const INSUFFICIENT_ASSETS: &str = "Insufficient data or assets found.";

/// Fetch every ticker concurrently and build an aligned returns table.
///
/// Tickers the provider cannot serve are dropped with a warning; only when no
/// ticker at all comes back is the whole call treated as a provider failure.
pub async fn fetch_returns(
    provider: &dyn PriceProvider,
    tickers: &[String],
    start: NaiveDate,
    timeout: Duration,
) -> Result<ReturnsTable, OptimizationError> {
    let fetches = tickers.iter().map(|ticker| async move {
        let result = tokio::time::timeout(timeout, provider.fetch_daily_history(ticker, start))
            .await
            .unwrap_or(Err(PriceProviderError::Timeout(timeout.as_secs())));
        (ticker.clone(), result)
    });

    let mut series = Vec::with_capacity(tickers.len());
    let mut failures = Vec::new();

    for (ticker, result) in join_all(fetches).await {
        match result {
            Ok(points) => series.push((ticker, points)),
            Err(e) => {
                warn!("Dropping {}: price fetch failed: {}", ticker, e);
                failures.push(format!("{}: {}", ticker, e));
            }
        }
    }

    if series.is_empty() && !failures.is_empty() {
        return Err(OptimizationError::DataUnavailable(failures.join("; ")));
    }

    info!(
        "Fetched prices for {}/{} tickers since {}",
        series.len(),
        tickers.len(),
        start
    );

    build_returns_table(series)
}

/// Align price series on common dates and convert them to simple returns.
///
/// Dates where any ticker lacks a usable price are dropped. Each return is
/// dated at the later of its two prices.
pub fn build_returns_table(
    series: Vec<(String, Vec<ExternalPricePoint>)>,
) -> Result<ReturnsTable, OptimizationError> {
    let series: Vec<(String, Vec<ExternalPricePoint>)> = series
        .into_iter()
        .filter(|(ticker, points)| {
            if points.is_empty() {
                warn!("Dropping {}: provider returned no prices", ticker);
            }
            !points.is_empty()
        })
        .collect();

    if series.len() < MIN_ASSETS {
        return Err(OptimizationError::InsufficientData(format!(
            "{} Need at least {} assets with price history, got {}.",
            INSUFFICIENT_ASSETS,
            MIN_ASSETS,
            series.len()
        )));
    }

    let n = series.len();
    let mut by_date: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
    for (col, (_, points)) in series.iter().enumerate() {
        for p in points {
            if p.close.is_finite() && p.close > 0.0 {
                by_date.entry(p.date).or_insert_with(|| vec![None; n])[col] = Some(p.close);
            }
        }
    }

    let aligned: Vec<(NaiveDate, Vec<f64>)> = by_date
        .into_iter()
        .filter_map(|(date, row)| row.into_iter().collect::<Option<Vec<f64>>>().map(|r| (date, r)))
        .collect();

    let mut dates = Vec::with_capacity(aligned.len().saturating_sub(1));
    let mut flat = Vec::with_capacity(aligned.len().saturating_sub(1) * n);
    for pair in aligned.windows(2) {
        let (_, prev) = &pair[0];
        let (date, cur) = &pair[1];
        dates.push(*date);
        flat.extend(prev.iter().zip(cur.iter()).map(|(p, c)| c / p - 1.0));
    }

    if dates.is_empty() {
        return Err(OptimizationError::InsufficientData(format!(
            "{} The requested tickers share no overlapping price history.",
            INSUFFICIENT_ASSETS
        )));
    }

    let tickers = series.into_iter().map(|(t, _)| t).collect();
    let returns = Array2::from_shape_vec((dates.len(), n), flat)
        .map_err(|e| OptimizationError::InsufficientData(e.to_string()))?;

    ReturnsTable::new(tickers, dates, returns)
}
