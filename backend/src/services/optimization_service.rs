use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, error, info, info_span, Instrument};

use crate::errors::OptimizationError;
use crate::external::price_provider::PriceProvider;
use crate::models::{OptimizationResult, PerformanceReport, ReturnsTable, WeightVector};
use crate::services::backtest::{display_metrics, reported_weights, run_backtest};
use crate::services::bisection::recursive_bisection;
use crate::services::clustering::{ward_linkage, Dendrogram};
use crate::services::distance::{
    correlation_from_covariance, covariance_matrix, distance_from_correlation, validate_shape,
};
use crate::services::quasi_diag::leaf_order;
use crate::services::returns_service::fetch_returns;

/// Everything one HRP run produces before formatting.
#[derive(Debug, Clone)]
pub struct HrpOutcome {
    pub dendrogram: Dendrogram,
    /// Asset indices in quasi-diagonal order.
    pub order: Vec<usize>,
    pub weights: WeightVector,
    pub report: PerformanceReport,
}

/// Run correlation, clustering, ordering, bisection and backtest on a returns table.
pub fn run_pipeline(table: &ReturnsTable) -> Result<HrpOutcome, OptimizationError> {
    validate_shape(table)?;

    let cov = covariance_matrix(table);
    let corr = correlation_from_covariance(&cov, table.tickers())?;
    let dist = distance_from_correlation(&corr)?;
    debug!("Distance matrix built for {} assets", dist.asset_count());

    let dendrogram = ward_linkage(&dist)?;
    let order = leaf_order(&dendrogram);
    debug!("Quasi-diagonal order: {:?}", order);

    let weights = WeightVector {
        tickers: table.tickers().to_vec(),
        weights: recursive_bisection(&order, &cov)?,
    };
    debug!("Allocated weights, total {:.12}", weights.total());

    let report = run_backtest(table, &weights);

    Ok(HrpOutcome {
        dendrogram,
        order,
        weights,
        report,
    })
}

/// Caller-facing view of a successful run.
pub fn format_result(outcome: &HrpOutcome) -> OptimizationResult {
    OptimizationResult::Success {
        weights: reported_weights(&outcome.weights),
        metrics: display_metrics(&outcome.report),
        history: outcome.report.history.clone(),
    }
}

/// Optimize an already prepared returns table; failures become `Error` results.
pub fn optimize_table(table: &ReturnsTable) -> OptimizationResult {
    match run_pipeline(table) {
        Ok(outcome) => format_result(&outcome),
        Err(e) => failure(e),
    }
}

/// Fetch prices for `tickers` and compute the HRP allocation and backtest.
///
/// Never fails: every error along the way is reported as
/// `OptimizationResult::Error` with a readable message.
pub async fn optimize(
    provider: &dyn PriceProvider,
    tickers: &[String],
    start: NaiveDate,
    timeout: Duration,
) -> OptimizationResult {
    let span = info_span!("optimize", tickers = %tickers.join(","), %start);
    async move {
        match try_optimize(provider, tickers, start, timeout).await {
            Ok(result) => result,
            Err(e) => failure(e),
        }
    }
    .instrument(span)
    .await
}

async fn try_optimize(
    provider: &dyn PriceProvider,
    tickers: &[String],
    start: NaiveDate,
    timeout: Duration,
) -> Result<OptimizationResult, OptimizationError> {
    let table = fetch_returns(provider, tickers, start, timeout).await?;
    info!(
        "Running HRP on {} assets over {} periods",
        table.asset_count(),
        table.period_count()
    );

    // numeric work stays off the async workers
    let outcome = tokio::task::spawn_blocking(move || run_pipeline(&table))
        .await
        .map_err(|e| OptimizationError::Allocation(format!("optimization task failed: {}", e)))??;

    info!(
        "✅ HRP complete: annual return {:.4}, volatility {:.4}, sharpe {:.4}",
        outcome.report.annual_return,
        outcome.report.volatility,
        outcome.report.sharpe
    );
    Ok(format_result(&outcome))
}

fn failure(e: OptimizationError) -> OptimizationResult {
    error!("Optimization failed: {}", e);
    OptimizationResult::Error {
        message: e.to_string(),
    }
}
