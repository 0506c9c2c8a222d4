use crate::models::{
    AllocationWeights, HistoryPoint, Metrics, PerformanceReport, ReturnsTable, WeightVector,
};

/// Trading periods per year used for annualization.
pub const PERIODS_PER_YEAR: f64 = 252.0;

/// Every n-th cumulative point is kept for the display curve.
pub const HISTORY_STRIDE: usize = 5;

/// Allocations below this fraction are left out of the reported weights.
pub const MIN_REPORTED_WEIGHT: f64 = 0.01;

/// Portfolio return per period: dot product of each return row with the weights.
pub fn portfolio_returns(table: &ReturnsTable, weights: &WeightVector) -> Vec<f64> {
    // Only assets present in the table take part
    let aligned: Vec<f64> = table
        .tickers()
        .iter()
        .map(|t| weights.get(t).unwrap_or(0.0))
        .collect();

    table
        .returns()
        .rows()
        .into_iter()
        .map(|row| row.iter().zip(aligned.iter()).map(|(r, w)| r * w).sum())
        .collect()
}

/// Running product of `1 + r`.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0_f64, |acc, r| {
            *acc *= 1.0 + r;
            Some(*acc)
        })
        .collect()
}

/// Sample standard deviation (n - 1 denominator).
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        / (values.len() as f64 - 1.0);
    variance.sqrt()
}

/// Deepest peak-to-trough decline of a cumulative curve, as a non-positive fraction.
pub fn max_drawdown(cumulative: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &value in cumulative {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let dd = value / peak - 1.0;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Two-decimal rounding with exact halves going to the even digit.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Apply a weight vector to the returns table and derive performance statistics.
pub fn run_backtest(table: &ReturnsTable, weights: &WeightVector) -> PerformanceReport {
    let returns = portfolio_returns(table, weights);
    let cumulative = cumulative_returns(&returns);
    let periods = returns.len();

    let total_return = cumulative.last().copied().unwrap_or(1.0) - 1.0;
    let annual_return = if periods > 0 {
        (1.0 + total_return).powf(PERIODS_PER_YEAR / periods as f64) - 1.0
    } else {
        0.0
    };
    let volatility = sample_std(&returns) * PERIODS_PER_YEAR.sqrt();
    let sharpe = if volatility > 0.0 { annual_return / volatility } else { 0.0 };
    let max_drawdown = max_drawdown(&cumulative);

    let history = table
        .dates()
        .iter()
        .zip(cumulative.iter())
        .step_by(HISTORY_STRIDE)
        .map(|(date, value)| HistoryPoint {
            date: *date,
            value: round2((value - 1.0) * 100.0),
        })
        .collect();

    PerformanceReport {
        total_return,
        annual_return,
        volatility,
        sharpe,
        max_drawdown,
        cumulative,
        history,
    }
}

/// Percent metrics rounded for display.
pub fn display_metrics(report: &PerformanceReport) -> Metrics {
    Metrics {
        annual_return: round2(report.annual_return * 100.0),
        volatility: round2(report.volatility * 100.0),
        sharpe: round2(report.sharpe),
        max_drawdown: round2(report.max_drawdown * 100.0),
    }
}

/// Drop allocations under 1% and sort the rest largest first.
///
/// The underlying weights are not renormalized.
pub fn reported_weights(weights: &WeightVector) -> AllocationWeights {
    let mut kept: Vec<(String, f64)> = weights
        .tickers
        .iter()
        .cloned()
        .zip(weights.weights.iter().copied())
        .filter(|(_, w)| *w >= MIN_REPORTED_WEIGHT)
        .collect();
    kept.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    AllocationWeights(kept)
}
