/// Correlation and distance construction for clustering.
///
/// Distances follow `d(i, j) = sqrt(0.5 * (1 - corr(i, j)))`, so perfectly
/// correlated assets sit at 0 and perfectly anti-correlated assets at 1.

use ndarray::Array2;

use crate::errors::OptimizationError;
use crate::models::{ReturnsTable, MIN_ASSETS, MIN_PERIODS};

/// Symmetric, zero-diagonal matrix of pairwise asset distances in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    values: Array2<f64>,
}

impl DistanceMatrix {
    /// Wrap a precomputed matrix after checking it is square.
    pub fn from_array(values: Array2<f64>) -> Result<Self, OptimizationError> {
        if values.nrows() != values.ncols() {
            return Err(OptimizationError::Clustering(format!(
                "distance matrix must be square, got {}x{}",
                values.nrows(),
                values.ncols()
            )));
        }
        Ok(Self { values })
    }

    pub fn asset_count(&self) -> usize {
        self.values.nrows()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[[i, j]]
    }
}

/// Sample covariance matrix (n - 1 denominator) of the return columns.
pub fn covariance_matrix(table: &ReturnsTable) -> Array2<f64> {
    let t = table.period_count();
    let n = table.asset_count();
    let mut cov = Array2::<f64>::zeros((n, n));
    if t < 2 {
        return cov;
    }

    let means: Vec<f64> = (0..n)
        .map(|c| table.column(c).sum() / t as f64)
        .collect();

    for i in 0..n {
        for j in i..n {
            let s: f64 = table
                .column(i)
                .iter()
                .zip(table.column(j).iter())
                .map(|(a, b)| (a - means[i]) * (b - means[j]))
                .sum::<f64>()
                / (t as f64 - 1.0);
            cov[[i, j]] = s;
            cov[[j, i]] = s;
        }
    }
    cov
}

/// Pearson correlation matrix derived from a covariance matrix.
///
/// Fails when any asset has zero variance, since its correlation is undefined.
pub fn correlation_from_covariance(
    cov: &Array2<f64>,
    tickers: &[String],
) -> Result<Array2<f64>, OptimizationError> {
    let n = cov.nrows();
    let std: Vec<f64> = (0..n).map(|i| cov[[i, i]].max(0.0).sqrt()).collect();

    if let Some(idx) = std.iter().position(|s| *s <= f64::EPSILON || !s.is_finite()) {
        let name = tickers.get(idx).map(String::as_str).unwrap_or("?");
        return Err(OptimizationError::InsufficientData(format!(
            "asset {} has zero variance; its correlation is undefined",
            name
        )));
    }

    let mut corr = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..n {
            corr[[i, j]] = if i == j {
                1.0
            } else {
                cov[[i, j]] / (std[i] * std[j])
            };
        }
    }
    Ok(corr)
}

/// Pearson correlation matrix of the table's assets.
pub fn correlation_matrix(table: &ReturnsTable) -> Result<Array2<f64>, OptimizationError> {
    validate_shape(table)?;
    correlation_from_covariance(&covariance_matrix(table), table.tickers())
}

/// Map correlations to clustering distances, clamped to `[0, 1]`.
pub fn distance_from_correlation(corr: &Array2<f64>) -> Result<DistanceMatrix, OptimizationError> {
    let n = corr.nrows();
    let mut dist = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let d = (0.5 * (1.0 - corr[[i, j]])).max(0.0).sqrt().min(1.0);
            dist[[i, j]] = d;
            dist[[j, i]] = d;
        }
    }
    DistanceMatrix::from_array(dist)
}

/// Full builder: returns table to distance matrix.
pub fn distance_matrix(table: &ReturnsTable) -> Result<DistanceMatrix, OptimizationError> {
    distance_from_correlation(&correlation_matrix(table)?)
}

pub fn validate_shape(table: &ReturnsTable) -> Result<(), OptimizationError> {
    if table.asset_count() < MIN_ASSETS {
        return Err(OptimizationError::InsufficientData(format!(
            "need at least {} assets, found {}",
            MIN_ASSETS,
            table.asset_count()
        )));
    }
    if table.period_count() < MIN_PERIODS {
        return Err(OptimizationError::InsufficientData(format!(
            "need at least {} return periods, found {}",
            MIN_PERIODS,
            table.period_count()
        )));
    }
    Ok(())
}
