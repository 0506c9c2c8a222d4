use chrono::NaiveDate;
use ndarray::{Array2, ArrayView1};

use crate::errors::OptimizationError;

/// Fewest return periods accepted for a correlation estimate.
pub const MIN_PERIODS: usize = 20;

/// Fewest assets an allocation can be built from.
pub const MIN_ASSETS: usize = 2;

/// Aligned periodic returns: rows are dates, columns are tickers.
///
/// Construction checks the shape once; the table is never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnsTable {
    tickers: Vec<String>,
    dates: Vec<NaiveDate>,
    returns: Array2<f64>,
}

impl ReturnsTable {
    pub fn new(
        tickers: Vec<String>,
        dates: Vec<NaiveDate>,
        returns: Array2<f64>,
    ) -> Result<Self, OptimizationError> {
        if returns.ncols() != tickers.len() || returns.nrows() != dates.len() {
            return Err(OptimizationError::InsufficientData(format!(
                "returns matrix is {}x{} but there are {} dates and {} tickers",
                returns.nrows(),
                returns.ncols(),
                dates.len(),
                tickers.len()
            )));
        }
        if let Some(bad) = returns.iter().find(|r| !r.is_finite()) {
            return Err(OptimizationError::InsufficientData(format!(
                "returns contain a non-finite value ({})",
                bad
            )));
        }
        Ok(Self { tickers, dates, returns })
    }

    /// Build from row vectors, mostly useful for fixtures.
    pub fn from_rows(
        tickers: Vec<String>,
        dates: Vec<NaiveDate>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, OptimizationError> {
        let n = tickers.len();
        if rows.iter().any(|r| r.len() != n) {
            return Err(OptimizationError::InsufficientData(
                "every return row must have one value per ticker".to_string(),
            ));
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let returns = Array2::from_shape_vec((flat.len() / n.max(1), n), flat)
            .map_err(|e| OptimizationError::InsufficientData(e.to_string()))?;
        Self::new(tickers, dates, returns)
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn returns(&self) -> &Array2<f64> {
        &self.returns
    }

    pub fn asset_count(&self) -> usize {
        self.tickers.len()
    }

    pub fn period_count(&self) -> usize {
        self.dates.len()
    }

    pub fn column(&self, asset: usize) -> ArrayView1<'_, f64> {
        self.returns.column(asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n).map(|i| start + chrono::Duration::days(i as i64)).collect()
    }

    #[test]
    fn test_from_rows_builds_matrix() {
        let table = ReturnsTable::from_rows(
            vec!["A".into(), "B".into()],
            dates(3),
            vec![vec![0.01, 0.02], vec![-0.01, 0.0], vec![0.03, -0.02]],
        )
        .unwrap();
        assert_eq!(table.asset_count(), 2);
        assert_eq!(table.period_count(), 3);
        assert_eq!(table.column(1).to_vec(), vec![0.02, 0.0, -0.02]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = ReturnsTable::from_rows(
            vec!["A".into(), "B".into()],
            dates(2),
            vec![vec![0.01, 0.02], vec![0.01]],
        );
        assert!(matches!(result, Err(OptimizationError::InsufficientData(_))));
    }

    #[test]
    fn test_nan_rejected() {
        let result = ReturnsTable::from_rows(
            vec!["A".into(), "B".into()],
            dates(2),
            vec![vec![0.01, f64::NAN], vec![0.01, 0.02]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_date_count_must_match_rows() {
        let result = ReturnsTable::from_rows(
            vec!["A".into(), "B".into()],
            dates(1),
            vec![vec![0.01, 0.02], vec![0.01, 0.03]],
        );
        assert!(result.is_err());
    }
}
