use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Body of `POST /api/optimize`.
#[derive(Debug, Clone, Deserialize)]
pub struct OptimizationRequest {
    pub tickers: Vec<String>,
    #[serde(default)]
    pub start_date: Option<String>,
}

/// Weight assigned to each asset, aligned with `ReturnsTable::tickers`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightVector {
    pub tickers: Vec<String>,
    pub weights: Vec<f64>,
}

impl WeightVector {
    pub fn get(&self, ticker: &str) -> Option<f64> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.weights[i])
    }

    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }
}

/// Raw backtest statistics, expressed as fractions.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceReport {
    pub total_return: f64,
    pub annual_return: f64,
    pub volatility: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    /// Full cumulative growth curve, starting from the first period's value.
    pub cumulative: Vec<f64>,
    pub history: Vec<HistoryPoint>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistoryPoint {
    #[serde(serialize_with = "serialize_iso_date")]
    pub date: NaiveDate,
    pub value: f64,
}

fn serialize_iso_date<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
}

/// Display metrics: percents rounded to 2 decimals, sharpe rounded to 2 decimals.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Metrics {
    pub annual_return: f64,
    pub volatility: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
}

/// Reported allocation, largest first.
///
/// Serialized as a JSON object whose key order follows the vector order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationWeights(pub Vec<(String, f64)>);

impl AllocationWeights {
    pub fn iter(&self) -> impl Iterator<Item = &(String, f64)> {
        self.0.iter()
    }
}

impl Serialize for AllocationWeights {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (ticker, weight) in &self.0 {
            map.serialize_entry(ticker, weight)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OptimizationResult {
    Success {
        weights: AllocationWeights,
        metrics: Metrics,
        history: Vec<HistoryPoint>,
    },
    Error {
        message: String,
    },
}

impl OptimizationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, OptimizationResult::Success { .. })
    }
}
