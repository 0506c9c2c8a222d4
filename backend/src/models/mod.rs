pub mod optimization;
pub mod returns;

pub use optimization::{
    AllocationWeights, HistoryPoint, Metrics, OptimizationRequest, OptimizationResult,
    PerformanceReport, WeightVector,
};
pub use returns::{ReturnsTable, MIN_ASSETS, MIN_PERIODS};
