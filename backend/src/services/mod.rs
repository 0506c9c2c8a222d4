pub mod backtest;
pub mod bisection;
pub mod clustering;
pub mod distance;
pub mod optimization_service;
pub mod quasi_diag;
pub mod returns_service;

#[cfg(test)]
pub(crate) mod testing;
