/// End-to-end checks of the HRP pipeline against the deterministic mock provider.
///
/// These run without network access: `MockProvider` generates a seeded random
/// walk per ticker, pinned to a fixed end date so results never drift.

use std::time::Duration;

use chrono::NaiveDate;
use hrp_optimizer_backend::external::mock::MockProvider;
use hrp_optimizer_backend::models::OptimizationResult;
use hrp_optimizer_backend::services::backtest::HISTORY_STRIDE;
use hrp_optimizer_backend::services::optimization_service::{optimize, run_pipeline};
use hrp_optimizer_backend::services::returns_service::fetch_returns;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn provider() -> MockProvider {
    MockProvider::ending_on(date(2024, 6, 28))
}

fn tickers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

const UNIVERSE: [&str; 10] = [
    "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "JPM", "JNJ", "V", "NVDA", "PG",
];

#[tokio::test]
async fn weights_sum_to_one_for_every_universe_size() {
    let provider = provider();
    for n in 2..=UNIVERSE.len() {
        let table = fetch_returns(
            &provider,
            &tickers(&UNIVERSE[..n]),
            date(2023, 1, 2),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        let outcome = run_pipeline(&table).unwrap();
        let total: f64 = outcome.weights.weights.iter().sum();
        assert!((total - 1.0).abs() < 1e-9, "n={} total={}", n, total);
        assert!(outcome.weights.weights.iter().all(|w| *w >= 0.0));
        assert_eq!(outcome.dendrogram.merges().len(), n - 1);

        let mut order = outcome.order.clone();
        order.sort_unstable();
        assert_eq!(order, (0..n).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn repeated_runs_are_identical() {
    let provider = provider();
    let names = tickers(&UNIVERSE);
    let first = optimize(&provider, &names, date(2022, 1, 3), Duration::from_secs(5)).await;
    let second = optimize(&provider, &names, date(2022, 1, 3), Duration::from_secs(5)).await;

    assert!(first.is_success());
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn history_is_downsampled_and_drawdown_non_positive() {
    let provider = provider();
    let table = fetch_returns(
        &provider,
        &tickers(&["SPY", "TLT", "GLD"]),
        date(2024, 1, 1),
        Duration::from_secs(5),
    )
    .await
    .unwrap();

    let outcome = run_pipeline(&table).unwrap();
    let expected = (table.period_count() + HISTORY_STRIDE - 1) / HISTORY_STRIDE;
    assert_eq!(outcome.report.history.len(), expected);
    assert_eq!(outcome.report.history[0].date, table.dates()[0]);
    assert!(outcome.report.max_drawdown <= 0.0);
}

#[tokio::test]
async fn window_too_short_is_reported_as_error() {
    let provider = provider();
    // two weeks of prices gives fewer than the minimum return periods
    let result = optimize(
        &provider,
        &tickers(&["AAPL", "MSFT"]),
        date(2024, 6, 17),
        Duration::from_secs(5),
    )
    .await;

    match result {
        OptimizationResult::Error { message } => assert!(message.contains("periods")),
        other => panic!("expected error, got {:?}", other),
    }
}
