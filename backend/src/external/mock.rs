use crate::external::price_provider::{ExternalPricePoint, PriceProvider, PriceProviderError};
use async_trait::async_trait;
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Offline provider producing a seeded random walk per ticker.
///
/// The same ticker and date range always produce the same series, so the
/// optimizer stays reproducible without network access.
pub struct MockProvider {
    end: Option<NaiveDate>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self { end: None }
    }

    /// Pin the last generated date instead of using today.
    pub fn ending_on(end: NaiveDate) -> Self {
        Self { end: Some(end) }
    }

    fn seed_for(ticker: &str) -> u64 {
        // FNV-1a
        ticker.bytes().fold(0xcbf2_9ce4_8422_2325u64, |hash, b| {
            (hash ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
        })
    }

    pub fn generate(&self, ticker: &str, start: NaiveDate) -> Vec<ExternalPricePoint> {
        let end = self.end.unwrap_or_else(|| Utc::now().date_naive());
        let mut rng = StdRng::seed_from_u64(Self::seed_for(ticker));

        // Each ticker gets its own drift and volatility
        let drift = rng.random_range(-0.0002..0.0008);
        let vol = rng.random_range(0.005..0.03);
        let mut current = rng.random_range(20.0..400.0);

        let mut points = Vec::new();
        let mut date = start;
        while date <= end {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                points.push(ExternalPricePoint { date, close: current });
                current *= 1.0 + drift + (rng.random::<f64>() - 0.5) * 2.0 * vol;
            }
            date += ChronoDuration::days(1);
        }
        points
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceProvider for MockProvider {
    async fn fetch_daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        Ok(self.generate(ticker, start))
    }
}
