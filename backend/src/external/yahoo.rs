use crate::external::price_provider::{ExternalPricePoint, PriceProvider, PriceProviderError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tracing::debug;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

pub struct YahooProvider {
    client: reqwest::Client,
}

impl YahooProvider {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; hrp-optimizer/0.1)")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

// Minimal response structs (only what we need)
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
    #[serde(default)]
    adjclose: Option<Vec<YahooAdjClose>>,
}

#[derive(Debug, Deserialize)]
struct YahooQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct YahooAdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Turn a chart payload into ascending daily points.
///
/// Adjusted closes win over raw closes when Yahoo provides them.
fn parse_chart(body: YahooChartResponse) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
    if let Some(err) = body.chart.error.filter(|e| !e.is_null()) {
        return Err(PriceProviderError::BadResponse(err.to_string()));
    }

    let result = body
        .chart
        .result
        .and_then(|mut r| r.pop())
        .ok_or_else(|| PriceProviderError::BadResponse("missing result".into()))?;

    let adjusted = result
        .indicators
        .adjclose
        .and_then(|mut a| a.pop())
        .map(|a| a.adjclose)
        .filter(|a| a.len() == result.timestamp.len());

    let closes = match adjusted {
        Some(adj) => adj,
        None => result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| PriceProviderError::BadResponse("missing quote".into()))?
            .close,
    };

    let mut out = Vec::with_capacity(result.timestamp.len());

    for (i, ts) in result.timestamp.iter().enumerate() {
        // skip missing closes
        let Some(close) = closes.get(i).copied().flatten() else { continue };

        let dt: DateTime<Utc> = DateTime::from_timestamp(*ts, 0)
            .ok_or_else(|| PriceProviderError::Parse(format!("bad timestamp {}", ts)))?;

        out.push(ExternalPricePoint {
            date: dt.date_naive(),
            close,
        });
    }

    out.sort_by_key(|p| p.date);
    out.dedup_by_key(|p| p.date);

    Ok(out)
}

#[async_trait]
impl PriceProvider for YahooProvider {
    async fn fetch_daily_history(
        &self,
        ticker: &str,
        start: NaiveDate,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        let period1 = start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .ok_or_else(|| PriceProviderError::Parse(format!("bad start date {}", start)))?;
        let period2 = Utc::now().timestamp();

        let url = format!(
            "{CHART_URL}/{ticker}?period1={period1}&period2={period2}&interval=1d&events=div%2Csplits"
        );
        debug!("Fetching Yahoo chart for {} from {}", ticker, start);

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        match resp.status() {
            reqwest::StatusCode::TOO_MANY_REQUESTS => return Err(PriceProviderError::RateLimited),
            reqwest::StatusCode::NOT_FOUND => {
                return Err(PriceProviderError::BadResponse(format!("404: unknown symbol {}", ticker)))
            }
            _ => {}
        }

        let body = resp
            .json::<YahooChartResponse>()
            .await
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        parse_chart(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(json: &str) -> YahooChartResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_chart_prefers_adjusted_close() {
        let body = chart(
            r#"{"chart":{"result":[{"timestamp":[1704290400,1704204000],
                "indicators":{"quote":[{"close":[10.0,11.0]}],
                "adjclose":[{"adjclose":[9.5,10.5]}]}}],"error":null}}"#,
        );
        let points = parse_chart(body).unwrap();
        assert_eq!(points.len(), 2);
        // sorted ascending, so the second timestamp comes first
        assert_eq!(points[0].close, 10.5);
        assert_eq!(points[1].close, 9.5);
        assert!(points[0].date < points[1].date);
    }

    #[test]
    fn test_parse_chart_skips_null_closes() {
        let body = chart(
            r#"{"chart":{"result":[{"timestamp":[1704204000,1704290400,1704376800],
                "indicators":{"quote":[{"close":[10.0,null,12.0]}]}}],"error":null}}"#,
        );
        let points = parse_chart(body).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].close, 12.0);
    }

    #[test]
    fn test_parse_chart_reports_provider_error() {
        let body = chart(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#,
        );
        assert!(matches!(parse_chart(body), Err(PriceProviderError::BadResponse(_))));
    }
}
