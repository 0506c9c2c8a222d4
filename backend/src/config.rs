use chrono::NaiveDate;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Yahoo,
    Mock,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub price_provider: String,
    pub default_start_date: String,
    /// Raw `PROVIDER_TIMEOUT_SECS`; parsed and checked by `validate`.
    pub provider_timeout_secs: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            price_provider: "yahoo".to_string(),
            default_start_date: "2018-01-01".to_string(),
            provider_timeout_secs: "30".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; missing keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            price_provider: lookup("PRICE_PROVIDER").unwrap_or(defaults.price_provider),
            default_start_date: lookup("DEFAULT_START_DATE").unwrap_or(defaults.default_start_date),
            provider_timeout_secs: lookup("PROVIDER_TIMEOUT_SECS")
                .unwrap_or(defaults.provider_timeout_secs),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.socket_addr()?;
        self.provider_kind()?;
        self.start_date()?;
        self.provider_timeout()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        self.bind_addr
            .parse()
            .map_err(|e| format!("Invalid BIND_ADDR '{}': {}", self.bind_addr, e))
    }

    pub fn provider_kind(&self) -> Result<ProviderKind, String> {
        match self.price_provider.to_lowercase().as_str() {
            "yahoo" => Ok(ProviderKind::Yahoo),
            "mock" => Ok(ProviderKind::Mock),
            other => Err(format!(
                "Invalid PRICE_PROVIDER: {}. Must be 'yahoo' or 'mock'",
                other
            )),
        }
    }

    pub fn start_date(&self) -> Result<NaiveDate, String> {
        parse_date(&self.default_start_date)
    }

    pub fn provider_timeout(&self) -> Result<Duration, String> {
        let secs: u64 = self.provider_timeout_secs.trim().parse().map_err(|e| {
            format!(
                "Invalid PROVIDER_TIMEOUT_SECS '{}': {}",
                self.provider_timeout_secs, e
            )
        })?;
        if secs == 0 {
            return Err("PROVIDER_TIMEOUT_SECS must be greater than zero".to_string());
        }
        Ok(Duration::from_secs(secs))
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{}' (expected YYYY-MM-DD): {}", value, e))
}
