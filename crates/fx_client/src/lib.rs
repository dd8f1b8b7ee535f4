//! Exchange-rate client — normalizes quoted fares into USD.
//!
//! Fetches USD-base rates from exchangerate-api.com, caches them for an
//! hour, and falls back to a hardcoded table when the rate source is
//! unreachable. Concurrent refreshes are idempotent, so the cache needs
//! no single-flight guard.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use common::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.exchangerate-api.com";
const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

fn resolve_base_url() -> String {
    if let Ok(override_url) = std::env::var("FX_API_BASE_URL") {
        let normalized = override_url.trim().trim_end_matches('/').to_string();
        if !normalized.is_empty() {
            return normalized;
        }
        warn!("Ignoring empty FX_API_BASE_URL override");
    }
    DEFAULT_BASE_URL.to_string()
}

/// Response from `/v4/latest/USD`.
#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    #[serde(default)]
    base: String,
    rates: HashMap<String, f64>,
}

#[derive(Debug)]
struct RateTable {
    rates: HashMap<String, f64>,
    fetched_at: Instant,
}

/// USD normalizer backed by a TTL-cached rate table.
#[derive(Debug)]
pub struct FxConverter {
    client: reqwest::Client,
    base_url: String,
    refresh_interval: Duration,
    rates: RwLock<Option<RateTable>>,
}

impl FxConverter {
    pub fn new() -> Self {
        Self::with_refresh_interval(DEFAULT_REFRESH_INTERVAL)
    }

    /// Create with a custom rate-table TTL.
    pub fn with_refresh_interval(refresh_interval: Duration) -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build FX HTTP client");

        Self {
            client,
            base_url: resolve_base_url(),
            refresh_interval,
            rates: RwLock::new(None),
        }
    }

    /// Create with a pinned rate table that never refreshes.
    ///
    /// No network calls are ever made; intended for offline use and tests.
    pub fn with_static_rates(rates: HashMap<String, f64>) -> Self {
        let mut converter = Self::with_refresh_interval(Duration::from_secs(u64::MAX / 4));
        converter.rates = RwLock::new(Some(RateTable {
            rates,
            fetched_at: Instant::now(),
        }));
        converter
    }

    /// Convert `amount` from `currency` into USD, rounded to 2 decimal
    /// places.
    ///
    /// USD passes through unchanged. An unknown currency is returned
    /// unconverted with a warning — the upstream quote is still a real
    /// price, just one we cannot normalize.
    pub async fn to_usd(&self, amount: f64, currency: &str) -> Result<f64> {
        if currency == "USD" {
            return Ok(amount);
        }

        self.ensure_fresh().await;

        let guard = self.rates.read().await;
        let table = guard
            .as_ref()
            .ok_or_else(|| Error::Fx("exchange rates unavailable".into()))?;

        match table.rates.get(currency) {
            Some(rate) if *rate > 0.0 => Ok(((amount / rate) * 100.0).round() / 100.0),
            Some(rate) => Err(Error::Fx(format!(
                "non-positive exchange rate {rate} for {currency}"
            ))),
            None => {
                warn!("No exchange rate for {currency}, returning amount unconverted");
                Ok(amount)
            }
        }
    }

    /// Refresh the rate table if it is absent or past its TTL.
    ///
    /// Fetch failures fall back to the hardcoded table, which is cached
    /// for the same interval so a dead rate source is not hammered.
    async fn ensure_fresh(&self) {
        {
            let guard = self.rates.read().await;
            if let Some(table) = guard.as_ref() {
                if table.fetched_at.elapsed() < self.refresh_interval {
                    return;
                }
            }
        }

        let rates = match self.fetch_rates().await {
            Ok(rates) => rates,
            Err(e) => {
                warn!("Exchange rate fetch failed, using fallback table: {e}");
                fallback_rates()
            }
        };

        let mut guard = self.rates.write().await;
        *guard = Some(RateTable {
            rates,
            fetched_at: Instant::now(),
        });
    }

    async fn fetch_rates(&self) -> Result<HashMap<String, f64>> {
        let url = format!("{}/v4/latest/USD", self.base_url);
        debug!("Fetching exchange rates: {url}");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Fx(format!("HTTP error: {e}")))?;

        let status = resp.status().as_u16();
        if status != 200 {
            return Err(Error::Fx(format!("rate source returned {status}")));
        }

        let data: LatestRatesResponse = resp
            .json()
            .await
            .map_err(|e| Error::Fx(format!("JSON parse error: {e}")))?;

        if !data.base.is_empty() && data.base != "USD" {
            return Err(Error::Fx(format!("unexpected base currency {}", data.base)));
        }

        debug!("Got {} exchange rates", data.rates.len());
        Ok(data.rates)
    }
}

impl Default for FxConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Rates used when the rate source is unreachable.
pub fn fallback_rates() -> HashMap<String, f64> {
    HashMap::from([
        ("USD".into(), 1.0),
        ("EUR".into(), 0.92),
        ("GBP".into(), 0.79),
        ("JPY".into(), 149.50),
        ("CAD".into(), 1.36),
        ("AUD".into(), 1.53),
        ("CHF".into(), 0.88),
        ("CNY".into(), 7.24),
        ("INR".into(), 83.12),
        ("MXN".into(), 17.08),
    ])
}
