//! Amadeus flight-offers API client.
//!
//! Covers: OAuth2 token management, rate limiting, and cheapest-fare
//! lookups against `/v2/shopping/flight-offers`.

pub mod auth;
pub mod rate_limit;

use std::error::Error as StdError;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use common::{Error, FareQuery, FareQuote, FareSource, Result};

use crate::auth::TokenManager;
use crate::rate_limit::RateLimiter;

const TEST_BASE_URL: &str = "https://test.api.amadeus.com";
const PROD_BASE_URL: &str = "https://api.amadeus.com";

fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn resolve_base_url(use_test: bool) -> String {
    if let Ok(override_url) = std::env::var("AMADEUS_API_BASE_URL") {
        let normalized = normalize_base_url(&override_url);
        if !normalized.is_empty() {
            info!("Using AMADEUS_API_BASE_URL override: {}", normalized);
            return normalized;
        }
        warn!("Ignoring empty AMADEUS_API_BASE_URL override");
    }

    if use_test {
        TEST_BASE_URL.to_string()
    } else {
        PROD_BASE_URL.to_string()
    }
}

fn format_reqwest_error(err: &reqwest::Error) -> String {
    // Keep chained causes so network failures (DNS/TLS/socket) are visible.
    let mut message = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !cause_msg.is_empty() && !message.contains(&cause_msg) {
            message.push_str(": ");
            message.push_str(&cause_msg);
        }
        source = cause.source();
    }

    message
}

fn summarize_response_body(raw: &str) -> String {
    const MAX_CHARS: usize = 800;
    let compact = raw.replace('\n', " ").replace('\r', " ");
    if compact.len() > MAX_CHARS {
        format!("{}…", &compact[..MAX_CHARS])
    } else {
        compact
    }
}

// ── Flight-offers response types ──────────────────────────────────────

/// Response from `/v2/shopping/flight-offers`.
#[derive(Debug, Deserialize)]
pub struct FlightOffersResponse {
    #[serde(default)]
    pub data: Vec<FlightOffer>,
}

#[derive(Debug, Deserialize)]
pub struct FlightOffer {
    #[serde(default)]
    pub price: Option<OfferPrice>,
}

/// Price block of one offer. Amadeus quotes totals as decimal strings.
#[derive(Debug, Deserialize)]
pub struct OfferPrice {
    #[serde(default)]
    pub total: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

// ── Client ────────────────────────────────────────────────────────────

/// Async client for the Amadeus self-service APIs.
#[derive(Debug)]
pub struct AmadeusClient {
    client: reqwest::Client,
    auth: TokenManager,
    base_url: String,
    limiter: RateLimiter,
}

impl AmadeusClient {
    /// Create a new client.
    ///
    /// * `use_test` — if true, points to the test environment unless
    ///   `AMADEUS_API_BASE_URL` is set.
    pub fn new(api_key: String, api_secret: String, use_test: bool) -> Self {
        let base_url = resolve_base_url(use_test);

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .expect("failed to build Amadeus HTTP client");

        Self {
            client,
            auth: TokenManager::new(api_key, api_secret),
            base_url,
            limiter: RateLimiter::new(),
        }
    }

    /// URL helper.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Verify credentials by fetching an access token.
    pub async fn check_auth(&self) -> Result<()> {
        self.auth.bearer_token(&self.client, &self.base_url).await?;
        Ok(())
    }

    /// Fetch the cheapest offer for one exact departure (and optional
    /// return) date, for a single adult.
    ///
    /// Returns `Ok(None)` when the provider has no offer for the date or
    /// quotes a total that does not parse as a price.
    pub async fn cheapest_offer(&self, query: &FareQuery) -> Result<Option<FareQuote>> {
        self.limiter.wait().await;

        let token = self.auth.bearer_token(&self.client, &self.base_url).await?;

        let mut params = vec![
            ("originLocationCode", query.origin.clone()),
            ("destinationLocationCode", query.destination.clone()),
            (
                "departureDate",
                query.departure_date.format("%Y-%m-%d").to_string(),
            ),
            ("adults", "1".to_string()),
            ("max", "1".to_string()),
        ];
        if let Some(return_date) = query.return_date {
            params.push(("returnDate", return_date.format("%Y-%m-%d").to_string()));
        }

        debug!(
            "Fetching cheapest offer {}→{} on {}",
            query.origin, query.destination, query.departure_date
        );

        let resp = self
            .client
            .get(self.url("/v2/shopping/flight-offers"))
            .bearer_auth(token)
            .query(&params)
            .send()
            .await
            .map_err(|e| Error::Http(format_reqwest_error(&e)))?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::AmadeusApi {
                status,
                message: summarize_response_body(&body),
            });
        }

        let data: FlightOffersResponse = resp
            .json()
            .await
            .map_err(|e| Error::Http(format!("JSON parse error: {e}")))?;

        Ok(extract_cheapest(&data))
    }
}

/// Pull the cheapest quote out of an offers payload.
fn extract_cheapest(resp: &FlightOffersResponse) -> Option<FareQuote> {
    let offer = resp.data.first()?;
    let price = offer.price.as_ref()?;
    let total = price.total.as_ref()?.parse::<f64>().ok()?;

    if !total.is_finite() || total < 0.0 {
        return None;
    }

    let currency = price
        .currency
        .clone()
        .unwrap_or_else(|| "USD".to_string());

    Some(FareQuote { total, currency })
}

#[async_trait]
impl FareSource for AmadeusClient {
    async fn cheapest_fare(&self, query: &FareQuery) -> Result<Option<FareQuote>> {
        self.cheapest_offer(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_offers(raw: &str) -> FlightOffersResponse {
        serde_json::from_str(raw).expect("fixture should parse")
    }

    #[test]
    fn test_extract_cheapest_from_offer() {
        let resp = parse_offers(
            r#"{"data":[{"price":{"total":"523.40","currency":"EUR"}}]}"#,
        );
        let quote = extract_cheapest(&resp).unwrap();
        assert_eq!(quote.total, 523.40);
        assert_eq!(quote.currency, "EUR");
    }

    #[test]
    fn test_empty_data_yields_none() {
        let resp = parse_offers(r#"{"data":[]}"#);
        assert!(extract_cheapest(&resp).is_none());
    }

    #[test]
    fn test_missing_data_field_yields_none() {
        let resp = parse_offers(r#"{}"#);
        assert!(extract_cheapest(&resp).is_none());
    }

    #[test]
    fn test_unparseable_total_yields_none() {
        let resp = parse_offers(
            r#"{"data":[{"price":{"total":"not-a-number","currency":"USD"}}]}"#,
        );
        assert!(extract_cheapest(&resp).is_none());
    }

    #[test]
    fn test_negative_total_yields_none() {
        let resp = parse_offers(
            r#"{"data":[{"price":{"total":"-12.00","currency":"USD"}}]}"#,
        );
        assert!(extract_cheapest(&resp).is_none());
    }

    #[test]
    fn test_missing_currency_defaults_to_usd() {
        let resp = parse_offers(r#"{"data":[{"price":{"total":"88.00"}}]}"#);
        let quote = extract_cheapest(&resp).unwrap();
        assert_eq!(quote.currency, "USD");
    }

    #[test]
    fn test_summarize_response_body_truncates() {
        let long = "x".repeat(2000);
        let summary = summarize_response_body(&long);
        assert!(summary.len() < 1000);
        assert!(summary.ends_with('…'));
    }
}
