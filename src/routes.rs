//! HTTP boundary — parses calendar queries, consults the cache, and
//! shapes the JSON responses with CDN-consistent caching headers.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use calendar::PriceCalendar;
use common::{CalendarQuery, PriceMap, TripType};

const DEFAULT_TRIP_DURATION: u32 = 7;

/// Shared handler state, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub calendar: PriceCalendar,
    /// Precomputed Cache-Control value mirroring the cache windows.
    pub cache_control: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/prices/calendar", get(price_calendar))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

/// JSON error with a stable message; never leaks provider internals.
struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl ApiError {
    fn bad_request(message: &'static str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Raw query parameters. Everything is optional strings so that
/// missing-vs-invalid can be reported distinctly, instead of axum's
/// generic rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarParams {
    origin: Option<String>,
    destination: Option<String>,
    month: Option<String>,
    trip_type: Option<String>,
    trip_duration: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CalendarResponse {
    prices: PriceMap,
    currency: &'static str,
    month: String,
    trip_type: TripType,
    trip_duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stale: Option<bool>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

async fn price_calendar(
    State(state): State<AppState>,
    Query(params): Query<CalendarParams>,
) -> Result<Response, ApiError> {
    let (Some(origin), Some(destination), Some(month)) = (
        non_empty(params.origin),
        non_empty(params.destination),
        non_empty(params.month),
    ) else {
        return Err(ApiError::bad_request("Missing required parameters"));
    };

    // Reject malformed months before any cache or provider work.
    if NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").is_err() {
        return Err(ApiError::bad_request("Invalid month format. Use YYYY-MM"));
    }

    let trip_type = match params.trip_type.as_deref() {
        None | Some("") => TripType::OneWay,
        Some(raw) => TripType::parse(raw).ok_or_else(|| {
            ApiError::bad_request("Invalid tripType: use one-way or round-trip")
        })?,
    };

    let trip_duration = match params.trip_duration.as_deref() {
        None | Some("") => DEFAULT_TRIP_DURATION,
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| {
                ApiError::bad_request("Invalid tripDuration: must be a positive integer")
            })?,
    };

    let query = CalendarQuery {
        origin,
        destination,
        month: month.clone(),
        trip_type,
        trip_duration,
    };

    let snapshot = state.calendar.get(&query).await.map_err(|e| {
        error!(
            "Price calendar computation failed for {}→{} {}: {e}",
            query.origin, query.destination, query.month
        );
        let status = e
            .upstream_status()
            .and_then(|s| StatusCode::from_u16(s).ok())
            .filter(|s| s.is_client_error() || s.is_server_error())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        ApiError {
            status,
            message: "Failed to fetch price calendar",
        }
    })?;

    let body = CalendarResponse {
        prices: snapshot.prices,
        currency: "USD",
        month,
        trip_type,
        trip_duration,
        stale: snapshot.stale.then_some(true),
    };

    Ok((
        [(header::CACHE_CONTROL, state.cache_control.clone())],
        Json(body),
    )
        .into_response())
}
