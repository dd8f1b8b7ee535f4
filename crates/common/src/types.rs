//! Shared domain types for the price-calendar pipeline.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Date → cheapest total price in USD.
///
/// Keys serialize as "YYYY-MM-DD"; a date absent from the map means no
/// offer was found for it, never a zero price.
pub type PriceMap = BTreeMap<NaiveDate, f64>;

/// Trip shape for a calendar query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TripType {
    #[serde(rename = "one-way")]
    OneWay,
    #[serde(rename = "round-trip")]
    RoundTrip,
}

impl TripType {
    /// Wire name as used in query strings and response bodies.
    pub fn as_str(&self) -> &'static str {
        match self {
            TripType::OneWay => "one-way",
            TripType::RoundTrip => "round-trip",
        }
    }

    /// Parse the wire name. Case-sensitive, like the query contract.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "one-way" => Some(TripType::OneWay),
            "round-trip" => Some(TripType::RoundTrip),
            _ => None,
        }
    }
}

impl std::fmt::Display for TripType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one price-calendar cache entry.
///
/// Two queries are equal iff all five fields are equal; IATA codes are
/// compared case-sensitively as provided.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalendarQuery {
    /// Origin IATA code (e.g. "JFK").
    pub origin: String,
    /// Destination IATA code (e.g. "LHR").
    pub destination: String,
    /// Queried month, "YYYY-MM".
    pub month: String,
    /// One-way or round-trip.
    pub trip_type: TripType,
    /// Days between departure and return for round-trip queries.
    pub trip_duration: u32,
}

/// One outbound cheapest-fare lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FareQuery {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    /// Set for round-trip lookups only.
    pub return_date: Option<NaiveDate>,
}

/// Cheapest offer returned by one fare lookup, in the provider's currency.
#[derive(Debug, Clone, PartialEq)]
pub struct FareQuote {
    pub total: f64,
    pub currency: String,
}

/// A fare-quote provider.
///
/// `Ok(None)` means the provider answered but had no offer for the date;
/// errors cover transport, auth, and non-2xx provider replies. Callers
/// in the sampling path treat both the same way — an absent sample.
#[async_trait]
pub trait FareSource: Send + Sync {
    /// Cheapest total fare for one exact departure (and optional return)
    /// date, for a single adult.
    async fn cheapest_fare(&self, query: &FareQuery) -> Result<Option<FareQuote>>;
}
