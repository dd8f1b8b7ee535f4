//! Fare sampling — selects representative dates in a month and fetches
//! a cheapest fare for each, in parallel.
//!
//! One bad date must never fail the whole calendar: every per-date
//! failure (transport, provider status, unusable price, timeout, task
//! panic, conversion error) resolves to an absent sample.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Months, NaiveDate};
use tokio::time::timeout;
use tracing::{debug, warn};

use common::{CalendarQuery, Error, FareQuery, FareSource, PriceMap, Result, TripType};
use fx_client::FxConverter;

/// Cap on outbound fare lookups per calendar computation.
pub const MAX_SAMPLES: usize = 12;

/// A hung provider call becomes an absent sample after this long.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(20);

/// All calendar days of `month` ("YYYY-MM") that are on or after `today`.
///
/// A month entirely in the past yields an empty list, not an error.
pub fn candidate_days(month: &str, today: NaiveDate) -> Result<Vec<NaiveDate>> {
    let start = NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d")
        .map_err(|_| Error::InvalidMonth(month.to_string()))?;
    let next_month = start
        .checked_add_months(Months::new(1))
        .ok_or_else(|| Error::InvalidMonth(month.to_string()))?;

    Ok(start
        .iter_days()
        .take_while(|d| *d < next_month)
        .filter(|d| *d >= today)
        .collect())
}

/// Pick the dates to actually quote: walk the candidate list by a
/// stride of `max(2, len / 12)`, force-include the last day, cap at 12.
pub fn sample_dates(days: &[NaiveDate]) -> Vec<NaiveDate> {
    let Some(&last) = days.last() else {
        return Vec::new();
    };

    let stride = (days.len() / MAX_SAMPLES).max(2);
    let mut sampled: Vec<NaiveDate> = days.iter().copied().step_by(stride).collect();

    if !sampled.contains(&last) {
        sampled.push(last);
    }
    sampled.truncate(MAX_SAMPLES);
    sampled
}

/// Issues the per-date fare lookups and normalizes quotes into USD.
pub struct FareSampler {
    fares: Arc<dyn FareSource>,
    fx: Arc<FxConverter>,
    lookup_timeout: Duration,
}

impl FareSampler {
    pub fn new(fares: Arc<dyn FareSource>, fx: Arc<FxConverter>) -> Self {
        Self {
            fares,
            fx,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Override the per-lookup timeout.
    pub fn with_lookup_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    /// Quote the sampled dates of `days` concurrently.
    ///
    /// Returns only the dates that yielded a usable price; the map may
    /// be empty when every lookup failed, which is still a successful
    /// batch. Lookups run concurrently and the batch waits for every
    /// outcome — a slow or failed date never blocks the others, and
    /// results are keyed by date, not completion order.
    pub async fn sample(&self, query: &CalendarQuery, days: &[NaiveDate]) -> PriceMap {
        let dates = sample_dates(days);
        debug!(
            "Sampling {} dates for {}→{} {}",
            dates.len(),
            query.origin,
            query.destination,
            query.month
        );

        let mut tasks = Vec::with_capacity(dates.len());
        for date in dates {
            let fares = Arc::clone(&self.fares);
            let fx = Arc::clone(&self.fx);
            let lookup_timeout = self.lookup_timeout;
            let fare_query = build_fare_query(query, date);

            tasks.push(tokio::spawn(async move {
                let price = match fare_query {
                    Some(fare_query) => {
                        fetch_one(fares.as_ref(), &fx, &fare_query, lookup_timeout).await
                    }
                    None => {
                        warn!("{date}: return date out of range, skipping");
                        None
                    }
                };
                (date, price)
            }));
        }

        let mut prices = PriceMap::new();
        for task in tasks {
            match task.await {
                Ok((date, Some(price))) => {
                    prices.insert(date, price);
                }
                Ok((_, None)) => {}
                Err(e) => warn!("Fare lookup task failed: {e}"),
            }
        }

        debug!("{} of the sampled dates priced", prices.len());
        prices
    }
}

fn build_fare_query(query: &CalendarQuery, date: NaiveDate) -> Option<FareQuery> {
    let return_date = match query.trip_type {
        TripType::OneWay => None,
        TripType::RoundTrip => Some(date.checked_add_signed(chrono::Duration::days(
            i64::from(query.trip_duration),
        ))?),
    };

    Some(FareQuery {
        origin: query.origin.clone(),
        destination: query.destination.clone(),
        departure_date: date,
        return_date,
    })
}

/// One lookup plus currency normalization. Any failure is an absent
/// sample, never an error.
async fn fetch_one(
    fares: &dyn FareSource,
    fx: &FxConverter,
    query: &FareQuery,
    lookup_timeout: Duration,
) -> Option<f64> {
    let quote = match timeout(lookup_timeout, fares.cheapest_fare(query)).await {
        Ok(Ok(Some(quote))) => quote,
        Ok(Ok(None)) => {
            debug!("{}: no offer", query.departure_date);
            return None;
        }
        Ok(Err(e)) => {
            debug!("{}: fare lookup failed: {e}", query.departure_date);
            return None;
        }
        Err(_) => {
            warn!("{}: fare lookup timed out", query.departure_date);
            return None;
        }
    };

    match fx.to_usd(quote.total, &quote.currency).await {
        Ok(price) if price >= 0.0 => Some(price),
        Ok(price) => {
            debug!("{}: discarding negative price {price}", query.departure_date);
            None
        }
        Err(e) => {
            debug!(
                "{}: currency conversion failed: {e}",
                query.departure_date
            );
            None
        }
    }
}
