//! Price-calendar engine: fare sampling, interpolation, and the
//! stale-while-revalidate calendar cache.

pub mod cache;
pub mod interpolate;
pub mod sampler;

pub use cache::{CalendarConfig, CalendarSnapshot, PriceCalendar};
pub use interpolate::fill_missing;
pub use sampler::{candidate_days, sample_dates, FareSampler};

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted fare source shared by the sampler and cache tests.

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use common::{Error, FareQuery, FareQuote, FareSource, Result};

    /// Fare source that answers from a scripted date → quote table.
    ///
    /// Dates absent from the table yield `Ok(None)`; dates in
    /// `fail_dates` yield an error. Every call is counted and recorded.
    pub struct ScriptedFares {
        pub quotes: Mutex<HashMap<NaiveDate, FareQuote>>,
        pub fail_dates: Mutex<Vec<NaiveDate>>,
        pub fail_all: Mutex<bool>,
        pub delay: Option<Duration>,
        pub calls: AtomicUsize,
        pub seen: Mutex<Vec<FareQuery>>,
    }

    impl ScriptedFares {
        pub fn new() -> Self {
            Self {
                quotes: Mutex::new(HashMap::new()),
                fail_dates: Mutex::new(Vec::new()),
                fail_all: Mutex::new(false),
                delay: None,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        /// Quote `price` USD for every date the provider is asked about.
        pub fn flat_usd(price: f64) -> Self {
            let scripted = Self::new();
            scripted.set_flat(price);
            scripted
        }

        /// Delay every answer, to hold a refresh in flight.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn set_flat(&self, price: f64) {
            let mut quotes = self.quotes.lock().unwrap();
            quotes.clear();
            quotes.insert(FLAT_MARKER, FareQuote {
                total: price,
                currency: "USD".into(),
            });
        }

        pub fn set_quote(&self, date: NaiveDate, total: f64, currency: &str) {
            self.quotes.lock().unwrap().insert(
                date,
                FareQuote {
                    total,
                    currency: currency.into(),
                },
            );
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    /// Sentinel key meaning "answer this quote for any date".
    pub const FLAT_MARKER: NaiveDate = NaiveDate::MIN;

    #[async_trait]
    impl FareSource for ScriptedFares {
        async fn cheapest_fare(&self, query: &FareQuery) -> Result<Option<FareQuote>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(query.clone());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if *self.fail_all.lock().unwrap()
                || self
                    .fail_dates
                    .lock()
                    .unwrap()
                    .contains(&query.departure_date)
            {
                return Err(Error::Http("scripted failure".into()));
            }

            let quotes = self.quotes.lock().unwrap();
            Ok(quotes
                .get(&query.departure_date)
                .or_else(|| quotes.get(&FLAT_MARKER))
                .cloned())
        }
    }
}
