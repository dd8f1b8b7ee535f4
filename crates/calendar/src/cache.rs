//! Process-wide price-calendar cache.
//!
//! One entry per (origin, destination, month, trip-type, trip-duration)
//! tuple, with a three-window lifecycle:
//!
//! - **Fresh** (now < fresh_until): served as-is.
//! - **Stale** (fresh_until ≤ now < stale_until): served immediately,
//!   marked stale, and at most one background recomputation per key is
//!   started (single-flight).
//! - **Expired** (now ≥ stale_until): recomputed synchronously; the
//!   caller blocks and never receives data older than that computation.
//!
//! The `refresh_in_flight` check-and-set happens under the DashMap
//! shard guard with no await while it is held, so two tasks can never
//! both claim the refresh for one key. Replacement is atomic: a new
//! price map is fully built before it is swapped into the entry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use common::{CalendarQuery, PriceMap, Result};

use crate::interpolate::fill_missing;
use crate::sampler::{candidate_days, FareSampler};

/// Cache tuning. Defaults mirror the HTTP caching headers the handler
/// emits: 1-hour fresh window, 6-hour stale window.
#[derive(Debug, Clone)]
pub struct CalendarConfig {
    pub fresh_ttl: Duration,
    pub stale_ttl: Duration,
    /// Entry cap; exceeding it triggers a purge of expired entries.
    pub max_entries: usize,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            fresh_ttl: Duration::from_secs(60 * 60),
            stale_ttl: Duration::from_secs(6 * 60 * 60),
            max_entries: 512,
        }
    }
}

/// One cached month of prices.
#[derive(Debug)]
struct CacheEntry {
    prices: PriceMap,
    fresh_until: Instant,
    stale_until: Instant,
    refresh_in_flight: bool,
}

/// What a lookup returns: the prices plus whether they came from the
/// stale window.
#[derive(Debug, Clone)]
pub struct CalendarSnapshot {
    pub prices: PriceMap,
    pub stale: bool,
}

enum Hit {
    Fresh(PriceMap),
    Stale(PriceMap, bool),
    Miss,
}

struct Inner {
    sampler: FareSampler,
    entries: DashMap<CalendarQuery, CacheEntry>,
    config: CalendarConfig,
}

/// The calendar cache service. Construct once at startup; clones share
/// the same cache.
#[derive(Clone)]
pub struct PriceCalendar {
    inner: Arc<Inner>,
}

impl PriceCalendar {
    pub fn new(sampler: FareSampler, config: CalendarConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                sampler,
                entries: DashMap::new(),
                config,
            }),
        }
    }

    /// Look up (and if necessary compute) the calendar for `query`.
    ///
    /// Errors only when a synchronous computation fails; background
    /// refresh failures are swallowed here and the stale data keeps
    /// being served until it expires or a later attempt succeeds.
    pub async fn get(&self, query: &CalendarQuery) -> Result<CalendarSnapshot> {
        let now = Instant::now();

        let hit = match self.inner.entries.get_mut(query) {
            Some(mut entry) => {
                if now < entry.fresh_until {
                    Hit::Fresh(entry.prices.clone())
                } else if now < entry.stale_until {
                    // Claim the refresh while still holding the shard
                    // guard; the guard drops before any await.
                    let claimed = !entry.refresh_in_flight;
                    if claimed {
                        entry.refresh_in_flight = true;
                    }
                    Hit::Stale(entry.prices.clone(), claimed)
                } else {
                    Hit::Miss
                }
            }
            None => Hit::Miss,
        };

        match hit {
            Hit::Fresh(prices) => Ok(CalendarSnapshot {
                prices,
                stale: false,
            }),
            Hit::Stale(prices, claimed) => {
                if claimed {
                    let service = self.clone();
                    let query = query.clone();
                    tokio::spawn(async move { service.refresh(query).await });
                }
                Ok(CalendarSnapshot {
                    prices,
                    stale: true,
                })
            }
            Hit::Miss => {
                let prices = self.compute(query).await?;
                self.store(query.clone(), prices.clone());
                Ok(CalendarSnapshot {
                    prices,
                    stale: false,
                })
            }
        }
    }

    /// Background recomputation for a stale entry.
    async fn refresh(self, query: CalendarQuery) {
        debug!(
            "Refreshing stale calendar {}→{} {}",
            query.origin, query.destination, query.month
        );

        match self.compute(&query).await {
            Ok(prices) => {
                let now = Instant::now();
                if let Some(mut entry) = self.inner.entries.get_mut(&query) {
                    entry.prices = prices;
                    entry.fresh_until = now + self.inner.config.fresh_ttl;
                    entry.stale_until = now + self.inner.config.stale_ttl;
                    entry.refresh_in_flight = false;
                }
            }
            Err(e) => {
                warn!(
                    "Background refresh failed for {}→{} {}: {e}",
                    query.origin, query.destination, query.month
                );
                if let Some(mut entry) = self.inner.entries.get_mut(&query) {
                    entry.refresh_in_flight = false;
                }
            }
        }
    }

    /// Sample and interpolate one month of prices.
    async fn compute(&self, query: &CalendarQuery) -> Result<PriceMap> {
        let today = Utc::now().date_naive();
        let days = candidate_days(&query.month, today)?;
        if days.is_empty() {
            return Ok(PriceMap::new());
        }

        let sampled = self.inner.sampler.sample(query, &days).await;
        Ok(fill_missing(&days, sampled))
    }

    fn store(&self, query: CalendarQuery, prices: PriceMap) {
        let now = Instant::now();
        self.inner.entries.insert(
            query,
            CacheEntry {
                prices,
                fresh_until: now + self.inner.config.fresh_ttl,
                stale_until: now + self.inner.config.stale_ttl,
                refresh_in_flight: false,
            },
        );
        self.purge_if_over_cap(now);
    }

    /// TTL purge: once the map outgrows the cap, drop entries past
    /// their stale window. Anything younger is still servable and kept.
    fn purge_if_over_cap(&self, now: Instant) {
        if self.inner.entries.len() <= self.inner.config.max_entries {
            return;
        }

        let before = self.inner.entries.len();
        self.inner.entries.retain(|_, entry| now < entry.stale_until);
        let after = self.inner.entries.len();

        if after < before {
            info!("Purged {} expired calendar entries", before - after);
        }
        if after > self.inner.config.max_entries {
            warn!(
                "Calendar cache holds {} live entries (cap {})",
                after, self.inner.config.max_entries
            );
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}
