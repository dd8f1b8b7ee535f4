//! Gap-filling over a sparse price map.
//!
//! Pure function of its inputs; no I/O. Missing days between two known
//! samples get a linearly interpolated price; days outside the known
//! range take the nearest known value unchanged.

use chrono::NaiveDate;

use common::PriceMap;

/// Extend `sparse` to cover every day in `days`.
///
/// Requires at least two known prices — with fewer there is nothing to
/// interpolate between, and the sparse map is returned unchanged rather
/// than fabricating values. Interpolated prices are rounded to the
/// nearest whole USD.
pub fn fill_missing(days: &[NaiveDate], sparse: PriceMap) -> PriceMap {
    if sparse.len() < 2 {
        return sparse;
    }

    // Known samples in date order (BTreeMap iteration is sorted).
    let known: Vec<(NaiveDate, f64)> = sparse.iter().map(|(d, p)| (*d, *p)).collect();

    let mut filled = sparse;
    for day in days {
        if filled.contains_key(day) {
            continue;
        }

        let idx = known.partition_point(|(d, _)| d <= day);
        let before = idx.checked_sub(1).map(|i| known[i]);
        let after = known.get(idx).copied();

        let price = match (before, after) {
            (Some((before_date, before_price)), Some((after_date, after_price))) => {
                let span = (after_date - before_date).num_days() as f64;
                let offset = (*day - before_date).num_days() as f64;
                (before_price + (after_price - before_price) * (offset / span)).round()
            }
            // Past the last sample: carry it forward flat.
            (Some((_, before_price)), None) => before_price,
            // Before the first sample: carry it backward flat.
            (None, Some((_, after_price))) => after_price,
            (None, None) => continue,
        };

        filled.insert(*day, price);
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn march_days() -> Vec<NaiveDate> {
        (1..=31)
            .map(|day| NaiveDate::from_ymd_opt(2026, 3, day).unwrap())
            .collect()
    }

    #[test]
    fn test_fewer_than_two_samples_unchanged() {
        let days = march_days();

        let empty = fill_missing(&days, PriceMap::new());
        assert!(empty.is_empty());

        let mut single = PriceMap::new();
        single.insert(d("2026-03-05"), 420.0);
        let out = fill_missing(&days, single.clone());
        assert_eq!(out, single);
    }

    #[test]
    fn test_two_samples_cover_every_day() {
        let days = march_days();
        let mut sparse = PriceMap::new();
        sparse.insert(d("2026-03-01"), 500.0);
        sparse.insert(d("2026-03-08"), 600.0);

        let out = fill_missing(&days, sparse);
        assert_eq!(out.len(), days.len());
        for day in &days {
            assert!(out.contains_key(day), "missing {day}");
        }
    }

    #[test]
    fn test_midpoint_resolves_halfway() {
        let days = march_days();
        let mut sparse = PriceMap::new();
        sparse.insert(d("2026-03-01"), 500.0);
        sparse.insert(d("2026-03-08"), 600.0);

        let out = fill_missing(&days, sparse);
        // 2026-03-04 is 3/7 of the way; 2026-03-04.5 would be halfway,
        // so check the exact linear values instead of eyeballing.
        assert_eq!(out[&d("2026-03-04")], (500.0_f64 + 100.0 * 3.0 / 7.0).round());
        // With an even span the middle day lands exactly halfway.
        let mut even = PriceMap::new();
        even.insert(d("2026-03-01"), 500.0);
        even.insert(d("2026-03-09"), 600.0);
        let out = fill_missing(&days, even);
        assert_eq!(out[&d("2026-03-05")], 550.0);
    }

    #[test]
    fn test_ramp_is_monotonic_between_samples() {
        let days = march_days();
        let mut sparse = PriceMap::new();
        sparse.insert(d("2026-03-01"), 500.0);
        sparse.insert(d("2026-03-08"), 600.0);

        let out = fill_missing(&days, sparse);
        let mut prev = out[&d("2026-03-01")];
        for day in 2..=8 {
            let price = out[&NaiveDate::from_ymd_opt(2026, 3, day).unwrap()];
            assert!(price >= prev, "ramp must not decrease at day {day}");
            assert!((500.0..=600.0).contains(&price));
            prev = price;
        }
    }

    #[test]
    fn test_tail_flattens_at_last_sample() {
        let days = march_days();
        let mut sparse = PriceMap::new();
        sparse.insert(d("2026-03-01"), 500.0);
        sparse.insert(d("2026-03-08"), 600.0);

        let out = fill_missing(&days, sparse);
        for day in 9..=31 {
            assert_eq!(out[&NaiveDate::from_ymd_opt(2026, 3, day).unwrap()], 600.0);
        }
    }

    #[test]
    fn test_head_flattens_at_first_sample() {
        let days = march_days();
        let mut sparse = PriceMap::new();
        sparse.insert(d("2026-03-10"), 300.0);
        sparse.insert(d("2026-03-20"), 400.0);

        let out = fill_missing(&days, sparse);
        for day in 1..10 {
            assert_eq!(out[&NaiveDate::from_ymd_opt(2026, 3, day).unwrap()], 300.0);
        }
    }

    #[test]
    fn test_interpolated_values_are_whole_dollars() {
        let days = march_days();
        let mut sparse = PriceMap::new();
        sparse.insert(d("2026-03-01"), 500.55);
        sparse.insert(d("2026-03-08"), 600.45);

        let out = fill_missing(&days, sparse);
        for day in 2..=7 {
            let price = out[&NaiveDate::from_ymd_opt(2026, 3, day).unwrap()];
            assert_eq!(price, price.round(), "day {day} should be rounded");
        }
        // Direct samples keep their cents.
        assert_eq!(out[&d("2026-03-01")], 500.55);
        assert_eq!(out[&d("2026-03-08")], 600.45);
    }

    #[test]
    fn test_known_days_never_overwritten() {
        let days = march_days();
        let mut sparse = PriceMap::new();
        sparse.insert(d("2026-03-01"), 111.0);
        sparse.insert(d("2026-03-15"), 999.0);
        sparse.insert(d("2026-03-31"), 222.0);

        let out = fill_missing(&days, sparse);
        assert_eq!(out[&d("2026-03-01")], 111.0);
        assert_eq!(out[&d("2026-03-15")], 999.0);
        assert_eq!(out[&d("2026-03-31")], 222.0);
    }
}
