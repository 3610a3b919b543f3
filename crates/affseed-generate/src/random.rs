use chrono::{Duration, NaiveDateTime};
use fake::Fake;
use fake::faker::address::en::{BuildingNumber, CityName, StateAbbr, StreetName, ZipCode};
use fake::faker::company::en::Bs;
use fake::faker::internet::en::{Password, SafeEmail, Username};
use fake::faker::name::en::{FirstName, LastName};
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use affseed_core::{Address, ErrorRecord, ErrorSet, Host, Result, round_currency};

const PASSWORD_LENGTH: usize = 30;

/// Random value provider backed by a seedable generator.
///
/// Domain enums (rate types, statuses) are read from the host on every call
/// so picks follow whatever the platform currently accepts.
#[derive(Debug, Clone)]
pub struct Randomizer {
    rng: ChaCha8Rng,
}

impl Randomizer {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self::seeded(rand::random())
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    pub fn username(&mut self) -> String {
        Username().fake_with_rng(&mut self.rng)
    }

    pub fn first_name(&mut self) -> String {
        FirstName().fake_with_rng(&mut self.rng)
    }

    pub fn last_name(&mut self) -> String {
        LastName().fake_with_rng(&mut self.rng)
    }

    pub fn product_name(&mut self) -> String {
        let name: String = Bs().fake_with_rng(&mut self.rng);
        capitalize(&name)
    }

    pub fn email(&mut self) -> String {
        SafeEmail().fake_with_rng(&mut self.rng)
    }

    pub fn password(&mut self) -> String {
        Password(PASSWORD_LENGTH..PASSWORD_LENGTH + 1).fake_with_rng(&mut self.rng)
    }

    pub fn address(&mut self) -> Address {
        let building: String = BuildingNumber().fake_with_rng(&mut self.rng);
        let street: String = StreetName().fake_with_rng(&mut self.rng);
        Address {
            street: format!("{building} {street}"),
            city: CityName().fake_with_rng(&mut self.rng),
            state: StateAbbr().fake_with_rng(&mut self.rng),
            postcode: ZipCode().fake_with_rng(&mut self.rng),
        }
    }

    /// Uniform integer in `[min, max]`; reversed bounds are swapped.
    pub fn number(&mut self, min: i64, max: i64) -> i64 {
        let (low, high) = ordered(min, max);
        self.rng.random_range(low..=high)
    }

    /// Uniform price in `[min, max]`, rounded to cents.
    pub fn price(&mut self, min: f64, max: f64) -> Result<f64> {
        if !min.is_finite() || !max.is_finite() {
            return Err(ErrorSet::from(
                ErrorRecord::new("affseed_price_not_finite", "Price bounds must be finite numbers.")
                    .with_context("min_price", min)
                    .with_context("max_price", max),
            ));
        }
        let (low, high) = if min <= max { (min, max) } else { (max, min) };
        Ok(round_currency(self.rng.random_range(low..=high)))
    }

    pub fn pick_one<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.rng.random_range(0..items.len());
        items.get(idx)
    }

    /// Distinct elements drawn without replacement.
    pub fn pick_many<T: Clone>(&mut self, items: &[T], count: usize) -> Result<Vec<T>> {
        if count > items.len() {
            return Err(ErrorSet::from(
                ErrorRecord::new(
                    "not_enough_items",
                    "Cannot pick more distinct items than the pool contains.",
                )
                .with_context("requested", count)
                .with_context("available", items.len()),
            ));
        }

        Ok(index::sample(&mut self.rng, items.len(), count)
            .into_iter()
            .map(|idx| items[idx].clone())
            .collect())
    }

    /// Uniform timestamp in the inclusive range, at second resolution.
    pub fn date_between(
        &mut self,
        earliest: NaiveDateTime,
        latest: NaiveDateTime,
    ) -> Result<NaiveDateTime> {
        if earliest > latest {
            return Err(ErrorSet::from(
                ErrorRecord::new(
                    "earliest_date_newer_than_latest_date",
                    "The latest date must be newer than the earliest date.",
                )
                .with_context("earliest", earliest.to_string())
                .with_context("latest", latest.to_string()),
            ));
        }

        let span = (latest - earliest).num_seconds();
        let offset = self.rng.random_range(0..=span);
        Ok(earliest + Duration::seconds(offset))
    }

    pub fn rate_type(&mut self, host: &dyn Host) -> Option<String> {
        self.pick_one(&host.rate_types()).cloned()
    }

    pub fn affiliate_status(&mut self, host: &dyn Host) -> Option<String> {
        self.pick_one(&host.affiliate_statuses()).cloned()
    }

    pub fn referral_status(&mut self, host: &dyn Host) -> Option<String> {
        self.pick_one(&host.referral_statuses()).cloned()
    }
}

fn ordered(a: i64, b: i64) -> (i64, i64) {
    if a <= b { (a, b) } else { (b, a) }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use affseed_core::MemoryHost;
    use chrono::NaiveDate;

    use super::*;

    fn at(date: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .expect("valid date")
            .and_hms_opt(0, 0, 0)
            .expect("valid time")
    }

    #[test]
    fn numbers_stay_within_inclusive_bounds() {
        let mut random = Randomizer::seeded(7);
        let values: HashSet<i64> = (0..500).map(|_| random.number(1, 3)).collect();
        assert_eq!(values, HashSet::from([1, 2, 3]));
    }

    #[test]
    fn prices_have_two_decimals() {
        let mut random = Randomizer::seeded(11);
        for _ in 0..100 {
            let price = random.price(0.0, 100.0).expect("finite bounds");
            assert!((0.0..=100.0).contains(&price));
            assert_eq!(round_currency(price), price);
        }
    }

    #[test]
    fn pick_many_returns_distinct_items() {
        let mut random = Randomizer::seeded(3);
        let pool = [10, 20, 30, 40, 50];
        let picked = random.pick_many(&pool, 4).expect("enough items");
        let unique: HashSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), 4);
        assert!(picked.iter().all(|item| pool.contains(item)));

        let too_many = random.pick_many(&pool, 6).unwrap_err();
        assert!(too_many.has("not_enough_items"));
    }

    #[test]
    fn dates_fall_inside_the_range() {
        let mut random = Randomizer::seeded(5);
        let earliest = at("2024-01-01");
        let latest = at("2024-03-01");
        for _ in 0..100 {
            let date = random.date_between(earliest, latest).expect("valid range");
            assert!(date >= earliest && date <= latest);
        }

        assert!(random.date_between(latest, earliest).is_err());
    }

    #[test]
    fn enum_picks_come_from_the_host() {
        let host = MemoryHost::default();
        let mut random = Randomizer::seeded(9);
        for _ in 0..20 {
            let status = random.affiliate_status(&host).expect("status");
            assert!(host.config().affiliate_statuses.contains(&status));
            let rate_type = random.rate_type(&host).expect("rate type");
            assert!(host.config().rate_types.contains(&rate_type));
        }
    }

    #[test]
    fn same_seed_gives_same_values() {
        let mut first = Randomizer::seeded(42);
        let mut second = Randomizer::seeded(42);
        assert_eq!(first.username(), second.username());
        assert_eq!(first.email(), second.email());
        assert_eq!(first.product_name(), second.product_name());
    }

    #[test]
    fn non_finite_price_bounds_are_rejected() {
        let mut random = Randomizer::seeded(8);
        for (min, max) in [(0.0, f64::INFINITY), (f64::NAN, 10.0), (f64::NEG_INFINITY, 1.0)] {
            let err = random.price(min, max).unwrap_err();
            assert_eq!(err.codes(), vec!["affseed_price_not_finite"]);
        }
    }
}
