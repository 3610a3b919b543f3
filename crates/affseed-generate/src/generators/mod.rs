//! Record generators.
//!
//! A generator is built from its options, which resolves defaults and
//! validates every rule up front. [`Generator::run`] refuses to generate
//! anything while validation errors are pending.

pub mod affiliate;
pub mod order;
pub mod product;
pub mod transaction;
pub mod user;
mod validate;

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use affseed_core::{ErrorSet, EventLog, EventType, Host, Result};

use crate::random::Randomizer;

pub use affiliate::AffiliateGenerator;
pub use order::OrderGenerator;
pub use product::ProductGenerator;
pub use transaction::{TransactionBatch, TransactionGenerator};
pub use user::UserGenerator;

/// Collaborators shared by every generator of one run.
#[derive(Clone, Copy)]
pub struct GenerationContext<'a> {
    pub host: &'a dyn Host,
    pub events: &'a EventLog,
    /// Reference point for relative date expressions.
    pub now: NaiveDateTime,
}

impl<'a> GenerationContext<'a> {
    pub fn new(host: &'a dyn Host, events: &'a EventLog) -> Self {
        Self {
            host,
            events,
            now: Utc::now().naive_utc(),
        }
    }

    pub fn at(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    User,
    Affiliate,
    Product,
    Order,
}

/// Progress notification, sent once per attempted unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub unit: Unit,
    pub index: usize,
    /// Created id, or `None` when the unit was skipped.
    pub id: Option<u64>,
}

pub type Progress<'p> = dyn FnMut(Tick) + 'p;

/// A unit that failed and was left out of the result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skipped {
    pub unit: Unit,
    pub index: usize,
    pub errors: ErrorSet,
}

/// Outcome of a generation loop. Failed units do not stop the loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Generated {
    pub ids: Vec<u64>,
    pub skipped: Vec<Skipped>,
}

impl Generated {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Record one attempt and notify progress.
    pub(crate) fn record(
        &mut self,
        unit: Unit,
        index: usize,
        result: Result<u64>,
        progress: &mut Progress<'_>,
    ) -> Option<u64> {
        let id = match result {
            Ok(id) => {
                self.ids.push(id);
                Some(id)
            }
            Err(errors) => {
                tracing::debug!(event = "unit_skipped", unit = ?unit, index, errors = %errors);
                self.skipped.push(Skipped {
                    unit,
                    index,
                    errors,
                });
                None
            }
        };
        progress(Tick { unit, index, id });
        id
    }
}

pub trait Generator {
    type Output;

    fn name(&self) -> &'static str;

    /// Validation errors collected at construction.
    fn errors(&self) -> &ErrorSet;

    /// Resolved options, for logging.
    fn options(&self) -> Value;

    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        random: &mut Randomizer,
        progress: &mut Progress<'_>,
    ) -> Result<Self::Output>;

    fn run(
        &self,
        ctx: &GenerationContext<'_>,
        random: &mut Randomizer,
        progress: &mut Progress<'_>,
    ) -> Result<Self::Output> {
        let errors = self.errors();
        if !errors.is_empty() {
            ctx.events.log(
                EventType::Error,
                "generator_has_errors",
                "A generator attempted to run, but failed because it had errors.",
                self.name(),
                json!({ "args": self.options(), "errors": errors }),
            );
            return Err(errors.clone());
        }
        self.generate(ctx, random, progress)
    }
}

/// Number of loop iterations for a validated count.
pub(crate) fn iterations(number: i64) -> usize {
    usize::try_from(number).unwrap_or(0)
}

pub(crate) fn to_value(options: &impl Serialize) -> Value {
    serde_json::to_value(options).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use affseed_core::MemoryHost;

    use super::*;

    struct Spy {
        errors: ErrorSet,
        calls: Cell<usize>,
    }

    impl Generator for Spy {
        type Output = ();

        fn name(&self) -> &'static str {
            "spy"
        }

        fn errors(&self) -> &ErrorSet {
            &self.errors
        }

        fn options(&self) -> Value {
            json!({})
        }

        fn generate(
            &self,
            _ctx: &GenerationContext<'_>,
            _random: &mut Randomizer,
            _progress: &mut Progress<'_>,
        ) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            Ok(())
        }
    }

    fn events() -> EventLog {
        EventLog::new(std::env::temp_dir().join("affseed-generator-spy"))
    }

    #[test]
    fn run_refuses_to_generate_with_errors() {
        let host = MemoryHost::default();
        let events = events();
        let ctx = GenerationContext::new(&host, &events);
        let spy = Spy {
            errors: ErrorSet::single("invalid_spy_arg", "bad"),
            calls: Cell::new(0),
        };

        let err = spy.run(&ctx, &mut Randomizer::seeded(1), &mut |_| {}).unwrap_err();
        assert_eq!(err.codes(), vec!["invalid_spy_arg"]);
        assert_eq!(spy.calls.get(), 0);

        let logged = events.events();
        let logged = &logged[&EventType::Error];
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].code, "generator_has_errors");
        assert_eq!(logged[0].source, "spy");
    }

    #[test]
    fn run_generates_when_valid() {
        let host = MemoryHost::default();
        let events = events();
        let ctx = GenerationContext::new(&host, &events);
        let spy = Spy {
            errors: ErrorSet::new(),
            calls: Cell::new(0),
        };

        assert!(spy.run(&ctx, &mut Randomizer::seeded(1), &mut |_| {}).is_ok());
        assert_eq!(spy.calls.get(), 1);
        assert!(events.events().is_empty());
    }
}
