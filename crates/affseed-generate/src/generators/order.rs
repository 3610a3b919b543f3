use chrono::NaiveDateTime;
use serde_json::{Value, json};

use affseed_core::{ErrorRecord, ErrorSet, EventType, Result};

use super::{GenerationContext, Generated, Generator, Progress, Unit, iterations, to_value, validate};
use crate::integrations::{self, Integration, IntegrationRef};
use crate::options::OrderOptions;
use crate::random::Randomizer;

/// Places orders for random customers over random product subsets.
///
/// With an affiliate pool every order is referred through a simulated visit;
/// without one orders are placed directly.
#[derive(Debug, Clone)]
pub struct OrderGenerator {
    options: OrderOptions,
    integration: Option<Integration>,
    products_per_order: (i64, i64),
    dates: Option<(NaiveDateTime, NaiveDateTime)>,
    errors: ErrorSet,
}

impl OrderGenerator {
    pub fn new(
        ctx: &GenerationContext<'_>,
        integration: impl Into<IntegrationRef>,
        mut options: OrderOptions,
    ) -> Self {
        let mut errors = ErrorSet::new();
        let integration = match integrations::get(ctx.host, integration) {
            Ok(integration) => Some(integration),
            Err(err) => {
                errors.merge(err);
                None
            }
        };

        validate::number(&mut errors, "invalid_order_number_arg", "orders", options.number);
        if options.users.is_empty() {
            errors.push(ErrorRecord::new(
                "missing_users_arg",
                "Orders need at least one user to place them for.",
            ));
        }

        let pool = i64::try_from(options.products.len()).unwrap_or(i64::MAX);
        let products_per_order =
            validate::products_per_transaction(&mut errors, &options.products_per_transaction, Some(pool))
                .unwrap_or((1, 1));

        let dates = options
            .date_range
            .as_ref()
            .and_then(|range| validate::date_range(&mut errors, range, None, ctx.now));

        if options.campaigns.is_empty() {
            options.campaigns.push(String::new());
        }

        Self {
            options,
            integration,
            products_per_order,
            dates,
            errors,
        }
    }

    fn place_one(
        &self,
        ctx: &GenerationContext<'_>,
        random: &mut Randomizer,
        integration: &Integration,
    ) -> Result<u64> {
        let (min, max) = self.products_per_order;
        let count = usize::try_from(random.number(min, max)).unwrap_or(0);
        let user = *random.pick_one(&self.options.users).ok_or_else(|| {
            ErrorSet::from(ErrorRecord::new("missing_users_arg", "No users to place orders for."))
        })?;
        let affiliate = random.pick_one(&self.options.affiliates).copied();
        let campaign = random
            .pick_one(&self.options.campaigns)
            .cloned()
            .unwrap_or_default();
        let products = random.pick_many(&self.options.products, count)?;
        let date = match self.dates {
            Some((earliest, latest)) => Some(random.date_between(earliest, latest)?),
            None => None,
        };

        match affiliate {
            Some(affiliate) => integration.place_referred_order(
                ctx.host, random, user, affiliate, &products, &campaign, date,
            ),
            None => integration.place_order(ctx.host, random, user, &products, date),
        }
    }
}

impl Generator for OrderGenerator {
    type Output = Generated;

    fn name(&self) -> &'static str {
        "order"
    }

    fn errors(&self) -> &ErrorSet {
        &self.errors
    }

    fn options(&self) -> Value {
        let mut value = to_value(&self.options);
        if let (Value::Object(map), Some(integration)) = (&mut value, &self.integration) {
            map.insert("integration".to_string(), json!(integration.kind()));
        }
        value
    }

    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        random: &mut Randomizer,
        progress: &mut Progress<'_>,
    ) -> Result<Generated> {
        let Some(integration) = &self.integration else {
            return Err(ErrorSet::single(
                "missing_integration",
                "The order generator has no resolved integration.",
            ));
        };

        let mut generated = Generated::default();
        for index in 0..iterations(self.options.number) {
            let result = self.place_one(ctx, random, integration);
            generated.record(Unit::Order, index, result, progress);
        }

        ctx.events.log(
            EventType::GeneratorEvent,
            "orders_generated",
            format!("The order generator created {} orders.", generated.len()),
            self.name(),
            json!({
                "orders": generated.ids,
                "skipped": generated.skipped.len(),
                "args": self.options(),
            }),
        );
        Ok(generated)
    }
}
