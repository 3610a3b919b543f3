use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{Value, json};

use affseed_core::{DATE_TIME_FORMAT, ErrorRecord, ErrorSet, EventType, Result};

use super::{
    AffiliateGenerator, GenerationContext, Generated, Generator, OrderGenerator,
    ProductGenerator, Progress, UserGenerator, to_value, validate,
};
use crate::integrations::{self, Integration, IntegrationRef};
use crate::options::{
    CountRange, DEFAULT_EARLIEST_DATE, DEFAULT_LATEST_DATE, DateRangeArg, OrderOptions,
    TransactionOptions,
};
use crate::random::Randomizer;

/// Every pool created by one transaction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionBatch {
    pub users: Generated,
    pub affiliates: Generated,
    pub products: Generated,
    pub orders: Generated,
}

/// Seeds customers, affiliates and products, then places orders across them.
#[derive(Debug, Clone)]
pub struct TransactionGenerator {
    options: TransactionOptions,
    integration: Option<Integration>,
    products_per_order: (i64, i64),
    dates: Option<(NaiveDateTime, NaiveDateTime)>,
    errors: ErrorSet,
}

impl TransactionGenerator {
    pub fn new(
        ctx: &GenerationContext<'_>,
        integration: impl Into<IntegrationRef>,
        options: TransactionOptions,
    ) -> Self {
        let mut errors = ErrorSet::new();
        let integration = match integrations::get(ctx.host, integration) {
            Ok(integration) => Some(integration),
            Err(err) => {
                errors.merge(err);
                None
            }
        };

        validate::number(
            &mut errors,
            "invalid_transaction_number_arg",
            "transactions",
            options.number,
        );
        sub_count(&mut errors, "invalid_transaction_users_arg", "users", options.users.number());
        sub_count(
            &mut errors,
            "invalid_transaction_affiliates_arg",
            "affiliates",
            options.affiliates.number(),
        );
        let products = options.products.number();
        sub_count(&mut errors, "invalid_transaction_products_arg", "products", products);

        let products_per_order = validate::products_per_transaction(
            &mut errors,
            &options.products_per_transaction,
            Some(products),
        )
        .unwrap_or((1, 1));
        let dates = validate::date_range(
            &mut errors,
            &options.date_range,
            Some((DEFAULT_EARLIEST_DATE, DEFAULT_LATEST_DATE)),
            ctx.now,
        );

        Self {
            options,
            integration,
            products_per_order,
            dates,
            errors,
        }
    }

    fn order_options(&self, batch: &TransactionBatch) -> OrderOptions {
        let (min, max) = self.products_per_order;
        OrderOptions {
            number: self.options.number,
            users: batch.users.ids.clone(),
            affiliates: batch.affiliates.ids.clone(),
            products: batch.products.ids.clone(),
            campaigns: self.options.campaigns.clone(),
            products_per_transaction: CountRange::between(min, max),
            date_range: self.dates.map(|(earliest, latest)| {
                DateRangeArg::between(
                    earliest.format(DATE_TIME_FORMAT).to_string(),
                    latest.format(DATE_TIME_FORMAT).to_string(),
                )
            }),
        }
    }
}

fn sub_count(errors: &mut ErrorSet, code: &str, field: &str, value: i64) {
    if value < 1 {
        errors.push(
            ErrorRecord::new(
                code,
                format!("The {field} argument must be at least 1 for transactions."),
            )
            .with_context(field, value),
        );
    }
}

impl Generator for TransactionGenerator {
    type Output = TransactionBatch;

    fn name(&self) -> &'static str {
        "transaction"
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

    /// Runs the user, affiliate and product stages; when any of them fails
    /// no order is attempted. An order stage failure keeps the created pools
    /// in the error context.
    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        random: &mut Randomizer,
        progress: &mut Progress<'_>,
    ) -> Result<TransactionBatch> {
        let Some(integration) = &self.integration else {
            return Err(ErrorSet::single(
                "missing_integration",
                "The transaction generator has no resolved integration.",
            ));
        };

        let users = UserGenerator::new(self.options.users.to_options()).run(ctx, random, progress);
        let affiliates = AffiliateGenerator::new(ctx, self.options.affiliates.to_options())
            .run(ctx, random, progress);
        let products = ProductGenerator::new(ctx, integration, self.options.products.to_options())
            .run(ctx, random, progress);

        let (users, affiliates, products) = match (users, affiliates, products) {
            (Ok(users), Ok(affiliates), Ok(products)) => (users, affiliates, products),
            (users, affiliates, products) => {
                let mut failed = Vec::new();
                let mut inner = ErrorSet::new();
                for (stage, result) in [("users", users), ("affiliates", affiliates), ("products", products)] {
                    if let Err(errors) = result {
                        failed.push(stage);
                        inner.merge(errors);
                    }
                }
                let logged = ctx.events.log(
                    EventType::Error,
                    "transactions_generation_failed",
                    "The transactions generator failed. One or more generators have errors.",
                    self.name(),
                    json!({ "failed": failed, "errors": inner }),
                );
                return Err(wrap(logged, inner));
            }
        };

        let mut batch = TransactionBatch {
            users,
            affiliates,
            products,
            orders: Generated::default(),
        };

        let orders = OrderGenerator::new(ctx, integration, self.order_options(&batch))
            .run(ctx, random, progress);
        match orders {
            Ok(orders) => {
                batch.orders = orders;
                ctx.events.log(
                    EventType::GeneratorEvent,
                    "transactions_generated",
                    format!(
                        "The transactions generator created {} transactions.",
                        batch.orders.len()
                    ),
                    self.name(),
                    json!({
                        "users": batch.users.ids,
                        "affiliates": batch.affiliates.ids,
                        "products": batch.products.ids,
                        "orders": batch.orders.ids,
                    }),
                );
                Ok(batch)
            }
            Err(inner) => {
                let logged = ctx.events.log(
                    EventType::Error,
                    "transactions_generate_order_failed",
                    "The transactions generator failed. Orders were not created.",
                    self.name(),
                    json!({
                        "users": batch.users.ids,
                        "affiliates": batch.affiliates.ids,
                        "products": batch.products.ids,
                    }),
                );
                Err(wrap(logged, inner))
            }
        }
    }
}

/// Attach the stage errors to the logged failure record.
fn wrap(logged: ErrorSet, inner: ErrorSet) -> ErrorSet {
    logged
        .into_iter()
        .map(|record| record.with_source(inner.clone()))
        .collect()
}
