use serde_json::{Value, json};

use affseed_core::{ErrorRecord, ErrorSet, EventType, Result};

use super::{GenerationContext, Generated, Generator, Progress, Unit, iterations, to_value, validate};
use crate::integrations::{self, Integration, IntegrationRef};
use crate::options::ProductOptions;
use crate::random::Randomizer;

/// Creates products with random names and prices through an integration.
#[derive(Debug, Clone)]
pub struct ProductGenerator {
    options: ProductOptions,
    integration: Option<Integration>,
    errors: ErrorSet,
}

impl ProductGenerator {
    pub fn new(
        ctx: &GenerationContext<'_>,
        integration: impl Into<IntegrationRef>,
        options: ProductOptions,
    ) -> Self {
        let mut errors = ErrorSet::new();
        let integration = match integrations::get(ctx.host, integration) {
            Ok(integration) => Some(integration),
            Err(err) => {
                errors.merge(err);
                None
            }
        };

        validate::number(&mut errors, "invalid_product_number_arg", "products", options.number);
        if !options.min_price.is_finite() || !options.max_price.is_finite() {
            errors.push(
                ErrorRecord::new(
                    "affseed_price_not_finite",
                    "The provided price bounds must be finite numbers.",
                )
                .with_context("min_price", options.min_price)
                .with_context("max_price", options.max_price),
            );
        }
        if options.max_price < 0.0 {
            errors.push(
                ErrorRecord::new(
                    "affseed_max_price_invalid",
                    "The provided maximum price is too low. The minimum possible price is zero.",
                )
                .with_context("max_price", options.max_price),
            );
        }
        if options.min_price < 0.0 {
            errors.push(
                ErrorRecord::new(
                    "affseed_min_price_invalid",
                    "The provided minimum price is too low. The minimum possible price is zero.",
                )
                .with_context("min_price", options.min_price),
            );
        }
        if options.min_price > options.max_price {
            errors.push(
                ErrorRecord::new(
                    "min_price_greater_than_max_price",
                    "The minimum price cannot be greater than the maximum price.",
                )
                .with_context("min_price", options.min_price)
                .with_context("max_price", options.max_price),
            );
        }

        Self {
            options,
            integration,
            errors,
        }
    }

    pub fn integration(&self) -> Option<&Integration> {
        self.integration.as_ref()
    }
}

impl Generator for ProductGenerator {
    type Output = Generated;

    fn name(&self) -> &'static str {
        "product"
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
                "The product generator has no resolved integration.",
            ));
        };

        let mut generated = Generated::default();
        for index in 0..iterations(self.options.number) {
            let name = random.product_name();
            let result = random
                .price(self.options.min_price, self.options.max_price)
                .and_then(|price| integration.add_product(ctx.host, &name, price));
            generated.record(Unit::Product, index, result, progress);
        }

        ctx.events.log(
            EventType::GeneratorEvent,
            "products_generated",
            format!("The product generator created {} products.", generated.len()),
            self.name(),
            json!({
                "products": generated.ids,
                "skipped": generated.skipped.len(),
                "args": self.options(),
            }),
        );
        Ok(generated)
    }
}
