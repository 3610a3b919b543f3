use chrono::NaiveDateTime;
use serde_json::{Value, json};

use affseed_core::{AffiliateFields, ErrorRecord, ErrorSet, EventType, Result};

use super::{
    GenerationContext, Generated, Generator, Progress, Unit, UserGenerator, to_value, validate,
};
use crate::dates::parse_date_expr;
use crate::options::{AffiliateOptions, UserOptions};
use crate::random::Randomizer;

const MIN_RANDOM_RATE: i64 = 1;
const MAX_RANDOM_RATE: i64 = 100;

/// Creates one account per affiliate, then the affiliate record for it.
///
/// Status, rate, rate type and payment email are randomized per affiliate
/// unless fixed in the options.
#[derive(Debug, Clone)]
pub struct AffiliateGenerator {
    options: AffiliateOptions,
    date_registered: Option<NaiveDateTime>,
    errors: ErrorSet,
}

impl AffiliateGenerator {
    pub fn new(ctx: &GenerationContext<'_>, options: AffiliateOptions) -> Self {
        let mut errors = ErrorSet::new();
        validate::number(
            &mut errors,
            "invalid_affiliate_number_arg",
            "affiliates",
            options.number,
        );

        if let Some(status) = &options.status
            && !ctx.host.affiliate_statuses().contains(status)
        {
            errors.push(
                ErrorRecord::new("invalid_affiliate_status_arg", "The affiliate status is not supported.")
                    .with_context("status", status)
                    .with_context("supported_statuses", ctx.host.affiliate_statuses()),
            );
        }
        if let Some(rate_type) = &options.rate_type
            && !ctx.host.rate_types().contains(rate_type)
        {
            errors.push(
                ErrorRecord::new("invalid_rate_type_arg", "The rate type is not supported.")
                    .with_context("rate_type", rate_type)
                    .with_context("supported_rate_types", ctx.host.rate_types()),
            );
        }

        let date_registered = options
            .date_registered
            .as_deref()
            .and_then(|value| {
                let parsed = parse_date_expr(value, ctx.now);
                if parsed.is_none() {
                    errors.push(
                        ErrorRecord::new(
                            "malformed_date_registered_arg",
                            "The date registered arg is not a valid date.",
                        )
                        .with_context("date_registered", value),
                    );
                }
                parsed
            });

        Self {
            options,
            date_registered,
            errors,
        }
    }

    fn fields(&self, ctx: &GenerationContext<'_>, random: &mut Randomizer, user_id: u64) -> AffiliateFields {
        let options = &self.options;
        AffiliateFields {
            user_id,
            status: options
                .status
                .clone()
                .or_else(|| random.affiliate_status(ctx.host))
                .unwrap_or_default(),
            date_registered: self.date_registered,
            rate: options
                .rate
                .unwrap_or_else(|| random.number(MIN_RANDOM_RATE, MAX_RANDOM_RATE) as f64),
            rate_type: options
                .rate_type
                .clone()
                .or_else(|| random.rate_type(ctx.host))
                .unwrap_or_default(),
            payment_email: options
                .payment_email
                .clone()
                .unwrap_or_else(|| random.email()),
            earnings: options.earnings,
            referrals: options.referrals,
            visits: options.visits,
            website_url: options.website_url.clone(),
        }
    }
}

impl Generator for AffiliateGenerator {
    type Output = Generated;

    fn name(&self) -> &'static str {
        "affiliate"
    }

    fn errors(&self) -> &ErrorSet {
        &self.errors
    }

    fn options(&self) -> Value {
        to_value(&self.options)
    }

    /// Account failures show up as skipped `User` units, so the result
    /// accounts for every requested affiliate.
    fn generate(
        &self,
        ctx: &GenerationContext<'_>,
        random: &mut Randomizer,
        progress: &mut Progress<'_>,
    ) -> Result<Generated> {
        let users = UserGenerator::new(UserOptions {
            number: self.options.number,
        })
        .run(ctx, random, progress)?;

        let mut generated = Generated::default();
        for (index, &user_id) in users.ids.iter().enumerate() {
            let fields = self.fields(ctx, random, user_id);
            let result = ctx.host.create_affiliate(&fields).ok_or_else(|| {
                ErrorSet::from(
                    ErrorRecord::new("affiliate_not_created", "The host refused the affiliate record.")
                        .with_context("user_id", user_id),
                )
            });
            generated.record(Unit::Affiliate, index, result, progress);
        }
        let mut skipped = users.skipped.clone();
        skipped.append(&mut generated.skipped);
        generated.skipped = skipped;

        ctx.events.log(
            EventType::GeneratorEvent,
            "affiliates_generated",
            format!("The affiliate generator created {} affiliates.", generated.len()),
            self.name(),
            json!({
                "affiliates": generated.ids,
                "user_ids": users.ids,
                "skipped": generated.skipped.len(),
                "args": self.options(),
            }),
        );
        Ok(generated)
    }
}
