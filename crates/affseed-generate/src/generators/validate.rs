//! Argument rules shared by the generators.
//!
//! Every check appends to the caller's error set and never stops at the
//! first failure.

use chrono::NaiveDateTime;

use affseed_core::{ErrorRecord, ErrorSet};

use crate::dates::parse_date_expr;
use crate::options::{CountRange, DateRangeArg};

pub(crate) fn number(errors: &mut ErrorSet, code: &str, label: &str, value: i64) {
    if value < 1 {
        errors.push(
            ErrorRecord::new(
                code,
                format!("The number argument must be at least 1 for {label}."),
            )
            .with_context("number", value),
        );
    }
}

/// Check a products-per-order range, optionally against the product pool size.
///
/// Returns the bounds when every rule holds.
pub(crate) fn products_per_transaction(
    errors: &mut ErrorSet,
    range: &CountRange,
    pool: Option<i64>,
) -> Option<(i64, i64)> {
    let before = errors.len();
    let (Some(min), Some(max)) = range.bounds() else {
        errors.push(
            ErrorRecord::new(
                "malformed_products_per_transaction_arg",
                "The products per transaction must either be a single integer, or contain a max and min value.",
            )
            .with_context("products_per_transaction", range),
        );
        return None;
    };

    if max < 1 {
        errors.push(
            ErrorRecord::new(
                "invalid_products_per_transaction_max_arg",
                "The products per transaction max argument must be at least 1.",
            )
            .with_context("max", max),
        );
    }
    if min < 1 {
        errors.push(
            ErrorRecord::new(
                "invalid_products_per_transaction_min_arg",
                "The products per transaction min argument must be at least 1.",
            )
            .with_context("min", min),
        );
    }
    if max < min {
        errors.push(
            ErrorRecord::new(
                "products_per_transaction_max_is_smaller_than_min",
                "The products per transaction max argument must be greater than the min argument.",
            )
            .with_context("min", min)
            .with_context("max", max),
        );
    }
    if let Some(pool) = pool {
        if max > pool {
            errors.push(
                ErrorRecord::new(
                    "products_per_transaction_max_is_larger_than_products",
                    "The products per transaction max argument cannot be greater than the products.",
                )
                .with_context("max", max)
                .with_context("products", pool),
            );
        }
        if min > pool {
            errors.push(
                ErrorRecord::new(
                    "products_per_transaction_min_is_larger_than_products",
                    "The products per transaction min argument cannot be greater than the products.",
                )
                .with_context("min", min)
                .with_context("products", pool),
            );
        }
    }

    (errors.len() == before).then_some((min, max))
}

/// Check a date window. Missing bounds fall back to `defaults` when given.
pub(crate) fn date_range(
    errors: &mut ErrorSet,
    range: &DateRangeArg,
    defaults: Option<(&str, &str)>,
    now: NaiveDateTime,
) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let earliest = range.earliest().or(defaults.map(|(earliest, _)| earliest));
    let latest = range.latest().or(defaults.map(|(_, latest)| latest));

    let (Some(earliest), Some(latest)) = (earliest, latest) else {
        errors.push(
            ErrorRecord::new(
                "malformed_date_range_arg",
                "The date range arg must either be a single date value, or contain earliest and latest values.",
            )
            .with_context("date_range", range),
        );
        return None;
    };

    let parsed_earliest = parse_date_expr(earliest, now);
    if parsed_earliest.is_none() {
        errors.push(
            ErrorRecord::new(
                "malformed_earliest_date_range_arg",
                "The earliest date range arg is not a valid date.",
            )
            .with_context("earliest", earliest),
        );
    }
    let parsed_latest = parse_date_expr(latest, now);
    if parsed_latest.is_none() {
        errors.push(
            ErrorRecord::new(
                "malformed_latest_date_range_arg",
                "The latest date range arg is not a valid date.",
            )
            .with_context("latest", latest),
        );
    }

    let (earliest, latest) = (parsed_earliest?, parsed_latest?);
    if earliest > latest {
        errors.push(
            ErrorRecord::new(
                "earliest_date_newer_than_latest_date",
                "The latest date arg must be newer than the earliest date.",
            )
            .with_context("earliest", earliest.to_string())
            .with_context("latest", latest.to_string()),
        );
        return None;
    }
    Some((earliest, latest))
}
