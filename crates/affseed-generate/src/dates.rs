use std::sync::LazyLock;

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

static AGO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s+(day|week|month|year)s?\s+ago$").expect("valid ago pattern")
});
static OFFSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(now|today)\s*([+-])\s*(\d+)\s+(day|week|month|year)s?$")
        .expect("valid offset pattern")
});
static STEP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(last|next)\s+(day|week|month|year)$").expect("valid step pattern")
});

/// Parse a date expression relative to `now`.
///
/// Absolute values (`YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, RFC 3339) and a small
/// set of relative phrases are understood: `now`, `today`, `yesterday`,
/// `tomorrow`, `last|next <unit>`, `<n> <unit>s ago` and `today +/- <n> <unit>s`.
pub fn parse_date_expr(expr: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let raw = expr.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(value) = parse_absolute(raw) {
        return Some(value);
    }

    let expr = raw.to_ascii_lowercase();

    let today = now.date().and_time(NaiveTime::MIN);
    match expr.as_str() {
        "now" => return Some(now),
        "today" => return Some(today),
        "yesterday" => return shift(today, -1, "day"),
        "tomorrow" => return shift(today, 1, "day"),
        _ => {}
    }

    if let Some(caps) = STEP_RE.captures(&expr) {
        let amount = if &caps[1] == "last" { -1 } else { 1 };
        return shift(now, amount, &caps[2]);
    }

    if let Some(caps) = AGO_RE.captures(&expr) {
        let amount: i64 = caps[1].parse().ok()?;
        return shift(now, -amount, &caps[2]);
    }

    if let Some(caps) = OFFSET_RE.captures(&expr) {
        let base = if &caps[1] == "now" { now } else { today };
        let amount: i64 = caps[3].parse().ok()?;
        let amount = if &caps[2] == "-" { -amount } else { amount };
        return shift(base, amount, &caps[4]);
    }

    None
}

fn parse_absolute(value: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(parsed);
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(parsed);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

fn shift(base: NaiveDateTime, amount: i64, unit: &str) -> Option<NaiveDateTime> {
    match unit {
        "day" => base.checked_add_signed(Duration::try_days(amount)?),
        "week" => base.checked_add_signed(Duration::try_weeks(amount)?),
        "month" => shift_months(base, amount),
        "year" => shift_months(base, amount.checked_mul(12)?),
        _ => None,
    }
}

fn shift_months(base: NaiveDateTime, amount: i64) -> Option<NaiveDateTime> {
    let months = Months::new(u32::try_from(amount.unsigned_abs()).ok()?);
    if amount < 0 {
        base.checked_sub_months(months)
    } else {
        base.checked_add_months(months)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 31)
            .and_then(|date| date.and_hms_opt(15, 30, 0))
            .expect("valid timestamp")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("valid date")
    }

    #[test]
    fn parses_absolute_dates() {
        assert_eq!(parse_date_expr("2024-01-01", now()), Some(date(2024, 1, 1)));
        assert_eq!(
            parse_date_expr("2024-01-01 10:00:00", now()),
            date(2024, 1, 1).checked_add_signed(Duration::hours(10))
        );
        assert_eq!(
            parse_date_expr("2024-01-01T10:00:00Z", now()),
            date(2024, 1, 1).checked_add_signed(Duration::hours(10))
        );
    }

    #[test]
    fn parses_keywords() {
        assert_eq!(parse_date_expr("now", now()), Some(now()));
        assert_eq!(parse_date_expr(" Today ", now()), Some(date(2024, 3, 31)));
        assert_eq!(parse_date_expr("yesterday", now()), Some(date(2024, 3, 30)));
        assert_eq!(parse_date_expr("tomorrow", now()), Some(date(2024, 4, 1)));
    }

    #[test]
    fn parses_relative_phrases() {
        // Month arithmetic clamps to the last valid day.
        assert_eq!(
            parse_date_expr("last month", now()).map(|value| value.date()),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(
            parse_date_expr("3 days ago", now()).map(|value| value.date()),
            NaiveDate::from_ymd_opt(2024, 3, 28)
        );
        assert_eq!(
            parse_date_expr("today - 2 weeks", now()),
            Some(date(2024, 3, 17))
        );
        assert_eq!(
            parse_date_expr("next year", now()).map(|value| value.date()),
            NaiveDate::from_ymd_opt(2025, 3, 31)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_date_expr("", now()), None);
        assert_eq!(parse_date_expr("not a date", now()), None);
        assert_eq!(parse_date_expr("2024-13-45", now()), None);
    }
}
