//! Relative start dates such as `2 weeks` or `6mo`.

use chrono::{DateTime, Duration, Months, SecondsFormat, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Day,
    Week,
    Month,
    Year,
}

impl Unit {
    fn parse(unit: &str) -> Option<Self> {
        match unit.to_ascii_lowercase().as_str() {
            "d" | "day" | "days" => Some(Unit::Day),
            "w" | "week" | "weeks" => Some(Unit::Week),
            "mo" | "month" | "months" => Some(Unit::Month),
            "y" | "year" | "years" => Some(Unit::Year),
            _ => None,
        }
    }

    fn before(self, now: DateTime<Utc>, count: u32) -> Option<DateTime<Utc>> {
        match self {
            Unit::Day => now.checked_sub_signed(Duration::try_days(count.into())?),
            Unit::Week => now.checked_sub_signed(Duration::try_weeks(count.into())?),
            Unit::Month => now.checked_sub_months(Months::new(count)),
            Unit::Year => now.checked_sub_months(Months::new(count.checked_mul(12)?)),
        }
    }
}

/// Parse `<count> <unit>` into the instant that long before `now`.
///
/// Whitespace between the count and unit is optional and units are case
/// insensitive. Months and years are calendar based.
pub fn relative_to(input: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let input = input.trim();
    let digits = input.find(|c: char| !c.is_ascii_digit())?;
    if digits == 0 {
        return None;
    }

    let (count, unit) = input.split_at(digits);
    let count: u32 = count.parse().ok()?;
    Unit::parse(unit.trim_start())?.before(now, count)
}

/// Resolve a `--since` argument against `now`.
///
/// Relative durations become an RFC 3339 UTC timestamp, anything else is
/// returned unchanged for GitHub to interpret.
pub fn resolve_since(input: &str, now: DateTime<Utc>) -> String {
    match relative_to(input, now) {
        Some(instant) => instant.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => input.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-31T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn days_and_weeks() {
        assert_eq!(resolve_since("3 days", now()), "2024-03-28T12:00:00.000Z");
        assert_eq!(resolve_since("1day", now()), "2024-03-30T12:00:00.000Z");
        assert_eq!(resolve_since("10d", now()), "2024-03-21T12:00:00.000Z");
        assert_eq!(resolve_since("2 Weeks", now()), "2024-03-17T12:00:00.000Z");
        assert_eq!(resolve_since("1w", now()), "2024-03-24T12:00:00.000Z");
    }

    #[test]
    fn calendar_months_clamp_to_month_end() {
        assert_eq!(resolve_since("1 month", now()), "2024-02-29T12:00:00.000Z");
        assert_eq!(resolve_since("2MO", now()), "2024-01-31T12:00:00.000Z");
        assert_eq!(resolve_since("1 year", now()), "2023-03-31T12:00:00.000Z");
        assert_eq!(resolve_since("2y", now()), "2022-03-31T12:00:00.000Z");
    }

    #[test]
    fn other_input_passes_through() {
        for input in [
            "2023-01-01T00:00:00Z",
            "2023-01-01",
            "days",
            "3 fortnights",
            "3",
            "",
            "-3 days",
        ] {
            assert_eq!(resolve_since(input, now()), input);
        }
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(
            relative_to("  6 months ", now()),
            now().checked_sub_months(Months::new(6))
        );
    }
}
