use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Current UTC time as RFC 3339 with millisecond precision, e.g.
/// `2024-12-31T23:59:59.000Z`.
pub fn iso_now() -> String {
    format_iso(Utc::now())
}

/// UTC time `days` days before now. Negative values point into the future.
///
/// `None` when the result falls outside the representable date range.
pub fn iso_days_ago(days: i64) -> Option<String> {
    let offset = Duration::try_days(days)?;
    Utc::now().checked_sub_signed(offset).map(format_iso)
}

fn format_iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
