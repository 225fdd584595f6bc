use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

/// Unix seconds for midnight UTC of a `YYYY-MM-DD` date.
pub fn parse_day(raw: &str) -> Result<i64> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date {raw:?}, expected YYYY-MM-DD"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .context("Invalid midnight")?
        .and_utc();
    Ok(midnight.timestamp())
}

/// Weekly reporting cut-off: the latest Wednesday at 01:00 UTC.
///
/// On Monday and Tuesday this is the Wednesday of the previous week.
pub fn last_week_breakpoint(now: DateTime<Utc>) -> DateTime<Utc> {
    let mut weekday = i64::from(now.weekday().num_days_from_monday());
    if weekday < 2 {
        weekday += 7;
    }
    let wednesday = now.date_naive() - Duration::days(weekday - 2);
    let at_one = wednesday
        .and_hms_opt(1, 0, 0)
        .map(|naive| naive.and_utc());
    match at_one {
        Some(breakpoint) if breakpoint > now => breakpoint - Duration::days(7),
        Some(breakpoint) => breakpoint,
        None => now,
    }
}

/// Human readable UTC rendering of a unix timestamp.
pub fn format_ts(ts: i64) -> String {
    match Utc.timestamp_opt(ts, 0).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M").to_string(),
        None => ts.to_string(),
    }
}
