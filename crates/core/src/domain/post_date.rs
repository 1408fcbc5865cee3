//! Post date parsing
//!
//! Sources report posting dates either as ISO dates/timestamps or as
//! relative phrases ("3 days ago", "Just posted", "30+ days ago").

use chrono::{DateTime, Duration, NaiveDate};

const DAYS_PER_MONTH: i64 = 30;
const DAYS_PER_WEEK: i64 = 7;

/// Parse a source's post date relative to `today`.
///
/// Returns `None` when the text cannot be interpreted.
pub fn parse_post_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.date_naive());
    }
    if let Some(prefix) = text.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(date);
        }
    }

    let lower = text.to_lowercase();
    if lower.contains("just posted")
        || lower.contains("today")
        || lower.contains("hour")
        || lower.contains("minute")
        || lower.contains("second")
    {
        return Some(today);
    }
    if lower.contains("yesterday") {
        return today.checked_sub_signed(Duration::days(1));
    }

    // "30+ days ago", "3 weeks ago", "1 month ago"
    let amount: i64 = lower
        .split(|c: char| !c.is_ascii_digit())
        .find(|s| !s.is_empty())?
        .parse()
        .ok()?;

    let days = if lower.contains("month") {
        amount.checked_mul(DAYS_PER_MONTH)?
    } else if lower.contains("week") {
        amount.checked_mul(DAYS_PER_WEEK)?
    } else if lower.contains("day") {
        amount
    } else {
        return None;
    };

    today.checked_sub_signed(Duration::try_days(days)?)
}
