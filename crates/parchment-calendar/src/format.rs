//! Display strings for times, dates and descriptions (en-US).

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::types::EventTiming;

pub const ALL_DAY: &str = "All Day";

/// Longest description shown in a list row before truncation
pub const DESCRIPTION_LIMIT: usize = 100;

pub const ELLIPSIS: &str = "...";

/// "07:30 PM", or "All Day" for date-only events.
pub fn time_label(timing: &EventTiming, tz: &Tz) -> String {
    match timing {
        EventTiming::Timed(dt) => dt.with_timezone(tz).format("%I:%M %p").to_string(),
        EventTiming::AllDay(_) => ALL_DAY.to_string(),
    }
}

/// "Thursday, February 1, 2024 at 07:30 PM"; all-day events omit the time.
pub fn long_date(timing: &EventTiming, tz: &Tz) -> String {
    match timing {
        EventTiming::Timed(dt) => dt
            .with_timezone(tz)
            .format("%A, %B %-d, %Y at %I:%M %p")
            .to_string(),
        EventTiming::AllDay(d) => d.format("%A, %B %-d, %Y").to_string(),
    }
}

/// "Feb"
pub fn month_abbrev(date: NaiveDate) -> String {
    date.format("%b").to_string()
}

/// Cut to [`DESCRIPTION_LIMIT`] characters, marking the cut with an ellipsis.
pub fn truncate_description(text: &str) -> String {
    match text.char_indices().nth(DESCRIPTION_LIMIT) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}
