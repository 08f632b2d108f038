//! Calendar boundary arithmetic for the daily trigger.

use std::time::Duration;

use chrono::{DateTime, TimeZone};

/// One day.
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Time from `now` until the next local midnight in `now`'s time zone.
///
/// Exactly at midnight the answer is a full day. If midnight does not exist
/// on the next day (a DST gap), the first valid instant after it is used.
#[must_use]
pub fn until_next_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> Duration {
    let Some(tomorrow) = now.date_naive().succ_opt() else {
        return DAY;
    };

    let tz = now.timezone();
    let next = (0..3)
        .filter_map(|hour| tomorrow.and_hms_opt(hour, 0, 0))
        .find_map(|local| tz.from_local_datetime(&local).earliest());

    next.and_then(|next| (next.naive_utc() - now.naive_utc()).to_std().ok())
        .unwrap_or(DAY)
}
