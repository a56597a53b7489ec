//! Relative "time ago" formatting for comment permalinks.

use chrono::{DateTime, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

/// Describe how long ago `ts` was, relative to `now`.
///
/// `with_suffix` appends `suffix_word` ("5 minutes ago").  Anything under a
/// minute, or in the future, reads "just now".
pub fn time_difference(
    ts: DateTime<Utc>,
    now: DateTime<Utc>,
    with_suffix: bool,
    suffix_word: &str,
) -> String {
    let secs = (now - ts).num_seconds();
    if secs < MINUTE {
        return "just now".to_string();
    }

    let (n, unit) = if secs < HOUR {
        (secs / MINUTE, "minute")
    } else if secs < DAY {
        (secs / HOUR, "hour")
    } else if secs < MONTH {
        (secs / DAY, "day")
    } else if secs < YEAR {
        (secs / MONTH, "month")
    } else {
        (secs / YEAR, "year")
    };

    let plural = if n == 1 { "" } else { "s" };
    if with_suffix && !suffix_word.is_empty() {
        format!("{} {}{} {}", n, unit, plural, suffix_word)
    } else {
        format!("{} {}{}", n, unit, plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_time_difference_units() {
        let now = Utc::now();
        assert_eq!(time_difference(now - Duration::seconds(5), now, true, "ago"), "just now");
        assert_eq!(
            time_difference(now - Duration::minutes(1), now, true, "ago"),
            "1 minute ago"
        );
        assert_eq!(
            time_difference(now - Duration::minutes(5), now, true, "ago"),
            "5 minutes ago"
        );
        assert_eq!(time_difference(now - Duration::hours(3), now, false, "ago"), "3 hours");
        assert_eq!(time_difference(now - Duration::days(2), now, true, "ago"), "2 days ago");
        assert_eq!(
            time_difference(now - Duration::days(65), now, true, "ago"),
            "2 months ago"
        );
        assert_eq!(
            time_difference(now - Duration::days(400), now, true, "ago"),
            "1 year ago"
        );
    }

    #[test]
    fn test_future_timestamp_is_just_now() {
        let now = Utc::now();
        assert_eq!(time_difference(now + Duration::hours(1), now, true, "ago"), "just now");
    }
}
