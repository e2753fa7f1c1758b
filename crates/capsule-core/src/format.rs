use chrono::{DateTime, Utc};

use crate::evaluator::{Feed, Status};

pub const ANONYMOUS: &str = "anonymous";

const MASK: char = '*';
const VISIBLE_PREFIX: usize = 2;

/// Mask the local part of an email for the public feed.
///
/// `"abcdef@example.com"` becomes `"ab****@example.com"`. Local parts of two
/// characters or fewer are shown as-is. Display only, never use the result
/// to identify anyone.
pub fn mask_email(email: &str) -> String {
    if email.is_empty() {
        return ANONYMOUS.to_string();
    }

    let (local, domain) = match email.split_once('@') {
        Some((local, domain)) => (local, Some(domain)),
        None => (email, None),
    };

    let len = local.chars().count();
    if len <= VISIBLE_PREFIX {
        return email.to_string();
    }

    let mut masked: String = local.chars().take(VISIBLE_PREFIX).collect();
    masked.extend(std::iter::repeat_n(MASK, len - VISIBLE_PREFIX));
    if let Some(domain) = domain {
        masked.push('@');
        masked.push_str(domain);
    }
    masked
}

pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

pub fn format_datetime(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Time left until `open_at`, e.g. `"3d 4h"`. `None` once it has passed.
pub fn time_remaining(open_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<String> {
    if open_at <= now {
        return None;
    }
    let left = open_at - now;
    let days = left.num_days();
    let hours = left.num_hours() % 24;
    let minutes = left.num_minutes() % 60;

    Some(if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        "<1m".to_string()
    })
}

pub fn status_message(status: Status, feed: Feed) -> &'static str {
    match (status, feed) {
        (Status::Opened, Feed::Public) => "Already opened!",
        (Status::Opened, Feed::Mine) => "This capsule has been opened!",
        (Status::ReadyToOpen, _) => "Ready to open!",
        (Status::Sealed, _) => "Not yet openable...",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn short_local_part_is_not_masked() {
        assert_eq!(mask_email("ab@example.com"), "ab@example.com");
        assert_eq!(mask_email("a@example.com"), "a@example.com");
    }

    #[test]
    fn long_local_part_is_masked() {
        assert_eq!(mask_email("abcdef@example.com"), "ab****@example.com");
        assert_eq!(mask_email("abc@x.io"), "ab*@x.io");
    }

    #[test]
    fn masking_counts_characters() {
        assert_eq!(mask_email("jöhnny@example.com"), "jö****@example.com");
    }

    #[test]
    fn masking_odd_inputs() {
        assert_eq!(mask_email(""), ANONYMOUS);
        assert_eq!(mask_email("abcdef"), "ab****");
    }

    #[test]
    fn remaining_time_framing() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(time_remaining(now, now), None);
        assert_eq!(time_remaining(now + Duration::hours(76), now).as_deref(), Some("3d 4h"));
        assert_eq!(time_remaining(now + Duration::minutes(130), now).as_deref(), Some("2h 10m"));
        assert_eq!(time_remaining(now + Duration::minutes(5), now).as_deref(), Some("5m"));
        assert_eq!(time_remaining(now + Duration::seconds(20), now).as_deref(), Some("<1m"));
    }

    #[test]
    fn dates() {
        let at = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_date(at), "2030-01-02");
        assert_eq!(format_datetime(at), "2030-01-02 03:04 UTC");
    }

    #[test]
    fn messages_differ_by_feed_only_when_opened() {
        assert_ne!(
            status_message(Status::Opened, Feed::Public),
            status_message(Status::Opened, Feed::Mine)
        );
        assert_eq!(
            status_message(Status::Sealed, Feed::Public),
            status_message(Status::Sealed, Feed::Mine)
        );
    }
}
