//! Time-remaining display for listings.

use chrono::{DateTime, NaiveDate, Utc};

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Whole hours left until `expiry`, rounded up. Negative once a full hour has
/// passed since expiry.
pub fn hours_remaining(expiry: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let diff = (expiry - now).num_milliseconds();
    // ceil for signed integer division
    let q = diff / MILLIS_PER_HOUR;
    if diff % MILLIS_PER_HOUR > 0 {
        q + 1
    } else {
        q
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryLabel {
    Expired,
    Hours(i64),
    On(NaiveDate),
}

impl ExpiryLabel {
    /// Browse-list label: hours within a day, otherwise the date.
    pub fn for_listing(expiry: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        match hours_remaining(expiry, now) {
            h if h < 0 => Self::Expired,
            h if h < 24 => Self::Hours(h),
            _ => Self::On(expiry.date_naive()),
        }
    }

    /// Owner dashboard label: always hours.
    pub fn hours_left(expiry: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        match hours_remaining(expiry, now) {
            h if h < 0 => Self::Expired,
            h => Self::Hours(h),
        }
    }
}

impl std::fmt::Display for ExpiryLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expired => f.write_str("Expired"),
            Self::Hours(h) => write!(f, "Expires in {h}h"),
            Self::On(date) => write!(f, "Expires {}", date.format("%d/%m/%Y")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, h, m, 0).unwrap()
    }

    #[test]
    fn rounds_up_partial_hours() {
        assert_eq!(hours_remaining(at(14, 1), at(10, 0)), 5);
        assert_eq!(hours_remaining(at(14, 0), at(10, 0)), 4);
        assert_eq!(hours_remaining(at(10, 0) + Duration::milliseconds(1), at(10, 0)), 1);
    }

    #[test]
    fn negative_only_after_a_full_hour() {
        // -30 minutes ceils to 0, which still reads as "0h"
        assert_eq!(hours_remaining(at(9, 30), at(10, 0)), 0);
        assert_eq!(hours_remaining(at(8, 30), at(10, 0)), -1);
        assert_eq!(ExpiryLabel::for_listing(at(8, 30), at(10, 0)), ExpiryLabel::Expired);
    }

    #[test]
    fn labels() {
        let now = at(10, 0);
        assert_eq!(ExpiryLabel::for_listing(at(14, 0), now).to_string(), "Expires in 4h");
        let later = now + Duration::days(3);
        assert_eq!(
            ExpiryLabel::for_listing(later, now).to_string(),
            "Expires 04/03/2025"
        );
        assert_eq!(ExpiryLabel::hours_left(later, now), ExpiryLabel::Hours(72));
    }
}
