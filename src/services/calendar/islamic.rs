//! Tabular Islamic calendar with the civil (Friday) epoch.

/// Fixed day of 1 Muharram 1 AH (Julian 622-07-16).
const EPOCH: i64 = 227_015;

pub(super) const MONTH_NAMES: [&str; 12] = [
    "Muharram",
    "Safar",
    "Rabi' al-awwal",
    "Rabi' al-thani",
    "Jumada al-awwal",
    "Jumada al-thani",
    "Rajab",
    "Sha'ban",
    "Ramadan",
    "Shawwal",
    "Dhu al-Qi'dah",
    "Dhu al-Hijjah",
];

/// A date in the tabular Islamic calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IslamicDate {
    pub year: i64,
    pub month: u32,
    pub day: u32,
}

/// 11 leap years in every 30-year cycle.
#[must_use]
pub const fn is_leap_year(year: i64) -> bool {
    (14 + 11 * year).rem_euclid(30) < 11
}

#[must_use]
pub fn to_fixed(year: i64, month: u32, day: u32) -> i64 {
    let (month, day) = (i64::from(month), i64::from(day));
    day + 29 * (month - 1)
        + (6 * month - 1).div_euclid(11)
        + (year - 1) * 354
        + (3 + 11 * year).div_euclid(30)
        + EPOCH
        - 1
}

#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // month in 1..=12, day in 1..=30
pub fn from_fixed(fixed: i64) -> IslamicDate {
    let year = (30 * (fixed - EPOCH) + 10_646).div_euclid(10_631);
    let prior_days = fixed - to_fixed(year, 1, 1);
    let month = (11 * prior_days + 330).div_euclid(325) as u32;
    let day = (fixed - to_fixed(year, month, 1) + 1) as u32;
    IslamicDate { year, month, day }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate};

    fn fixed(y: i32, m: u32, d: u32) -> i64 {
        i64::from(NaiveDate::from_ymd_opt(y, m, d).unwrap().num_days_from_ce())
    }

    #[test]
    fn epoch_is_first_muharram() {
        assert_eq!(
            from_fixed(EPOCH),
            IslamicDate {
                year: 1,
                month: 1,
                day: 1
            }
        );
    }

    #[test]
    fn ramadan_1445_begins_march_2024() {
        let date = from_fixed(fixed(2024, 3, 11));
        assert_eq!((date.year, date.month, date.day), (1445, 9, 1));
    }

    #[test]
    fn round_trip_across_year_boundary() {
        for f in fixed(2024, 7, 1)..fixed(2024, 7, 20) {
            let d = from_fixed(f);
            assert_eq!(to_fixed(d.year, d.month, d.day), f);
        }
    }

    #[test]
    fn leap_cycle() {
        assert_eq!((1..=30).filter(|y| is_leap_year(*y)).count(), 11);
        assert!(is_leap_year(2));
        assert!(!is_leap_year(1));
    }
}
