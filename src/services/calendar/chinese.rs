//! Chinese lunisolar calendar computed from astronomical new moons and solar terms.
//!
//! Months begin on the day of the new moon in Beijing standard time (UTC+8).
//! A year with thirteen months between winter solstices gets a leap month: the
//! first month that contains no major solar term.

use crate::services::astronomy::{
    new_moon_at_or_after, new_moon_before, solar_longitude, MEAN_SYNODIC_MONTH, MEAN_TROPICAL_YEAR,
};

/// Fixed day of the legendary epoch (Gregorian -2636-02-15).
const EPOCH: i64 = -963_099;

/// Julian day of fixed-day midnight (RD 0 at JD 1721424.5).
const RD_JD_OFFSET: f64 = 1_721_424.5;

const BEIJING_OFFSET_DAYS: f64 = 8.0 / 24.0;

const STEMS: [&str; 10] = ["甲", "乙", "丙", "丁", "戊", "己", "庚", "辛", "壬", "癸"];
const BRANCHES: [&str; 12] = [
    "子", "丑", "寅", "卯", "辰", "巳", "午", "未", "申", "酉", "戌", "亥",
];
const ZODIAC: [&str; 12] = [
    "Rat", "Ox", "Tiger", "Rabbit", "Dragon", "Snake", "Horse", "Goat", "Monkey", "Rooster",
    "Dog", "Pig",
];

/// A date in the Chinese calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChineseDate {
    /// Sixty-year cycle number.
    pub cycle: i64,
    /// Year within the cycle, 1..=60.
    pub year: i64,
    pub month: u32,
    pub leap_month: bool,
    pub day: u32,
}

impl ChineseDate {
    /// Stem-branch name of the year, e.g. `甲辰`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // 0..10 and 0..12
    pub fn sexagenary_year(&self) -> String {
        let stem = (self.year - 1).rem_euclid(10) as usize;
        let branch = (self.year - 1).rem_euclid(12) as usize;
        format!("{}{}", STEMS[stem], BRANCHES[branch])
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // 0..12
    pub fn zodiac(&self) -> &'static str {
        ZODIAC[(self.year - 1).rem_euclid(12) as usize]
    }

    /// Gregorian year in which this Chinese year begins.
    #[must_use]
    pub const fn related_gregorian_year(&self) -> i64 {
        // Elapsed years since the epoch, minus the epoch's Gregorian offset
        (self.cycle - 1) * 60 + self.year - 2_637
    }

    /// Month name such as `8月` or `閏2月`.
    #[must_use]
    pub fn month_name(&self) -> String {
        if self.leap_month {
            format!("閏{}月", self.month)
        } else {
            format!("{}月", self.month)
        }
    }
}

const fn amod(x: i64, n: i64) -> i64 {
    let r = x.rem_euclid(n);
    if r == 0 {
        n
    } else {
        r
    }
}

#[allow(clippy::cast_precision_loss)] // fixed days are far below 2^52
fn midnight_in_china(fixed: i64) -> f64 {
    fixed as f64 + RD_JD_OFFSET - BEIJING_OFFSET_DAYS
}

#[allow(clippy::cast_possible_truncation)] // floor of a bounded day count
fn fixed_in_china(jd: f64) -> i64 {
    (jd - RD_JD_OFFSET + BEIJING_OFFSET_DAYS).floor() as i64
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn lunations_between(later: i64, earlier: i64) -> i64 {
    ((later - earlier) as f64 / MEAN_SYNODIC_MONTH).round() as i64
}

fn new_moon_on_or_after(fixed: i64) -> i64 {
    fixed_in_china(new_moon_at_or_after(midnight_in_china(fixed)))
}

fn new_moon_before_day(fixed: i64) -> i64 {
    fixed_in_china(new_moon_before(midnight_in_china(fixed)))
}

#[allow(clippy::cast_possible_truncation)] // 0..12
fn current_major_solar_term(fixed: i64) -> i64 {
    let longitude = solar_longitude(midnight_in_china(fixed));
    amod(2 + (longitude / 30.0).floor() as i64, 12)
}

fn estimate_prior_solar_longitude(target: f64, jd: f64) -> f64 {
    let rate = MEAN_TROPICAL_YEAR / 360.0;
    let tau = jd - rate * (solar_longitude(jd) - target).rem_euclid(360.0);
    let delta = (solar_longitude(tau) - target + 180.0).rem_euclid(360.0) - 180.0;
    jd.min(tau - rate * delta)
}

#[allow(clippy::cast_possible_truncation)]
fn winter_solstice_on_or_before(fixed: i64) -> i64 {
    let approx = estimate_prior_solar_longitude(270.0, midnight_in_china(fixed + 1));
    let mut day = (approx - RD_JD_OFFSET).floor() as i64 - 1;
    while solar_longitude(midnight_in_china(day + 1)) <= 270.0 {
        day += 1;
    }
    day
}

fn no_major_solar_term(fixed: i64) -> bool {
    current_major_solar_term(fixed) == current_major_solar_term(new_moon_on_or_after(fixed + 1))
}

fn prior_leap_month(earliest: i64, mut month_start: i64) -> bool {
    while month_start >= earliest {
        if no_major_solar_term(month_start) {
            return true;
        }
        month_start = new_moon_before_day(month_start);
    }
    false
}

fn new_year_in_sui(fixed: i64) -> i64 {
    let s1 = winter_solstice_on_or_before(fixed);
    let s2 = winter_solstice_on_or_before(s1 + 370);
    let m12 = new_moon_on_or_after(s1 + 1);
    let m13 = new_moon_on_or_after(m12 + 1);
    let next_m11 = new_moon_before_day(s2 + 1);

    if lunations_between(next_m11, m12) == 12
        && (no_major_solar_term(m12) || no_major_solar_term(m13))
    {
        new_moon_on_or_after(m13 + 1)
    } else {
        m13
    }
}

/// Fixed day of the Chinese New Year on or before `fixed`.
#[must_use]
pub fn new_year_on_or_before(fixed: i64) -> i64 {
    let new_year = new_year_in_sui(fixed);
    if fixed >= new_year {
        new_year
    } else {
        new_year_in_sui(fixed - 180)
    }
}

/// Whether the Chinese year containing `fixed` has thirteen months.
#[must_use]
pub fn is_leap_year(fixed: i64) -> bool {
    let start = new_year_on_or_before(fixed);
    // Years run 353 to 385 days, so this lands inside the following year
    let next = new_year_on_or_before(start + 400);
    lunations_between(next, start) == 13
}

#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)] // month in 1..=12, day in 1..=30
pub fn from_fixed(fixed: i64) -> ChineseDate {
    let s1 = winter_solstice_on_or_before(fixed);
    let s2 = winter_solstice_on_or_before(s1 + 370);
    let m12 = new_moon_on_or_after(s1 + 1);
    let next_m11 = new_moon_before_day(s2 + 1);
    let m = new_moon_before_day(fixed + 1);

    let leap_year = lunations_between(next_m11, m12) == 12;
    let month = amod(
        lunations_between(m, m12) - i64::from(leap_year && prior_leap_month(m12, m)),
        12,
    );
    let leap_month =
        leap_year && no_major_solar_term(m) && !prior_leap_month(m12, new_moon_before_day(m));

    let elapsed_years =
        (1.5 - month as f64 / 12.0 + (fixed - EPOCH) as f64 / MEAN_TROPICAL_YEAR).floor() as i64;

    ChineseDate {
        cycle: (elapsed_years - 1).div_euclid(60) + 1,
        year: amod(elapsed_years, 60),
        month: month as u32,
        leap_month,
        day: (fixed - m + 1) as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate};

    fn fixed(y: i32, m: u32, d: u32) -> i64 {
        i64::from(NaiveDate::from_ymd_opt(y, m, d).unwrap().num_days_from_ce())
    }

    #[test]
    fn new_year_2024_is_year_of_the_dragon() {
        let date = from_fixed(fixed(2024, 2, 10));
        assert_eq!((date.cycle, date.year, date.month, date.day), (78, 41, 1, 1));
        assert!(!date.leap_month);
        assert_eq!(date.sexagenary_year(), "甲辰");
        assert_eq!(date.zodiac(), "Dragon");
        assert_eq!(date.related_gregorian_year(), 2024);
        assert_eq!(new_year_on_or_before(fixed(2024, 6, 1)), fixed(2024, 2, 10));
    }

    #[test]
    fn eve_belongs_to_the_previous_year() {
        let date = from_fixed(fixed(2024, 2, 9));
        assert_eq!((date.year, date.month, date.day), (40, 12, 30));
    }

    #[test]
    fn leap_second_month_2023() {
        let leap = from_fixed(fixed(2023, 3, 22));
        assert_eq!((leap.month, leap.day), (2, 1));
        assert!(leap.leap_month);
        assert_eq!(leap.month_name(), "閏2月");

        let before = from_fixed(fixed(2023, 3, 21));
        assert_eq!((before.month, before.day), (2, 30));
        assert!(!before.leap_month);

        assert!(is_leap_year(fixed(2023, 6, 1)));
        assert!(!is_leap_year(fixed(2024, 6, 1)));
    }

    #[test]
    fn mid_autumn_2024() {
        let date = from_fixed(fixed(2024, 9, 17));
        assert_eq!((date.month, date.day), (8, 15));
        assert_eq!(date.month_name(), "8月");
    }

    #[test]
    fn leap_eleventh_month_2033() {
        let date = from_fixed(fixed(2033, 12, 22));
        assert_eq!((date.month, date.day), (11, 1));
        assert!(date.leap_month);
    }
}
