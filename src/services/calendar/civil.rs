//! Calendars that reuse the Gregorian day grid: Thai Buddhist, Indian national and Japanese eras.

use chrono::{Datelike, NaiveDate};

/// Buddhist Era year for a Gregorian year.
#[must_use]
pub const fn buddhist_year(gregorian_year: i32) -> i32 {
    gregorian_year + 543
}

fn is_gregorian_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub(super) const SAKA_MONTH_NAMES: [&str; 12] = [
    "Chaitra",
    "Vaishakha",
    "Jyeshtha",
    "Ashadha",
    "Shravana",
    "Bhadra",
    "Ashvin",
    "Kartika",
    "Agrahayana",
    "Pausha",
    "Magha",
    "Phalguna",
];

/// A date in the Indian national (Saka) calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SakaDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// Chaitra has 31 days.
    pub leap: bool,
}

// 1 Chaitra falls on March 22, or March 21 in Gregorian leap years
fn chaitra_first(gregorian_year: i32) -> Option<NaiveDate> {
    let day = if is_gregorian_leap(gregorian_year) {
        21
    } else {
        22
    };
    NaiveDate::from_ymd_opt(gregorian_year, 3, day)
}

/// Converts a Gregorian date. `None` only at the edges of chrono's range.
#[must_use]
pub fn saka_from_date(date: NaiveDate) -> Option<SakaDate> {
    let mut gregorian_year = date.year();
    let mut start = chaitra_first(gregorian_year)?;
    if date < start {
        gregorian_year -= 1;
        start = chaitra_first(gregorian_year)?;
    }

    let leap = is_gregorian_leap(gregorian_year);
    let chaitra = if leap { 31 } else { 30 };
    let lengths = [chaitra, 31, 31, 31, 31, 31, 30, 30, 30, 30, 30, 30];

    let mut remaining = (date - start).num_days();
    for (index, length) in (1u32..).zip(lengths) {
        if remaining < length {
            return Some(SakaDate {
                year: gregorian_year - 78,
                month: index,
                day: u32::try_from(remaining + 1).ok()?,
                leap,
            });
        }
        remaining -= length;
    }
    None
}

/// A Japanese imperial era.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Era {
    pub name: &'static str,
    pub romaji: &'static str,
    start: (i32, u32, u32),
}

impl Era {
    fn start_date(&self) -> Option<NaiveDate> {
        let (y, m, d) = self.start;
        NaiveDate::from_ymd_opt(y, m, d)
    }
}

const ERAS: [Era; 5] = [
    Era {
        name: "令和",
        romaji: "Reiwa",
        start: (2019, 5, 1),
    },
    Era {
        name: "平成",
        romaji: "Heisei",
        start: (1989, 1, 8),
    },
    Era {
        name: "昭和",
        romaji: "Showa",
        start: (1926, 12, 25),
    },
    Era {
        name: "大正",
        romaji: "Taisho",
        start: (1912, 7, 30),
    },
    Era {
        name: "明治",
        romaji: "Meiji",
        start: (1868, 9, 8),
    },
];

pub(super) const JAPANESE_MONTH_NAMES: [&str; 12] = [
    "睦月", "如月", "弥生", "卯月", "皐月", "水無月", "文月", "葉月", "長月", "神無月", "霜月",
    "師走",
];

/// The era in effect on `date`, with the year counted within it.
///
/// Dates before Meiji have no era.
#[must_use]
pub fn japanese_era(date: NaiveDate) -> Option<(Era, i32)> {
    ERAS.iter()
        .find(|era| era.start_date().is_some_and(|start| date >= start))
        .map(|era| (*era, date.year() - era.start.0 + 1))
}
