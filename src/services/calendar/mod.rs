//! Conversion of Gregorian dates into religious and traditional calendars.
//!
//! Each calendar lives in its own submodule and works on fixed day numbers
//! (days since 0001-01-01 inclusive, as returned by `num_days_from_ce`). This
//! module maps a result onto the common [`CalendarDate`] shape the tools return.

mod chinese;
mod civil;
mod hebrew;
mod islamic;

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use indexmap::IndexMap;

pub use chinese::ChineseDate;
pub use hebrew::HebrewDate;
pub use islamic::IslamicDate;

/// Supported calendar systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarKind {
    Islamic,
    Hebrew,
    Buddhist,
    Hindu,
    Chinese,
    Japanese,
}

impl CalendarKind {
    /// All kinds, in the order they are advertised.
    pub const ALL: [Self; 6] = [
        Self::Islamic,
        Self::Hebrew,
        Self::Buddhist,
        Self::Hindu,
        Self::Chinese,
        Self::Japanese,
    ];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Islamic => "islamic",
            Self::Hebrew => "hebrew",
            Self::Buddhist => "buddhist",
            Self::Hindu => "hindu",
            Self::Chinese => "chinese",
            Self::Japanese => "japanese",
        }
    }

    /// Human-readable calendar name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Islamic => "Islamic Calendar (Hijri)",
            Self::Hebrew => "Hebrew Calendar",
            Self::Buddhist => "Buddhist Calendar",
            Self::Hindu => "Hindu Calendar",
            Self::Chinese => "Chinese Calendar",
            Self::Japanese => "Japanese Calendar",
        }
    }
}

impl fmt::Display for CalendarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised calendar name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown calendar type: {0}")]
pub struct UnknownCalendar(pub String);

impl FromStr for CalendarKind {
    type Err = UnknownCalendar;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| UnknownCalendar(s.to_string()))
    }
}

/// Extra fields for lunisolar dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LunarDetails {
    pub cycle: i64,
    pub stem_branch: String,
    pub zodiac: &'static str,
    pub leap_month: bool,
    pub related_gregorian_year: i64,
}

/// A Gregorian date expressed in another calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDate {
    pub kind: CalendarKind,
    pub year: i64,
    pub month: u32,
    pub day: u32,
    pub month_name: String,
    /// Era abbreviation or name; empty when the calendar has none.
    pub era: String,
    pub week_day: &'static str,
    pub is_leap_year: bool,
    /// Name to description.
    pub holidays: IndexMap<String, String>,
    /// Name to description.
    pub observances: IndexMap<String, String>,
    pub lunar: Option<LunarDetails>,
}

impl CalendarDate {
    /// `era year/month_name/day`, e.g. `AH 1445/Ramadan/1`.
    #[must_use]
    pub fn formatted(&self) -> String {
        let month = if self.month_name.is_empty() {
            self.month.to_string()
        } else {
            self.month_name.clone()
        };
        if self.era.is_empty() {
            format!("{}/{}/{}", self.year, month, self.day)
        } else {
            format!("{} {}/{}/{}", self.era, self.year, month, self.day)
        }
    }

    fn holiday(&mut self, name: &str, description: &str) {
        self.holidays.insert(name.to_string(), description.to_string());
    }

    fn observance(&mut self, name: &str, description: &str) {
        self.observances
            .insert(name.to_string(), description.to_string());
    }
}

/// Day number with 0001-01-01 = 1.
#[must_use]
pub fn fixed_from_date(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce())
}

const fn english_weekday(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

const fn hebrew_weekday(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Yom Rishon",
        Weekday::Mon => "Yom Sheni",
        Weekday::Tue => "Yom Shlishi",
        Weekday::Wed => "Yom Revi'i",
        Weekday::Thu => "Yom Chamishi",
        Weekday::Fri => "Yom Shishi",
        Weekday::Sat => "Shabbat",
    }
}

fn month_label(names: &[&str], month: u32) -> String {
    usize::try_from(month)
        .ok()
        .and_then(|m| m.checked_sub(1))
        .and_then(|index| names.get(index))
        .map_or_else(|| month.to_string(), |name| (*name).to_string())
}

fn blank(kind: CalendarKind, date: NaiveDate) -> CalendarDate {
    CalendarDate {
        kind,
        year: i64::from(date.year()),
        month: date.month(),
        day: date.day(),
        month_name: String::new(),
        era: String::new(),
        week_day: english_weekday(date.weekday()),
        is_leap_year: false,
        holidays: IndexMap::new(),
        observances: IndexMap::new(),
        lunar: None,
    }
}

/// Converts a Gregorian date into the requested calendar.
///
/// Returns `None` only when the date sits at the edge of the representable range.
#[must_use]
pub fn convert(date: NaiveDate, kind: CalendarKind) -> Option<CalendarDate> {
    let converted = match kind {
        CalendarKind::Islamic => islamic_date(date),
        CalendarKind::Hebrew => hebrew_date(date),
        CalendarKind::Buddhist => buddhist_date(date),
        CalendarKind::Hindu => saka_date(date)?,
        CalendarKind::Chinese => chinese_date(date),
        CalendarKind::Japanese => japanese_date(date),
    };
    tracing::debug!(%date, calendar = %kind, formatted = %converted.formatted(), "Converted date");
    Some(converted)
}

fn islamic_date(date: NaiveDate) -> CalendarDate {
    let IslamicDate { year, month, day } = islamic::from_fixed(fixed_from_date(date));
    let mut out = CalendarDate {
        year,
        month,
        day,
        month_name: month_label(&islamic::MONTH_NAMES, month),
        era: "AH".to_string(),
        is_leap_year: islamic::is_leap_year(year),
        ..blank(CalendarKind::Islamic, date)
    };

    match (month, day) {
        (1, 1) => out.holiday("Islamic New Year", "First day of Muharram"),
        (1, 10) => out.holiday("Ashura", "Day of Remembrance"),
        (3, 12) => out.holiday("Mawlid al-Nabi", "Prophet Muhammad's Birthday"),
        (10, 1) => out.holiday("Eid al-Fitr", "Festival of Breaking the Fast"),
        (12, 10) => out.holiday("Eid al-Adha", "Festival of Sacrifice"),
        _ => {}
    }
    if month == 9 {
        out.observance("Ramadan", "Month of fasting");
    }
    if month == 12 && (8..=13).contains(&day) {
        out.observance("Hajj", "Pilgrimage to Mecca");
    }
    if date.weekday() == Weekday::Fri {
        out.observance("Jumu'ah", "Friday congregational prayer");
    }
    out
}

fn hebrew_date(date: NaiveDate) -> CalendarDate {
    let fixed = fixed_from_date(date);
    let hebrew = hebrew::from_fixed(fixed);
    let mut out = CalendarDate {
        year: hebrew.year,
        month: hebrew.civil_month(),
        day: hebrew.day,
        month_name: hebrew.month_name().to_string(),
        era: "AM".to_string(),
        week_day: hebrew_weekday(date.weekday()),
        is_leap_year: hebrew::is_leap_year(hebrew.year),
        ..blank(CalendarKind::Hebrew, date)
    };

    let (month, day) = (hebrew.month, hebrew.day);
    if month == hebrew::TISHREI {
        match day {
            1 | 2 => out.holiday("Rosh Hashanah", "Jewish New Year"),
            10 => out.holiday("Yom Kippur", "Day of Atonement"),
            15..=21 => out.holiday("Sukkot", "Feast of Tabernacles"),
            22 => out.holiday("Shemini Atzeret", "Eighth Day of Assembly"),
            _ => {}
        }
    }
    if month == hebrew::NISAN && (15..=22).contains(&day) {
        out.holiday("Pesach", "Passover");
    }
    if month == hebrew::SIVAN && (6..=7).contains(&day) {
        out.holiday("Shavuot", "Feast of Weeks");
    }
    if month == hebrew::last_month_of_year(hebrew.year) && day == 14 {
        out.holiday("Purim", "Feast of Lots");
    }
    let hanukkah = hebrew::to_fixed(hebrew.year, hebrew::KISLEV, 25);
    if (hanukkah..hanukkah + 8).contains(&fixed) {
        out.holiday("Hanukkah", "Festival of Lights");
    }
    if day == 1 || day == 30 {
        out.observance("Rosh Chodesh", "New Month");
    }
    if date.weekday() == Weekday::Sat {
        out.observance("Shabbat", "Sabbath");
    }
    out
}

fn buddhist_date(date: NaiveDate) -> CalendarDate {
    let mut out = CalendarDate {
        year: i64::from(civil::buddhist_year(date.year())),
        month_name: date.month().to_string(),
        era: "BE".to_string(),
        ..blank(CalendarKind::Buddhist, date)
    };
    out.is_leap_year = NaiveDate::from_ymd_opt(date.year(), 2, 29).is_some();

    if (date.month(), date.day()) == (5, 15) {
        out.holiday("Vesak", "Buddha's Birthday");
    }
    out
}

fn saka_date(date: NaiveDate) -> Option<CalendarDate> {
    let saka = civil::saka_from_date(date)?;
    let mut out = CalendarDate {
        year: i64::from(saka.year),
        month: saka.month,
        day: saka.day,
        month_name: month_label(&civil::SAKA_MONTH_NAMES, saka.month),
        era: "Saka".to_string(),
        is_leap_year: saka.leap,
        ..blank(CalendarKind::Hindu, date)
    };
    if (saka.month, saka.day) == (1, 1) {
        out.holiday("Chaitra Navaratri", "Indian National New Year");
    }
    Some(out)
}

fn chinese_date(date: NaiveDate) -> CalendarDate {
    let fixed = fixed_from_date(date);
    let lunar = chinese::from_fixed(fixed);
    let mut out = CalendarDate {
        year: lunar.year,
        month: lunar.month,
        day: lunar.day,
        month_name: lunar.month_name(),
        is_leap_year: chinese::is_leap_year(fixed),
        lunar: Some(LunarDetails {
            cycle: lunar.cycle,
            stem_branch: lunar.sexagenary_year(),
            zodiac: lunar.zodiac(),
            leap_month: lunar.leap_month,
            related_gregorian_year: lunar.related_gregorian_year(),
        }),
        ..blank(CalendarKind::Chinese, date)
    };

    if !lunar.leap_month {
        match (lunar.month, lunar.day) {
            (1, 1) => out.holiday("Spring Festival", "Chinese New Year"),
            (1, 15) => out.holiday("Lantern Festival", "First full moon of the year"),
            (5, 5) => out.holiday("Dragon Boat Festival", "Duanwu Festival"),
            (7, 7) => out.observance("Qixi Festival", "Double Seventh Festival"),
            (8, 15) => out.holiday("Mid-Autumn Festival", "Moon Festival"),
            (9, 9) => out.observance("Double Ninth Festival", "Chongyang Festival"),
            _ => {}
        }
    }
    out
}

fn japanese_date(date: NaiveDate) -> CalendarDate {
    let (era, year) = civil::japanese_era(date).map_or_else(
        || ("Unknown".to_string(), i64::from(date.year())),
        |(era, year)| (era.name.to_string(), i64::from(year)),
    );
    let mut out = CalendarDate {
        year,
        month_name: month_label(&civil::JAPANESE_MONTH_NAMES, date.month()),
        era,
        is_leap_year: NaiveDate::from_ymd_opt(date.year(), 2, 29).is_some(),
        ..blank(CalendarKind::Japanese, date)
    };

    match (date.month(), date.day()) {
        (1, 1) => out.holiday("元日", "New Year's Day"),
        (2, 11) => out.holiday("建国記念の日", "National Foundation Day"),
        (2, 23) if date.year() >= 2020 => out.holiday("天皇誕生日", "Emperor's Birthday"),
        (4, 29) => out.holiday("昭和の日", "Showa Day"),
        (5, 3) => out.holiday("憲法記念日", "Constitution Memorial Day"),
        (5, 4) => out.holiday("みどりの日", "Greenery Day"),
        (5, 5) => out.holiday("こどもの日", "Children's Day"),
        (11, 3) => out.holiday("文化の日", "Culture Day"),
        (11, 23) => out.holiday("勤労感謝の日", "Labor Thanksgiving Day"),
        _ => {}
    }
    out
}
