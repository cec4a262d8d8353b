//! Arithmetic Hebrew calendar.
//!
//! Months are numbered from Nisan (1) internally, the way the molad arithmetic
//! expects. [`HebrewDate::civil_month`] renumbers from Tishrei for display.

/// Fixed day of 1 Tishrei AM 1 (Julian -3761-10-07).
const EPOCH: i64 = -1_373_427;

pub(super) const NISAN: u32 = 1;
pub(super) const SIVAN: u32 = 3;
pub(super) const KISLEV: u32 = 9;
pub(super) const TISHREI: u32 = 7;

/// A date in the Hebrew calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HebrewDate {
    pub year: i64,
    /// Month counted from Nisan = 1.
    pub month: u32,
    pub day: u32,
}

impl HebrewDate {
    /// Month counted from Tishrei = 1, so Adar II is 7 in a leap year.
    #[must_use]
    pub fn civil_month(&self) -> u32 {
        if self.month >= TISHREI {
            self.month - 6
        } else {
            self.month + last_month_of_year(self.year) - 6
        }
    }

    #[must_use]
    pub fn month_name(&self) -> &'static str {
        match self.month {
            1 => "Nisan",
            2 => "Iyar",
            3 => "Sivan",
            4 => "Tammuz",
            5 => "Av",
            6 => "Elul",
            7 => "Tishrei",
            8 => "Cheshvan",
            9 => "Kislev",
            10 => "Tevet",
            11 => "Shevat",
            12 if is_leap_year(self.year) => "Adar I",
            12 => "Adar",
            _ => "Adar II",
        }
    }
}

/// Seven leap years in each 19-year Metonic cycle.
#[must_use]
pub const fn is_leap_year(year: i64) -> bool {
    (7 * year + 1).rem_euclid(19) < 7
}

/// 13 in leap years (Adar II), else 12 (Adar).
#[must_use]
pub const fn last_month_of_year(year: i64) -> u32 {
    if is_leap_year(year) {
        13
    } else {
        12
    }
}

fn elapsed_days(year: i64) -> i64 {
    let months_elapsed = (235 * year - 234).div_euclid(19);
    let parts_elapsed = 12_084 + 13_753 * months_elapsed;
    let days = 29 * months_elapsed + parts_elapsed.div_euclid(25_920);
    // Rosh Hashanah never falls on Sunday, Wednesday or Friday
    if (3 * (days + 1)).rem_euclid(7) < 3 {
        days + 1
    } else {
        days
    }
}

fn year_length_correction(year: i64) -> i64 {
    let (ny0, ny1, ny2) = (
        elapsed_days(year - 1),
        elapsed_days(year),
        elapsed_days(year + 1),
    );
    if ny2 - ny1 == 356 {
        2
    } else if ny1 - ny0 == 382 {
        1
    } else {
        0
    }
}

/// Fixed day of 1 Tishrei of `year`.
#[must_use]
pub fn new_year(year: i64) -> i64 {
    EPOCH + elapsed_days(year) + year_length_correction(year)
}

fn days_in_year(year: i64) -> i64 {
    new_year(year + 1) - new_year(year)
}

#[must_use]
pub fn last_day_of_month(month: u32, year: i64) -> u32 {
    let length = days_in_year(year);
    let short = matches!(month, 2 | 4 | 6 | 10 | 13)
        || (month == 12 && !is_leap_year(year))
        || (month == 8 && !matches!(length, 355 | 385))
        || (month == 9 && matches!(length, 353 | 383));
    if short {
        29
    } else {
        30
    }
}

fn month_days(months: impl Iterator<Item = u32>, year: i64) -> i64 {
    months.map(|m| i64::from(last_day_of_month(m, year))).sum()
}

#[must_use]
pub fn to_fixed(year: i64, month: u32, day: u32) -> i64 {
    let base = new_year(year) + i64::from(day) - 1;
    if month < TISHREI {
        base + month_days(TISHREI..=last_month_of_year(year), year) + month_days(1..month, year)
    } else {
        base + month_days(TISHREI..month, year)
    }
}

#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)] // day counts are small and positive
pub fn from_fixed(fixed: i64) -> HebrewDate {
    // Mean year length 35975351/98496 days
    let approx = ((fixed - EPOCH) as f64 / (35_975_351.0 / 98_496.0)).floor() as i64 + 1;
    let year = if new_year(approx) <= fixed {
        approx
    } else {
        approx - 1
    };

    let mut month = if fixed < to_fixed(year, NISAN, 1) {
        TISHREI
    } else {
        NISAN
    };
    while fixed > to_fixed(year, month, last_day_of_month(month, year)) {
        month += 1;
    }

    let day = (fixed - to_fixed(year, month, 1) + 1) as u32;
    HebrewDate { year, month, day }
}
