//! Sun and moon calculations.
//!
//! Positions, rise/set times and illumination follow the low-precision
//! formulas of the `SunCalc` family (accurate to about a minute for the sun and
//! a few minutes for the moon). Solar longitude and new-moon instants follow
//! Meeus, *Astronomical Algorithms*, chapters 25 and 49, and feed the lunisolar
//! calendar.
//!
//! Angles are radians internally and degrees at the API boundary. Times are UTC.

use std::f64::consts::PI;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

const RAD: f64 = PI / 180.0;
const DAY_MS: f64 = 86_400_000.0;
const J1970: f64 = 2_440_588.0;
const J2000: f64 = 2_451_545.0;
const OBLIQUITY: f64 = RAD * 23.4397;
const J0: f64 = 0.0009;

/// Mean length of a synodic month in days.
pub const MEAN_SYNODIC_MONTH: f64 = 29.530_588_861;

/// Mean length of a tropical year in days.
pub const MEAN_TROPICAL_YEAR: f64 = 365.242_189;

// TT - UT around the present epoch, in days (69 s)
const DELTA_T_DAYS: f64 = 69.0 / 86_400.0;

// Mean Sun-Earth distance in km
const SUN_DISTANCE_KM: f64 = 149_598_000.0;

/// Julian day of an instant.
#[must_use]
#[allow(clippy::cast_precision_loss)] // millisecond timestamps fit comfortably in f64
pub fn julian_day(instant: DateTime<Utc>) -> f64 {
    instant.timestamp_millis() as f64 / DAY_MS - 0.5 + J1970
}

/// Instant of a Julian day, if representable.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // bounded by chrono's own range check
pub fn from_julian_day(jd: f64) -> Option<DateTime<Utc>> {
    let millis = (jd + 0.5 - J1970) * DAY_MS;
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis.round() as i64)
}

fn days_since_j2000(instant: DateTime<Utc>) -> f64 {
    julian_day(instant) - J2000
}

fn right_ascension(l: f64, b: f64) -> f64 {
    (l.sin() * OBLIQUITY.cos() - b.tan() * OBLIQUITY.sin()).atan2(l.cos())
}

fn declination(l: f64, b: f64) -> f64 {
    (b.sin() * OBLIQUITY.cos() + b.cos() * OBLIQUITY.sin() * l.sin()).asin()
}

// Measured from south, westward positive
fn azimuth(h: f64, phi: f64, dec: f64) -> f64 {
    h.sin().atan2(h.cos() * phi.sin() - dec.tan() * phi.cos())
}

fn altitude(h: f64, phi: f64, dec: f64) -> f64 {
    (phi.sin() * dec.sin() + phi.cos() * dec.cos() * h.cos()).asin()
}

fn sidereal_time(d: f64, lw: f64) -> f64 {
    RAD * (280.16 + 360.985_623_5 * d) - lw
}

fn astro_refraction(h: f64) -> f64 {
    let h = h.max(0.0);
    0.000_296_7 / (h + 0.003_125_36 / (h + 0.089_011_79)).tan()
}

fn solar_mean_anomaly(d: f64) -> f64 {
    RAD * (357.5291 + 0.985_600_28 * d)
}

fn ecliptic_longitude(m: f64) -> f64 {
    let center = RAD * (1.9148 * m.sin() + 0.02 * (2.0 * m).sin() + 0.0003 * (3.0 * m).sin());
    let perihelion = RAD * 102.9372;
    m + center + perihelion + PI
}

struct Equatorial {
    ra: f64,
    dec: f64,
}

fn sun_coords(d: f64) -> Equatorial {
    let l = ecliptic_longitude(solar_mean_anomaly(d));
    Equatorial {
        ra: right_ascension(l, 0.0),
        dec: declination(l, 0.0),
    }
}

struct MoonCoords {
    ra: f64,
    dec: f64,
    distance_km: f64,
}

fn moon_coords(d: f64) -> MoonCoords {
    let l = RAD * (218.316 + 13.176_396 * d);
    let m = RAD * (134.963 + 13.064_993 * d);
    let f = RAD * (93.272 + 13.229_350 * d);

    let longitude = l + RAD * 6.289 * m.sin();
    let latitude = RAD * 5.128 * f.sin();

    MoonCoords {
        ra: right_ascension(longitude, latitude),
        dec: declination(longitude, latitude),
        distance_km: 20_905.0f64.mul_add(-m.cos(), 385_001.0),
    }
}

/// Horizontal coordinates in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Degrees clockwise from north.
    pub azimuth: f64,
    /// Degrees above the horizon.
    pub altitude: f64,
}

fn to_north_azimuth(az: f64) -> f64 {
    (az / RAD + 180.0).rem_euclid(360.0)
}

/// Position of the sun.
#[must_use]
pub fn sun_position(instant: DateTime<Utc>, latitude: f64, longitude: f64) -> Position {
    let lw = RAD * -longitude;
    let phi = RAD * latitude;
    let d = days_since_j2000(instant);
    let c = sun_coords(d);
    let h = sidereal_time(d, lw) - c.ra;

    Position {
        azimuth: to_north_azimuth(azimuth(h, phi, c.dec)),
        altitude: altitude(h, phi, c.dec) / RAD,
    }
}

/// Sun altitude thresholds for rise/set style events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SunHorizon {
    /// Upper limb on the horizon, with refraction (-0.833°).
    Sunrise,
    /// Civil twilight (-6°).
    Civil,
    /// Nautical twilight (-12°).
    Nautical,
    /// Astronomical twilight (-18°).
    Astronomical,
}

impl SunHorizon {
    const fn degrees(self) -> f64 {
        match self {
            Self::Sunrise => -0.833,
            Self::Civil => -6.0,
            Self::Nautical => -12.0,
            Self::Astronomical => -18.0,
        }
    }
}

/// A pair of crossing times. Either side is `None` when the crossing does not happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RiseSet {
    /// Upward crossing.
    pub rise: Option<DateTime<Utc>>,
    /// Downward crossing.
    pub set: Option<DateTime<Utc>>,
}

/// The solar cycle closest to local noon on `date`.
struct SolarDay {
    noon: f64,
    lw: f64,
    phi: f64,
    dec: f64,
    n: f64,
    m: f64,
    l: f64,
}

fn solar_day(date: NaiveDate, latitude: f64, longitude: f64) -> SolarDay {
    let lw = RAD * -longitude;
    let phi = RAD * latitude;
    let d = days_since_j2000(date.and_time(NaiveTime::MIN).and_utc() + Duration::hours(12));

    let n = (d - J0 - lw / (2.0 * PI)).round();
    let ds = approx_transit(0.0, lw, n);
    let m = solar_mean_anomaly(ds);
    let l = ecliptic_longitude(m);

    SolarDay {
        noon: solar_transit(ds, m, l),
        lw,
        phi,
        dec: declination(l, 0.0),
        n,
        m,
        l,
    }
}

fn approx_transit(ht: f64, lw: f64, n: f64) -> f64 {
    J0 + (ht + lw) / (2.0 * PI) + n
}

fn solar_transit(ds: f64, m: f64, l: f64) -> f64 {
    J2000 + ds + 0.0053 * m.sin() - 0.0069 * (2.0 * l).sin()
}

/// Solar noon (transit) on `date`.
#[must_use]
pub fn solar_noon(date: NaiveDate, latitude: f64, longitude: f64) -> Option<DateTime<Utc>> {
    from_julian_day(solar_day(date, latitude, longitude).noon)
}

/// Times at which the sun crosses the given horizon on `date`.
///
/// Both sides are `None` during polar day or night for that horizon.
#[must_use]
pub fn sun_rise_set(date: NaiveDate, latitude: f64, longitude: f64, horizon: SunHorizon) -> RiseSet {
    let day = solar_day(date, latitude, longitude);
    let h = RAD * horizon.degrees();

    let cos_w = (h.sin() - day.phi.sin() * day.dec.sin()) / (day.phi.cos() * day.dec.cos());
    if !(-1.0..=1.0).contains(&cos_w) {
        return RiseSet::default();
    }

    let set = solar_transit(approx_transit(cos_w.acos(), day.lw, day.n), day.m, day.l);
    let rise = day.noon - (set - day.noon);

    RiseSet {
        rise: from_julian_day(rise),
        set: from_julian_day(set),
    }
}

/// Moon position and distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoonPosition {
    /// Degrees clockwise from north.
    pub azimuth: f64,
    /// Degrees above the horizon, refraction included.
    pub altitude: f64,
    /// Earth-Moon distance in km.
    pub distance_km: f64,
}

/// Position of the moon.
#[must_use]
pub fn moon_position(instant: DateTime<Utc>, latitude: f64, longitude: f64) -> MoonPosition {
    let lw = RAD * -longitude;
    let phi = RAD * latitude;
    let d = days_since_j2000(instant);
    let c = moon_coords(d);
    let h = sidereal_time(d, lw) - c.ra;
    let alt = altitude(h, phi, c.dec);

    MoonPosition {
        azimuth: to_north_azimuth(azimuth(h, phi, c.dec)),
        altitude: (alt + astro_refraction(alt)) / RAD,
        distance_km: c.distance_km,
    }
}

/// Illuminated part of the moon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoonIllumination {
    /// Illuminated fraction, 0 to 1.
    pub fraction: f64,
    /// Position in the cycle: 0 new, 0.25 first quarter, 0.5 full, 0.75 last quarter.
    pub phase: f64,
    /// Midpoint angle of the bright limb, negative while waxing.
    pub angle: f64,
}

/// Illumination of the moon at an instant.
#[must_use]
pub fn moon_illumination(instant: DateTime<Utc>) -> MoonIllumination {
    let d = days_since_j2000(instant);
    let s = sun_coords(d);
    let m = moon_coords(d);

    let phi = (s.dec.sin() * m.dec.sin() + s.dec.cos() * m.dec.cos() * (s.ra - m.ra).cos()).acos();
    let inc = (SUN_DISTANCE_KM * phi.sin()).atan2(m.distance_km - SUN_DISTANCE_KM * phi.cos());
    let angle = (s.dec.cos() * (s.ra - m.ra).sin())
        .atan2(s.dec.sin() * m.dec.cos() - s.dec.cos() * m.dec.sin() * (s.ra - m.ra).cos());
    let sign = if angle < 0.0 { -1.0 } else { 1.0 };

    MoonIllumination {
        fraction: (1.0 + inc.cos()) / 2.0,
        phase: 0.5 + 0.5 * inc * sign / PI,
        angle,
    }
}

/// Moonrise and moonset during the UTC day of `date`.
#[must_use]
pub fn moon_rise_set(date: NaiveDate, latitude: f64, longitude: f64) -> RiseSet {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    let hc = 0.133 * RAD;
    let alt = |hours: u32| {
        moon_position(start + Duration::hours(i64::from(hours)), latitude, longitude).altitude * RAD
            - hc
    };

    let mut rise: Option<f64> = None;
    let mut set: Option<f64> = None;
    let mut h0 = alt(0);

    // Fit a parabola through each two-hour window and look for horizon crossings
    for i in (1..=23).step_by(2) {
        let h1 = alt(i);
        let h2 = alt(i + 1);
        let hour = f64::from(i);

        let a = (h0 + h2) / 2.0 - h1;
        let b = (h2 - h0) / 2.0;
        let xe = -b / (2.0 * a);
        let ye = (a * xe + b) * xe + h1;
        let disc = b * b - 4.0 * a * h1;

        let mut roots = 0;
        let (mut x1, mut x2) = (0.0, 0.0);
        if disc >= 0.0 {
            let dx = disc.sqrt() / (a.abs() * 2.0);
            x1 = xe - dx;
            x2 = xe + dx;
            if x1.abs() <= 1.0 {
                roots += 1;
            }
            if x2.abs() <= 1.0 {
                roots += 1;
            }
            if x1 < -1.0 {
                x1 = x2;
            }
        }

        match roots {
            1 if h0 < 0.0 => rise = Some(hour + x1),
            1 => set = Some(hour + x1),
            2 => {
                rise = Some(hour + if ye < 0.0 { x2 } else { x1 });
                set = Some(hour + if ye < 0.0 { x1 } else { x2 });
            }
            _ => {}
        }

        if rise.is_some() && set.is_some() {
            break;
        }
        h0 = h2;
    }

    let at = |hours: f64| from_julian_day(julian_day(start) + hours / 24.0);
    RiseSet {
        rise: rise.and_then(at),
        set: set.and_then(at),
    }
}

/// Days since the last mean new moon, to one decimal.
///
/// Counted from the new moon of 2000-01-06.
#[must_use]
#[allow(clippy::cast_precision_loss)] // day counts are far below 2^52
pub fn moon_age(date: NaiveDate) -> f64 {
    let reference = NaiveDate::from_ymd_opt(2000, 1, 6).unwrap_or(NaiveDate::MIN);
    let days = (date - reference).num_days() as f64;
    let age = days.rem_euclid(29.530_588);
    (age * 10.0).round() / 10.0
}

/// Named lunar phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoonPhase {
    /// Less than 2% lit.
    NewMoon,
    /// Waxing, under 35% lit.
    WaxingCrescent,
    /// Waxing, around half lit.
    FirstQuarter,
    /// Waxing, over 65% lit.
    WaxingGibbous,
    /// More than 98% lit.
    FullMoon,
    /// Waning, over 65% lit.
    WaningGibbous,
    /// Waning, around half lit.
    LastQuarter,
    /// Waning, under 35% lit.
    WaningCrescent,
    /// Not computable.
    Unknown,
}

impl MoonPhase {
    /// Classifies an illumination by lit fraction and cycle direction.
    #[must_use]
    pub fn from_illumination(illumination: &MoonIllumination) -> Self {
        let fraction = illumination.fraction;
        if !fraction.is_finite() {
            return Self::Unknown;
        }
        let waxing = illumination.phase < 0.5;

        if fraction < 0.02 {
            Self::NewMoon
        } else if fraction < 0.35 {
            if waxing {
                Self::WaxingCrescent
            } else {
                Self::WaningCrescent
            }
        } else if fraction < 0.65 {
            if waxing {
                Self::FirstQuarter
            } else {
                Self::LastQuarter
            }
        } else if fraction < 0.98 {
            if waxing {
                Self::WaxingGibbous
            } else {
                Self::WaningGibbous
            }
        } else {
            Self::FullMoon
        }
    }

    /// English display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NewMoon => "New Moon",
            Self::WaxingCrescent => "Waxing Crescent",
            Self::FirstQuarter => "First Quarter",
            Self::WaxingGibbous => "Waxing Gibbous",
            Self::FullMoon => "Full Moon",
            Self::WaningGibbous => "Waning Gibbous",
            Self::LastQuarter => "Last Quarter",
            Self::WaningCrescent => "Waning Crescent",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for MoonPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ==================== Calendar support (Meeus) ====================

/// Apparent geocentric longitude of the sun in degrees, for a Julian day (UT).
#[must_use]
pub fn solar_longitude(jd: f64) -> f64 {
    let t = (jd + DELTA_T_DAYS - J2000) / 36_525.0;
    let l0 = 280.466_46 + 36_000.769_83 * t + 0.000_303_2 * t * t;
    let m = RAD * (357.529_11 + 35_999.050_29 * t - 0.000_153_7 * t * t);
    let c = (1.914_602 - 0.004_817 * t - 0.000_014 * t * t) * m.sin()
        + (0.019_993 - 0.000_101 * t) * (2.0 * m).sin()
        + 0.000_289 * (3.0 * m).sin();
    let omega = RAD * (125.04 - 1_934.136 * t);
    (l0 + c - 0.005_69 - 0.004_78 * omega.sin()).rem_euclid(360.0)
}

/// Julian day (UT) of the new moon with lunation number `k` (k = 0 at 2000-01-06).
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn new_moon(k: f64) -> f64 {
    let t = k / 1_236.85;
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;

    let jde = 2_451_550.097_66 + MEAN_SYNODIC_MONTH * k + 0.000_154_37 * t2 - 0.000_000_150 * t3
        + 0.000_000_000_73 * t4;
    let e = 1.0 - 0.002_516 * t - 0.000_007_4 * t2;
    let m = RAD * (2.5534 + 29.105_356_70 * k - 0.000_001_4 * t2 - 0.000_000_11 * t3);
    let mp = RAD
        * (201.5643 + 385.816_935_28 * k + 0.010_758_2 * t2 + 0.000_012_38 * t3
            - 0.000_000_058 * t4);
    let f = RAD
        * (160.7108 + 390.670_502_84 * k - 0.001_611_8 * t2 - 0.000_002_27 * t3
            + 0.000_000_011 * t4);
    let omega = RAD * (124.7746 - 1.563_755_88 * k + 0.002_067_2 * t2 + 0.000_002_15 * t3);

    let terms = [
        (-0.407_20, mp),
        (0.172_41 * e, m),
        (0.016_08, 2.0 * mp),
        (0.010_39, 2.0 * f),
        (0.007_39 * e, mp - m),
        (-0.005_14 * e, mp + m),
        (0.002_08 * e * e, 2.0 * m),
        (-0.001_11, mp - 2.0 * f),
        (-0.000_57, mp + 2.0 * f),
        (0.000_56 * e, 2.0 * mp + m),
        (-0.000_42, 3.0 * mp),
        (0.000_42 * e, m + 2.0 * f),
        (0.000_38 * e, m - 2.0 * f),
        (-0.000_24 * e, 2.0 * mp - m),
        (-0.000_17, omega),
        (-0.000_07, mp + 2.0 * m),
        (0.000_04, 2.0 * mp - 2.0 * f),
        (0.000_04, 3.0 * m),
        (0.000_03, mp + m - 2.0 * f),
        (0.000_03, 2.0 * mp + 2.0 * f),
        (-0.000_03, mp + m + 2.0 * f),
        (0.000_03, mp - m + 2.0 * f),
        (-0.000_02, mp - m - 2.0 * f),
        (-0.000_02, 3.0 * mp + m),
        (0.000_02, 4.0 * mp),
    ];
    let periodic: f64 = terms.iter().map(|(coef, arg)| coef * arg.sin()).sum();

    let planetary = [
        (0.000_325, 299.77 + 0.107_408 * k - 0.009_173 * t2),
        (0.000_165, 251.88 + 0.016_321 * k),
        (0.000_164, 251.83 + 26.651_886 * k),
        (0.000_126, 349.42 + 36.412_478 * k),
        (0.000_110, 84.66 + 18.206_239 * k),
        (0.000_062, 141.74 + 53.303_771 * k),
        (0.000_060, 207.14 + 2.453_732 * k),
        (0.000_056, 154.84 + 7.306_860 * k),
        (0.000_047, 34.52 + 27.261_239 * k),
        (0.000_042, 207.19 + 0.121_824 * k),
        (0.000_040, 291.34 + 1.844_379 * k),
        (0.000_037, 161.72 + 24.198_154 * k),
        (0.000_035, 239.56 + 25.513_099 * k),
        (0.000_023, 331.55 + 3.592_518 * k),
    ];
    let additional: f64 = planetary
        .iter()
        .map(|(coef, arg)| coef * (RAD * arg).sin())
        .sum();

    jde + periodic + additional - DELTA_T_DAYS
}

fn lunation_near(jd: f64) -> f64 {
    ((jd - 2_451_550.097_66) / MEAN_SYNODIC_MONTH).round()
}

/// The first new moon at or after `jd` (UT).
#[must_use]
pub fn new_moon_at_or_after(jd: f64) -> f64 {
    let mut k = lunation_near(jd) - 1.0;
    while new_moon(k) < jd {
        k += 1.0;
    }
    new_moon(k)
}

/// The last new moon strictly before `jd` (UT).
#[must_use]
pub fn new_moon_before(jd: f64) -> f64 {
    let mut k = lunation_near(jd) + 1.0;
    while new_moon(k) >= jd {
        k -= 1.0;
    }
    new_moon(k)
}
