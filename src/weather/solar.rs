//! Approximate solar geometry: declination, hour angle, sunrise, clear-sky POA.
//!
//! Accurate to a few minutes, which is plenty at 30-minute resolution.
//! Everything is computed from UTC, so the offset a timestamp carries does not
//! change the answer.

use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDateTime, Timelike};

use crate::config::{PvConfig, SiteConfig};

const SOLAR_CONSTANT_W_M2: f64 = 1353.0;
const GROUND_ALBEDO: f64 = 0.2;
/// Days searched forward for a sunrise before giving up (polar night).
const MAX_SUNRISE_SEARCH_DAYS: u32 = 200;
/// Used when no sunrise is found within the search window.
const POLAR_NIGHT_FALLBACK_S: f64 = 12.0 * 3600.0;

/// Sun position at an instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunPosition {
    pub declination_rad: f64,
    /// Negative before solar noon.
    pub hour_angle_rad: f64,
    pub cos_zenith: f64,
}

impl SunPosition {
    pub fn is_up(&self) -> bool {
        self.cos_zenith > 0.0
    }
}

/// Cooper's approximation.
pub fn declination_rad(day_of_year: u32) -> f64 {
    (23.45_f64).to_radians() * (2.0 * PI * (284.0 + f64::from(day_of_year)) / 365.0).sin()
}

/// Equation of time (minutes), Spencer's short form.
pub fn equation_of_time_minutes(day_of_year: u32) -> f64 {
    let b = 2.0 * PI * (f64::from(day_of_year) - 81.0) / 364.0;
    9.87 * (2.0 * b).sin() - 7.53 * b.cos() - 1.5 * b.sin()
}

/// Apparent solar time at the site as a naive date-time (noon = sun on the meridian).
fn solar_time(t: &DateTime<FixedOffset>, longitude: f64) -> NaiveDateTime {
    let utc = t.naive_utc();
    let eot = equation_of_time_minutes(utc.ordinal());
    let offset_ms = ((longitude * 4.0 + eot) * 60_000.0).round() as i64;
    utc + Duration::milliseconds(offset_ms)
}

fn hours_since_midnight(t: &NaiveDateTime) -> f64 {
    f64::from(t.num_seconds_from_midnight()) / 3600.0
}

pub fn sun_position(t: &DateTime<FixedOffset>, site: &SiteConfig) -> SunPosition {
    let solar = solar_time(t, site.longitude);
    let decl = declination_rad(solar.ordinal());
    let omega = (15.0 * (hours_since_midnight(&solar) - 12.0)).to_radians();
    let lat = site.latitude.to_radians();
    let cos_zenith = lat.sin() * decl.sin() + lat.cos() * decl.cos() * omega.cos();
    SunPosition {
        declination_rad: decl,
        hour_angle_rad: omega,
        cos_zenith,
    }
}

/// Solar hour of sunrise for a latitude and declination.
///
/// `None` during polar night, `Some(0.0)` during polar day.
pub fn sunrise_solar_hour(latitude_rad: f64, declination_rad: f64) -> Option<f64> {
    let x = -latitude_rad.tan() * declination_rad.tan();
    if x >= 1.0 {
        return None;
    }
    if x <= -1.0 {
        return Some(0.0);
    }
    Some(12.0 - x.acos().to_degrees() / 15.0)
}

/// Seconds until the next sunrise; zero while the sun is up.
pub fn seconds_to_sunrise(t: &DateTime<FixedOffset>, site: &SiteConfig) -> f64 {
    if sun_position(t, site).is_up() {
        return 0.0;
    }
    let lat = site.latitude.to_radians();
    let solar = solar_time(t, site.longitude);
    let now_h = hours_since_midnight(&solar);
    let today = solar.date();

    match sunrise_solar_hour(lat, declination_rad(today.ordinal())) {
        Some(sr) if now_h < sr => return (sr - now_h) * 3600.0,
        _ => {}
    }
    let mut hours_ahead = 24.0 - now_h;
    let mut day = today;
    for _ in 0..MAX_SUNRISE_SEARCH_DAYS {
        let Some(next) = day.succ_opt() else {
            break;
        };
        day = next;
        if let Some(sr) = sunrise_solar_hour(lat, declination_rad(day.ordinal())) {
            return (hours_ahead + sr) * 3600.0;
        }
        hours_ahead += 24.0;
    }
    POLAR_NIGHT_FALLBACK_S
}

/// Clear-sky plane-of-array irradiance (W/m²) on the configured surface.
///
/// Meinel beam model with a fixed diffuse fraction and an isotropic sky.
pub fn clear_sky_poa(pos: &SunPosition, site: &SiteConfig, pv: &PvConfig) -> f64 {
    if !pos.is_up() {
        return 0.0;
    }
    let air_mass = 1.0 / pos.cos_zenith.max(0.01);
    let dni = SOLAR_CONSTANT_W_M2 * 0.7_f64.powf(air_mass.powf(0.678));
    let dhi = 0.1 * dni;
    let ghi = dni * pos.cos_zenith + dhi;

    let lat = site.latitude.to_radians();
    let beta = pv.surface_tilt_deg.to_radians();
    // Measured from south, west positive.
    let gamma = (pv.surface_azimuth_deg - 180.0).to_radians();
    let (d, w) = (pos.declination_rad, pos.hour_angle_rad);
    let cos_incidence = d.sin() * lat.sin() * beta.cos()
        - d.sin() * lat.cos() * beta.sin() * gamma.cos()
        + d.cos() * lat.cos() * beta.cos() * w.cos()
        + d.cos() * lat.sin() * beta.sin() * gamma.cos() * w.cos()
        + d.cos() * beta.sin() * gamma.sin() * w.sin();

    let beam = dni * cos_incidence.max(0.0);
    let sky = dhi * (1.0 + beta.cos()) / 2.0;
    let ground = ghi * GROUND_ALBEDO * (1.0 - beta.cos()) / 2.0;
    beam + sky + ground
}
