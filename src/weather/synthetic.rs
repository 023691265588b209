//! Seeded synthetic irradiance year with temporally correlated clouds.

use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Timelike};
use rand::{SeedableRng, rngs::StdRng};
use tracing::debug;

use crate::config::{ConfigError, PvConfig, SiteConfig};
use crate::devices::types::gaussian_noise;
use crate::error::{Result, SimError};

use super::{IrradiancePoint, IrradianceSeries, IrradianceService, solar};

/// Minimum cloud multiplier (heavy overcast).
const MULTIPLIER_MIN: f64 = 0.2;
/// Maximum cloud multiplier (enhanced irradiance from cloud edges).
const MULTIPLIER_MAX: f64 = 1.2;
/// Long-run mean of the cloud multiplier.
const MULTIPLIER_MEAN: f64 = 0.8;
/// AR(1) persistence per step.
const CLOUD_ALPHA: f64 = 0.9;
/// Innovation noise of the AR(1) process.
const CLOUD_NOISE_STD: f64 = 1.0;
/// Cell heating per unit POA (°C per W/m²), NOCT-style.
const CELL_HEATING_C_PER_W_M2: f64 = 25.0 / 800.0;
const AIR_TEMP_NOISE_STD: f64 = 1.0;

/// One calendar year of clear-sky POA scaled by an AR(1) cloud multiplier.
///
/// The multiplier evolves as:
/// ```text
/// m(t) = alpha * m(t-1) + (1 - alpha) * (mean + epsilon(t))
/// ```
/// clamped to \[0.2, 1.2\], advancing every step including night so the
/// same seed always yields the same year.
///
/// # Examples
///
/// ```
/// use pv_gpu_sim::config::{PvConfig, SiteConfig};
/// use pv_gpu_sim::weather::{IrradianceService, SyntheticIrradiance};
///
/// let series = SyntheticIrradiance::new(2021, 30, 42)
///     .irradiance(&SiteConfig::default(), &PvConfig::default())
///     .unwrap();
/// assert_eq!(series.len(), 17_520);
/// ```
#[derive(Debug, Clone)]
pub struct SyntheticIrradiance {
    pub year: i32,
    pub interval_minutes: u32,
    pub seed: u64,
}

impl SyntheticIrradiance {
    pub fn new(year: i32, interval_minutes: u32, seed: u64) -> Self {
        Self {
            year,
            interval_minutes,
            seed,
        }
    }
}

impl IrradianceService for SyntheticIrradiance {
    fn irradiance(&self, site: &SiteConfig, pv: &PvConfig) -> Result<IrradianceSeries> {
        let tz = site.utc_offset().ok_or_else(|| {
            SimError::Config(vec![ConfigError::new(
                "site.timezone",
                format!("cannot parse \"{}\"", site.timezone),
            )])
        })?;
        if self.interval_minutes == 0 {
            return Err(SimError::Config(vec![ConfigError::new(
                "weather.interval_minutes",
                "must be > 0",
            )]));
        }
        let start = year_start(tz, self.year)?;
        let step = Duration::minutes(i64::from(self.interval_minutes));

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut multiplier = 1.0;
        let mut points = Vec::new();
        let mut t = start;
        while t.year() == self.year {
            let epsilon = gaussian_noise(&mut rng, CLOUD_NOISE_STD);
            multiplier = (CLOUD_ALPHA * multiplier + (1.0 - CLOUD_ALPHA) * (MULTIPLIER_MEAN + epsilon))
                .clamp(MULTIPLIER_MIN, MULTIPLIER_MAX);

            let pos = solar::sun_position(&t, site);
            let poa = solar::clear_sky_poa(&pos, site, pv) * multiplier;
            let air = air_temperature(&t) + gaussian_noise(&mut rng, AIR_TEMP_NOISE_STD);

            points.push(IrradiancePoint {
                timestamp: t,
                poa_global_w_m2: poa,
                temp_cell_c: air + poa * CELL_HEATING_C_PER_W_M2,
                seconds_to_sunrise: solar::seconds_to_sunrise(&t, site),
            });
            t += step;
        }
        debug!(
            year = self.year,
            seed = self.seed,
            points = points.len(),
            "generated synthetic irradiance"
        );
        Ok(IrradianceSeries::new(points))
    }
}

fn year_start(tz: FixedOffset, year: i32) -> Result<DateTime<FixedOffset>> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|naive| tz.from_local_datetime(&naive).single())
        .ok_or_else(|| {
            SimError::Config(vec![ConfigError::new(
                "weather.year",
                format!("{year} is out of range"),
            )])
        })
}

/// Seasonal plus diurnal ambient temperature (°C), warmest mid-afternoon in July.
fn air_temperature(t: &DateTime<FixedOffset>) -> f64 {
    let doy = f64::from(t.ordinal());
    let hour = f64::from(t.hour()) + f64::from(t.minute()) / 60.0;
    let seasonal = 15.0 + 15.0 * (2.0 * PI * (doy - 80.0) / 365.0).sin();
    let diurnal = 5.0 * (2.0 * PI * (hour - 9.0) / 24.0).sin();
    seasonal + diurnal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(year: i32, seed: u64) -> IrradianceSeries {
        SyntheticIrradiance::new(year, 30, seed)
            .irradiance(&SiteConfig::default(), &PvConfig::default())
            .unwrap()
    }

    #[test]
    fn full_year_has_expected_length() {
        assert_eq!(generate(2021, 42).len(), 17_520);
        assert_eq!(generate(2020, 42).len(), 17_568);
    }

    #[test]
    fn series_is_regular_and_local() {
        let s = generate(2021, 1);
        assert!(s.validate(30).is_ok());
        let first = &s.points()[0];
        assert_eq!(first.timestamp.offset().local_minus_utc(), -6 * 3600);
        assert_eq!((first.timestamp.month(), first.timestamp.day(), first.timestamp.hour()), (1, 1, 0));
    }

    #[test]
    fn same_seed_same_year() {
        assert_eq!(generate(2021, 7), generate(2021, 7));
        assert_ne!(generate(2021, 7), generate(2021, 8));
    }

    #[test]
    fn dark_at_night_bright_at_noon() {
        let s = generate(2021, 42);
        for p in s.points() {
            assert!(p.poa_global_w_m2 >= 0.0);
            if p.seconds_to_sunrise > 0.0 {
                assert_eq!(p.poa_global_w_m2, 0.0, "light before sunrise at {}", p.timestamp);
            }
        }
        let peak = s.points().iter().map(|p| p.poa_global_w_m2).fold(0.0, f64::max);
        assert!(peak > 600.0, "peak POA {peak}");
    }

    #[test]
    fn summer_nights_are_shorter() {
        let s = generate(2021, 42);
        let at = |m: u32, d: u32| {
            s.points()
                .iter()
                .find(|p| (p.timestamp.month(), p.timestamp.day(), p.timestamp.hour()) == (m, d, 0))
                .map(|p| p.seconds_to_sunrise)
                .unwrap()
        };
        assert!(at(6, 21) < at(12, 21));
    }

    #[test]
    fn bad_timezone_is_config_error() {
        let site = SiteConfig {
            timezone: "Mars/Olympus".into(),
            ..SiteConfig::default()
        };
        let err = SyntheticIrradiance::new(2021, 30, 0)
            .irradiance(&site, &PvConfig::default())
            .unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }
}
