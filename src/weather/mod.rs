//! Irradiance input: the timestamped POA / cell-temperature series the
//! simulation consumes, its validation, and the sources that produce it.

use chrono::{DateTime, Datelike, FixedOffset};

use crate::config::{ConfigError, PvConfig, ScenarioConfig, SiteConfig, WeatherSource};
use crate::devices::pv;
use crate::error::{DataQualityError, Result, SimError};
use crate::sim::types::StepInput;

/// CSV file source.
pub mod csv_file;
/// Solar geometry helpers.
pub mod solar;
/// Seeded one-year generator.
pub mod synthetic;

pub use csv_file::CsvIrradiance;
pub use synthetic::SyntheticIrradiance;

/// One sample of the irradiance series.
#[derive(Debug, Clone, PartialEq)]
pub struct IrradiancePoint {
    /// Start of the interval, timezone aware.
    pub timestamp: DateTime<FixedOffset>,
    /// Plane-of-array global irradiance (W/m²).
    pub poa_global_w_m2: f64,
    /// PV cell temperature (°C).
    pub temp_cell_c: f64,
    /// Seconds until the next sunrise; zero while the sun is up.
    pub seconds_to_sunrise: f64,
}

/// Ordered, regularly spaced irradiance samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IrradianceSeries {
    points: Vec<IrradiancePoint>,
}

impl IrradianceSeries {
    pub fn new(points: Vec<IrradiancePoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[IrradiancePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Checks the series is usable before any step runs.
    ///
    /// # Errors
    ///
    /// - `EmptySeries` if there are no points
    /// - `NonFiniteValue` for NaN or infinite samples
    /// - `IrregularSpacing` if any consecutive pair is not exactly
    ///   `interval_minutes` apart
    pub fn validate(&self, interval_minutes: u32) -> Result<(), DataQualityError> {
        if self.points.is_empty() {
            return Err(DataQualityError::EmptySeries);
        }
        for (row, p) in self.points.iter().enumerate() {
            let checks = [
                ("poa_global_w_m2", p.poa_global_w_m2),
                ("temp_cell_c", p.temp_cell_c),
                ("seconds_to_sunrise", p.seconds_to_sunrise),
            ];
            if let Some((column, _)) = checks.iter().find(|(_, v)| !v.is_finite()) {
                return Err(DataQualityError::NonFiniteValue {
                    row,
                    column: *column,
                });
            }
        }
        let expected_seconds = i64::from(interval_minutes) * 60;
        for (i, pair) in self.points.windows(2).enumerate() {
            let actual_seconds = (pair[1].timestamp - pair[0].timestamp).num_seconds();
            if actual_seconds != expected_seconds {
                return Err(DataQualityError::IrregularSpacing {
                    index: i + 1,
                    expected_minutes: interval_minutes,
                    actual_seconds,
                });
            }
        }
        Ok(())
    }

    /// Keeps only the points whose local calendar year is `year`.
    ///
    /// # Errors
    ///
    /// Returns `YearNotPresent` when nothing remains.
    pub fn restrict_to_year(&self, year: i32) -> Result<Self, DataQualityError> {
        let points: Vec<_> = self
            .points
            .iter()
            .filter(|p| p.timestamp.year() == year)
            .cloned()
            .collect();
        if points.is_empty() {
            return Err(DataQualityError::YearNotPresent { year });
        }
        Ok(Self { points })
    }

    /// Engine inputs for this series with PV bus power from `pv_config`.
    pub fn step_inputs(&self, pv_config: &PvConfig) -> Vec<StepInput> {
        self.points
            .iter()
            .enumerate()
            .map(|(timestep, p)| StepInput {
                timestep,
                timestamp: p.timestamp,
                pv_bus_power_w: pv::dc_bus_power_w(p.poa_global_w_m2, p.temp_cell_c, pv_config),
                seconds_to_sunrise: p.seconds_to_sunrise,
            })
            .collect()
    }
}

/// Produces the POA / cell-temperature series for a site and array.
///
/// This is the seam for a full solar-geometry library; the crate ships a
/// CSV reader and a synthetic generator.
pub trait IrradianceService {
    fn irradiance(&self, site: &SiteConfig, pv: &PvConfig) -> Result<IrradianceSeries>;
}

/// Builds the source selected by `[weather]` and returns its series.
///
/// # Errors
///
/// Propagates I/O, CSV and data-quality failures from the source.
pub fn load(config: &ScenarioConfig) -> Result<IrradianceSeries> {
    let w = &config.weather;
    match w.source {
        WeatherSource::Synthetic => {
            SyntheticIrradiance::new(w.year, w.interval_minutes, w.seed).irradiance(&config.site, &config.pv)
        }
        WeatherSource::Csv => {
            let path = w.path.clone().ok_or_else(|| {
                SimError::Config(vec![ConfigError::new(
                    "weather.path",
                    "required when weather.source = \"csv\"",
                )])
            })?;
            CsvIrradiance::new(path).irradiance(&config.site, &config.pv)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn series(n: usize, spacing_min: i64) -> IrradianceSeries {
        let start = FixedOffset::west_opt(6 * 3600)
            .unwrap()
            .with_ymd_and_hms(2021, 12, 31, 22, 0, 0)
            .unwrap();
        IrradianceSeries::new(
            (0..n)
                .map(|i| IrradiancePoint {
                    timestamp: start + Duration::minutes(spacing_min * i as i64),
                    poa_global_w_m2: 100.0 * i as f64,
                    temp_cell_c: 20.0,
                    seconds_to_sunrise: 0.0,
                })
                .collect(),
        )
    }

    #[test]
    fn regular_series_validates() {
        assert_eq!(series(6, 30).validate(30), Ok(()));
    }

    #[test]
    fn empty_series_rejected() {
        assert_eq!(IrradianceSeries::default().validate(30), Err(DataQualityError::EmptySeries));
    }

    #[test]
    fn irregular_spacing_rejected() {
        let mut s = series(4, 30);
        s.points[2].timestamp += Duration::minutes(5);
        assert_eq!(
            s.validate(30),
            Err(DataQualityError::IrregularSpacing {
                index: 2,
                expected_minutes: 30,
                actual_seconds: 2100,
            })
        );
        assert!(series(3, 60).validate(30).is_err());
    }

    #[test]
    fn non_finite_rejected() {
        let mut s = series(3, 30);
        s.points[1].temp_cell_c = f64::NAN;
        assert_eq!(
            s.validate(30),
            Err(DataQualityError::NonFiniteValue {
                row: 1,
                column: "temp_cell_c",
            })
        );
    }

    #[test]
    fn restrict_to_year_uses_local_calendar() {
        // 22:00 local on Dec 31 through 00:30 Jan 1: 4 points in 2021, 2 in 2022.
        let s = series(6, 30);
        assert_eq!(s.restrict_to_year(2021).map(|s| s.len()), Ok(4));
        assert_eq!(s.restrict_to_year(2022).map(|s| s.len()), Ok(2));
        assert_eq!(
            s.restrict_to_year(2019),
            Err(DataQualityError::YearNotPresent { year: 2019 })
        );
    }

    #[test]
    fn step_inputs_carry_pv_power() {
        let s = series(3, 30);
        let inputs = s.step_inputs(&PvConfig::default());
        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs[0].pv_bus_power_w, 0.0);
        assert!(inputs[2].pv_bus_power_w > inputs[1].pv_bus_power_w);
        assert_eq!(inputs[2].timestep, 2);
    }
}
