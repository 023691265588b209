//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use chrono::{Duration, FixedOffset, TimeZone};
use pv_gpu_sim::config::{PvConfig, ScenarioConfig, SiteConfig};
use pv_gpu_sim::sim::types::TimestepRecord;
use pv_gpu_sim::weather::{IrradiancePoint, IrradianceSeries, IrradianceService, SyntheticIrradiance};

/// Baseline scenario (1 kW PV, 10 kWh battery, one 700 W GPU).
pub fn default_config() -> ScenarioConfig {
    ScenarioConfig::baseline()
}

/// Seeded synthetic 2021 at the default site, 30-minute steps.
pub fn synthetic_year(seed: u64) -> IrradianceSeries {
    SyntheticIrradiance::new(2021, 30, seed)
        .irradiance(&SiteConfig::default(), &PvConfig::default())
        .expect("synthetic year should generate")
}

/// `days` identical days: 900 W/m² from 06:00 to 18:00 local, dark otherwise.
pub fn square_days(days: i64) -> IrradianceSeries {
    let start = FixedOffset::west_opt(6 * 3600)
        .and_then(|tz| tz.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).single())
        .expect("valid start");
    IrradianceSeries::new(
        (0..days * 48)
            .map(|i| {
                let half_hour = i % 48;
                let day = (12..36).contains(&half_hour);
                let to_sunrise = (12 - half_hour).rem_euclid(48) as f64 * 1800.0;
                IrradiancePoint {
                    timestamp: start + Duration::minutes(30 * i),
                    poa_global_w_m2: if day { 900.0 } else { 0.0 },
                    temp_cell_c: if day { 40.0 } else { 15.0 },
                    seconds_to_sunrise: if day { 0.0 } else { to_sunrise },
                }
            })
            .collect(),
    )
}

/// Asserts that PV plus battery discharge equals GPU draw plus battery
/// charge plus curtailed PV, within `tol` watts, at every step.
pub fn assert_bus_balanced(records: &[TimestepRecord], tol: f64) {
    for r in records {
        let sources = r.pv_bus_power_w + (-r.battery_bus_power_w).max(0.0);
        let sinks = r.gpu_served_power_w + r.battery_bus_power_w.max(0.0) + r.pv_curtailed_power_w;
        assert!(
            (sources - sinks).abs() <= tol,
            "step {}: sources {sources} W vs sinks {sinks} W",
            r.timestep
        );
    }
}
