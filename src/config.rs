//! TOML-based scenario configuration, presets, and eager validation.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::SimError;

/// The only timestep the models are validated for.
pub const SUPPORTED_TIMESTEP_MINUTES: u32 = 30;

/// Top-level scenario configuration parsed from TOML.
///
/// All sections have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Site location.
    #[serde(default)]
    pub site: SiteConfig,
    /// Irradiance source selection.
    #[serde(default)]
    pub weather: WeatherConfig,
    /// PV array geometry and DC losses.
    #[serde(default)]
    pub pv: PvConfig,
    /// Battery pack parameters.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// GPU compute load parameters.
    #[serde(default)]
    pub gpu: GpuConfig,
    /// Power governor parameters.
    #[serde(default)]
    pub governor: GovernorConfig,
    /// Simulation timing.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// PV/battery sizing grid.
    #[serde(default)]
    pub sweep: SweepConfig,
}

/// Site location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Human-readable site label.
    pub name: String,
    /// Latitude in degrees (north positive).
    pub latitude: f64,
    /// Longitude in degrees (east positive).
    pub longitude: f64,
    /// Fixed UTC offset: `"UTC"`, `"+HH:MM"` or `"-HH:MM"`.
    pub timezone: String,
    /// Altitude above sea level (m).
    pub altitude_m: Option<f64>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Central Texas".to_string(),
            latitude: 31.9686,
            longitude: -99.9018,
            timezone: "-06:00".to_string(),
            altitude_m: None,
        }
    }
}

impl SiteConfig {
    /// Parses [`SiteConfig::timezone`], returning `None` when malformed.
    pub fn utc_offset(&self) -> Option<FixedOffset> {
        parse_utc_offset(&self.timezone)
    }
}

/// Where the irradiance series comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherSource {
    /// Seeded one-year generator.
    Synthetic,
    /// Pre-computed POA/cell-temperature CSV.
    Csv,
}

/// Irradiance source selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeatherConfig {
    pub source: WeatherSource,
    /// CSV path, required when `source = "csv"`.
    pub path: Option<PathBuf>,
    /// Calendar year generated by the synthetic source.
    pub year: i32,
    /// Sample interval of the series (min).
    pub interval_minutes: u32,
    /// Seed for the synthetic cloud process.
    pub seed: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            source: WeatherSource::Synthetic,
            path: None,
            year: 2021,
            interval_minutes: SUPPORTED_TIMESTEP_MINUTES,
            seed: 42,
        }
    }
}

/// DC electrical model of the array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DcModel {
    Pvwatts,
}

/// PV array geometry, size, and DC-side losses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PvConfig {
    /// Panel tilt from horizontal (degrees).
    pub surface_tilt_deg: f64,
    /// Panel azimuth, 180 = south (degrees).
    pub surface_azimuth_deg: f64,
    /// DC nameplate rating (kW).
    pub dc_nameplate_kw: f64,
    pub dc_model: DcModel,
    /// Power temperature coefficient (1/°C).
    pub gamma_pdc_per_c: f64,
    /// MPPT tracking efficiency (0..1].
    pub mppt_efficiency: f64,
    /// DC wiring efficiency (0..1].
    pub dc_wiring_efficiency: f64,
}

impl Default for PvConfig {
    fn default() -> Self {
        Self {
            surface_tilt_deg: 20.0,
            surface_azimuth_deg: 180.0,
            dc_nameplate_kw: 1.0,
            dc_model: DcModel::Pvwatts,
            gamma_pdc_per_c: -0.003,
            mppt_efficiency: 0.99,
            dc_wiring_efficiency: 0.99,
        }
    }
}

/// Battery pack parameters.
///
/// The OCV curve is given as two parallel breakpoint lists; `ocv_soc` must be
/// strictly increasing and the same length as `ocv_v`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Usable energy capacity (kWh). Zero disables the battery.
    pub capacity_kwh: f64,
    /// State of charge at the start of every run.
    pub soc_init: f64,
    pub soc_min: f64,
    pub soc_max: f64,
    /// OCV breakpoint SOCs.
    pub ocv_soc: Vec<f64>,
    /// OCV breakpoint voltages (V).
    pub ocv_v: Vec<f64>,
    /// Lumped internal resistance (ohm).
    pub r_internal_ohm: f64,
    /// Charge current limit (A).
    pub i_charge_max_a: f64,
    /// Discharge current limit (A).
    pub i_discharge_max_a: f64,
    /// Bus to cell converter efficiency (0..1].
    pub charge_efficiency: f64,
    /// Cell to bus converter efficiency (0..1].
    pub discharge_efficiency: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 10.0,
            soc_init: 0.5,
            soc_min: 0.05,
            soc_max: 0.95,
            ocv_soc: vec![0.0, 0.2, 0.5, 0.8, 1.0],
            ocv_v: vec![3.0, 3.4, 3.65, 3.9, 4.1],
            r_internal_ohm: 0.02,
            i_charge_max_a: 200.0,
            i_discharge_max_a: 200.0,
            charge_efficiency: 0.97,
            discharge_efficiency: 0.97,
        }
    }
}

impl BatteryConfig {
    /// Capacity in watt-hours.
    pub fn capacity_wh(&self) -> f64 {
        self.capacity_kwh * 1000.0
    }
}

/// GPU compute load parameters (per unit unless noted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpuConfig {
    /// Number of identical GPUs.
    pub n_gpus: u32,
    /// Idle draw per GPU (W).
    pub p_idle_w: f64,
    /// Full-load draw per GPU (W).
    pub p_max_w: f64,
    /// Exponent of the utilization to power curve.
    pub power_exponent: f64,
    /// Peak throughput per GPU (FLOP/s).
    pub flops_peak_per_gpu: f64,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            n_gpus: 1,
            p_idle_w: 80.0,
            p_max_w: 700.0,
            power_exponent: 3.0,
            flops_peak_per_gpu: 1e15,
        }
    }
}

/// No-forecast governor parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GovernorConfig {
    /// When false the GPU always requests full power.
    pub enabled: bool,
    /// SOC kept in reserve at sunrise.
    pub reserve_soc: f64,
    /// Multiplier applied to the sustainable power.
    pub safety_factor: f64,
    /// Maximum change of the request between steps (W). Zero disables.
    pub ramp_limit_w_per_step: f64,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reserve_soc: 0.07,
            safety_factor: 0.95,
            ramp_limit_w_per_step: 200.0,
        }
    }
}

/// How PV, battery and GPU are electrically coupled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouplingMode {
    /// Single DC bus behind the PV MPPT converter.
    MpptBus,
}

/// Simulation timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Timestep length (min). Only 30 is accepted.
    pub timestep_minutes: u32,
    pub coupling_mode: CouplingMode,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            timestep_minutes: SUPPORTED_TIMESTEP_MINUTES,
            coupling_mode: CouplingMode::MpptBus,
        }
    }
}

impl SimulationConfig {
    /// Timestep in hours.
    pub fn dt_hours(&self) -> f64 {
        f64::from(self.timestep_minutes) / 60.0
    }

    /// Timestep in seconds.
    pub fn dt_seconds(&self) -> f64 {
        f64::from(self.timestep_minutes) * 60.0
    }
}

/// PV/battery sizing grid for [`crate::sweep`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    /// PV nameplate sizes (kWdc).
    pub pv_kw_list: Vec<f64>,
    /// Battery capacities (kWh).
    pub batt_kwh_list: Vec<f64>,
    /// Representative year each cell is restricted to.
    pub year: i32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            pv_kw_list: vec![0.0, 0.5, 1.0, 2.0, 3.0, 4.0, 5.0],
            batt_kwh_list: vec![0.0, 2.0, 5.0, 10.0, 20.0],
            year: 2021,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"battery.soc_min"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: one 700 W GPU, 1 kW of PV, 10 kWh of storage.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the baseline with the governor switched off (full throttle always).
    pub fn ungoverned() -> Self {
        Self {
            governor: GovernorConfig {
                enabled: false,
                ..GovernorConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns a two-GPU node with a larger array and battery.
    pub fn large_array() -> Self {
        Self {
            pv: PvConfig {
                dc_nameplate_kw: 5.0,
                ..PvConfig::default()
            },
            battery: BatteryConfig {
                capacity_kwh: 20.0,
                i_charge_max_a: 400.0,
                i_discharge_max_a: 400.0,
                ..BatteryConfig::default()
            },
            gpu: GpuConfig {
                n_gpus: 2,
                ..GpuConfig::default()
            },
            governor: GovernorConfig {
                ramp_limit_w_per_step: 400.0,
                ..GovernorConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "ungoverned", "large_array"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "ungoverned" => Ok(Self::ungoverned()),
            "large_array" => Ok(Self::large_array()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Consumes the config, returning it only if [`Self::validate`] finds nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] carrying every violated constraint.
    pub fn validated(self) -> Result<Self, SimError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(SimError::Config(errors))
        }
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut fail = |field: &str, message: String| errors.push(ConfigError::new(field, message));

        let site = &self.site;
        if !(-90.0..=90.0).contains(&site.latitude) {
            fail("site.latitude", "must be in [-90, 90]".into());
        }
        if !(-180.0..=180.0).contains(&site.longitude) {
            fail("site.longitude", "must be in [-180, 180]".into());
        }
        if site.utc_offset().is_none() {
            fail(
                "site.timezone",
                format!("must be \"UTC\" or \"+HH:MM\"/\"-HH:MM\", got \"{}\"", site.timezone),
            );
        }

        let s = &self.simulation;
        if s.timestep_minutes != SUPPORTED_TIMESTEP_MINUTES {
            fail(
                "simulation.timestep_minutes",
                format!("must be {SUPPORTED_TIMESTEP_MINUTES}, got {}", s.timestep_minutes),
            );
        }

        let w = &self.weather;
        if w.interval_minutes != s.timestep_minutes {
            fail(
                "weather.interval_minutes",
                "must equal simulation.timestep_minutes".into(),
            );
        }
        if w.source == WeatherSource::Csv && w.path.is_none() {
            fail("weather.path", "required when weather.source = \"csv\"".into());
        }

        let pv = &self.pv;
        if !is_non_negative(pv.dc_nameplate_kw) {
            fail("pv.dc_nameplate_kw", "must be >= 0".into());
        }
        if !pv.gamma_pdc_per_c.is_finite() {
            fail("pv.gamma_pdc_per_c", "must be finite".into());
        }
        if !(pv.surface_tilt_deg.is_finite() && pv.surface_azimuth_deg.is_finite()) {
            fail("pv.surface_tilt_deg", "tilt and azimuth must be finite".into());
        }
        if !is_efficiency(pv.mppt_efficiency) {
            fail("pv.mppt_efficiency", "must be in (0, 1]".into());
        }
        if !is_efficiency(pv.dc_wiring_efficiency) {
            fail("pv.dc_wiring_efficiency", "must be in (0, 1]".into());
        }

        let bat = &self.battery;
        if !is_non_negative(bat.capacity_kwh) {
            fail("battery.capacity_kwh", "must be >= 0".into());
        }
        if !(0.0 <= bat.soc_min && bat.soc_min < bat.soc_max && bat.soc_max <= 1.0) {
            fail(
                "battery.soc_min",
                "must satisfy 0 <= soc_min < soc_max <= 1".into(),
            );
        }
        if !(bat.soc_min <= bat.soc_init && bat.soc_init <= bat.soc_max) {
            fail(
                "battery.soc_init",
                "must be within [battery.soc_min, battery.soc_max]".into(),
            );
        }
        if bat.ocv_soc.len() != bat.ocv_v.len() {
            fail(
                "battery.ocv_v",
                format!(
                    "must have the same length as battery.ocv_soc ({} vs {})",
                    bat.ocv_v.len(),
                    bat.ocv_soc.len()
                ),
            );
        }
        if bat.ocv_soc.len() < 2 {
            fail("battery.ocv_soc", "needs at least two breakpoints".into());
        }
        if bat.ocv_soc.windows(2).any(|pair| !(pair[0] < pair[1])) {
            fail("battery.ocv_soc", "must be strictly increasing".into());
        }
        if bat.ocv_v.iter().any(|&v| !(v.is_finite() && v > 0.0)) {
            fail("battery.ocv_v", "voltages must be > 0".into());
        }
        if !is_non_negative(bat.r_internal_ohm) {
            fail("battery.r_internal_ohm", "must be >= 0".into());
        }
        if !is_non_negative(bat.i_charge_max_a) {
            fail("battery.i_charge_max_a", "must be >= 0".into());
        }
        if !is_non_negative(bat.i_discharge_max_a) {
            fail("battery.i_discharge_max_a", "must be >= 0".into());
        }
        if !is_efficiency(bat.charge_efficiency) {
            fail("battery.charge_efficiency", "must be in (0, 1]".into());
        }
        if !is_efficiency(bat.discharge_efficiency) {
            fail("battery.discharge_efficiency", "must be in (0, 1]".into());
        }

        let gpu = &self.gpu;
        if gpu.n_gpus == 0 {
            fail("gpu.n_gpus", "must be >= 1".into());
        }
        if !is_non_negative(gpu.p_idle_w) {
            fail("gpu.p_idle_w", "must be >= 0".into());
        }
        if !(gpu.p_max_w.is_finite() && gpu.p_max_w >= gpu.p_idle_w) {
            fail("gpu.p_max_w", "must be >= gpu.p_idle_w".into());
        }
        if !(gpu.power_exponent.is_finite() && gpu.power_exponent > 0.0) {
            fail("gpu.power_exponent", "must be > 0".into());
        }
        if !is_non_negative(gpu.flops_peak_per_gpu) {
            fail("gpu.flops_peak_per_gpu", "must be >= 0".into());
        }

        let gov = &self.governor;
        if !(0.0..=1.0).contains(&gov.reserve_soc) {
            fail("governor.reserve_soc", "must be in [0, 1]".into());
        }
        if !is_non_negative(gov.safety_factor) {
            fail("governor.safety_factor", "must be >= 0".into());
        }
        if !is_non_negative(gov.ramp_limit_w_per_step) {
            fail("governor.ramp_limit_w_per_step", "must be >= 0".into());
        }

        let sw = &self.sweep;
        for (field, list) in [
            ("sweep.pv_kw_list", &sw.pv_kw_list),
            ("sweep.batt_kwh_list", &sw.batt_kwh_list),
        ] {
            if list.is_empty() {
                fail(field, "must not be empty".into());
            }
            if list.iter().any(|&v| !is_non_negative(v)) {
                fail(field, "values must be finite and >= 0".into());
            }
        }

        errors
    }
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn is_efficiency(value: f64) -> bool {
    value > 0.0 && value <= 1.0
}

/// Parses `"UTC"`, `"Z"`, `"+HH:MM"` or `"-HH:MM"` into a fixed offset.
pub fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("utc") || s == "Z" {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn ungoverned_preset_disables_governor() {
        assert!(!ScenarioConfig::ungoverned().governor.enabled);
        assert!(ScenarioConfig::baseline().governor.enabled);
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[site]
name = "Tucson"
latitude = 32.2
longitude = -110.9
timezone = "-07:00"

[weather]
source = "csv"
path = "poa.csv"

[pv]
dc_nameplate_kw = 3.0

[battery]
capacity_kwh = 5.0
ocv_soc = [0.0, 0.5, 1.0]
ocv_v = [3.0, 3.6, 4.1]

[gpu]
n_gpus = 2

[governor]
enabled = false

[simulation]
timestep_minutes = 30
coupling_mode = "mppt_bus"

[sweep]
pv_kw_list = [1.0, 2.0]
batt_kwh_list = [0.0]
year = 2020
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.unwrap();
        assert_eq!(cfg.weather.source, WeatherSource::Csv);
        assert_eq!(cfg.pv.dc_nameplate_kw, 3.0);
        assert_eq!(cfg.battery.ocv_soc.len(), 3);
        assert_eq!(cfg.gpu.n_gpus, 2);
        assert!(!cfg.governor.enabled);
        assert_eq!(cfg.sweep.year, 2020);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[battery]
capacity_kwh = 10.0
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[gpu]
p_max_w = 400.0
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.gpu.p_max_w, 400.0);
        assert_eq!(cfg.gpu.p_idle_w, 80.0);
        assert_eq!(cfg.battery, BatteryConfig::default());
    }

    #[test]
    fn validation_rejects_unsupported_timestep() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.timestep_minutes = 15;
        cfg.weather.interval_minutes = 15;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "simulation.timestep_minutes"));
    }

    #[test]
    fn validation_rejects_non_monotonic_ocv() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.battery.ocv_soc = vec![0.0, 0.5, 0.5, 1.0];
        cfg.battery.ocv_v = vec![3.0, 3.5, 3.6, 4.1];
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "battery.ocv_soc"));
    }

    #[test]
    fn validation_rejects_mismatched_ocv_lengths() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.battery.ocv_v.pop();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "battery.ocv_v"));
    }

    #[test]
    fn validation_rejects_efficiency_out_of_range() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.battery.charge_efficiency = 0.0;
        cfg.battery.discharge_efficiency = 1.2;
        cfg.pv.mppt_efficiency = -0.5;
        let fields: Vec<_> = cfg.validate().into_iter().map(|e| e.field).collect();
        assert!(fields.contains(&"battery.charge_efficiency".to_string()));
        assert!(fields.contains(&"battery.discharge_efficiency".to_string()));
        assert!(fields.contains(&"pv.mppt_efficiency".to_string()));
    }

    #[test]
    fn validation_rejects_bad_soc_ordering() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.battery.soc_min = 0.9;
        cfg.battery.soc_max = 0.1;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "battery.soc_min"));
        assert!(errors.iter().any(|e| e.field == "battery.soc_init"));
    }

    #[test]
    fn validation_collects_every_error() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.gpu.n_gpus = 0;
        cfg.governor.reserve_soc = 2.0;
        cfg.sweep.pv_kw_list.clear();
        assert_eq!(cfg.validate().len(), 3);
    }

    #[test]
    fn validation_allows_zero_capacity_battery() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.battery.capacity_kwh = 0.0;
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validation_rejects_infinite_values() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.gpu.p_max_w = f64::INFINITY;
        cfg.battery.capacity_kwh = f64::INFINITY;
        cfg.battery.i_charge_max_a = f64::INFINITY;
        cfg.pv.dc_nameplate_kw = f64::INFINITY;
        cfg.governor.safety_factor = f64::INFINITY;
        cfg.pv.gamma_pdc_per_c = f64::NEG_INFINITY;
        let fields: Vec<_> = cfg.validate().into_iter().map(|e| e.field).collect();
        for field in [
            "gpu.p_max_w",
            "battery.capacity_kwh",
            "battery.i_charge_max_a",
            "pv.dc_nameplate_kw",
            "governor.safety_factor",
            "pv.gamma_pdc_per_c",
        ] {
            assert!(fields.contains(&field.to_string()), "{field} should be rejected: {fields:?}");
        }
    }

    #[test]
    fn infinite_toml_value_rejected() {
        let cfg = ScenarioConfig::from_toml_str("[gpu]\np_max_w = inf\n").unwrap();
        assert!(cfg.validate().iter().any(|e| e.field == "gpu.p_max_w"));
    }

    #[test]
    fn csv_source_requires_path() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.weather.source = WeatherSource::Csv;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "weather.path"));
    }

    #[test]
    fn validated_wraps_errors() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.gpu.power_exponent = 0.0;
        assert!(matches!(cfg.validated(), Err(SimError::Config(errs)) if errs.len() == 1));
    }

    #[test]
    fn parses_utc_offsets() {
        assert_eq!(parse_utc_offset("UTC").map(|o| o.local_minus_utc()), Some(0));
        assert_eq!(
            parse_utc_offset("-06:00").map(|o| o.local_minus_utc()),
            Some(-6 * 3600)
        );
        assert_eq!(
            parse_utc_offset("+05:30").map(|o| o.local_minus_utc()),
            Some(5 * 3600 + 30 * 60)
        );
        assert!(parse_utc_offset("America/Chicago").is_none());
        assert!(parse_utc_offset("+25:00").is_none());
    }

    #[test]
    fn dt_helpers() {
        let s = SimulationConfig::default();
        assert_eq!(s.dt_hours(), 0.5);
        assert_eq!(s.dt_seconds(), 1800.0);
    }
}
