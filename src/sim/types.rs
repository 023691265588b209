//! Core simulation types: per-step inputs, carried state, and step records.

use std::fmt;

use chrono::{DateTime, FixedOffset};

use crate::config::BatteryConfig;
use crate::devices::BatteryState;

use super::governor::GovernorState;

/// External signals for one timestep, supplied by the irradiance layer.
#[derive(Debug, Clone, PartialEq)]
pub struct StepInput {
    /// Current simulation timestep index.
    pub timestep: usize,
    /// Start of the interval.
    pub timestamp: DateTime<FixedOffset>,
    /// PV power available on the DC bus (W, >= 0).
    pub pv_bus_power_w: f64,
    /// Seconds until the next sunrise; zero or negative while the sun is up.
    pub seconds_to_sunrise: f64,
}

/// Everything the coupling loop carries from one step to the next.
///
/// Threaded by value: [`Engine::step`](super::engine::Engine::step) consumes
/// the current state and returns the next one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineState {
    pub battery: BatteryState,
    pub governor: GovernorState,
}

impl EngineState {
    /// Start-of-run state: `soc_init` and a zero ramp anchor.
    pub fn initial(battery: &BatteryConfig) -> Self {
        Self {
            battery: BatteryState::initial(battery),
            governor: GovernorState::default(),
        }
    }
}

/// Complete record of one simulation timestep.
///
/// # Power Flow Convention (Bus)
/// Battery power is positive when charging and negative when discharging.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestepRecord {
    /// Timestep index.
    pub timestep: usize,
    /// Start of the interval.
    pub timestamp: DateTime<FixedOffset>,
    /// PV power available on the bus (W).
    pub pv_bus_power_w: f64,
    /// Governor target for the GPUs (W).
    pub gpu_requested_power_w: f64,
    /// Power actually delivered to the GPUs (W).
    pub gpu_served_power_w: f64,
    /// Battery power on the bus (W; positive=charge, negative=discharge).
    pub battery_bus_power_w: f64,
    /// Battery SOC at the start of this step.
    pub soc: f64,
    /// Request not served while PV covered demand (W).
    pub curtailed_power_w: f64,
    /// Request not served because PV plus battery fell short (W).
    pub unmet_power_w: f64,
    /// PV absorbed by neither the GPUs nor the battery (W).
    pub pv_curtailed_power_w: f64,
    /// Battery converter and resistive losses (W).
    pub battery_losses_w: f64,
    /// FLOPs computed during the step.
    pub flops_step: f64,
    /// GPU utilization in `[0, 1]`.
    pub utilization: f64,
}

impl fmt::Display for TimestepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t={:>5} {} | pv={:>7.1} W  gpu={:>6.1}/{:>6.1} W (u={:.2}) | \
             bat={:>7.1} W (SoC={:.1}%) | curt={:.1}  unmet={:.1}",
            self.timestep,
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.pv_bus_power_w,
            self.gpu_served_power_w,
            self.gpu_requested_power_w,
            self.utilization,
            self.battery_bus_power_w,
            self.soc * 100.0,
            self.curtailed_power_w,
            self.unmet_power_w,
        )
    }
}
