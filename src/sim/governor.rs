//! No-forecast power governor.
//!
//! Throttles the GPU request at night so the battery can sustain compute
//! until sunrise. Myopic by construction: every call recomputes a constant
//! sustain estimate from the instantaneous SOC and a linear time-to-sunrise.

use crate::config::{BatteryConfig, GovernorConfig, GpuConfig};
use crate::devices::gpu;

/// Ramp anchor carried between governor calls.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GovernorState {
    /// Target issued on the previous step (W).
    pub power_w: f64,
}

/// Decides how much power the GPUs should request each step.
pub trait Governor {
    /// Returns the new state; its `power_w` is this step's GPU request.
    fn target_power(&self, soc: f64, seconds_to_sunrise: f64, prev: GovernorState) -> GovernorState;
}

/// Sustain-until-sunrise governor with a per-step ramp limit.
#[derive(Debug, Clone)]
pub struct NoForecastGovernor {
    config: GovernorConfig,
    gpu: GpuConfig,
    battery: BatteryConfig,
}

impl NoForecastGovernor {
    pub fn new(config: GovernorConfig, gpu: GpuConfig, battery: BatteryConfig) -> Self {
        Self {
            config,
            gpu,
            battery,
        }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }
}

impl Governor for NoForecastGovernor {
    fn target_power(&self, soc: f64, seconds_to_sunrise: f64, prev: GovernorState) -> GovernorState {
        target_power(
            soc,
            seconds_to_sunrise,
            &self.gpu,
            &self.battery,
            &self.config,
            prev,
        )
    }
}

/// Computes the GPU power target for one step.
///
/// - Disabled: GPU max, no ramp limiting.
/// - Daytime (`seconds_to_sunrise <= 0`): GPU max.
/// - Night: usable energy above `reserve_soc` spread evenly over the hours
///   left until sunrise, scaled by `safety_factor` and clamped to `[0, max]`.
///
/// When enabled and `ramp_limit_w_per_step > 0`, the result moves at most
/// that far from `prev.power_w`.
pub fn target_power(
    soc: f64,
    seconds_to_sunrise: f64,
    gpu_config: &GpuConfig,
    battery: &BatteryConfig,
    config: &GovernorConfig,
    prev: GovernorState,
) -> GovernorState {
    let p_max = gpu::max_power_w(gpu_config);
    if !config.enabled {
        return GovernorState { power_w: p_max };
    }

    let target = if seconds_to_sunrise <= 0.0 {
        p_max
    } else {
        let energy_available_wh = ((soc - config.reserve_soc) * battery.capacity_wh()).max(0.0);
        let hours_to_sunrise = seconds_to_sunrise / 3600.0;
        let sustain_w = energy_available_wh / hours_to_sunrise;
        (sustain_w * config.safety_factor).max(0.0).min(p_max)
    };

    let ramp = config.ramp_limit_w_per_step;
    let power_w = if ramp > 0.0 {
        target.clamp(prev.power_w - ramp, prev.power_w + ramp)
    } else {
        target
    };
    GovernorState { power_w }
}
