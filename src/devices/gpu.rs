//! GPU compute load: utilization to power curve, its inverse, and FLOP accounting.
//!
//! All powers are totals across `n_gpus` identical units.

use crate::config::GpuConfig;

/// Total draw at utilization `u`.
///
/// `n·(p_idle + (p_max − p_idle)·u^exponent)` with `u` clamped to `[0, 1]`.
/// The endpoints are returned exactly.
pub fn power_w(u: f64, config: &GpuConfig) -> f64 {
    let n = f64::from(config.n_gpus);
    if !(u > 0.0) {
        return n * config.p_idle_w;
    }
    if u >= 1.0 {
        return n * config.p_max_w;
    }
    n * (config.p_idle_w + (config.p_max_w - config.p_idle_w) * u.powf(config.power_exponent))
}

/// Inverse of [`power_w`]: the utilization at which the GPUs draw `power`.
///
/// Works per unit, so the result does not depend on `n_gpus` beyond the
/// division. At or below idle yields 0, at or above max yields 1.
pub fn utilization_from_power(power: f64, config: &GpuConfig) -> f64 {
    if config.n_gpus == 0 {
        return 0.0;
    }
    let per_unit = power / f64::from(config.n_gpus);
    let range = config.p_max_w - config.p_idle_w;
    if range <= 0.0 {
        return if per_unit >= config.p_max_w { 1.0 } else { 0.0 };
    }
    if per_unit <= config.p_idle_w {
        return 0.0;
    }
    if per_unit >= config.p_max_w {
        return 1.0;
    }
    let normalized = (per_unit - config.p_idle_w) / range;
    normalized.powf(1.0 / config.power_exponent).clamp(0.0, 1.0)
}

/// FLOPs produced over `dt_seconds` at utilization `u`.
pub fn flops(u: f64, dt_seconds: f64, config: &GpuConfig) -> f64 {
    f64::from(config.n_gpus) * config.flops_peak_per_gpu * u.clamp(0.0, 1.0) * dt_seconds
}

pub fn idle_power_w(config: &GpuConfig) -> f64 {
    f64::from(config.n_gpus) * config.p_idle_w
}

pub fn max_power_w(config: &GpuConfig) -> f64 {
    f64::from(config.n_gpus) * config.p_max_w
}
