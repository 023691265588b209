use crate::config::BatteryConfig;

/// Battery state carried between timesteps.
///
/// A plain value: [`step`] takes the current state and returns the next one
/// inside its [`BatteryStepResult`], so the simulation loop owns the only copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryState {
    /// State of charge as a fraction of capacity.
    pub soc: f64,
}

impl BatteryState {
    pub fn new(soc: f64) -> Self {
        Self { soc }
    }

    /// Fresh state for the start of a run.
    pub fn initial(config: &BatteryConfig) -> Self {
        Self::new(config.soc_init)
    }
}

/// Outcome of one battery timestep.
///
/// # Power Flow Convention (Bus)
/// - Positive power / current: charging (bus to battery)
/// - Negative power / current: discharging (battery to bus)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryStepResult {
    /// SOC at the end of the step, always within `[soc_min, soc_max]`.
    pub soc_next: f64,
    /// Open-circuit voltage at the start of the step (V).
    pub v_ocv: f64,
    /// Cell current (A).
    pub current_a: f64,
    /// Power at the cell terminals (W).
    pub cell_power_w: f64,
    /// Power on the DC bus side of the converter (W).
    pub bus_power_w: f64,
    /// Converter plus resistive losses (W, >= 0).
    pub losses_w: f64,
    /// True when the request could not be delivered in full.
    pub limited: bool,
}

impl BatteryStepResult {
    /// The state the next timestep starts from.
    pub fn next_state(&self) -> BatteryState {
        BatteryState::new(self.soc_next)
    }

    fn idle(soc: f64, v_ocv: f64, limited: bool) -> Self {
        Self {
            soc_next: soc,
            v_ocv,
            current_a: 0.0,
            cell_power_w: 0.0,
            bus_power_w: 0.0,
            losses_w: 0.0,
            limited,
        }
    }
}

/// Open-circuit voltage by piecewise-linear interpolation over the OCV curve.
///
/// SOC outside the breakpoint range is clamped to the nearest endpoint
/// voltage; the curve is never extrapolated.
pub fn ocv_from_soc(soc: f64, config: &BatteryConfig) -> f64 {
    interpolate(soc, &config.ocv_soc, &config.ocv_v)
}

fn interpolate(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return 0.0;
    }
    if n == 1 || x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    // First breakpoint strictly above x; x > xs[0] so upper >= 1.
    let upper = xs[..n].partition_point(|&b| b <= x);
    let (x0, x1) = (xs[upper - 1], xs[upper]);
    let (y0, y1) = (ys[upper - 1], ys[upper]);
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Advances the battery by one timestep for a requested bus power.
///
/// The request is converted to a cell-side power through the converter
/// efficiency, the cell current is solved from the terminal-voltage
/// quadratic, current limits are applied, and finally the current is cut
/// back to the exact energy headroom if the step would cross an SOC bound.
/// All reported powers derive from that final current.
///
/// Degenerate inputs (zero capacity, zero efficiency, non-positive `dt`)
/// resolve to an idle step rather than an error.
///
/// # Arguments
///
/// * `state` - Battery state at the start of the step
/// * `requested_bus_power_w` - Positive to charge, negative to discharge
/// * `dt_hours` - Step length in hours
/// * `config` - Battery parameters
pub fn step(
    state: BatteryState,
    requested_bus_power_w: f64,
    dt_hours: f64,
    config: &BatteryConfig,
) -> BatteryStepResult {
    let soc = state.soc;
    let v_ocv = ocv_from_soc(soc, config);
    let requested = requested_bus_power_w != 0.0;

    if config.capacity_wh() <= 0.0 || dt_hours <= 0.0 || v_ocv <= 0.0 {
        return BatteryStepResult::idle(soc, v_ocv, requested);
    }
    if !requested {
        return BatteryStepResult::idle(soc, v_ocv, false);
    }

    if requested_bus_power_w > 0.0 {
        charge(soc, v_ocv, requested_bus_power_w, dt_hours, config)
    } else {
        discharge(soc, v_ocv, -requested_bus_power_w, dt_hours, config)
    }
}

fn charge(
    soc: f64,
    v_ocv: f64,
    bus_request_w: f64,
    dt_hours: f64,
    config: &BatteryConfig,
) -> BatteryStepResult {
    let eta = config.charge_efficiency;
    if eta <= 0.0 {
        return BatteryStepResult::idle(soc, v_ocv, true);
    }
    let capacity_wh = config.capacity_wh();
    let r = config.r_internal_ohm;

    let (mut current, mut limited) =
        solve_charge_current(v_ocv, r, bus_request_w * eta, config.i_charge_max_a);

    let headroom_wh = (config.soc_max - soc) * capacity_wh;
    if v_ocv * current * dt_hours > headroom_wh {
        current = headroom_wh.max(0.0) / (v_ocv * dt_hours);
        limited = true;
    }

    let v_term = v_ocv + current * r;
    let cell_power_w = v_term * current;
    let bus_power_w = cell_power_w / eta;
    let stored_w = v_ocv * current;
    let soc_next = (soc + stored_w * dt_hours / capacity_wh).clamp(config.soc_min, config.soc_max);

    BatteryStepResult {
        soc_next,
        v_ocv,
        current_a: current,
        cell_power_w,
        bus_power_w,
        losses_w: (bus_power_w - stored_w).max(0.0),
        limited,
    }
}

fn discharge(
    soc: f64,
    v_ocv: f64,
    bus_request_w: f64,
    dt_hours: f64,
    config: &BatteryConfig,
) -> BatteryStepResult {
    let eta = config.discharge_efficiency;
    if eta <= 0.0 {
        return BatteryStepResult::idle(soc, v_ocv, true);
    }
    let capacity_wh = config.capacity_wh();
    let r = config.r_internal_ohm;

    let (mut current, mut limited) =
        solve_discharge_current(v_ocv, r, bus_request_w / eta, config.i_discharge_max_a);

    let headroom_wh = (soc - config.soc_min) * capacity_wh;
    if v_ocv * current * dt_hours > headroom_wh {
        current = headroom_wh.max(0.0) / (v_ocv * dt_hours);
        limited = true;
    }

    let v_term = v_ocv - current * r;
    let cell_power_w = v_term * current;
    let bus_power_w = cell_power_w * eta;
    let drawn_w = v_ocv * current;
    let soc_next = (soc - drawn_w * dt_hours / capacity_wh).clamp(config.soc_min, config.soc_max);

    BatteryStepResult {
        soc_next,
        v_ocv,
        current_a: -current,
        cell_power_w: -cell_power_w,
        bus_power_w: -bus_power_w,
        losses_w: (drawn_w - bus_power_w).max(0.0),
        limited,
    }
}

/// Solves `R·I² + OCV·I − P = 0` for the positive root, then applies `i_max`.
fn solve_charge_current(v_ocv: f64, r: f64, p_cell_w: f64, i_max: f64) -> (f64, bool) {
    if p_cell_w <= 0.0 {
        return (0.0, false);
    }
    let mut limited = false;
    let mut current = if r > 0.0 {
        let disc = v_ocv * v_ocv + 4.0 * r * p_cell_w;
        if disc < 0.0 {
            limited = true;
            i_max
        } else {
            (-v_ocv + disc.sqrt()) / (2.0 * r)
        }
    } else {
        p_cell_w / v_ocv
    };
    if current > i_max {
        current = i_max;
        limited = true;
    }
    (current.max(0.0), limited)
}

/// Solves `R·I² − OCV·I + P = 0` for the root at or below the max-power
/// current `OCV/(2R)`, then applies `i_max`.
///
/// A negative discriminant means the cell cannot deliver `P` at any current;
/// the current is clamped to the max-power point.
fn solve_discharge_current(v_ocv: f64, r: f64, p_cell_w: f64, i_max: f64) -> (f64, bool) {
    if p_cell_w <= 0.0 {
        return (0.0, false);
    }
    let mut limited = false;
    let mut current = if r > 0.0 {
        let disc = v_ocv * v_ocv - 4.0 * r * p_cell_w;
        if disc < 0.0 {
            limited = true;
            v_ocv / (2.0 * r)
        } else {
            (v_ocv - disc.sqrt()) / (2.0 * r)
        }
    } else {
        p_cell_w / v_ocv
    };
    if current > i_max {
        current = i_max;
        limited = true;
    }
    (current.max(0.0), limited)
}

/// Largest bus power the battery can deliver right now (W, >= 0).
///
/// Evaluated at the smaller of the max-power-point current and the
/// discharge current limit. Zero at or below `soc_min`.
pub fn max_discharge_power(state: BatteryState, config: &BatteryConfig) -> f64 {
    if config.capacity_wh() <= 0.0 || state.soc <= config.soc_min {
        return 0.0;
    }
    let v_ocv = ocv_from_soc(state.soc, config);
    let r = config.r_internal_ohm;
    let current = if r > 0.0 {
        (v_ocv / (2.0 * r)).min(config.i_discharge_max_a)
    } else {
        config.i_discharge_max_a
    };
    let p_cell = (v_ocv - current * r) * current;
    (p_cell * config.discharge_efficiency).max(0.0)
}

/// Largest bus power the battery can accept right now (W, >= 0).
///
/// Evaluated at the charge current limit. Zero at or above `soc_max`.
pub fn max_charge_power(state: BatteryState, config: &BatteryConfig) -> f64 {
    if config.capacity_wh() <= 0.0 || state.soc >= config.soc_max || config.charge_efficiency <= 0.0 {
        return 0.0;
    }
    let v_ocv = ocv_from_soc(state.soc, config);
    let current = config.i_charge_max_a;
    let p_cell = (v_ocv + current * config.r_internal_ohm) * current;
    (p_cell / config.charge_efficiency).max(0.0)
}
