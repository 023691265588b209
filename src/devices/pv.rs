//! PVWatts DC model: plane-of-array irradiance and cell temperature to DC bus power.

use crate::config::PvConfig;

/// Reference irradiance for the nameplate rating (W/m²).
const G_REF_W_M2: f64 = 1000.0;
/// Reference cell temperature for the nameplate rating (°C).
const T_REF_C: f64 = 25.0;

/// PV power delivered to the DC bus after MPPT and wiring losses (W, >= 0).
///
/// ```text
/// p_dc = P_dc0 · (G_poa / 1000) · (1 + γ · (T_cell − 25))
/// ```
pub fn dc_bus_power_w(poa_global_w_m2: f64, temp_cell_c: f64, config: &PvConfig) -> f64 {
    let p_dc0_w = config.dc_nameplate_kw * 1000.0;
    let temp_factor = 1.0 + config.gamma_pdc_per_c * (temp_cell_c - T_REF_C);
    let p_dc_w = (p_dc0_w * (poa_global_w_m2 / G_REF_W_M2) * temp_factor).max(0.0);
    p_dc_w * config.mppt_efficiency * config.dc_wiring_efficiency
}
