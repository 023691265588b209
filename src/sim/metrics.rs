//! Post-hoc metric reduction over a simulation timeseries.

use std::fmt;

use serde::Serialize;

use crate::config::GpuConfig;

use super::types::TimestepRecord;

/// Aggregate metrics derived from a complete simulation run.
///
/// Computed post-hoc from the timeseries so the reported figures can never
/// disagree with the step data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    /// FLOPs computed over the horizon.
    pub total_flops: f64,
    /// FLOPs at 100% utilization for every step.
    pub max_possible_flops: f64,
    /// `total_flops / max_possible_flops`.
    pub utilization: f64,
    /// Mean of the per-step utilization.
    pub avg_utilization: f64,
    /// Hours with any unmet demand.
    pub hours_unserved: f64,
    /// Simulated horizon (h).
    pub total_hours: f64,
    /// PV energy available on the bus (kWh).
    pub pv_energy_kwh: f64,
    /// Energy delivered to the GPUs (kWh).
    pub gpu_energy_kwh: f64,
    /// PV energy absorbed by neither the GPUs nor the battery (kWh).
    pub pv_curtailment_kwh: f64,
    /// `pv_curtailment_kwh / pv_energy_kwh`.
    pub curtailment_fraction: f64,
    /// Requested GPU energy that PV plus battery could not supply (kWh).
    pub unmet_energy_kwh: f64,
    pub peak_pv_kw: f64,
    pub peak_gpu_kw: f64,
    /// Absolute battery bus energy moved, both directions (kWh).
    pub battery_throughput_kwh: f64,
    /// Battery converter and resistive losses (kWh).
    pub battery_losses_kwh: f64,
    /// Throughput over twice the capacity.
    pub battery_equivalent_cycles: f64,
}

impl Metrics {
    /// Column names in the order of [`Metrics::values`].
    pub const COLUMNS: [&'static str; 16] = [
        "total_flops",
        "max_possible_flops",
        "utilization",
        "avg_utilization",
        "hours_unserved",
        "total_hours",
        "pv_energy_kwh",
        "gpu_energy_kwh",
        "pv_curtailment_kwh",
        "curtailment_fraction",
        "unmet_energy_kwh",
        "peak_pv_kw",
        "peak_gpu_kw",
        "battery_throughput_kwh",
        "battery_losses_kwh",
        "battery_equivalent_cycles",
    ];

    /// Computes all metrics from the complete record vector.
    ///
    /// # Arguments
    ///
    /// * `records` - Complete simulation timeseries
    /// * `dt_hours` - Timestep duration in hours
    /// * `gpu` - GPU parameters, for the theoretical FLOP ceiling
    /// * `battery_capacity_kwh` - Battery capacity for cycle calculation
    pub fn from_records(
        records: &[TimestepRecord],
        dt_hours: f64,
        gpu: &GpuConfig,
        battery_capacity_kwh: f64,
    ) -> Self {
        let n = records.len();
        let mut total_flops = 0.0;
        let mut utilization_sum = 0.0;
        let mut unserved_steps = 0_usize;
        let mut pv_wh = 0.0;
        let mut gpu_wh = 0.0;
        let mut pv_curtailed_wh = 0.0;
        let mut unmet_wh = 0.0;
        let mut peak_pv_w = 0.0_f64;
        let mut peak_gpu_w = 0.0_f64;
        let mut throughput_wh = 0.0;
        let mut losses_wh = 0.0;

        for r in records {
            total_flops += r.flops_step;
            utilization_sum += r.utilization;
            if r.unmet_power_w > 0.0 {
                unserved_steps += 1;
            }
            pv_wh += r.pv_bus_power_w * dt_hours;
            gpu_wh += r.gpu_served_power_w * dt_hours;
            pv_curtailed_wh += r.pv_curtailed_power_w * dt_hours;
            unmet_wh += r.unmet_power_w * dt_hours;
            peak_pv_w = peak_pv_w.max(r.pv_bus_power_w);
            peak_gpu_w = peak_gpu_w.max(r.gpu_served_power_w);
            throughput_wh += r.battery_bus_power_w.abs() * dt_hours;
            losses_wh += r.battery_losses_w * dt_hours;
        }

        let max_possible_flops =
            f64::from(gpu.n_gpus) * gpu.flops_peak_per_gpu * dt_hours * 3600.0 * n as f64;
        let capacity_wh = battery_capacity_kwh * 1000.0;

        Self {
            total_flops,
            max_possible_flops,
            utilization: ratio(total_flops, max_possible_flops),
            avg_utilization: ratio(utilization_sum, n as f64),
            hours_unserved: unserved_steps as f64 * dt_hours,
            total_hours: n as f64 * dt_hours,
            pv_energy_kwh: pv_wh / 1000.0,
            gpu_energy_kwh: gpu_wh / 1000.0,
            pv_curtailment_kwh: pv_curtailed_wh / 1000.0,
            curtailment_fraction: ratio(pv_curtailed_wh, pv_wh),
            unmet_energy_kwh: unmet_wh / 1000.0,
            peak_pv_kw: peak_pv_w / 1000.0,
            peak_gpu_kw: peak_gpu_w / 1000.0,
            battery_throughput_kwh: throughput_wh / 1000.0,
            battery_losses_kwh: losses_wh / 1000.0,
            battery_equivalent_cycles: ratio(throughput_wh, 2.0 * capacity_wh),
        }
    }

    /// Metric values in the order of [`Metrics::COLUMNS`].
    pub fn values(&self) -> [f64; 16] {
        [
            self.total_flops,
            self.max_possible_flops,
            self.utilization,
            self.avg_utilization,
            self.hours_unserved,
            self.total_hours,
            self.pv_energy_kwh,
            self.gpu_energy_kwh,
            self.pv_curtailment_kwh,
            self.curtailment_fraction,
            self.unmet_energy_kwh,
            self.peak_pv_kw,
            self.peak_gpu_kw,
            self.battery_throughput_kwh,
            self.battery_losses_kwh,
            self.battery_equivalent_cycles,
        ]
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Compute Report ---")?;
        writeln!(
            f,
            "Total compute:         {:.3e} FLOP ({:.1}% of {:.3e})",
            self.total_flops,
            self.utilization * 100.0,
            self.max_possible_flops
        )?;
        writeln!(f, "Mean utilization:      {:.3}", self.avg_utilization)?;
        writeln!(
            f,
            "Hours unserved:        {:.1} of {:.1} h",
            self.hours_unserved, self.total_hours
        )?;
        writeln!(f, "PV energy:             {:.2} kWh (peak {:.2} kW)", self.pv_energy_kwh, self.peak_pv_kw)?;
        writeln!(f, "GPU energy:            {:.2} kWh (peak {:.2} kW)", self.gpu_energy_kwh, self.peak_gpu_kw)?;
        writeln!(
            f,
            "PV curtailed:          {:.2} kWh ({:.1}%)",
            self.pv_curtailment_kwh,
            self.curtailment_fraction * 100.0
        )?;
        writeln!(f, "Unmet demand:          {:.2} kWh", self.unmet_energy_kwh)?;
        write!(
            f,
            "Battery throughput:    {:.2} kWh ({:.2} equiv. cycles, {:.2} kWh lost)",
            self.battery_throughput_kwh, self.battery_equivalent_cycles, self.battery_losses_kwh
        )
    }
}
