//! PV / battery sizing sweep.
//!
//! Every grid cell is an independent simulation of a cloned configuration
//! with its own fresh state, so cells can run in any order or in parallel.

use std::sync::Mutex;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::config::ScenarioConfig;
use crate::error::{Result, SimError};
use crate::runner;
use crate::sim::metrics::Metrics;
use crate::weather::IrradianceSeries;

/// Metrics of one grid cell, tagged with its sizing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepRow {
    /// PV nameplate (kWdc).
    pub pv_kw: f64,
    /// Battery capacity (kWh).
    pub batt_kwh: f64,
    #[serde(flatten)]
    pub metrics: Metrics,
}

/// All rows of a sweep in grid order (PV-major).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SweepResult {
    rows: Vec<SweepRow>,
}

impl SweepResult {
    pub fn rows(&self) -> &[SweepRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Looks a row up by its grid identity.
    pub fn get(&self, pv_kw: f64, batt_kwh: f64) -> Option<&SweepRow> {
        self.rows
            .iter()
            .find(|r| r.pv_kw == pv_kw && r.batt_kwh == batt_kwh)
    }

    /// Row with the most FLOPs; earlier rows win ties.
    pub fn best_by_flops(&self) -> Option<&SweepRow> {
        self.rows.iter().fold(None, |best: Option<&SweepRow>, r| match best {
            Some(b) if b.metrics.total_flops >= r.metrics.total_flops => Some(b),
            _ => Some(r),
        })
    }
}

/// Runs every `(pv_kw, batt_kwh)` cell in sequence.
///
/// `progress` is called after each cell with `(completed, total)`.
///
/// # Errors
///
/// - [`SimError::Config`] if the base configuration or either list is invalid
/// - [`SimError::DataQuality`] if the series is unusable
#[instrument(skip_all, fields(cells = pv_kw_list.len() * batt_kwh_list.len()))]
pub fn run_sweep<F>(
    base: &ScenarioConfig,
    series: &IrradianceSeries,
    pv_kw_list: &[f64],
    batt_kwh_list: &[f64],
    mut progress: F,
) -> Result<SweepResult>
where
    F: FnMut(usize, usize),
{
    let cells = prepare(base, series, pv_kw_list, batt_kwh_list)?;
    let total = cells.len();
    let mut rows = Vec::with_capacity(total);
    for (i, &(pv_kw, batt_kwh)) in cells.iter().enumerate() {
        rows.push(run_cell(base, series, pv_kw, batt_kwh));
        progress(i + 1, total);
    }
    info!(total, "sweep complete");
    Ok(SweepResult { rows })
}

/// Runs the grid on the rayon thread pool.
///
/// Rows come back in the same grid order as [`run_sweep`]. `progress` calls
/// are serialized and see a strictly increasing completion count.
///
/// # Errors
///
/// Same as [`run_sweep`].
#[instrument(skip_all, fields(cells = pv_kw_list.len() * batt_kwh_list.len()))]
pub fn run_sweep_parallel<F>(
    base: &ScenarioConfig,
    series: &IrradianceSeries,
    pv_kw_list: &[f64],
    batt_kwh_list: &[f64],
    progress: F,
) -> Result<SweepResult>
where
    F: Fn(usize, usize) + Sync,
{
    let cells = prepare(base, series, pv_kw_list, batt_kwh_list)?;
    let total = cells.len();
    let completed = Mutex::new(0_usize);
    let rows: Vec<SweepRow> = cells
        .par_iter()
        .map(|&(pv_kw, batt_kwh)| {
            let row = run_cell(base, series, pv_kw, batt_kwh);
            // A poisoned lock only means another callback panicked; keep counting.
            let mut done = completed.lock().unwrap_or_else(|e| e.into_inner());
            *done += 1;
            progress(*done, total);
            row
        })
        .collect();
    info!(total, "parallel sweep complete");
    Ok(SweepResult { rows })
}

/// Base configuration with one cell's sizing substituted.
pub fn cell_config(base: &ScenarioConfig, pv_kw: f64, batt_kwh: f64) -> ScenarioConfig {
    let mut cfg = base.clone();
    cfg.pv.dc_nameplate_kw = pv_kw;
    cfg.battery.capacity_kwh = batt_kwh;
    cfg
}

/// Validates everything once and returns the grid cells in PV-major order.
fn prepare(
    base: &ScenarioConfig,
    series: &IrradianceSeries,
    pv_kw_list: &[f64],
    batt_kwh_list: &[f64],
) -> Result<Vec<(f64, f64)>> {
    let mut checked = base.clone();
    checked.sweep.pv_kw_list = pv_kw_list.to_vec();
    checked.sweep.batt_kwh_list = batt_kwh_list.to_vec();
    let errors = checked.validate();
    if !errors.is_empty() {
        return Err(SimError::Config(errors));
    }
    series.validate(base.simulation.timestep_minutes)?;

    Ok(pv_kw_list
        .iter()
        .flat_map(|&pv| batt_kwh_list.iter().map(move |&batt| (pv, batt)))
        .collect())
}

fn run_cell(base: &ScenarioConfig, series: &IrradianceSeries, pv_kw: f64, batt_kwh: f64) -> SweepRow {
    let cfg = cell_config(base, pv_kw, batt_kwh);
    let output = runner::simulate(&cfg, series);
    debug!(pv_kw, batt_kwh, total_flops = output.metrics.total_flops, "sweep cell done");
    SweepRow {
        pv_kw,
        batt_kwh,
        metrics: output.metrics,
    }
}
