//! End-to-end simulation run: validate, derive PV power, step, reduce.

use tracing::{info, instrument, trace, warn};

use crate::config::ScenarioConfig;
use crate::error::{Result, SimError};
use crate::sim::engine::Engine;
use crate::sim::governor::NoForecastGovernor;
use crate::sim::metrics::Metrics;
use crate::sim::types::TimestepRecord;
use crate::weather::{self, IrradianceSeries};

/// Timeseries and metrics of one simulation run.
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    pub timeseries: Vec<TimestepRecord>,
    pub metrics: Metrics,
}

/// Runs one full simulation of `config` over `series`.
///
/// Both the configuration and the series are checked before the first
/// step; the run then starts from `soc_init` with a zero ramp anchor.
///
/// # Errors
///
/// - [`SimError::Config`] listing every violated constraint
/// - [`SimError::DataQuality`] for an empty, non-finite or irregular series
#[instrument(skip_all, fields(
    pv_kw = config.pv.dc_nameplate_kw,
    batt_kwh = config.battery.capacity_kwh,
    steps = series.len(),
))]
pub fn run_simulation(config: &ScenarioConfig, series: &IrradianceSeries) -> Result<SimulationOutput> {
    let errors = config.validate();
    if !errors.is_empty() {
        warn!(count = errors.len(), "configuration rejected");
        return Err(SimError::Config(errors));
    }
    series.validate(config.simulation.timestep_minutes)?;
    Ok(simulate(config, series))
}

/// Loads the configured irradiance source and runs the simulation on it.
///
/// # Errors
///
/// Same as [`run_simulation`], plus source I/O and parse failures.
pub fn run_scenario(config: &ScenarioConfig) -> Result<SimulationOutput> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(SimError::Config(errors));
    }
    let series = weather::load(config)?;
    run_simulation(config, &series)
}

/// Runs an already validated configuration. Infallible by construction.
pub(crate) fn simulate(config: &ScenarioConfig, series: &IrradianceSeries) -> SimulationOutput {
    let governor = NoForecastGovernor::new(
        config.governor.clone(),
        config.gpu.clone(),
        config.battery.clone(),
    );
    let engine = Engine::new(
        config.simulation.clone(),
        config.battery.clone(),
        config.gpu.clone(),
        governor,
    );

    let inputs = series.step_inputs(&config.pv);
    let (_, timeseries) = engine.run(engine.initial_state(), &inputs);
    for record in &timeseries {
        trace!("{record}");
    }

    let metrics = Metrics::from_records(
        &timeseries,
        engine.config().dt_hours(),
        engine.gpu(),
        engine.battery().capacity_kwh,
    );
    info!(
        total_flops = metrics.total_flops,
        utilization = metrics.utilization,
        hours_unserved = metrics.hours_unserved,
        "simulation complete"
    );
    SimulationOutput { timeseries, metrics }
}
