//! Simulator entry point: CLI wiring and config-driven runs.

mod cli;

use std::io;
use std::process;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pv_gpu_sim::config::{ScenarioConfig, WeatherSource};
use pv_gpu_sim::error::{Result, SimError};
use pv_gpu_sim::io::export;
use pv_gpu_sim::sweep::{self, SweepResult};
use pv_gpu_sim::{runner, weather};

use crate::cli::{Args, Command, RunArgs, SweepArgs};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    match args.command {
        Command::Run(run_args) => run_once(&config, &run_args),
        Command::Sweep(sweep_args) => run_grid(config, &sweep_args),
    }
}

/// `--scenario` wins, then `--preset`, then the baseline; CLI overrides are
/// applied before validation so every problem is reported at once.
fn load_config(args: &Args) -> Result<ScenarioConfig> {
    let mut config = match (&args.scenario, &args.preset) {
        (Some(path), _) => ScenarioConfig::from_toml_file(path).map_err(|e| SimError::Config(vec![e]))?,
        (None, Some(name)) => ScenarioConfig::from_preset(name).map_err(|e| SimError::Config(vec![e]))?,
        (None, None) => ScenarioConfig::baseline(),
    };
    if let Some(seed) = args.seed {
        config.weather.seed = seed;
    }
    if let Some(path) = &args.weather_csv {
        config.weather.source = WeatherSource::Csv;
        config.weather.path = Some(path.clone());
    }
    config.validated()
}

fn run_once(config: &ScenarioConfig, args: &RunArgs) -> Result<()> {
    let output = runner::run_scenario(config)?;
    println!("{}", output.metrics);

    if let Some(path) = &args.telemetry_out {
        export::export_timeseries_csv(&output.timeseries, path)?;
        info!(path = %path.display(), rows = output.timeseries.len(), "trace written");
    }
    if let Some(path) = &args.metrics_json {
        export::export_metrics_json(&output.metrics, path)?;
        info!(path = %path.display(), "metrics written");
    }
    Ok(())
}

fn run_grid(mut config: ScenarioConfig, args: &SweepArgs) -> Result<()> {
    if let Some(pv_kw) = &args.pv_kw {
        config.sweep.pv_kw_list = pv_kw.clone();
    }
    if let Some(batt_kwh) = &args.batt_kwh {
        config.sweep.batt_kwh_list = batt_kwh.clone();
    }

    let series = weather::load(&config)?.restrict_to_year(config.sweep.year)?;
    info!(year = config.sweep.year, points = series.len(), "sweep weather loaded");

    let report = |done: usize, total: usize| info!("sweep {done}/{total}");
    let result = if args.parallel {
        sweep::run_sweep_parallel(
            &config,
            &series,
            &config.sweep.pv_kw_list,
            &config.sweep.batt_kwh_list,
            report,
        )?
    } else {
        sweep::run_sweep(
            &config,
            &series,
            &config.sweep.pv_kw_list,
            &config.sweep.batt_kwh_list,
            report,
        )?
    };

    print_best(&result);
    match &args.out {
        Some(path) => {
            export::export_sweep_csv(&result, path)?;
            info!(path = %path.display(), rows = result.len(), "sweep table written");
        }
        None => export::write_sweep_csv(&result, io::stdout().lock())?,
    }
    if let Some(path) = &args.json {
        export::export_sweep_json(&result, path)?;
        info!(path = %path.display(), "sweep json written");
    }
    Ok(())
}

fn print_best(result: &SweepResult) {
    if let Some(best) = result.best_by_flops() {
        info!(
            pv_kw = best.pv_kw,
            batt_kwh = best.batt_kwh,
            total_flops = best.metrics.total_flops,
            utilization = best.metrics.utilization,
            "highest-throughput sizing"
        );
    }
}
