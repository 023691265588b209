use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Off-grid GPU compute simulator.
#[derive(Debug, Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    /// Load the scenario from a TOML file.
    #[clap(long, global = true, conflicts_with = "preset")]
    pub scenario: Option<PathBuf>,

    /// Use a built-in preset (baseline, ungoverned, large_array).
    #[clap(long, global = true)]
    pub preset: Option<String>,

    /// Read irradiance from this CSV instead of the configured source.
    #[clap(long, global = true)]
    pub weather_csv: Option<PathBuf>,

    /// Override the synthetic weather seed.
    #[clap(long, global = true)]
    pub seed: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Simulate one scenario and print its compute report.
    Run(RunArgs),

    /// Sweep PV nameplate against battery capacity.
    Sweep(SweepArgs),
}

#[derive(Debug, ClapArgs)]
pub struct RunArgs {
    /// Write the per-step trace to this CSV file.
    #[clap(long)]
    pub telemetry_out: Option<PathBuf>,

    /// Write the run metrics to this JSON file.
    #[clap(long)]
    pub metrics_json: Option<PathBuf>,
}

#[derive(Debug, ClapArgs)]
pub struct SweepArgs {
    /// PV sizes in kWdc, overriding `sweep.pv_kw_list`.
    #[clap(long, value_delimiter = ',', num_args = 1..)]
    pub pv_kw: Option<Vec<f64>>,

    /// Battery sizes in kWh, overriding `sweep.batt_kwh_list`.
    #[clap(long, value_delimiter = ',', num_args = 1..)]
    pub batt_kwh: Option<Vec<f64>>,

    /// Run grid cells on all cores.
    #[clap(long)]
    pub parallel: bool,

    /// Write the sweep table to this CSV file.
    #[clap(long)]
    pub out: Option<PathBuf>,

    /// Write the sweep table to this JSON file.
    #[clap(long)]
    pub json: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn supports_scenario_run() {
        let args = Args::try_parse_from(["pv-gpu-sim", "--scenario", "site.toml", "run"]).unwrap();
        assert_eq!(args.scenario.as_deref().and_then(|p| p.to_str()), Some("site.toml"));
        assert!(args.preset.is_none());
        assert!(matches!(args.command, Command::Run(_)));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "pv-gpu-sim",
            "run",
            "--preset",
            "ungoverned",
            "--seed",
            "7",
            "--metrics-json",
            "m.json",
        ])
        .unwrap();
        assert_eq!(args.preset.as_deref(), Some("ungoverned"));
        assert_eq!(args.seed, Some(7));
        match args.command {
            Command::Run(run) => assert!(run.metrics_json.is_some()),
            Command::Sweep(_) => panic!("expected run"),
        }
    }

    #[test]
    fn scenario_and_preset_conflict() {
        let err = Args::try_parse_from([
            "pv-gpu-sim",
            "--scenario",
            "a.toml",
            "--preset",
            "baseline",
            "run",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn sweep_lists_accept_commas() {
        let args = Args::try_parse_from([
            "pv-gpu-sim",
            "sweep",
            "--pv-kw",
            "0,1.5,3",
            "--batt-kwh",
            "5",
            "--parallel",
        ])
        .unwrap();
        match args.command {
            Command::Sweep(sweep) => {
                assert_eq!(sweep.pv_kw, Some(vec![0.0, 1.5, 3.0]));
                assert_eq!(sweep.batt_kwh, Some(vec![5.0]));
                assert!(sweep.parallel);
                assert!(sweep.out.is_none());
            }
            Command::Run(_) => panic!("expected sweep"),
        }
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Args::try_parse_from(["pv-gpu-sim"]).is_err());
    }
}
