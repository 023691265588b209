//! Off-grid GPU compute simulator: PV, battery and GPU on one DC bus under a
//! power governor, plus PV/battery sizing sweeps.

pub mod config;
pub mod devices;
pub mod error;
pub mod io;
/// End-to-end validated runs.
pub mod runner;
/// Simulation engine, governor, records and metrics.
pub mod sim;
pub mod sweep;
pub mod weather;
