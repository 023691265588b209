/// Step-by-step co-simulation of PV, battery and GPU.
pub mod engine;
pub mod governor;
/// Whole-run metric reduction.
pub mod metrics;
pub mod types;
