//! Physical models of the DC bus participants.

/// Lithium-ion pack with OCV curve and internal resistance.
pub mod battery;
/// GPU power curve and throughput accounting.
pub mod gpu;
/// PVWatts DC array model.
pub mod pv;
pub mod types;

// Re-export the main types for convenience
pub use battery::{BatteryState, BatteryStepResult};
