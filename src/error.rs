//! Crate-wide error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Convenience alias used throughout the crate.
pub type Result<T, E = SimError> = std::result::Result<T, E>;

/// Top-level failure of a simulation or sweep.
///
/// Configuration and data-quality problems are reported before the first
/// timestep executes; the per-step physics never produces an error.
#[derive(Debug, Error)]
pub enum SimError {
    /// One or more configuration fields violate their constraints.
    #[error("invalid configuration:\n{}", join_config_errors(.0))]
    Config(Vec<ConfigError>),

    /// The irradiance series is unusable (spacing, timezone, values).
    #[error(transparent)]
    DataQuality(#[from] DataQualityError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Problems with the timestamped input series, as opposed to model faults.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataQualityError {
    #[error("irradiance series is empty")]
    EmptySeries,

    #[error("row {row}: timestamp \"{value}\" has no UTC offset")]
    MissingTimezone { row: usize, value: String },

    #[error("row {row}: cannot parse timestamp \"{value}\"")]
    InvalidTimestamp { row: usize, value: String },

    #[error(
        "irregular spacing at index {index}: expected {expected_minutes} min, got {actual_seconds} s"
    )]
    IrregularSpacing {
        index: usize,
        expected_minutes: u32,
        actual_seconds: i64,
    },

    #[error("row {row}: column `{column}` is not a finite number")]
    NonFiniteValue { row: usize, column: &'static str },

    #[error("no timestamps fall in year {year}")]
    YearNotPresent { year: i32 },
}

fn join_config_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_variant_lists_every_field() {
        let err = SimError::Config(vec![
            ConfigError::new("battery.soc_min", "must be < battery.soc_max"),
            ConfigError::new("simulation.timestep_minutes", "must be 30"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("battery.soc_min"));
        assert!(msg.contains("simulation.timestep_minutes"));
    }

    #[test]
    fn data_quality_converts_into_sim_error() {
        let err: SimError = DataQualityError::EmptySeries.into();
        assert!(matches!(err, SimError::DataQuality(DataQualityError::EmptySeries)));
    }
}
