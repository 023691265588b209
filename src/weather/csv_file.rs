//! Pre-computed irradiance from a CSV file.
//!
//! Expected columns: `timestamp,poa_global_w_m2,temp_cell_c[,seconds_to_sunrise]`.
//! Timestamps are RFC 3339 with an explicit offset. When the sunrise column
//! is absent or blank it is derived from the site geometry.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::Deserialize;
use tracing::debug;

use crate::config::{PvConfig, SiteConfig};
use crate::error::{DataQualityError, Result};

use super::{IrradiancePoint, IrradianceSeries, IrradianceService, solar};

/// Reads an irradiance series from a CSV file on disk.
#[derive(Debug, Clone)]
pub struct CsvIrradiance {
    path: PathBuf,
}

impl CsvIrradiance {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl IrradianceService for CsvIrradiance {
    fn irradiance(&self, site: &SiteConfig, _pv: &PvConfig) -> Result<IrradianceSeries> {
        debug!(path = %self.path.display(), "reading irradiance csv");
        let file = File::open(&self.path)?;
        read_series(file, site)
    }
}

#[derive(Debug, Deserialize)]
struct Row {
    timestamp: String,
    poa_global_w_m2: f64,
    temp_cell_c: f64,
    #[serde(default)]
    seconds_to_sunrise: Option<f64>,
}

/// Parses an irradiance series from any CSV reader.
///
/// # Errors
///
/// - `SimError::Csv` for malformed rows or numbers
/// - `MissingTimezone` for timestamps without an offset
/// - `InvalidTimestamp` for anything else that is not a date-time
pub fn read_series(reader: impl Read, site: &SiteConfig) -> Result<IrradianceSeries> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut points = Vec::new();
    for (row, record) in rdr.deserialize::<Row>().enumerate() {
        let record = record?;
        let timestamp = parse_timestamp(row, &record.timestamp)?;
        let seconds_to_sunrise = match record.seconds_to_sunrise {
            Some(s) => s,
            None => solar::seconds_to_sunrise(&timestamp, site),
        };
        points.push(IrradiancePoint {
            timestamp,
            poa_global_w_m2: record.poa_global_w_m2,
            temp_cell_c: record.temp_cell_c,
            seconds_to_sunrise,
        });
    }
    Ok(IrradianceSeries::new(points))
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn parse_timestamp(row: usize, value: &str) -> Result<DateTime<FixedOffset>, DataQualityError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts);
    }
    if let Ok(ts) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(ts);
    }
    if NAIVE_FORMATS
        .iter()
        .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
    {
        return Err(DataQualityError::MissingTimezone {
            row,
            value: value.to_string(),
        });
    }
    Err(DataQualityError::InvalidTimestamp {
        row,
        value: value.to_string(),
    })
}
