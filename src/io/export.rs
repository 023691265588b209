//! CSV and JSON export of run traces, metrics and sweep tables.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::sim::metrics::Metrics;
use crate::sim::types::TimestepRecord;
use crate::sweep::SweepResult;

/// Column header for the per-step trace.
const HEADER: &str = "timestep,timestamp,pv_bus_power_w,gpu_requested_power_w,\
                       gpu_served_power_w,battery_bus_power_w,soc,curtailed_power_w,\
                       unmet_power_w,pv_curtailed_power_w,battery_losses_w,\
                       flops_step,utilization";

/// Writes the per-step trace to a CSV file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn export_timeseries_csv(records: &[TimestepRecord], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_timeseries_csv(records, BufWriter::new(file))
}

/// Writes the per-step trace as CSV to any writer.
///
/// One header row, then one row per record. Output is byte-identical for
/// identical inputs.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_timeseries_csv(records: &[TimestepRecord], writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in records {
        wtr.write_record(&[
            r.timestep.to_string(),
            r.timestamp.to_rfc3339(),
            format!("{:.4}", r.pv_bus_power_w),
            format!("{:.4}", r.gpu_requested_power_w),
            format!("{:.4}", r.gpu_served_power_w),
            format!("{:.4}", r.battery_bus_power_w),
            format!("{:.6}", r.soc),
            format!("{:.4}", r.curtailed_power_w),
            format!("{:.4}", r.unmet_power_w),
            format!("{:.4}", r.pv_curtailed_power_w),
            format!("{:.4}", r.battery_losses_w),
            format!("{:e}", r.flops_step),
            format!("{:.6}", r.utilization),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes a sweep table to a CSV file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn export_sweep_csv(result: &SweepResult, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_sweep_csv(result, BufWriter::new(file))
}

/// Writes a sweep table as CSV: `pv_kw,batt_kwh` then every metric column.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_sweep_csv(result: &SweepResult, writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(["pv_kw", "batt_kwh"].into_iter().chain(Metrics::COLUMNS))?;

    for row in result.rows() {
        let mut fields = vec![row.pv_kw.to_string(), row.batt_kwh.to_string()];
        fields.extend(row.metrics.values().iter().map(f64::to_string));
        wtr.write_record(&fields)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes run metrics as pretty-printed JSON to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or serialization fails.
pub fn export_metrics_json(metrics: &Metrics, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut buf = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut buf, metrics)?;
    buf.flush()?;
    Ok(())
}

/// Writes a sweep table as a pretty-printed JSON array to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or serialization fails.
pub fn export_sweep_json(result: &SweepResult, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut buf = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut buf, result)?;
    buf.flush()?;
    Ok(())
}
