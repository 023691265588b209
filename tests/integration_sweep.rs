//! Integration tests for the PV / battery sizing sweep.

mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use pv_gpu_sim::error::SimError;
use pv_gpu_sim::io::export::write_sweep_csv;
use pv_gpu_sim::runner::run_simulation;
use pv_gpu_sim::sweep::{cell_config, run_sweep, run_sweep_parallel};

const PV_KW: [f64; 3] = [0.0, 1.0, 3.0];
const BATT_KWH: [f64; 3] = [0.0, 5.0, 20.0];

#[test]
fn three_by_three_grid_has_nine_unique_rows() {
    let series = common::synthetic_year(42).restrict_to_year(2021).unwrap();
    let mut calls = Vec::new();
    let result = run_sweep(&common::default_config(), &series, &PV_KW, &BATT_KWH, |done, total| {
        calls.push((done, total));
    })
    .unwrap();

    assert_eq!(result.len(), 9);
    let keys: HashSet<_> = result
        .rows()
        .iter()
        .map(|r| (r.pv_kw.to_bits(), r.batt_kwh.to_bits()))
        .collect();
    assert_eq!(keys.len(), 9);
    assert_eq!(calls, (1..=9).map(|i| (i, 9)).collect::<Vec<_>>());

    for row in result.rows() {
        assert_eq!(row.metrics.total_hours, 8760.0);
        assert!((0.0..=1.0).contains(&row.metrics.utilization));
    }
}

#[test]
fn parallel_sweep_matches_sequential() {
    let series = common::synthetic_year(7);
    let base = common::default_config();
    let sequential = run_sweep(&base, &series, &PV_KW, &BATT_KWH, |_, _| {}).unwrap();

    let completed = AtomicUsize::new(0);
    let parallel = run_sweep_parallel(&base, &series, &PV_KW, &BATT_KWH, |done, total| {
        assert_eq!(total, 9);
        completed.fetch_add(1, Ordering::SeqCst);
        assert!(done <= total);
    })
    .unwrap();

    assert_eq!(completed.load(Ordering::SeqCst), 9);
    assert_eq!(sequential, parallel);
}

#[test]
fn sweep_cell_equals_standalone_run() {
    let series = common::square_days(4);
    let base = common::default_config();
    let result = run_sweep(&base, &series, &PV_KW, &BATT_KWH, |_, _| {}).unwrap();
    let solo = run_simulation(&cell_config(&base, 3.0, 5.0), &series).unwrap();
    assert_eq!(result.get(3.0, 5.0).map(|r| &r.metrics), Some(&solo.metrics));
}

#[test]
fn storage_extends_night_compute() {
    let series = common::square_days(4);
    let result = run_sweep(&common::default_config(), &series, &[3.0], &[0.0, 20.0], |_, _| {}).unwrap();
    let without = &result.get(3.0, 0.0).unwrap().metrics;
    let with = &result.get(3.0, 20.0).unwrap().metrics;
    assert_eq!(without.battery_throughput_kwh, 0.0);
    assert!(with.battery_throughput_kwh > 0.0);
    assert!(with.total_flops > without.total_flops);
    assert!(with.pv_curtailment_kwh < without.pv_curtailment_kwh);
}

#[test]
fn irregular_series_fails_before_any_cell_runs() {
    let mut points = common::square_days(2).points().to_vec();
    points.remove(5);
    let series = pv_gpu_sim::weather::IrradianceSeries::new(points);
    let mut calls = 0;
    let err = run_sweep(&common::default_config(), &series, &PV_KW, &BATT_KWH, |_, _| calls += 1).unwrap_err();
    assert!(matches!(err, SimError::DataQuality(_)));
    assert_eq!(calls, 0);
}

#[test]
fn sweep_table_exports_one_line_per_cell() {
    let result = run_sweep(&common::default_config(), &common::square_days(1), &PV_KW, &BATT_KWH, |_, _| {}).unwrap();
    let mut buf = Vec::new();
    write_sweep_csv(&result, &mut buf).unwrap();
    let output = String::from_utf8(buf).unwrap();
    assert_eq!(output.lines().count(), 10);
    assert!(output.starts_with("pv_kw,batt_kwh,total_flops"));
}
