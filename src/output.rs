use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::WriterBuilder;
use serde::Serialize;

use crate::compare::Components;
use crate::error::{ModelError, SimvalError};
use crate::harness::TrialRecord;
use crate::sweep::SweepReport;

pub const OUTPUT_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub schema_version: String,
    pub mode: String,
    pub model: String,
    pub comparator: String,
    pub trials: i64,
    pub seed: u64,
    pub parallel: bool,
    pub sample_sizes: Vec<usize>,
}

fn fmt_f64(value: f64) -> String {
    format!("{value:.10}")
}

/// Create `<root>/<UTC timestamp>`, adding a numeric suffix if that run
/// directory already exists.
pub fn create_timestamped_output_dir(root: &Path) -> Result<PathBuf, SimvalError> {
    fs::create_dir_all(root)?;

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let mut output_dir = root.join(&timestamp);
    let mut counter = 1_u32;

    while output_dir.exists() {
        output_dir = root.join(format!("{timestamp}-{counter:02}"));
        counter += 1;
    }

    fs::create_dir_all(&output_dir)?;
    Ok(output_dir)
}

pub fn write_trials_csv<D: Components>(
    path: &Path,
    records: &[TrialRecord<D>],
) -> Result<(), SimvalError> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_path(path)?;

    let Some(first) = records.first() else {
        wtr.write_record(["trial"])?;
        wtr.flush()?;
        return Ok(());
    };
    let dim = first.true_parameters.len();
    let err_dim = first.error.components().len();

    let mut header = Vec::with_capacity(1 + 2 * dim + err_dim);
    header.push("trial".to_string());
    header.extend((0..dim).map(|k| format!("true_{k}")));
    header.extend((0..dim).map(|k| format!("inferred_{k}")));
    header.extend((0..err_dim).map(|k| format!("error_{k}")));
    wtr.write_record(&header)?;

    for record in records {
        let errors = record.error.components();
        for (expected, got) in [
            (dim, record.true_parameters.len()),
            (dim, record.inferred_parameters.len()),
            (err_dim, errors.len()),
        ] {
            if expected != got {
                return Err(ModelError::DimensionMismatch { expected, got }.into());
            }
        }

        let mut row = Vec::with_capacity(header.len());
        row.push(record.trial.to_string());
        row.extend(record.true_parameters.iter().map(|&v| fmt_f64(v)));
        row.extend(record.inferred_parameters.iter().map(|&v| fmt_f64(v)));
        row.extend(errors.iter().map(|&v| fmt_f64(v)));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_sweep_csv(path: &Path, report: &SweepReport) -> Result<(), SimvalError> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_path(path)?;
    let dim = report
        .points
        .first()
        .map(|p| p.summary.dimension)
        .unwrap_or(0);

    let mut header = vec![
        "sample_size".to_string(),
        "trials".to_string(),
        "overall_mean".to_string(),
    ];
    header.extend((0..dim).map(|k| format!("mean_error_{k}")));
    header.extend((0..dim).map(|k| format!("max_error_{k}")));
    wtr.write_record(&header)?;

    for point in &report.points {
        let mut row = vec![
            point.sample_size.to_string(),
            point.summary.trials.to_string(),
            fmt_f64(point.summary.overall_mean),
        ];
        row.extend(point.summary.mean_error.iter().map(|&v| fmt_f64(v)));
        row.extend(point.summary.max_error.iter().map(|&v| fmt_f64(v)));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SimvalError> {
    let payload = serde_json::to_string_pretty(value)?;
    fs::write(path, payload)?;
    Ok(())
}
