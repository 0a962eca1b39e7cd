//! CSV import and export.
//!
//! Generated datasets and batch results are written with the `csv` crate.
//! Area tables are read back as field-keyed mappings so that a bad cell only
//! affects its own row.

use crate::data::{DataFrame, FieldMap, RiskLevel};
use crate::error::Result;
use crate::strategy::batch::BatchRow;
use serde::Serialize;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

/// Writes every column of `df` with a header row.
///
/// # Errors
///
/// Returns an I/O or CSV error if writing fails.
pub fn write_dataset<W: Write>(df: &DataFrame, writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(df.column_names())?;
    for i in 0..df.n_rows() {
        out.write_record(df.iter_columns().map(|(_, column)| column[i].to_string()))?;
    }
    out.flush()?;
    Ok(())
}

/// Writes `df` to a CSV file at `path`.
///
/// # Errors
///
/// Returns an I/O or CSV error if the file cannot be written.
pub fn write_dataset_csv(df: &DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    write_dataset(df, std::fs::File::create(path)?)?;
    info!(path = %path.display(), n_rows = df.n_rows(), "dataset written");
    Ok(())
}

#[derive(Serialize)]
struct BatchCsvRow<'a> {
    #[serde(rename = "Area_ID")]
    area_id: usize,
    #[serde(rename = "Predicted_Demand")]
    predicted_demand: Option<f64>,
    #[serde(rename = "Waste_Risk")]
    waste_risk: Option<RiskLevel>,
    #[serde(rename = "Confidence")]
    confidence: Option<f64>,
    #[serde(rename = "Recommendations")]
    recommendations: String,
    #[serde(rename = "Error")]
    error: Option<&'a str>,
}

/// Writes one line per batch row. Failed rows keep their `Area_ID` and carry
/// the error text; their result columns are empty.
///
/// # Errors
///
/// Returns an I/O or CSV error if writing fails.
pub fn write_batch<W: Write>(rows: &[BatchRow], writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    for row in rows {
        let error = row.outcome.as_ref().err().map(ToString::to_string);
        let line = match &row.outcome {
            Ok(result) => BatchCsvRow {
                area_id: row.area_id,
                predicted_demand: Some(result.reported_demand()),
                waste_risk: Some(result.waste_risk),
                confidence: Some(result.reported_confidence()),
                recommendations: result
                    .recommendations
                    .iter()
                    .map(|c| format!("{c:?}"))
                    .collect::<Vec<_>>()
                    .join(";"),
                error: None,
            },
            Err(_) => BatchCsvRow {
                area_id: row.area_id,
                predicted_demand: None,
                waste_risk: None,
                confidence: None,
                recommendations: String::new(),
                error: error.as_deref(),
            },
        };
        out.serialize(line)?;
    }
    out.flush()?;
    Ok(())
}

/// Writes batch rows to a CSV file at `path`.
///
/// # Errors
///
/// Returns an I/O or CSV error if the file cannot be written.
pub fn write_batch_csv(rows: &[BatchRow], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    write_batch(rows, std::fs::File::create(path)?)?;
    info!(path = %path.display(), n_rows = rows.len(), "batch results written");
    Ok(())
}

/// Reads an area table as one mapping per data row.
///
/// Cells that are empty or do not parse as a number are left out of their
/// row's mapping, so evaluation reports them as missing features.
///
/// # Errors
///
/// Returns a CSV error for unreadable input or ragged rows.
pub fn read_areas<R: Read>(reader: R) -> Result<Vec<FieldMap>> {
    let mut input = csv::Reader::from_reader(reader);
    let headers = input.headers()?.clone();
    let mut rows = Vec::new();
    for record in input.records() {
        let record = record?;
        let fields: FieldMap = headers
            .iter()
            .zip(record.iter())
            .filter_map(|(name, cell)| {
                cell.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(|v| (name.trim().to_string(), v))
            })
            .collect();
        rows.push(fields);
    }
    Ok(rows)
}

/// Reads an area table from a CSV file at `path`.
///
/// # Errors
///
/// Returns an I/O or CSV error if the file cannot be read.
pub fn read_areas_csv(path: impl AsRef<Path>) -> Result<Vec<FieldMap>> {
    read_areas(std::fs::File::open(path)?)
}
