//! Loaders for particle tables and saved profile tables.
//!
//! Particle CSVs carry one row per particle with `x`, `y`, `z` position
//! columns; every other numeric column becomes a named field. Headers may
//! qualify a field with a namespace (`gas:density`); bare names land in
//! the default `gas` namespace.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use thiserror::Error;

use super::dataset::{Dataset, DatasetError, FieldId};

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("missing required columns: {0}")]
    MissingColumns(String),

    #[error("row {row}: failed to parse '{value}' in column '{column}'")]
    ParseError {
        row: usize,
        column: String,
        value: String,
    },

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Columns of a saved profile table, read back for standalone plotting.
#[derive(Debug, Clone)]
pub struct ProfileTable {
    pub x: Vec<f64>,
    pub mean: Vec<f64>,
    pub stddev: Vec<f64>,
}

/// Load a particle dataset from a CSV file.
///
/// The header must contain `x`, `y`, and `z` columns (case-insensitive).
/// Every remaining column is parsed as a scalar field; its header is
/// interpreted as a [`FieldId`] spec.
///
/// # Arguments
///
/// * `path` - Path to the CSV file
///
/// # Errors
///
/// Returns an error if the file cannot be read, the position columns are
/// missing, a cell fails to parse as a float, or the file has no data rows.
pub fn load_particle_csv(path: &Path) -> Result<Dataset> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers()?.clone();

    let mut axis_cols: [Option<usize>; 3] = [None, None, None];
    let mut field_cols: Vec<(usize, FieldId)> = Vec::new();

    for (idx, header) in headers.iter().enumerate() {
        match header.to_ascii_lowercase().as_str() {
            "x" => axis_cols[0] = Some(idx),
            "y" => axis_cols[1] = Some(idx),
            "z" => axis_cols[2] = Some(idx),
            _ => {
                let field: FieldId = header.parse()?;
                field_cols.push((idx, field));
            }
        }
    }

    let missing: Vec<&str> = ["x", "y", "z"]
        .iter()
        .zip(axis_cols.iter())
        .filter(|(_, col)| col.is_none())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(LoaderError::MissingColumns(missing.join(", ")));
    }
    let axis_cols = match axis_cols {
        [Some(x), Some(y), Some(z)] => [x, y, z],
        // Ruled out by the missing-column check above.
        _ => return Err(LoaderError::MissingColumns("x, y, z".to_string())),
    };

    let mut positions: Vec<[f64; 3]> = Vec::new();
    let mut columns: BTreeMap<FieldId, Vec<f64>> = field_cols
        .iter()
        .map(|(_, field)| (field.clone(), Vec::new()))
        .collect();

    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;

        let mut position = [0.0f64; 3];
        for (axis, &col) in axis_cols.iter().enumerate() {
            position[axis] = parse_cell(&record, col, &headers[col], row_idx)?;
        }
        positions.push(position);

        for (col, field) in &field_cols {
            let value = parse_cell(&record, *col, &headers[*col], row_idx)?;
            // Column was pre-inserted above, so the lookup cannot fail.
            if let Some(values) = columns.get_mut(field) {
                values.push(value);
            }
        }
    }

    if positions.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    Ok(Dataset::new(positions, columns)?)
}

/// Load a saved profile CSV (`bin_center,mean,stddev,...`) for plotting.
///
/// Only the first three columns are read; any trailing columns (such as
/// `weight_total` and `count` written by the profile writer) are ignored.
pub fn load_profile_csv(path: &Path) -> Result<ProfileTable> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader.headers()?.clone();
    if headers.len() < 3 {
        return Err(LoaderError::MissingColumns(
            "bin_center, mean, stddev".to_string(),
        ));
    }

    let mut table = ProfileTable {
        x: Vec::new(),
        mean: Vec::new(),
        stddev: Vec::new(),
    };

    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        table.x.push(parse_cell(&record, 0, &headers[0], row_idx)?);
        table
            .mean
            .push(parse_cell(&record, 1, &headers[1], row_idx)?);
        table
            .stddev
            .push(parse_cell(&record, 2, &headers[2], row_idx)?);
    }

    if table.x.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    Ok(table)
}

fn parse_cell(record: &csv::StringRecord, col: usize, column: &str, row: usize) -> Result<f64> {
    let raw = record.get(col).unwrap_or_default();
    raw.parse::<f64>().map_err(|_| LoaderError::ParseError {
        row,
        column: column.to_string(),
        value: raw.to_string(),
    })
}
