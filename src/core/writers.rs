//! Writers for finalized profile tables.
//!
//! Profiles are written as plain CSV with one row per bin:
//! `bin_center,mean,stddev,weight_total,count`. The same file can be read
//! back by `loaders::load_profile_csv` for standalone plotting.

use std::fs::{self, File};
use std::path::Path;

use thiserror::Error;

use crate::processors::profile::Profile;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Write a finalized profile to CSV.
///
/// # Arguments
///
/// * `path` - Output file path (parent directories will be created if needed)
/// * `profile` - The finalized profile to serialize
///
/// # Errors
///
/// Returns an error if directories cannot be created or any row fails to
/// write.
pub fn write_profile_csv(path: &Path, profile: &Profile) -> Result<()> {
    ensure_parent_dirs(path)?;

    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut writer = csv::Writer::from_writer(file);

    let csv_err = |e: csv::Error| WriteError::CsvError {
        path: path.display().to_string(),
        source: e,
    };

    writer
        .write_record(["bin_center", "mean", "stddev", "weight_total", "count"])
        .map_err(csv_err)?;

    for i in 0..profile.n_bins() {
        writer
            .write_record(&[
                format!("{:.12e}", profile.x[i]),
                format!("{:.12e}", profile.mean[i]),
                format!("{:.12e}", profile.stddev[i]),
                format!("{:.12e}", profile.weight_total[i]),
                profile.count[i].to_string(),
            ])
            .map_err(csv_err)?;
    }

    writer.flush().map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}
