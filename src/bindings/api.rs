// API Functions - PyO3-exposed functions for Python
//
// Thin wrappers over the fingerprinting API. The GIL is released while walking.

use crate::errors::FingerprintError;
use crate::fingerprint::{self, FingerprintFilter};
use pyo3::exceptions::{PyOSError, PyValueError};
use pyo3::prelude::*;
use std::path::PathBuf;

fn to_py_err(err: FingerprintError) -> PyErr {
    match err {
        FingerprintError::Pattern { .. } => PyValueError::new_err(err.to_string()),
        FingerprintError::Walk { .. } | FingerprintError::Io { .. } => {
            PyOSError::new_err(err.to_string())
        }
    }
}

/// Create a unique hash to represent the state of a directory
///
/// Args:
///     dir_path (str): Root directory to walk
///     dir_filter (str): Regex selecting contributing directories (case-insensitive)
///     file_filter (str): Regex selecting contributing files (case-insensitive)
///
/// Returns:
///     str: 32-character md5 hex digest
///
/// Raises:
///     ValueError: If a filter is not a valid regex
///     OSError: If the walk hits an unreadable path
#[pyfunction]
#[pyo3(signature = (dir_path, dir_filter, file_filter))]
pub fn calculate_dir_hash(
    py: Python<'_>,
    dir_path: PathBuf,
    dir_filter: &str,
    file_filter: &str,
) -> PyResult<String> {
    py.detach(|| fingerprint::calculate_dir_hash(&dir_path, dir_filter, file_filter))
        .map_err(to_py_err)
}

/// Fingerprint several directories in parallel with one pair of filters
///
/// Returns:
///     list[str]: Digests in the same order as `dir_paths`
#[pyfunction]
#[pyo3(signature = (dir_paths, dir_filter, file_filter))]
pub fn calculate_dir_hashes(
    py: Python<'_>,
    dir_paths: Vec<PathBuf>,
    dir_filter: &str,
    file_filter: &str,
) -> PyResult<Vec<String>> {
    let filter = FingerprintFilter::new(dir_filter, file_filter);
    let results = py
        .detach(|| fingerprint::fingerprint_batch(&dir_paths, &filter))
        .map_err(to_py_err)?;
    results
        .into_iter()
        .map(|result| result.map_err(to_py_err))
        .collect()
}

/// Compute the md5 hex digest of a string
#[pyfunction]
pub fn get_str_hash(source_str: &str) -> String {
    fingerprint::get_str_hash(source_str)
}
