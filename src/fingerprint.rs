//! Directory state fingerprinting.
//!
//! Folds the modification times of a filtered part of a directory tree into a
//! single MD5 digest. Callers store the digest and compare it later to decide
//! whether cached data derived from the tree is stale. Equality means
//! "probably unchanged": only timestamps are tracked, never content.

use crate::errors::FingerprintError;
use rayon::prelude::*;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use walkdir::WalkDir;

/// MD5 hex digest of a string (32 lowercase hex characters)
pub fn get_str_hash(source: &str) -> String {
    let digest = md5::compute(source.as_bytes());
    format!("{:x}", digest)
}

/// Fingerprint `dir_path`, counting directories whose name matches `dir_filter`
/// and the files directly inside them whose name matches `file_filter`.
///
/// Both filters are case-insensitive regular expressions with search semantics.
pub fn calculate_dir_hash(
    dir_path: impl AsRef<Path>,
    dir_filter: &str,
    file_filter: &str,
) -> Result<String, FingerprintError> {
    FingerprintFilter::new(dir_filter, file_filter)
        .compile()?
        .fingerprint(dir_path.as_ref())
}

/// Fingerprint several roots in parallel. Results keep the order of `roots`.
///
/// The outer error is reserved for an invalid filter; walk failures are reported per root.
pub fn fingerprint_batch(
    roots: &[PathBuf],
    filter: &FingerprintFilter,
) -> Result<Vec<Result<String, FingerprintError>>, FingerprintError> {
    let compiled = filter.compile()?;
    Ok(roots
        .par_iter()
        .map(|root| compiled.fingerprint(root))
        .collect())
}

/// Name filters selecting what contributes to a fingerprint.
///
/// Plain data so callers can keep it in their own JSON/TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintFilter {
    /// Matched against each directory's base name
    pub dir_pattern: String,
    /// Matched against the names of entries directly inside a matching directory
    pub file_pattern: String,
}

impl FingerprintFilter {
    pub fn new(dir_pattern: impl Into<String>, file_pattern: impl Into<String>) -> Self {
        Self {
            dir_pattern: dir_pattern.into(),
            file_pattern: file_pattern.into(),
        }
    }

    pub fn compile(&self) -> Result<CompiledFilter, FingerprintError> {
        Ok(CompiledFilter {
            dir_regex: build_regex("directory", &self.dir_pattern)?,
            file_regex: build_regex("file", &self.file_pattern)?,
        })
    }
}

fn build_regex(which: &'static str, pattern: &str) -> Result<Regex, FingerprintError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| FingerprintError::Pattern {
            which,
            pattern: pattern.to_string(),
            source,
        })
}

/// A `FingerprintFilter` with its patterns compiled, reusable across roots
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    dir_regex: Regex,
    file_regex: Regex,
}

impl CompiledFilter {
    pub fn matches_dir(&self, name: &str) -> bool {
        self.dir_regex.is_match(name)
    }

    pub fn matches_file(&self, name: &str) -> bool {
        self.file_regex.is_match(name)
    }

    /// Digest of the decimal mtime sum under `root`
    pub fn fingerprint(&self, root: &Path) -> Result<String, FingerprintError> {
        let sum = self.mtime_sum(root)?;
        let digest = get_str_hash(&sum.to_string());
        debug!("Fingerprint of {:?}: {}", root, digest);
        Ok(digest)
    }

    /// Sum of contributing modification times, in nanoseconds since the Unix epoch.
    ///
    /// Every directory is descended into; the directory filter only decides
    /// whether a directory and its direct files are counted.
    pub fn mtime_sum(&self, root: &Path) -> Result<i128, FingerprintError> {
        let mut sum: i128 = 0;
        let mut dirs_counted = 0usize;
        let mut files_counted = 0usize;
        // Whether the directory at each depth of the current path matched
        let mut matched_at_depth: Vec<bool> = Vec::new();

        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry.map_err(|source| FingerprintError::Walk {
                path: source
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf()),
                source,
            })?;
            let depth = entry.depth();
            let name = entry.file_name().to_string_lossy();

            if entry.file_type().is_dir() {
                let matched = self.matches_dir(&name);
                matched_at_depth.truncate(depth);
                matched_at_depth.push(matched);
                if matched {
                    sum += mtime_nanos(entry.path())?.0;
                    dirs_counted += 1;
                }
                continue;
            }

            // Files (and symlinks) only count inside a matching parent directory
            let parent_matched = depth
                .checked_sub(1)
                .and_then(|parent| matched_at_depth.get(parent))
                .copied()
                .unwrap_or(false);
            if !parent_matched || !self.matches_file(&name) {
                continue;
            }

            let (nanos, is_dir) = mtime_nanos(entry.path())?;
            // A symlink to a directory is neither walked nor counted as a file
            if is_dir {
                continue;
            }
            sum += nanos;
            files_counted += 1;
        }

        debug!(
            "Walked {:?}: {} directories and {} files contributed",
            root, dirs_counted, files_counted
        );
        Ok(sum)
    }
}

/// Modification time (following symlinks) and whether the target is a directory
fn mtime_nanos(path: &Path) -> Result<(i128, bool), FingerprintError> {
    let io_error = |source: std::io::Error| FingerprintError::Io {
        path: path.to_path_buf(),
        source,
    };
    let metadata = fs::metadata(path).map_err(io_error)?;
    let modified = metadata.modified().map_err(io_error)?;
    Ok((system_time_nanos(modified), metadata.is_dir()))
}

fn system_time_nanos(time: SystemTime) -> i128 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => after.as_nanos() as i128,
        Err(before) => -(before.duration().as_nanos() as i128),
    }
}
