//! Locating the external programs RSD drives
//!
//! This module provides a unified way to find blastp, kalign, clustalw and
//! codeml, plus the amino acid rate matrix codeml reads.

use crate::error::{Result, RsdError};
use std::path::{Path, PathBuf};

/// Environment variable naming a directory searched before PATH.
pub const BIN_DIR_ENV: &str = "RSD_BIN_DIR";

/// File name of the Jones-Taylor-Thornton rate matrix shipped with PAML.
pub const RATE_MATRIX_NAME: &str = "jones.dat";

/// Find an external binary by name
///
/// Search order:
/// 1. `$RSD_BIN_DIR`
/// 2. Same directory as current executable
/// 3. System PATH
pub fn find_binary(name: &str) -> Result<PathBuf> {
    // 1. Explicit override directory
    if let Ok(dir) = std::env::var(BIN_DIR_ENV) {
        let binary = PathBuf::from(dir).join(name);
        if binary.is_file() {
            return Ok(binary);
        }
    }

    // 2. Try same directory as the current executable (bundled installs)
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let binary = exe_dir.join(name);
            if binary.is_file() {
                return Ok(binary);
            }
        }
    }

    // 3. Fall back to PATH
    if let Ok(path) = which::which(name) {
        return Ok(path);
    }

    Err(RsdError::BinaryNotFound(name.to_string()))
}

/// Find codeml's rate matrix relative to the codeml binary.
///
/// PAML installs keep `jones.dat` in a `dat/` directory next to `bin/`;
/// some packages place it beside the binary or under `share/paml`.
pub fn find_rate_matrix(codeml: &Path) -> Result<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(bin_dir) = codeml.parent() {
        candidates.push(bin_dir.join(RATE_MATRIX_NAME));
        candidates.push(bin_dir.join("dat").join(RATE_MATRIX_NAME));
        if let Some(prefix) = bin_dir.parent() {
            candidates.push(prefix.join("dat").join(RATE_MATRIX_NAME));
            candidates.push(prefix.join("share/paml/dat").join(RATE_MATRIX_NAME));
        }
    }

    candidates
        .into_iter()
        .find(|path| path.is_file())
        .ok_or_else(|| {
            RsdError::InvalidConfig(format!(
                "{RATE_MATRIX_NAME} not found near {}; set Config::rate_matrix",
                codeml.display()
            ))
        })
}
