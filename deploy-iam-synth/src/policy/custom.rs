//! Custom policy statements supplied as JSON files.
//!
//! Each file holds a JSON array of raw policy statement objects. Every file is
//! read and validated before anything is returned, so a malformed file never
//! results in a partially applied policy set.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use super::statement::PolicyStatement;
use crate::error::{SynthError, SynthResult};

/// Load statements from every file, in the order the paths are given.
pub fn load_custom_statements(paths: &[PathBuf]) -> SynthResult<Vec<PolicyStatement>> {
    if paths.is_empty() {
        return Ok(Vec::new());
    }

    info!("custom policy statement(s) has been provided");

    let mut statements = Vec::new();
    for path in paths {
        statements.extend(load_statement_file(path)?);
        info!("policy loaded from: {}", path.display());
    }
    Ok(statements)
}

fn load_statement_file(path: &Path) -> SynthResult<Vec<PolicyStatement>> {
    let content = fs::read_to_string(path).map_err(|source| SynthError::CustomPolicyRead {
        path: path.to_path_buf(),
        source,
    })?;

    let statements: Vec<PolicyStatement> =
        serde_json::from_str(&content).map_err(|source| SynthError::CustomPolicyFormat {
            path: path.to_path_buf(),
            source,
        })?;

    for (index, statement) in statements.iter().enumerate() {
        statement
            .validate()
            .map_err(|reason| SynthError::InvalidCustomStatement {
                path: path.to_path_buf(),
                index,
                reason,
            })?;
    }

    Ok(statements)
}
