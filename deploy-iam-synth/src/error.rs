//! Error types for stack synthesis.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynthError {
    /// A required configuration value (named after its environment variable) is unset.
    #[error("No {0} defined")]
    MissingConfig(&'static str),

    #[error("Failed to read custom policy file {}: {source}", .path.display())]
    CustomPolicyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Custom policy statements in {} should be a JSON array of statement objects: {source}",
        .path.display()
    )]
    CustomPolicyFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid custom policy statement #{index} in {}: {reason}", .path.display())]
    InvalidCustomStatement {
        path: PathBuf,
        index: usize,
        reason: String,
    },

    #[error("Logical id '{0}' is declared more than once")]
    DuplicateLogicalId(String),

    #[error("Template serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type SynthResult<T> = Result<T, SynthError>;
