//! Synthesis configuration.
//!
//! Each field corresponds to one environment variable read by the CLI
//! (`EVENT_SOURCE`, `SERVICE_NAME`, `EXPORT_PREFIX`, `ENABLE_VPC_PERMISSIONS`,
//! `PARAMETER_HASH`, `STACK_NAME`, `CUSTOM_POLICY`). Empty strings behave like
//! unset values.

use std::path::PathBuf;

use crate::error::{SynthError, SynthResult};

pub const DEFAULT_SERVICE_NAME: &str = "unknown-service";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthConfig {
    pub event_source: Option<String>,
    pub service_name: Option<String>,
    pub export_prefix: Option<String>,
    pub enable_vpc_permissions: bool,
    pub parameter_hash: Option<String>,
    pub stack_name: Option<String>,
    pub custom_policy_paths: Vec<PathBuf>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|value| !value.is_empty())
}

impl SynthConfig {
    pub fn require_event_source(&self) -> SynthResult<&str> {
        non_empty(self.event_source.as_ref()).ok_or(SynthError::MissingConfig("EVENT_SOURCE"))
    }

    pub fn require_stack_name(&self) -> SynthResult<&str> {
        non_empty(self.stack_name.as_ref()).ok_or(SynthError::MissingConfig("STACK_NAME"))
    }

    pub fn service_name(&self) -> &str {
        non_empty(self.service_name.as_ref()).unwrap_or(DEFAULT_SERVICE_NAME)
    }

    /// Export name prefix, always terminated by `-`. Falls back to the
    /// service name.
    pub fn export_prefix(&self) -> String {
        let prefix = non_empty(self.export_prefix.as_ref()).unwrap_or_else(|| self.service_name());
        if prefix.ends_with('-') {
            prefix.to_string()
        } else {
            format!("{}-", prefix)
        }
    }

    pub fn parameter_hash(&self) -> &str {
        non_empty(self.parameter_hash.as_ref()).unwrap_or_default()
    }
}

/// Interpret a feature-flag environment value: only `"1"` enables.
pub fn flag_enabled(value: &str) -> bool {
    value == "1"
}
