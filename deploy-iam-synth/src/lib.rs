//! This crate provides the core logic for the deploy IAM stacks:
//! - Resource qualifier formatting (ARN assembly per service naming convention)
//! - Policy stores and the deploy-time qualifier-injection pass
//! - CloudFormation template synthesis for the eventbridge, serverless and
//!   stack deploy stacks
//!

mod config;
mod error;
pub mod policy;
pub mod stacks;
pub mod template;

// Re-exports for a small, focused public API
pub use config::{flag_enabled, SynthConfig, DEFAULT_SERVICE_NAME};
pub use error::{SynthError, SynthResult};
pub use policy::{
    apply_policy_stores, format_resource_qualifier, load_custom_statements, qualifier_delimiter,
    Effect, PolicyEntry, PolicyStatement, PolicyStore, Principal, ResourceSource,
};
pub use stacks::{synthesize, StackKind, SynthesizedStack};
pub use template::{CfnValue, Template};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatting_sample_qualifiers() {
        let resources = format_resource_qualifier(
            "S3",
            &CfnValue::literal("arn:aws:s3:::"),
            &[CfnValue::literal("svc*"), CfnValue::literal("svc*/*")],
        );
        assert_eq!(
            resources,
            vec![
                CfnValue::literal("arn:aws:s3:::svc*"),
                CfnValue::literal("arn:aws:s3:::svc*/*")
            ]
        );
    }
}
