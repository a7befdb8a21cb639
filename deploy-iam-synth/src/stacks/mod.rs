//! Stack declarations.
//!
//! Every stack is a single synchronous pass that declares resources into a
//! fresh [`Template`]. The resources version (`VERSION`) is used for auditing
//! which role a project is using and only changes on breaking changes.

mod eventbridge;
mod serverless;
mod stack_deploy;

use std::fmt;
use std::str::FromStr;

use log::info;

use crate::config::SynthConfig;
use crate::error::SynthResult;
use crate::template::{CfnValue, Resource, SsmParameterProperties, Template};

pub use eventbridge::eventbridge_iam;
pub use serverless::serverless_deploy_iam;
pub use stack_deploy::stack_deploy_iam;

pub const STACK_SUFFIX: &str = "-deploy-iam";
pub const VERSION: &str = "1";

/// The stacks this crate can synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackKind {
    EventBridge,
    ServerlessDeploy,
    StackDeploy,
}

impl StackKind {
    pub const ALL: [StackKind; 3] = [Self::EventBridge, Self::ServerlessDeploy, Self::StackDeploy];

    pub fn name(self) -> &'static str {
        match self {
            Self::EventBridge => "eventbridge-iam",
            Self::ServerlessDeploy => "serverless-deploy-iam",
            Self::StackDeploy => "stack-deploy-iam",
        }
    }

    /// Environment variables the stack reads.
    pub fn variables(self) -> &'static [&'static str] {
        match self {
            Self::EventBridge => &["EVENT_SOURCE"],
            Self::ServerlessDeploy => &[
                "SERVICE_NAME",
                "EXPORT_PREFIX",
                "ENABLE_VPC_PERMISSIONS",
                "PARAMETER_HASH",
            ],
            Self::StackDeploy => &["STACK_NAME", "CUSTOM_POLICY"],
        }
    }
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StackKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown stack '{}'", s))
    }
}

/// A template together with the name the stack is deployed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedStack {
    pub stack_name: String,
    pub template: Template,
}

/// Synthesize one stack from configuration.
pub fn synthesize(kind: StackKind, config: &SynthConfig) -> SynthResult<SynthesizedStack> {
    let stack = match kind {
        StackKind::EventBridge => eventbridge_iam(config)?,
        StackKind::ServerlessDeploy => serverless_deploy_iam(config)?,
        StackKind::StackDeploy => stack_deploy_iam(config)?,
    };
    info!(
        "Synthesized {} ({} resources, {} parameters, {} outputs)",
        stack.stack_name,
        stack.template.resources().len(),
        stack.template.parameters().len(),
        stack.template.outputs().len()
    );
    Ok(stack)
}

/// Record the resources version in SSM for auditing.
fn declare_version_parameter(
    template: &mut Template,
    construct_id: &str,
    parameter_name: String,
    description: &str,
) -> SynthResult<String> {
    template.add_resource(
        construct_id,
        Resource::SsmParameter(SsmParameterProperties::string(
            parameter_name,
            description,
            VERSION,
        )),
    )
}

/// `arn:aws:iam::{account}{rest}`
fn iam_arn(rest: &str) -> CfnValue {
    CfnValue::concat([
        CfnValue::literal("arn:aws:iam::"),
        CfnValue::account_id(),
        CfnValue::literal(rest),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_kind_round_trips_through_name() {
        for kind in StackKind::ALL {
            assert_eq!(kind.name().parse::<StackKind>(), Ok(kind));
        }
        assert!("cdk-iam".parse::<StackKind>().is_err());
    }

    #[test]
    fn test_iam_arn() {
        assert_eq!(
            iam_arn(":role/cdk-*"),
            CfnValue::Join(vec![
                CfnValue::literal("arn:aws:iam::"),
                CfnValue::account_id(),
                CfnValue::literal(":role/cdk-*"),
            ])
        );
    }
}
