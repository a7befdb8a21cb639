//! IAM user needed to deploy a CDK stack through the CDK bootstrap roles.
//!
//! Custom policy statements are loaded from files before anything is declared
//! and attached verbatim to the deployers group.

use log::debug;

use super::{declare_version_parameter, SynthesizedStack, STACK_SUFFIX, VERSION};
use crate::config::SynthConfig;
use crate::error::SynthResult;
use crate::policy::{load_custom_statements, PolicyStatement, Principal};
use crate::template::{CfnValue, GroupProperties, Output, Resource, Template, UserProperties};

/// `arn:aws:iam::{account}:role/{role_prefix}{account}-*`
fn bootstrap_role_arn(role_prefix: &str) -> CfnValue {
    CfnValue::concat([
        CfnValue::literal("arn:aws:iam::"),
        CfnValue::account_id(),
        CfnValue::literal(format!(":role/{}", role_prefix)),
        CfnValue::account_id(),
        CfnValue::literal("-*"),
    ])
}

pub fn stack_deploy_iam(config: &SynthConfig) -> SynthResult<SynthesizedStack> {
    let target_stack = config.require_stack_name()?;
    let custom_statements = load_custom_statements(&config.custom_policy_paths)?;

    let stack_name = format!("{}{}", target_stack, STACK_SUFFIX);
    let name = stack_name.replacen(STACK_SUFFIX, "", 1);
    debug!("Declaring stack-deploy-iam for stack {}", name);

    let mut template = Template::new(format!(
        "This stack provisions an IAM user needed to deploy the {} CDK stack into this environment",
        target_stack
    ));

    let group_id = template.add_resource(
        &format!("{}-deployers", name),
        Resource::Group(GroupProperties::default()),
    )?;
    let mut group = Principal::group(group_id.as_str());
    group.attach(PolicyStatement::allow(
        ["iam:PassRole"],
        [bootstrap_role_arn("cdk-cfn-exec-role-")],
    ));
    group.attach(PolicyStatement::allow(
        ["sts:AssumeRole"],
        [bootstrap_role_arn("cdk-*-role-")],
    ));
    for statement in custom_statements {
        group.attach(statement);
    }
    group.declare_default_policy(&mut template)?;

    let user_id = template.add_resource(
        "DeployUser",
        Resource::User(UserProperties {
            user_name: Some(CfnValue::literal(format!("{}-deployer", name))),
            groups: vec![CfnValue::reference(group_id)],
        }),
    )?;

    template.add_output(
        "DeployUserName",
        Output::new(CfnValue::reference(user_id)).with_description("PublisherUser"),
    )?;
    template.add_output(
        "Version",
        Output::new(VERSION).with_description(
            "The version of the resources that are currently provisioned in this stack",
        ),
    )?;

    declare_version_parameter(
        &mut template,
        "StackDeployIAMVersion",
        format!("/stack-deploy-user/{}/version", name),
        "The version of the stack-deploy-user resources",
    )?;

    Ok(SynthesizedStack {
        stack_name,
        template,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SynthError;
    use serde_json::{json, Value};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config(stack_name: &str) -> SynthConfig {
        SynthConfig {
            stack_name: Some(stack_name.to_string()),
            ..SynthConfig::default()
        }
    }

    fn group_statements(stack: &SynthesizedStack, group: &str) -> Value {
        let template = serde_json::to_value(&stack.template).expect("serializes");
        template["Resources"][format!("{}DefaultPolicy", group)]["Properties"]["PolicyDocument"]
            ["Statement"]
            .clone()
    }

    #[test]
    fn test_requires_stack_name() {
        let result = stack_deploy_iam(&SynthConfig::default());
        assert!(matches!(result, Err(SynthError::MissingConfig("STACK_NAME"))));
    }

    #[test]
    fn test_bootstrap_role_statements() {
        let stack = stack_deploy_iam(&config("billing")).expect("synthesizes");
        assert_eq!(stack.stack_name, "billing-deploy-iam");

        let statements = group_statements(&stack, "billingdeployers");
        assert_eq!(
            statements,
            json!([
                {
                    "Effect": "Allow",
                    "Action": "iam:PassRole",
                    "Resource": {"Fn::Join": ["", [
                        "arn:aws:iam::",
                        {"Ref": "AWS::AccountId"},
                        ":role/cdk-cfn-exec-role-",
                        {"Ref": "AWS::AccountId"},
                        "-*"
                    ]]}
                },
                {
                    "Effect": "Allow",
                    "Action": "sts:AssumeRole",
                    "Resource": {"Fn::Join": ["", [
                        "arn:aws:iam::",
                        {"Ref": "AWS::AccountId"},
                        ":role/cdk-*-role-",
                        {"Ref": "AWS::AccountId"},
                        "-*"
                    ]]}
                }
            ])
        );
    }

    #[test]
    fn test_custom_statements_appended_verbatim() {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(
            br#"[{"Sid": "Extra", "Effect": "Allow", "Action": ["ssm:GetParameter"], "Resource": "arn:aws:ssm:*:*:parameter/billing/*"}]"#,
        )
        .expect("write");

        let stack = stack_deploy_iam(&SynthConfig {
            custom_policy_paths: vec![file.path().to_path_buf()],
            ..config("billing")
        })
        .expect("synthesizes");

        let statements = group_statements(&stack, "billingdeployers");
        assert_eq!(statements.as_array().map(Vec::len), Some(3));
        assert_eq!(
            statements[2],
            json!({
                "Sid": "Extra",
                "Effect": "Allow",
                "Action": "ssm:GetParameter",
                "Resource": "arn:aws:ssm:*:*:parameter/billing/*"
            })
        );
    }

    #[test]
    fn test_malformed_custom_policy_aborts() {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(b"{\"Action\": \"s3:*\"}").expect("write");

        let result = stack_deploy_iam(&SynthConfig {
            custom_policy_paths: vec![file.path().to_path_buf()],
            ..config("billing")
        });
        assert!(matches!(result, Err(SynthError::CustomPolicyFormat { .. })));
    }

    #[test]
    fn test_user_output_and_version() {
        let stack = stack_deploy_iam(&config("billing")).expect("synthesizes");
        let template = serde_json::to_value(&stack.template).expect("serializes");

        assert_eq!(
            template["Resources"]["DeployUser"]["Properties"]["UserName"],
            "billing-deployer"
        );
        assert_eq!(
            template["Outputs"]["DeployUserName"],
            json!({"Description": "PublisherUser", "Value": {"Ref": "DeployUser"}})
        );
        assert_eq!(template["Outputs"]["Version"]["Value"], "1");
        assert_eq!(
            template["Resources"]["StackDeployIAMVersion"]["Properties"]["Name"],
            "/stack-deploy-user/billing/version"
        );
    }
}
