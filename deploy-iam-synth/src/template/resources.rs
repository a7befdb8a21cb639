//! Resource types emitted by the deploy IAM stacks.

use serde::Serialize;

use super::CfnValue;
use crate::policy::PolicyDocument;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "Type", content = "Properties")]
pub enum Resource {
    #[serde(rename = "AWS::IAM::User")]
    User(UserProperties),
    #[serde(rename = "AWS::IAM::Group")]
    Group(GroupProperties),
    #[serde(rename = "AWS::IAM::Role")]
    Role(RoleProperties),
    #[serde(rename = "AWS::IAM::Policy")]
    Policy(PolicyProperties),
    #[serde(rename = "AWS::SSM::Parameter")]
    SsmParameter(SsmParameterProperties),
}

impl Resource {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::User(_) => "AWS::IAM::User",
            Self::Group(_) => "AWS::IAM::Group",
            Self::Role(_) => "AWS::IAM::Role",
            Self::Policy(_) => "AWS::IAM::Policy",
            Self::SsmParameter(_) => "AWS::SSM::Parameter",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<CfnValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<CfnValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<CfnValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleProperties {
    pub assume_role_policy_document: PolicyDocument,
}

/// Inline policy attached to groups and/or roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyProperties {
    pub policy_name: String,
    pub policy_document: PolicyDocument,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<CfnValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<CfnValue>,
}

/// SSM `String` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SsmParameterProperties {
    #[serde(rename = "Type")]
    pub parameter_type: String,
    pub name: String,
    pub description: String,
    pub value: CfnValue,
}

impl SsmParameterProperties {
    pub fn string(name: impl Into<String>, description: impl Into<String>, value: impl Into<CfnValue>) -> Self {
        Self {
            parameter_type: "String".to_string(),
            name: name.into(),
            description: description.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_renders_type_and_properties() {
        let user = Resource::User(UserProperties {
            user_name: Some(CfnValue::literal("svc-deployer")),
            groups: vec![CfnValue::reference("svcdeployers")],
        });
        assert_eq!(
            serde_json::to_value(&user).expect("serializes"),
            json!({
                "Type": "AWS::IAM::User",
                "Properties": {"UserName": "svc-deployer", "Groups": [{"Ref": "svcdeployers"}]}
            })
        );
    }

    #[test]
    fn test_group_without_name_has_empty_properties() {
        let group = Resource::Group(GroupProperties::default());
        assert_eq!(
            serde_json::to_value(&group).expect("serializes"),
            json!({"Type": "AWS::IAM::Group", "Properties": {}})
        );
        assert_eq!(group.type_name(), "AWS::IAM::Group");
    }

    #[test]
    fn test_ssm_string_parameter() {
        let parameter = Resource::SsmParameter(SsmParameterProperties::string(
            "/stack-deploy-user/app/version",
            "The version of the stack-deploy-user resources",
            "1",
        ));
        let value = serde_json::to_value(&parameter).expect("serializes");
        assert_eq!(value["Properties"]["Type"], "String");
        assert_eq!(value["Properties"]["Value"], "1");
    }
}
