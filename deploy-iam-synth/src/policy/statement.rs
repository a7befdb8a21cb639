//! IAM policy statements and documents (deterministic JSON generation)

use std::collections::BTreeMap;
use std::ops::Deref;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::template::CfnValue;

pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    #[default]
    Allow,
    Deny,
}

/// A list that renders as a bare scalar when it holds exactly one element,
/// which is how IAM documents are conventionally written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OneOrMany<T>(pub Vec<T>);

impl<T> Deref for OneOrMany<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(values: Vec<T>) -> Self {
        Self(values)
    }
}

impl<T: Serialize> Serialize for OneOrMany<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0.as_slice() {
            [single] => single.serialize(serializer),
            many => many.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OneOrMany<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape<T> {
            Many(Vec<T>),
            One(T),
        }

        Ok(match Shape::deserialize(deserializer)? {
            Shape::Many(values) => Self(values),
            Shape::One(value) => Self(vec![value]),
        })
    }
}

/// A condition value. IAM accepts booleans and numbers for operators such as
/// `Bool` and `NumericLessThan`; those keep their JSON type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Bool(bool),
    Number(serde_json::Number),
    Value(CfnValue),
}

impl From<CfnValue> for ConditionValue {
    fn from(value: CfnValue) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        Self::Value(CfnValue::literal(value))
    }
}

impl From<String> for ConditionValue {
    fn from(value: String) -> Self {
        Self::Value(CfnValue::Literal(value))
    }
}

impl From<bool> for ConditionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Condition block: operator -> condition key -> values.
pub type Conditions = BTreeMap<String, BTreeMap<String, OneOrMany<ConditionValue>>>;

/// A single policy statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct PolicyStatement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(default)]
    pub effect: Effect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_principal: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<OneOrMany<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_action: Option<OneOrMany<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<OneOrMany<CfnValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_resource: Option<OneOrMany<CfnValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Conditions>,
}

impl PolicyStatement {
    pub fn new<A, R>(effect: Effect, actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator<Item = CfnValue>,
    {
        Self {
            sid: None,
            effect,
            principal: None,
            not_principal: None,
            action: Some(OneOrMany(actions.into_iter().map(Into::into).collect())),
            not_action: None,
            resource: Some(OneOrMany(resources.into_iter().collect())),
            not_resource: None,
            condition: None,
        }
    }

    pub fn allow<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator<Item = CfnValue>,
    {
        Self::new(Effect::Allow, actions, resources)
    }

    /// Trust statement letting `principal` assume a role.
    pub fn assume_role(principal: serde_json::Value) -> Self {
        Self {
            sid: None,
            effect: Effect::Allow,
            principal: Some(principal),
            not_principal: None,
            action: Some(OneOrMany(vec!["sts:AssumeRole".to_string()])),
            not_action: None,
            resource: None,
            not_resource: None,
            condition: None,
        }
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        if conditions.is_empty() {
            self.condition = None;
        } else {
            self.condition = Some(conditions);
        }
        self
    }

    /// Add a single-valued condition, e.g. `StringEquals: {"events:source": "x"}`.
    pub fn with_condition(
        mut self,
        operator: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<ConditionValue>,
    ) -> Self {
        self.condition
            .get_or_insert_with(Conditions::new)
            .entry(operator.into())
            .or_default()
            .insert(key.into(), OneOrMany(vec![value.into()]));
        self
    }

    pub fn actions(&self) -> &[String] {
        self.action.as_deref().unwrap_or_default()
    }

    pub fn resources(&self) -> &[CfnValue] {
        self.resource.as_deref().unwrap_or_default()
    }

    /// Check the shape of a statement read from outside the crate.
    pub fn validate(&self) -> Result<(), String> {
        match (&self.action, &self.not_action) {
            (Some(_), Some(_)) => return Err("both Action and NotAction are set".to_string()),
            (None, None) => return Err("missing Action or NotAction".to_string()),
            (Some(actions), None) | (None, Some(actions)) if actions.is_empty() => {
                return Err("action list is empty".to_string())
            }
            _ => {}
        }

        match (&self.resource, &self.not_resource) {
            (Some(_), Some(_)) => Err("both Resource and NotResource are set".to_string()),
            (None, None) if self.principal.is_none() && self.not_principal.is_none() => {
                Err("missing Resource or NotResource".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// An IAM policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<PolicyStatement>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_action_and_resource_render_as_scalars() {
        let statement = PolicyStatement::allow(["s3:ListAllMyBuckets"], [CfnValue::literal("*")]);
        assert_eq!(
            serde_json::to_value(&statement).expect("serializes"),
            json!({"Effect": "Allow", "Action": "s3:ListAllMyBuckets", "Resource": "*"})
        );
    }

    #[test]
    fn test_multiple_actions_render_as_list() {
        let statement = PolicyStatement::allow(
            ["cloudformation:ValidateTemplate", "cloudformation:ListExports"],
            [CfnValue::literal("*")],
        );
        let value = serde_json::to_value(&statement).expect("serializes");
        assert_eq!(
            value["Action"],
            json!(["cloudformation:ValidateTemplate", "cloudformation:ListExports"])
        );
    }

    #[test]
    fn test_condition_rendering() {
        let statement = PolicyStatement::allow(["events:PutEvents"], [CfnValue::literal("*")])
            .with_condition("StringEquals", "events:source", "com.example.orders");
        let value = serde_json::to_value(&statement).expect("serializes");
        assert_eq!(
            value["Condition"],
            json!({"StringEquals": {"events:source": "com.example.orders"}})
        );
    }

    #[test]
    fn test_deserialize_defaults_effect_to_allow() {
        let statement: PolicyStatement = serde_json::from_value(json!({
            "Action": ["sqs:SendMessage"],
            "Resource": "arn:aws:sqs:us-east-1:123456789012:queue"
        }))
        .expect("deserializes");
        assert_eq!(statement.effect, Effect::Allow);
        assert_eq!(statement.actions(), ["sqs:SendMessage".to_string()]);
        assert!(statement.validate().is_ok());
    }

    #[test]
    fn test_boolean_and_numeric_conditions_keep_their_type() {
        let raw = json!({
            "Effect": "Deny",
            "Action": "s3:*",
            "Resource": "*",
            "Condition": {
                "Bool": {"aws:SecureTransport": false},
                "NumericLessThan": {"s3:max-keys": 10},
                "StringEquals": {"aws:RequestedRegion": ["eu-west-1", "eu-central-1"]}
            }
        });
        let statement: PolicyStatement = serde_json::from_value(raw.clone()).expect("parses");
        assert_eq!(
            statement.condition.as_ref().map(|c| c["Bool"]["aws:SecureTransport"].to_vec()),
            Some(vec![ConditionValue::Bool(false)])
        );
        assert_eq!(serde_json::to_value(&statement).expect("serializes"), raw);
    }

    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        let result: Result<PolicyStatement, _> = serde_json::from_value(json!({
            "Action": "s3:GetObject",
            "Resource": "*",
            "Actions": "s3:PutObject"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_requires_action() {
        let statement: PolicyStatement =
            serde_json::from_value(json!({"Effect": "Deny", "Resource": "*"})).expect("parses");
        assert_eq!(
            statement.validate(),
            Err("missing Action or NotAction".to_string())
        );
    }

    #[test]
    fn test_validate_requires_resource() {
        let statement: PolicyStatement =
            serde_json::from_value(json!({"Action": "s3:GetObject"})).expect("parses");
        assert_eq!(
            statement.validate(),
            Err("missing Resource or NotResource".to_string())
        );
    }

    #[test]
    fn test_document_version() {
        let document = PolicyDocument::new(vec![]);
        assert_eq!(document.version, "2012-10-17");
    }
}
