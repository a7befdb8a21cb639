//! CloudFormation values: literals and the few intrinsic functions the stacks need.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

const PSEUDO_REGION: &str = "AWS::Region";
const PSEUDO_ACCOUNT_ID: &str = "AWS::AccountId";

/// A template value that is either known at synthesis time or resolved by
/// CloudFormation at deploy time.
///
/// Values built through [`CfnValue::concat`] are normalized: nested joins are
/// flattened, adjacent literals are merged and a join made only of literals
/// collapses into a single literal.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawValue")]
pub enum CfnValue {
    Literal(String),
    Ref(String),
    GetAtt { logical_id: String, attribute: String },
    Join(Vec<CfnValue>),
}

impl CfnValue {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn reference(logical_id: impl Into<String>) -> Self {
        Self::Ref(logical_id.into())
    }

    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::GetAtt {
            logical_id: logical_id.into(),
            attribute: attribute.into(),
        }
    }

    /// The `AWS::Region` pseudo parameter.
    pub fn region() -> Self {
        Self::reference(PSEUDO_REGION)
    }

    /// The `AWS::AccountId` pseudo parameter.
    pub fn account_id() -> Self {
        Self::reference(PSEUDO_ACCOUNT_ID)
    }

    /// Concatenate values, rendering as `Fn::Join` only when a deploy-time
    /// value is involved.
    pub fn concat<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = CfnValue>,
    {
        let mut flattened = Vec::new();
        for part in parts {
            push_part(&mut flattened, part);
        }

        match flattened.len() {
            0 => Self::Literal(String::new()),
            1 => flattened
                .pop()
                .unwrap_or_else(|| Self::Literal(String::new())),
            _ => Self::Join(flattened),
        }
    }

    /// Only an empty literal counts as empty; deploy-time values never do.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Literal(value) if value.is_empty())
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(value) => Some(value),
            _ => None,
        }
    }
}

fn push_part(out: &mut Vec<CfnValue>, part: CfnValue) {
    match part {
        CfnValue::Join(inner) => {
            for nested in inner {
                push_part(out, nested);
            }
        }
        CfnValue::Literal(value) if value.is_empty() => {}
        CfnValue::Literal(value) => {
            if let Some(CfnValue::Literal(last)) = out.last_mut() {
                last.push_str(&value);
            } else {
                out.push(CfnValue::Literal(value));
            }
        }
        other => out.push(other),
    }
}

impl From<&str> for CfnValue {
    fn from(value: &str) -> Self {
        Self::literal(value)
    }
}

impl From<String> for CfnValue {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

impl Serialize for CfnValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Literal(value) => serializer.serialize_str(value),
            Self::Ref(logical_id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", logical_id)?;
                map.end()
            }
            Self::GetAtt {
                logical_id,
                attribute,
            } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAtt", &[logical_id, attribute])?;
                map.end()
            }
            Self::Join(parts) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Join", &("", parts))?;
                map.end()
            }
        }
    }
}

/// Wire shapes accepted when reading values from hand-written policy files.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Literal(String),
    Ref(RawRef),
    GetAtt(RawGetAtt),
    Join(RawJoin),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRef {
    #[serde(rename = "Ref")]
    logical_id: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGetAtt {
    #[serde(rename = "Fn::GetAtt")]
    target: (String, String),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawJoin {
    #[serde(rename = "Fn::Join")]
    join: (String, Vec<CfnValue>),
}

impl From<RawValue> for CfnValue {
    fn from(raw: RawValue) -> Self {
        match raw {
            RawValue::Literal(value) => Self::Literal(value),
            RawValue::Ref(RawRef { logical_id }) => Self::Ref(logical_id),
            RawValue::GetAtt(RawGetAtt {
                target: (logical_id, attribute),
            }) => Self::GetAtt {
                logical_id,
                attribute,
            },
            RawValue::Join(RawJoin {
                join: (delimiter, parts),
            }) => {
                let mut interleaved = Vec::with_capacity(parts.len() * 2);
                for (index, part) in parts.into_iter().enumerate() {
                    if index > 0 {
                        interleaved.push(Self::literal(delimiter.as_str()));
                    }
                    interleaved.push(part);
                }
                Self::concat(interleaved)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_concat_of_literals_collapses() {
        let value = CfnValue::concat([
            CfnValue::literal("arn:aws:s3:::"),
            CfnValue::literal(""),
            CfnValue::literal("svc*"),
        ]);
        assert_eq!(value, CfnValue::literal("arn:aws:s3:::svc*"));
    }

    #[test]
    fn test_concat_merges_adjacent_literals_around_refs() {
        let value = CfnValue::concat([
            "arn:aws:lambda:".into(),
            CfnValue::region(),
            ":".into(),
            CfnValue::account_id(),
            ":function:".into(),
            "jest*".into(),
        ]);
        assert_eq!(
            serde_json::to_value(&value).expect("serializes"),
            json!({"Fn::Join": ["", [
                "arn:aws:lambda:",
                {"Ref": "AWS::Region"},
                ":",
                {"Ref": "AWS::AccountId"},
                ":function:jest*"
            ]]})
        );
    }

    #[test]
    fn test_concat_flattens_nested_joins() {
        let prefix = CfnValue::concat(["arn:aws:sqs:".into(), CfnValue::region(), ":".into()]);
        let value = CfnValue::concat([prefix, CfnValue::reference("sqsQualifier")]);
        assert_eq!(
            value,
            CfnValue::Join(vec![
                CfnValue::literal("arn:aws:sqs:"),
                CfnValue::region(),
                CfnValue::literal(":"),
                CfnValue::reference("sqsQualifier"),
            ])
        );
    }

    #[test]
    fn test_empty_only_for_empty_literal() {
        assert!(CfnValue::literal("").is_empty());
        assert!(!CfnValue::literal("x").is_empty());
        assert!(!CfnValue::reference("lambdaQualifier").is_empty());
    }

    #[test]
    fn test_get_att_serialization() {
        let value = CfnValue::get_att("ServiceRolev1", "Arn");
        assert_eq!(
            serde_json::to_value(&value).expect("serializes"),
            json!({"Fn::GetAtt": ["ServiceRolev1", "Arn"]})
        );
    }

    #[test]
    fn test_deserialize_intrinsics() {
        let literal: CfnValue = serde_json::from_value(json!("*")).expect("literal");
        assert_eq!(literal, CfnValue::literal("*"));

        let reference: CfnValue =
            serde_json::from_value(json!({"Ref": "AWS::AccountId"})).expect("ref");
        assert_eq!(reference, CfnValue::account_id());

        let joined: CfnValue = serde_json::from_value(json!({"Fn::Join": [":", [
            "arn:aws:sns",
            {"Ref": "AWS::Region"},
            "topic"
        ]]}))
        .expect("join");
        assert_eq!(
            joined,
            CfnValue::Join(vec![
                CfnValue::literal("arn:aws:sns:"),
                CfnValue::region(),
                CfnValue::literal(":topic"),
            ])
        );
    }

    #[test]
    fn test_deserialize_rejects_unknown_intrinsic() {
        let result: Result<CfnValue, _> = serde_json::from_value(json!({"Fn::Sub": "x"}));
        assert!(result.is_err());
    }
}
