//! CloudFormation template model.
//!
//! Only the pieces the deploy IAM stacks use are modelled: string parameters,
//! IAM and SSM resources, and exported outputs. Construct ids are turned into
//! logical ids by dropping every non-alphanumeric character, and a logical id
//! can only be declared once per template.

mod resources;
mod value;

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use crate::error::{SynthError, SynthResult};

pub use resources::{
    GroupProperties, PolicyProperties, Resource, RoleProperties, SsmParameterProperties,
    UserProperties,
};
pub use value::CfnValue;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Derive a CloudFormation logical id from a construct id.
pub fn logical_id(construct_id: &str) -> String {
    construct_id
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    #[serde(rename = "Type")]
    pub parameter_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Parameter {
    pub fn string(description: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            parameter_type: "String".to_string(),
            description: Some(description.into()),
            default: Some(default.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Export {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: CfnValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<Export>,
}

impl Output {
    pub fn new(value: impl Into<CfnValue>) -> Self {
        Self {
            description: None,
            value: value.into(),
            export: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_export(mut self, name: impl Into<String>) -> Self {
        self.export = Some(Export { name: name.into() });
        self
    }
}

/// A synthesized template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    format_version: String,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "Parameters", skip_serializing_if = "BTreeMap::is_empty")]
    parameters: BTreeMap<String, Parameter>,
    #[serde(rename = "Resources")]
    resources: BTreeMap<String, Resource>,
    #[serde(rename = "Outputs", skip_serializing_if = "BTreeMap::is_empty")]
    outputs: BTreeMap<String, Output>,
}

impl Template {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            format_version: TEMPLATE_FORMAT_VERSION.to_string(),
            description: Some(description.into()),
            parameters: BTreeMap::new(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Parameters and resources share the `Ref` namespace.
    fn ensure_referenceable_id_free(&self, id: &str) -> SynthResult<()> {
        if self.parameters.contains_key(id) || self.resources.contains_key(id) {
            return Err(SynthError::DuplicateLogicalId(id.to_string()));
        }
        Ok(())
    }

    /// Declare a parameter and return a reference to it.
    pub fn add_parameter(
        &mut self,
        construct_id: &str,
        parameter: Parameter,
    ) -> SynthResult<CfnValue> {
        let id = logical_id(construct_id);
        self.ensure_referenceable_id_free(&id)?;
        debug!("Declaring parameter {}", id);
        self.parameters.insert(id.clone(), parameter);
        Ok(CfnValue::reference(id))
    }

    /// Declare a resource and return its logical id.
    pub fn add_resource(&mut self, construct_id: &str, resource: Resource) -> SynthResult<String> {
        let id = logical_id(construct_id);
        self.ensure_referenceable_id_free(&id)?;
        debug!("Declaring {} {}", resource.type_name(), id);
        self.resources.insert(id.clone(), resource);
        Ok(id)
    }

    pub fn add_output(&mut self, construct_id: &str, output: Output) -> SynthResult<String> {
        let id = logical_id(construct_id);
        if self.outputs.contains_key(&id) {
            return Err(SynthError::DuplicateLogicalId(id));
        }
        self.outputs.insert(id.clone(), output);
        Ok(id)
    }

    pub fn parameter(&self, id: &str) -> Option<&Parameter> {
        self.parameters.get(id)
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn output(&self, id: &str) -> Option<&Output> {
        self.outputs.get(id)
    }

    pub fn parameters(&self) -> &BTreeMap<String, Parameter> {
        &self.parameters
    }

    pub fn resources(&self) -> &BTreeMap<String, Resource> {
        &self.resources
    }

    pub fn outputs(&self) -> &BTreeMap<String, Output> {
        &self.outputs
    }

    /// Render the template as JSON.
    pub fn to_json(&self, pretty: bool) -> SynthResult<String> {
        let rendered = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(rendered)
    }
}
