//! Declarative policy entries.

use super::qualifier::format_resource_qualifier;
use super::statement::{Conditions, Effect, PolicyStatement};
use crate::template::CfnValue;

/// Where a policy entry gets its resources from.
///
/// An entry either lists its ARNs literally or has them assembled from a
/// prefix and qualifiers; never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSource {
    Resources(Vec<CfnValue>),
    Qualified {
        prefix: CfnValue,
        qualifiers: Vec<CfnValue>,
    },
}

/// One declared permission, named after the category it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEntry {
    pub name: String,
    pub effect: Effect,
    pub actions: Vec<String>,
    pub conditions: Option<Conditions>,
    pub source: ResourceSource,
}

impl PolicyEntry {
    fn new<A>(name: &str, actions: A, source: ResourceSource) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
    {
        Self {
            name: name.to_string(),
            effect: Effect::Allow,
            actions: actions.into_iter().map(Into::into).collect(),
            conditions: None,
            source,
        }
    }

    /// Entry whose resources are `prefix` joined with each qualifier.
    pub fn qualified<Q, A>(name: &str, prefix: impl Into<CfnValue>, qualifiers: Q, actions: A) -> Self
    where
        Q: IntoIterator,
        Q::Item: Into<CfnValue>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        Self::new(
            name,
            actions,
            ResourceSource::Qualified {
                prefix: prefix.into(),
                qualifiers: qualifiers.into_iter().map(Into::into).collect(),
            },
        )
    }

    /// Entry with fully literal resources.
    pub fn literal<R, A>(name: &str, resources: R, actions: A) -> Self
    where
        R: IntoIterator,
        R::Item: Into<CfnValue>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        Self::new(
            name,
            actions,
            ResourceSource::Resources(resources.into_iter().map(Into::into).collect()),
        )
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Resolve the entry's resources. `extra_qualifier` is appended to the
    /// qualifiers of a qualified entry and ignored for literal resources.
    pub fn resources(&self, extra_qualifier: Option<&CfnValue>) -> Vec<CfnValue> {
        match &self.source {
            ResourceSource::Resources(resources) => resources.clone(),
            ResourceSource::Qualified { prefix, qualifiers } => {
                let mut qualifiers = qualifiers.clone();
                qualifiers.extend(extra_qualifier.cloned());
                format_resource_qualifier(&self.name, prefix, &qualifiers)
            }
        }
    }

    pub fn to_statement(&self, extra_qualifier: Option<&CfnValue>) -> PolicyStatement {
        let statement = PolicyStatement::new(
            self.effect,
            self.actions.iter().cloned(),
            self.resources(extra_qualifier),
        );
        match &self.conditions {
            Some(conditions) => statement.with_conditions(conditions.clone()),
            None => statement,
        }
    }
}
