//! Policy stores and the qualifier-injection pass.

use std::collections::HashMap;

use log::{debug, trace};

use super::entry::PolicyEntry;
use super::qualifier::qualifier_parameter_id;
use super::statement::{PolicyDocument, PolicyStatement};
use crate::error::SynthResult;
use crate::template::{CfnValue, Parameter, PolicyProperties, Resource, Template};

/// The identity a policy store grants its statements to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Group(PrincipalHandle),
    Role(PrincipalHandle),
}

/// A declared group or role and the statements attached to it so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalHandle {
    logical_id: String,
    statements: Vec<PolicyStatement>,
}

impl Principal {
    pub fn group(logical_id: impl Into<String>) -> Self {
        Self::Group(PrincipalHandle {
            logical_id: logical_id.into(),
            statements: Vec::new(),
        })
    }

    pub fn role(logical_id: impl Into<String>) -> Self {
        Self::Role(PrincipalHandle {
            logical_id: logical_id.into(),
            statements: Vec::new(),
        })
    }

    fn handle(&self) -> &PrincipalHandle {
        match self {
            Self::Group(handle) | Self::Role(handle) => handle,
        }
    }

    fn handle_mut(&mut self) -> &mut PrincipalHandle {
        match self {
            Self::Group(handle) | Self::Role(handle) => handle,
        }
    }

    pub fn logical_id(&self) -> &str {
        &self.handle().logical_id
    }

    pub fn statements(&self) -> &[PolicyStatement] {
        &self.handle().statements
    }

    /// Attach a statement to the principal's default policy.
    pub fn attach(&mut self, statement: PolicyStatement) {
        self.handle_mut().statements.push(statement);
    }

    pub fn default_policy_id(&self) -> String {
        format!("{}DefaultPolicy", self.logical_id())
    }

    /// Declare the principal's default policy, if anything was attached.
    pub fn declare_default_policy(&self, template: &mut Template) -> SynthResult<Option<String>> {
        if self.statements().is_empty() {
            return Ok(None);
        }

        let policy_name = self.default_policy_id();
        let target = vec![CfnValue::reference(self.logical_id())];
        let (groups, roles) = match self {
            Self::Group(_) => (target, Vec::new()),
            Self::Role(_) => (Vec::new(), target),
        };

        let id = template.add_resource(
            &policy_name,
            Resource::Policy(PolicyProperties {
                policy_name: policy_name.clone(),
                policy_document: PolicyDocument::new(self.statements().to_vec()),
                groups,
                roles,
            }),
        )?;
        Ok(Some(id))
    }
}

/// A principal together with the entries that will be granted to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStore {
    principal: Principal,
    policies: Vec<PolicyEntry>,
}

impl PolicyStore {
    pub fn new(principal: Principal, policies: Vec<PolicyEntry>) -> Self {
        Self {
            principal,
            policies,
        }
    }

    pub fn extend<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = PolicyEntry>,
    {
        self.policies.extend(entries);
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn policies(&self) -> &[PolicyEntry] {
        &self.policies
    }
}

/// Deploy-time qualifier parameters, created on first use per category.
struct QualifierParameters<'a> {
    default: &'a str,
    created: HashMap<String, CfnValue>,
}

impl<'a> QualifierParameters<'a> {
    fn new(default: &'a str) -> Self {
        Self {
            default,
            created: HashMap::new(),
        }
    }

    fn for_category(&mut self, template: &mut Template, category: &str) -> SynthResult<CfnValue> {
        let id = qualifier_parameter_id(category);
        if let Some(existing) = self.created.get(&id) {
            return Ok(existing.clone());
        }

        let reference = template.add_parameter(
            &id,
            Parameter::string(
                format!("Custom qualifier values provided for {}", category),
                self.default,
            ),
        )?;
        self.created.insert(id, reference.clone());
        Ok(reference)
    }
}

/// Grant every entry of every store to its principal.
///
/// Each category gets a `{category}Qualifier` string parameter defaulting to
/// `parameter_hash`. Qualified entries receive a reference to that parameter
/// as their last qualifier before their ARNs are assembled. Stores are
/// processed in order, entries in declaration order.
pub fn apply_policy_stores(
    template: &mut Template,
    stores: &mut [PolicyStore],
    parameter_hash: &str,
) -> SynthResult<()> {
    let mut parameters = QualifierParameters::new(parameter_hash);

    for store in stores.iter_mut() {
        debug!(
            "Applying {} policy entries to {}",
            store.policies.len(),
            store.principal.logical_id()
        );
        for entry in &store.policies {
            let qualifier = parameters.for_category(template, &entry.name)?;
            let statement = entry.to_statement(Some(&qualifier));
            trace!("{}: {:?}", entry.name, statement.resources());
            store.principal.attach(statement);
        }
    }

    Ok(())
}
