//! Policy declarations: entries, statements, qualifier formatting and stores.

mod custom;
mod entry;
mod qualifier;
mod statement;
mod store;

pub use custom::load_custom_statements;
pub use entry::{PolicyEntry, ResourceSource};
pub use qualifier::{
    format_resource_qualifier, qualifier_delimiter, qualifier_parameter_id, DEFAULT_DELIMITER,
};
pub use statement::{
    ConditionValue, Conditions, Effect, OneOrMany, PolicyDocument, PolicyStatement, POLICY_VERSION,
};
pub use store::{apply_policy_stores, PolicyStore, Principal, PrincipalHandle};
