//! Resource qualifier formatting.
//!
//! A policy entry describes its resources as an ARN prefix plus a list of
//! qualifiers (name globs or deploy-time parameter references). How the two
//! are joined depends on the ARN resource format of the service the category
//! belongs to.

use convert_case::{Case, Casing};

use crate::template::{logical_id, CfnValue};

/// Delimiter used for categories without a dedicated ARN convention.
pub const DEFAULT_DELIMITER: &str = "/";

const QUALIFIER_PARAMETER_SUFFIX: &str = "Qualifier";

/// Delimiter placed between an ARN prefix and each qualifier for a category.
pub fn qualifier_delimiter(category: &str) -> &'static str {
    match category {
        "COGNITO" | "CLOUD_WATCH" | "CLOUD_WATCH_ALARMS" | "LAMBDA" | "S3" | "SNS" | "SQS"
        | "STEP_FUNCTION" | "API_GATEWAY" | "API_GATEWAY_RESTAPIS" => "",
        "EVENT_BRIDGE" => ":",
        _ => DEFAULT_DELIMITER,
    }
}

/// Prepend `prefix` and the category delimiter to every non-empty qualifier.
///
/// Qualifier order is preserved. An empty qualifier list yields an empty
/// resource list.
pub fn format_resource_qualifier(
    category: &str,
    prefix: &CfnValue,
    qualifiers: &[CfnValue],
) -> Vec<CfnValue> {
    let delimiter = qualifier_delimiter(category);
    qualifiers
        .iter()
        .filter(|qualifier| !qualifier.is_empty())
        .map(|qualifier| {
            CfnValue::concat([
                prefix.clone(),
                CfnValue::literal(delimiter),
                qualifier.clone(),
            ])
        })
        .collect()
}

/// Logical id of the deploy-time parameter carrying extra qualifiers for a
/// category, e.g. `CLOUD_WATCH_ALARMS` -> `cloudwatchalarmsQualifier`.
pub fn qualifier_parameter_id(category: &str) -> String {
    logical_id(&format!(
        "{}{}",
        category.to_case(Case::Flat),
        QUALIFIER_PARAMETER_SUFFIX
    ))
}
