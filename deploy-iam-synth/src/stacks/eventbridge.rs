//! IAM user allowed to publish events for one event source into the default
//! event bus.

use log::debug;

use super::{declare_version_parameter, SynthesizedStack};
use crate::config::SynthConfig;
use crate::error::SynthResult;
use crate::policy::{PolicyStatement, Principal};
use crate::template::{CfnValue, GroupProperties, Resource, Template, UserProperties};

const DESCRIPTION: &str =
    "This stack provisions an IAM user with privilege to post events into the default EventBridge";

pub fn eventbridge_iam(config: &SynthConfig) -> SynthResult<SynthesizedStack> {
    let event_source = config.require_event_source()?;
    let hyphenated = event_source.replace('.', "-");
    debug!("Declaring eventbridge-iam for event source {}", event_source);

    let mut template = Template::new(DESCRIPTION);

    let group_id = template.add_resource(
        &format!("eventbridge-users-{}", hyphenated),
        Resource::Group(GroupProperties::default()),
    )?;

    let mut group = Principal::group(group_id.as_str());
    group.attach(
        PolicyStatement::allow(["events:PutEvents"], [CfnValue::literal("*")]).with_condition(
            "StringEquals",
            "events:source",
            event_source,
        ),
    );
    group.declare_default_policy(&mut template)?;

    let user_name = format!("eventbridge-user-{}", hyphenated);
    template.add_resource(
        &user_name,
        Resource::User(UserProperties {
            user_name: Some(CfnValue::literal(user_name.as_str())),
            groups: vec![CfnValue::reference(group_id)],
        }),
    )?;

    declare_version_parameter(
        &mut template,
        "EventBridgeIAMVersion",
        format!("/eventbridge-user/{}/version", hyphenated),
        "The version of the eventbridge-iam resources",
    )?;

    Ok(SynthesizedStack {
        stack_name: format!("eventbridge-iam-{}", hyphenated),
        template,
    })
}
