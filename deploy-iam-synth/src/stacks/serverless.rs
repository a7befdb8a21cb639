//! IAM resources needed to deploy Serverless Framework services.
//!
//! Two policy stores are declared: a service role assumed by CloudFormation
//! and Lambda, which performs the actual resource changes, and a deployers
//! group whose single user drives deploys. Every store goes through the
//! qualifier-injection pass so resource lists can be widened at deploy time
//! through the `{category}Qualifier` parameters.

use log::{debug, info};
use serde_json::json;

use super::{declare_version_parameter, iam_arn, SynthesizedStack, STACK_SUFFIX, VERSION};
use crate::config::SynthConfig;
use crate::error::SynthResult;
use crate::policy::{
    apply_policy_stores, ConditionValue, Conditions, PolicyDocument, PolicyEntry, PolicyStatement, PolicyStore,
    Principal,
};
use crate::template::{
    CfnValue, GroupProperties, Output, Parameter, Resource, RoleProperties, Template,
    UserProperties,
};

const DESCRIPTION: &str =
    "This stack includes IAM resources needed to deploy Serverless apps into this environment";
const SERVICE_ROLE_ID: &str = "ServiceRole-v1";

/// `arn:aws:{service}:{region}:{account}{rest}`
fn regional_arn(service: &str, rest: &str) -> CfnValue {
    CfnValue::concat([
        CfnValue::literal(format!("arn:aws:{}:", service)),
        CfnValue::region(),
        CfnValue::literal(":"),
        CfnValue::account_id(),
        CfnValue::literal(rest),
    ])
}

/// `arn:aws:{service}::{account}{rest}`
fn global_arn(service: &str, rest: &str) -> CfnValue {
    CfnValue::concat([
        CfnValue::literal(format!("arn:aws:{}::", service)),
        CfnValue::account_id(),
        CfnValue::literal(rest),
    ])
}

/// CloudFormation links parameters by reference, so changing only a
/// parameter value produces no detectable change. This entry embeds the
/// parameter hash in a resource so each new set of values yields a new policy.
fn dummy_policy(parameter_hash: &str) -> PolicyEntry {
    PolicyEntry::literal(
        "DUMMY",
        [format!("arn:aws:iam::999999999999:group/{}", parameter_hash)],
        ["iam:ListUsers"],
    )
}

pub(crate) fn service_role_policies(service: &str) -> Vec<PolicyEntry> {
    let service_glob = format!("{}*", service);

    vec![
        PolicyEntry::qualified(
            "S3",
            "arn:aws:s3:::",
            [service_glob.clone(), format!("{}*/*", service)],
            ["s3:*"],
        ),
        PolicyEntry::literal("S3", ["*"], ["s3:ListAllMyBuckets"]),
        PolicyEntry::qualified(
            "CLOUD_WATCH",
            regional_arn("logs", ":log-group:"),
            [
                format!("/aws/lambda/{}*", service),
                format!("/aws/apigateway/{}*", service),
                format!("/aws/express/{}*", service),
                format!("/aws/stepfunctions/{}*", service),
                ":log-stream:*".to_string(),
                service_glob.clone(),
            ],
            ["logs:*"],
        ),
        PolicyEntry::literal("CLOUD_WATCH", ["*"], ["logs:DeleteDataProtectionPolicy"]),
        PolicyEntry::qualified(
            "CLOUD_WATCH_ALARMS",
            regional_arn("cloudwatch", ":alarm:"),
            ["TaskTimedOutAlarm".to_string(), service_glob.clone()],
            [
                "cloudwatch:List*",
                "cloudwatch:DescribeAlarms",
                "cloudwatch:DeleteAlarms",
                "cloudwatch:EnableAlarmActions",
                "cloudwatch:Put*",
                "cloudwatch:SetAlarmState",
                "cloudwatch:TagResource",
                "cloudwatch:StartMetricStreams",
                "cloudwatch:StopMetricStreams",
            ],
        ),
        PolicyEntry::qualified(
            "LAMBDA",
            regional_arn("lambda", ":function:"),
            [service_glob.clone()],
            ["lambda:*"],
        ),
        PolicyEntry::literal(
            "LAMBDA_EVENT_SOURCE_MAPPING",
            [regional_arn("lambda", ":event-source-mapping:*")],
            [
                "lambda:TagResource",
                "lambda:UntagResource",
                "lambda:GetEventSourceMapping",
                "lambda:ListEventSourceMappings",
                "lambda:CreateEventSourceMapping",
                "lambda:DeleteEventSourceMapping",
            ],
        ),
        PolicyEntry::qualified(
            "IAM",
            iam_arn(":user"),
            [service_glob.clone()],
            ["iam:CreateUser", "iam:PutUserPolicy"],
        ),
        PolicyEntry::qualified(
            "IAM",
            iam_arn(":role"),
            [service_glob.clone(), format!("Cognito-{}*", service)],
            [
                "iam:CreateRole",
                "iam:PassRole",
                "iam:GetRole",
                "iam:DeleteRole",
                "iam:UpdateRole",
                "iam:TagRole",
                "iam:GetRolePolicy",
                "iam:DeleteRolePolicy",
                "iam:PutRolePolicy",
                "iam:DetachRolePolicy",
                "iam:AttachRolePolicy",
                "iam:UpdateAssumeRolePolicy",
                "iam:TagRole",
                "iam:UntagRole",
            ],
        ),
        PolicyEntry::qualified(
            "DYNAMO_DB",
            regional_arn("dynamodb", ":table"),
            [service_glob.clone()],
            [
                "dynamodb:DescribeTable",
                "dynamodb:CreateTable",
                "dynamodb:UpdateTable",
                "dynamodb:DeleteTable",
                "dynamodb:ListTagsOfResource",
                "dynamodb:TagResource",
                "dynamodb:UntagResource",
                "dynamodb:*TimeToLive",
            ],
        ),
        PolicyEntry::qualified(
            "STEP_FUNCTION",
            regional_arn("states", ":stateMachine:"),
            [service_glob.clone()],
            [
                "states:CreateStateMachine",
                "states:UpdateStateMachine",
                "states:DeleteStateMachine",
                "states:DescribeStateMachine",
                "states:TagResource",
                "states:UntagResource",
            ],
        ),
        PolicyEntry::qualified(
            "EVENT_BRIDGE",
            regional_arn("events", ""),
            [format!("rule/{}*", service), format!("event-bus/{}*", service)],
            [
                "events:EnableRule",
                "events:PutRule",
                "events:DescribeRule",
                "events:ListRules",
                "events:DisableRule",
                "events:PutTargets",
                "events:RemoveTargets",
                "events:DeleteRule",
                "events:CreateEventBus",
                "events:DescribeEventBus",
                "events:DeleteEventBus",
                "events:TagResource",
                "events:UntagResource",
            ],
        ),
        PolicyEntry::qualified(
            "SCHEDULER",
            regional_arn("scheduler", ":schedule/default"),
            [service_glob.clone()],
            [
                "scheduler:GetSchedule",
                "scheduler:CreateSchedule",
                "scheduler:UpdateSchedule",
                "scheduler:DeleteSchedule",
            ],
        ),
        PolicyEntry::qualified(
            "SCHEDULEGROUP",
            regional_arn("scheduler", ":schedule-group"),
            [service_glob.clone()],
            [
                "scheduler:GetScheduleGroup",
                "scheduler:CreateScheduleGroup",
                "scheduler:DeleteScheduleGroup",
                "scheduler:TagResource",
                "scheduler:ListTagsForResource",
            ],
        ),
        PolicyEntry::literal("API_GATEWAY", ["*"], ["apigateway:*"]),
        PolicyEntry::qualified(
            "SNS",
            regional_arn("sns", ":"),
            [service_glob.clone()],
            [
                "sns:GetTopicAttributes",
                "sns:SetTopicAttributes",
                "sns:CreateTopic",
                "sns:DeleteTopic",
                "sns:Subscribe",
                "sns:Unsubscribe",
                "sns:ListSubscriptionsByTopic",
                "sns:TagResource",
            ],
        ),
        PolicyEntry::qualified(
            "SQS",
            regional_arn("sqs", ":"),
            [service_glob.clone()],
            [
                "sqs:UntagQueue",
                "sqs:RemovePermission",
                "sqs:GetQueueUrl",
                "sqs:GetQueueAttributes",
                "sqs:AddPermission",
                "sqs:DeleteQueue",
                "sqs:ListQueueTags",
                "sqs:SetQueueAttributes",
                "sqs:ChangeMessageVisibility",
                "sqs:TagQueue",
                "sqs:UntagQueue",
                "sqs:ListDeadLetterSourceQueues",
                "sqs:CreateQueue",
            ],
        ),
        PolicyEntry::qualified(
            "COGNITO",
            regional_arn("cognito-sync", ":identitypool"),
            [service_glob.clone()],
            [
                "cognito-sync:BulkPublish",
                "cognito-sync:DeleteDataset",
                "cognito-sync:Describe*",
                "cognito-sync:Get*",
                "cognito-sync:List*",
                "cognito-sync:QueryRecords",
                "cognito-sync:RegisterDevice",
                "cognito-sync:SetCognitoEvents",
                "cognito-sync:SetDatasetConfiguration",
                "cognito-sync:SetIdentityPoolConfiguration",
                "cognito-sync:SubscribeToDataset",
                "cognito-sync:UnsubscribeFromDataset",
                "cognito-sync:UpdateRecords",
                "cognito-identity:CreateIdentityPool",
                "cognito-identity:DeleteIdentities",
                "cognito-identity:DeleteIdentityPool",
                "cognito-identity:Describe*",
                "cognito-identity:Get*",
                "cognito-identity:List*",
                "cognito-identity:LookupDeveloperIdentity",
                "cognito-identity:MergeDeveloperIdentities",
                "cognito-identity:SetIdentityPoolRoles",
                "cognito-identity:SetPrincipalTagAttributeMap",
                "cognito-identity:TagResource",
                "cognito-identity:UnlinkDeveloperIdentity",
                "cognito-identity:UnlinkIdentity",
                "cognito-identity:UntagResource",
                "cognito-identity:UpdateIdentityPool",
            ],
        ),
        PolicyEntry::qualified(
            "COGNITO_IDP",
            regional_arn("cognito-idp", ":userpool"),
            // User pool ids are `{region}_{suffix}`.
            [
                CfnValue::literal(service_glob.as_str()),
                CfnValue::concat([CfnValue::region(), CfnValue::literal("_*")]),
            ],
            ["cognito-idp:*"],
        ),
        PolicyEntry::qualified(
            "COGNITO_IDP_CREATEUSERPOOL",
            regional_arn("cognito-idp", ":userpool"),
            [CfnValue::literal("*")],
            ["cognito-idp:CreateUserPool"],
        ),
        PolicyEntry::qualified(
            "COGNITO_IDP_IDENTITYPOOL",
            regional_arn("cognito-identity", ":identitypool"),
            [CfnValue::concat([CfnValue::region(), CfnValue::literal(":*")])],
            [
                "cognito-identity:CreateIdentityPool",
                "cognito-identity:SetIdentityPoolRoles",
            ],
        ),
        PolicyEntry::literal(
            "CLOUDFRONT-OAI",
            [global_arn("cloudfront", ":origin-access-identity/*")],
            [
                "cloudfront:CreateCloudFrontOriginAccessIdentity",
                "cloudfront:GetCloudFrontOriginAccessIdentity",
                "cloudfront:DeleteCloudFrontOriginAccessIdentity",
            ],
        ),
        PolicyEntry::literal(
            "CLOUDFRONT-FUNCTION",
            [global_arn("cloudfront", ":function/*")],
            ["cloudfront:CreateFunction"],
        ),
        PolicyEntry::literal(
            "CLOUDFRONT-FUNCTION",
            [global_arn("cloudfront", &format!(":function/{}*", service))],
            [
                "cloudfront:CreateFunction",
                "cloudfront:DescribeFunction",
                "cloudfront:DeleteFunction",
                "cloudfront:PublishFunction",
                "cloudfront:GetFunction",
            ],
        ),
        PolicyEntry::literal(
            "CLOUDFRONT-DISTRIBUTION",
            [global_arn("cloudfront", ":distribution/*")],
            [
                "cloudfront:CreateDistribution",
                "cloudfront:DeleteDistribution",
                "cloudfront:GetDistribution",
                "cloudfront:ListDistributions",
                "cloudfront:UpdateDistribution",
                "cloudfront:TagResource",
            ],
        ),
        PolicyEntry::literal(
            "KMS",
            [regional_arn("kms", ":key/*")],
            [
                "kms:CreateKey",
                "kms:DescribeKey",
                "kms:DisableKey",
                "kms:EnableKey",
                "kms:Encrypt",
                "kms:Generate*",
                "kms:GetKeyPolicy",
                "kms:GetPublicKey",
                "kms:ListKeys",
                "kms:ListResourceTags",
                "kms:PutKeyPolicy",
                "kms:ScheduleKeyDeletion",
                "kms:Sign",
                "kms:TagResource",
                "kms:UntagResource",
            ],
        ),
    ]
}

/// Security-group permissions for services deployed into a shared VPC.
pub(crate) fn vpc_policies(shared_vpc_id: &CfnValue) -> Vec<PolicyEntry> {
    let mut vpc_condition = Conditions::new();
    vpc_condition.entry("StringEquals".to_string()).or_default().insert(
        "ec2:Vpc".to_string(),
        vec![ConditionValue::from(CfnValue::concat([
            CfnValue::literal("arn:aws:ec2:"),
            CfnValue::region(),
            CfnValue::literal(":"),
            CfnValue::account_id(),
            CfnValue::literal(":vpc/"),
            shared_vpc_id.clone(),
        ]))]
        .into(),
    );

    vec![
        PolicyEntry::literal(
            "EC2",
            ["*"],
            [
                "ec2:CreateSecurityGroup",
                "ec2:DescribeSecurityGroups",
                "ec2:DescribeSubnets",
                "ec2:DescribeVpcs",
                "ec2:createTags",
            ],
        ),
        PolicyEntry::literal("EC2", ["*"], ["ec2:DeleteSecurityGroup"]).with_conditions(vpc_condition),
    ]
}

fn deploy_group_policies(service: &str, service_role_arn: CfnValue) -> Vec<PolicyEntry> {
    let service_glob = format!("{}*", service);

    vec![
        PolicyEntry::literal(
            "SERVICE_LINKED_ROLE",
            [iam_arn(
                ":role/aws-service-role/ops.apigateway.amazonaws.com/AWSServiceRoleForAPIGateway",
            )],
            ["iam:CreateServiceLinkedRole"],
        ),
        PolicyEntry::qualified(
            "CLOUD_FORMATION",
            regional_arn("cloudformation", ":stack"),
            [service_glob.clone()],
            [
                "cloudformation:CreateStack",
                "cloudformation:Describe*",
                "cloudformation:List*",
                "cloudformation:Get*",
                "cloudformation:DeleteStack",
                "cloudformation:UpdateStack",
                "cloudformation:ExecuteChangeSet",
                "cloudformation:CreateChangeSet",
                "cloudformation:DeleteChangeSet",
            ],
        ),
        PolicyEntry::literal(
            "CLOUD_FORMATION",
            ["*"],
            ["cloudformation:ValidateTemplate", "cloudformation:ListExports"],
        ),
        PolicyEntry::literal("SSM", ["*"], ["ssm:DescribeParameters"]),
        PolicyEntry::qualified(
            "SSM",
            regional_arn("ssm", ":parameter"),
            [service_glob.clone()],
            ["ssm:GetParameter"],
        ),
        PolicyEntry::qualified(
            "LAMBDA",
            regional_arn("lambda", ":function:"),
            [service_glob.clone()],
            ["lambda:GetFunction", "lambda:InvokeFunction", "lambda:ListTags"],
        ),
        PolicyEntry::literal("IAM", [service_role_arn], ["iam:PassRole"]),
        PolicyEntry::qualified(
            "IAM",
            iam_arn(":role"),
            ["aws-service-role/ops.apigateway.amazonaws.com/AWSServiceRoleForAPIGateway"],
            ["iam:CreateServiceLinkedRole"],
        ),
        PolicyEntry::qualified(
            "S3",
            "arn:aws:s3:::",
            [service_glob.clone(), format!("{}*/*", service)],
            [
                "s3:CreateBucket",
                "s3:ListBucket",
                "s3:DeleteObject",
                "s3:PutObject",
                "s3:GetObject",
                "s3:GetBucketLocation",
            ],
        ),
        PolicyEntry::literal("S3", ["*"], ["s3:ListAllMyBuckets"]),
        // Generated API key names are random, so fetching them after a deploy
        // cannot be limited to the service.
        PolicyEntry::literal(
            "API_GATEWAY",
            [CfnValue::concat([
                CfnValue::literal("arn:aws:apigateway:"),
                CfnValue::region(),
                CfnValue::literal("::*"),
            ])],
            ["apigateway:GET", "apigateway:PATCH", "apigateway:POST"],
        ),
        PolicyEntry::literal(
            "DISTRIBUTION",
            [global_arn("cloudfront", ":distribution/*")],
            ["cloudfront:CreateInvalidation"],
        ),
    ]
}

pub fn serverless_deploy_iam(config: &SynthConfig) -> SynthResult<SynthesizedStack> {
    let stack_name = format!("{}{}", config.service_name(), STACK_SUFFIX);
    let service = stack_name.replacen(STACK_SUFFIX, "", 1);
    let parameter_hash = config.parameter_hash();
    debug!("Declaring serverless-deploy-iam for service {}", service);

    let mut template = Template::new(DESCRIPTION);

    let shared_vpc_id =
        template.add_parameter("sharedVpcId", Parameter::string("Shared VPC ID", ""))?;

    let role_id = template.add_resource(
        SERVICE_ROLE_ID,
        Resource::Role(RoleProperties {
            assume_role_policy_document: PolicyDocument::new(vec![PolicyStatement::assume_role(
                json!({"Service": ["cloudformation.amazonaws.com", "lambda.amazonaws.com"]}),
            )]),
        }),
    )?;
    let role_arn = CfnValue::get_att(role_id.as_str(), "Arn");

    let mut role_policies = vec![dummy_policy(parameter_hash)];
    role_policies.extend(service_role_policies(&service));
    let mut service_role = PolicyStore::new(Principal::role(role_id.as_str()), role_policies);

    if config.enable_vpc_permissions {
        info!("VPC permissions enabled for {}", service);
        service_role.extend(vpc_policies(&shared_vpc_id));
    }

    let group_id = template.add_resource(
        &format!("{}-deployers", service),
        Resource::Group(GroupProperties::default()),
    )?;
    let mut group_policies = vec![dummy_policy(parameter_hash)];
    group_policies.extend(deploy_group_policies(&service, role_arn.clone()));
    let deploy_group = PolicyStore::new(Principal::group(group_id.as_str()), group_policies);

    let mut stores = [service_role, deploy_group];
    apply_policy_stores(&mut template, &mut stores, parameter_hash)?;
    for store in &stores {
        store.principal().declare_default_policy(&mut template)?;
    }

    let user_id = template.add_resource(
        "DeployUser",
        Resource::User(UserProperties {
            user_name: Some(CfnValue::literal(format!("{}-deployer", service))),
            groups: vec![CfnValue::reference(group_id)],
        }),
    )?;

    let export_prefix = config.export_prefix();
    template.add_output(
        &format!("{}DeployUserName", export_prefix),
        Output::new(CfnValue::reference(user_id))
            .with_description("PublisherUser")
            .with_export(format!("{}serverless-deployer-username", export_prefix)),
    )?;
    template.add_output(
        &format!("{}DeployRoleArn", export_prefix),
        Output::new(role_arn)
            .with_description("The ARN of the CloudFormation service role")
            .with_export(format!("{}serverless-deployer-role-arn", export_prefix)),
    )?;
    template.add_output(
        &format!("{}Version", export_prefix),
        Output::new(VERSION)
            .with_description(
                "The version of the resources that are currently provisioned in this stack",
            )
            .with_export(format!("{}cdk-stack-version", export_prefix)),
    )?;
    template.add_output(
        &format!("{}ParameterHash", export_prefix),
        Output::new(parameter_hash)
            .with_description("A hash of the parameter values provided.")
            .with_export(format!("{}parameter-hash", export_prefix)),
    )?;

    declare_version_parameter(
        &mut template,
        "ServerlessDeployIAMVersion",
        format!("/serverless-deploy-iam/{}/version", service),
        "The version of the serverless-deploy-iam resources",
    )?;

    Ok(SynthesizedStack {
        stack_name,
        template,
    })
}
