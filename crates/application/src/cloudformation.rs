//! CloudFormation template declaring the OIDC provider and the role.

use serde_json::{Map, Value, json};

use trustgrant_core::{AppError, AppResult};
use trustgrant_domain::RoleGrant;

use crate::iam_document::{ProviderReference, inline_policy_document, trust_policy_document};

/// Template format version accepted by CloudFormation.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Logical id of the OIDC provider resource.
pub const PROVIDER_LOGICAL_ID: &str = "DeployOidcProvider";

/// Logical id of the role resource.
pub const ROLE_LOGICAL_ID: &str = "DeployRole";

/// Synthesizes a template for the grant.
///
/// The role trust policy references the provider with `Ref`, so the provider
/// is always created before and deleted after the role.
pub fn synthesize_template(grant: &RoleGrant) -> AppResult<Value> {
    let mut provider_properties = Map::new();
    provider_properties.insert("Url".to_owned(), json!(grant.provider().issuer_url()));
    provider_properties.insert(
        "ClientIdList".to_owned(),
        json!(
            grant
                .provider()
                .client_ids()
                .iter()
                .map(|client_id| client_id.as_str())
                .collect::<Vec<_>>()
        ),
    );
    if !grant.provider().thumbprints().is_empty() {
        provider_properties.insert(
            "ThumbprintList".to_owned(),
            json!(grant.provider().thumbprints()),
        );
    }

    let trust_document = trust_policy_document(
        grant,
        &ProviderReference::TemplateResource(PROVIDER_LOGICAL_ID.to_owned()),
    );
    let policies = grant
        .inline_policies()
        .iter()
        .map(|policy| {
            Ok(json!({
                "PolicyName": policy.name(),
                "PolicyDocument": to_value(&inline_policy_document(policy))?,
            }))
        })
        .collect::<AppResult<Vec<Value>>>()?;

    let mut role_properties = Map::new();
    role_properties.insert("RoleName".to_owned(), json!(grant.role_name()));
    if let Some(description) = grant.description() {
        role_properties.insert("Description".to_owned(), json!(description));
    }
    role_properties.insert(
        "MaxSessionDuration".to_owned(),
        json!(grant.session().maximum_seconds()),
    );
    role_properties.insert(
        "AssumeRolePolicyDocument".to_owned(),
        to_value(&trust_document)?,
    );
    role_properties.insert("Policies".to_owned(), Value::Array(policies));
    if !grant.managed_policy_arns().is_empty() {
        role_properties.insert(
            "ManagedPolicyArns".to_owned(),
            json!(grant.managed_policy_arns()),
        );
    }

    Ok(json!({
        "AWSTemplateFormatVersion": TEMPLATE_FORMAT_VERSION,
        "Description": format!("OIDC deploy role {}", grant.role_name()),
        "Resources": {
            PROVIDER_LOGICAL_ID: {
                "Type": "AWS::IAM::OIDCProvider",
                "Properties": provider_properties,
            },
            ROLE_LOGICAL_ID: {
                "Type": "AWS::IAM::Role",
                "Properties": role_properties,
            },
        },
        "Outputs": {
            "RoleArn": {
                "Value": { "Fn::GetAtt": [ROLE_LOGICAL_ID, "Arn"] },
            },
            "OidcProviderArn": {
                "Value": { "Ref": PROVIDER_LOGICAL_ID },
            },
        },
    }))
}

fn to_value<T: serde::Serialize>(document: &T) -> AppResult<Value> {
    serde_json::to_value(document)
        .map_err(|error| AppError::Internal(format!("failed to serialize policy document: {error}")))
}
