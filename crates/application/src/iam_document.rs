//! IAM policy-language documents rendered from a role grant.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use trustgrant_domain::{
    ASSUME_ROLE_WITH_WEB_IDENTITY, Effect, InlinePolicy, PermissionStatement, RoleGrant,
};

/// Policy language version understood by IAM.
pub const POLICY_VERSION: &str = "2012-10-17";

/// IAM policy document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    /// Policy language version.
    pub version: String,
    /// Policy statements.
    pub statement: Vec<PolicyStatementDocument>,
}

/// One statement of an IAM policy document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatementDocument {
    /// Optional statement identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    /// `Allow` or `Deny`.
    pub effect: String,
    /// Principal, present only in trust documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal: Option<PrincipalDocument>,
    /// Actions covered by the statement.
    pub action: Vec<String>,
    /// Resources covered by the statement; absent in trust documents.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource: Vec<String>,
    /// Operator to claim-key to accepted values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub condition: BTreeMap<String, BTreeMap<String, Value>>,
}

/// Federated principal of a trust document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PrincipalDocument {
    /// Provider ARN or a template expression resolving to it.
    pub federated: Value,
}

/// How the trust document refers to the OIDC provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderReference {
    /// Concrete provider ARN.
    Arn(String),
    /// Logical id of the provider resource in the same template.
    TemplateResource(String),
}

impl ProviderReference {
    fn to_value(&self) -> Value {
        match self {
            Self::Arn(arn) => Value::String(arn.clone()),
            Self::TemplateResource(logical_id) => json!({ "Ref": logical_id }),
        }
    }
}

/// Renders the role assumption policy.
///
/// The document carries exactly one statement whose conditions are all
/// `StringEquals`: a single audience value and the full subject array.
#[must_use]
pub fn trust_policy_document(grant: &RoleGrant, provider: &ProviderReference) -> PolicyDocument {
    let mut operators: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
    for condition in grant.trust().conditions(grant.provider()) {
        let value = if condition.key.ends_with(":aud") && condition.values.len() == 1 {
            Value::String(condition.values[0].clone())
        } else {
            Value::Array(condition.values.into_iter().map(Value::String).collect())
        };

        operators
            .entry(condition.operator.as_str().to_owned())
            .or_default()
            .insert(condition.key, value);
    }

    PolicyDocument {
        version: POLICY_VERSION.to_owned(),
        statement: vec![PolicyStatementDocument {
            sid: None,
            effect: Effect::Allow.as_str().to_owned(),
            principal: Some(PrincipalDocument {
                federated: provider.to_value(),
            }),
            action: vec![ASSUME_ROLE_WITH_WEB_IDENTITY.to_owned()],
            resource: Vec::new(),
            condition: operators,
        }],
    }
}

/// Renders one inline permission policy.
#[must_use]
pub fn inline_policy_document(policy: &InlinePolicy) -> PolicyDocument {
    PolicyDocument {
        version: POLICY_VERSION.to_owned(),
        statement: policy.statements().iter().map(statement_document).collect(),
    }
}

fn statement_document(statement: &PermissionStatement) -> PolicyStatementDocument {
    PolicyStatementDocument {
        sid: Some(statement.sid().to_owned()),
        effect: statement.effect().as_str().to_owned(),
        principal: None,
        action: statement
            .actions()
            .iter()
            .map(|action| action.as_str().to_owned())
            .collect(),
        resource: statement.resources().to_resources(),
        condition: BTreeMap::new(),
    }
}
