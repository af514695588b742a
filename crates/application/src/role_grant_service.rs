use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use trustgrant_core::{AccountId, AppError, AppResult};
use trustgrant_domain::{RoleGrant, RoleGrantInput};

use crate::cloudformation::synthesize_template;
use crate::iam_document::{
    PolicyDocument, ProviderReference, inline_policy_document, trust_policy_document,
};
use crate::role_grant_ports::{OutputFormat, OutputSink, RenderedOutput};

/// Trust and inline policy documents of one role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleDocuments {
    /// Role name the documents belong to.
    pub role_name: String,
    /// Assume-role policy document.
    pub trust_policy: PolicyDocument,
    /// Inline policy documents keyed by policy name.
    pub inline_policies: BTreeMap<String, PolicyDocument>,
    /// Attached managed policy ARNs.
    pub managed_policy_arns: Vec<String>,
}

/// Application service that validates and renders role grants.
#[derive(Clone)]
pub struct RoleGrantService {
    output_sink: Arc<dyn OutputSink>,
}

impl RoleGrantService {
    /// Creates a new role grant service.
    #[must_use]
    pub fn new(output_sink: Arc<dyn OutputSink>) -> Self {
        Self { output_sink }
    }

    /// Validates configuration into a role grant.
    ///
    /// Invalid configuration fails here, before anything is published.
    /// Shapes that validate but would reject every caller are logged as warnings.
    pub fn declare(&self, input: RoleGrantInput) -> AppResult<RoleGrant> {
        let grant = RoleGrant::new(input)?;

        for hazard in grant.trust().lockout_hazards() {
            warn!(
                role_name = %grant.role_name(),
                hazard = %hazard.describe(),
                "trust policy may reject every caller"
            );
        }

        if grant.has_unscoped_statements() {
            warn!(
                role_name = %grant.role_name(),
                "role grants actions on every resource; narrow resources for stricter deployments"
            );
        }

        info!(
            role_name = %grant.role_name(),
            issuer = %grant.provider().issuer_url(),
            audience = %grant.trust().audience(),
            allowed_subjects = grant.trust().allowed_subjects().count(),
            statements = grant.statements().count(),
            max_session_seconds = grant.session().maximum_seconds(),
            "role grant validated"
        );

        Ok(grant)
    }

    /// Renders a validated grant in the requested format.
    ///
    /// `Documents` needs the account to spell out the provider ARN.
    pub fn render(
        &self,
        grant: &RoleGrant,
        format: OutputFormat,
        account: Option<&AccountId>,
    ) -> AppResult<RenderedOutput> {
        let body = match format {
            OutputFormat::Template => to_pretty_json(&synthesize_template(grant)?)?,
            OutputFormat::Documents => {
                let account = account.ok_or_else(|| {
                    AppError::Validation(
                        "an account id is required to render standalone policy documents"
                            .to_owned(),
                    )
                })?;
                to_pretty_json(&self.documents(grant, account))?
            }
            OutputFormat::Grant => to_pretty_json(grant)?,
        };

        Ok(RenderedOutput {
            format,
            role_name: grant.role_name().to_owned(),
            body,
        })
    }

    /// Builds standalone policy documents for the grant.
    #[must_use]
    pub fn documents(&self, grant: &RoleGrant, account: &AccountId) -> RoleDocuments {
        let provider = ProviderReference::Arn(grant.provider().arn(account));

        RoleDocuments {
            role_name: grant.role_name().to_owned(),
            trust_policy: trust_policy_document(grant, &provider),
            inline_policies: grant
                .inline_policies()
                .iter()
                .map(|policy| (policy.name().to_owned(), inline_policy_document(policy)))
                .collect(),
            managed_policy_arns: grant.managed_policy_arns().to_vec(),
        }
    }

    /// Validates, renders, and publishes a role grant.
    pub async fn synthesize(
        &self,
        input: RoleGrantInput,
        format: OutputFormat,
        account: Option<&AccountId>,
    ) -> AppResult<RoleGrant> {
        let grant = self.declare(input)?;
        let output = self.render(&grant, format, account)?;

        self.output_sink.publish(&output).await?;

        info!(
            role_name = %output.role_name,
            format = %output.format.as_str(),
            bytes = output.body.len(),
            "role grant published"
        );

        Ok(grant)
    }
}

fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> AppResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|error| AppError::Internal(format!("failed to serialize output: {error}")))
}

#[cfg(test)]
mod tests;
