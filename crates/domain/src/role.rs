use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use trustgrant_core::{AppError, AppResult, NonEmptyString};

use crate::identity_provider::{OidcProvider, OidcProviderInput};
use crate::permission::{InlinePolicy, InlinePolicyInput, PermissionStatement, ResourceScope};
use crate::trust_policy::{TrustPolicy, TrustPolicyInput};

/// Shortest session the identity service issues, in seconds.
pub const MIN_SESSION_SECONDS: u32 = 3_600;

/// Longest maximum session a role may declare, in seconds.
pub const MAX_SESSION_SECONDS: u32 = 43_200;

/// Maximum role name length accepted by IAM.
pub const ROLE_NAME_MAX_LENGTH: usize = 64;

/// Maximum role description length accepted by IAM.
pub const ROLE_DESCRIPTION_MAX_LENGTH: usize = 1_000;

/// Assumed-session lifetime bounds of the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionDuration {
    requested_seconds: u32,
    maximum_seconds: u32,
}

impl SessionDuration {
    /// Creates validated session bounds.
    ///
    /// The role maximum must lie in `[MIN_SESSION_SECONDS, MAX_SESSION_SECONDS]`
    /// and the requested duration in `[MIN_SESSION_SECONDS, maximum]`. Without a
    /// request the maximum is used.
    pub fn new(maximum_seconds: u32, requested_seconds: Option<u32>) -> AppResult<Self> {
        if !(MIN_SESSION_SECONDS..=MAX_SESSION_SECONDS).contains(&maximum_seconds) {
            return Err(AppError::SessionDurationOutOfBounds {
                field: "max_session_duration_seconds",
                requested_seconds: maximum_seconds,
                min_seconds: MIN_SESSION_SECONDS,
                max_seconds: MAX_SESSION_SECONDS,
            });
        }

        let requested_seconds = requested_seconds.unwrap_or(maximum_seconds);
        if !(MIN_SESSION_SECONDS..=maximum_seconds).contains(&requested_seconds) {
            return Err(AppError::SessionDurationOutOfBounds {
                field: "session_duration_seconds",
                requested_seconds,
                min_seconds: MIN_SESSION_SECONDS,
                max_seconds: maximum_seconds,
            });
        }

        Ok(Self {
            requested_seconds,
            maximum_seconds,
        })
    }

    /// Returns the one-hour session used by the deploy role.
    #[must_use]
    pub fn one_hour() -> Self {
        Self {
            requested_seconds: MIN_SESSION_SECONDS,
            maximum_seconds: MIN_SESSION_SECONDS,
        }
    }

    /// Returns the requested session duration in seconds.
    #[must_use]
    pub fn requested_seconds(&self) -> u32 {
        self.requested_seconds
    }

    /// Returns the role maximum session duration in seconds.
    #[must_use]
    pub fn maximum_seconds(&self) -> u32 {
        self.maximum_seconds
    }
}

/// Input payload used to construct a validated role grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrantInput {
    /// Trusted token issuer.
    pub provider: OidcProviderInput,
    /// Audience and subject constraints.
    pub trust: TrustPolicyInput,
    /// Role name, unique within the account.
    pub role_name: String,
    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Role maximum session duration in seconds.
    pub max_session_duration_seconds: u32,
    /// Requested session duration in seconds; defaults to the maximum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_duration_seconds: Option<u32>,
    /// Named inline permission sets.
    pub inline_policies: Vec<InlinePolicyInput>,
    /// Managed policies attached in addition to the inline policies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managed_policy_arns: Vec<String>,
}

/// Complete description of one assumable role and its trust and permissions.
///
/// Serializes into [`RoleGrantInput`] and deserializes through
/// [`RoleGrant::new`], so a parsed grant is always validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RoleGrantInput", into = "RoleGrantInput")]
pub struct RoleGrant {
    role_name: NonEmptyString,
    description: Option<String>,
    provider: OidcProvider,
    trust: TrustPolicy,
    session: SessionDuration,
    inline_policies: Vec<InlinePolicy>,
    managed_policy_arns: Vec<String>,
}

impl RoleGrant {
    /// Creates a validated role grant.
    pub fn new(input: RoleGrantInput) -> AppResult<Self> {
        let RoleGrantInput {
            provider,
            trust,
            role_name,
            description,
            max_session_duration_seconds,
            session_duration_seconds,
            inline_policies,
            managed_policy_arns,
        } = input;

        let role_name = validate_role_name(role_name)?;
        let description = validate_description(description)?;

        let provider = OidcProvider::new(provider)?;
        let trust = TrustPolicy::new(trust)?;
        if !provider.accepts_audience(trust.audience()) {
            return Err(AppError::Validation(format!(
                "trust.audience '{}' is not one of provider.client_ids",
                trust.audience()
            )));
        }

        let session = SessionDuration::new(max_session_duration_seconds, session_duration_seconds)?;

        if inline_policies.is_empty() {
            return Err(AppError::Validation(
                "inline_policies must contain at least one policy".to_owned(),
            ));
        }

        let inline_policies = inline_policies
            .into_iter()
            .map(InlinePolicy::new)
            .collect::<AppResult<Vec<_>>>()?;
        validate_unique_names(&inline_policies)?;

        let managed_policy_arns = validate_managed_policy_arns(managed_policy_arns)?;

        Ok(Self {
            role_name,
            description,
            provider,
            trust,
            session,
            inline_policies,
            managed_policy_arns,
        })
    }

    /// Returns the role name.
    #[must_use]
    pub fn role_name(&self) -> &str {
        self.role_name.as_str()
    }

    /// Returns the optional role description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the trusted token issuer.
    #[must_use]
    pub fn provider(&self) -> &OidcProvider {
        &self.provider
    }

    /// Returns the trust policy.
    #[must_use]
    pub fn trust(&self) -> &TrustPolicy {
        &self.trust
    }

    /// Returns session bounds.
    #[must_use]
    pub fn session(&self) -> SessionDuration {
        self.session
    }

    /// Returns inline permission sets.
    #[must_use]
    pub fn inline_policies(&self) -> &[InlinePolicy] {
        &self.inline_policies
    }

    /// Returns attached managed policy ARNs.
    #[must_use]
    pub fn managed_policy_arns(&self) -> &[String] {
        &self.managed_policy_arns
    }

    /// Iterates every statement across all inline policies.
    pub fn statements(&self) -> impl Iterator<Item = &PermissionStatement> {
        self.inline_policies
            .iter()
            .flat_map(|policy| policy.statements().iter())
    }

    /// Returns whether any statement grants an action on every resource.
    #[must_use]
    pub fn has_unscoped_statements(&self) -> bool {
        self.statements()
            .any(|statement| statement.resources().is_any())
    }

    /// Narrows every inline statement to the given resource scope.
    #[must_use]
    pub fn with_resources(self, resources: &ResourceScope) -> Self {
        Self {
            inline_policies: self
                .inline_policies
                .into_iter()
                .map(|policy| policy.with_resources(resources))
                .collect(),
            ..self
        }
    }
}

impl TryFrom<RoleGrantInput> for RoleGrant {
    type Error = AppError;

    fn try_from(value: RoleGrantInput) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RoleGrant> for RoleGrantInput {
    fn from(value: RoleGrant) -> Self {
        let session_duration_seconds = (value.session.requested_seconds
            != value.session.maximum_seconds)
            .then_some(value.session.requested_seconds);

        Self {
            provider: value.provider.into(),
            trust: value.trust.into(),
            role_name: value.role_name.into(),
            description: value.description,
            max_session_duration_seconds: value.session.maximum_seconds,
            session_duration_seconds,
            inline_policies: value.inline_policies.into_iter().map(Into::into).collect(),
            managed_policy_arns: value.managed_policy_arns,
        }
    }
}

fn validate_role_name(role_name: String) -> AppResult<NonEmptyString> {
    let role_name = NonEmptyString::for_field("role_name", role_name)?;

    if role_name.as_str().chars().count() > ROLE_NAME_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "role_name must not exceed {ROLE_NAME_MAX_LENGTH} characters"
        )));
    }

    let is_valid = role_name.as_str().chars().all(|character| {
        character.is_ascii_alphanumeric() || "+=,.@_-".contains(character)
    });
    if !is_valid {
        return Err(AppError::Validation(format!(
            "role_name '{role_name}' may only contain alphanumerics and '+=,.@_-'"
        )));
    }

    Ok(role_name)
}

fn validate_description(description: Option<String>) -> AppResult<Option<String>> {
    let description = description.and_then(|value| {
        let trimmed = value.trim().to_owned();
        (!trimmed.is_empty()).then_some(trimmed)
    });

    if description
        .as_deref()
        .is_some_and(|value| value.chars().count() > ROLE_DESCRIPTION_MAX_LENGTH)
    {
        return Err(AppError::Validation(format!(
            "description must not exceed {ROLE_DESCRIPTION_MAX_LENGTH} characters"
        )));
    }

    Ok(description)
}

fn validate_unique_names(inline_policies: &[InlinePolicy]) -> AppResult<()> {
    let mut policy_names = HashSet::new();
    for policy in inline_policies {
        if !policy_names.insert(policy.name()) {
            return Err(AppError::Validation(format!(
                "inline policy name '{}' is declared more than once",
                policy.name()
            )));
        }
    }

    let mut sids = HashSet::new();
    for statement in inline_policies
        .iter()
        .flat_map(|policy| policy.statements().iter())
    {
        if !sids.insert(statement.sid()) {
            return Err(AppError::DuplicateStatementId {
                sid: statement.sid().to_owned(),
            });
        }
    }

    Ok(())
}

fn validate_managed_policy_arns(arns: Vec<String>) -> AppResult<Vec<String>> {
    let mut validated: Vec<String> = Vec::with_capacity(arns.len());
    for arn in arns {
        let arn = arn.trim().to_owned();
        if !arn.starts_with("arn:") {
            return Err(AppError::Validation(format!(
                "managed_policy_arns entry '{arn}' must be an ARN"
            )));
        }

        if validated.contains(&arn) {
            return Err(AppError::Validation(format!(
                "managed_policy_arns entry '{arn}' is declared more than once"
            )));
        }

        validated.push(arn);
    }

    Ok(validated)
}
