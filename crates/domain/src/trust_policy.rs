//! Federated trust policy evaluated against incoming identity tokens.
//!
//! Matching semantics are enforced by the cloud identity service, not here.
//! A wrong audience or a subject that never occurs in a real token is not an
//! error at construction time: every assumption attempt is rejected later by
//! the provider. [`TrustPolicy::lockout_hazards`] reports the shapes known to
//! cause such silent lockouts so callers can surface them as warnings.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use trustgrant_core::{AppError, AppResult, NonEmptyString};

use crate::identity_provider::{OidcProvider, STS_AUDIENCE};

/// Action granted to the federated principal.
pub const ASSUME_ROLE_WITH_WEB_IDENTITY: &str = "sts:AssumeRoleWithWebIdentity";

/// Prefix GitHub Actions uses for every subject claim.
pub const GITHUB_SUBJECT_PREFIX: &str = "repo:";

/// Condition operator applied to token claims.
///
/// Only exact equality is offered. `StringLike` patterns on the subject claim
/// (for example `repo:<owner>/<repo>:*`) previously failed to match tokens
/// from this issuer, as did branch subjects of the form
/// `repo:<owner>/<repo>:ref/refs/heads/<branch>`; list every allowed subject
/// explicitly instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionOperator {
    /// Claim value must equal one of the listed values.
    StringEquals,
}

impl ConditionOperator {
    /// Returns the policy-language operator name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StringEquals => "StringEquals",
        }
    }
}

/// One claim condition of the trust policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustCondition {
    /// Operator applied to the claim.
    pub operator: ConditionOperator,
    /// Fully qualified claim key, e.g. `token.actions.githubusercontent.com:sub`.
    pub key: String,
    /// Accepted claim values.
    pub values: Vec<String>,
}

/// Configuration shape that is known to lock callers out without any local error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockoutHazard {
    /// Subject contains a wildcard character that exact matching treats literally.
    WildcardSubject(String),
    /// Subject does not follow the `repo:<owner>/<repo>:<context>` shape.
    UnrecognizedSubjectShape(String),
    /// Audience differs from the value the token service issues for federation.
    NonStandardAudience(String),
}

impl LockoutHazard {
    /// Returns a short operator-facing explanation.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::WildcardSubject(subject) => format!(
                "subject '{subject}' contains a wildcard but is matched with StringEquals; \
                 wildcard subject matching did not work for this issuer, list exact subjects"
            ),
            Self::UnrecognizedSubjectShape(subject) => format!(
                "subject '{subject}' does not start with '{GITHUB_SUBJECT_PREFIX}' and will \
                 likely never match a workflow token"
            ),
            Self::NonStandardAudience(audience) => format!(
                "audience '{audience}' differs from '{STS_AUDIENCE}'; tokens requested with \
                 the default audience will be rejected"
            ),
        }
    }
}

/// Input payload used to construct a validated trust policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustPolicyInput {
    /// Required audience claim value.
    pub audience: String,
    /// Exact-match subject allowlist.
    pub allowed_subjects: Vec<String>,
}

/// Predicate over federated tokens: one audience and an exact subject set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustPolicy {
    audience: NonEmptyString,
    allowed_subjects: BTreeSet<NonEmptyString>,
}

impl TrustPolicy {
    /// Creates a validated trust policy.
    pub fn new(input: TrustPolicyInput) -> AppResult<Self> {
        let TrustPolicyInput {
            audience,
            allowed_subjects,
        } = input;

        let audience = NonEmptyString::for_field("trust.audience", audience)?;

        let allowed_subjects = allowed_subjects
            .into_iter()
            .map(|subject| NonEmptyString::for_field("trust.allowed_subjects[]", subject))
            .collect::<AppResult<BTreeSet<_>>>()?;

        if allowed_subjects.is_empty() {
            return Err(AppError::Validation(
                "trust.allowed_subjects must contain at least one subject".to_owned(),
            ));
        }

        Ok(Self {
            audience,
            allowed_subjects,
        })
    }

    /// Returns the required audience claim value.
    #[must_use]
    pub fn audience(&self) -> &str {
        self.audience.as_str()
    }

    /// Returns the allowed subjects in sorted order.
    pub fn allowed_subjects(&self) -> impl Iterator<Item = &str> {
        self.allowed_subjects.iter().map(NonEmptyString::as_str)
    }

    /// Returns whether a token subject is allowed by exact equality.
    #[must_use]
    pub fn allows_subject(&self, subject: &str) -> bool {
        self.allowed_subjects
            .iter()
            .any(|allowed| allowed.as_str() == subject)
    }

    /// Returns the audience and subject conditions keyed by the issuer.
    #[must_use]
    pub fn conditions(&self, provider: &OidcProvider) -> Vec<TrustCondition> {
        let issuer_key = provider.issuer_key();
        vec![
            TrustCondition {
                operator: ConditionOperator::StringEquals,
                key: format!("{issuer_key}:aud"),
                values: vec![self.audience.to_string()],
            },
            TrustCondition {
                operator: ConditionOperator::StringEquals,
                key: format!("{issuer_key}:sub"),
                values: self.allowed_subjects().map(str::to_owned).collect(),
            },
        ]
    }

    /// Returns configuration shapes that would silently reject every caller.
    #[must_use]
    pub fn lockout_hazards(&self) -> Vec<LockoutHazard> {
        let mut hazards = Vec::new();

        if self.audience.as_str() != STS_AUDIENCE {
            hazards.push(LockoutHazard::NonStandardAudience(
                self.audience.to_string(),
            ));
        }

        for subject in self.allowed_subjects() {
            if subject.contains(['*', '?']) {
                hazards.push(LockoutHazard::WildcardSubject(subject.to_owned()));
            } else if !subject.starts_with(GITHUB_SUBJECT_PREFIX) {
                hazards.push(LockoutHazard::UnrecognizedSubjectShape(subject.to_owned()));
            }
        }

        hazards
    }
}

impl From<TrustPolicy> for TrustPolicyInput {
    fn from(value: TrustPolicy) -> Self {
        Self {
            audience: value.audience.into(),
            allowed_subjects: value
                .allowed_subjects
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}
