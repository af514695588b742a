//! Domain entities and invariants of a federated role grant.

#![forbid(unsafe_code)]

mod identity_provider;
mod permission;
mod role;
mod trust_policy;

pub use identity_provider::{
    GITHUB_ACTIONS_ISSUER_URL, MAX_THUMBPRINTS, OidcProvider, OidcProviderInput, STS_AUDIENCE,
};
pub use permission::{
    ANY_RESOURCE, ActionPattern, Effect, InlinePolicy, InlinePolicyInput, PermissionStatement,
    PermissionStatementInput, ResourceScope,
};
pub use role::{
    MAX_SESSION_SECONDS, MIN_SESSION_SECONDS, ROLE_DESCRIPTION_MAX_LENGTH, ROLE_NAME_MAX_LENGTH,
    RoleGrant, RoleGrantInput, SessionDuration,
};
pub use trust_policy::{
    ASSUME_ROLE_WITH_WEB_IDENTITY, ConditionOperator, GITHUB_SUBJECT_PREFIX, LockoutHazard,
    TrustCondition, TrustPolicy, TrustPolicyInput,
};
