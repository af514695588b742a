//! Application services and ports.

#![forbid(unsafe_code)]

mod cloudformation;
mod deployment_policy;
mod iam_document;
mod role_grant_ports;
mod role_grant_service;

pub use cloudformation::{
    PROVIDER_LOGICAL_ID, ROLE_LOGICAL_ID, TEMPLATE_FORMAT_VERSION, synthesize_template,
};
pub use deployment_policy::{
    DEFAULT_POLICY_NAME, DEFAULT_ROLE_DESCRIPTION, DEFAULT_ROLE_NAME, cdk_deployment_policy,
    github_actions_role_input,
};
pub use iam_document::{
    POLICY_VERSION, PolicyDocument, PolicyStatementDocument, PrincipalDocument,
    ProviderReference, inline_policy_document, trust_policy_document,
};
pub use role_grant_ports::{OutputFormat, OutputSink, RenderedOutput};
pub use role_grant_service::{RoleDocuments, RoleGrantService};
