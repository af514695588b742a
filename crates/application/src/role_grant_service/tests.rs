use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use trustgrant_core::{AccountId, AppError, AppResult};
use trustgrant_domain::{
    Effect, GITHUB_ACTIONS_ISSUER_URL, InlinePolicyInput, PermissionStatementInput, RoleGrant,
    RoleGrantInput, STS_AUDIENCE,
};

use crate::deployment_policy::github_actions_role_input;
use crate::role_grant_ports::{OutputFormat, OutputSink, RenderedOutput};

use super::RoleGrantService;

#[derive(Default)]
struct FakeOutputSink {
    published: Mutex<Vec<RenderedOutput>>,
}

#[async_trait]
impl OutputSink for FakeOutputSink {
    async fn publish(&self, output: &RenderedOutput) -> AppResult<()> {
        self.published.lock().await.push(output.clone());
        Ok(())
    }
}

struct FailingOutputSink;

#[async_trait]
impl OutputSink for FailingOutputSink {
    async fn publish(&self, _output: &RenderedOutput) -> AppResult<()> {
        Err(AppError::Internal("disk full".to_owned()))
    }
}

fn service() -> (RoleGrantService, Arc<FakeOutputSink>) {
    let sink = Arc::new(FakeOutputSink::default());
    (RoleGrantService::new(sink.clone()), sink)
}

fn dev_input() -> RoleGrantInput {
    github_actions_role_input(
        vec!["repo:org/repo:environment:dev".to_owned()],
        vec!["*".to_owned()],
    )
}

fn account() -> AccountId {
    AccountId::new("123456789012").unwrap_or_else(|_| unreachable!())
}

fn statement(sid: &str, actions: &[&str]) -> PermissionStatementInput {
    PermissionStatementInput {
        sid: sid.to_owned(),
        effect: Effect::Allow,
        actions: actions.iter().map(|action| (*action).to_owned()).collect(),
        resources: vec!["*".to_owned()],
    }
}

#[tokio::test]
async fn single_environment_subject_is_published_as_exact_match() {
    let (service, sink) = service();

    let result = service
        .synthesize(dev_input(), OutputFormat::Documents, Some(&account()))
        .await;
    assert!(result.is_ok());

    let published = sink.published.lock().await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].role_name, "GitHubActions");

    let body: Value = serde_json::from_str(published[0].body.as_str()).unwrap_or_default();
    let conditions = &body["trust_policy"]["Statement"][0]["Condition"];
    assert_eq!(
        conditions["StringEquals"]["token.actions.githubusercontent.com:aud"],
        Value::String(STS_AUDIENCE.to_owned())
    );
    assert_eq!(
        conditions["StringEquals"]["token.actions.githubusercontent.com:sub"],
        serde_json::json!(["repo:org/repo:environment:dev"])
    );
    assert!(conditions.get("StringLike").is_none());
}

#[tokio::test]
async fn duplicate_statement_ids_are_not_published() {
    let (service, sink) = service();
    let mut input = dev_input();
    input.inline_policies = vec![InlinePolicyInput {
        name: "GithubActionsPolicy".to_owned(),
        statements: vec![
            statement("AllowCDKDeployments", &["cloudformation:*"]),
            statement("AllowCDKDeployments", &["s3:PutObject"]),
        ],
    }];

    let result = service.synthesize(input, OutputFormat::Template, None).await;

    assert!(matches!(
        result,
        Err(AppError::DuplicateStatementId { ref sid }) if sid == "AllowCDKDeployments"
    ));
    assert!(sink.published.lock().await.is_empty());
}

#[tokio::test]
async fn empty_action_list_is_not_published() {
    let (service, sink) = service();
    let mut input = dev_input();
    input.inline_policies[0].statements[1].actions.clear();

    let result = service.synthesize(input, OutputFormat::Template, None).await;

    assert!(matches!(
        result,
        Err(AppError::EmptyActions { ref sid }) if sid == "AllowEC2Operations"
    ));
    assert!(sink.published.lock().await.is_empty());
}

#[tokio::test]
async fn session_beyond_role_maximum_is_not_published() {
    let (service, sink) = service();
    let mut input = dev_input();
    input.session_duration_seconds = Some(10_800);

    let result = service.synthesize(input, OutputFormat::Template, None).await;

    assert!(matches!(
        result,
        Err(AppError::SessionDurationOutOfBounds {
            requested_seconds: 10_800,
            max_seconds: 3_600,
            ..
        })
    ));
    assert!(sink.published.lock().await.is_empty());
}

#[tokio::test]
async fn documents_require_an_account() {
    let (service, sink) = service();

    let result = service
        .synthesize(dev_input(), OutputFormat::Documents, None)
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(sink.published.lock().await.is_empty());
}

#[tokio::test]
async fn published_grant_parses_back_to_equal_grant() {
    let (service, sink) = service();

    let grant = service
        .synthesize(dev_input(), OutputFormat::Grant, None)
        .await;
    assert!(grant.is_ok());
    let grant = grant.unwrap_or_else(|_| unreachable!());

    let published = sink.published.lock().await;
    let restored = serde_json::from_str::<RoleGrant>(published[0].body.as_str());
    assert!(restored.is_ok());
    assert_eq!(restored.unwrap_or_else(|_| unreachable!()), grant);
}

#[tokio::test]
async fn template_output_declares_both_resources() {
    let (service, sink) = service();

    let result = service
        .synthesize(dev_input(), OutputFormat::Template, None)
        .await;
    assert!(result.is_ok());

    let published = sink.published.lock().await;
    assert_eq!(published[0].format, OutputFormat::Template);
    let body: Value = serde_json::from_str(published[0].body.as_str()).unwrap_or_default();
    let resources = body["Resources"].as_object().map(|resources| resources.len());
    assert_eq!(resources, Some(2));
    assert_eq!(
        body["Resources"]["DeployOidcProvider"]["Properties"]["Url"],
        Value::String(GITHUB_ACTIONS_ISSUER_URL.to_owned())
    );
}

#[tokio::test]
async fn sink_failures_are_propagated() {
    let service = RoleGrantService::new(Arc::new(FailingOutputSink));

    let result = service
        .synthesize(dev_input(), OutputFormat::Template, None)
        .await;

    assert!(matches!(result, Err(AppError::Internal(_))));
}

#[test]
fn declare_accepts_hazardous_but_valid_trust() {
    let (service, _) = service();
    let mut input = dev_input();
    input.trust.allowed_subjects = vec!["repo:org/repo:*".to_owned()];

    let grant = service.declare(input);

    assert!(grant.is_ok());
    let grant = grant.unwrap_or_else(|_| unreachable!());
    assert_eq!(grant.trust().lockout_hazards().len(), 1);
}

#[test]
fn documents_key_inline_policies_by_name() {
    let (service, _) = service();
    let grant = service
        .declare(dev_input())
        .unwrap_or_else(|_| unreachable!());

    let documents = service.documents(&grant, &account());

    assert_eq!(documents.role_name, "GitHubActions");
    assert_eq!(
        documents.inline_policies.keys().collect::<Vec<_>>(),
        vec!["GithubActionsPolicy"]
    );
    assert!(documents.managed_policy_arns.is_empty());
}
