//! Default CDK deployment role for GitHub Actions.

use trustgrant_domain::{
    Effect, GITHUB_ACTIONS_ISSUER_URL, InlinePolicyInput, MIN_SESSION_SECONDS, OidcProviderInput,
    PermissionStatementInput, RoleGrantInput, STS_AUDIENCE, TrustPolicyInput,
};

/// Default role name.
pub const DEFAULT_ROLE_NAME: &str = "GitHubActions";

/// Default role description.
pub const DEFAULT_ROLE_DESCRIPTION: &str = "Role for Github Actions to deploy using CDK";

/// Name of the default inline policy.
pub const DEFAULT_POLICY_NAME: &str = "GithubActionsPolicy";

/// Returns the inline policy CDK deployments need, scoped to `resources`.
#[must_use]
pub fn cdk_deployment_policy(resources: Vec<String>) -> InlinePolicyInput {
    InlinePolicyInput {
        name: DEFAULT_POLICY_NAME.to_owned(),
        statements: vec![
            allow(
                "AllowCDKDeployments",
                &[
                    "cloudformation:*",
                    "s3:ListBucket",
                    "s3:GetObject",
                    "s3:PutObject",
                    "iam:PassRole",
                    "ssm:GetParameter",
                    "ssm:GetParameters",
                    "ssm:DescribeParameters",
                ],
                resources.clone(),
            ),
            allow(
                "AllowEC2Operations",
                &["ec2:Describe*", "ec2:CreateTags", "ec2:DeleteTags"],
                resources.clone(),
            ),
            allow(
                "AllowLambdaOperations",
                &[
                    "lambda:CreateFunction",
                    "lambda:DeleteFunction",
                    "lambda:InvokeFunction",
                    "lambda:UpdateFunctionCode",
                    "lambda:UpdateFunctionConfiguration",
                ],
                resources,
            ),
        ],
    }
}

/// Returns the GitHub Actions deploy role trusting `allowed_subjects`.
///
/// The role allows one-hour sessions and attaches no managed policies.
#[must_use]
pub fn github_actions_role_input(
    allowed_subjects: Vec<String>,
    resources: Vec<String>,
) -> RoleGrantInput {
    RoleGrantInput {
        provider: OidcProviderInput {
            issuer_url: GITHUB_ACTIONS_ISSUER_URL.to_owned(),
            client_ids: vec![STS_AUDIENCE.to_owned()],
            thumbprints: Vec::new(),
        },
        trust: TrustPolicyInput {
            audience: STS_AUDIENCE.to_owned(),
            allowed_subjects,
        },
        role_name: DEFAULT_ROLE_NAME.to_owned(),
        description: Some(DEFAULT_ROLE_DESCRIPTION.to_owned()),
        max_session_duration_seconds: MIN_SESSION_SECONDS,
        session_duration_seconds: None,
        inline_policies: vec![cdk_deployment_policy(resources)],
        managed_policy_arns: Vec::new(),
    }
}

fn allow(sid: &str, actions: &[&str], resources: Vec<String>) -> PermissionStatementInput {
    PermissionStatementInput {
        sid: sid.to_owned(),
        effect: Effect::Allow,
        actions: actions.iter().map(|action| (*action).to_owned()).collect(),
        resources,
    }
}
