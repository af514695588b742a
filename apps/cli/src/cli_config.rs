use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;
use trustgrant_application::{
    DEFAULT_ROLE_DESCRIPTION, DEFAULT_ROLE_NAME, OutputFormat, cdk_deployment_policy,
};
use trustgrant_core::{AccountId, AppError, AppResult};
use trustgrant_domain::{
    ANY_RESOURCE, GITHUB_ACTIONS_ISSUER_URL, InlinePolicyInput, MIN_SESSION_SECONDS,
    OidcProviderInput, RoleGrantInput, STS_AUDIENCE, TrustPolicyInput,
};

/// Command selected by the first CLI argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Validate the configuration without publishing anything.
    Validate,
    /// Render and publish the grant in one output format.
    Render(OutputFormat),
}

impl FromStr for Command {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "validate" => Ok(Self::Validate),
            other => OutputFormat::from_str(other).map(Self::Render).map_err(|_| {
                AppError::Validation(format!(
                    "unknown command '{other}', expected one of synth, documents, grant, validate"
                ))
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub command: Command,
    pub grant: RoleGrantInput,
    pub account_id: Option<AccountId>,
    pub output_path: Option<PathBuf>,
}

impl CliConfig {
    pub async fn load() -> AppResult<Self> {
        Self::from_sources(env::args().skip(1), |name| env::var(name).ok()).await
    }

    /// Builds the configuration from CLI arguments (without the program name)
    /// and a variable lookup. Blank variables count as unset.
    pub async fn from_sources<F>(
        mut args: impl Iterator<Item = String>,
        lookup: F,
    ) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let command = args
            .next()
            .map(|value| Command::from_str(value.as_str()))
            .transpose()?
            .unwrap_or(Command::Render(OutputFormat::Template));

        let issuer_url = optional_env(&lookup, "TRUSTGRANT_ISSUER_URL")
            .unwrap_or_else(|| GITHUB_ACTIONS_ISSUER_URL.to_owned());
        let audience = optional_env(&lookup, "TRUSTGRANT_AUDIENCE")
            .unwrap_or_else(|| STS_AUDIENCE.to_owned());
        let allowed_subjects = split_list(
            required_non_empty_env(&lookup, "TRUSTGRANT_ALLOWED_SUBJECTS")?.as_str(),
        );
        let thumbprints = split_list(
            optional_env(&lookup, "TRUSTGRANT_THUMBPRINTS")
                .unwrap_or_default()
                .as_str(),
        );

        let role_name = optional_env(&lookup, "TRUSTGRANT_ROLE_NAME")
            .unwrap_or_else(|| DEFAULT_ROLE_NAME.to_owned());
        let description = optional_env(&lookup, "TRUSTGRANT_ROLE_DESCRIPTION")
            .unwrap_or_else(|| DEFAULT_ROLE_DESCRIPTION.to_owned());

        let max_session_duration_seconds =
            parse_env_u32(&lookup, "TRUSTGRANT_MAX_SESSION_SECONDS", MIN_SESSION_SECONDS)?;
        let session_duration_seconds =
            parse_optional_env_u32(&lookup, "TRUSTGRANT_SESSION_SECONDS")?;

        let inline_policies = match optional_env(&lookup, "TRUSTGRANT_POLICY_FILE") {
            Some(path) => load_policy_file(path.as_str()).await?,
            None => {
                let resources = split_list(
                    optional_env(&lookup, "TRUSTGRANT_RESOURCE_SCOPE")
                        .unwrap_or_else(|| ANY_RESOURCE.to_owned())
                        .as_str(),
                );
                vec![cdk_deployment_policy(resources)]
            }
        };

        let managed_policy_arns = split_list(
            optional_env(&lookup, "TRUSTGRANT_MANAGED_POLICY_ARNS")
                .unwrap_or_default()
                .as_str(),
        );

        let account_id = optional_env(&lookup, "TRUSTGRANT_ACCOUNT_ID")
            .map(AccountId::new)
            .transpose()
            .map_err(|error| {
                AppError::Validation(format!("invalid TRUSTGRANT_ACCOUNT_ID: {error}"))
            })?;

        let output_path = optional_env(&lookup, "TRUSTGRANT_OUTPUT").map(PathBuf::from);

        Ok(Self {
            command,
            grant: RoleGrantInput {
                provider: OidcProviderInput {
                    issuer_url,
                    client_ids: vec![audience.clone()],
                    thumbprints,
                },
                trust: TrustPolicyInput {
                    audience,
                    allowed_subjects,
                },
                role_name,
                description: Some(description),
                max_session_duration_seconds,
                session_duration_seconds,
                inline_policies,
                managed_policy_arns,
            },
            account_id,
            output_path,
        })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn load_policy_file(path: &str) -> AppResult<Vec<InlinePolicyInput>> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|error| {
        AppError::Validation(format!("failed to read TRUSTGRANT_POLICY_FILE '{path}': {error}"))
    })?;

    parse_policy_file(contents.as_str()).map_err(|error| {
        AppError::Validation(format!("invalid TRUSTGRANT_POLICY_FILE '{path}': {error}"))
    })
}

fn parse_policy_file(contents: &str) -> Result<Vec<InlinePolicyInput>, serde_json::Error> {
    serde_json::from_str(contents)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}

fn optional_env<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|value| !value.trim().is_empty())
}

fn required_env<F>(lookup: &F, name: &str) -> AppResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env<F>(lookup: &F, name: &str) -> AppResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let value = required_env(lookup, name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn parse_env_u32<F>(lookup: &F, name: &str, default: u32) -> AppResult<u32>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_optional_env_u32(lookup, name)?.unwrap_or(default))
}

fn parse_optional_env_u32<F>(lookup: &F, name: &str) -> AppResult<Option<u32>>
where
    F: Fn(&str) -> Option<String>,
{
    optional_env(lookup, name)
        .map(|value| parse_u32(name, value.as_str()))
        .transpose()
}

fn parse_u32(name: &str, value: &str) -> AppResult<u32> {
    value.trim().parse::<u32>().map_err(|error| {
        AppError::Validation(format!("invalid {name} value '{value}': {error}"))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::str::FromStr;

    use trustgrant_application::{DEFAULT_POLICY_NAME, OutputFormat};
    use trustgrant_core::AppError;
    use trustgrant_domain::{Effect, MIN_SESSION_SECONDS, RoleGrant, STS_AUDIENCE};

    use super::{CliConfig, Command, parse_policy_file, parse_u32, split_list};

    const SUBJECT: &str = "repo:org/repo:environment:dev";

    async fn load(args: &[&str], vars: &[(&str, &str)]) -> Result<CliConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        CliConfig::from_sources(
            args.iter().map(|arg| (*arg).to_owned()).collect::<Vec<_>>().into_iter(),
            |name| vars.get(name).cloned(),
        )
        .await
    }

    #[tokio::test]
    async fn defaults_render_the_github_actions_template() {
        let config = load(&[], &[("TRUSTGRANT_ALLOWED_SUBJECTS", SUBJECT)]).await;
        assert!(config.is_ok());

        let config = config.unwrap_or_else(|_| unreachable!());
        assert_eq!(config.command, Command::Render(OutputFormat::Template));
        assert_eq!(config.grant.role_name, "GitHubActions");
        assert_eq!(config.grant.max_session_duration_seconds, MIN_SESSION_SECONDS);
        assert_eq!(config.grant.session_duration_seconds, None);
        assert_eq!(config.grant.inline_policies[0].name, DEFAULT_POLICY_NAME);
        assert!(config.grant.managed_policy_arns.is_empty());
        assert!(config.account_id.is_none());
        assert!(config.output_path.is_none());
        assert!(RoleGrant::new(config.grant).is_ok());
    }

    #[tokio::test]
    async fn missing_allowed_subjects_is_rejected() {
        let result = load(&["validate"], &[]).await;
        assert!(matches!(result, Err(AppError::Validation(message)) if message.contains("TRUSTGRANT_ALLOWED_SUBJECTS")));

        let result = load(&[], &[("TRUSTGRANT_ALLOWED_SUBJECTS", "  ")]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn audience_is_trust_audience_and_sole_client_id() {
        let config = load(
            &["documents"],
            &[
                ("TRUSTGRANT_ALLOWED_SUBJECTS", SUBJECT),
                ("TRUSTGRANT_AUDIENCE", "api://deploy"),
                ("TRUSTGRANT_ACCOUNT_ID", "123456789012"),
            ],
        )
        .await
        .unwrap_or_else(|_| unreachable!());

        assert_eq!(config.command, Command::Render(OutputFormat::Documents));
        assert_eq!(config.grant.trust.audience, "api://deploy");
        assert_eq!(config.grant.provider.client_ids, vec!["api://deploy".to_owned()]);
        assert_ne!(config.grant.trust.audience, STS_AUDIENCE);
        assert_eq!(
            config.account_id.map(String::from).as_deref(),
            Some("123456789012")
        );
    }

    #[tokio::test]
    async fn resource_scope_narrows_default_statements() {
        let config = load(
            &[],
            &[
                ("TRUSTGRANT_ALLOWED_SUBJECTS", SUBJECT),
                (
                    "TRUSTGRANT_RESOURCE_SCOPE",
                    "arn:aws:s3:::cdk-assets-*, arn:aws:cloudformation:*:*:stack/CDKToolkit/*",
                ),
            ],
        )
        .await
        .unwrap_or_else(|_| unreachable!());

        let policy = &config.grant.inline_policies[0];
        assert_eq!(policy.statements.len(), 3);
        assert!(policy.statements.iter().all(|statement| {
            statement.resources
                == vec![
                    "arn:aws:s3:::cdk-assets-*".to_owned(),
                    "arn:aws:cloudformation:*:*:stack/CDKToolkit/*".to_owned(),
                ]
        }));

        let grant = RoleGrant::new(config.grant).unwrap_or_else(|_| unreachable!());
        assert!(!grant.has_unscoped_statements());
    }

    #[tokio::test]
    async fn policy_file_replaces_default_policy() {
        let path = std::env::temp_dir().join(format!(
            "trustgrant-{}-policy.json",
            std::process::id()
        ));
        let contents = r#"[{
            "name": "ArtifactsPolicy",
            "statements": [{
                "sid": "AllowArtifactUpload",
                "effect": "Allow",
                "actions": ["s3:PutObject"],
                "resources": ["arn:aws:s3:::artifacts/*"]
            }]
        }]"#;
        assert!(tokio::fs::write(&path, contents).await.is_ok());

        let path_value = path.to_string_lossy().into_owned();
        let config = load(
            &["grant"],
            &[
                ("TRUSTGRANT_ALLOWED_SUBJECTS", SUBJECT),
                ("TRUSTGRANT_POLICY_FILE", path_value.as_str()),
                ("TRUSTGRANT_RESOURCE_SCOPE", "arn:aws:s3:::ignored"),
            ],
        )
        .await;
        let _ = tokio::fs::remove_file(&path).await;

        let config = config.unwrap_or_else(|_| unreachable!());
        assert_eq!(config.grant.inline_policies.len(), 1);
        assert_eq!(config.grant.inline_policies[0].name, "ArtifactsPolicy");
        assert_eq!(
            config.grant.inline_policies[0].statements[0].resources,
            vec!["arn:aws:s3:::artifacts/*".to_owned()]
        );
    }

    #[tokio::test]
    async fn missing_policy_file_is_rejected() {
        let result = load(
            &[],
            &[
                ("TRUSTGRANT_ALLOWED_SUBJECTS", SUBJECT),
                ("TRUSTGRANT_POLICY_FILE", "/nonexistent/trustgrant/policy.json"),
            ],
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(message)) if message.contains("TRUSTGRANT_POLICY_FILE")));
    }

    #[tokio::test]
    async fn blank_session_values_count_as_unset() {
        let config = load(
            &[],
            &[
                ("TRUSTGRANT_ALLOWED_SUBJECTS", SUBJECT),
                ("TRUSTGRANT_MAX_SESSION_SECONDS", ""),
                ("TRUSTGRANT_SESSION_SECONDS", " "),
            ],
        )
        .await
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.grant.max_session_duration_seconds, MIN_SESSION_SECONDS);
        assert_eq!(config.grant.session_duration_seconds, None);

        let result = load(
            &[],
            &[
                ("TRUSTGRANT_ALLOWED_SUBJECTS", SUBJECT),
                ("TRUSTGRANT_SESSION_SECONDS", "one hour"),
            ],
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unknown_command_is_rejected() {
        let result = load(&["deploy"], &[("TRUSTGRANT_ALLOWED_SUBJECTS", SUBJECT)]).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn commands_map_to_output_formats() {
        assert_eq!(Command::from_str("validate").ok(), Some(Command::Validate));
        assert_eq!(
            Command::from_str("synth").ok(),
            Some(Command::Render(OutputFormat::Template))
        );
        assert_eq!(
            Command::from_str("documents").ok(),
            Some(Command::Render(OutputFormat::Documents))
        );
        assert!(Command::from_str("deploy").is_err());
    }

    #[test]
    fn lists_are_split_on_commas_and_trimmed() {
        assert_eq!(
            split_list(" repo:org/repo:environment:dev , ,repo:org/repo:environment:prod"),
            vec![
                "repo:org/repo:environment:dev".to_owned(),
                "repo:org/repo:environment:prod".to_owned(),
            ]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn numeric_values_report_variable_name() {
        assert_eq!(parse_u32("TRUSTGRANT_MAX_SESSION_SECONDS", " 7200 ").ok(), Some(7_200));
        let error = parse_u32("TRUSTGRANT_MAX_SESSION_SECONDS", "1h").err();
        assert!(
            error
                .map(|error| error.to_string().contains("TRUSTGRANT_MAX_SESSION_SECONDS"))
                .unwrap_or(false)
        );
    }

    #[test]
    fn policy_file_uses_inline_policy_shape() {
        let policies = parse_policy_file(
            r#"[{
                "name": "ArtifactsPolicy",
                "statements": [{
                    "sid": "AllowArtifactUpload",
                    "effect": "Allow",
                    "actions": ["s3:PutObject"],
                    "resources": ["arn:aws:s3:::artifacts/*"]
                }]
            }]"#,
        );
        assert!(policies.is_ok());

        let policies = policies.unwrap_or_default();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].statements[0].effect, Effect::Allow);
        assert_eq!(
            policies[0].statements[0].resources,
            vec!["arn:aws:s3:::artifacts/*".to_owned()]
        );
    }
}
