use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use trustgrant_core::{AppError, AppResult, NonEmptyString};

/// Wildcard resource identifier.
pub const ANY_RESOURCE: &str = "*";

/// Whether a statement grants or denies its actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// Grants the listed actions.
    Allow,
    /// Denies the listed actions, overriding any allow.
    Deny,
}

impl Effect {
    /// Returns the policy-language effect value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

/// Service-qualified action identifier such as `s3:GetObject` or `ec2:Describe*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActionPattern(String);

impl ActionPattern {
    /// Creates a validated action pattern.
    ///
    /// The service prefix is lowercase alphanumeric with `-`; the action name
    /// is alphanumeric and may end in a single `*` wildcard.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        let Some((service, action)) = trimmed.split_once(':') else {
            return Err(AppError::Validation(format!(
                "action '{trimmed}' must have the form 'service:Action'"
            )));
        };

        let service_is_valid = !service.is_empty()
            && service
                .chars()
                .all(|character| character.is_ascii_lowercase() || character.is_ascii_digit() || character == '-');
        if !service_is_valid {
            return Err(AppError::Validation(format!(
                "action '{trimmed}' has an invalid service prefix '{service}'"
            )));
        }

        let name = action.strip_suffix('*').unwrap_or(action);
        let name_is_valid = name.chars().all(|character| character.is_ascii_alphanumeric());
        if action.is_empty() || !name_is_valid {
            return Err(AppError::Validation(format!(
                "action '{trimmed}' may only use '*' as a trailing wildcard"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the full action identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the service prefix.
    #[must_use]
    pub fn service(&self) -> &str {
        self.0.split_once(':').map_or("", |(service, _)| service)
    }

    /// Returns whether the pattern ends in a wildcard.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.0.ends_with('*')
    }

    /// Returns whether a concrete action is covered by this pattern.
    #[must_use]
    pub fn covers(&self, action: &str) -> bool {
        match self.0.strip_suffix('*') {
            Some(prefix) => action
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix)),
            None => self.0.eq_ignore_ascii_case(action),
        }
    }
}

impl TryFrom<String> for ActionPattern {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ActionPattern> for String {
    fn from(value: ActionPattern) -> Self {
        value.0
    }
}

impl Display for ActionPattern {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Resources a statement applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceScope {
    /// Every resource (`*`).
    Any,
    /// An explicit list of resource ARNs or ARN patterns.
    Arns(Vec<NonEmptyString>),
}

impl ResourceScope {
    /// Parses a resource list; `["*"]` is [`ResourceScope::Any`].
    pub fn from_resources(resources: Vec<String>) -> AppResult<Self> {
        if resources.is_empty() {
            return Err(AppError::Validation(
                "resources must contain at least one entry".to_owned(),
            ));
        }

        let mut arns: Vec<NonEmptyString> = Vec::with_capacity(resources.len());
        for resource in resources {
            let resource = NonEmptyString::for_field("resources[]", resource)?;
            if !arns.contains(&resource) {
                arns.push(resource);
            }
        }

        let has_any = arns.iter().any(|resource| resource.as_str() == ANY_RESOURCE);
        if has_any && arns.len() > 1 {
            return Err(AppError::Validation(
                "resources must not mix '*' with specific resources".to_owned(),
            ));
        }

        if has_any {
            return Ok(Self::Any);
        }

        Ok(Self::Arns(arns))
    }

    /// Returns the resource identifiers as rendered in a policy document.
    #[must_use]
    pub fn to_resources(&self) -> Vec<String> {
        match self {
            Self::Any => vec![ANY_RESOURCE.to_owned()],
            Self::Arns(arns) => arns.iter().map(ToString::to_string).collect(),
        }
    }

    /// Returns whether the scope is the universal wildcard.
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

/// Input payload used to construct a validated permission statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionStatementInput {
    /// Statement identifier, unique within the role.
    pub sid: String,
    /// Allow or deny.
    pub effect: Effect,
    /// Action identifiers.
    pub actions: Vec<String>,
    /// Resource identifiers; `["*"]` for every resource.
    pub resources: Vec<String>,
}

/// One authorization rule attached to the role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionStatement {
    sid: NonEmptyString,
    effect: Effect,
    actions: Vec<ActionPattern>,
    resources: ResourceScope,
}

impl PermissionStatement {
    /// Creates a validated permission statement.
    pub fn new(input: PermissionStatementInput) -> AppResult<Self> {
        let PermissionStatementInput {
            sid,
            effect,
            actions,
            resources,
        } = input;

        let sid = NonEmptyString::for_field("statement.sid", sid)?;
        if !sid
            .as_str()
            .chars()
            .all(|character| character.is_ascii_alphanumeric())
        {
            return Err(AppError::Validation(format!(
                "statement.sid '{sid}' must be alphanumeric"
            )));
        }

        if actions.is_empty() {
            return Err(AppError::EmptyActions { sid: sid.into() });
        }

        let mut parsed_actions: Vec<ActionPattern> = Vec::with_capacity(actions.len());
        for action in actions {
            let action = ActionPattern::new(action).map_err(|error| match error {
                AppError::Validation(message) => {
                    AppError::Validation(format!("statement '{sid}': {message}"))
                }
                other => other,
            })?;
            if !parsed_actions.contains(&action) {
                parsed_actions.push(action);
            }
        }

        let resources = ResourceScope::from_resources(resources).map_err(|error| match error {
            AppError::Validation(message) => {
                AppError::Validation(format!("statement '{sid}': {message}"))
            }
            other => other,
        })?;

        Ok(Self {
            sid,
            effect,
            actions: parsed_actions,
            resources,
        })
    }

    /// Returns the statement identifier.
    #[must_use]
    pub fn sid(&self) -> &str {
        self.sid.as_str()
    }

    /// Returns the statement effect.
    #[must_use]
    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Returns the statement actions.
    #[must_use]
    pub fn actions(&self) -> &[ActionPattern] {
        &self.actions
    }

    /// Returns the statement resource scope.
    #[must_use]
    pub fn resources(&self) -> &ResourceScope {
        &self.resources
    }

    /// Returns a copy of the statement with a different resource scope.
    #[must_use]
    pub fn with_resources(mut self, resources: ResourceScope) -> Self {
        self.resources = resources;
        self
    }

    /// Returns whether the statement allows the action on every resource.
    #[must_use]
    pub fn allows_everywhere(&self, action: &str) -> bool {
        self.effect == Effect::Allow
            && self.resources.is_any()
            && self.actions.iter().any(|pattern| pattern.covers(action))
    }
}

impl From<PermissionStatement> for PermissionStatementInput {
    fn from(value: PermissionStatement) -> Self {
        Self {
            sid: value.sid.into(),
            effect: value.effect,
            actions: value
                .actions
                .into_iter()
                .map(|action| action.0)
                .collect(),
            resources: value.resources.to_resources(),
        }
    }
}

/// Input payload used to construct a named inline policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlinePolicyInput {
    /// Policy name, unique within the role.
    pub name: String,
    /// Policy statements.
    pub statements: Vec<PermissionStatementInput>,
}

/// Named permission set embedded in the role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinePolicy {
    name: NonEmptyString,
    statements: Vec<PermissionStatement>,
}

impl InlinePolicy {
    /// Creates a validated inline policy.
    pub fn new(input: InlinePolicyInput) -> AppResult<Self> {
        let name = NonEmptyString::for_field("inline_policies[].name", input.name)?;

        if input.statements.is_empty() {
            return Err(AppError::Validation(format!(
                "inline policy '{name}' must contain at least one statement"
            )));
        }

        let statements = input
            .statements
            .into_iter()
            .map(PermissionStatement::new)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self { name, statements })
    }

    /// Returns the policy name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the policy statements.
    #[must_use]
    pub fn statements(&self) -> &[PermissionStatement] {
        &self.statements
    }

    /// Narrows every statement to the given resource scope.
    #[must_use]
    pub fn with_resources(self, resources: &ResourceScope) -> Self {
        Self {
            name: self.name,
            statements: self
                .statements
                .into_iter()
                .map(|statement| statement.with_resources(resources.clone()))
                .collect(),
        }
    }
}

impl From<InlinePolicy> for InlinePolicyInput {
    fn from(value: InlinePolicy) -> Self {
        Self {
            name: value.name.into(),
            statements: value.statements.into_iter().map(Into::into).collect(),
        }
    }
}
