//! Shared primitives for all Rust crates in Trustgrant.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across Trustgrant crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string with surrounding whitespace removed.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Creates a validated non-empty string, naming the field on failure.
    pub fn for_field(field: &str, value: impl Into<String>) -> AppResult<Self> {
        Self::new(value)
            .map_err(|_| AppError::Validation(format!("{field} must not be empty or whitespace")))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl Display for NonEmptyString {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Twelve-digit cloud account identifier used when rendering ARNs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Creates a validated account identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.len() != 12 || !trimmed.chars().all(|character| character.is_ascii_digit()) {
            return Err(AppError::Validation(format!(
                "account id must be exactly 12 digits, got '{trimmed}'"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the account identifier digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for AccountId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.0
    }
}

impl Display for AccountId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Two permission statements in one role share an identifier.
    #[error("validation error: duplicate statement id '{sid}'")]
    DuplicateStatementId {
        /// Statement identifier that occurs more than once.
        sid: String,
    },

    /// A permission statement declares no actions.
    #[error("validation error: statement '{sid}' must declare at least one action")]
    EmptyActions {
        /// Identifier of the offending statement.
        sid: String,
    },

    /// A session duration lies outside the accepted bounds.
    #[error(
        "validation error: {field} of {requested_seconds}s must be between {min_seconds}s and {max_seconds}s"
    )]
    SessionDurationOutOfBounds {
        /// Configuration field carrying the duration.
        field: &'static str,
        /// Requested duration in seconds.
        requested_seconds: u32,
        /// Inclusive lower bound in seconds.
        min_seconds: u32,
        /// Inclusive upper bound in seconds.
        max_seconds: u32,
    },

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns whether the error is a configuration defect detected locally.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}
