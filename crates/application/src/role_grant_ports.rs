use std::str::FromStr;

use async_trait::async_trait;

use trustgrant_core::{AppError, AppResult};

/// Rendering of a role grant handed to the provisioning engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// CloudFormation template declaring the provider and the role.
    Template,
    /// Standalone IAM trust and inline policy documents.
    Documents,
    /// Round-trippable role grant configuration.
    Grant,
}

impl OutputFormat {
    /// Returns a stable command value for this format.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "synth",
            Self::Documents => "documents",
            Self::Grant => "grant",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "synth" => Ok(Self::Template),
            "documents" => Ok(Self::Documents),
            "grant" => Ok(Self::Grant),
            _ => Err(AppError::Validation(format!(
                "unknown output format '{value}'"
            ))),
        }
    }
}

/// Serialized role grant ready for publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOutput {
    /// Format the body was rendered in.
    pub format: OutputFormat,
    /// Role name the body describes.
    pub role_name: String,
    /// Pretty-printed JSON body.
    pub body: String,
}

/// Output port receiving rendered role grants.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Publishes one rendered role grant.
    async fn publish(&self, output: &RenderedOutput) -> AppResult<()>;
}
