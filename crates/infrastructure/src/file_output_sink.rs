use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;
use trustgrant_application::{OutputSink, RenderedOutput};
use trustgrant_core::{AppError, AppResult};

/// Output sink that writes rendered grants to a file, replacing its contents.
#[derive(Debug, Clone)]
pub struct FileOutputSink {
    path: PathBuf,
}

impl FileOutputSink {
    /// Creates a file output sink targeting `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the target path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }
}

#[async_trait]
impl OutputSink for FileOutputSink {
    async fn publish(&self, output: &RenderedOutput) -> AppResult<()> {
        if let Some(parent) = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            tokio::fs::create_dir_all(parent).await.map_err(|error| {
                AppError::Internal(format!(
                    "failed to create output directory '{}': {error}",
                    parent.display()
                ))
            })?;
        }

        let mut body = output.body.clone();
        body.push('\n');
        tokio::fs::write(&self.path, body.as_bytes())
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to write output file '{}': {error}",
                    self.path.display()
                ))
            })?;

        info!(
            path = %self.path.display(),
            role_name = %output.role_name,
            format = %output.format.as_str(),
            bytes = body.len(),
            "rendered role grant written"
        );

        Ok(())
    }
}
