//! Stdout output sink for piping rendered grants into a provisioning engine.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, stdout};
use tracing::debug;
use trustgrant_application::{OutputSink, RenderedOutput};
use trustgrant_core::{AppError, AppResult};

/// Output sink that writes rendered grants to standard output.
#[derive(Clone)]
pub struct StdoutOutputSink;

impl StdoutOutputSink {
    /// Creates a new stdout output sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for StdoutOutputSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputSink for StdoutOutputSink {
    async fn publish(&self, output: &RenderedOutput) -> AppResult<()> {
        write_body(&mut stdout(), output.body.as_str())
            .await
            .map_err(|error| AppError::Internal(format!("failed to write to stdout: {error}")))?;

        debug!(
            role_name = %output.role_name,
            format = %output.format.as_str(),
            "rendered role grant written to stdout"
        );

        Ok(())
    }
}

async fn write_body<W>(writer: &mut W, body: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(body.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
