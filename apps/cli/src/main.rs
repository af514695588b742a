//! Trustgrant command-line entry point.

#![forbid(unsafe_code)]

mod cli_config;

use std::sync::Arc;

use tracing::info;
use trustgrant_application::{OutputSink, RoleGrantService};
use trustgrant_core::AppError;
use trustgrant_infrastructure::{FileOutputSink, StdoutOutputSink};

use crate::cli_config::{CliConfig, Command, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = CliConfig::load().await?;

    let output_sink: Arc<dyn OutputSink> = match config.output_path.clone() {
        Some(path) => Arc::new(FileOutputSink::new(path)),
        None => Arc::new(StdoutOutputSink::new()),
    };
    let service = RoleGrantService::new(output_sink);

    match config.command {
        Command::Validate => {
            let grant = service.declare(config.grant)?;
            info!(role_name = %grant.role_name(), "configuration is valid");
        }
        Command::Render(format) => {
            service
                .synthesize(config.grant, format, config.account_id.as_ref())
                .await?;
        }
    }

    Ok(())
}
