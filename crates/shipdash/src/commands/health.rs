use colored::Colorize;
use serde_json::json;
use tracing::debug;

use crate::cli::OutputFormat;
use crate::connection::ConnectionManager;
use crate::error::{Result as CliResult, ShipdashError};
use crate::output::print_output;

/// Handle `shipdash health`
pub async fn handle_health(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    url: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<()> {
    let conn = conn_mgr.connect(profile, url)?;
    let health = conn.client.health().await?;
    debug!("Health status: {}", health.status);

    match output_format {
        OutputFormat::Auto => {
            if health.is_ok() {
                println!(
                    "{} {} is healthy",
                    "\u{2713}".green(),
                    conn.client.base_url()
                );
            }
        }
        _ => {
            print_output(
                json!({
                    "url": conn.client.base_url(),
                    "status": health.status,
                }),
                output_format.into(),
            )?;
        }
    }

    if !health.is_ok() {
        return Err(ShipdashError::ApiError {
            message: format!("backend reported status '{}'", health.status),
        });
    }
    Ok(())
}
