//! Save and job command implementations

use serde::Serialize;
use serde_json::json;
use shipdash_core::{
    CoreError, OperationHandle, OperationStatus, PollOptions, SaveRequest, wait_for_operation,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::{DateRangeArgs, JobCommands, OutputFormat, PollingArgs, WaitArgs};
use crate::connection::{Connection, ConnectionManager};
use crate::error::{Result as CliResult, ShipdashError};
use crate::output::print_output;
use crate::progress::{JobProgress, format_state};

/// Job status as printed, with the id alongside the status fields
#[derive(Serialize)]
struct JobView<'a> {
    job_id: &'a str,
    #[serde(flatten)]
    status: &'a OperationStatus,
}

/// Handle `shipdash save`
pub async fn handle_save(
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    url: Option<&str>,
    range: &DateRangeArgs,
    wait: &WaitArgs,
    output_format: OutputFormat,
) -> CliResult<()> {
    let conn = conn_mgr.connect(profile, url)?;

    let mut request = SaveRequest::new(range.start_date, range.end_date);
    if let Some(project) = &range.project {
        request = request.project(project);
    }
    if let Some(channel) = &range.channel {
        request = request.channel(channel);
    }

    let handle = conn.client.submit_save(&request).await?;
    info!("Save job started: {}", handle);

    if wait.wait {
        if is_human(output_format) {
            println!("Save job started: {}", handle);
        }
        let options = conn.poll_options(&wait.polling);
        return wait_and_print(&conn, handle, options, output_format).await;
    }

    match output_format {
        OutputFormat::Auto | OutputFormat::Table => {
            println!("Save job started: {}", handle);
            println!(
                "To wait for completion, run: shipdash job wait {}",
                handle
            );
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            print_output(json!({ "job_id": handle }), output_format.into())?;
        }
    }
    Ok(())
}

/// Handle `shipdash job ...`
pub async fn handle_job_command(
    job_cmd: &JobCommands,
    conn_mgr: &ConnectionManager,
    profile: Option<&str>,
    url: Option<&str>,
    output_format: OutputFormat,
) -> CliResult<()> {
    let conn = conn_mgr.connect(profile, url)?;

    match job_cmd {
        JobCommands::Status { id } => {
            let handle = OperationHandle::new(id.as_str());
            let status = conn.client.get_status(&handle).await?;
            if !status.is_recognized_state() {
                eprintln!(
                    "warning: job {} reported unknown state '{}'",
                    handle, status.reported_state
                );
            }
            print_job(&handle, &status, output_format)
        }
        JobCommands::Wait { id, polling } => {
            let options = conn.poll_options(polling);
            wait_and_print(&conn, OperationHandle::new(id.as_str()), options, output_format)
                .await
        }
    }
}

/// Poll until the job finishes, with a spinner and Ctrl-C handling
async fn wait_and_print(
    conn: &Connection,
    handle: OperationHandle,
    options: PollOptions,
    output_format: OutputFormat,
) -> CliResult<()> {
    debug!(
        "Waiting for job {} on profile {:?} (interval {:?}, max attempts {:?})",
        handle, conn.profile, options.interval, options.max_attempts
    );

    let progress = JobProgress::new(&handle, is_human(output_format));
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let result = wait_for_operation(
        &conn.client,
        handle.clone(),
        options,
        progress.callback(&handle),
        Some(cancel),
    )
    .await;
    interrupt.abort();

    match result {
        Ok(status) => print_job(&handle, &status, output_format),
        Err(CoreError::Cancelled) => {
            progress.abandon(format!("Stopped waiting for job {}", handle));
            Err(ShipdashError::Interrupted {
                id: handle.to_string(),
            })
        }
        Err(e) => {
            progress.abandon(format!("Job {} did not complete", handle));
            Err(e.into())
        }
    }
}

fn print_job(
    handle: &OperationHandle,
    status: &OperationStatus,
    output_format: OutputFormat,
) -> CliResult<()> {
    let view = JobView {
        job_id: handle.as_str(),
        status,
    };

    match output_format {
        OutputFormat::Auto => print_job_details(&view),
        OutputFormat::Table | OutputFormat::Json | OutputFormat::Yaml => {
            print_output(&view, output_format.into())?;
        }
    }
    Ok(())
}

/// Print detailed job information
fn print_job_details(view: &JobView<'_>) {
    println!("\nJob Details:");
    println!("------------");
    println!("ID: {}", view.job_id);
    println!("Status: {}", format_state(view.status));

    if !view.status.message.is_empty() {
        println!("Message: {}", view.status.message);
    }
    if let Some(progress) = &view.status.progress {
        println!("Progress: {}", progress);
    }
    if let Some(detail) = &view.status.detail {
        if let Some(processed) = detail.processed {
            println!("Processed: {}", processed);
        }
        if let Some(saved) = detail.saved {
            println!("Saved: {}", saved);
        }
        if let Some(errors) = detail.errors {
            println!("Errors: {}", errors);
        }
        if let Some(duration) = detail.duration {
            println!("Duration: {:.1}s", duration);
        }
    }
}

fn is_human(output_format: OutputFormat) -> bool {
    matches!(output_format, OutputFormat::Auto | OutputFormat::Table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output;
    use shipdash_core::OperationDetail;

    #[test]
    fn test_job_view_flattens_status() {
        let status = OperationStatus::new("completed", "Saved 120 demands").with_detail(
            OperationDetail {
                saved: Some(120),
                ..Default::default()
            },
        );
        let view = JobView {
            job_id: "job-7",
            status: &status,
        };

        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["job_id"], "job-7");
        assert_eq!(value["state"], "completed");
        assert_eq!(value["origin"], "backend");
        assert_eq!(value["detail"]["saved"], 120);

        let rendered = output::render(&view, output::OutputFormat::Table).unwrap();
        assert!(rendered.contains("detail.saved"));
    }
}
