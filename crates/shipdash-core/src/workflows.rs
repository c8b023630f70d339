//! Workflows - submit and wait
//!
//! These compose a submission call with the poller and turn the outcome into a
//! `Result`, for callers that only care about the end state.

use crate::client::{BackendClient, SaveRequest};
use crate::error::{CoreError, Result};
use crate::operation::{OperationHandle, OperationStatus, StatusOrigin};
use crate::poller::{PollOptions, PollOutcome, Poller, UpdateCallback};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Start a save-to-database job and wait for it to finish
///
/// The job id only comes back with the result. Callers that need to report it
/// while waiting (to resume after an interrupt, say) should call
/// `BackendClient::submit_save` and then `wait_for_operation`.
///
/// # Arguments
///
/// * `client` - The backend client
/// * `request` - Date range and filters
/// * `options` - Polling interval and attempt limit
/// * `on_update` - Receives every status snapshot, including the terminal one
/// * `cancel` - Optional token; cancelling it ends the wait with `CoreError::Cancelled`
///
/// # Example
///
/// ```rust,ignore
/// use shipdash_core::{save_and_wait, PollOptions, SaveRequest};
///
/// let (handle, status) = save_and_wait(
///     &client,
///     &SaveRequest::new(start, end),
///     PollOptions::default(),
///     Box::new(|s| println!("{}", s.message)),
///     None,
/// ).await?;
/// ```
pub async fn save_and_wait(
    client: &BackendClient,
    request: &SaveRequest,
    options: PollOptions,
    on_update: UpdateCallback,
    cancel: Option<CancellationToken>,
) -> Result<(OperationHandle, OperationStatus)> {
    let handle = client.submit_save(request).await?;
    info!(handle = %handle, "Save-to-db job submitted");

    let status = wait_for_operation(client, handle.clone(), options, on_update, cancel).await?;
    Ok((handle, status))
}

/// Poll an existing job until it finishes
///
/// Returns the terminal status on `completed`; every other ending is an error.
pub async fn wait_for_operation(
    client: &BackendClient,
    handle: OperationHandle,
    options: PollOptions,
    on_update: UpdateCallback,
    cancel: Option<CancellationToken>,
) -> Result<OperationStatus> {
    let session = Poller::new(client.clone())
        .with_options(options)
        .start(handle, on_update);

    let outcome = match cancel {
        Some(token) => {
            let session_token = session.cancellation_token();
            let waiter = session.wait();
            tokio::pin!(waiter);
            tokio::select! {
                outcome = &mut waiter => outcome,
                _ = token.cancelled() => {
                    session_token.cancel();
                    waiter.await
                }
            }
        }
        None => session.wait().await,
    };

    outcome_to_result(outcome, options)
}

fn outcome_to_result(outcome: PollOutcome, options: PollOptions) -> Result<OperationStatus> {
    match outcome {
        PollOutcome::Completed(status) => Ok(status),
        PollOutcome::Failed(status) => match status.origin {
            StatusOrigin::AttemptsExhausted => Err(CoreError::AttemptsExhausted(
                options.max_attempts.map(|n| n.get()).unwrap_or_default(),
            )),
            StatusOrigin::Backend | StatusOrigin::Transport => {
                let message = if status.message.is_empty() {
                    format!("job reported state '{}'", status.reported_state)
                } else {
                    status.message
                };
                Err(CoreError::OperationFailed(message))
            }
        },
        PollOutcome::Cancelled => Err(CoreError::Cancelled),
    }
}
