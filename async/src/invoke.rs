//! Bounded-time invocation of opaque computations.
//!
//! [`invoke_with_deadline`] runs a computation on a background task and waits
//! for its result only until a timeout elapses or a [`CancellationToken`]
//! fires, whichever comes first. The computation is never interrupted: if the
//! caller stops waiting, the computation keeps running and its result is
//! dropped on delivery.
//!
//! The result is handed back through a single-slot channel, so the background
//! task's one send can never block, even when nobody is listening any more.
//!
//! # Example
//!
//! ```no_run
//! use corral_async::{CancellationToken, invoke};
//! use time::Duration;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let cancel = CancellationToken::new();
//! let result = invoke::invoke_with_deadline(
//!     || {
//!         std::thread::sleep(std::time::Duration::from_millis(100));
//!         Ok::<_, std::io::Error>("data")
//!     },
//!     Duration::milliseconds(10),
//!     &cancel,
//! )
//! .await;
//!
//! assert!(matches!(result, Err(invoke::Error::DeadlineExceeded)));
//! # });
//! ```

use crate::cancellation_token::{CancelReason, CancellationToken};
use std::future::Future;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Error, Debug)]
pub enum Error<E> {
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("Cancelled: {0}")]
    Cancelled(CancelReason),

    #[error("Operation terminated without producing a result")]
    Abandoned,

    #[error(transparent)]
    OperationFailed(E),
}

impl<E> Error<E> {
    /// Returns the operation's own error, if that is what this is.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::OperationFailed(e) => Some(e),
            _ => None,
        }
    }
}

type Slot<V, E> = flume::Sender<Result<V, E>>;

fn handoff<V, E>(slot: Slot<V, E>, result: Result<V, E>) {
    // Capacity is 1 and this is the only send, so it never blocks
    if slot.try_send(result).is_err() {
        trace!("Caller stopped waiting, discarding late result");
    }
}

fn check_entry<E>(
    timeout: time::Duration,
    cancel: &CancellationToken,
) -> Result<tokio::time::Instant, Error<E>> {
    if let Some(reason) = cancel.reason() {
        debug!("Token already fired on entry: {reason}");
        return Err(Error::Cancelled(reason));
    }
    if !timeout.is_positive() {
        debug!("Non-positive timeout {timeout}, failing immediately");
        return Err(Error::DeadlineExceeded);
    }
    Ok(crate::time::deadline(timeout))
}

async fn race<V, E>(
    slot: flume::Receiver<Result<V, E>>,
    deadline: tokio::time::Instant,
    cancel: &CancellationToken,
) -> Result<V, Error<E>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            let reason = cancel.reason().unwrap_or_default();
            debug!("Stopped waiting for operation: {reason}");
            Err(Error::Cancelled(reason))
        }
        r = slot.recv_async() => match r {
            Ok(r) => r.map_err(Error::OperationFailed),
            Err(_) => {
                debug!("Operation dropped its result slot without delivering");
                Err(Error::Abandoned)
            }
        },
        _ = tokio::time::sleep_until(deadline) => {
            debug!("Deadline elapsed before operation completed");
            Err(Error::DeadlineExceeded)
        }
    }
}

/// Runs a blocking `operation` and waits at most `timeout` for its result.
///
/// The operation runs on tokio's blocking thread pool. Returns:
///
/// - the operation's own result, unchanged, if it arrives first
///   (errors become [`Error::OperationFailed`])
/// - [`Error::DeadlineExceeded`] if `timeout` elapses first, measured from the call
/// - [`Error::Cancelled`] if `cancel` fires first, carrying its reason
/// - [`Error::Abandoned`] if the operation panicked
///
/// If `cancel` has already fired, or `timeout` is zero or negative, the
/// corresponding error is returned at once without starting the operation.
/// Cancellation wins any tie.
pub async fn invoke_with_deadline<F, V, E>(
    operation: F,
    timeout: time::Duration,
    cancel: &CancellationToken,
) -> Result<V, Error<E>>
where
    F: FnOnce() -> Result<V, E> + Send + 'static,
    V: Send + 'static,
    E: Send + 'static,
{
    let deadline = check_entry::<E>(timeout, cancel)?;

    let (tx, rx) = flume::bounded(1);
    tokio::task::spawn_blocking(move || handoff(tx, operation()));

    race(rx, deadline, cancel).await
}

/// Runs an async `operation` on its own task and waits at most `timeout` for
/// its result.
///
/// Behaves exactly like [`invoke_with_deadline`], except that the operation
/// is a future spawned onto the runtime rather than a blocking closure. The
/// spawned task is not aborted when the caller stops waiting.
pub async fn invoke_future_with_deadline<F, V, E>(
    operation: F,
    timeout: time::Duration,
    cancel: &CancellationToken,
) -> Result<V, Error<E>>
where
    F: Future<Output = Result<V, E>> + Send + 'static,
    V: Send + 'static,
    E: Send + 'static,
{
    let deadline = check_entry::<E>(timeout, cancel)?;

    let (tx, rx) = flume::bounded(1);
    tokio::spawn(async move { handoff(tx, operation.await) });

    race(rx, deadline, cancel).await
}
