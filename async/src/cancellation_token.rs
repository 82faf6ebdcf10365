//! Cooperative cancellation with a recorded reason.
//!
//! [`CancellationToken`] wraps `tokio_util::sync::CancellationToken` and adds
//! a reason slot, so that observers can distinguish an explicit cancel from an
//! elapsed deadline. The first fire records the reason; the signal itself is
//! level-triggered and stays fired forever.
//!
//! # Example
//!
//! ```no_run
//! use corral_async::{CancelReason, CancellationToken};
//! use time::Duration;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let token = CancellationToken::with_timeout(Duration::milliseconds(10));
//!
//! token.cancelled().await;
//! assert_eq!(token.reason(), Some(CancelReason::DeadlineExceeded));
//! # });
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

// Global fire order, so a token and its ancestors can agree on which fired first
static FIRE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

type Fired = (u64, CancelReason);

fn fire(
    inner: &tokio_util::sync::CancellationToken,
    slot: &spin::Once<Fired>,
    reason: CancelReason,
) {
    // Record before signalling, so every observer of the signal sees it
    if !inner.is_cancelled() {
        slot.call_once(|| (FIRE_SEQUENCE.fetch_add(1, Ordering::SeqCst), reason));
    }
    inner.cancel();
}

/// Why a [`CancellationToken`] fired.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CancelReason {
    /// Cancelled explicitly via [`CancellationToken::cancel()`].
    #[default]
    Cancelled,

    /// A deadline attached to the token elapsed.
    DeadlineExceeded,
}

impl core::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Cancelled => f.write_str("operation cancelled"),
            Self::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

/// A token for cooperative cancellation of async operations.
///
/// Clones share the same signal. Child tokens (see
/// [`child_token()`](CancellationToken::child_token)) fire when their parent
/// fires, but may also be fired on their own without affecting the parent.
///
/// # Key Methods
///
/// - `cancel()` / `cancel_with()` - Signal cancellation
/// - `is_cancelled()` - Check if cancellation has been requested
/// - `cancelled()` - Returns a future that completes when cancelled
/// - `wait_blocking()` - Blocks the current thread until cancelled
/// - `reason()` - Why the token fired, if it has
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: tokio_util::sync::CancellationToken,
    reason: Arc<spin::Once<Fired>>,
    parent: Option<Box<CancellationToken>>,
    // Stops the deadline timer once the last handle is dropped
    deadline: Option<Arc<tokio_util::sync::DropGuard>>,
}

impl CancellationToken {
    /// Creates a new, unfired cancellation token.
    pub fn new() -> Self {
        Self {
            inner: tokio_util::sync::CancellationToken::new(),
            reason: Arc::new(spin::Once::new()),
            parent: None,
            deadline: None,
        }
    }

    /// Creates a token that fires with [`CancelReason::DeadlineExceeded`]
    /// once `timeout` has elapsed.
    ///
    /// Must be called from within a tokio runtime unless `timeout` is
    /// non-positive, in which case the token is returned already fired.
    /// Dropping every handle to the token before the deadline stops its timer.
    pub fn with_timeout(timeout: time::Duration) -> Self {
        Self::new().arm_deadline(timeout)
    }

    /// Creates a child token that additionally fires with
    /// [`CancelReason::DeadlineExceeded`] once `timeout` has elapsed.
    pub fn child_with_timeout(&self, timeout: time::Duration) -> Self {
        self.child_token().arm_deadline(timeout)
    }

    fn arm_deadline(mut self, timeout: time::Duration) -> Self {
        if !timeout.is_positive() {
            self.cancel_with(CancelReason::DeadlineExceeded);
            return self;
        }

        // The timer holds no handle, only the signal and the reason slot
        let inner = self.inner.clone();
        let slot = self.reason.clone();
        let handles = tokio_util::sync::CancellationToken::new();
        let dropped = handles.clone();
        self.deadline = Some(Arc::new(handles.drop_guard()));

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = inner.cancelled() => {}
                _ = dropped.cancelled() => {
                    trace!("Token dropped before its deadline of {timeout}");
                }
                _ = crate::time::sleep(timeout) => {
                    trace!("Token deadline of {timeout} elapsed");
                    fire(&inner, &slot, CancelReason::DeadlineExceeded);
                }
            }
        });
        self
    }

    /// Creates a child token.
    ///
    /// The child is cancelled when this token is cancelled, and reports this
    /// token's reason. Cancelling the child does not affect this token.
    pub fn child_token(&self) -> Self {
        Self {
            inner: self.inner.child_token(),
            reason: Arc::new(spin::Once::new()),
            parent: Some(Box::new(self.clone())),
            deadline: None,
        }
    }

    /// Fires the token with [`CancelReason::Cancelled`].
    pub fn cancel(&self) {
        self.cancel_with(CancelReason::Cancelled)
    }

    /// Fires the token with the given reason.
    ///
    /// Only the first fire records a reason; later calls are no-ops. A token
    /// already fired through its parent keeps the parent's reason.
    pub fn cancel_with(&self, reason: CancelReason) {
        fire(&self.inner, &self.reason, reason)
    }

    /// Returns `true` if the token (or any ancestor) has fired.
    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// Returns a future that completes once the token has fired.
    ///
    /// Completes immediately if the token has already fired.
    pub fn cancelled(&self) -> impl Future<Output = ()> + '_ {
        self.inner.cancelled()
    }

    /// Blocks the current thread until the token has fired.
    ///
    /// This must not be called from within an async task, as it would stall
    /// the runtime worker thread.
    pub fn wait_blocking(&self) {
        futures::executor::block_on(self.inner.cancelled())
    }

    /// Returns the reason the token fired, or `None` if it has not.
    ///
    /// When both this token and an ancestor have fired, the reason of
    /// whichever fired first is reported.
    pub fn reason(&self) -> Option<CancelReason> {
        if !self.inner.is_cancelled() {
            return None;
        }
        Some(
            self.earliest_fire()
                .map(|(_, reason)| reason)
                .unwrap_or_default(),
        )
    }

    fn earliest_fire(&self) -> Option<Fired> {
        let own = self.reason.get().copied();
        let inherited = self
            .parent
            .as_ref()
            .filter(|p| p.is_cancelled())
            .and_then(|p| p.earliest_fire());
        match (own, inherited) {
            (Some(own), Some(inherited)) => Some(own.min(inherited)),
            (own, inherited) => own.or(inherited),
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[test]
    fn test_unfired_has_no_reason() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert_eq!(token.reason(), None);
    }

    #[test]
    fn test_first_reason_wins() {
        let token = CancellationToken::new();
        token.cancel_with(CancelReason::DeadlineExceeded);
        token.cancel();

        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some(CancelReason::DeadlineExceeded));
    }

    #[test]
    fn test_clones_share_signal() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();

        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some(CancelReason::Cancelled));
    }

    #[test]
    fn test_child_inherits_parent_reason() {
        let parent = CancellationToken::new();
        let child = parent.child_token();

        parent.cancel_with(CancelReason::DeadlineExceeded);

        assert!(child.is_cancelled());
        assert_eq!(child.reason(), Some(CancelReason::DeadlineExceeded));
    }

    #[test]
    fn test_child_cancel_leaves_parent() {
        let parent = CancellationToken::new();
        let child = parent.child_token();

        child.cancel();

        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
        assert_eq!(parent.reason(), None);
    }

    #[test]
    fn test_non_positive_timeout_fires_immediately() {
        // No runtime needed: nothing is spawned
        let token = CancellationToken::with_timeout(Duration::ZERO);
        assert_eq!(token.reason(), Some(CancelReason::DeadlineExceeded));

        let token = CancellationToken::with_timeout(Duration::seconds(-1));
        assert_eq!(token.reason(), Some(CancelReason::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_timeout_fires_with_deadline_reason() {
        let token = CancellationToken::with_timeout(Duration::milliseconds(10));
        assert!(!token.is_cancelled());

        tokio::time::timeout(std::time::Duration::from_secs(1), token.cancelled())
            .await
            .expect("token never fired");

        assert_eq!(token.reason(), Some(CancelReason::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_explicit_cancel_beats_deadline() {
        let parent = CancellationToken::new();
        let token = parent.child_with_timeout(Duration::seconds(10));

        parent.cancel();

        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some(CancelReason::Cancelled));
    }

    #[test]
    fn test_child_fired_first_keeps_own_reason() {
        let parent = CancellationToken::new();
        let child = parent.child_token();

        child.cancel();
        parent.cancel_with(CancelReason::DeadlineExceeded);

        assert_eq!(child.reason(), Some(CancelReason::Cancelled));
        assert_eq!(parent.reason(), Some(CancelReason::DeadlineExceeded));
    }

    #[test]
    fn test_parent_fire_between_check_and_record_wins() {
        let parent = CancellationToken::new();
        let child = parent.child_token();

        // The child passed its "not yet cancelled" check, then the parent
        // fired before the child recorded its own reason
        parent.cancel_with(CancelReason::DeadlineExceeded);
        child.reason.call_once(|| {
            (
                FIRE_SEQUENCE.fetch_add(1, Ordering::SeqCst),
                CancelReason::Cancelled,
            )
        });

        assert_eq!(child.reason(), Some(CancelReason::DeadlineExceeded));
    }

    #[test]
    fn test_concurrent_fires_report_a_single_reason() {
        for _ in 0..100 {
            let parent = CancellationToken::new();
            let child = parent.child_token();

            std::thread::scope(|s| {
                s.spawn(|| parent.cancel_with(CancelReason::DeadlineExceeded));
                s.spawn(|| child.cancel());
            });

            // Stable once fired
            let reason = child.reason();
            assert!(reason.is_some());
            assert_eq!(child.reason(), reason);
            assert_eq!(parent.reason(), Some(CancelReason::DeadlineExceeded));
        }
    }

    #[tokio::test]
    async fn test_clone_keeps_deadline_armed() {
        let token = CancellationToken::with_timeout(Duration::milliseconds(10));
        let clone = token.clone();
        drop(token);

        tokio::time::timeout(std::time::Duration::from_secs(1), clone.cancelled())
            .await
            .expect("deadline lost when the original handle was dropped");
        assert_eq!(clone.reason(), Some(CancelReason::DeadlineExceeded));
    }

    #[test]
    fn test_wait_blocking_wakes_on_cancel() {
        let token = CancellationToken::new();

        std::thread::scope(|s| {
            let waiter = token.clone();
            let handle = s.spawn(move || {
                waiter.wait_blocking();
                waiter.reason()
            });

            std::thread::sleep(std::time::Duration::from_millis(10));
            token.cancel();

            assert_eq!(handle.join().unwrap(), Some(CancelReason::Cancelled));
        });
    }
}
