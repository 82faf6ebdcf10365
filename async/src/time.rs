//! Time utilities for signed-duration deadlines.
//!
//! Timeouts throughout this crate are expressed as [`time::Duration`], which
//! may be zero or negative. These helpers map such durations onto tokio's
//! timer, treating anything non-positive as "already elapsed".
//!
//! # Example
//!
//! ```no_run
//! use corral_async::time::sleep;
//! use time::Duration;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! // Sleep for 5 seconds
//! sleep(Duration::seconds(5)).await;
//!
//! // Negative durations return immediately
//! sleep(Duration::seconds(-1)).await;  // No-op
//! # });
//! ```

fn to_std(duration: time::Duration) -> std::time::Duration {
    duration.try_into().unwrap_or(std::time::Duration::MAX)
}

/// Sleeps for the specified duration.
///
/// # Behavior
///
/// - Positive durations: sleeps for the specified time
/// - Zero or negative durations: returns immediately without sleeping
/// - Durations exceeding `std::time::Duration::MAX`: sleeps for `MAX`
pub async fn sleep(duration: time::Duration) {
    if !duration.is_positive() {
        return;
    }

    tokio::time::sleep(to_std(duration)).await;
}

/// Returns the instant `duration` from now.
///
/// Zero or negative durations return the current instant. Durations too large
/// to represent saturate to roughly thirty years from now, as tokio does for
/// far-future sleeps.
pub fn deadline(duration: time::Duration) -> tokio::time::Instant {
    let now = tokio::time::Instant::now();
    if !duration.is_positive() {
        return now;
    }

    now.checked_add(to_std(duration))
        .unwrap_or_else(|| now + std::time::Duration::from_secs(86400 * 365 * 30))
}
