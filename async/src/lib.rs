//! Cancellable concurrency primitives built on tokio.
//!
//! This crate provides three independent coordination primitives that share a
//! common cancellation model:
//!
//! # Features
//!
//! - **invoke**: Runs a fallible computation in the background and waits for
//!   its result only until a timeout elapses or a token fires
//! - **merge**: Fans any number of channels into a single output channel,
//!   with backpressure and prompt shutdown on cancellation
//! - **BoundedQueue**: A fixed-capacity ring buffer safe for concurrent
//!   push/pop/peek, reporting fullness and emptiness as errors
//!
//! All three observe a caller-owned [`CancellationToken`]; none of them
//! leaves background work running after it has observed cancellation.
//!
//! # Example
//!
//! ```no_run
//! use corral_async::{CancellationToken, invoke};
//! use time::Duration;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let cancel = CancellationToken::new();
//!
//! let result = invoke::invoke_with_deadline(
//!     || Ok::<_, std::io::Error>(fetch()),
//!     Duration::milliseconds(50),
//!     &cancel,
//! )
//! .await;
//!
//! match result {
//!     Ok(data) => println!("{data}"),
//!     Err(invoke::Error::DeadlineExceeded) => println!("too slow"),
//!     Err(e) => println!("failed: {e}"),
//! }
//! # });
//!
//! # fn fetch() -> String { String::new() }
//! ```

mod spawn;

pub mod cancellation_token;
pub mod invoke;
pub mod merge;
pub mod queue;
pub mod sync;
pub mod time;

// Re-export commonly used types at crate root
pub use cancellation_token::{CancelReason, CancellationToken};
pub use invoke::{invoke_future_with_deadline, invoke_with_deadline};
pub use merge::{merge, merge_with_config};
pub use queue::BoundedQueue;
