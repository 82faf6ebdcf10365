//! Fan-in of many channels into one.
//!
//! [`merge`] spawns one worker per source channel. Each worker forwards its
//! source's elements, in order, into a shared output channel, until either the
//! source closes or the [`CancellationToken`] fires. Both of a worker's waits,
//! reading from its source and forwarding to the output, are raced against
//! the token, so cancellation stops every worker promptly even if a source
//! never closes or nobody is reading the output.
//!
//! # Closing the output
//!
//! Workers run on a [`TaskTracker`]. A coordinator task owns the last output
//! sender, waits for the tracker to drain, and only then drops the sender.
//! The output therefore closes exactly once, strictly after every worker has
//! stopped, and no element can be sent after it closes.
//!
//! # Example
//!
//! ```no_run
//! use corral_async::{CancellationToken, merge};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let cancel = CancellationToken::new();
//! let (tx_a, rx_a) = flume::bounded(0);
//! let (tx_b, rx_b) = flume::bounded(0);
//!
//! let out = merge(&cancel, [rx_a, rx_b]);
//!
//! tokio::spawn(async move {
//!     for i in 0..5 {
//!         tx_a.send_async(i).await.unwrap();
//!     }
//! });
//! tokio::spawn(async move {
//!     for i in 5..10 {
//!         tx_b.send_async(i).await.unwrap();
//!     }
//! });
//!
//! let mut all = Vec::new();
//! while let Ok(v) = out.recv_async().await {
//!     all.push(v);
//! }
//! all.sort();
//! assert_eq!(all, (0..10).collect::<Vec<_>>());
//! # });
//! ```
//!
//! [`TaskTracker`]: tokio_util::task::TaskTracker

use crate::cancellation_token::CancellationToken;
use crate::spawn::spawn;
use tracing::{debug, trace};

/// Merge configuration.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Number of elements the output channel buffers before workers block.
    ///
    /// `0` makes the output a rendezvous channel: a forward completes only
    /// when a consumer takes the element.
    #[cfg_attr(feature = "serde", serde(default = "default_output_depth"))]
    pub output_depth: usize,
}

fn default_output_depth() -> usize {
    0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_depth: default_output_depth(),
        }
    }
}

/// Merges `sources` into a single output channel.
///
/// Equivalent to [`merge_with_config`] with the default [`Config`].
pub fn merge<T, I>(cancel: &CancellationToken, sources: I) -> flume::Receiver<T>
where
    T: Send + 'static,
    I: IntoIterator,
    I::Item: Into<Option<flume::Receiver<T>>>,
{
    merge_with_config(cancel, sources, &Config::default())
}

/// Merges `sources` into a single output channel.
///
/// Absent (`None`) sources are skipped. Elements from one source arrive in
/// the order that source produced them; elements from different sources
/// interleave arbitrarily. The output closes once every source has closed, or
/// promptly after `cancel` fires. Under cancellation an element already read
/// from a source but not yet forwarded is dropped.
///
/// With no sources at all, the output is returned already closed and nothing
/// is spawned. Otherwise this must be called from within a tokio runtime.
pub fn merge_with_config<T, I>(
    cancel: &CancellationToken,
    sources: I,
    config: &Config,
) -> flume::Receiver<T>
where
    T: Send + 'static,
    I: IntoIterator,
    I::Item: Into<Option<flume::Receiver<T>>>,
{
    let (tx, rx) = flume::bounded(config.output_depth);

    let mut sources = sources
        .into_iter()
        .filter_map(Into::<Option<flume::Receiver<T>>>::into)
        .enumerate()
        .peekable();

    if sources.peek().is_none() {
        trace!("No sources to merge, output closed immediately");
        return rx;
    }

    let workers = tokio_util::task::TaskTracker::new();
    for (index, source) in sources {
        let output = tx.clone();
        let cancel = cancel.clone();
        spawn!(workers, "merge_worker", (index), async move {
            forward(index, source, output, cancel).await
        });
    }
    workers.close();
    debug!("Merging {} sources", workers.len());

    // The coordinator holds the last sender, so the output closes only here
    tokio::spawn(async move {
        workers.wait().await;
        drop(tx);
        trace!("All merge workers finished, output closed");
    });

    rx
}

async fn forward<T>(
    index: usize,
    source: flume::Receiver<T>,
    output: flume::Sender<T>,
    cancel: CancellationToken,
) {
    trace!("Merge worker {index} started");
    loop {
        let value = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                trace!("Merge worker {index} cancelled while reading");
                return;
            }
            r = source.recv_async() => match r {
                Ok(value) => value,
                Err(_) => {
                    trace!("Merge source {index} closed");
                    return;
                }
            },
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                trace!("Merge worker {index} cancelled while forwarding, element discarded");
                return;
            }
            r = output.send_async(value) => if r.is_err() {
                trace!("Merge output dropped by consumer, worker {index} stopping");
                return;
            },
        }
    }
}
