//! Spinlock-based mutual exclusion for O(1) critical sections.
//!
//! Use [`Mutex`] only when:
//!
//! - Every operation under the lock is O(1) (index arithmetic, a slot swap)
//! - No blocking, I/O, or syscalls happen while the lock is held
//! - The guard is dropped before any `.await`
//! - No other lock is acquired while it is held
//!
//! The [`BoundedQueue`](crate::queue::BoundedQueue) meets all four, which is
//! why its ring buffer sits behind this lock rather than `std::sync::Mutex`.
//!
//! # Example
//!
//! ```
//! use corral_async::sync::spin::Mutex;
//!
//! let counter = Mutex::new(0usize);
//! *counter.lock() += 1;
//! assert_eq!(*counter.lock(), 1);
//! ```

pub use spin::MutexGuard;

/// A spinlock-based mutex for O(1) operations.
///
/// A thin wrapper around `spin::Mutex`. Poisoning does not exist here: a
/// panic while the guard is held simply releases the lock.
#[derive(Debug, Default)]
pub struct Mutex<T>(spin::Mutex<T>);

impl<T> Mutex<T> {
    /// Creates a new Mutex containing the given value.
    #[inline]
    pub const fn new(value: T) -> Self {
        Self(spin::Mutex::new(value))
    }

    /// Acquires the lock, spinning until it becomes available.
    ///
    /// Returns a guard that releases the lock when dropped.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.0.lock()
    }

    /// Attempts to acquire the lock without spinning.
    ///
    /// Returns `Some(guard)` if the lock was acquired, `None` if it was already held.
    #[inline]
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.0.try_lock()
    }
}
