//! Fixed-capacity FIFO queue safe for concurrent use.
//!
//! [`BoundedQueue`] is a ring buffer behind a single [`spin::Mutex`]. Every
//! operation is one O(1) critical section, and none of them wait: a full
//! queue rejects `push` with [`Error::Full`] and an empty queue rejects
//! `pop`/`peek` with [`Error::Empty`]. A rejected call leaves the queue
//! untouched.
//!
//! # Example
//!
//! ```
//! use corral_async::queue::{BoundedQueue, Error};
//!
//! let queue = BoundedQueue::new(2).unwrap();
//! queue.push(1).unwrap();
//! queue.push(2).unwrap();
//! assert!(matches!(queue.push(3), Err(Error::Full)));
//!
//! assert_eq!(queue.pop().unwrap(), 1);
//! assert_eq!(queue.pop().unwrap(), 2);
//! assert!(matches!(queue.pop(), Err(Error::Empty)));
//! ```
//!
//! [`spin::Mutex`]: crate::sync::spin::Mutex

use crate::sync::spin::Mutex;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("Queue capacity must be positive")]
    InvalidCapacity,

    #[error("Queue is full")]
    Full,

    #[error("Queue is empty")]
    Empty,
}

struct Ring<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    size: usize,
}

impl<T> Ring<T> {
    fn advance(&self, index: usize) -> usize {
        (index + 1) % self.slots.len()
    }
}

/// A fixed-capacity, thread-safe FIFO ring buffer.
///
/// The capacity is chosen at construction and never changes. Share the queue
/// between threads or tasks with an `Arc`.
pub struct BoundedQueue<T> {
    ring: Mutex<Ring<T>>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Creates an empty queue holding at most `capacity` elements.
    ///
    /// Fails with [`Error::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, Error> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity);
        }

        Ok(Self {
            ring: Mutex::new(Ring {
                slots: (0..capacity).map(|_| None).collect(),
                head: 0,
                tail: 0,
                size: 0,
            }),
            capacity,
        })
    }

    /// Appends `value` at the back of the queue.
    pub fn push(&self, value: T) -> Result<(), Error> {
        let mut ring = self.ring.lock();
        if ring.size == self.capacity {
            return Err(Error::Full);
        }

        let tail = ring.tail;
        ring.slots[tail] = Some(value);
        ring.tail = ring.advance(tail);
        ring.size += 1;
        Ok(())
    }

    /// Removes and returns the element at the front of the queue.
    pub fn pop(&self) -> Result<T, Error> {
        let mut ring = self.ring.lock();
        if ring.size == 0 {
            return Err(Error::Empty);
        }

        let head = ring.head;
        let value = ring.slots[head].take().ok_or(Error::Empty)?;
        ring.head = ring.advance(head);
        ring.size -= 1;
        Ok(value)
    }

    /// Returns a copy of the element at the front of the queue without
    /// removing it.
    ///
    /// A `pop` with no intervening `push`/`pop` returns the same value.
    pub fn peek(&self) -> Result<T, Error>
    where
        T: Clone,
    {
        let ring = self.ring.lock();
        if ring.size == 0 {
            return Err(Error::Empty);
        }
        ring.slots[ring.head].clone().ok_or(Error::Empty)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of queued elements at the moment of the call.
    pub fn len(&self) -> usize {
        self.ring.lock().size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }
}

impl<T> core::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut d = f.debug_struct("BoundedQueue");
        d.field("capacity", &self.capacity);
        // Never spin inside a formatter
        match self.ring.try_lock() {
            Some(ring) => d.field("len", &ring.size),
            None => d.field("len", &format_args!("<locked>")),
        };
        d.finish()
    }
}
