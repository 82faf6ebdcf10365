//! Synchronization primitives for short, non-blocking critical sections.
//!
//! # Submodules
//!
//! - [`spin`] - Spinlock-based mutex for O(1) critical sections
//!
//! # Choosing the Right Primitive
//!
//! | Use Case | Primitive |
//! |----------|-----------|
//! | O(1) ops, never waits for space or data | [`spin::Mutex`] |
//! | Waiting for another task to make progress | a channel or [`crate::CancellationToken`] |

pub mod spin;
