//! Per-process request ids.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out request ids for log correlation.
///
/// Ids are unique and increasing for the lifetime of one counter. They carry
/// no other meaning.
#[derive(Debug, Default)]
pub struct RequestCounter(AtomicU64);

impl RequestCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id, starting at 1.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}
