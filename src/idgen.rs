//! Process-wide monotonic id allocator, safe under concurrent use from
//! BFS fetch workers. Grounded in `original_source/models.py`'s
//! `IDGenerator`.

use std::sync::atomic::{AtomicU64, Ordering};

/// A counter initialized to one less than `starting`; each call
/// atomically increments and returns the new value, so the first `next()`
/// after `new(0)` returns `1`.
#[derive(Debug)]
pub struct IdGenerator {
    current: AtomicU64,
}

impl IdGenerator {
    pub fn new(starting: u64) -> Self {
        Self {
            current: AtomicU64::new(starting),
        }
    }

    /// Allocates and returns the next id.
    pub fn next(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Re-seeds the generator so the next `next()` call returns `after + 1`.
    /// Used on resume to continue past the highest id already persisted.
    pub fn seed_after(&self, after: u64) {
        self.current.store(after, Ordering::SeqCst);
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}
