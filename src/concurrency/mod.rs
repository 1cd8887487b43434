//! Concurrency support for the branded structures.
//!
//! Ghost types enforce aliasing discipline, not synchronization; the actual
//! synchronization lives in the branded atomics and the protocols built on
//! them. This module also provides the sharding helpers the pool allocator
//! uses to give each thread a home shard with minimal overhead.

pub mod atomic;
pub mod cache_padded;
/// Work-stealing deque and its continuous block array.
pub mod steal;

pub use cache_padded::CachePadded;

use std::cell::Cell;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

/// The number of shards used for sharded concurrency patterns.
pub const SHARD_COUNT: usize = 32;

/// Bitmask for fast shard index calculation.
pub const SHARD_MASK: usize = SHARD_COUNT - 1;

thread_local! {
    static THREAD_SHARD_INDEX: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Generates a hash for the current thread.
pub fn current_thread_hash() -> usize {
    let mut hasher = DefaultHasher::new();
    thread::current().id().hash(&mut hasher);
    hasher.finish() as usize
}

/// Returns the shard index for the current thread.
///
/// This value is cached thread-locally to avoid recomputing the hash.
pub fn current_shard_index() -> usize {
    THREAD_SHARD_INDEX.with(|idx| {
        if let Some(i) = idx.get() {
            i
        } else {
            let i = current_thread_hash() & SHARD_MASK;
            idx.set(Some(i));
            i
        }
    })
}
