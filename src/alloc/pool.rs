//! `GhostPoolAllocator` — headerless blocks from pools of fixed sizes.
//!
//! A list of bucket sizes is given to the constructor; sizes must be at
//! least 8 and strictly increasing. Buckets below the large threshold are
//! **small**: each of the `SHARD_COUNT` thread shards keeps its own free
//! list per bucket, refilled by carving fresh chunks, so the common case is
//! an uncontended pop from the caller's home shard. Buckets at or above the
//! threshold share one lock-free stack across all threads, and blocks above
//! the largest bucket go straight to the system allocator at 128-byte
//! alignment.
//!
//! The pool feeds a task-parallel runtime: task records are produced and
//! recycled at the rate the work-stealing deque is exercised, off the
//! deque's hot path.

use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::alloc::{alloc, dealloc, Layout};

use crate::alloc::free_stack::FreeStack;
use crate::concurrency::atomic::GhostAtomicUsize;
use crate::concurrency::{current_shard_index, CachePadded, SHARD_COUNT};
use crate::token::{GhostBorrow, GhostBorrowMut};

/// Maximum alignment guaranteed for large allocations.
///
/// Small-bucket blocks are aligned to at least `size_of::<usize>()`.
pub const MAX_ALIGNMENT: usize = 128;

/// Bucket sizes below this are served from sharded per-thread free lists.
const LARGE_THRESHOLD: usize = 1 << 18;

/// Blocks carved from each fresh small-bucket chunk.
const CHUNK_BLOCKS: usize = 64;

/// The error type for allocation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocError;

impl core::fmt::Display for AllocError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("memory allocation failed")
    }
}

impl std::error::Error for AllocError {}

/// Currently used space and the unused space held in reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Bytes handed out and not yet returned.
    pub in_use_bytes: usize,
    /// Bytes the allocator retains beyond what is in use.
    pub reserved_bytes: usize,
}

/// One small size bucket: a free list per thread shard plus the chunk list
/// backing them.
struct SmallBucket {
    shards: [FreeStack; SHARD_COUNT],
    /// Push-only list of carved chunks, threaded through each chunk's
    /// header word; drained in `Drop`.
    chunks: AtomicUsize,
    allocated_blocks: AtomicUsize,
    used_blocks: AtomicUsize,
}

impl SmallBucket {
    fn new() -> Self {
        Self {
            shards: core::array::from_fn(|_| FreeStack::new()),
            chunks: AtomicUsize::new(0),
            allocated_blocks: AtomicUsize::new(0),
            used_blocks: AtomicUsize::new(0),
        }
    }
}

/// A branded pool allocator over fixed bucket sizes.
pub struct GhostPoolAllocator<'brand> {
    sizes: Box<[usize]>,
    num_small: usize,
    /// Largest small bucket size; 0 when every bucket is large.
    max_small: usize,
    /// Largest bucket size overall.
    max_size: usize,
    small: Box<[SmallBucket]>,
    large: Box<[FreeStack]>,
    /// Bytes reserved from the system for large blocks (rounded sizes).
    large_allocated: CachePadded<GhostAtomicUsize<'brand>>,
    /// Bytes of large blocks currently handed out (requested sizes).
    large_used: CachePadded<GhostAtomicUsize<'brand>>,
}

impl<'brand> GhostPoolAllocator<'brand> {
    /// Creates a pool over the given bucket sizes.
    ///
    /// # Panics
    /// Panics if `sizes` is empty, contains a size below 8, or is not
    /// strictly increasing.
    pub fn with_sizes(sizes: &[usize]) -> Self {
        assert!(!sizes.is_empty());
        let mut prev = 0;
        for &s in sizes {
            assert!(s >= 8);
            assert!(s > prev);
            prev = s;
        }
        let sizes: Box<[usize]> = sizes.into();
        let num_buckets = sizes.len();
        let max_size = sizes[num_buckets - 1];
        let num_small = sizes.iter().take_while(|&&s| s < LARGE_THRESHOLD).count();
        let max_small = if num_small > 0 { sizes[num_small - 1] } else { 0 };
        Self {
            small: (0..num_small).map(|_| SmallBucket::new()).collect(),
            large: (num_small..num_buckets).map(|_| FreeStack::new()).collect(),
            sizes,
            num_small,
            max_small,
            max_size,
            large_allocated: CachePadded::new(GhostAtomicUsize::new(0)),
            large_used: CachePadded::new(GhostAtomicUsize::new(0)),
        }
    }

    /// Allocates a block of at least `n` bytes from the smallest bucket
    /// that fits, or directly from the system beyond the largest bucket.
    pub fn allocate<R: GhostBorrow<'brand>>(
        &self,
        token: &R,
        n: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        let _ = token;
        if self.num_small == 0 || n > self.max_small {
            return self.allocate_large(n);
        }
        let bucket = self.small_bucket_index(n);
        let shard = current_shard_index();
        let block = match self.small[bucket].shards[shard].pop() {
            Some(block) => block,
            None => self.carve_chunk(bucket, shard)?,
        };
        self.small[bucket].used_blocks.fetch_add(1, Ordering::Relaxed);
        Ok(block)
    }

    /// Returns a block of `n` bytes to its pool.
    ///
    /// Large-bucket blocks are retained for reuse; blocks above the largest
    /// bucket are released to the system.
    ///
    /// # Safety
    /// `ptr` must come from `allocate` on this pool with the same `n`, and
    /// must not be used after this call.
    pub unsafe fn deallocate<R: GhostBorrow<'brand>>(&self, token: &R, ptr: NonNull<u8>, n: usize) {
        let _ = token;
        if self.num_small == 0 || n > self.max_small {
            self.deallocate_large(ptr, n);
        } else {
            let bucket = self.small_bucket_index(n);
            self.small[bucket].used_blocks.fetch_sub(1, Ordering::Relaxed);
            self.small[bucket].shards[current_shard_index()].push(ptr);
        }
    }

    /// Currently used bytes and the bytes held in reserve.
    pub fn stats(&self) -> PoolStats {
        let mut total_allocated = self.large_allocated.load(Ordering::Relaxed);
        let mut total_used = self.large_used.load(Ordering::Relaxed);
        for (i, bucket) in self.small.iter().enumerate() {
            let size = self.sizes[i];
            total_allocated += bucket.allocated_blocks.load(Ordering::Relaxed) * size;
            total_used += bucket.used_blocks.load(Ordering::Relaxed) * size;
        }
        PoolStats {
            in_use_bytes: total_used,
            reserved_bytes: total_allocated.saturating_sub(total_used),
        }
    }

    /// Releases every retained large block back to the system.
    ///
    /// Small-bucket chunks stay carved; they are freed when the pool drops.
    pub fn clear<W: GhostBorrowMut<'brand>>(&self, token: &mut W) {
        let _ = token;
        self.clear_large();
    }

    fn allocate_large(&self, n: usize) -> Result<NonNull<u8>, AllocError> {
        self.large_used.fetch_add(n, Ordering::Relaxed);
        let alloc_size = if n <= self.max_size {
            let li = self.large_bucket_index(n);
            if let Some(block) = self.large[li].pop() {
                return Ok(block);
            }
            self.sizes[self.num_small + li]
        } else {
            n
        };
        let rounded = round_up(alloc_size, MAX_ALIGNMENT);
        let layout = Layout::from_size_align(rounded, MAX_ALIGNMENT).map_err(|_| AllocError)?;
        let ptr = unsafe { alloc(layout) };
        let block = NonNull::new(ptr).ok_or(AllocError)?;
        self.large_allocated.fetch_add(rounded, Ordering::Relaxed);
        Ok(block)
    }

    fn deallocate_large(&self, ptr: NonNull<u8>, n: usize) {
        self.large_used.fetch_sub(n, Ordering::Relaxed);
        if n > self.max_size {
            let rounded = round_up(n, MAX_ALIGNMENT);
            unsafe {
                dealloc(
                    ptr.as_ptr(),
                    Layout::from_size_align_unchecked(rounded, MAX_ALIGNMENT),
                );
            }
            self.large_allocated.fetch_sub(rounded, Ordering::Relaxed);
        } else {
            let li = self.large_bucket_index(n);
            self.large[li].push(ptr);
        }
    }

    /// Smallest small bucket whose size is at least `n`.
    fn small_bucket_index(&self, n: usize) -> usize {
        let mut bucket = 0;
        while n > self.sizes[bucket] {
            bucket += 1;
        }
        bucket
    }

    /// Smallest large bucket whose size is at least `n`, as an index into
    /// `self.large`.
    fn large_bucket_index(&self, n: usize) -> usize {
        let mut bucket = self.num_small;
        while n > self.sizes[bucket] {
            bucket += 1;
        }
        bucket - self.num_small
    }

    /// Carves a fresh chunk for `bucket`, returning one block and pushing
    /// the rest onto the caller's shard list.
    fn carve_chunk(&self, bucket: usize, shard: usize) -> Result<NonNull<u8>, AllocError> {
        let state = &self.small[bucket];
        let stride = block_stride(self.sizes[bucket]);
        let layout = chunk_layout(stride)?;
        let chunk = unsafe { alloc(layout) };
        let chunk = NonNull::new(chunk).ok_or(AllocError)?;

        // Thread the chunk onto the bucket's chunk list via its header word.
        let header = chunk.as_ptr().cast::<AtomicUsize>();
        let mut head = state.chunks.load(Ordering::Acquire);
        loop {
            unsafe { (*header).store(head, Ordering::Relaxed) };
            match state.chunks.compare_exchange_weak(
                head,
                chunk.as_ptr() as usize,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(seen) => head = seen,
            }
        }
        state
            .allocated_blocks
            .fetch_add(CHUNK_BLOCKS, Ordering::Relaxed);

        let base = unsafe { chunk.as_ptr().add(MAX_ALIGNMENT) };
        for i in 1..CHUNK_BLOCKS {
            let block = unsafe { NonNull::new_unchecked(base.add(i * stride)) };
            state.shards[shard].push(block);
        }
        Ok(unsafe { NonNull::new_unchecked(base) })
    }

    fn clear_large(&self) {
        for (li, stack) in self.large.iter().enumerate() {
            let rounded = round_up(self.sizes[self.num_small + li], MAX_ALIGNMENT);
            while let Some(block) = stack.pop() {
                unsafe {
                    dealloc(
                        block.as_ptr(),
                        Layout::from_size_align_unchecked(rounded, MAX_ALIGNMENT),
                    );
                }
                self.large_allocated.fetch_sub(rounded, Ordering::Relaxed);
            }
        }
    }
}

impl<'brand> Drop for GhostPoolAllocator<'brand> {
    fn drop(&mut self) {
        self.clear_large();
        for (i, bucket) in self.small.iter().enumerate() {
            let layout = match chunk_layout(block_stride(self.sizes[i])) {
                Ok(layout) => layout,
                Err(AllocError) => continue,
            };
            let mut chunk = bucket.chunks.load(Ordering::Relaxed) as *mut u8;
            while !chunk.is_null() {
                let next = unsafe { (*chunk.cast::<AtomicUsize>()).load(Ordering::Relaxed) };
                unsafe { dealloc(chunk, layout) };
                chunk = next as *mut u8;
            }
        }
    }
}

/// Layout of a small-bucket chunk: one alignment unit of header followed by
/// `CHUNK_BLOCKS` blocks of `stride` bytes.
fn chunk_layout(stride: usize) -> Result<Layout, AllocError> {
    let bytes = round_up(MAX_ALIGNMENT + stride * CHUNK_BLOCKS, MAX_ALIGNMENT);
    Layout::from_size_align(bytes, MAX_ALIGNMENT).map_err(|_| AllocError)
}

/// Distance between carved blocks; keeps every block aligned for its
/// intrusive link word.
const fn block_stride(size: usize) -> usize {
    round_up(size, core::mem::size_of::<usize>())
}

const fn round_up(n: usize, align: usize) -> usize {
    (n + align - 1) / align * align
}
