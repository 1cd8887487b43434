//! A lock-free intrusive stack of headerless memory blocks.
//!
//! Free blocks thread the stack through their own first word, so the stack
//! needs no node allocations. The head word packs a 16-bit modification tag
//! with a 48-bit block address (canonical user-space pointers); the tag
//! advances on every push and pop, so a CAS against a recycled head fails
//! instead of splicing through a stale next pointer.

use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

const TAG_SHIFT: usize = 48;
const ADDR_MASK: usize = (1 << TAG_SHIFT) - 1;

#[inline(always)]
fn pack(addr: usize, tag: usize) -> usize {
    (tag << TAG_SHIFT) | (addr & ADDR_MASK)
}

#[inline(always)]
fn unpack(word: usize) -> (usize, usize) {
    (word & ADDR_MASK, word >> TAG_SHIFT)
}

/// A tagged Treiber stack over raw blocks of at least `usize` size.
pub(crate) struct FreeStack {
    head: AtomicUsize,
}

impl FreeStack {
    pub(crate) const fn new() -> Self {
        Self {
            head: AtomicUsize::new(0),
        }
    }

    /// Pushes `block` onto the stack.
    ///
    /// # Safety contract
    /// `block` must point to at least `size_of::<usize>()` writable bytes
    /// that stay untouched until the block is popped again.
    pub(crate) fn push(&self, block: NonNull<u8>) {
        let link = block.as_ptr().cast::<AtomicUsize>();
        let mut cur = self.head.load(Ordering::Acquire);
        loop {
            let (next, tag) = unpack(cur);
            unsafe { (*link).store(next, Ordering::Relaxed) };
            let new = pack(block.as_ptr() as usize, tag.wrapping_add(1));
            match self
                .head
                .compare_exchange_weak(cur, new, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(seen) => cur = seen,
            }
        }
    }

    /// Pops a block, if any.
    pub(crate) fn pop(&self) -> Option<NonNull<u8>> {
        let mut cur = self.head.load(Ordering::Acquire);
        loop {
            let (addr, tag) = unpack(cur);
            if addr == 0 {
                return None;
            }
            let block = addr as *mut u8;
            let next = unsafe { (*block.cast::<AtomicUsize>()).load(Ordering::Relaxed) };
            let new = pack(next, tag.wrapping_add(1));
            match self
                .head
                .compare_exchange_weak(cur, new, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return NonNull::new(block),
                Err(seen) => cur = seen,
            }
        }
    }
}
