//! An unbounded index-addressable slot array built from linked blocks.
//!
//! The array lets the work-stealing deque treat its storage as infinite: the
//! owner writes and reads near the head of a doubly linked block chain,
//! thieves read near the tail, and blocks the tail has moved past are
//! retired cooperatively and recycled by the owner.
//!
//! Access is asymmetric by contract:
//! - `put_head` / `get_head` / `reclaim`: owner only (`&mut` a
//!   `GhostBorrowMut` token)
//! - `get_tail`: thieves (any `GhostBorrow` token)
//!
//! Slot loads and stores are relaxed; causality is provided by the `bot`/
//! `top` ordering of the deque driving the array.

use core::marker::PhantomData;
use core::ptr;
use core::sync::atomic::Ordering;

use crate::concurrency::atomic::{GhostAtomicPtr, GhostAtomicU64};
use crate::concurrency::steal::block::Block;
use crate::concurrency::steal::DEFAULT_BLOCK_CAP;
use crate::concurrency::CachePadded;
use crate::token::{GhostBorrow, GhostBorrowMut};

/// State touched only by the owning thread, kept on its own cache line.
struct OwnerCursors<'brand, T, const CAP: usize> {
    /// Newest block of the chain; ids increase from tail to head.
    head: GhostAtomicPtr<'brand, Block<T, CAP>>,
    /// Cursor remembering where the owner last pushed or popped.
    block_in_use: GhostAtomicPtr<'brand, Block<T, CAP>>,
    /// Next id to assign.
    curr_block_id: GhostAtomicU64<'brand>,
    /// LIFO of reclaimed blocks awaiting reuse, threaded through `prev`.
    reuse: GhostAtomicPtr<'brand, Block<T, CAP>>,
}

/// A continuous array of `*mut T` slots over linked fixed-size blocks.
///
/// `CAP` is the number of slots per block and must be a power of two.
/// All state is atomic, so misuse of the owner-only contract degrades to
/// assertion failures rather than undefined behavior.
pub struct GhostBlockArray<'brand, T, const CAP: usize = { DEFAULT_BLOCK_CAP }> {
    owner: CachePadded<OwnerCursors<'brand, T, CAP>>,
    /// Oldest live block; advanced only by thieves via CAS.
    tail: CachePadded<GhostAtomicPtr<'brand, Block<T, CAP>>>,
    /// Intrusive LIFO of retired blocks; thieves push, the owner drains.
    to_retire: CachePadded<GhostAtomicPtr<'brand, Block<T, CAP>>>,
    _marker: PhantomData<*mut T>,
}

// The array stores and returns raw `*mut T` payloads without touching the
// pointees; `T: Send` keeps cross-thread hand-off of those pointers honest.
unsafe impl<'brand, T: Send, const CAP: usize> Send for GhostBlockArray<'brand, T, CAP> {}
unsafe impl<'brand, T: Send, const CAP: usize> Sync for GhostBlockArray<'brand, T, CAP> {}

impl<'brand, T, const CAP: usize> GhostBlockArray<'brand, T, CAP> {
    /// Creates the array with its first block (id 0) installed as head,
    /// tail, and owner cursor.
    ///
    /// # Panics
    /// Panics if `CAP` is zero or not a power of two.
    pub fn new() -> Self {
        assert!(CAP != 0);
        assert!(CAP.is_power_of_two());
        let first = Block::<T, CAP>::alloc_raw();
        Self {
            owner: CachePadded::new(OwnerCursors {
                head: GhostAtomicPtr::new(first),
                block_in_use: GhostAtomicPtr::new(first),
                curr_block_id: GhostAtomicU64::new(1),
                reuse: GhostAtomicPtr::null(),
            }),
            tail: CachePadded::new(GhostAtomicPtr::new(first)),
            to_retire: CachePadded::new(GhostAtomicPtr::null()),
            _marker: PhantomData,
        }
    }

    /// Stores `val` at logical `index`. Owner only.
    ///
    /// Crossing into a block that does not exist yet allocates one (from the
    /// reuse pool when possible) and splices it at the head.
    pub fn put_head<W: GhostBorrowMut<'brand>>(&self, token: &mut W, index: u64, val: *mut T) {
        let _ = token;
        let desired = Block::<T, CAP>::id_of(index);
        let offset = Block::<T, CAP>::offset_of(index);
        if offset == 0 && self.owner.curr_block_id.load(Ordering::Relaxed) == desired {
            self.alloc_block();
        }
        let blk = self.seek_owner(desired);
        unsafe { (*blk).slot(offset).store(val, Ordering::Relaxed) };
    }

    /// Reads the value at logical `index` from the owner's end. Owner only.
    pub fn get_head<W: GhostBorrowMut<'brand>>(&self, token: &mut W, index: u64) -> *mut T {
        let _ = token;
        let desired = Block::<T, CAP>::id_of(index);
        let offset = Block::<T, CAP>::offset_of(index);
        let blk = self.seek_owner(desired);
        unsafe { (*blk).slot(offset).load(Ordering::Relaxed) }
    }

    /// Reads the value at logical `index` from the thieves' end.
    ///
    /// Walks forward from the observed tail (the owner pushed new blocks
    /// since this thief last looked), or backward (a concurrent thief
    /// retired past the slot before this thief saw the retirement). When the
    /// read lands at offset 0 of a block strictly ahead of the observed
    /// tail, the block one step behind can never be read again by a correct
    /// caller, and this thief retires it.
    pub fn get_tail<R: GhostBorrow<'brand>>(&self, token: &R, index: u64) -> *mut T {
        let _ = token;
        let desired = Block::<T, CAP>::id_of(index);
        let offset = Block::<T, CAP>::offset_of(index);
        let t = self.tail.load(Ordering::Relaxed);
        debug_assert!(!t.is_null());
        let mut b = t;
        unsafe {
            while !b.is_null() && (*b).id.load(Ordering::Relaxed) < desired {
                b = (*b).next.load(Ordering::Relaxed);
            }
            while !b.is_null() && (*b).id.load(Ordering::Relaxed) > desired {
                b = (*b).prev.load(Ordering::Relaxed);
            }
            debug_assert!(!b.is_null());
            debug_assert_eq!((*b).id.load(Ordering::Relaxed), desired);

            if offset == 0 && b != t && (*t).id.load(Ordering::Relaxed) + 1 == desired {
                self.retire_last_block();
            }

            (*b).slot(offset).load(Ordering::Relaxed)
        }
    }

    /// Moves every block on the retire stack into the owner's reuse pool.
    /// Owner only.
    ///
    /// The caller must have proven that no thief still holds a pointer into
    /// any retired block (thieves quiescent, or an external hazard-pointer /
    /// epoch scheme guards the window).
    pub fn reclaim<W: GhostBorrowMut<'brand>>(&self, token: &mut W) {
        let _ = token;
        let mut r = self.to_retire.swap(ptr::null_mut(), Ordering::Acquire);
        while !r.is_null() {
            let next = unsafe { (*r).prev.load(Ordering::Relaxed) };
            self.push_reuse(r);
            r = next;
        }
    }

    /// Id of the block the tail currently points at.
    pub fn tail_block_id<R: GhostBorrow<'brand>>(&self, token: &R) -> u64 {
        let _ = token;
        let t = self.tail.load(Ordering::Relaxed);
        debug_assert!(!t.is_null());
        unsafe { (*t).id.load(Ordering::Relaxed) }
    }

    /// Number of blocks waiting in the owner's reuse pool. Owner only.
    pub fn reuse_depth<W: GhostBorrowMut<'brand>>(&self, token: &mut W) -> usize {
        let _ = token;
        let mut n = 0;
        let mut b = self.owner.reuse.load(Ordering::Relaxed);
        while !b.is_null() {
            n += 1;
            b = unsafe { (*b).prev.load(Ordering::Relaxed) };
        }
        n
    }

    /// Moves the owner cursor to the block with id `desired` and returns it.
    ///
    /// The owner advances one index at a time, so this is normally zero or
    /// one hop; the walk is generalized to any distance in both directions.
    fn seek_owner(&self, desired: u64) -> *mut Block<T, CAP> {
        let mut cursor = self.owner.block_in_use.load(Ordering::Relaxed);
        unsafe {
            while !cursor.is_null() && (*cursor).id.load(Ordering::Relaxed) < desired {
                cursor = (*cursor).next.load(Ordering::Relaxed);
            }
            while !cursor.is_null() && (*cursor).id.load(Ordering::Relaxed) > desired {
                cursor = (*cursor).prev.load(Ordering::Relaxed);
            }
            debug_assert!(!cursor.is_null());
            debug_assert_eq!((*cursor).id.load(Ordering::Relaxed), desired);
        }
        self.owner.block_in_use.store(cursor, Ordering::Relaxed);
        cursor
    }

    /// Splices one block (reused or fresh) at the head. Owner only.
    fn alloc_block(&self) {
        let mut b = self.pop_reuse();
        if b.is_null() {
            b = Block::<T, CAP>::alloc_raw();
        }
        let head = self.owner.head.load(Ordering::Relaxed);
        debug_assert!(!head.is_null());
        let id = self.owner.curr_block_id.fetch_add(1, Ordering::Relaxed);
        unsafe {
            (*b).prev.store(head, Ordering::Relaxed);
            (*b).next.store(ptr::null_mut(), Ordering::Relaxed);
            (*b).id.store(id, Ordering::Relaxed);
            (*head).next.store(b, Ordering::Relaxed);
        }
        self.owner.head.store(b, Ordering::Relaxed);
    }

    /// Swings the tail forward one block and, if this thread won the swing,
    /// pushes the old tail onto the retire stack.
    ///
    /// At most one thief succeeds in advancing each step; a loser that
    /// observes a tail at least as young as the candidate stops without
    /// pushing, because the winner owns that push.
    fn retire_last_block(&self) {
        let old = self.tail.load(Ordering::Relaxed);
        debug_assert!(!old.is_null());
        let nxt = unsafe { (*old).next.load(Ordering::Relaxed) };
        debug_assert!(!nxt.is_null());
        let nxt_id = unsafe { (*nxt).id.load(Ordering::Relaxed) };

        let mut cur = old;
        loop {
            match self
                .tail
                .compare_exchange(cur, nxt, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => break,
                Err(seen) => {
                    if unsafe { (*seen).id.load(Ordering::Relaxed) } >= nxt_id {
                        return;
                    }
                    cur = seen;
                }
            }
        }

        // Winner threads `old` onto the retire stack through `prev`.
        let mut head = self.to_retire.load(Ordering::Acquire);
        loop {
            unsafe { (*old).prev.store(head, Ordering::Relaxed) };
            match self
                .to_retire
                .compare_exchange(head, old, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(seen) => head = seen,
            }
        }
    }

    fn push_reuse(&self, b: *mut Block<T, CAP>) {
        let old = self.owner.reuse.load(Ordering::Relaxed);
        unsafe { (*b).prev.store(old, Ordering::Relaxed) };
        self.owner.reuse.store(b, Ordering::Relaxed);
    }

    fn pop_reuse(&self) -> *mut Block<T, CAP> {
        let b = self.owner.reuse.load(Ordering::Relaxed);
        if !b.is_null() {
            let next = unsafe { (*b).prev.load(Ordering::Relaxed) };
            self.owner.reuse.store(next, Ordering::Relaxed);
        }
        b
    }
}

impl<'brand, T, const CAP: usize> Default for GhostBlockArray<'brand, T, CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'brand, T, const CAP: usize> Drop for GhostBlockArray<'brand, T, CAP> {
    /// Frees the active chain, the retired blocks, and the reuse pool.
    ///
    /// `&mut self` implies no concurrent access remains, so the retired
    /// stack can be spliced behind the tail and the whole graph walked over
    /// `prev` links.
    fn drop(&mut self) {
        let retired = self.to_retire.swap(ptr::null_mut(), Ordering::Acquire);
        let tail = self.tail.load(Ordering::Relaxed);
        debug_assert!(!tail.is_null());
        unsafe { (*tail).prev.store(retired, Ordering::Relaxed) };

        let mut b = self.owner.head.load(Ordering::Relaxed);
        while !b.is_null() {
            let prev = unsafe { (*b).prev.load(Ordering::Relaxed) };
            unsafe { Block::free_raw(b) };
            b = prev;
        }

        let mut r = self.owner.reuse.load(Ordering::Relaxed);
        while !r.is_null() {
            let prev = unsafe { (*r).prev.load(Ordering::Relaxed) };
            unsafe { Block::free_raw(r) };
            r = prev;
        }
    }
}
