//! An unbounded work-stealing deque of task pointers.
//!
//! ABP-style protocol in the fence formulation of Lê, Pop, Cohen and
//! Zappa Nardelli ("Correct and Efficient Work-Stealing for Weak Memory
//! Models"), over linked blocks instead of a circular buffer, in the manner
//! of Hendler, Lev, Moir and Shavit's dynamic-sized deque.
//!
//! Properties:
//! - Single owner: `push_bottom` / `pop_bottom`
//! - Multiple thieves: `pop_top`
//! - Unbounded: storage grows by blocks and is recycled via `reclaim`
//!
//! The deque stores `NonNull<T>` task pointers, never task values. Popped
//! pointers are returned exactly once across owner and thieves.

use core::ptr::NonNull;
use core::sync::atomic::{fence, Ordering};

use crate::concurrency::atomic::GhostAtomicU64;
use crate::concurrency::steal::block_array::GhostBlockArray;
use crate::concurrency::steal::DEFAULT_BLOCK_CAP;
use crate::concurrency::CachePadded;
use crate::token::{GhostBorrow, GhostBorrowMut};

/// An unbounded single-owner, multi-thief deque of `NonNull<T>`.
///
/// `CAP` is the slot capacity of each storage block (a power of two).
///
/// # Example
///
/// ```rust
/// use core::ptr::NonNull;
/// use filch::{GhostStealDeque, GhostToken};
///
/// GhostToken::new(|token| {
///     let deque: GhostStealDeque<'_, u32> = GhostStealDeque::new();
///     let (mut owner, thief) = token.split_roles();
///
///     let mut task = 7u32;
///     deque.push_bottom(&mut owner, NonNull::from(&mut task));
///
///     let (stolen, now_empty) = deque.pop_top(&thief);
///     assert_eq!(stolen, Some(NonNull::from(&mut task)));
///     assert!(now_empty);
/// });
/// ```
pub struct GhostStealDeque<'brand, T, const CAP: usize = { DEFAULT_BLOCK_CAP }> {
    array: GhostBlockArray<'brand, T, CAP>,
    /// One past the bottom-most occupied slot; owner pushes here.
    bot: CachePadded<GhostAtomicU64<'brand>>,
    /// Top-most un-stolen slot; thieves advance this via CAS.
    top: CachePadded<GhostAtomicU64<'brand>>,
}

impl<'brand, T, const CAP: usize> GhostStealDeque<'brand, T, CAP> {
    /// Creates an empty deque.
    ///
    /// # Panics
    /// Panics if `CAP` is zero or not a power of two.
    pub fn new() -> Self {
        Self {
            array: GhostBlockArray::new(),
            bot: CachePadded::new(GhostAtomicU64::new(0)),
            top: CachePadded::new(GhostAtomicU64::new(0)),
        }
    }

    /// Pushes `val` at the bottom. Owner only.
    ///
    /// The sequentially consistent store of `bot` is the publication point:
    /// it orders the slot write before any thief that observes the new
    /// count through the fence in `pop_top`.
    ///
    /// Always returns `true`; the signature mirrors the pops so call sites
    /// can count completed operations uniformly.
    pub fn push_bottom<W: GhostBorrowMut<'brand>>(&self, token: &mut W, val: NonNull<T>) -> bool {
        let b = self.bot.load(Ordering::Relaxed);
        self.array.put_head(token, b, val.as_ptr());
        self.bot.store(b + 1, Ordering::SeqCst);
        true
    }

    /// Pops from the top. Callable from any thread.
    ///
    /// Returns `(stolen, now_empty)`: `stolen` is `None` when the deque was
    /// empty or this thief lost the CAS on `top`; `now_empty` is `true` iff
    /// the deque is empty after this operation, letting a thief stop
    /// polling.
    pub fn pop_top<R: GhostBorrow<'brand>>(&self, token: &R) -> (Option<NonNull<T>>, bool) {
        let t = self.top.load(Ordering::Acquire);
        fence(Ordering::SeqCst);
        let b = self.bot.load(Ordering::Acquire);
        // bot never strays more than one below top
        debug_assert!(b + 1 >= t);
        if b > t {
            if self
                .top
                .compare_exchange(t, t + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                let val = self.array.get_tail(token, t);
                debug_assert!(!val.is_null());
                (NonNull::new(val), b == t + 1)
            } else {
                (None, b == t + 1)
            }
        } else {
            (None, true)
        }
    }

    /// Pops from the bottom. Owner only.
    ///
    /// Returns `None` iff the deque is empty from the owner's view. On the
    /// last element the owner races thieves through a CAS on `top`; whoever
    /// wins consumes the value, and `bot` is restored either way so that
    /// `top <= bot + 1` is re-established.
    pub fn pop_bottom<W: GhostBorrowMut<'brand>>(&self, token: &mut W) -> Option<NonNull<T>> {
        let b = self.bot.load(Ordering::Relaxed);
        if b == 0 {
            return None;
        }
        let b = b - 1;
        self.bot.store(b, Ordering::Relaxed);
        fence(Ordering::SeqCst);
        let t = self.top.load(Ordering::Relaxed);
        if t <= b {
            let val = self.array.get_head(token, b);
            if t == b {
                // Last element: race with thieves for it.
                let won = self
                    .top
                    .compare_exchange(t, t + 1, Ordering::SeqCst, Ordering::Relaxed)
                    .is_ok();
                self.bot.store(b + 1, Ordering::Relaxed);
                if !won {
                    return None;
                }
            }
            debug_assert!(!val.is_null());
            NonNull::new(val)
        } else {
            // Raced below top; restore and report empty.
            self.bot.store(b + 1, Ordering::Relaxed);
            None
        }
    }

    /// Moves retired storage blocks into the owner's reuse pool. Owner only.
    ///
    /// Must only be called once no thief still holds a pointer into retired
    /// storage; the quiescence proof belongs to the enclosing runtime
    /// (hazard pointers, epochs, or a join point).
    pub fn reclaim<W: GhostBorrowMut<'brand>>(&self, token: &mut W) {
        self.array.reclaim(token);
    }

    /// Whether the deque currently looks empty.
    pub fn is_empty<R: GhostBorrow<'brand>>(&self, token: &R) -> bool {
        let _ = token;
        let t = self.top.load(Ordering::Acquire);
        let b = self.bot.load(Ordering::Acquire);
        t >= b
    }

    /// A snapshot estimate of the number of queued items.
    pub fn len_hint<R: GhostBorrow<'brand>>(&self, token: &R) -> u64 {
        let _ = token;
        let t = self.top.load(Ordering::Acquire);
        let b = self.bot.load(Ordering::Acquire);
        b.saturating_sub(t)
    }

    /// Id of the storage block the tail currently points at.
    pub fn tail_block_id<R: GhostBorrow<'brand>>(&self, token: &R) -> u64 {
        self.array.tail_block_id(token)
    }

    /// Number of storage blocks waiting in the reuse pool. Owner only.
    pub fn reuse_depth<W: GhostBorrowMut<'brand>>(&self, token: &mut W) -> usize {
        self.array.reuse_depth(token)
    }
}

impl<'brand, T, const CAP: usize> Default for GhostStealDeque<'brand, T, CAP> {
    fn default() -> Self {
        Self::new()
    }
}
