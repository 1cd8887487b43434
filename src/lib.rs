//! # `filch` - Work-Stealing Deque Toolkit
//!
//! An unbounded, lock-free, single-owner / multiple-thief work-stealing
//! deque over a dynamically grown block array, plus the pool allocator that
//! feeds a task-parallel runtime — all protected by ghost tokens.
//!
//! ## Safety Guarantees
//!
//! ### Memory Safety
//! - **All shared state is atomic**: even the owner-private cursors are
//!   relaxed atomics, so misuse of the single-owner contract degrades to
//!   assertion failures instead of data races.
//! - **Linear owner capability**: `split_roles` yields one non-copyable
//!   `OwnerToken`; owner-side operations require `&mut` of it, so a single
//!   value authorizes the bottom end of each deque.
//! - **Branded types**: compile-time separation keeps a deque from being
//!   driven by a token from another scope.
//!
//! ### Concurrency Safety
//! - **Lock-free protocols**: the deque and its storage never block; thief
//!   operations are lock-free (CAS loops on `top`, `tail`, and the retire
//!   stack), owner operations are constant-time per step.
//! - **Memory barriers**: the ABP fence/acquire pairing makes every stolen
//!   value happen-after the push that produced it.
//! - **ABA prevention**: the large-block free stacks carry a tagged head;
//!   block retirement is guarded by monotonic block ids.
//!
//! ## Key Features
//!
//! - **Unbounded deque**: storage grows by linked fixed-size blocks; blocks
//!   the tail has passed are retired cooperatively and recycled.
//! - **Asymmetric ends**: the owner pushes and pops LIFO at the bottom,
//!   thieves steal FIFO at the top and learn when to stop polling.
//! - **Pool allocator**: sharded small-block free lists plus shared
//!   lock-free large-block pools for task records.
//!
//! ## Architecture
//!
//! Ghost tokens (branded phantom types + rank-2 polymorphism) create the
//! owner/thief access boundary at compile time; the runtime synchronization
//! lives entirely in the atomics of the deque protocol.
//!
//! ## Example
//!
//! ```rust
//! use core::ptr::NonNull;
//! use filch::{GhostStealDeque, GhostToken};
//!
//! let mut tasks = [1u32, 2, 3];
//! GhostToken::new(|token| {
//!     let deque: GhostStealDeque<'_, u32> = GhostStealDeque::new();
//!     let (mut owner, thief) = token.split_roles();
//!
//!     for task in &mut tasks {
//!         deque.push_bottom(&mut owner, NonNull::from(task));
//!     }
//!
//!     // Owner drains LIFO; a thief would steal FIFO via `pop_top`.
//!     let last = deque.pop_bottom(&mut owner).unwrap();
//!     assert_eq!(unsafe { *last.as_ref() }, 3);
//!     let (stolen, _) = deque.pop_top(&thief);
//!     assert_eq!(unsafe { *stolen.unwrap().as_ref() }, 1);
//! });
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::inline_always)]

pub mod alloc;
pub mod concurrency;
pub mod token;

pub use alloc::{AllocError, GhostPoolAllocator, PoolStats};
pub use concurrency::steal::{GhostBlockArray, GhostStealDeque, DEFAULT_BLOCK_CAP};
pub use concurrency::CachePadded;
pub use token::{GhostToken, OwnerToken, ThiefToken};

// Compile-time assertions for memory layout.
const _: () = {
    use core::mem;

    // Tokens are ZSTs.
    assert!(mem::size_of::<GhostToken<'static>>() == 0);
    assert!(mem::size_of::<OwnerToken<'static, 'static>>() == 0);
    assert!(mem::size_of::<ThiefToken<'static, 'static>>() == 0);

    // Padded values land on independent cache lines.
    assert!(mem::align_of::<CachePadded<u64>>() == 128);
    assert!(mem::size_of::<CachePadded<u64>>() == 128);
};
