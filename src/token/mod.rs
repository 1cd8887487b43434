//! `GhostToken` — the permission controller for branded structures.
//!
//! A token is a zero-sized capability branded with an invariant lifetime.
//! Structures created inside a token's scope carry the same brand and gate
//! their operations on borrows of the token.
//!
//! ## Core invariant (linearity)
//!
//! `GhostToken<'brand>` is intentionally **not** `Copy`/`Clone`. Any API
//! that mutates owner-private state requires `&mut` of a `GhostBorrowMut`
//! token, and Rust guarantees two live mutable borrows of the same token
//! cannot coexist.

/// Invariant lifetime definitions for branding.
pub mod invariant;
/// Owner/thief role tokens derived from a parent token.
pub mod role;
/// Traits defining token capabilities (`GhostBorrow`/`GhostBorrowMut`).
pub mod traits;

pub use invariant::InvariantLifetime;
pub use role::{Owner, OwnerToken, Role, RoleToken, Thief, ThiefToken};
pub use traits::{GhostBorrow, GhostBorrowMut};

/// A zero-sized token that controls access to branded structures.
///
/// The phantom brand creates type-level separation between scopes: a deque
/// built under one token cannot be driven by a token from another scope.
#[derive(Debug)]
pub struct GhostToken<'brand>(InvariantLifetime<'brand>);

impl<'brand> GhostToken<'brand> {
    /// Creates a fresh brand and runs `f` with its token.
    ///
    /// This is the only way to obtain a token. The rank-2 closure keeps the
    /// brand from escaping the scope.
    ///
    /// # Example
    ///
    /// ```rust
    /// use filch::GhostToken;
    ///
    /// GhostToken::new(|token| {
    ///     let (_owner, _thief) = token.split_roles();
    /// });
    /// ```
    pub fn new<F, R>(f: F) -> R
    where
        F: for<'new_brand> FnOnce(GhostToken<'new_brand>) -> R,
    {
        f(GhostToken(InvariantLifetime::new()))
    }

    /// Creates a nested branding scope.
    ///
    /// Functionally equivalent to `GhostToken::new`; clarifies intent when a
    /// temporary sub-scope is wanted inside an existing one.
    #[inline(always)]
    pub fn with_scoped<F, R>(&self, f: F) -> R
    where
        F: for<'sub> FnOnce(GhostToken<'sub>) -> R,
    {
        Self::new(f)
    }
}

// Concurrency notes:
// - The token carries no data; sharing `&GhostToken<'brand>` across threads
//   only enables operations gated on `GhostBorrow`, which are the ones safe
//   under concurrency (thief-side reads and CAS protocols).
// - Exclusive operations require `&mut` of a `GhostBorrowMut` token, which
//   borrowing prevents from coexisting with itself.
unsafe impl<'brand> Sync for GhostToken<'brand> {}
