//! Traits for abstracting over the different kinds of ghost tokens.

use crate::token::GhostToken;

/// A trait for tokens that authorize shared access to branded state.
///
/// Implemented by `GhostToken` and by both role tokens. Thief-side
/// operations are bounded on this trait.
pub trait GhostBorrow<'brand> {}

/// A trait for tokens that authorize exclusive access to branded state.
///
/// Implemented by `GhostToken` and by `OwnerToken`. Owner-side operations
/// take `&mut` a token bounded on this trait.
pub trait GhostBorrowMut<'brand>: GhostBorrow<'brand> {}

impl<'brand> GhostBorrow<'brand> for GhostToken<'brand> {}
impl<'brand> GhostBorrowMut<'brand> for GhostToken<'brand> {}
