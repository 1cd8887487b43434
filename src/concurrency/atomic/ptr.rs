use core::{
    marker::PhantomData,
    sync::atomic::{AtomicPtr, Ordering},
};

/// A branded `AtomicPtr<T>`.
///
/// Used for the block links and slots of the continuous array; the brand
/// ties the pointer cell to its ghost domain without runtime cost.
#[repr(transparent)]
pub struct GhostAtomicPtr<'brand, T> {
    inner: AtomicPtr<T>,
    _brand: PhantomData<&'brand mut ()>,
}

impl<'brand, T> GhostAtomicPtr<'brand, T> {
    /// Creates a new branded atomic pointer.
    #[inline(always)]
    pub const fn new(ptr: *mut T) -> Self {
        Self {
            inner: AtomicPtr::new(ptr),
            _brand: PhantomData,
        }
    }

    /// Creates a null branded atomic pointer.
    #[inline(always)]
    pub const fn null() -> Self {
        Self::new(core::ptr::null_mut())
    }

    /// Loads the current pointer.
    #[inline(always)]
    pub fn load(&self, order: Ordering) -> *mut T {
        self.inner.load(order)
    }

    /// Stores a new pointer.
    #[inline(always)]
    pub fn store(&self, ptr: *mut T, order: Ordering) {
        self.inner.store(ptr, order);
    }

    /// Swaps the current pointer, returning the previous one.
    #[inline(always)]
    pub fn swap(&self, ptr: *mut T, order: Ordering) -> *mut T {
        self.inner.swap(ptr, order)
    }

    /// Stores `new` if the current pointer equals `current`.
    #[inline(always)]
    pub fn compare_exchange(
        &self,
        current: *mut T,
        new: *mut T,
        success: Ordering,
        failure: Ordering,
    ) -> Result<*mut T, *mut T> {
        self.inner.compare_exchange(current, new, success, failure)
    }
}

unsafe impl<'brand, T> Send for GhostAtomicPtr<'brand, T> {}
unsafe impl<'brand, T> Sync for GhostAtomicPtr<'brand, T> {}
