//! # System Pool
//!
//! Sanitizer-safe stand-in for [`SlotPool`]: same contract, but every
//! allocation is a fresh zero-filled block from the process allocator.
//! Ids are accepted and ignored and nothing is validated, so ASan or Miri
//! report use-after-free and double-free on real heap addresses instead of
//! having them hidden by slot reuse.
//!
//! [`SlotPool`]: super::SlotPool

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use super::backend::PoolBackend;
use super::heap;

/// Pool backend that delegates to the [heap allocator](super::heap).
pub struct SystemPool<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SystemPool<T> {
    /// Creates the delegate. It carries no state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Allocates a zero-filled `T`-sized block. `size` and `id` are ignored.
    #[must_use]
    pub fn allocate(&self, _size: usize, _id: usize) -> NonNull<T> {
        heap::allocate(Layout::new::<T>()).cast()
    }

    /// Frees `ptr`. `id` is ignored.
    ///
    /// # Safety
    ///
    /// Same as [`SystemPool::deallocate`].
    pub unsafe fn deallocate_with_id(&self, ptr: NonNull<T>, _id: usize) {
        self.deallocate(ptr);
    }

    /// Frees `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`SystemPool::allocate`] for the same `T` and
    /// must not have been freed already.
    pub unsafe fn deallocate(&self, ptr: NonNull<T>) {
        heap::deallocate(ptr.cast(), Layout::new::<T>());
    }
}

impl<T> Default for SystemPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SystemPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemPool")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> PoolBackend<T> for SystemPool<T> {
    fn allocate(&self, size: usize, id: usize) -> NonNull<T> {
        Self::allocate(self, size, id)
    }

    unsafe fn deallocate_with_id(&self, ptr: NonNull<T>, id: usize) {
        Self::deallocate_with_id(self, ptr, id);
    }

    unsafe fn deallocate(&self, ptr: NonNull<T>) {
        Self::deallocate(self, ptr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_id_gives_distinct_blocks() {
        let pool: SystemPool<u64> = SystemPool::new();
        let a = pool.allocate(8, 2);
        let b = pool.allocate(8, 2);
        assert_ne!(a, b);
        unsafe {
            assert_eq!(a.as_ptr().read(), 0);
            assert_eq!(b.as_ptr().read(), 0);
            pool.deallocate_with_id(a, 2);
            pool.deallocate(b);
        }
    }

    #[test]
    fn test_size_and_id_are_not_validated() {
        let pool: SystemPool<[u32; 4]> = SystemPool::new();
        let ptr = pool.allocate(3, usize::MAX);
        unsafe {
            assert_eq!(ptr.as_ptr().read(), [0; 4]);
            pool.deallocate_with_id(ptr, 7);
        }
    }
}
