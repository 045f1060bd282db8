//! # Pool Backends
//!
//! One interface over the two ways a declared pool can be backed, and the
//! per-type pool that picks between them from the active [`Strategy`].

#![allow(unsafe_code)]

use std::fmt;
use std::ptr::NonNull;

use super::{SlotPool, SystemPool};
use crate::config::{self, Strategy};

/// Slot-addressed allocation for values of type `T`.
///
/// `allocate` hands out zero-filled storage for slot `id`. Both
/// deallocation forms give it back: one checks the id against the address,
/// the other recovers it from the address.
pub trait PoolBackend<T> {
    /// Claims slot `id` for a value of `size` bytes.
    fn allocate(&self, size: usize, id: usize) -> NonNull<T>;

    /// Releases the slot at `ptr`, which was allocated as `id`.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this backend and no reference
    /// into it may outlive the call. Any value in it must already be
    /// dropped or be safe to forget.
    unsafe fn deallocate_with_id(&self, ptr: NonNull<T>, id: usize);

    /// Releases the slot at `ptr`.
    ///
    /// # Safety
    ///
    /// Same as [`PoolBackend::deallocate_with_id`].
    unsafe fn deallocate(&self, ptr: NonNull<T>);
}

/// The pool behind one declared type.
///
/// Holds a [`SlotPool`] with capacity `C` and a [`SystemPool`] delegate and
/// routes every call by [`config::strategy`]. The strategy is latched by the
/// first call, so a pointer is always returned to the backend that made it.
///
/// Builds with the `sanitizer` feature carry no arena at all: every call
/// goes to the system delegate and no static slot storage is reserved.
pub struct TypePool<T, const C: usize> {
    #[cfg(not(feature = "sanitizer"))]
    arena: SlotPool<T, C>,
    system: SystemPool<T>,
}

impl<T, const C: usize> TypePool<T, C> {
    /// Creates the pool. `const` so it can back a `static`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            #[cfg(not(feature = "sanitizer"))]
            arena: SlotPool::new(),
            system: SystemPool::new(),
        }
    }

    /// Number of slots in the arena.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        C
    }

    /// Strategy this pool is routing through.
    #[inline]
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        config::strategy()
    }

    /// The arena backend, when it is the one in use.
    #[must_use]
    pub fn arena(&self) -> Option<&SlotPool<T, C>> {
        self.active_arena()
    }

    /// Whether arena slot `id` is occupied. Always false under
    /// [`Strategy::System`].
    #[must_use]
    pub fn is_used(&self, id: usize) -> bool {
        self.arena().is_some_and(|arena| arena.is_used(id))
    }

    /// Occupied arena slots. Always zero under [`Strategy::System`], which
    /// keeps no bookkeeping.
    #[must_use]
    pub fn used_count(&self) -> usize {
        self.arena().map_or(0, SlotPool::used_count)
    }

    #[cfg(not(feature = "sanitizer"))]
    #[inline]
    fn active_arena(&self) -> Option<&SlotPool<T, C>> {
        match config::strategy() {
            Strategy::Arena => Some(&self.arena),
            Strategy::System => None,
        }
    }

    #[cfg(feature = "sanitizer")]
    #[inline]
    #[allow(clippy::unused_self)]
    fn active_arena(&self) -> Option<&SlotPool<T, C>> {
        None
    }
}

impl<T, const C: usize> Default for TypePool<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const C: usize> fmt::Debug for TypePool<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypePool")
            .field("strategy", &self.strategy())
            .field("arena", &self.arena())
            .finish()
    }
}

impl<T, const C: usize> PoolBackend<T> for TypePool<T, C> {
    fn allocate(&self, size: usize, id: usize) -> NonNull<T> {
        match self.active_arena() {
            Some(arena) => arena.allocate(size, id),
            None => self.system.allocate(size, id),
        }
    }

    unsafe fn deallocate_with_id(&self, ptr: NonNull<T>, id: usize) {
        match self.active_arena() {
            Some(arena) => arena.deallocate_with_id(ptr, id),
            None => self.system.deallocate_with_id(ptr, id),
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<T>) {
        match self.active_arena() {
            Some(arena) => arena.deallocate(ptr),
            None => self.system.deallocate(ptr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Allocates every id, tags it, and frees half with each form.
    fn cycle<B: PoolBackend<u64> + ?Sized>(backend: &B, capacity: usize) {
        let ptrs: Vec<_> = (0..capacity)
            .map(|id| {
                let ptr = backend.allocate(8, id);
                unsafe {
                    assert_eq!(ptr.as_ptr().read(), 0);
                    ptr.as_ptr().write(id as u64 + 1);
                }
                ptr
            })
            .collect();

        for (id, ptr) in ptrs.into_iter().enumerate() {
            unsafe {
                assert_eq!(ptr.as_ptr().read(), id as u64 + 1);
                if id % 2 == 0 {
                    backend.deallocate(ptr);
                } else {
                    backend.deallocate_with_id(ptr, id);
                }
            }
        }
    }

    #[test]
    fn test_both_backends_share_one_interface() {
        let arena: SlotPool<u64, 6> = SlotPool::new();
        let system: SystemPool<u64> = SystemPool::new();
        let backends: [&dyn PoolBackend<u64>; 2] = [&arena, &system];
        for backend in backends {
            cycle(backend, 6);
        }
        assert_eq!(arena.used_count(), 0);
    }

    #[test]
    fn test_type_pool_routes_by_active_strategy() {
        static POOL: TypePool<u64, 4> = TypePool::new();
        assert_eq!(POOL.capacity(), 4);
        assert_eq!(POOL.strategy(), config::strategy());

        let ptr = POOL.allocate(8, 1);
        match POOL.arena() {
            Some(arena) => {
                assert_eq!(POOL.strategy(), Strategy::Arena);
                assert_eq!(POOL.used_count(), 1);
                assert!(POOL.is_used(1));
                assert_eq!(arena.slot_of(ptr), 1);
            }
            None => {
                assert_eq!(POOL.strategy(), Strategy::System);
                assert_eq!(POOL.used_count(), 0);
                assert!(!POOL.is_used(1));
            }
        }
        unsafe { POOL.deallocate(ptr) };
        assert_eq!(POOL.used_count(), 0);

        cycle(&POOL, 4);
    }

    #[test]
    #[cfg(feature = "sanitizer")]
    fn test_sanitizer_build_reserves_no_arena() {
        type Big = TypePool<[u8; 4096], 64>;
        assert!(std::mem::size_of::<Big>() < 4096);

        static POOL: TypePool<u64, 4> = TypePool::new();
        assert_eq!(POOL.strategy(), Strategy::System);
        assert!(POOL.arena().is_none());
        cycle(&POOL, 4);
    }
}
