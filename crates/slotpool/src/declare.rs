//! # Type Declarations
//!
//! Attaches an allocation strategy to a type.
//!
//! - [`heap_alloc!`](crate::heap_alloc) gives a type [`HeapAlloc`]: every
//!   instance is a fresh zero-filled heap block, owned by a [`HeapBox`].
//! - [`pool_alloc!`](crate::pool_alloc) gives a type [`PoolAlloc`] and its
//!   own `static` [`TypePool`] of fixed capacity. Instances are placed in a
//!   caller-chosen slot and owned by a [`PoolBox`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use slotpool::{pool_alloc, PoolBox};
//!
//! const MAX_CLIENTS: usize = 64;
//!
//! struct Character { health: i32, armor: i32 }
//! pool_alloc!(Character, MAX_CLIENTS);
//!
//! // Client 7 always lives in slot 7.
//! let character = PoolBox::new(7, Character { health: 10, armor: 0 });
//! drop(character); // slot 7 is free again
//! ```
//!
//! [`TypePool`]: crate::memory::TypePool

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;
use std::mem::{size_of, ManuallyDrop};
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};

use bytemuck::Zeroable;

use crate::memory::{heap, PoolBackend};

/// Types allocated individually on the process heap, zero-filled.
///
/// Implement with [`heap_alloc!`](crate::heap_alloc).
pub trait HeapAlloc: Sized {
    /// Allocates zero-filled storage for one `Self`.
    #[must_use]
    fn heap_allocate() -> NonNull<Self> {
        heap::allocate(Layout::new::<Self>()).cast()
    }

    /// Frees storage from [`HeapAlloc::heap_allocate`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `heap_allocate` and not be freed already. The
    /// value in it is not dropped.
    unsafe fn heap_deallocate(ptr: NonNull<Self>) {
        heap::deallocate(ptr.cast(), Layout::new::<Self>());
    }
}

/// Types placed in a fixed per-type pool, one instance per slot id.
///
/// Implement with [`pool_alloc!`](crate::pool_alloc), which also defines
/// the type's single `static` pool.
pub trait PoolAlloc: Sized + 'static {
    /// Number of slots in this type's pool.
    const CAPACITY: usize;

    /// Backend holding this type's slots.
    type Pool: PoolBackend<Self> + 'static;

    /// This type's pool.
    fn pool() -> &'static Self::Pool;

    /// Claims slot `id` and returns its zero-filled storage.
    #[must_use]
    fn pool_allocate(id: usize) -> NonNull<Self> {
        Self::pool().allocate(size_of::<Self>(), id)
    }

    /// Releases slot `id` at `ptr`.
    ///
    /// # Safety
    ///
    /// See [`PoolBackend::deallocate_with_id`].
    unsafe fn pool_deallocate_with_id(ptr: NonNull<Self>, id: usize) {
        Self::pool().deallocate_with_id(ptr, id);
    }

    /// Releases the slot at `ptr`.
    ///
    /// # Safety
    ///
    /// See [`PoolBackend::deallocate`].
    unsafe fn pool_deallocate(ptr: NonNull<Self>) {
        Self::pool().deallocate(ptr);
    }
}

/// Declares heap allocation for one or more types.
///
/// ```rust,ignore
/// struct Snapshot { tick: u32 }
/// slotpool::heap_alloc!(Snapshot);
/// let snapshot = slotpool::HeapBox::new(Snapshot { tick: 1 });
/// ```
#[macro_export]
macro_rules! heap_alloc {
    ($($ty:ty),+ $(,)?) => {
        $( impl $crate::HeapAlloc for $ty {} )+
    };
}

/// Declares a fixed pool of `capacity` slots for a type.
///
/// Defines the type's one `static` [`TypePool`](crate::memory::TypePool).
/// Use it once per type. The type must be `Send` for its pool to be a
/// `static`.
///
/// ```rust,ignore
/// struct Projectile { pos: [f32; 2] }
/// slotpool::pool_alloc!(Projectile, 1024);
/// let shot = slotpool::PoolBox::new(12, Projectile { pos: [0.0; 2] });
/// ```
#[macro_export]
macro_rules! pool_alloc {
    ($ty:ty, $capacity:expr) => {
        impl $crate::PoolAlloc for $ty {
            const CAPACITY: usize = $capacity;

            type Pool = $crate::memory::TypePool<$ty, { $capacity }>;

            fn pool() -> &'static Self::Pool {
                static POOL: $crate::memory::TypePool<$ty, { $capacity }> =
                    $crate::memory::TypePool::new();
                &POOL
            }
        }
    };
}

/// Owning pointer to a heap-allocated `T`.
///
/// The storage is zero-filled before the value is written. Dropping the
/// box drops the value and frees the block.
pub struct HeapBox<T: HeapAlloc> {
    ptr: NonNull<T>,
    _owns: PhantomData<T>,
}

// SAFETY: HeapBox owns its T exclusively, like Box.
unsafe impl<T: HeapAlloc + Send> Send for HeapBox<T> {}
// SAFETY: shared access only hands out &T.
unsafe impl<T: HeapAlloc + Sync> Sync for HeapBox<T> {}

impl<T: HeapAlloc> HeapBox<T> {
    /// Moves `value` into fresh zero-filled heap storage.
    #[must_use]
    pub fn new(value: T) -> Self {
        let ptr = T::heap_allocate();
        // SAFETY: freshly allocated, aligned for T.
        unsafe { ptr.as_ptr().write(value) };
        Self {
            ptr,
            _owns: PhantomData,
        }
    }

    /// Allocates a `T` whose every byte is zero.
    #[must_use]
    pub fn new_zeroed() -> Self
    where
        T: Zeroable,
    {
        // All-zero bytes are a valid T for Zeroable types.
        Self {
            ptr: T::heap_allocate(),
            _owns: PhantomData,
        }
    }

    /// Address of the value.
    #[inline]
    #[must_use]
    pub fn as_ptr(this: &Self) -> *const T {
        this.ptr.as_ptr()
    }

    /// Gives up ownership without dropping or freeing.
    #[must_use]
    pub fn into_raw(this: Self) -> NonNull<T> {
        ManuallyDrop::new(this).ptr
    }

    /// Retakes ownership of a pointer from [`HeapBox::into_raw`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `into_raw` and not be owned by anything else.
    #[must_use]
    pub unsafe fn from_raw(ptr: NonNull<T>) -> Self {
        Self {
            ptr,
            _owns: PhantomData,
        }
    }
}

impl<T: HeapAlloc> Deref for HeapBox<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: initialized and owned for the box's lifetime.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: HeapAlloc> DerefMut for HeapBox<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: initialized and uniquely owned.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: HeapAlloc> Drop for HeapBox<T> {
    fn drop(&mut self) {
        // SAFETY: value is live and the block came from heap_allocate.
        unsafe {
            ptr::drop_in_place(self.ptr.as_ptr());
            T::heap_deallocate(self.ptr);
        }
    }
}

impl<T: HeapAlloc + fmt::Debug> fmt::Debug for HeapBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

/// Owning pointer to a `T` living in slot `id` of its type's pool.
///
/// Dropping the box drops the value and frees the slot through the id-less
/// path, which recovers the id from the address.
/// [`PoolBox::delete_with_id`] frees through the id-checked path instead.
pub struct PoolBox<T: PoolAlloc> {
    ptr: NonNull<T>,
    id: usize,
    _owns: PhantomData<T>,
}

// SAFETY: PoolBox owns its slot exclusively until it is freed.
unsafe impl<T: PoolAlloc + Send> Send for PoolBox<T> {}
// SAFETY: shared access only hands out &T.
unsafe impl<T: PoolAlloc + Sync> Sync for PoolBox<T> {}

impl<T: PoolAlloc> PoolBox<T> {
    /// Claims slot `id` and moves `value` into it.
    ///
    /// # Panics
    ///
    /// Fatal if the slot is already occupied or `id` is out of range
    /// (arena strategy).
    #[must_use]
    pub fn new(id: usize, value: T) -> Self {
        let ptr = T::pool_allocate(id);
        // SAFETY: claimed slot, aligned for T.
        unsafe { ptr.as_ptr().write(value) };
        Self {
            ptr,
            id,
            _owns: PhantomData,
        }
    }

    /// Claims slot `id` and leaves it all-zero.
    ///
    /// # Panics
    ///
    /// Same as [`PoolBox::new`].
    #[must_use]
    pub fn new_zeroed(id: usize) -> Self
    where
        T: Zeroable,
    {
        Self {
            ptr: T::pool_allocate(id),
            id,
            _owns: PhantomData,
        }
    }

    /// Slot id this value was allocated into.
    #[inline]
    #[must_use]
    pub fn id(this: &Self) -> usize {
        this.id
    }

    /// Address of the value.
    #[inline]
    #[must_use]
    pub fn as_ptr(this: &Self) -> *const T {
        this.ptr.as_ptr()
    }

    /// Drops the value and frees its slot, checking that `id` matches the
    /// slot the value lives in.
    ///
    /// # Panics
    ///
    /// Fatal with `invalid id` on a mismatch (arena strategy).
    pub fn delete_with_id(this: Self, id: usize) {
        let this = ManuallyDrop::new(this);
        // SAFETY: value is live and owned; the box is not dropped again.
        unsafe {
            ptr::drop_in_place(this.ptr.as_ptr());
            T::pool_deallocate_with_id(this.ptr, id);
        }
    }

    /// Gives up ownership without dropping or freeing.
    #[must_use]
    pub fn into_raw(this: Self) -> (NonNull<T>, usize) {
        let this = ManuallyDrop::new(this);
        (this.ptr, this.id)
    }

    /// Retakes ownership of a slot from [`PoolBox::into_raw`].
    ///
    /// # Safety
    ///
    /// `ptr` and `id` must come from `into_raw` and not be owned by
    /// anything else.
    #[must_use]
    pub unsafe fn from_raw(ptr: NonNull<T>, id: usize) -> Self {
        Self {
            ptr,
            id,
            _owns: PhantomData,
        }
    }
}

impl<T: PoolAlloc> Deref for PoolBox<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: initialized and owned for the box's lifetime.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: PoolAlloc> DerefMut for PoolBox<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: initialized and uniquely owned.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: PoolAlloc> Drop for PoolBox<T> {
    fn drop(&mut self) {
        // SAFETY: value is live and the slot came from pool_allocate.
        unsafe {
            ptr::drop_in_place(self.ptr.as_ptr());
            T::pool_deallocate(self.ptr);
        }
    }
}

impl<T: PoolAlloc + fmt::Debug> fmt::Debug for PoolBox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBox")
            .field("id", &self.id)
            .field("value", &**self)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Marker {
        tag: u32,
        flags: [u8; 4],
    }
    heap_alloc!(Marker);

    #[derive(Debug, Clone, Copy, PartialEq, Zeroable)]
    struct Cell {
        value: i64,
    }
    pool_alloc!(Cell, 3);

    #[test]
    fn test_heap_box_holds_value() {
        let mut marker = HeapBox::new(Marker {
            tag: 9,
            flags: [1, 2, 3, 4],
        });
        marker.tag += 1;
        assert_eq!(*marker, Marker { tag: 10, flags: [1, 2, 3, 4] });
    }

    #[test]
    fn test_heap_box_raw_round_trip_keeps_address() {
        let marker = HeapBox::new(Marker { tag: 1, flags: [0; 4] });
        let addr = HeapBox::as_ptr(&marker);
        let raw = HeapBox::into_raw(marker);
        assert_eq!(raw.as_ptr().cast_const(), addr);
        let marker = unsafe { HeapBox::from_raw(raw) };
        assert_eq!(marker.tag, 1);
    }

    #[test]
    fn test_pool_box_lives_in_its_slot() {
        let cell = PoolBox::new(2, Cell { value: -4 });
        assert_eq!(PoolBox::id(&cell), 2);
        assert_eq!(cell.value, -4);
        assert_eq!(Cell::CAPACITY, 3);
        assert_eq!(Cell::pool().capacity(), 3);

        if let Some(arena) = Cell::pool().arena() {
            assert!(arena.is_used(2));
            assert_eq!(arena.slot_of(cell.ptr), 2);
        }
        drop(cell);
        assert!(!Cell::pool().is_used(2));
    }

    #[test]
    fn test_pool_box_zeroed_and_delete_with_id() {
        let cell = PoolBox::<Cell>::new_zeroed(0);
        assert_eq!(*cell, Cell { value: 0 });
        PoolBox::delete_with_id(cell, 0);
        assert!(!Cell::pool().is_used(0));
    }
}
