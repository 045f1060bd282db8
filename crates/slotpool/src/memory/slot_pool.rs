//! # Slot Pool
//!
//! Fixed-capacity arena of `C` slots for one type, addressed by ids the
//! caller picks. The allocator never chooses an id: "entity slot 5" lives
//! at slot 5 of its type's pool for as long as it is alive.
//!
//! ```text
//!   base
//!    │
//!    ▼
//!   ┌────────┬────────┬────────┬────────┐
//!   │ slot 0 │ slot 1 │ slot 2 │ slot 3 │   storage: [Slot<T>; C]
//!   └────────┴────────┴────────┴────────┘
//!     false    false    true     false      used:    [bool; C]
//!                       ▲
//!                       └── base + 2 * stride
//! ```
//!
//! The stride is `size_of::<T>()`, except that a slot is never narrower
//! than one byte: zero-sized types still get one distinct address per slot.
//!
//! Every slot is Free (flag clear, bytes zero) or Occupied (flag set, one
//! live `T`). Claiming and releasing both zero-fill the slot. Misuse is
//! fatal: the process stops with a message naming the type and slot.

#![allow(unsafe_code)]

use std::any::type_name;
use std::cell::UnsafeCell;
use std::fmt;
use std::mem::{size_of, ManuallyDrop, MaybeUninit};
use std::ptr::NonNull;

use parking_lot::{const_mutex, Mutex};

use super::backend::PoolBackend;
use crate::primitives::{pool_assert, zero_fill};

/// One storage cell, holding a `T` at offset zero and at least one byte wide.
#[repr(C)]
union Slot<T> {
    _value: ManuallyDrop<T>,
    _byte: u8,
}

/// Fixed arena of `C` slots for values of type `T`.
///
/// Storage is contiguous, so slot `id` always sits at `base + id * stride`
/// and an address alone is enough to recover its id
/// ([`SlotPool::slot_of`]). The stride equals `size_of::<T>()` for every
/// type with a non-zero size.
///
/// `new` is `const`, so a pool can live in a `static` with all-zero
/// storage as its initial state. Values still occupying slots when a pool
/// is dropped are not dropped.
///
/// # Thread Safety
///
/// Pools are meant to be driven from one thread. The in-use flags sit
/// behind a mutex so the pool can be a `static`; slot contents are not
/// synchronized.
pub struct SlotPool<T, const C: usize> {
    /// Slot storage, zero until claimed.
    storage: UnsafeCell<MaybeUninit<[Slot<T>; C]>>,
    /// In-use flag per slot.
    used: Mutex<[bool; C]>,
}

// SAFETY: slot contents are only reached through pointers handed out by
// `allocate`, and only one caller can hold a claimed slot at a time.
unsafe impl<T: Send, const C: usize> Sync for SlotPool<T, C> {}

impl<T, const C: usize> SlotPool<T, C> {
    /// Distance between two slots. Never zero.
    pub const STRIDE: usize = size_of::<Slot<T>>();

    /// Creates a pool with every slot free and zero-filled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            storage: UnsafeCell::new(MaybeUninit::zeroed()),
            used: const_mutex([false; C]),
        }
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        C
    }

    /// Address of slot 0.
    #[inline]
    #[must_use]
    pub fn base(&self) -> NonNull<T> {
        // SAFETY: pointer into a live field.
        unsafe { NonNull::new_unchecked(self.storage.get().cast::<T>()) }
    }

    /// Whether slot `id` is occupied. Out-of-range ids are never occupied.
    #[must_use]
    pub fn is_used(&self, id: usize) -> bool {
        self.used.lock().get(id).copied().unwrap_or(false)
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn used_count(&self) -> usize {
        self.used.lock().iter().filter(|&&used| used).count()
    }

    /// Claims slot `id` and returns its zero-filled address.
    ///
    /// `size` is the size the caller wants to construct and must equal
    /// `size_of::<T>()`.
    ///
    /// # Panics
    ///
    /// Fatal on `size error`, `id out of range` or `already used`.
    #[must_use]
    pub fn allocate(&self, size: usize, id: usize) -> NonNull<T> {
        let name = type_name::<T>();
        pool_assert!(size == size_of::<T>(), name, Some(id), "size error");
        pool_assert!(id < C, name, Some(id), "id out of range");

        let mut used = self.used.lock();
        pool_assert!(!used[id], name, Some(id), "already used");
        used[id] = true;

        // SAFETY: in-range slot, claimed above, nobody else can reach it.
        unsafe { zero_fill(self.cell(id), 1) };
        tracing::trace!(pool = name, id, "++");
        self.slot_ptr(id)
    }

    /// Releases slot `id`, checking that `ptr` is that slot's address.
    ///
    /// The value in the slot is not dropped; callers drop it first.
    ///
    /// # Panics
    ///
    /// Fatal on `id out of range`, `not used` or `invalid id`.
    ///
    /// # Safety
    ///
    /// No reference into the slot may outlive this call.
    pub unsafe fn deallocate_with_id(&self, ptr: NonNull<T>, id: usize) {
        let name = type_name::<T>();
        pool_assert!(id < C, name, Some(id), "id out of range");

        let mut used = self.used.lock();
        pool_assert!(used[id], name, Some(id), "not used");
        pool_assert!(ptr == self.slot_ptr(id), name, Some(id), "invalid id");
        self.release(&mut used, id);
    }

    /// Releases the slot at `ptr`, recovering its id from the address.
    ///
    /// # Panics
    ///
    /// Fatal when `ptr` is not a slot address of this pool, or on
    /// `not used`.
    ///
    /// # Safety
    ///
    /// No reference into the slot may outlive this call.
    pub unsafe fn deallocate(&self, ptr: NonNull<T>) {
        let id = self.slot_of(ptr);

        let mut used = self.used.lock();
        pool_assert!(used[id], type_name::<T>(), Some(id), "not used");
        self.release(&mut used, id);
    }

    /// Recovers the slot id of `ptr` from its offset against the pool base.
    ///
    /// # Panics
    ///
    /// Fatal with `address outside pool` when `ptr` is below the base or
    /// past the last slot, and `misaligned address` when it does not point
    /// at the start of a slot.
    #[must_use]
    pub fn slot_of(&self, ptr: NonNull<T>) -> usize {
        let name = type_name::<T>();
        let base = self.base().as_ptr() as usize;
        let addr = ptr.as_ptr() as usize;
        pool_assert!(addr >= base, name, None, "address outside pool");

        let offset = addr - base;
        pool_assert!(offset % Self::STRIDE == 0, name, None, "misaligned address");

        let id = offset / Self::STRIDE;
        pool_assert!(id < C, name, Some(id), "address outside pool");
        id
    }

    /// Cell of slot `id`. Callers bounds-check first.
    #[inline]
    fn cell(&self, id: usize) -> *mut Slot<T> {
        debug_assert!(id < C);
        // SAFETY: id < C keeps the result inside the storage array.
        unsafe { self.storage.get().cast::<Slot<T>>().add(id) }
    }

    /// Address of the value in slot `id`.
    #[inline]
    fn slot_ptr(&self, id: usize) -> NonNull<T> {
        // SAFETY: derived from the storage field, never null.
        unsafe { NonNull::new_unchecked(self.cell(id).cast::<T>()) }
    }

    /// Flips slot `id` back to Free and zero-fills it.
    fn release(&self, used: &mut [bool; C], id: usize) {
        used[id] = false;
        // SAFETY: in-range slot whose owner has given it up.
        unsafe { zero_fill(self.cell(id), 1) };
        tracing::trace!(pool = type_name::<T>(), id, "--");
    }
}

impl<T, const C: usize> Default for SlotPool<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const C: usize> fmt::Debug for SlotPool<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPool")
            .field("type", &type_name::<T>())
            .field("capacity", &C)
            .field("used", &self.used_count())
            .finish()
    }
}

impl<T, const C: usize> PoolBackend<T> for SlotPool<T, C> {
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
