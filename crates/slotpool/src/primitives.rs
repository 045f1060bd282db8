//! # Primitives
//!
//! The two building blocks every allocator in this crate sits on:
//! zero-filling a region and failing hard on an invariant violation.

#![allow(unsafe_code)]

/// Fills `count` values of `T` starting at `ptr` with zero bytes.
///
/// # Safety
///
/// `ptr` must be valid for writes of `count * size_of::<T>()` bytes and
/// properly aligned for `T`.
#[inline]
pub(crate) unsafe fn zero_fill<T>(ptr: *mut T, count: usize) {
    core::ptr::write_bytes(ptr, 0, count);
}

/// Reports a pool invariant violation and stops the process.
///
/// The workspace profiles build with `panic = "abort"`, so outside the
/// test harness this never unwinds.
#[cold]
#[inline(never)]
#[track_caller]
pub(crate) fn fatal(type_name: &str, id: Option<usize>, message: &str) -> ! {
    match id {
        Some(id) => {
            tracing::error!(pool = type_name, id, "{message}");
            panic!("{type_name} slot {id}: {message}");
        }
        None => {
            tracing::error!(pool = type_name, "{message}");
            panic!("{type_name}: {message}");
        }
    }
}

/// Asserts a pool invariant, calling [`fatal`] when it does not hold.
macro_rules! pool_assert {
    ($cond:expr, $type_name:expr, $id:expr, $message:literal) => {
        if !$cond {
            $crate::primitives::fatal($type_name, $id, $message);
        }
    };
}

pub(crate) use pool_assert;
