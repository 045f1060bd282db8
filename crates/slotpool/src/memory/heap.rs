//! # Heap Allocator
//!
//! Thin wrapper over the process allocator that hands out zero-filled
//! memory. No pooling, no identity tracking: ownership of a region moves
//! to the caller on allocation and comes back on deallocation.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Allocates a zero-filled region for `layout` from the process allocator.
///
/// Zero-sized layouts never reach the allocator and get a dangling,
/// well-aligned address instead.
///
/// Allocator failure goes through [`alloc::handle_alloc_error`], which
/// aborts the process. There is no recovery path.
#[must_use]
pub fn allocate(layout: Layout) -> NonNull<u8> {
    if layout.size() == 0 {
        // SAFETY: alignment is a non-zero power of two.
        return unsafe { NonNull::new_unchecked(layout.align() as *mut u8) };
    }

    // SAFETY: layout has non-zero size.
    let ptr = unsafe { alloc::alloc_zeroed(layout) };
    match NonNull::new(ptr) {
        Some(ptr) => ptr,
        None => alloc::handle_alloc_error(layout),
    }
}

/// Returns a region obtained from [`allocate`] to the process allocator.
///
/// # Safety
///
/// `ptr` must come from [`allocate`] with the same `layout` and must not
/// have been deallocated already. Nothing here checks either condition.
pub unsafe fn deallocate(ptr: NonNull<u8>, layout: Layout) {
    if layout.size() != 0 {
        alloc::dealloc(ptr.as_ptr(), layout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_is_zero_filled() {
        for size in [1, 7, 64, 4096, 65_537] {
            let layout = Layout::from_size_align(size, 8).unwrap();
            let ptr = allocate(layout);
            let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), size) };
            assert!(bytes.iter().all(|&b| b == 0), "{size} bytes not zeroed");
            unsafe { deallocate(ptr, layout) };
        }
    }

    #[test]
    fn test_allocation_respects_alignment() {
        let layout = Layout::from_size_align(24, 64).unwrap();
        let ptr = allocate(layout);
        assert_eq!(ptr.as_ptr() as usize % 64, 0);
        unsafe { deallocate(ptr, layout) };
    }

    #[test]
    fn test_zero_sized_layout_skips_allocator() {
        let layout = Layout::from_size_align(0, 16).unwrap();
        let ptr = allocate(layout);
        assert_eq!(ptr.as_ptr() as usize, 16);
        unsafe { deallocate(ptr, layout) };
    }
}
