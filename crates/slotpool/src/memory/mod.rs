//! # Memory Management
//!
//! The allocators behind declared types.
//!
//! ## Layout
//!
//! - [`heap`]: zero-filling wrapper over the process allocator
//! - [`SlotPool`]: fixed arena of `C` slots addressed by caller ids
//! - [`SystemPool`]: sanitizer-safe delegate with the same contract
//! - [`TypePool`]: one type's pool, routed by the active strategy

pub mod heap;

mod backend;
mod slot_pool;
mod system_pool;

pub use backend::{PoolBackend, TypePool};
pub use slot_pool::SlotPool;
pub use system_pool::SystemPool;
