//! # SLOTPOOL
//!
//! Per-type object allocation for a tick-driven game server:
//! - Pooled types get a fixed arena of `C` slots, addressed by the ids the
//!   server already uses (client index, entity index)
//! - Heap types get zero-filled blocks from the process allocator
//! - Sanitized builds route pools to the process allocator so tooling sees
//!   real use-after-free and double-free
//!
//! ## Rules
//!
//! 1. **Ids are the caller's** - the pool never picks a slot
//! 2. **Misuse is fatal** - double allocate, double free and id mismatch
//!    stop the process; nothing is reported as an error value
//! 3. **No growth** - capacity is a compile-time constant per type
//!
//! ## Example
//!
//! ```rust,ignore
//! use slotpool::{heap_alloc, pool_alloc, HeapBox, PoolBox};
//!
//! struct Player { score: i32 }
//! pool_alloc!(Player, 64);
//!
//! struct GameEvent { tick: u32 }
//! heap_alloc!(GameEvent);
//!
//! let player = PoolBox::new(3, Player { score: 0 });
//! let event = HeapBox::new(GameEvent { tick: 100 });
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod declare;
pub mod error;
pub mod memory;
mod primitives;

pub use config::{AllocConfig, Strategy};
pub use declare::{HeapAlloc, HeapBox, PoolAlloc, PoolBox};
pub use error::{ConfigError, ConfigResult};
pub use memory::{PoolBackend, SlotPool, SystemPool, TypePool};
