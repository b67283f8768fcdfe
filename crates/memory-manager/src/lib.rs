// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # memory-manager
//!
//! Budget-enforced allocation of the flat byte buffers that back tensor
//! descriptors.
//!
//! # Key Components
//!
//! - [`MemoryBudget`]: a memory ceiling with human-readable parsing
//!   (`"512M"`, `"1G"`, `"unlimited"`).
//! - [`MemoryPool`]: the allocator: reserves bytes against the budget,
//!   performs a fallible host allocation and tracks statistics.
//! - [`PooledBuffer`]: an owned, zero-initialised buffer. Dropping it
//!   gives its bytes back to the pool's accounting.
//! - [`AllocationStats`]: cumulative allocator metrics (peak usage,
//!   rejections, live bytes).
//!
//! # Ownership Model
//!
//! ```text
//! MemoryPool::allocate(bytes)
//!       │  reserve against budget, try_reserve on the host
//!       ▼
//!   PooledBuffer  ◄─── owns Vec<u8>, holds Arc<PoolInner>
//!       │
//!       │  drop()
//!       ▼
//!   PoolInner::release()  ──► live bytes decremented
//! ```
//!
//! # Example
//! ```
//! use memory_manager::{MemoryPool, MemoryBudget};
//!
//! let pool = MemoryPool::new(MemoryBudget::from_mb(64));
//!
//! let a = pool.allocate(1024 * 1024).unwrap();
//! let b = pool.allocate(512 * 1024).unwrap();
//! assert_eq!(pool.allocated_bytes(), 1024 * 1024 + 512 * 1024);
//!
//! drop(a);
//! assert_eq!(pool.allocated_bytes(), 512 * 1024);
//! # drop(b);
//! ```

mod budget;
mod buffer;
mod error;
pub mod pool;
mod stats;

pub use budget::MemoryBudget;
pub use buffer::PooledBuffer;
pub use error::AllocationError;
pub use pool::MemoryPool;
pub use stats::AllocationStats;
