// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Budget-enforcing buffer pool.
//!
//! The [`MemoryPool`] is the only place tensor bytes are allocated. Each
//! request is first reserved against the budget with a single atomic
//! update, then satisfied with a fallible host allocation. A request that
//! fails either step leaves the live-byte counter untouched.
//!
//! # Thread Safety
//! `MemoryPool` is `Send + Sync` and cheap to clone: clones share the same
//! budget and counters.

use crate::{AllocationError, AllocationStats, MemoryBudget, PooledBuffer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Pool state shared between the pool handle and its buffers.
pub struct PoolInner {
    budget: MemoryBudget,
    allocated_bytes: AtomicUsize,
    stats: Mutex<AllocationStats>,
}

impl PoolInner {
    /// Called by `PooledBuffer::drop`.
    pub(crate) fn release(&self, size_bytes: usize) {
        self.allocated_bytes.fetch_sub(size_bytes, Ordering::AcqRel);
        if let Ok(mut stats) = self.stats.lock() {
            stats.record_release(size_bytes);
        }
    }
}

/// Allocator for descriptor buffers.
///
/// # Example
/// ```
/// use memory_manager::{MemoryPool, MemoryBudget};
///
/// let pool = MemoryPool::new(MemoryBudget::from_bytes(64));
/// let buf = pool.allocate(48).unwrap();
/// assert!(pool.allocate(32).is_err());
/// drop(buf);
/// assert!(pool.allocate(32).is_ok());
/// ```
#[derive(Clone)]
pub struct MemoryPool {
    inner: Arc<PoolInner>,
}

impl MemoryPool {
    pub fn new(budget: MemoryBudget) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                budget,
                allocated_bytes: AtomicUsize::new(0),
                stats: Mutex::new(AllocationStats::default()),
            }),
        }
    }

    /// A pool without a ceiling. Only host allocation failure can reject.
    pub fn unbounded() -> Self {
        Self::new(MemoryBudget::unlimited())
    }

    /// Allocates a zero-filled buffer of `size_bytes`.
    ///
    /// Zero-byte requests succeed; tensors with an empty dimension still
    /// need a bound buffer.
    pub fn allocate(&self, size_bytes: usize) -> Result<PooledBuffer, AllocationError> {
        let budget = self.inner.budget.as_bytes();

        let reserved = self.inner.allocated_bytes.fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |current| {
                current
                    .checked_add(size_bytes)
                    .filter(|&total| total <= budget)
            },
        );

        let previous = match reserved {
            Ok(previous) => previous,
            Err(current) => {
                if let Ok(mut stats) = self.inner.stats.lock() {
                    stats.record_rejection();
                }
                tracing::warn!(
                    requested = size_bytes,
                    allocated = current,
                    budget = %self.inner.budget,
                    "allocation rejected by memory budget"
                );
                return Err(AllocationError::BudgetExceeded {
                    requested_bytes: size_bytes,
                    available_bytes: budget.saturating_sub(current),
                    budget_bytes: budget,
                });
            }
        };

        let mut data = Vec::new();
        if data.try_reserve_exact(size_bytes).is_err() {
            self.inner
                .allocated_bytes
                .fetch_sub(size_bytes, Ordering::AcqRel);
            if let Ok(mut stats) = self.inner.stats.lock() {
                stats.record_rejection();
            }
            return Err(AllocationError::OutOfMemory {
                requested_bytes: size_bytes,
            });
        }
        data.resize(size_bytes, 0);

        if let Ok(mut stats) = self.inner.stats.lock() {
            stats.record_allocation(size_bytes, previous + size_bytes);
        }

        Ok(PooledBuffer::new(data, Arc::clone(&self.inner)))
    }

    /// Allocates room for `elements` items of `element_bytes` each.
    pub fn allocate_elements(
        &self,
        elements: usize,
        element_bytes: usize,
    ) -> Result<PooledBuffer, AllocationError> {
        let size_bytes = elements
            .checked_mul(element_bytes)
            .ok_or(AllocationError::SizeOverflow {
                elements,
                element_bytes,
            })?;
        self.allocate(size_bytes)
    }

    /// Bytes currently held by live buffers.
    pub fn allocated_bytes(&self) -> usize {
        self.inner.allocated_bytes.load(Ordering::Acquire)
    }

    /// Bytes remaining before the budget rejects a request.
    pub fn available_bytes(&self) -> usize {
        self.inner
            .budget
            .as_bytes()
            .saturating_sub(self.allocated_bytes())
    }

    pub fn budget(&self) -> MemoryBudget {
        self.inner.budget
    }

    /// Returns a snapshot of allocation statistics.
    pub fn stats(&self) -> AllocationStats {
        self.inner
            .stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl std::fmt::Debug for MemoryPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPool")
            .field("budget", &self.inner.budget)
            .field("allocated_bytes", &self.allocated_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_drop() {
        let pool = MemoryPool::new(MemoryBudget::from_mb(1));

        let buf = pool.allocate(1024).unwrap();
        assert_eq!(pool.allocated_bytes(), 1024);
        assert_eq!(buf.len(), 1024);
        assert!(buf.as_slice().iter().all(|&b| b == 0));

        drop(buf);
        assert_eq!(pool.allocated_bytes(), 0);
    }

    #[test]
    fn test_budget_exceeded() {
        let pool = MemoryPool::new(MemoryBudget::from_bytes(1024));

        let _a = pool.allocate(512).unwrap();
        let _b = pool.allocate(512).unwrap();

        match pool.allocate(1) {
            Err(AllocationError::BudgetExceeded {
                requested_bytes,
                available_bytes,
                budget_bytes,
            }) => {
                assert_eq!(requested_bytes, 1);
                assert_eq!(available_bytes, 0);
                assert_eq!(budget_bytes, 1024);
            }
            other => panic!("expected BudgetExceeded, got {other:?}"),
        }
        assert_eq!(pool.allocated_bytes(), 1024);
    }

    #[test]
    fn test_zero_sized_allocation() {
        let pool = MemoryPool::new(MemoryBudget::from_bytes(16));
        let buf = pool.allocate(0).unwrap();
        assert!(buf.is_empty());
        assert_eq!(pool.allocated_bytes(), 0);
    }

    #[test]
    fn test_allocate_elements_overflow() {
        let pool = MemoryPool::unbounded();
        let err = pool.allocate_elements(usize::MAX, 4).unwrap_err();
        assert!(matches!(err, AllocationError::SizeOverflow { .. }));
    }

    #[test]
    fn test_unbounded_rejects_unsatisfiable_request() {
        let pool = MemoryPool::unbounded();
        let err = pool.allocate(usize::MAX).unwrap_err();
        assert!(matches!(err, AllocationError::OutOfMemory { .. }));
        assert_eq!(pool.allocated_bytes(), 0);
    }

    #[test]
    fn test_clones_share_accounting() {
        let pool = MemoryPool::new(MemoryBudget::from_bytes(100));
        let other = pool.clone();
        let _buf = other.allocate(60).unwrap();
        assert_eq!(pool.available_bytes(), 40);
        assert!(pool.allocate(50).is_err());
    }

    #[test]
    fn test_stats_peak_and_rejections() {
        let pool = MemoryPool::new(MemoryBudget::from_bytes(4000));

        let a = pool.allocate(1000).unwrap();
        let b = pool.allocate(2000).unwrap();
        drop(a);
        drop(b);
        let _ = pool.allocate(5000);

        let stats = pool.stats();
        assert_eq!(stats.peak_allocated_bytes, 3000);
        assert_eq!(stats.total_allocations, 2);
        assert_eq!(stats.total_releases, 2);
        assert_eq!(stats.rejections, 1);
        assert_eq!(stats.live_bytes, 0);
    }

    #[test]
    fn test_debug_format() {
        let pool = MemoryPool::new(MemoryBudget::from_mb(64));
        let debug = format!("{pool:?}");
        assert!(debug.contains("MemoryPool"));
        assert!(debug.contains("budget"));
    }
}
