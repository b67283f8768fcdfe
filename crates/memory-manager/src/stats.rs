// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Allocation statistics for profiling and diagnostics.

/// Cumulative statistics about pool usage.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct AllocationStats {
    /// Successful allocation requests.
    pub total_allocations: u64,
    /// Buffers dropped.
    pub total_releases: u64,
    /// Requests refused by the budget or the host allocator.
    pub rejections: u64,
    /// High-water mark of live bytes.
    pub peak_allocated_bytes: usize,
    /// Bytes currently held by live buffers.
    pub live_bytes: usize,
    /// Total bytes ever handed out.
    pub cumulative_allocated_bytes: u64,
}

impl AllocationStats {
    pub(crate) fn record_allocation(&mut self, size: usize, live_after: usize) {
        self.total_allocations += 1;
        self.cumulative_allocated_bytes += size as u64;
        self.live_bytes = live_after;
        self.peak_allocated_bytes = self.peak_allocated_bytes.max(live_after);
    }

    pub(crate) fn record_release(&mut self, size: usize) {
        self.total_releases += 1;
        self.live_bytes = self.live_bytes.saturating_sub(size);
    }

    pub(crate) fn record_rejection(&mut self) {
        self.rejections += 1;
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        let peak_kb = self.peak_allocated_bytes as f64 / 1024.0;
        format!(
            "Allocations: {} total, {} released, {} rejected, peak {:.2} KB, {} bytes live",
            self.total_allocations,
            self.total_releases,
            self.rejections,
            peak_kb,
            self.live_bytes,
        )
    }
}
