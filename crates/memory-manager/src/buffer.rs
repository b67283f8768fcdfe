// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Owned pool buffer.
//!
//! A [`PooledBuffer`] is the only owner of its bytes. Moving it moves
//! ownership; dropping it returns the byte count to the pool accounting.

use crate::pool::PoolInner;
use std::sync::Arc;

/// An owned, zero-initialised byte buffer allocated from a
/// [`MemoryPool`](crate::MemoryPool).
pub struct PooledBuffer {
    data: Vec<u8>,
    pool: Arc<PoolInner>,
}

impl PooledBuffer {
    pub(crate) fn new(data: Vec<u8>, pool: Arc<PoolInner>) -> Self {
        Self { data, pool }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.pool.release(self.data.len());
    }
}

impl std::fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("size_bytes", &self.data.len())
            .finish()
    }
}
