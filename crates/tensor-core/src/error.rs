// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor descriptors.

use crate::{DType, Shape};
use memory_manager::AllocationError;

/// Errors that can occur while creating or accessing a descriptor.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// A caller-supplied buffer or value slice has the wrong size.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Element counts or shapes are incompatible for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// The rank of a descriptor is fixed at construction.
    #[error("rank mismatch: descriptor has rank {expected}, got {actual}")]
    RankMismatch { expected: usize, actual: usize },

    /// An access index lies outside its dimension.
    #[error("index {index} out of bounds for dimension {dim} of size {size}")]
    IndexOutOfBounds {
        dim: usize,
        index: usize,
        size: usize,
    },

    /// The element kind is not supported by the operation.
    #[error("unsupported dtype {dtype} for operation {op}")]
    UnsupportedDType { op: &'static str, dtype: DType },

    /// A typed access used a Rust type that does not match the element kind.
    #[error("dtype mismatch: descriptor holds {actual}, accessed as {expected}")]
    DTypeMismatch { expected: DType, actual: DType },

    /// The descriptor has no buffer.
    #[error("descriptor has no bound buffer")]
    Unbound,

    /// `bind` was called on a descriptor that already has a buffer.
    #[error("descriptor is already bound to a buffer")]
    AlreadyBound,

    /// A write was attempted through a read-only borrow.
    #[error("descriptor borrows its buffer read-only")]
    ReadOnly,

    /// The operation requires a row-major contiguous layout.
    #[error("{op} requires a contiguous descriptor")]
    NonContiguous { op: &'static str },

    /// Sizes, strides and offset address past `usize::MAX`.
    #[error("layout overflows: sizes {sizes:?}, strides {strides:?}, offset {offset}")]
    LayoutOverflow {
        sizes: Vec<usize>,
        strides: Vec<usize>,
        offset: usize,
    },

    /// An argument is numerically invalid.
    #[error("numeric error in {op}: {detail}")]
    Numeric { op: &'static str, detail: String },

    #[error(transparent)]
    Allocation(#[from] AllocationError),
}
