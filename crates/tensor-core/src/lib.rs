// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! The runtime tensor descriptor every lowering reads and writes.
//!
//! This crate provides:
//! - [`TensorDescriptor`]: element kind, sizes, strides (in elements),
//!   offset, optional name and an explicit [`Storage`] ownership state over
//!   a flat byte buffer.
//! - [`Shape`] and [`compute_strides_from_sizes`]: row-major layout
//!   derivation, re-runnable at any time.
//! - [`DType`] and [`Element`]: run-time element kinds and the Rust types
//!   behind them, bridged by [`with_element!`].
//! - [`approximately_equal`]: tolerance comparison for verification.
//! - [`TensorList`]: descriptors addressable by position or name.
//!
//! # Design Goals
//! - Buffers are allocated through `memory_manager`, so every allocation is
//!   budgeted and fallible.
//! - Typed access goes through `bytemuck`; no `unsafe` casts.
//! - Clean error types via `thiserror`.

mod compare;
mod descriptor;
mod dtype;
mod error;
mod list;
mod shape;

pub use compare::approximately_equal;
pub use descriptor::{ElementReader, ElementWriter, Ownership, Storage, TensorDescriptor};
pub use dtype::{DType, Element};
pub use error::TensorError;
pub use list::TensorList;
pub use shape::{compute_strides_from_sizes, RowMajorIndices, Shape};

#[doc(hidden)]
pub use half;
