// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # shape-inference
//!
//! Resolves the output shape of a validated operator as one
//! [`IndexExpr`](index_expr::IndexExpr) per output dimension, without
//! touching any buffer.
//!
//! # Key Components
//!
//! - [`resolve`]: the single entry point, dispatching on the operator
//!   variant to one resolver per kind.
//! - [`Resolution`]: the per-kind details the lowering stage needs
//!   ([`ResolvedOp`]), the [`ResolvedShape`] itself, and the
//!   [`Constraint`]s that could not be decided while lowering and must be
//!   checked once run-time values are bound.
//! - [`PaddedShape`] / [`broadcast_dim`]: the shared broadcast utility:
//!   left-padding with virtual size-1 dimensions and per-dimension
//!   compatibility.
//! - [`DimsCapture`] / [`ValueCapture`]: turn operand types and shape
//!   operands into expressions (literal when known, placeholders otherwise).
//!
//! Every inconsistency detectable from literal values fails here with a
//! [`ShapeInferenceError`], before any loop is generated.
//!
//! # Example
//! ```
//! use op_ir::{OpDef, Operator, TensorType};
//! use tensor_core::DType;
//!
//! let def = OpDef::new(
//!     "mm",
//!     Operator::MatMul,
//!     vec![
//!         TensorType::of_static(DType::F32, &[5]),
//!         TensorType::of_static(DType::F32, &[10, 5, 4]),
//!     ],
//! )
//! .validate()
//! .unwrap();
//!
//! let resolution = shape_inference::resolve(&def).unwrap();
//! assert_eq!(resolution.shape().literal_sizes(0), Some(vec![10, 4]));
//! ```

mod broadcast;
mod capture;
mod constant_of_shape;
mod constraint;
mod error;
mod matmul;
mod reduce;
mod resolve;
mod slice;
mod topk;

pub use broadcast::{broadcast_dim, pad_to_common_rank, PaddedShape};
pub use capture::{DimsCapture, ValueCapture};
pub use constant_of_shape::ConstantOfShapeShape;
pub use constraint::Constraint;
pub use error::ShapeInferenceError;
pub use matmul::MatMulShape;
pub use reduce::ReduceShape;
pub use resolve::{resolve, Resolution, ResolvedOp, ResolvedShape};
pub use slice::SliceShape;
pub use topk::TopKShape;
