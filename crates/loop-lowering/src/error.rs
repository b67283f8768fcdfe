// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for lowering.

use index_expr::IndexExprError;
use op_ir::OpError;
use shape_inference::ShapeInferenceError;
use tensor_core::{DType, TensorError};

/// Errors that can occur while planning or executing a loop nest.
///
/// Every variant is raised before the output buffer is allocated, except
/// [`Tensor`](Self::Tensor) carrying an allocation failure, which is the
/// allocation itself failing.
#[derive(Debug, thiserror::Error)]
pub enum LoweringError {
    #[error(transparent)]
    Shape(#[from] ShapeInferenceError),

    #[error(transparent)]
    Op(#[from] OpError),

    #[error(transparent)]
    Tensor(#[from] TensorError),

    #[error(transparent)]
    Index(#[from] IndexExprError),

    /// A generated plan failed its structural checks.
    #[error("invalid iteration plan for '{op}': {detail}")]
    InvalidPlan { op: String, detail: String },

    /// A shape operand holds a value that is not a valid index.
    #[error("operand {operand} value {value} does not fit an index")]
    ValueOutOfRange { operand: usize, value: u64 },

    #[error("operator '{op}' does not support element kind {dtype}")]
    UnsupportedDType { op: String, dtype: DType },
}
