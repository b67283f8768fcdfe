// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for shape inference.

use index_expr::IndexExprError;

/// A static or run-time inconsistency between an operator and its operands.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeInferenceError {
    #[error("{op}: axis {axis} is out of range for rank {rank}")]
    AxisOutOfRange {
        op: &'static str,
        axis: i64,
        rank: usize,
    },

    #[error("{op}: axis {axis} is listed more than once")]
    DuplicateAxis { op: &'static str, axis: usize },

    /// Two batch dimensions differ and neither is 1.
    #[error("broadcast mismatch at dimension {dim}: {lhs} vs {rhs}")]
    BroadcastMismatch { dim: usize, lhs: i64, rhs: i64 },

    /// The contracted dimensions of a matrix product differ.
    #[error("contraction mismatch: left operand has {lhs} columns, right operand has {rhs} rows")]
    ContractionMismatch { lhs: i64, rhs: i64 },

    #[error("K out of bound: K = {k} must be less than the axis dimension {dim}")]
    KOutOfBound { k: i64, dim: i64 },

    #[error("K must be non-negative, got {k}")]
    NegativeK { k: i64 },

    #[error("slice step on axis {axis} is zero")]
    ZeroStep { axis: usize },

    #[error("{op}: dimension {dim} has negative size {value}")]
    NegativeDimension {
        op: &'static str,
        dim: usize,
        value: i64,
    },

    /// A shape operand has the wrong length or form.
    #[error("{op}: {detail}")]
    InvalidOperand { op: &'static str, detail: String },

    /// A run-time check could not be evaluated.
    #[error(transparent)]
    Unresolved(#[from] IndexExprError),
}
