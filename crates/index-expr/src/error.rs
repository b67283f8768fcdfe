// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for index-expression evaluation.

use crate::OperandId;

/// Errors raised when an expression is evaluated against [`Bindings`](crate::Bindings).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexExprError {
    #[error("symbol '{0}' is not bound")]
    UnboundSymbol(String),

    #[error("dimension {dim} of operand {operand} is not bound")]
    UnboundDim { operand: OperandId, dim: usize },

    #[error("value {index} of operand {operand} is not bound")]
    UnboundLoad { operand: OperandId, index: usize },

    #[error("division by zero in {expr}")]
    DivisionByZero { expr: String },

    /// An extent evaluated below zero.
    #[error("{expr} evaluated to negative extent {value}")]
    NegativeExtent { expr: String, value: i64 },
}
