// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for operator definitions.

use index_expr::OperandId;

/// Errors raised while validating an operator or matching operands to it.
#[derive(Debug, thiserror::Error)]
pub enum OpError {
    /// The operator's attributes or operand list are malformed.
    #[error("invalid operator '{op}': {detail}")]
    InvalidOperator { op: String, detail: String },

    /// A kind name did not match any registered operator.
    #[error("unknown operator kind: {0}")]
    UnknownKind(String),

    /// The caller supplied the wrong number of operand descriptors.
    #[error("operator '{op}' expects {expected} operands, got {actual}")]
    OperandCount {
        op: String,
        expected: usize,
        actual: usize,
    },

    /// A supplied descriptor does not conform to its declared type.
    #[error("operand {operand} does not match {expected}: {detail}")]
    OperandMismatch {
        operand: OperandId,
        expected: String,
        detail: String,
    },

    #[error(transparent)]
    Tensor(#[from] tensor_core::TensorError),
}
