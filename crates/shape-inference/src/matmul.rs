// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Matrix product with numpy broadcasting.
//!
//! A 1-D left operand `(K)` is treated as `(1, K)` and a 1-D right operand
//! `(K)` as `(K, 1)`; the synthesized dimension is padded and dropped from
//! the output. Batch dimensions are left-padded to a common rank and
//! broadcast. Example: `(5) x (10, 5, 4)` pads to `(1, 1, 5) x (10, 5, 4)`
//! and resolves to `(10, 4)`.

use crate::broadcast::{broadcast_dim, pad_to_common_rank, PaddedShape};
use crate::{Constraint, DimsCapture, ShapeInferenceError};
use index_expr::IndexExpr;
use op_ir::{OpDef, Validated};
use std::sync::Arc;

/// Resolved matrix product: both padded operand shapes and the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatMulShape {
    a: PaddedShape,
    b: PaddedShape,
    contraction: IndexExpr,
    output: Arc<[IndexExpr]>,
}

impl MatMulShape {
    /// The left operand padded to the common rank.
    pub fn a(&self) -> &PaddedShape {
        &self.a
    }

    /// The right operand padded to the common rank.
    pub fn b(&self) -> &PaddedShape {
        &self.b
    }

    /// The common padded rank of both operands.
    pub fn rank(&self) -> usize {
        self.a.rank()
    }

    pub fn output_rank(&self) -> usize {
        self.output.len()
    }

    /// Extent of the contracted dimension (the left operand's last).
    pub fn contraction(&self) -> &IndexExpr {
        &self.contraction
    }

    pub fn output(&self) -> &Arc<[IndexExpr]> {
        &self.output
    }

    /// Both operands are plain matrices: no padding, no batch dimensions.
    pub fn is_plain_2d(&self) -> bool {
        self.rank() == 2 && self.a.real_rank() == 2 && self.b.real_rank() == 2
    }
}

pub(crate) fn resolve(
    def: &OpDef<Validated>,
    constraints: &mut Vec<Constraint>,
) -> Result<MatMulShape, ShapeInferenceError> {
    let a_dims = DimsCapture::of(def, 0);
    let b_dims = DimsCapture::of(def, 1);
    let (a_vector, b_vector) = (a_dims.rank() == 1, b_dims.rank() == 1);

    let a = PaddedShape::new(a_dims.into_dims());
    let a = if a_vector { a.pad_leading(2) } else { a };
    let b = PaddedShape::new(b_dims.into_dims());
    let b = if b_vector { b.pad_trailing() } else { b };
    let (a, b) = pad_to_common_rank(a, b);
    let rank = a.rank();

    let contraction = a.dim(rank - 1).clone();
    let b_rows = b.dim(rank - 2);
    match (contraction.as_literal(), b_rows.as_literal()) {
        (Some(l), Some(r)) if l != r => {
            return Err(ShapeInferenceError::ContractionMismatch { lhs: l, rhs: r })
        }
        _ if contraction == *b_rows => {}
        (Some(_), Some(_)) => {}
        _ => constraints.push(Constraint::Contraction {
            lhs: contraction.clone(),
            rhs: b_rows.clone(),
        }),
    }

    let mut output = Vec::with_capacity(rank);
    for i in 0..rank - 2 {
        output.push(broadcast_dim(i, a.dim(i), b.dim(i), constraints)?);
    }
    if !a_vector {
        output.push(a.dim(rank - 2).clone());
    }
    if !b_vector {
        output.push(b.dim(rank - 1).clone());
    }

    Ok(MatMulShape {
        a,
        b,
        contraction,
        output: output.into(),
    })
}
