// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Checks deferred until run-time values are bound.
//!
//! A resolver records a [`Constraint`] whenever a condition involves a
//! non-literal expression. Conditions over literals are decided on the
//! spot and never recorded.

use crate::ShapeInferenceError;
use index_expr::{Bindings, IndexExpr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Equal, or one side is 1.
    Broadcast {
        dim: usize,
        lhs: IndexExpr,
        rhs: IndexExpr,
    },
    /// Contracted extents are equal.
    Contraction { lhs: IndexExpr, rhs: IndexExpr },
    /// `0 <= k < dim`.
    KBound { k: IndexExpr, dim: IndexExpr },
    NonZeroStep { axis: usize, step: IndexExpr },
    NonNegativeDim {
        op: &'static str,
        dim: usize,
        value: IndexExpr,
    },
}

impl Constraint {
    pub fn check(&self, env: &Bindings) -> Result<(), ShapeInferenceError> {
        match self {
            Constraint::Broadcast { dim, lhs, rhs } => {
                let (l, r) = (lhs.evaluate(env)?, rhs.evaluate(env)?);
                if l == r || l == 1 || r == 1 {
                    Ok(())
                } else {
                    Err(ShapeInferenceError::BroadcastMismatch {
                        dim: *dim,
                        lhs: l,
                        rhs: r,
                    })
                }
            }
            Constraint::Contraction { lhs, rhs } => {
                let (l, r) = (lhs.evaluate(env)?, rhs.evaluate(env)?);
                if l == r {
                    Ok(())
                } else {
                    Err(ShapeInferenceError::ContractionMismatch { lhs: l, rhs: r })
                }
            }
            Constraint::KBound { k, dim } => check_k(k.evaluate(env)?, dim.evaluate(env)?),
            Constraint::NonZeroStep { axis, step } => {
                if step.evaluate(env)? == 0 {
                    Err(ShapeInferenceError::ZeroStep { axis: *axis })
                } else {
                    Ok(())
                }
            }
            Constraint::NonNegativeDim { op, dim, value } => {
                let v = value.evaluate(env)?;
                if v < 0 {
                    Err(ShapeInferenceError::NegativeDimension {
                        op: *op,
                        dim: *dim,
                        value: v,
                    })
                } else {
                    Ok(())
                }
            }
        }
    }
}

pub(crate) fn check_k(k: i64, dim: i64) -> Result<(), ShapeInferenceError> {
    if k < 0 {
        return Err(ShapeInferenceError::NegativeK { k });
    }
    if k >= dim {
        return Err(ShapeInferenceError::KOutOfBound { k, dim });
    }
    Ok(())
}
