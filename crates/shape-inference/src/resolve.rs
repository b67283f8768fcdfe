// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Resolver dispatch and the resolved output shapes.

use crate::{
    constant_of_shape, matmul, reduce, slice, topk, ConstantOfShapeShape, Constraint,
    MatMulShape, ReduceShape, ShapeInferenceError, SliceShape, TopKShape,
};
use index_expr::{Bindings, IndexExpr};
use op_ir::{OpDef, Operator, Validated};
use std::fmt;
use std::sync::Arc;

/// Output shapes of one operator, one expression per dimension.
///
/// Outputs of identical shape share one allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedShape {
    outputs: Vec<Arc<[IndexExpr]>>,
}

impl ResolvedShape {
    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn output(&self, index: usize) -> &[IndexExpr] {
        &self.outputs[index]
    }

    pub fn outputs(&self) -> &[Arc<[IndexExpr]>] {
        &self.outputs
    }

    /// Whether two outputs share the same dimension storage.
    pub fn shares_dims(&self, a: usize, b: usize) -> bool {
        Arc::ptr_eq(&self.outputs[a], &self.outputs[b])
    }

    /// Every dimension of every output is literal.
    pub fn is_literal(&self) -> bool {
        self.outputs.iter().all(|o| o.iter().all(IndexExpr::is_literal))
    }

    /// Concrete sizes of output `index`, if all its dimensions are literal
    /// and non-negative.
    pub fn literal_sizes(&self, index: usize) -> Option<Vec<usize>> {
        self.outputs[index]
            .iter()
            .map(|d| d.as_literal().and_then(|v| usize::try_from(v).ok()))
            .collect()
    }

    /// Concrete sizes of output `index` under `env`.
    pub fn evaluate(&self, index: usize, env: &Bindings) -> Result<Vec<usize>, ShapeInferenceError> {
        self.outputs[index]
            .iter()
            .map(|d| d.evaluate_extent(env).map_err(ShapeInferenceError::from))
            .collect()
    }
}

impl fmt::Display for ResolvedShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, output) in self.outputs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "(")?;
            for (j, d) in output.iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{d}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Per-kind resolution details consumed by lowering.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedOp {
    MatMul(MatMulShape),
    TopK(TopKShape),
    Slice(SliceShape),
    Reduce(ReduceShape),
    ConstantOfShape(ConstantOfShapeShape),
}

/// The result of resolving one operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    op: ResolvedOp,
    shape: ResolvedShape,
    constraints: Vec<Constraint>,
}

impl Resolution {
    pub fn op(&self) -> &ResolvedOp {
        &self.op
    }

    pub fn shape(&self) -> &ResolvedShape {
        &self.shape
    }

    /// Conditions left open because they involve run-time values.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Checks every deferred condition under `env`.
    pub fn verify(&self, env: &Bindings) -> Result<(), ShapeInferenceError> {
        self.constraints.iter().try_for_each(|c| c.check(env))
    }
}

/// Resolves the output shape of a validated operator.
pub fn resolve(def: &OpDef<Validated>) -> Result<Resolution, ShapeInferenceError> {
    let mut constraints = Vec::new();

    let (op, outputs) = match &def.operator {
        Operator::MatMul => {
            let s = matmul::resolve(def, &mut constraints)?;
            let out = vec![Arc::clone(s.output())];
            (ResolvedOp::MatMul(s), out)
        }
        Operator::TopK { .. } => {
            let s = topk::resolve(def, &mut constraints)?;
            // Values and indices share one shape.
            let out = vec![Arc::clone(s.output()), Arc::clone(s.output())];
            (ResolvedOp::TopK(s), out)
        }
        Operator::Slice { .. } => {
            let s = slice::resolve(def, &mut constraints)?;
            let out = vec![Arc::clone(s.output())];
            (ResolvedOp::Slice(s), out)
        }
        Operator::Reduce { .. } => {
            let s = reduce::resolve(def)?;
            let out = vec![Arc::clone(s.output())];
            (ResolvedOp::Reduce(s), out)
        }
        Operator::ConstantOfShape { .. } => {
            let s = constant_of_shape::resolve(def, &mut constraints)?;
            let out = vec![Arc::clone(s.output())];
            (ResolvedOp::ConstantOfShape(s), out)
        }
    };

    let shape = ResolvedShape { outputs };
    tracing::debug!(
        "resolved '{}' ({}): {} with {} deferred check(s)",
        def.name,
        def.kind(),
        shape,
        constraints.len()
    );

    Ok(Resolution {
        op,
        shape,
        constraints,
    })
}
