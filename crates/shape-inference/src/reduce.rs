// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reductions over a set of axes.

use crate::topk::normalize_axis;
use crate::{DimsCapture, ShapeInferenceError};
use index_expr::IndexExpr;
use op_ir::{OpDef, Operator, ReduceKind, Validated};
use std::sync::Arc;

/// Resolved reduction.
///
/// `output_axes[j]` is the input axis that output dimension `j` iterates,
/// or `None` for a reduced axis kept as size 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReduceShape {
    kind: ReduceKind,
    input: Vec<IndexExpr>,
    axes: Vec<usize>,
    output_axes: Vec<Option<usize>>,
    output: Arc<[IndexExpr]>,
}

impl ReduceShape {
    pub fn kind(&self) -> ReduceKind {
        self.kind
    }

    /// Reduced input axes, ascending.
    pub fn axes(&self) -> &[usize] {
        &self.axes
    }

    pub fn is_reduced(&self, axis: usize) -> bool {
        self.axes.binary_search(&axis).is_ok()
    }

    pub fn input(&self) -> &[IndexExpr] {
        &self.input
    }

    pub fn output_axes(&self) -> &[Option<usize>] {
        &self.output_axes
    }

    pub fn output(&self) -> &Arc<[IndexExpr]> {
        &self.output
    }

    /// Number of input elements folded into each output element.
    pub fn reduced_count(&self) -> IndexExpr {
        self.axes
            .iter()
            .fold(IndexExpr::lit(1), |acc, &a| acc * self.input[a].clone())
    }
}

pub(crate) fn resolve(def: &OpDef<Validated>) -> Result<ReduceShape, ShapeInferenceError> {
    let Operator::Reduce {
        kind,
        axes,
        keepdims,
        noop_with_empty_axes,
    } = &def.operator
    else {
        unreachable!("reduce resolver called for {}", def.kind())
    };

    let input = DimsCapture::of(def, 0).into_dims();
    let rank = input.len();
    let op = def.kind().as_str();

    let mut reduced = match axes.as_deref() {
        Some(list) if !list.is_empty() => {
            let mut normalized = Vec::with_capacity(list.len());
            for &a in list {
                let axis = normalize_axis(op, a, rank)?;
                if !normalized.contains(&axis) {
                    normalized.push(axis);
                }
            }
            normalized
        }
        _ if *noop_with_empty_axes => Vec::new(),
        _ => (0..rank).collect(),
    };
    reduced.sort_unstable();

    let mut output = Vec::with_capacity(rank);
    let mut output_axes = Vec::with_capacity(rank);
    for (i, d) in input.iter().enumerate() {
        if reduced.binary_search(&i).is_ok() {
            if *keepdims {
                output.push(IndexExpr::lit(1));
                output_axes.push(None);
            }
        } else {
            output.push(d.clone());
            output_axes.push(Some(i));
        }
    }

    Ok(ReduceShape {
        kind: *kind,
        input,
        axes: reduced,
        output_axes,
        output: output.into(),
    })
}
