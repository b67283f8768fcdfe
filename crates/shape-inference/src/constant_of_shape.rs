// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A tensor of a given shape filled with one value.

use crate::{Constraint, ShapeInferenceError, ValueCapture};
use index_expr::IndexExpr;
use op_ir::{OpDef, Operator, Validated};
use std::sync::Arc;
use tensor_core::DType;

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantOfShapeShape {
    value: f64,
    dtype: DType,
    output: Arc<[IndexExpr]>,
}

impl ConstantOfShapeShape {
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn output(&self) -> &Arc<[IndexExpr]> {
        &self.output
    }
}

pub(crate) fn resolve(
    def: &OpDef<Validated>,
    constraints: &mut Vec<Constraint>,
) -> Result<ConstantOfShapeShape, ShapeInferenceError> {
    let Operator::ConstantOfShape {
        shape,
        value,
        dtype,
    } = &def.operator
    else {
        unreachable!("constant-of-shape resolver called for {}", def.kind())
    };

    let dims = ValueCapture::new(def, shape);
    for (dim, size) in dims.values().iter().enumerate() {
        match size.as_literal() {
            Some(v) if v < 0 => {
                return Err(ShapeInferenceError::NegativeDimension {
                    op: "constant_of_shape",
                    dim,
                    value: v,
                })
            }
            Some(_) => {}
            None => constraints.push(Constraint::NonNegativeDim {
                op: "constant_of_shape",
                dim,
                value: size.clone(),
            }),
        }
    }

    Ok(ConstantOfShapeShape {
        value: *value,
        dtype: *dtype,
        output: dims.values().into(),
    })
}
