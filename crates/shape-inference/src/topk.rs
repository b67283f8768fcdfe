// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Top-k selection along one axis.

use crate::constraint::check_k;
use crate::{Constraint, DimsCapture, ShapeInferenceError, ValueCapture};
use index_expr::IndexExpr;
use op_ir::{OpDef, Operator, Validated};
use std::sync::Arc;

/// Resolved top-k: the normalized axis, the count, and the single shape
/// shared by the values and indices outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopKShape {
    axis: usize,
    k: IndexExpr,
    input: Vec<IndexExpr>,
    output: Arc<[IndexExpr]>,
    largest: bool,
    sorted: bool,
}

impl TopKShape {
    pub fn axis(&self) -> usize {
        self.axis
    }

    pub fn k(&self) -> &IndexExpr {
        &self.k
    }

    /// Extent of the input along the selection axis.
    pub fn axis_dim(&self) -> &IndexExpr {
        &self.input[self.axis]
    }

    pub fn input(&self) -> &[IndexExpr] {
        &self.input
    }

    pub fn output(&self) -> &Arc<[IndexExpr]> {
        &self.output
    }

    pub fn largest(&self) -> bool {
        self.largest
    }

    pub fn sorted(&self) -> bool {
        self.sorted
    }
}

/// Maps a possibly negative axis into `0..rank`.
pub(crate) fn normalize_axis(
    op: &'static str,
    axis: i64,
    rank: usize,
) -> Result<usize, ShapeInferenceError> {
    let r = rank as i64;
    let normalized = if axis < 0 { axis + r } else { axis };
    if (0..r).contains(&normalized) {
        Ok(normalized as usize)
    } else {
        Err(ShapeInferenceError::AxisOutOfRange { op, axis, rank })
    }
}

pub(crate) fn resolve(
    def: &OpDef<Validated>,
    constraints: &mut Vec<Constraint>,
) -> Result<TopKShape, ShapeInferenceError> {
    let Operator::TopK {
        axis,
        k,
        largest,
        sorted,
    } = &def.operator
    else {
        unreachable!("top-k resolver called for {}", def.kind())
    };

    let input = DimsCapture::of(def, 0).into_dims();
    let axis = normalize_axis("top_k", *axis, input.len())?;

    let k_capture = ValueCapture::new(def, k);
    let k = k_capture
        .scalar()
        .cloned()
        .ok_or_else(|| ShapeInferenceError::InvalidOperand {
            op: "top_k",
            detail: format!("K must hold exactly one value, got {}", k_capture.len()),
        })?;

    let dim = &input[axis];
    match (k.as_literal(), dim.as_literal()) {
        (Some(k), Some(d)) => check_k(k, d)?,
        (Some(k), None) if k < 0 => return Err(ShapeInferenceError::NegativeK { k }),
        _ => constraints.push(Constraint::KBound {
            k: k.clone(),
            dim: dim.clone(),
        }),
    }

    let mut output = input.clone();
    output[axis] = k.clone();

    Ok(TopKShape {
        axis,
        k,
        input,
        output: output.into(),
        largest: *largest,
        sorted: *sorted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_expr::OperandId;
    use op_ir::{Dim, TensorType, ValueOperand};
    use tensor_core::DType;

    fn topk(
        axis: i64,
        k: ValueOperand,
        operands: Vec<TensorType>,
    ) -> Result<(TopKShape, Vec<Constraint>), ShapeInferenceError> {
        let def = OpDef::new(
            "topk",
            Operator::TopK {
                axis,
                k,
                largest: true,
                sorted: true,
            },
            operands,
        )
        .validate()
        .unwrap();
        let mut constraints = Vec::new();
        let shape = resolve(&def, &mut constraints)?;
        Ok((shape, constraints))
    }

    fn x(sizes: &[usize]) -> TensorType {
        TensorType::of_static(DType::F32, sizes)
    }

    #[test]
    fn test_literal_k() {
        let (s, c) = topk(1, ValueOperand::Constant(vec![2]), vec![x(&[3, 6])]).unwrap();
        let dims: Vec<i64> = s.output().iter().map(|d| d.literal()).collect();
        assert_eq!(dims, vec![3, 2]);
        assert_eq!(s.axis(), 1);
        assert!(c.is_empty());
    }

    #[test]
    fn test_negative_axis() {
        let (s, _) = topk(-1, ValueOperand::Constant(vec![2]), vec![x(&[3, 6])]).unwrap();
        assert_eq!(s.axis(), 1);
        assert!(matches!(
            topk(-3, ValueOperand::Constant(vec![2]), vec![x(&[3, 6])]),
            Err(ShapeInferenceError::AxisOutOfRange { axis: -3, rank: 2, .. })
        ));
        assert!(topk(2, ValueOperand::Constant(vec![2]), vec![x(&[3, 6])]).is_err());
    }

    #[test]
    fn test_k_out_of_bound() {
        let err = topk(1, ValueOperand::Constant(vec![6]), vec![x(&[3, 6])]).unwrap_err();
        assert_eq!(err, ShapeInferenceError::KOutOfBound { k: 6, dim: 6 });
        assert!(err.to_string().starts_with("K out of bound"));
    }

    #[test]
    fn test_k_must_be_scalar() {
        assert!(matches!(
            topk(1, ValueOperand::Constant(vec![1, 2]), vec![x(&[3, 6])]),
            Err(ShapeInferenceError::InvalidOperand { .. })
        ));
    }

    #[test]
    fn test_runtime_k_defers_bound_check() {
        let (s, c) = topk(
            1,
            ValueOperand::Runtime(OperandId(1)),
            vec![x(&[3, 6]), TensorType::of_static(DType::I64, &[1])],
        )
        .unwrap();
        assert_eq!(s.output()[1], IndexExpr::load(OperandId(1), 0));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_dynamic_axis_dim_defers_bound_check() {
        let (s, c) = topk(
            0,
            ValueOperand::Constant(vec![4]),
            vec![TensorType::new(DType::F32, vec![Dim::Dynamic, Dim::Static(2)])],
        )
        .unwrap();
        assert_eq!(s.output()[0].as_literal(), Some(4));
        assert_eq!(
            c,
            vec![Constraint::KBound {
                k: IndexExpr::lit(4),
                dim: IndexExpr::dim(OperandId(0), 0),
            }]
        );
    }
}
