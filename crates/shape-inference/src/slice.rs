// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Strided range slicing.
//!
//! For each sliced axis with extent `d`, negative starts and ends count
//! from the end (`+ d`), then both are clamped: into `[0, d]` for a
//! positive step, or start into `[0, d - 1]` and end into `[-1, d - 1]`
//! for a negative one. The output extent is
//! `max(0, ceil((end - start) / step))` and output index `i` reads source
//! index `step * i + start`.

use crate::topk::normalize_axis;
use crate::{Constraint, DimsCapture, ShapeInferenceError, ValueCapture};
use index_expr::IndexExpr;
use op_ir::{OpDef, Operator, Validated};
use std::sync::Arc;

/// Resolved slice: effective start and step per input axis, and the output.
///
/// Axes that are not sliced have start 0 and step 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceShape {
    starts: Vec<IndexExpr>,
    steps: Vec<IndexExpr>,
    output: Arc<[IndexExpr]>,
}

impl SliceShape {
    pub fn rank(&self) -> usize {
        self.output.len()
    }

    pub fn start(&self, axis: usize) -> &IndexExpr {
        &self.starts[axis]
    }

    pub fn step(&self, axis: usize) -> &IndexExpr {
        &self.steps[axis]
    }

    pub fn output(&self) -> &Arc<[IndexExpr]> {
        &self.output
    }

    /// Source index read for output index `i` along `axis`.
    pub fn load_index(&self, axis: usize, i: IndexExpr) -> IndexExpr {
        self.steps[axis].clone() * i + self.starts[axis].clone()
    }
}

fn from_end(v: IndexExpr, d: &IndexExpr) -> IndexExpr {
    IndexExpr::select(v.clone().lt(0), v.clone() + d.clone(), v)
}

pub(crate) fn resolve(
    def: &OpDef<Validated>,
    constraints: &mut Vec<Constraint>,
) -> Result<SliceShape, ShapeInferenceError> {
    let Operator::Slice {
        starts,
        ends,
        axes,
        steps,
    } = &def.operator
    else {
        unreachable!("slice resolver called for {}", def.kind())
    };

    let input = DimsCapture::of(def, 0).into_dims();
    let rank = input.len();
    let starts = ValueCapture::new(def, starts);
    let ends = ValueCapture::new(def, ends);
    let steps = steps.as_ref().map(|s| ValueCapture::new(def, s));

    let axes: Vec<usize> = match axes {
        None => (0..starts.len())
            .map(|a| normalize_axis("slice", a as i64, rank))
            .collect::<Result<_, _>>()?,
        Some(axes) => {
            let literal = ValueCapture::new(def, axes).as_literals().ok_or_else(|| {
                ShapeInferenceError::InvalidOperand {
                    op: "slice",
                    detail: "axes must be known while lowering".into(),
                }
            })?;
            let mut normalized = Vec::with_capacity(literal.len());
            for a in literal {
                let axis = normalize_axis("slice", a, rank)?;
                if normalized.contains(&axis) {
                    return Err(ShapeInferenceError::DuplicateAxis { op: "slice", axis });
                }
                normalized.push(axis);
            }
            normalized
        }
    };

    let mut out_starts = vec![IndexExpr::lit(0); rank];
    let mut out_steps = vec![IndexExpr::lit(1); rank];
    let mut output = input.clone();

    for (j, &axis) in axes.iter().enumerate() {
        let d = &input[axis];
        let step = steps
            .as_ref()
            .map_or(IndexExpr::lit(1), |s| s.values()[j].clone());
        match step.as_literal() {
            Some(0) => return Err(ShapeInferenceError::ZeroStep { axis }),
            Some(_) => {}
            None => constraints.push(Constraint::NonZeroStep {
                axis,
                step: step.clone(),
            }),
        }

        let start = from_end(starts.values()[j].clone(), d);
        let end = from_end(ends.values()[j].clone(), d);
        let last = d.clone() - 1;
        let forward = || (start.clone().clamp(0, d.clone()), end.clone().clamp(0, d.clone()));
        let backward = || {
            (
                start.clone().clamp(0, last.clone()),
                end.clone().clamp(-1, last.clone()),
            )
        };
        let (start, end) = match step.as_literal() {
            Some(t) if t > 0 => forward(),
            Some(_) => backward(),
            None => {
                let ((fs, fe), (bs, be)) = (forward(), backward());
                let positive = step.clone().gt(0);
                (
                    IndexExpr::select(positive.clone(), fs, bs),
                    IndexExpr::select(positive, fe, be),
                )
            }
        };

        output[axis] = (end - start.clone()).ceil_div(step.clone()).max(0);
        out_starts[axis] = start;
        out_steps[axis] = step;
    }

    Ok(SliceShape {
        starts: out_starts,
        steps: out_steps,
        output: output.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_expr::{Bindings, OperandId};
    use op_ir::{Dim, TensorType, ValueOperand};
    use tensor_core::DType;

    fn constant(v: &[i64]) -> ValueOperand {
        ValueOperand::Constant(v.to_vec())
    }

    fn slice(
        x: TensorType,
        starts: ValueOperand,
        ends: ValueOperand,
        axes: Option<ValueOperand>,
        steps: Option<ValueOperand>,
        extra: Vec<TensorType>,
    ) -> Result<(SliceShape, Vec<Constraint>), ShapeInferenceError> {
        let mut operands = vec![x];
        operands.extend(extra);
        let def = OpDef::new(
            "slice",
            Operator::Slice {
                starts,
                ends,
                axes,
                steps,
            },
            operands,
        )
        .validate()
        .unwrap();
        let mut constraints = Vec::new();
        let shape = resolve(&def, &mut constraints)?;
        Ok((shape, constraints))
    }

    fn static_slice(
        sizes: &[usize],
        starts: &[i64],
        ends: &[i64],
        axes: Option<&[i64]>,
        steps: Option<&[i64]>,
    ) -> Result<SliceShape, ShapeInferenceError> {
        slice(
            TensorType::of_static(DType::F32, sizes),
            constant(starts),
            constant(ends),
            axes.map(constant),
            steps.map(constant),
            vec![],
        )
        .map(|(s, _)| s)
    }

    fn sizes(s: &SliceShape) -> Vec<i64> {
        s.output().iter().map(|d| d.literal()).collect()
    }

    #[test]
    fn test_start_two_step_three() {
        let s = static_slice(&[10], &[2], &[10], None, Some(&[3])).unwrap();
        assert_eq!(sizes(&s), vec![3]);
        let reads: Vec<i64> = (0..3)
            .map(|i| s.load_index(0, IndexExpr::lit(i)).literal())
            .collect();
        assert_eq!(reads, vec![2, 5, 8]);
    }

    #[test]
    fn test_negative_bounds_and_clamping() {
        let s = static_slice(&[10], &[-3], &[i64::MAX], None, None).unwrap();
        assert_eq!(sizes(&s), vec![3]);
        assert_eq!(s.start(0).literal(), 7);

        let s = static_slice(&[10], &[-100], &[4], None, None).unwrap();
        assert_eq!(sizes(&s), vec![4]);
        assert_eq!(s.start(0).literal(), 0);
    }

    #[test]
    fn test_negative_step() {
        let s = static_slice(&[10], &[8], &[2], None, Some(&[-3])).unwrap();
        assert_eq!(sizes(&s), vec![2]);
        let reads: Vec<i64> = (0..2)
            .map(|i| s.load_index(0, IndexExpr::lit(i)).literal())
            .collect();
        assert_eq!(reads, vec![8, 5]);

        // Reverse the whole axis.
        let s = static_slice(&[4], &[-1], &[i64::MIN], None, Some(&[-1])).unwrap();
        assert_eq!(sizes(&s), vec![4]);
        assert_eq!(s.start(0).literal(), 3);
    }

    #[test]
    fn test_empty_result() {
        let s = static_slice(&[10], &[5], &[2], None, None).unwrap();
        assert_eq!(sizes(&s), vec![0]);
    }

    #[test]
    fn test_axes_select_dimensions() {
        let s = static_slice(&[4, 6, 8], &[1], &[5], Some(&[-2]), Some(&[2])).unwrap();
        assert_eq!(sizes(&s), vec![4, 2, 8]);
        assert_eq!(s.step(0).literal(), 1);
        assert_eq!(s.step(1).literal(), 2);
    }

    #[test]
    fn test_invalid_axes_and_steps() {
        assert_eq!(
            static_slice(&[4], &[0], &[4], None, Some(&[0])).unwrap_err(),
            ShapeInferenceError::ZeroStep { axis: 0 }
        );
        assert!(matches!(
            static_slice(&[4, 4], &[0, 0], &[1, 1], Some(&[1, -1]), None),
            Err(ShapeInferenceError::DuplicateAxis { axis: 1, .. })
        ));
        assert!(matches!(
            static_slice(&[4], &[0], &[1], Some(&[1]), None),
            Err(ShapeInferenceError::AxisOutOfRange { .. })
        ));
    }

    #[test]
    fn test_runtime_start_evaluates_at_bind_time() {
        let (s, constraints) = slice(
            TensorType::new(DType::F32, vec![Dim::Dynamic]),
            ValueOperand::Runtime(OperandId(1)),
            constant(&[i64::MAX]),
            None,
            Some(constant(&[3])),
            vec![TensorType::of_static(DType::I64, &[1])],
        )
        .unwrap();
        assert!(constraints.is_empty());
        assert!(!s.output()[0].is_literal());

        let mut env = Bindings::new();
        env.bind_dim(OperandId(0), 0, 10);
        env.bind_values(OperandId(1), &[-8]);
        assert_eq!(s.output()[0].evaluate(&env).unwrap(), 3);
        assert_eq!(s.start(0).evaluate(&env).unwrap(), 2);
    }

    #[test]
    fn test_runtime_step_records_constraint() {
        let (s, constraints) = slice(
            TensorType::of_static(DType::F32, &[10]),
            constant(&[9]),
            constant(&[-11]),
            None,
            Some(ValueOperand::Runtime(OperandId(1))),
            vec![TensorType::of_static(DType::I32, &[1])],
        )
        .unwrap();
        assert_eq!(constraints.len(), 1);

        let mut env = Bindings::new();
        env.bind_values(OperandId(1), &[-2]);
        assert_eq!(s.output()[0].evaluate(&env).unwrap(), 5);
        assert_eq!(s.load_index(0, IndexExpr::lit(4)).evaluate(&env).unwrap(), 1);
    }
}
