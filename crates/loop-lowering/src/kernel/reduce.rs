// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Sum, mean, max, min and product reductions.
//!
//! One loop per input axis; reduced axes are reduction loops traversed
//! innermost. Each output element owns an accumulator initialised to the
//! identity of the reduction (max: lowest, min: highest, prod: one,
//! sum and mean: zero). Mean divides by the number of folded elements.

use crate::kernel::{unsupported, Kernel};
use crate::plan::PlanBuilder;
use crate::{AccessTarget, AccessTerm, IterationPlan, LoweringError, LoweringPath};
use index_expr::{Bindings, OperandId};
use op_ir::ReduceKind;
use shape_inference::ReduceShape;
use tensor_core::{with_element, DType, Element, RowMajorIndices, TensorDescriptor};

#[derive(Debug)]
pub struct ReduceKernel<'r> {
    shape: &'r ReduceShape,
}

impl<'r> ReduceKernel<'r> {
    pub fn new(shape: &'r ReduceShape) -> Self {
        Self { shape }
    }
}

fn identity<T: Element>(kind: ReduceKind) -> T {
    match kind {
        ReduceKind::Sum | ReduceKind::Mean => T::zero(),
        ReduceKind::Prod => T::one(),
        ReduceKind::Max => T::lowest(),
        ReduceKind::Min => T::highest(),
    }
}

/// Folds `v` into `acc`. Max and min propagate NaN.
#[inline]
fn combine<T: Element>(kind: ReduceKind, acc: T, v: T) -> T {
    let unordered = |x: &T| x.partial_cmp(x).is_none();
    match kind {
        ReduceKind::Sum | ReduceKind::Mean => acc.elem_add(v),
        ReduceKind::Prod => acc.elem_mul(v),
        ReduceKind::Max if unordered(&acc) => acc,
        ReduceKind::Max if v > acc || unordered(&v) => v,
        ReduceKind::Min if unordered(&acc) => acc,
        ReduceKind::Min if v < acc || unordered(&v) => v,
        ReduceKind::Max | ReduceKind::Min => acc,
    }
}

impl Kernel for ReduceKernel<'_> {
    fn path(&self) -> LoweringPath {
        LoweringPath::Reduce
    }

    fn plan(&self, op_name: &str) -> IterationPlan {
        let s = self.shape;
        let mut b = PlanBuilder::new(op_name, self.path());
        for (a, extent) in s.input().iter().enumerate() {
            if s.is_reduced(a) {
                b.add_reduction(format!("r{a}"), extent.clone());
            } else {
                b.add_loop(format!("d{a}"), extent.clone());
            }
        }
        b.access(
            AccessTarget::Input(OperandId(0)),
            (0..s.input().len()).map(AccessTerm::Loop).collect(),
        );
        b.access(
            AccessTarget::Output(0),
            s.output_axes()
                .iter()
                .map(|a| a.map_or(AccessTerm::Zero, AccessTerm::Loop))
                .collect(),
        );
        b.build()
    }

    fn output_dtypes(&self, inputs: &[&TensorDescriptor<'_>]) -> Vec<DType> {
        vec![inputs[0].dtype()]
    }

    fn execute(
        &self,
        plan: &IterationPlan,
        inputs: &[&TensorDescriptor<'_>],
        outputs: &mut [TensorDescriptor<'_>],
        env: &Bindings,
    ) -> Result<(), LoweringError> {
        let dtype = inputs[0].dtype();
        with_element!(dtype, T => self.run::<T>(plan, inputs[0], &mut outputs[0], env),
            else Err(unsupported(self.path(), dtype)))
    }
}

impl ReduceKernel<'_> {
    fn run<T: Element>(
        &self,
        plan: &IterationPlan,
        x: &TensorDescriptor<'_>,
        out: &mut TensorDescriptor<'_>,
        env: &Bindings,
    ) -> Result<(), LoweringError> {
        let kind = self.shape.kind();
        let extents = plan.extents(env)?;
        let (reduced, kept): (Vec<usize>, Vec<usize>) =
            (0..plan.num_loops()).partition(|&l| plan.loops[l].reduction);
        let outer: Vec<usize> = kept.iter().map(|&l| extents[l]).collect();
        let inner: Vec<usize> = reduced.iter().map(|&l| extents[l]).collect();
        let count: usize = inner.iter().product();

        let x_at = plan.bind_access(AccessTarget::Input(OperandId(0)), x, env)?;
        let o_at = plan.bind_access(AccessTarget::Output(0), out, env)?;
        let rx = x.reader::<T>()?;
        let mut wo = out.writer::<T>()?;
        let mut ivs = vec![0; extents.len()];

        for o in RowMajorIndices::new(&outer) {
            for (&l, &v) in kept.iter().zip(&o) {
                ivs[l] = v;
            }
            let mut acc = identity::<T>(kind);
            for r in RowMajorIndices::new(&inner) {
                for (&l, &v) in reduced.iter().zip(&r) {
                    ivs[l] = v;
                }
                acc = combine(kind, acc, rx.load(x_at.offset(&ivs)));
            }
            if kind == ReduceKind::Mean {
                acc = acc.div_count(count);
            }
            wo.store(o_at.offset(&ivs), acc);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lower, LoweringOptions};
    use memory_manager::MemoryPool;
    use op_ir::{OpDef, Operator, TensorType};

    fn reduce(
        x: &TensorDescriptor<'_>,
        kind: ReduceKind,
        axes: Option<Vec<i64>>,
        keepdims: bool,
    ) -> TensorDescriptor<'static> {
        let def = OpDef::new(
            "reduce",
            Operator::Reduce {
                kind,
                axes,
                keepdims,
                noop_with_empty_axes: false,
            },
            vec![TensorType::of_static(x.dtype(), x.sizes())],
        )
        .validate()
        .unwrap();
        let resolution = shape_inference::resolve(&def).unwrap();
        let lowered = lower(
            &def,
            &resolution,
            &[x],
            &MemoryPool::unbounded(),
            &LoweringOptions::default(),
        )
        .unwrap();
        assert_eq!(lowered.path(), LoweringPath::Reduce);
        lowered.outputs.into_vec().remove(0)
    }

    fn matrix() -> TensorDescriptor<'static> {
        TensorDescriptor::from_slice([2, 3], &[1.0f32, 5.0, 3.0, 4.0, 2.0, 6.0]).unwrap()
    }

    #[test]
    fn test_sum_rows_keepdims() {
        let out = reduce(&matrix(), ReduceKind::Sum, Some(vec![1]), true);
        assert_eq!(out.sizes(), &[2, 1]);
        assert_eq!(out.to_vec::<f32>().unwrap(), vec![9.0, 12.0]);
    }

    #[test]
    fn test_mean_columns() {
        let out = reduce(&matrix(), ReduceKind::Mean, Some(vec![0]), false);
        assert_eq!(out.sizes(), &[3]);
        assert_eq!(out.to_vec::<f32>().unwrap(), vec![2.5, 3.5, 4.5]);
    }

    #[test]
    fn test_max_min_prod_over_all_axes() {
        let x = matrix();
        let max = reduce(&x, ReduceKind::Max, None, false);
        assert!(max.sizes().is_empty());
        assert_eq!(max.to_vec::<f32>().unwrap(), vec![6.0]);
        let min = reduce(&x, ReduceKind::Min, None, true);
        assert_eq!(min.sizes(), &[1, 1]);
        assert_eq!(min.to_vec::<f32>().unwrap(), vec![1.0]);
        let prod = reduce(&x, ReduceKind::Prod, None, false);
        assert_eq!(prod.to_vec::<f32>().unwrap(), vec![720.0]);
    }

    #[test]
    fn test_integer_mean_truncates() {
        let x = TensorDescriptor::from_slice([4], &[1i32, 2, 2, 2]).unwrap();
        let out = reduce(&x, ReduceKind::Mean, None, false);
        assert_eq!(out.to_vec::<i32>().unwrap(), vec![1]);
    }

    #[test]
    fn test_max_propagates_nan() {
        let x = TensorDescriptor::from_slice([3], &[1.0f32, f32::NAN, 3.0]).unwrap();
        let out = reduce(&x, ReduceKind::Max, None, false);
        assert!(out.to_vec::<f32>().unwrap()[0].is_nan());
    }

    #[test]
    fn test_middle_axis_of_rank_three() {
        let values: Vec<i64> = (0..24).collect();
        let x = TensorDescriptor::from_slice([2, 3, 4], &values).unwrap();
        let out = reduce(&x, ReduceKind::Sum, Some(vec![1]), false);
        assert_eq!(out.sizes(), &[2, 4]);
        // out[a][c] = sum_b x[a][b][c] = 3 * (12a + c) + 12
        let expected: Vec<i64> = (0..2)
            .flat_map(|a| (0..4).map(move |c| 3 * (12 * a + c) + 12))
            .collect();
        assert_eq!(out.to_vec::<i64>().unwrap(), expected);
    }

    #[test]
    fn test_combine_identities() {
        assert_eq!(identity::<f32>(ReduceKind::Max), f32::NEG_INFINITY);
        assert_eq!(identity::<u8>(ReduceKind::Min), u8::MAX);
        assert_eq!(combine(ReduceKind::Min, 3i32, 2), 2);
        assert_eq!(combine(ReduceKind::Max, 3i32, 2), 3);
    }
}
