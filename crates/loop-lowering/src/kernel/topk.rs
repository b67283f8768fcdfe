// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Top-k selection along one axis.
//!
//! For every index of the non-selected axes the whole line along the axis
//! is scanned (`r`), ranked, and the first `k` entries are written to the
//! values and indices outputs. Ranking is stable: equal elements keep the
//! lower source index first. NaN ranks above every number.

use crate::kernel::{unsupported, Kernel};
use crate::plan::PlanBuilder;
use crate::{AccessTarget, AccessTerm, IterationPlan, LoweringError, LoweringPath};
use index_expr::{Bindings, OperandId};
use shape_inference::TopKShape;
use std::cmp::Ordering;
use tensor_core::{with_element, DType, Element, RowMajorIndices, TensorDescriptor};

/// Top-k lowering producing values (input kind) and indices (`i64`).
#[derive(Debug)]
pub struct TopKKernel<'r> {
    shape: &'r TopKShape,
}

impl<'r> TopKKernel<'r> {
    pub fn new(shape: &'r TopKShape) -> Self {
        Self { shape }
    }
}

/// Total order over elements with unordered values (NaN) greatest.
fn rank_order<T: PartialOrd>(a: &T, b: &T) -> Ordering {
    a.partial_cmp(b).unwrap_or_else(|| {
        let unordered = |x: &T| x.partial_cmp(x).is_none();
        match (unordered(a), unordered(b)) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => Ordering::Equal,
        }
    })
}

impl Kernel for TopKKernel<'_> {
    fn path(&self) -> LoweringPath {
        LoweringPath::TopK
    }

    /// Loops: one per non-selected axis, then the scan `r` over the axis,
    /// then the output position `k`.
    fn plan(&self, op_name: &str) -> IterationPlan {
        let s = self.shape;
        let axis = s.axis();
        let mut b = PlanBuilder::new(op_name, self.path());

        let mut loop_of = vec![0; s.input().len()];
        for (a, extent) in s.input().iter().enumerate() {
            if a != axis {
                loop_of[a] = b.add_loop(format!("d{a}"), extent.clone());
            }
        }
        let r = b.add_reduction("r", s.axis_dim().clone());
        let k = b.add_loop("k", s.k().clone());
        b.order((0..r).chain([r, k]).collect());

        let terms = |at_axis: usize| -> Vec<AccessTerm> {
            (0..s.input().len())
                .map(|a| AccessTerm::Loop(if a == axis { at_axis } else { loop_of[a] }))
                .collect()
        };
        b.access(AccessTarget::Input(OperandId(0)), terms(r));
        b.access(AccessTarget::Output(0), terms(k));
        b.access(AccessTarget::Output(1), terms(k));
        b.build()
    }

    fn output_dtypes(&self, inputs: &[&TensorDescriptor<'_>]) -> Vec<DType> {
        vec![inputs[0].dtype(), DType::I64]
    }

    fn execute(
        &self,
        plan: &IterationPlan,
        inputs: &[&TensorDescriptor<'_>],
        outputs: &mut [TensorDescriptor<'_>],
        env: &Bindings,
    ) -> Result<(), LoweringError> {
        let dtype = inputs[0].dtype();
        with_element!(dtype, T => self.run::<T>(plan, inputs[0], outputs, env),
            else Err(unsupported(self.path(), dtype)))
    }
}

impl TopKKernel<'_> {
    fn run<T: Element>(
        &self,
        plan: &IterationPlan,
        x: &TensorDescriptor<'_>,
        outputs: &mut [TensorDescriptor<'_>],
        env: &Bindings,
    ) -> Result<(), LoweringError> {
        let extents = plan.extents(env)?;
        let (r, k) = (extents.len() - 2, extents.len() - 1);
        let (outer, depth, count) = (&extents[..r], extents[r], extents[k]);

        let x_at = plan.bind_access(AccessTarget::Input(OperandId(0)), x, env)?;
        let v_at = plan.bind_access(AccessTarget::Output(0), &outputs[0], env)?;
        let i_at = plan.bind_access(AccessTarget::Output(1), &outputs[1], env)?;

        let rx = x.reader::<T>()?;
        let (values, indices) = outputs.split_at_mut(1);
        let mut wv = values[0].writer::<T>()?;
        let mut wi = indices[0].writer::<i64>()?;

        let largest = self.shape.largest();
        let mut ivs = vec![0; extents.len()];
        let mut line = Vec::with_capacity(depth);
        let mut order: Vec<usize> = Vec::with_capacity(depth);

        for idx in RowMajorIndices::new(outer) {
            ivs[..r].copy_from_slice(&idx);

            line.clear();
            for p in 0..depth {
                ivs[r] = p;
                line.push(rx.load(x_at.offset(&ivs)));
            }

            order.clear();
            order.extend(0..depth);
            if largest {
                order.sort_by(|&p, &q| rank_order(&line[q], &line[p]));
            } else {
                order.sort_by(|&p, &q| rank_order(&line[p], &line[q]));
            }

            for (pos, &src) in order.iter().take(count).enumerate() {
                ivs[k] = pos;
                wv.store(v_at.offset(&ivs), line[src]);
                wi.store(i_at.offset(&ivs), src as i64);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lower, LoweringOptions};
    use memory_manager::MemoryPool;
    use op_ir::{Dim, OpDef, Operator, TensorType, ValueOperand};

    fn topk(
        x: &TensorDescriptor<'_>,
        axis: i64,
        k: i64,
        largest: bool,
    ) -> (Vec<usize>, Vec<f32>, Vec<i64>) {
        let def = OpDef::new(
            "topk",
            Operator::TopK {
                axis,
                k: ValueOperand::Constant(vec![k]),
                largest,
                sorted: true,
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
        let values = lowered.outputs.get(0).unwrap();
        let indices = lowered.outputs.get(1).unwrap();
        assert_eq!(values.sizes(), indices.sizes());
        (
            values.sizes().to_vec(),
            values.to_vec::<f32>().unwrap(),
            indices.to_vec::<i64>().unwrap(),
        )
    }

    #[test]
    fn test_rank_order_puts_nan_last() {
        assert_eq!(rank_order(&1.0f32, &2.0), Ordering::Less);
        assert_eq!(rank_order(&f32::NAN, &2.0), Ordering::Greater);
        assert_eq!(rank_order(&2.0, &f32::NAN), Ordering::Less);
        assert_eq!(rank_order(&f32::NAN, &f32::NAN), Ordering::Equal);
    }

    #[test]
    fn test_largest_along_last_axis() {
        let x = TensorDescriptor::from_slice(
            [3, 6],
            &[
                1.0f32, 9.0, 3.0, 7.0, 5.0, 2.0, //
                6.0, 6.0, 1.0, 0.0, 8.0, 4.0, //
                -1.0, -2.0, -3.0, -4.0, -5.0, -6.0,
            ],
        )
        .unwrap();
        let (sizes, values, indices) = topk(&x, 1, 2, true);
        assert_eq!(sizes, vec![3, 2]);
        assert_eq!(values, vec![9.0, 7.0, 8.0, 6.0, -1.0, -2.0]);
        assert_eq!(indices, vec![1, 3, 4, 0, 0, 1]);
    }

    #[test]
    fn test_ties_keep_lower_index_first() {
        let x = TensorDescriptor::from_slice([5], &[2.0f32, 5.0, 5.0, 1.0, 5.0]).unwrap();
        let (_, values, indices) = topk(&x, 0, 3, true);
        assert_eq!(values, vec![5.0, 5.0, 5.0]);
        assert_eq!(indices, vec![1, 2, 4]);
    }

    #[test]
    fn test_smallest_along_first_axis() {
        let x = TensorDescriptor::from_slice([3, 2], &[3.0f32, 0.0, 1.0, 2.0, 2.0, 1.0]).unwrap();
        let (sizes, values, indices) = topk(&x, 0, 2, false);
        assert_eq!(sizes, vec![2, 2]);
        assert_eq!(values, vec![1.0, 0.0, 2.0, 1.0]);
        assert_eq!(indices, vec![1, 0, 2, 2]);
    }

    #[test]
    fn test_runtime_k_bound_checked_before_allocation() {
        let def = OpDef::new(
            "topk",
            Operator::TopK {
                axis: 0,
                k: ValueOperand::Runtime(OperandId(1)),
                largest: true,
                sorted: true,
            },
            vec![
                TensorType::new(DType::F32, vec![Dim::Dynamic]),
                TensorType::of_static(DType::I64, &[1]),
            ],
        )
        .validate()
        .unwrap();
        let resolution = shape_inference::resolve(&def).unwrap();
        let x = TensorDescriptor::from_slice([4], &[1.0f32, 4.0, 2.0, 3.0]).unwrap();
        let pool = MemoryPool::unbounded();

        let k = TensorDescriptor::from_slice([1], &[2i64]).unwrap();
        let lowered = lower(&def, &resolution, &[&x, &k], &pool, &LoweringOptions::default())
            .unwrap();
        assert_eq!(
            lowered.outputs.get(0).unwrap().to_vec::<f32>().unwrap(),
            vec![4.0, 3.0]
        );
        drop(lowered);

        let live = pool.allocated_bytes();
        let k = TensorDescriptor::from_slice([1], &[4i64]).unwrap();
        let err = lower(&def, &resolution, &[&x, &k], &pool, &LoweringOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("K out of bound"));
        assert_eq!(pool.allocated_bytes(), live);
    }
}
