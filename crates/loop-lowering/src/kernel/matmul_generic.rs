// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Generic matrix-product lowering.
//!
//! One loop per output dimension plus an innermost contraction loop `k`.
//! Each output element owns a scalar accumulator that starts at zero,
//! takes `acc = acc + a * b` for `k` ascending, and is stored once the
//! contraction completes.
//!
//! Operand accesses skip padded dimensions. Every real operand dimension
//! is aligned to a loop by [`align_lhs`] or [`align_rhs`]; the only rank
//! mismatch handled is a 1-D left operand, which drops the row dimension
//! from the output and shifts the right operand's column axis down by one.

use crate::kernel::{unsupported, Kernel};
use crate::plan::PlanBuilder;
use crate::{AccessTarget, AccessTerm, IterationPlan, LoweringError, LoweringPath};
use index_expr::{Bindings, OperandId};
use shape_inference::{MatMulShape, PaddedShape};
use tensor_core::{with_element, DType, Element, RowMajorIndices, TensorDescriptor};

/// Where a padded operand dimension lands in the loop nest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisAlignment {
    /// The contracted dimension, indexed by `k`.
    Contracted,
    /// Output loop of the same position.
    Direct(usize),
    /// Output loop one position lower: the output lost its row dimension.
    CollapsedLeading(usize),
}

impl AxisAlignment {
    fn term(self, is_batch: bool, k: usize) -> AccessTerm {
        match self {
            AxisAlignment::Contracted => AccessTerm::Loop(k),
            AxisAlignment::Direct(l) | AxisAlignment::CollapsedLeading(l) if is_batch => {
                AccessTerm::Broadcast(l)
            }
            AxisAlignment::Direct(l) | AxisAlignment::CollapsedLeading(l) => AccessTerm::Loop(l),
        }
    }
}

/// Aligns dimension `i` of the left operand padded to `rank`.
///
/// # Panics
/// Panics if `i` cannot be placed in an output of rank `out_rank`.
pub fn align_lhs(i: usize, rank: usize, out_rank: usize) -> AxisAlignment {
    if i + 1 == rank {
        AxisAlignment::Contracted
    } else if i < out_rank {
        AxisAlignment::Direct(i)
    } else {
        panic!("left operand axis {i} has no loop (rank {rank}, output rank {out_rank})")
    }
}

/// Aligns dimension `i` of the right operand padded to `rank`.
///
/// # Panics
/// Panics if `i` cannot be placed in an output of rank `out_rank`.
pub fn align_rhs(i: usize, rank: usize, out_rank: usize) -> AxisAlignment {
    if i + 2 == rank {
        AxisAlignment::Contracted
    } else if i < out_rank {
        AxisAlignment::Direct(i)
    } else if i == out_rank && out_rank + 1 == rank {
        AxisAlignment::CollapsedLeading(i - 1)
    } else {
        panic!("right operand axis {i} has no loop (rank {rank}, output rank {out_rank})")
    }
}

fn operand_terms(
    shape: &PaddedShape,
    align: impl Fn(usize) -> AxisAlignment,
    k: usize,
) -> Vec<AccessTerm> {
    let batch_rank = shape.rank() - 2;
    (0..shape.rank())
        .filter(|&i| !shape.is_padded(i))
        .map(|i| align(i).term(i < batch_rank, k))
        .collect()
}

/// Generic lowering for any rank and broadcast pattern.
#[derive(Debug)]
pub struct GenericMatMul<'r> {
    shape: &'r MatMulShape,
}

impl<'r> GenericMatMul<'r> {
    pub fn new(shape: &'r MatMulShape) -> Self {
        Self { shape }
    }
}

impl Kernel for GenericMatMul<'_> {
    fn path(&self) -> LoweringPath {
        LoweringPath::GenericMatMul
    }

    fn plan(&self, op_name: &str) -> IterationPlan {
        let s = self.shape;
        let rank = s.rank();
        let out_rank = s.output_rank();
        let lhs_is_vector = s.a().is_padded(rank - 2);

        let mut b = PlanBuilder::new(op_name, self.path());
        for (j, extent) in s.output().iter().enumerate() {
            let name = if j + 2 < rank {
                format!("b{j}")
            } else if j + 2 == rank && !lhs_is_vector {
                "i".to_string()
            } else {
                "j".to_string()
            };
            b.add_loop(name, extent.clone());
        }
        let k = b.add_reduction("k", s.contraction().clone());

        b.access(
            AccessTarget::Input(OperandId(0)),
            operand_terms(s.a(), |i| align_lhs(i, rank, out_rank), k),
        );
        b.access(
            AccessTarget::Input(OperandId(1)),
            operand_terms(s.b(), |i| align_rhs(i, rank, out_rank), k),
        );
        b.access(
            AccessTarget::Output(0),
            (0..out_rank).map(AccessTerm::Loop).collect(),
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
        with_element!(dtype, T => run::<T>(plan, inputs, &mut outputs[0], env),
            else Err(unsupported(self.path(), dtype)))
    }
}

fn run<T: Element>(
    plan: &IterationPlan,
    inputs: &[&TensorDescriptor<'_>],
    out: &mut TensorDescriptor<'_>,
    env: &Bindings,
) -> Result<(), LoweringError> {
    let (a, b) = (inputs[0], inputs[1]);
    let extents = plan.extents(env)?;
    let k = extents.len() - 1;
    let (outer, depth) = (&extents[..k], extents[k]);

    let a_at = plan.bind_access(AccessTarget::Input(OperandId(0)), a, env)?;
    let b_at = plan.bind_access(AccessTarget::Input(OperandId(1)), b, env)?;
    let c_at = plan.bind_access(AccessTarget::Output(0), out, env)?;

    let (ra, rb) = (a.reader::<T>()?, b.reader::<T>()?);
    let mut wc = out.writer::<T>()?;
    let mut ivs = vec![0; extents.len()];

    for idx in RowMajorIndices::new(outer) {
        ivs[..k].copy_from_slice(&idx);
        let mut acc = T::zero();
        for kk in 0..depth {
            ivs[k] = kk;
            let product = ra.load(a_at.offset(&ivs)).elem_mul(rb.load(b_at.offset(&ivs)));
            acc = acc.elem_add(product);
        }
        wc.store(c_at.offset(&ivs), acc);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lower, LoweringOptions};
    use memory_manager::MemoryPool;
    use op_ir::{OpDef, Operator, TensorType};

    fn matmul(a: &TensorDescriptor<'_>, b: &TensorDescriptor<'_>) -> (Vec<usize>, Vec<f32>, IterationPlan) {
        let def = OpDef::new(
            "mm",
            Operator::MatMul,
            vec![
                TensorType::of_static(a.dtype(), a.sizes()),
                TensorType::of_static(b.dtype(), b.sizes()),
            ],
        )
        .validate()
        .unwrap();
        let resolution = shape_inference::resolve(&def).unwrap();
        let options = LoweringOptions {
            force_generic: true,
            ..LoweringOptions::default()
        };
        let lowered = lower(&def, &resolution, &[a, b], &MemoryPool::unbounded(), &options).unwrap();
        let out = lowered.outputs.get(0).unwrap();
        (out.sizes().to_vec(), out.to_vec::<f32>().unwrap(), lowered.plan)
    }

    fn iota(sizes: &[usize]) -> TensorDescriptor<'static> {
        let n: usize = sizes.iter().product();
        let values: Vec<f32> = (0..n).map(|v| v as f32).collect();
        TensorDescriptor::from_slice(sizes.to_vec(), &values).unwrap()
    }

    #[test]
    fn test_alignment_cases() {
        // (4, 3) x (3, 5)
        assert_eq!(align_lhs(0, 2, 2), AxisAlignment::Direct(0));
        assert_eq!(align_lhs(1, 2, 2), AxisAlignment::Contracted);
        assert_eq!(align_rhs(0, 2, 2), AxisAlignment::Contracted);
        assert_eq!(align_rhs(1, 2, 2), AxisAlignment::Direct(1));
        // (1, 1, 5) x (10, 5, 4) -> (10, 4)
        assert_eq!(align_rhs(0, 3, 2), AxisAlignment::Direct(0));
        assert_eq!(align_rhs(2, 3, 2), AxisAlignment::CollapsedLeading(1));
    }

    #[test]
    #[should_panic(expected = "has no loop")]
    fn test_unhandled_alignment_panics() {
        align_rhs(3, 5, 3);
    }

    #[test]
    fn test_plain_product() {
        let a = TensorDescriptor::from_slice([2, 3], &[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let b = TensorDescriptor::from_slice([3, 2], &[7.0f32, 8.0, 9.0, 10.0, 11.0, 12.0]).unwrap();
        let (sizes, values, plan) = matmul(&a, &b);
        assert_eq!(sizes, vec![2, 2]);
        assert_eq!(values, vec![58.0, 64.0, 139.0, 154.0]);
        assert_eq!(plan.path, LoweringPath::GenericMatMul);
        assert_eq!(plan.traversal_order(), vec!["i", "j", "k"]);
    }

    #[test]
    fn test_vector_times_batched_matrix() {
        let a = TensorDescriptor::from_slice([5], &[1.0f32, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let b = iota(&[10, 5, 4]);
        let (sizes, values, plan) = matmul(&a, &b);
        assert_eq!(sizes, vec![10, 4]);

        let bv = b.to_vec::<f32>().unwrap();
        for batch in 0..10 {
            for n in 0..4 {
                let expected: f32 = (0..5)
                    .map(|k| (k + 1) as f32 * bv[batch * 20 + k * 4 + n])
                    .sum();
                assert_eq!(values[batch * 4 + n], expected);
            }
        }
        // The padded row dimension has no loop and no access term.
        assert_eq!(plan.traversal_order(), vec!["b0", "j", "k"]);
        assert_eq!(plan.accesses[0].terms, vec![AccessTerm::Loop(2)]);
        assert_eq!(
            plan.accesses[1].terms,
            vec![AccessTerm::Broadcast(0), AccessTerm::Loop(2), AccessTerm::Loop(1)]
        );
    }

    #[test]
    fn test_matrix_times_vector() {
        let a = iota(&[2, 2, 3]);
        let b = TensorDescriptor::from_slice([3], &[1.0f32, 0.0, -1.0]).unwrap();
        let (sizes, values, _) = matmul(&a, &b);
        assert_eq!(sizes, vec![2, 2]);
        // Each row r gives r[0] - r[2] = -2.
        assert_eq!(values, vec![-2.0; 4]);
    }

    #[test]
    fn test_vector_dot_vector() {
        let a = TensorDescriptor::from_slice([3], &[1.0f32, 2.0, 3.0]).unwrap();
        let b = TensorDescriptor::from_slice([3], &[4.0f32, 5.0, 6.0]).unwrap();
        let (sizes, values, _) = matmul(&a, &b);
        assert!(sizes.is_empty());
        assert_eq!(values, vec![32.0]);
    }

    #[test]
    fn test_batch_broadcast_of_size_one() {
        let a = iota(&[1, 2, 3]);
        let b = iota(&[4, 3, 2]);
        let (sizes, values, _) = matmul(&a, &b);
        assert_eq!(sizes, vec![4, 2, 2]);

        let av = a.to_vec::<f32>().unwrap();
        let bv = b.to_vec::<f32>().unwrap();
        for batch in 0..4 {
            for i in 0..2 {
                for j in 0..2 {
                    let expected: f32 = (0..3)
                        .map(|k| av[i * 3 + k] * bv[batch * 6 + k * 2 + j])
                        .sum();
                    assert_eq!(values[batch * 4 + i * 2 + j], expected);
                }
            }
        }
    }

    #[test]
    fn test_integer_product_wraps() {
        let a = TensorDescriptor::from_slice([1, 2], &[100i8, 100]).unwrap();
        let b = TensorDescriptor::from_slice([2, 1], &[2i8, 1]).unwrap();
        let def = OpDef::new(
            "mm",
            Operator::MatMul,
            vec![
                TensorType::of_static(DType::I8, &[1, 2]),
                TensorType::of_static(DType::I8, &[2, 1]),
            ],
        )
        .validate()
        .unwrap();
        let resolution = shape_inference::resolve(&def).unwrap();
        let options = LoweringOptions {
            force_generic: true,
            ..LoweringOptions::default()
        };
        let lowered =
            lower(&def, &resolution, &[&a, &b], &MemoryPool::unbounded(), &options).unwrap();
        let out = lowered.outputs.get(0).unwrap();
        assert_eq!(out.to_vec::<i8>().unwrap(), vec![300i32 as i8]);
    }
}
