// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The lowering entry points.

use crate::{bind_operands, kernel, IterationPlan, LoweringError, LoweringOptions, LoweringPath};
use memory_manager::MemoryPool;
use op_ir::{OpDef, Validated};
use shape_inference::Resolution;
use tensor_core::{TensorDescriptor, TensorList};

/// Outputs of one lowering call and the plan that produced them.
#[derive(Debug)]
pub struct Lowered {
    pub outputs: TensorList<'static>,
    pub plan: IterationPlan,
}

impl Lowered {
    pub fn path(&self) -> LoweringPath {
        self.plan.path
    }

    /// Total bytes of every output buffer.
    pub fn output_bytes(&self) -> usize {
        self.outputs.iter().map(|t| t.buffer_size_bytes()).sum()
    }
}

/// Builds and validates the iteration plan without touching any buffer.
pub fn plan_for(
    def: &OpDef<Validated>,
    resolution: &Resolution,
    options: &LoweringOptions,
) -> Result<IterationPlan, LoweringError> {
    let plan = kernel::select(resolution, options).plan(&def.name);
    plan.validate()?;
    Ok(plan)
}

/// Lowers one resolved operator over bound operands.
///
/// Operands are checked against their declared types, run-time values
/// are bound, and every deferred shape condition is verified before any
/// output is allocated. Outputs are allocated from `pool`, named
/// `<op>:<index>`, and written in full by the selected kernel.
pub fn lower(
    def: &OpDef<Validated>,
    resolution: &Resolution,
    operands: &[&TensorDescriptor<'_>],
    pool: &MemoryPool,
    options: &LoweringOptions,
) -> Result<Lowered, LoweringError> {
    def.check_operands(operands)?;
    let env = bind_operands(def, operands)?;
    resolution.verify(&env)?;

    let kernel = kernel::select(resolution, options);
    let plan = kernel.plan(&def.name);
    plan.validate()?;

    let shape = resolution.shape();
    let sizes = (0..shape.num_outputs())
        .map(|i| shape.evaluate(i, &env))
        .collect::<Result<Vec<_>, _>>()?;

    let mut outputs = Vec::with_capacity(sizes.len());
    for (i, (dtype, sizes)) in kernel.output_dtypes(operands).into_iter().zip(sizes).enumerate() {
        let desc = TensorDescriptor::create_in(pool, dtype, sizes)?;
        outputs.push(desc.with_name(format!("{}:{i}", def.name)));
    }

    kernel.execute(&plan, operands, &mut outputs, &env)?;
    tracing::debug!("{}", plan.summary());

    Ok(Lowered {
        outputs: outputs.into_iter().collect(),
        plan,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory_manager::{AllocationError, MemoryBudget};
    use op_ir::{Operator, TensorType};
    use tensor_core::{DType, TensorError};

    fn mm_def() -> OpDef<Validated> {
        OpDef::new(
            "mm",
            Operator::MatMul,
            vec![
                TensorType::of_static(DType::F32, &[4, 3]),
                TensorType::of_static(DType::F32, &[3, 5]),
            ],
        )
        .validate()
        .unwrap()
    }

    #[test]
    fn test_outputs_are_named_and_sized() {
        let def = mm_def();
        let resolution = shape_inference::resolve(&def).unwrap();
        let a = TensorDescriptor::create(DType::F32, [4, 3]).unwrap();
        let b = TensorDescriptor::create(DType::F32, [3, 5]).unwrap();
        let pool = MemoryPool::unbounded();
        let lowered = lower(&def, &resolution, &[&a, &b], &pool, &LoweringOptions::default())
            .unwrap();
        assert_eq!(lowered.path(), LoweringPath::TiledMatMul);
        assert_eq!(lowered.output_bytes(), 4 * 5 * 4);
        assert_eq!(pool.allocated_bytes(), 80);
        let out = lowered.outputs.get_by_name("mm:0").unwrap();
        assert_eq!(out.sizes(), &[4, 5]);
    }

    #[test]
    fn test_operand_mismatch_is_rejected() {
        let def = mm_def();
        let resolution = shape_inference::resolve(&def).unwrap();
        let a = TensorDescriptor::create(DType::F32, [4, 2]).unwrap();
        let b = TensorDescriptor::create(DType::F32, [3, 5]).unwrap();
        assert!(matches!(
            lower(
                &def,
                &resolution,
                &[&a, &b],
                &MemoryPool::unbounded(),
                &LoweringOptions::default()
            ),
            Err(LoweringError::Op(_))
        ));
    }

    #[test]
    fn test_budget_exceeded_surfaces_allocation_error() {
        let def = mm_def();
        let resolution = shape_inference::resolve(&def).unwrap();
        let a = TensorDescriptor::create(DType::F32, [4, 3]).unwrap();
        let b = TensorDescriptor::create(DType::F32, [3, 5]).unwrap();
        let pool = MemoryPool::new(MemoryBudget::from_bytes(16));
        let err = lower(&def, &resolution, &[&a, &b], &pool, &LoweringOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            LoweringError::Tensor(TensorError::Allocation(AllocationError::BudgetExceeded { .. }))
        ));
    }

    #[test]
    fn test_plan_for_needs_no_buffers() {
        let def = mm_def();
        let resolution = shape_inference::resolve(&def).unwrap();
        let plan = plan_for(&def, &resolution, &LoweringOptions::default()).unwrap();
        assert_eq!(plan.path, LoweringPath::TiledMatMul);
        assert!(plan.summary().starts_with("Plan 'mm' (tiled_matmul)"));
    }
}
