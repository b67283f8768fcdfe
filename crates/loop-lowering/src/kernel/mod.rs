// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`Kernel`] trait and one implementation per lowering path.

pub mod constant_of_shape;
pub mod matmul_generic;
pub mod matmul_tiled;
pub mod reduce;
pub mod slice;
pub mod topk;

use crate::{IterationPlan, LoweringError, LoweringOptions, LoweringPath};
use index_expr::Bindings;
use shape_inference::{Resolution, ResolvedOp};
use tensor_core::{DType, TensorDescriptor};

pub use constant_of_shape::ConstantOfShapeKernel;
pub use matmul_generic::GenericMatMul;
pub use matmul_tiled::TiledMatMul;
pub use reduce::ReduceKernel;
pub use slice::SliceKernel;
pub use topk::TopKKernel;

/// Trait for lowering kernels.
///
/// A kernel is built from one resolved operator. It describes its loop
/// nest as an [`IterationPlan`] without looking at run-time values, then
/// executes that plan against bound operands into freshly allocated
/// outputs.
pub trait Kernel {
    fn path(&self) -> LoweringPath;

    /// Builds the loop nest for an operator named `op_name`.
    fn plan(&self, op_name: &str) -> IterationPlan;

    /// Element kind of each output, given the bound operands.
    fn output_dtypes(&self, inputs: &[&TensorDescriptor<'_>]) -> Vec<DType>;

    /// Runs `plan`, reading `inputs` and writing every element of
    /// `outputs`.
    fn execute(
        &self,
        plan: &IterationPlan,
        inputs: &[&TensorDescriptor<'_>],
        outputs: &mut [TensorDescriptor<'_>],
        env: &Bindings,
    ) -> Result<(), LoweringError>;
}

/// Picks the kernel for a resolved operator.
///
/// Plain rank-2 by rank-2 products take the tiled path unless the options
/// force the generic one; every other product is lowered generically.
pub fn select<'r>(resolution: &'r Resolution, options: &LoweringOptions) -> Box<dyn Kernel + 'r> {
    let kernel: Box<dyn Kernel + 'r> = match resolution.op() {
        ResolvedOp::MatMul(s) if s.is_plain_2d() && !options.force_generic => {
            Box::new(TiledMatMul::new(s, options.tiling.clone()))
        }
        ResolvedOp::MatMul(s) => Box::new(GenericMatMul::new(s)),
        ResolvedOp::TopK(s) => Box::new(TopKKernel::new(s)),
        ResolvedOp::Slice(s) => Box::new(SliceKernel::new(s)),
        ResolvedOp::Reduce(s) => Box::new(ReduceKernel::new(s)),
        ResolvedOp::ConstantOfShape(s) => Box::new(ConstantOfShapeKernel::new(s)),
    };
    tracing::debug!("selected {} kernel", kernel.path());
    kernel
}

pub(crate) fn unsupported(path: LoweringPath, dtype: DType) -> LoweringError {
    LoweringError::UnsupportedDType {
        op: path.to_string(),
        dtype,
    }
}
