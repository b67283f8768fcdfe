// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Strided slicing as an element copy.
//!
//! One loop per output dimension. The input is read through the affine
//! map `step * i + start` on every sliced axis; elements are copied as
//! raw bytes, so every element kind (including `Bool`) is supported.

use crate::kernel::Kernel;
use crate::plan::PlanBuilder;
use crate::{AccessTarget, AccessTerm, IterationPlan, LoweringError, LoweringPath};
use index_expr::{Bindings, OperandId};
use shape_inference::SliceShape;
use tensor_core::{DType, RowMajorIndices, TensorDescriptor};

#[derive(Debug)]
pub struct SliceKernel<'r> {
    shape: &'r SliceShape,
}

impl<'r> SliceKernel<'r> {
    pub fn new(shape: &'r SliceShape) -> Self {
        Self { shape }
    }
}

impl Kernel for SliceKernel<'_> {
    fn path(&self) -> LoweringPath {
        LoweringPath::Slice
    }

    fn plan(&self, op_name: &str) -> IterationPlan {
        let s = self.shape;
        let mut b = PlanBuilder::new(op_name, self.path());
        let mut input = Vec::with_capacity(s.rank());
        for (j, extent) in s.output().iter().enumerate() {
            let l = b.add_loop(format!("d{j}"), extent.clone());
            let identity = s.start(j).as_literal() == Some(0) && s.step(j).as_literal() == Some(1);
            input.push(if identity {
                AccessTerm::Loop(l)
            } else {
                AccessTerm::Affine {
                    loop_index: l,
                    scale: s.step(j).clone(),
                    offset: s.start(j).clone(),
                }
            });
        }
        b.access(AccessTarget::Input(OperandId(0)), input);
        b.access(
            AccessTarget::Output(0),
            (0..s.rank()).map(AccessTerm::Loop).collect(),
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
        let x = inputs[0];
        let out = &mut outputs[0];
        let extents = plan.extents(env)?;
        let x_at = plan.bind_access(AccessTarget::Input(OperandId(0)), x, env)?;
        let o_at = plan.bind_access(AccessTarget::Output(0), out, env)?;

        let width = x.dtype().size_bytes();
        let src = x.bytes()?;
        let dst = out.bytes_mut()?;
        for idx in RowMajorIndices::new(&extents) {
            let from = x_at.offset(&idx) * width;
            let to = o_at.offset(&idx) * width;
            dst[to..to + width].copy_from_slice(&src[from..from + width]);
        }
        Ok(())
    }
}
