// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fills a freshly materialised output with one value.

use crate::kernel::Kernel;
use crate::plan::PlanBuilder;
use crate::{AccessTarget, AccessTerm, IterationPlan, LoweringError, LoweringPath};
use index_expr::Bindings;
use shape_inference::ConstantOfShapeShape;
use tensor_core::{with_element, DType, Element, RowMajorIndices, TensorDescriptor};

#[derive(Debug)]
pub struct ConstantOfShapeKernel<'r> {
    shape: &'r ConstantOfShapeShape,
}

impl<'r> ConstantOfShapeKernel<'r> {
    pub fn new(shape: &'r ConstantOfShapeShape) -> Self {
        Self { shape }
    }
}

impl Kernel for ConstantOfShapeKernel<'_> {
    fn path(&self) -> LoweringPath {
        LoweringPath::ConstantOfShape
    }

    fn plan(&self, op_name: &str) -> IterationPlan {
        let mut b = PlanBuilder::new(op_name, self.path());
        for (j, extent) in self.shape.output().iter().enumerate() {
            b.add_loop(format!("d{j}"), extent.clone());
        }
        b.access(
            AccessTarget::Output(0),
            (0..self.shape.output().len()).map(AccessTerm::Loop).collect(),
        );
        b.build()
    }

    fn output_dtypes(&self, _inputs: &[&TensorDescriptor<'_>]) -> Vec<DType> {
        vec![self.shape.dtype()]
    }

    fn execute(
        &self,
        plan: &IterationPlan,
        _inputs: &[&TensorDescriptor<'_>],
        outputs: &mut [TensorDescriptor<'_>],
        env: &Bindings,
    ) -> Result<(), LoweringError> {
        let out = &mut outputs[0];
        let extents = plan.extents(env)?;
        let o_at = plan.bind_access(AccessTarget::Output(0), out, env)?;
        let value = self.shape.value();

        with_element!(out.dtype(), T => {
            let fill = T::from_f64(value);
            let mut w = out.writer::<T>()?;
            for idx in RowMajorIndices::new(&extents) {
                w.store(o_at.offset(&idx), fill);
            }
            Ok(())
        }, else {
            let fill = u8::from(value != 0.0);
            let bytes = out.bytes_mut()?;
            for idx in RowMajorIndices::new(&extents) {
                bytes[o_at.offset(&idx)] = fill;
            }
            Ok(())
        })
    }
}
