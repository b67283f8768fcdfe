// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # loop-lowering
//!
//! Turns a resolved operator into an [`IterationPlan`] and runs that plan
//! over bound operand descriptors into freshly allocated outputs.
//!
//! # Kernels
//!
//! | Kernel | Operators | Loop nest |
//! |---|---|---|
//! | [`GenericMatMul`] | matrix product, any rank or broadcast | output loops, then `k` |
//! | [`TiledMatMul`] | plain `(M, K) x (K, N)` product | `I`, `J`, `K` blocked |
//! | [`TopKKernel`] | top-k | outer loops, scan `r`, emit `k` |
//! | [`SliceKernel`] | slice | output loops, affine input access |
//! | [`ReduceKernel`] | sum, mean, max, min, prod | kept loops, then reduced |
//! | [`ConstantOfShapeKernel`] | constant of shape | output loops |
//!
//! All kernels implement [`Kernel`]; [`kernel::select`] picks one per
//! resolved operator.
//!
//! # Example
//! ```
//! use loop_lowering::{lower, LoweringOptions, LoweringPath};
//! use memory_manager::MemoryPool;
//! use op_ir::{OpDef, Operator, TensorType};
//! use tensor_core::{DType, TensorDescriptor};
//!
//! let def = OpDef::new(
//!     "mm",
//!     Operator::MatMul,
//!     vec![
//!         TensorType::of_static(DType::F32, &[2, 2]),
//!         TensorType::of_static(DType::F32, &[2, 2]),
//!     ],
//! )
//! .validate()
//! .unwrap();
//! let resolution = shape_inference::resolve(&def).unwrap();
//!
//! let a = TensorDescriptor::from_slice([2, 2], &[1.0f32, 2.0, 3.0, 4.0]).unwrap();
//! let b = TensorDescriptor::from_slice([2, 2], &[1.0f32, 0.0, 0.0, 1.0]).unwrap();
//! let lowered = lower(
//!     &def,
//!     &resolution,
//!     &[&a, &b],
//!     &MemoryPool::unbounded(),
//!     &LoweringOptions::default(),
//! )
//! .unwrap();
//! assert_eq!(lowered.path(), LoweringPath::TiledMatMul);
//! assert_eq!(
//!     lowered.outputs.get(0).unwrap().to_vec::<f32>().unwrap(),
//!     vec![1.0, 2.0, 3.0, 4.0]
//! );
//! ```

mod bind;
mod config;
mod error;
pub mod kernel;
mod lower;
pub(crate) mod plan;

pub use bind::bind_operands;
pub use config::{Blocks, LoweringOptions, TilingConfig};
pub use error::LoweringError;
pub use kernel::{
    ConstantOfShapeKernel, GenericMatMul, Kernel, ReduceKernel, SliceKernel, TiledMatMul,
    TopKKernel,
};
pub use lower::{lower, plan_for, Lowered};
pub use plan::{
    AccessMap, AccessTarget, AccessTerm, BoundAccess, IterationPlan, LoopDim, LoweringPath,
};
