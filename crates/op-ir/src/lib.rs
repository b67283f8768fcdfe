// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # op-ir
//!
//! The single-operator representation handed to shape inference and
//! lowering.
//!
//! - [`OpKind`]: the closed set of operator kinds.
//! - [`Operator`]: one tagged variant per kind, carrying its attributes.
//!   Shape-valued inputs (top-k count, slice bounds, target shapes) are
//!   [`ValueOperand`]s: constant, or read from an operand at run time.
//! - [`TensorType`]: element kind plus static or dynamic dimensions.
//! - [`OpDef`]: an operator with its operand types, using a
//!   **type-state pattern** (`Unchecked` → `Validated`).
//! - [`registry`]: the registration table listing each kind's operand
//!   arity and output count.
//!
//! # Example
//! ```
//! use op_ir::{Dim, OpDef, Operator, TensorType, ValueOperand};
//! use tensor_core::DType;
//!
//! let def = OpDef::new(
//!     "topk",
//!     Operator::TopK {
//!         axis: -1,
//!         k: ValueOperand::Constant(vec![2]),
//!         largest: true,
//!         sorted: true,
//!     },
//!     vec![TensorType::new(DType::F32, vec![Dim::Dynamic, Dim::Static(6)])],
//! )
//! .validate()
//! .unwrap();
//! assert_eq!(def.num_outputs(), 2);
//! ```

mod error;
pub mod opdef;
mod operator;
pub mod registry;
mod types;

pub use error::OpError;
pub use opdef::{OpDef, Unchecked, Validated};
pub use operator::{OpKind, Operator, ReduceKind, ValueOperand};
pub use registry::OpSchema;
pub use types::{Dim, TensorType};
