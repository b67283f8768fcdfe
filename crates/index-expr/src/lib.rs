// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # index-expr
//!
//! Dimension sizes and element offsets that may be known while lowering or
//! only once the operator runs.
//!
//! # Key Components
//!
//! - [`IndexExpr`]: a literal, a named symbol, a captured operand
//!   dimension, a value loaded from a data operand, or a composite over
//!   those. Constructors fold literal inputs eagerly, so
//!   [`IndexExpr::is_literal`] is a single tag check.
//! - [`BinOp`]: arithmetic (`+ - *`, floor/ceil division, remainder,
//!   min, max) and comparisons yielding 0 or 1.
//! - [`Bindings`]: the run-time environment that resolves symbolic leaves
//!   to integers.
//!
//! # Example
//! ```
//! use index_expr::{Bindings, IndexExpr, OperandId};
//!
//! let n = IndexExpr::dim(OperandId(0), 1);
//! let rows = (n.clone() - 2).ceil_div(3);
//! assert!(!rows.is_literal());
//!
//! let mut env = Bindings::new();
//! env.bind_dim(OperandId(0), 1, 10);
//! assert_eq!(rows.evaluate(&env).unwrap(), 3);
//!
//! let folded = (IndexExpr::lit(10) - 2).ceil_div(3);
//! assert_eq!(folded.literal(), 3);
//! ```

mod bindings;
mod error;
mod expr;
mod ops;

pub use bindings::Bindings;
pub use error::IndexExprError;
pub use expr::{BinOp, IndexExpr, OperandId};
