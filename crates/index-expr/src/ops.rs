// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator overloads. `/` is floor division.

use crate::{BinOp, IndexExpr};
use std::ops::{Add, Div, Mul, Sub};

macro_rules! impl_binop {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait for IndexExpr {
            type Output = IndexExpr;
            fn $method(self, rhs: IndexExpr) -> IndexExpr {
                IndexExpr::binary($op, self, rhs)
            }
        }

        impl $trait<i64> for IndexExpr {
            type Output = IndexExpr;
            fn $method(self, rhs: i64) -> IndexExpr {
                IndexExpr::binary($op, self, IndexExpr::Literal(rhs))
            }
        }

        impl $trait<&IndexExpr> for &IndexExpr {
            type Output = IndexExpr;
            fn $method(self, rhs: &IndexExpr) -> IndexExpr {
                IndexExpr::binary($op, self.clone(), rhs.clone())
            }
        }
    };
}

impl_binop!(Add, add, BinOp::Add);
impl_binop!(Sub, sub, BinOp::Sub);
impl_binop!(Mul, mul, BinOp::Mul);
impl_binop!(Div, div, BinOp::FloorDiv);
