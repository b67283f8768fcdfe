// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Captures: operand types and shape operands as index expressions.

use index_expr::{IndexExpr, OperandId};
use op_ir::{Dim, OpDef, TensorType, Validated, ValueOperand};

/// The dimensions of one operand.
///
/// Static dimensions become literals; dynamic ones become
/// `dim(operand, i)` placeholders resolved once the operand is bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimsCapture {
    operand: OperandId,
    dims: Vec<IndexExpr>,
}

impl DimsCapture {
    pub fn new(operand: OperandId, ty: &TensorType) -> Self {
        let dims = ty
            .dims
            .iter()
            .enumerate()
            .map(|(i, d)| match d {
                Dim::Static(n) => IndexExpr::from(*n),
                Dim::Dynamic => IndexExpr::dim(operand, i),
            })
            .collect();
        Self { operand, dims }
    }

    /// Captures data operand `index` of a validated definition.
    ///
    /// # Panics
    /// Panics if `index` is not an operand of `def`; validation guarantees
    /// every data operand of the kind exists.
    pub fn of(def: &OpDef<Validated>, index: usize) -> Self {
        Self::new(OperandId(index), &def.operands[index])
    }

    pub fn operand(&self) -> OperandId {
        self.operand
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn get(&self, i: usize) -> &IndexExpr {
        &self.dims[i]
    }

    pub fn dims(&self) -> &[IndexExpr] {
        &self.dims
    }

    pub fn into_dims(self) -> Vec<IndexExpr> {
        self.dims
    }
}

/// The entries of a shape-valued operand.
///
/// Constants become literals; run-time operands become `load(operand, j)`
/// placeholders, one per entry of the declared length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCapture {
    values: Vec<IndexExpr>,
}

impl ValueCapture {
    pub fn new(def: &OpDef<Validated>, value: &ValueOperand) -> Self {
        let values = match value {
            ValueOperand::Constant(values) => values.iter().map(|&v| IndexExpr::lit(v)).collect(),
            ValueOperand::Runtime(id) => (0..def.value_len(value))
                .map(|j| IndexExpr::load(*id, j))
                .collect(),
        };
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, j: usize) -> Option<&IndexExpr> {
        self.values.get(j)
    }

    pub fn values(&self) -> &[IndexExpr] {
        &self.values
    }

    /// The single entry of a scalar-valued operand.
    pub fn scalar(&self) -> Option<&IndexExpr> {
        match self.values.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// All entries, if every one is literal.
    pub fn as_literals(&self) -> Option<Vec<i64>> {
        self.values.iter().map(IndexExpr::as_literal).collect()
    }
}
