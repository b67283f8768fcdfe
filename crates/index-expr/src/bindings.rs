// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Run-time values for the symbolic leaves of index expressions.

use crate::OperandId;
use std::collections::HashMap;

/// Concrete values for symbols, operand dimensions and loaded data-operand
/// elements.
///
/// Built once per lowering call from the operands actually supplied, then
/// used to evaluate loop bounds and access offsets.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    symbols: HashMap<String, i64>,
    dims: HashMap<(OperandId, usize), i64>,
    values: HashMap<(OperandId, usize), i64>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_symbol(&mut self, name: impl Into<String>, value: i64) {
        self.symbols.insert(name.into(), value);
    }

    pub fn bind_dim(&mut self, operand: OperandId, dim: usize, size: i64) {
        self.dims.insert((operand, dim), size);
    }

    /// Binds every dimension of `operand` from its concrete sizes.
    pub fn bind_shape(&mut self, operand: OperandId, sizes: &[usize]) {
        for (dim, &size) in sizes.iter().enumerate() {
            self.bind_dim(operand, dim, size as i64);
        }
    }

    /// Binds the elements of a rank-1 data operand.
    pub fn bind_values(&mut self, operand: OperandId, values: &[i64]) {
        for (index, &value) in values.iter().enumerate() {
            self.values.insert((operand, index), value);
        }
    }

    pub fn symbol(&self, name: &str) -> Option<i64> {
        self.symbols.get(name).copied()
    }

    pub fn dim(&self, operand: OperandId, dim: usize) -> Option<i64> {
        self.dims.get(&(operand, dim)).copied()
    }

    pub fn value(&self, operand: OperandId, index: usize) -> Option<i64> {
        self.values.get(&(operand, index)).copied()
    }

    /// Number of bound leaves of every kind.
    pub fn len(&self) -> usize {
        self.symbols.len() + self.dims.len() + self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
