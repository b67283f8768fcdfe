// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A single operator with its operand types.
//!
//! # Type-State Pattern
//!
//! ```text
//! OpDef<Unchecked>: operator and operand types as supplied.
//!       │  .validate()
//!       ▼
//! OpDef<Validated>: arity, operand kinds and value-operand references
//!                   checked; ready for shape inference and lowering.
//! ```
//!
//! Shape inference and lowering only accept `OpDef<Validated>`.

use crate::registry::{self, OpSchema};
use crate::{Dim, OpError, OpKind, Operator, TensorType, ValueOperand};
use index_expr::OperandId;
use std::collections::BTreeSet;
use std::fmt;
use tensor_core::{DType, TensorDescriptor};

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: definition has not been checked.
#[derive(Debug, Clone)]
pub struct Unchecked;

/// Marker: definition has been checked.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for definition states.
pub trait DefState: fmt::Debug + Clone {}
impl DefState for Unchecked {}
impl DefState for Validated {}

// ── OpDef ──────────────────────────────────────────────────────────

/// An operator applied to typed operands.
///
/// Operands are ordered: the data operands the registry lists for the
/// kind come first, followed by any operands referenced by
/// [`ValueOperand::Runtime`].
#[derive(Debug, Clone)]
pub struct OpDef<S: DefState = Unchecked> {
    pub name: String,
    pub operator: Operator,
    pub operands: Vec<TensorType>,
    _state: std::marker::PhantomData<S>,
}

// ── Unchecked state ────────────────────────────────────────────────

impl OpDef<Unchecked> {
    pub fn new(name: impl Into<String>, operator: Operator, operands: Vec<TensorType>) -> Self {
        Self {
            name: name.into(),
            operator,
            operands,
            _state: std::marker::PhantomData,
        }
    }

    /// Checks the definition and transitions to the `Validated` state.
    ///
    /// # Checks
    /// - At least the kind's data operands are present.
    /// - Every runtime value operand refers to an operand past the data
    ///   operands, of integer kind, rank 0 or 1, with a static length.
    /// - Every operand past the data operands is referenced.
    /// - Data operands have the element kinds and ranks the kind needs.
    /// - Slice starts, ends, axes and steps have equal lengths.
    pub fn validate(self) -> Result<OpDef<Validated>, OpError> {
        let schema = registry::schema(self.operator.kind());
        let invalid = |detail: String| OpError::InvalidOperator {
            op: self.name.clone(),
            detail,
        };

        if self.operands.len() < schema.data_operands {
            return Err(OpError::OperandCount {
                op: self.name.clone(),
                expected: schema.data_operands,
                actual: self.operands.len(),
            });
        }

        let mut referenced = BTreeSet::new();
        for value in self.operator.value_operands() {
            match value {
                ValueOperand::Constant(_) => {}
                ValueOperand::Runtime(id) => {
                    let Some(ty) = self.operands.get(id.0) else {
                        return Err(invalid(format!("value operand {id} does not exist")));
                    };
                    if id.0 < schema.data_operands {
                        return Err(invalid(format!(
                            "value operand {id} overlaps the data operands"
                        )));
                    }
                    if !ty.dtype.is_integer() {
                        return Err(invalid(format!("value operand {id} has element kind {}", ty.dtype)));
                    }
                    if ty.rank() > 1 {
                        return Err(invalid(format!("value operand {id} has rank {}", ty.rank())));
                    }
                    if !ty.is_static() {
                        return Err(invalid(format!("value operand {id} has a dynamic length")));
                    }
                    referenced.insert(id.0);
                }
            }
        }
        for index in schema.data_operands..self.operands.len() {
            if !referenced.contains(&index) {
                return Err(invalid(format!("operand {} is never used", OperandId(index))));
            }
        }

        let data = &self.operands[..schema.data_operands];
        match &self.operator {
            Operator::MatMul => {
                let (a, b) = (&data[0], &data[1]);
                if a.dtype != b.dtype {
                    return Err(invalid(format!(
                        "operand element kinds differ: {} vs {}",
                        a.dtype, b.dtype
                    )));
                }
                if a.dtype == DType::Bool {
                    return Err(invalid("matmul does not support bool".into()));
                }
                if a.rank() == 0 || b.rank() == 0 {
                    return Err(invalid("matmul operands must have rank >= 1".into()));
                }
            }
            Operator::TopK { .. } => {
                if data[0].dtype == DType::Bool {
                    return Err(invalid("top-k does not support bool".into()));
                }
                if data[0].rank() == 0 {
                    return Err(invalid("top-k input must have rank >= 1".into()));
                }
            }
            Operator::Reduce { .. } => {
                if data[0].dtype == DType::Bool {
                    return Err(invalid("reductions do not support bool".into()));
                }
            }
            Operator::Slice {
                starts,
                ends,
                axes,
                steps,
            } => {
                let expected = self.value_len(starts);
                let mut lengths = vec![("ends", self.value_len(ends))];
                if let Some(axes) = axes {
                    lengths.push(("axes", self.value_len(axes)));
                }
                if let Some(steps) = steps {
                    lengths.push(("steps", self.value_len(steps)));
                }
                for (what, len) in lengths {
                    if len != expected {
                        return Err(invalid(format!(
                            "slice {what} has {len} entries, starts has {expected}"
                        )));
                    }
                }
            }
            Operator::ConstantOfShape { .. } => {}
        }

        tracing::debug!(
            "validated '{}' ({}) with {} operands",
            self.name,
            schema.kind,
            self.operands.len()
        );

        Ok(OpDef {
            name: self.name,
            operator: self.operator,
            operands: self.operands,
            _state: std::marker::PhantomData,
        })
    }
}

// ── Any state ──────────────────────────────────────────────────────

impl<S: DefState> OpDef<S> {
    pub fn kind(&self) -> OpKind {
        self.operator.kind()
    }

    pub fn schema(&self) -> &'static OpSchema {
        registry::schema(self.kind())
    }

    pub fn operand(&self, id: OperandId) -> Option<&TensorType> {
        self.operands.get(id.0)
    }

    /// Number of entries a value operand carries.
    ///
    /// Runtime operands are sized from their declared type; an operand that
    /// does not exist or has a dynamic length counts as zero.
    pub fn value_len(&self, value: &ValueOperand) -> usize {
        match value {
            ValueOperand::Constant(values) => values.len(),
            ValueOperand::Runtime(id) => match self.operand(*id) {
                Some(ty) if ty.rank() == 0 => 1,
                Some(ty) => ty.dim(0).and_then(Dim::as_static).unwrap_or(0),
                None => 0,
            },
        }
    }
}

// ── Validated state ────────────────────────────────────────────────

impl OpDef<Validated> {
    pub fn num_outputs(&self) -> usize {
        self.schema().outputs
    }

    pub fn num_data_operands(&self) -> usize {
        self.schema().data_operands
    }

    /// Checks bound descriptors against the declared operand types.
    pub fn check_operands(&self, operands: &[&TensorDescriptor<'_>]) -> Result<(), OpError> {
        if operands.len() != self.operands.len() {
            return Err(OpError::OperandCount {
                op: self.name.clone(),
                expected: self.operands.len(),
                actual: operands.len(),
            });
        }
        for (i, (ty, desc)) in self.operands.iter().zip(operands).enumerate() {
            ty.check(OperandId(i), desc)?;
        }
        Ok(())
    }

    /// Returns a summary string describing the definition.
    pub fn summary(&self) -> String {
        let operands: Vec<String> = self.operands.iter().map(|t| t.to_string()).collect();
        format!(
            "Op '{}': {} ({}) -> {} output(s)",
            self.name,
            self.kind(),
            operands.join(", "),
            self.num_outputs(),
        )
    }
}
