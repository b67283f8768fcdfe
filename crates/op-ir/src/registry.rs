// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The operator registration table.
//!
//! Each supported kind appears exactly once. Shape inference and lowering
//! both dispatch on [`OpKind`], so adding a kind means adding a row here
//! and a match arm in each of them.

use crate::OpKind;

/// Static facts about one operator kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpSchema {
    pub kind: OpKind,
    /// Number of leading operands holding data (value operands follow).
    pub data_operands: usize,
    pub outputs: usize,
    pub summary: &'static str,
}

pub const REGISTRY: &[OpSchema] = &[
    OpSchema {
        kind: OpKind::MatMul,
        data_operands: 2,
        outputs: 1,
        summary: "matrix product with batch broadcasting",
    },
    OpSchema {
        kind: OpKind::TopK,
        data_operands: 1,
        outputs: 2,
        summary: "k extreme values along an axis and their indices",
    },
    OpSchema {
        kind: OpKind::Slice,
        data_operands: 1,
        outputs: 1,
        summary: "strided sub-range selection",
    },
    OpSchema {
        kind: OpKind::ReduceSum,
        data_operands: 1,
        outputs: 1,
        summary: "sum over axes",
    },
    OpSchema {
        kind: OpKind::ReduceMean,
        data_operands: 1,
        outputs: 1,
        summary: "mean over axes",
    },
    OpSchema {
        kind: OpKind::ReduceMax,
        data_operands: 1,
        outputs: 1,
        summary: "maximum over axes",
    },
    OpSchema {
        kind: OpKind::ReduceMin,
        data_operands: 1,
        outputs: 1,
        summary: "minimum over axes",
    },
    OpSchema {
        kind: OpKind::ReduceProd,
        data_operands: 1,
        outputs: 1,
        summary: "product over axes",
    },
    OpSchema {
        kind: OpKind::ConstantOfShape,
        data_operands: 0,
        outputs: 1,
        summary: "tensor of a given shape filled with one value",
    },
];

/// Looks up the schema of a kind.
pub fn schema(kind: OpKind) -> &'static OpSchema {
    REGISTRY
        .iter()
        .find(|s| s.kind == kind)
        .unwrap_or_else(|| unreachable!("every OpKind has a registry row"))
}

/// Looks up a schema by (loosely matched) kind name.
pub fn lookup(name: &str) -> Option<&'static OpSchema> {
    OpKind::from_str_loose(name).map(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_each_kind_registered_once() {
        let kinds: HashSet<OpKind> = REGISTRY.iter().map(|s| s.kind).collect();
        assert_eq!(kinds.len(), REGISTRY.len());
        assert_eq!(REGISTRY.len(), 9);
    }

    #[test]
    fn test_schema_facts() {
        assert_eq!(schema(OpKind::MatMul).data_operands, 2);
        assert_eq!(schema(OpKind::TopK).outputs, 2);
        assert_eq!(schema(OpKind::ConstantOfShape).data_operands, 0);
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(lookup("Slice").map(|s| s.kind), Some(OpKind::Slice));
        assert!(lookup("gather").is_none());
    }
}
