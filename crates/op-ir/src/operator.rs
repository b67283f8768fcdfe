// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator kinds and their attributes.

use index_expr::OperandId;
use tensor_core::DType;

/// The closed set of operator kinds this crate can resolve and lower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    MatMul,
    TopK,
    Slice,
    ReduceSum,
    ReduceMean,
    ReduceMax,
    ReduceMin,
    ReduceProd,
    ConstantOfShape,
}

impl OpKind {
    /// Parses a kind from its snake_case name or a common alias.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "matmul" | "mat_mul" | "gemm_nd" => Some(Self::MatMul),
            "topk" | "top_k" => Some(Self::TopK),
            "slice" => Some(Self::Slice),
            "reduce_sum" | "reducesum" | "sum" => Some(Self::ReduceSum),
            "reduce_mean" | "reducemean" | "mean" => Some(Self::ReduceMean),
            "reduce_max" | "reducemax" | "max" => Some(Self::ReduceMax),
            "reduce_min" | "reducemin" | "min" => Some(Self::ReduceMin),
            "reduce_prod" | "reduceprod" | "prod" => Some(Self::ReduceProd),
            "constant_of_shape" | "constantofshape" => Some(Self::ConstantOfShape),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MatMul => "mat_mul",
            Self::TopK => "top_k",
            Self::Slice => "slice",
            Self::ReduceSum => "reduce_sum",
            Self::ReduceMean => "reduce_mean",
            Self::ReduceMax => "reduce_max",
            Self::ReduceMin => "reduce_min",
            Self::ReduceProd => "reduce_prod",
            Self::ConstantOfShape => "constant_of_shape",
        }
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The combining function of a reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReduceKind {
    Sum,
    Mean,
    Max,
    Min,
    Prod,
}

impl ReduceKind {
    pub fn op_kind(self) -> OpKind {
        match self {
            ReduceKind::Sum => OpKind::ReduceSum,
            ReduceKind::Mean => OpKind::ReduceMean,
            ReduceKind::Max => OpKind::ReduceMax,
            ReduceKind::Min => OpKind::ReduceMin,
            ReduceKind::Prod => OpKind::ReduceProd,
        }
    }
}

/// An integer vector an operator needs to compute its output shape.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOperand {
    /// Known while lowering.
    Constant(Vec<i64>),
    /// Read from a rank-1 integer operand when the operator runs.
    Runtime(OperandId),
}

impl ValueOperand {
    pub fn runtime_operand(&self) -> Option<OperandId> {
        match self {
            ValueOperand::Constant(_) => None,
            ValueOperand::Runtime(id) => Some(*id),
        }
    }
}

/// An operator and its attributes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operator {
    /// Numpy-style matrix product with batch broadcasting.
    MatMul,
    /// The `k` largest (or smallest) entries along `axis`, with their
    /// positions.
    TopK {
        axis: i64,
        k: ValueOperand,
        #[serde(default = "default_true")]
        largest: bool,
        #[serde(default = "default_true")]
        sorted: bool,
    },
    /// Strided sub-range selection.
    Slice {
        starts: ValueOperand,
        ends: ValueOperand,
        #[serde(default)]
        axes: Option<ValueOperand>,
        #[serde(default)]
        steps: Option<ValueOperand>,
    },
    /// Reduction over `axes`; no axes means every axis unless
    /// `noop_with_empty_axes` is set.
    Reduce {
        kind: ReduceKind,
        #[serde(default)]
        axes: Option<Vec<i64>>,
        #[serde(default = "default_true")]
        keepdims: bool,
        #[serde(default)]
        noop_with_empty_axes: bool,
    },
    /// A tensor of `shape` filled with `value`.
    ConstantOfShape {
        shape: ValueOperand,
        #[serde(default)]
        value: f64,
        #[serde(default = "default_dtype")]
        dtype: DType,
    },
}

fn default_true() -> bool {
    true
}

fn default_dtype() -> DType {
    DType::F32
}

impl Operator {
    pub fn kind(&self) -> OpKind {
        match self {
            Operator::MatMul => OpKind::MatMul,
            Operator::TopK { .. } => OpKind::TopK,
            Operator::Slice { .. } => OpKind::Slice,
            Operator::Reduce { kind, .. } => kind.op_kind(),
            Operator::ConstantOfShape { .. } => OpKind::ConstantOfShape,
        }
    }

    /// Every shape-valued input, in attribute order.
    pub fn value_operands(&self) -> Vec<&ValueOperand> {
        match self {
            Operator::MatMul | Operator::Reduce { .. } => Vec::new(),
            Operator::TopK { k, .. } => vec![k],
            Operator::Slice {
                starts,
                ends,
                axes,
                steps,
            } => [Some(starts), Some(ends), axes.as_ref(), steps.as_ref()]
                .into_iter()
                .flatten()
                .collect(),
            Operator::ConstantOfShape { shape, .. } => vec![shape],
        }
    }
}
