// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operand types: element kind plus static or dynamic dimensions.

use crate::OpError;
use index_expr::OperandId;
use std::fmt;
use tensor_core::{DType, TensorDescriptor};

/// One dimension of an operand type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dim {
    /// Known while lowering.
    Static(usize),
    /// Known only once the operand is bound.
    Dynamic,
}

impl Dim {
    pub fn as_static(self) -> Option<usize> {
        match self {
            Dim::Static(n) => Some(n),
            Dim::Dynamic => None,
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Static(n) => write!(f, "{n}"),
            Dim::Dynamic => f.write_str("?"),
        }
    }
}

/// The declared type of an operand.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TensorType {
    pub dtype: DType,
    pub dims: Vec<Dim>,
}

impl TensorType {
    pub fn new(dtype: DType, dims: Vec<Dim>) -> Self {
        Self { dtype, dims }
    }

    /// A type whose dimensions are all known.
    pub fn of_static(dtype: DType, sizes: &[usize]) -> Self {
        Self {
            dtype,
            dims: sizes.iter().map(|&n| Dim::Static(n)).collect(),
        }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn dim(&self, index: usize) -> Option<Dim> {
        self.dims.get(index).copied()
    }

    pub fn is_static(&self) -> bool {
        self.dims.iter().all(|d| matches!(d, Dim::Static(_)))
    }

    /// All sizes, if every dimension is static.
    pub fn static_sizes(&self) -> Option<Vec<usize>> {
        self.dims.iter().map(|d| d.as_static()).collect()
    }

    /// Checks that `desc` conforms to this type: same element kind, same
    /// rank, and equal sizes wherever a dimension is static.
    pub fn check(&self, operand: OperandId, desc: &TensorDescriptor<'_>) -> Result<(), OpError> {
        let mismatch = |detail: String| OpError::OperandMismatch {
            operand,
            expected: self.to_string(),
            detail,
        };

        if desc.dtype() != self.dtype {
            return Err(mismatch(format!("element kind is {}", desc.dtype())));
        }
        if desc.rank() != self.rank() {
            return Err(mismatch(format!("rank is {}", desc.rank())));
        }
        for (i, (dim, &actual)) in self.dims.iter().zip(desc.sizes()).enumerate() {
            if let Dim::Static(expected) = *dim {
                if expected != actual {
                    return Err(mismatch(format!(
                        "dimension {i} is {actual}, declared {expected}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.dtype)?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let ty = TensorType::new(DType::F32, vec![Dim::Static(4), Dim::Dynamic]);
        assert_eq!(ty.to_string(), "f32[4, ?]");
        assert_eq!(TensorType::of_static(DType::I64, &[]).to_string(), "i64[]");
    }

    #[test]
    fn test_static_sizes() {
        assert_eq!(
            TensorType::of_static(DType::F32, &[2, 3]).static_sizes(),
            Some(vec![2, 3])
        );
        let dynamic = TensorType::new(DType::F32, vec![Dim::Dynamic, Dim::Static(3)]);
        assert!(!dynamic.is_static());
        assert_eq!(dynamic.static_sizes(), None);
    }

    #[test]
    fn test_check_accepts_dynamic_dims() {
        let ty = TensorType::new(DType::F32, vec![Dim::Dynamic, Dim::Static(3)]);
        let desc = TensorDescriptor::create(DType::F32, [7, 3]).unwrap();
        assert!(ty.check(OperandId(0), &desc).is_ok());
    }

    #[test]
    fn test_check_rejects_mismatches() {
        let ty = TensorType::of_static(DType::F32, &[2, 3]);

        let wrong_kind = TensorDescriptor::create(DType::F64, [2, 3]).unwrap();
        assert!(matches!(
            ty.check(OperandId(1), &wrong_kind),
            Err(OpError::OperandMismatch { operand: OperandId(1), .. })
        ));

        let wrong_rank = TensorDescriptor::create(DType::F32, [6]).unwrap();
        assert!(ty.check(OperandId(0), &wrong_rank).is_err());

        let wrong_size = TensorDescriptor::create(DType::F32, [2, 4]).unwrap();
        let err = ty.check(OperandId(0), &wrong_size).unwrap_err();
        assert!(err.to_string().contains("dimension 1 is 4"));
    }

    #[test]
    fn test_serde() {
        let ty = TensorType::new(DType::F16, vec![Dim::Static(8), Dim::Dynamic]);
        let json = serde_json::to_string(&ty).unwrap();
        assert_eq!(json, r#"{"dtype":"f16","dims":[{"static":8},"dynamic"]}"#);
        let back: TensorType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ty);
    }
}
