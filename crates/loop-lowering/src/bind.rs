// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Run-time bindings taken from bound operand descriptors.

use crate::LoweringError;
use index_expr::{Bindings, OperandId};
use op_ir::{OpDef, Validated};
use tensor_core::{DType, TensorDescriptor};

/// Binds every operand's sizes, and the contents of every operand used as
/// a shape value, so symbolic extents can be evaluated.
pub fn bind_operands(
    def: &OpDef<Validated>,
    operands: &[&TensorDescriptor<'_>],
) -> Result<Bindings, LoweringError> {
    let mut env = Bindings::new();
    for (i, desc) in operands.iter().enumerate() {
        env.bind_shape(OperandId(i), desc.sizes());
    }

    for value in def.operator.value_operands() {
        let Some(id) = value.runtime_operand() else {
            continue;
        };
        let desc = operands
            .get(id.0)
            .ok_or(op_ir::OpError::OperandCount {
                op: def.name.clone(),
                expected: id.0 + 1,
                actual: operands.len(),
            })?;
        let values = read_integers(id, desc)?;
        tracing::trace!("bound {id} = {values:?}");
        env.bind_values(id, &values);
    }

    Ok(env)
}

/// Reads an integer operand in logical order.
fn read_integers(id: OperandId, desc: &TensorDescriptor<'_>) -> Result<Vec<i64>, LoweringError> {
    fn widen<T: Into<i64>>(v: Vec<T>) -> Vec<i64> {
        v.into_iter().map(Into::into).collect()
    }

    let values = match desc.dtype() {
        DType::I8 => widen(desc.to_vec::<i8>()?),
        DType::I16 => widen(desc.to_vec::<i16>()?),
        DType::I32 => widen(desc.to_vec::<i32>()?),
        DType::I64 => desc.to_vec::<i64>()?,
        DType::U8 => widen(desc.to_vec::<u8>()?),
        DType::U16 => widen(desc.to_vec::<u16>()?),
        DType::U32 => widen(desc.to_vec::<u32>()?),
        DType::U64 => desc
            .to_vec::<u64>()?
            .into_iter()
            .map(|v| {
                i64::try_from(v).map_err(|_| LoweringError::ValueOutOfRange {
                    operand: id.0,
                    value: v,
                })
            })
            .collect::<Result<_, _>>()?,
        other => {
            return Err(LoweringError::UnsupportedDType {
                op: format!("shape value {id}"),
                dtype: other,
            })
        }
    };
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use op_ir::{Dim, Operator, TensorType, ValueOperand};

    fn topk_def(k_type: DType) -> OpDef<Validated> {
        OpDef::new(
            "topk",
            Operator::TopK {
                axis: 0,
                k: ValueOperand::Runtime(OperandId(1)),
                largest: true,
                sorted: true,
            },
            vec![
                TensorType::new(DType::F32, vec![Dim::Dynamic]),
                TensorType::of_static(k_type, &[1]),
            ],
        )
        .validate()
        .unwrap()
    }

    #[test]
    fn test_binds_sizes_and_values() {
        let def = topk_def(DType::I32);
        let x = TensorDescriptor::create(DType::F32, [7]).unwrap();
        let k = TensorDescriptor::from_slice::<i32>([1], &[3]).unwrap();
        let env = bind_operands(&def, &[&x, &k]).unwrap();
        assert_eq!(env.dim(OperandId(0), 0), Some(7));
        assert_eq!(env.dim(OperandId(1), 0), Some(1));
        assert_eq!(env.value(OperandId(1), 0), Some(3));
    }

    #[test]
    fn test_unsigned_values() {
        let def = topk_def(DType::U64);
        let x = TensorDescriptor::create(DType::F32, [7]).unwrap();
        let k = TensorDescriptor::from_slice::<u64>([1], &[2]).unwrap();
        let env = bind_operands(&def, &[&x, &k]).unwrap();
        assert_eq!(env.value(OperandId(1), 0), Some(2));

        let k = TensorDescriptor::from_slice::<u64>([1], &[u64::MAX]).unwrap();
        assert!(matches!(
            bind_operands(&def, &[&x, &k]),
            Err(LoweringError::ValueOutOfRange { operand: 1, .. })
        ));
    }

    #[test]
    fn test_constant_values_are_not_bound() {
        let def = OpDef::new(
            "topk",
            Operator::TopK {
                axis: 0,
                k: ValueOperand::Constant(vec![2]),
                largest: true,
                sorted: true,
            },
            vec![TensorType::of_static(DType::F32, &[4])],
        )
        .validate()
        .unwrap();
        let x = TensorDescriptor::create(DType::F32, [4]).unwrap();
        let env = bind_operands(&def, &[&x]).unwrap();
        assert_eq!(env.len(), 1);
    }
}
