// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Broadcast padding shared by every broadcasting operator.
//!
//! An operand shape is padded with virtual size-1 dimensions until both
//! operands have equal rank. Each padded dimension is flagged so lowering
//! can leave it out of the operand's access function: the operand has no
//! such dimension in memory.

use crate::{Constraint, ShapeInferenceError};
use index_expr::IndexExpr;

/// An operand shape with synthesized dimensions marked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedShape {
    dims: Vec<IndexExpr>,
    padded: Vec<bool>,
}

impl PaddedShape {
    /// A shape with no padded dimensions.
    pub fn new(dims: Vec<IndexExpr>) -> Self {
        let padded = vec![false; dims.len()];
        Self { dims, padded }
    }

    /// Pads on the left with size-1 dimensions until the rank is `rank`.
    /// A shape already at or above `rank` is returned unchanged.
    pub fn pad_leading(self, rank: usize) -> Self {
        let missing = rank.saturating_sub(self.dims.len());
        let mut dims = vec![IndexExpr::lit(1); missing];
        let mut padded = vec![true; missing];
        dims.extend(self.dims);
        padded.extend(self.padded);
        Self { dims, padded }
    }

    /// Appends one size-1 dimension.
    pub fn pad_trailing(mut self) -> Self {
        self.dims.push(IndexExpr::lit(1));
        self.padded.push(true);
        self
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[IndexExpr] {
        &self.dims
    }

    pub fn dim(&self, i: usize) -> &IndexExpr {
        &self.dims[i]
    }

    pub fn is_padded(&self, i: usize) -> bool {
        self.padded[i]
    }

    pub fn padded(&self) -> &[bool] {
        &self.padded
    }

    /// Rank of the operand before padding.
    pub fn real_rank(&self) -> usize {
        self.padded.iter().filter(|&&p| !p).count()
    }

    /// Position in the unpadded operand of padded dimension `i`, or `None`
    /// if `i` was synthesized.
    pub fn operand_axis(&self, i: usize) -> Option<usize> {
        if self.padded[i] {
            None
        } else {
            Some(self.padded[..i].iter().filter(|&&p| !p).count())
        }
    }
}

/// Pads the lower-rank shape on the left so both have the same rank.
pub fn pad_to_common_rank(a: PaddedShape, b: PaddedShape) -> (PaddedShape, PaddedShape) {
    let rank = a.rank().max(b.rank());
    (a.pad_leading(rank), b.pad_leading(rank))
}

/// The broadcast size of dimension `dim` given both operand sizes.
///
/// Literal sizes are decided here: equal sizes or a side of 1 broadcast,
/// anything else fails. When a side is symbolic the result is chosen
/// without failing and a [`Constraint::Broadcast`] is recorded:
/// a literal 1 takes the other side, a literal other than 1 wins, and two
/// different symbolic sizes give `rhs` when `lhs` is 1 and `lhs` otherwise,
/// so 0 against 1 broadcasts to 0.
pub fn broadcast_dim(
    dim: usize,
    lhs: &IndexExpr,
    rhs: &IndexExpr,
    constraints: &mut Vec<Constraint>,
) -> Result<IndexExpr, ShapeInferenceError> {
    match (lhs.as_literal(), rhs.as_literal()) {
        (Some(l), Some(r)) => {
            if l == r || r == 1 {
                Ok(lhs.clone())
            } else if l == 1 {
                Ok(rhs.clone())
            } else {
                Err(ShapeInferenceError::BroadcastMismatch { dim, lhs: l, rhs: r })
            }
        }
        (Some(1), None) => Ok(rhs.clone()),
        (None, Some(1)) => Ok(lhs.clone()),
        _ if lhs == rhs => Ok(lhs.clone()),
        (l, r) => {
            constraints.push(Constraint::Broadcast {
                dim,
                lhs: lhs.clone(),
                rhs: rhs.clone(),
            });
            Ok(match (l, r) {
                (Some(_), None) => lhs.clone(),
                (None, Some(_)) => rhs.clone(),
                _ => IndexExpr::select(lhs.clone().eq_expr(1), rhs.clone(), lhs.clone()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use index_expr::{Bindings, OperandId};

    fn lits(sizes: &[i64]) -> Vec<IndexExpr> {
        sizes.iter().map(|&s| IndexExpr::lit(s)).collect()
    }

    #[test]
    fn test_pad_leading() {
        let s = PaddedShape::new(lits(&[5, 4])).pad_leading(4);
        assert_eq!(s.rank(), 4);
        assert_eq!(s.padded(), &[true, true, false, false]);
        assert_eq!(s.dim(0).as_literal(), Some(1));
        assert_eq!(s.real_rank(), 2);
        assert_eq!(s.operand_axis(1), None);
        assert_eq!(s.operand_axis(2), Some(0));
        assert_eq!(s.operand_axis(3), Some(1));
    }

    #[test]
    fn test_pad_leading_never_truncates() {
        let s = PaddedShape::new(lits(&[2, 3, 4])).pad_leading(2);
        assert_eq!(s.rank(), 3);
        assert!(s.padded().iter().all(|&p| !p));
    }

    #[test]
    fn test_vector_padding_both_sides() {
        // A 1-D right operand is (K, 1) before batch padding.
        let s = PaddedShape::new(lits(&[5])).pad_trailing().pad_leading(3);
        assert_eq!(s.padded(), &[true, false, true]);
        assert_eq!(s.operand_axis(1), Some(0));
        assert_eq!(s.real_rank(), 1);
    }

    #[test]
    fn test_common_rank() {
        let (a, b) = pad_to_common_rank(
            PaddedShape::new(lits(&[1, 5])),
            PaddedShape::new(lits(&[10, 5, 4])),
        );
        assert_eq!(a.rank(), 3);
        assert_eq!(b.rank(), 3);
        assert_eq!(a.padded(), &[true, false, false]);
        assert_eq!(b.padded(), &[false, false, false]);
    }

    #[test]
    fn test_broadcast_literals() {
        let mut c = Vec::new();
        let one = IndexExpr::lit(1);
        let ten = IndexExpr::lit(10);
        assert_eq!(broadcast_dim(0, &one, &ten, &mut c).unwrap(), ten);
        assert_eq!(broadcast_dim(0, &ten, &one, &mut c).unwrap(), ten);
        assert_eq!(broadcast_dim(0, &ten, &ten, &mut c).unwrap(), ten);
        assert!(matches!(
            broadcast_dim(2, &ten, &IndexExpr::lit(3), &mut c),
            Err(ShapeInferenceError::BroadcastMismatch { dim: 2, lhs: 10, rhs: 3 })
        ));
        assert!(c.is_empty());
    }

    #[test]
    fn test_broadcast_symbolic() {
        let mut c = Vec::new();
        let n = IndexExpr::dim(OperandId(0), 0);
        let m = IndexExpr::dim(OperandId(1), 0);

        assert_eq!(broadcast_dim(0, &IndexExpr::lit(1), &n, &mut c).unwrap(), n);
        assert_eq!(broadcast_dim(0, &n, &n, &mut c).unwrap(), n);
        assert!(c.is_empty());

        assert_eq!(
            broadcast_dim(0, &n, &IndexExpr::lit(7), &mut c).unwrap(),
            IndexExpr::lit(7)
        );
        let both = broadcast_dim(1, &n, &m, &mut c).unwrap();
        assert_eq!(
            both,
            IndexExpr::select(n.clone().eq_expr(1), m.clone(), n.clone())
        );
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_broadcast_symbolic_sizes_at_runtime() {
        let n = IndexExpr::dim(OperandId(0), 0);
        let m = IndexExpr::dim(OperandId(1), 0);
        let mut c = Vec::new();
        let out = broadcast_dim(0, &n, &m, &mut c).unwrap();

        for (l, r, expected) in [(0, 1, 0), (1, 0, 0), (1, 3, 3), (3, 1, 3), (3, 3, 3), (1, 1, 1)] {
            let mut env = Bindings::new();
            env.bind_dim(OperandId(0), 0, l);
            env.bind_dim(OperandId(1), 0, r);
            assert_eq!(out.evaluate(&env).unwrap(), expected, "{l} vs {r}");
            assert!(c.iter().all(|k| k.check(&env).is_ok()));
        }

        let mut env = Bindings::new();
        env.bind_dim(OperandId(0), 0, 2);
        env.bind_dim(OperandId(1), 0, 3);
        assert!(matches!(
            c[0].check(&env),
            Err(ShapeInferenceError::BroadcastMismatch { dim: 0, lhs: 2, rhs: 3 })
        ));
    }
}
