// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The index-expression tree and its folding constructors.

use crate::{Bindings, IndexExprError};
use std::fmt;

/// Position of an operand in an operator's operand list.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct OperandId(pub usize);

impl fmt::Display for OperandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Binary operators over index expressions.
///
/// Comparisons produce `1` for true and `0` for false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    FloorDiv,
    CeilDiv,
    Rem,
    Min,
    Max,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl BinOp {
    /// Applies the operator to two integers. `None` on division by zero.
    pub fn apply(self, a: i64, b: i64) -> Option<i64> {
        let value = match self {
            BinOp::Add => a.wrapping_add(b),
            BinOp::Sub => a.wrapping_sub(b),
            BinOp::Mul => a.wrapping_mul(b),
            BinOp::FloorDiv => floor_div(a, b)?,
            BinOp::CeilDiv => floor_div(a.wrapping_neg(), b)?.wrapping_neg(),
            BinOp::Rem => a.checked_rem_euclid(b)?,
            BinOp::Min => a.min(b),
            BinOp::Max => a.max(b),
            BinOp::Lt => i64::from(a < b),
            BinOp::Le => i64::from(a <= b),
            BinOp::Gt => i64::from(a > b),
            BinOp::Ge => i64::from(a >= b),
            BinOp::Eq => i64::from(a == b),
            BinOp::Ne => i64::from(a != b),
        };
        Some(value)
    }

    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::FloorDiv => "floordiv",
            BinOp::CeilDiv => "ceildiv",
            BinOp::Rem => "mod",
            BinOp::Min => "min",
            BinOp::Max => "max",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
        }
    }

    fn is_infix(self) -> bool {
        !matches!(
            self,
            BinOp::FloorDiv | BinOp::CeilDiv | BinOp::Rem | BinOp::Min | BinOp::Max
        )
    }
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    if b == 0 {
        return None;
    }
    let q = a.wrapping_div(b);
    if a.wrapping_rem(b) != 0 && ((a < 0) != (b < 0)) {
        Some(q.wrapping_sub(1))
    } else {
        Some(q)
    }
}

/// A dimension size, loop bound or element index.
///
/// Build composites through [`IndexExpr::binary`], the operator overloads
/// or the named methods; they all fold literal inputs immediately.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub enum IndexExpr {
    Literal(i64),
    /// A named run-time value such as a batch size.
    Symbol(String),
    /// Dimension `dim` of operand `operand`, known only at run time.
    Dim { operand: OperandId, dim: usize },
    /// Element `index` of a rank-1 integer data operand.
    Load { operand: OperandId, index: usize },
    Binary {
        op: BinOp,
        lhs: Box<IndexExpr>,
        rhs: Box<IndexExpr>,
    },
    /// `then` when `cond` is non-zero, otherwise `otherwise`.
    Select {
        cond: Box<IndexExpr>,
        then: Box<IndexExpr>,
        otherwise: Box<IndexExpr>,
    },
}

impl IndexExpr {
    pub fn lit(value: i64) -> Self {
        IndexExpr::Literal(value)
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        IndexExpr::Symbol(name.into())
    }

    pub fn dim(operand: OperandId, dim: usize) -> Self {
        IndexExpr::Dim { operand, dim }
    }

    pub fn load(operand: OperandId, index: usize) -> Self {
        IndexExpr::Load { operand, index }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, IndexExpr::Literal(_))
    }

    /// The literal value.
    ///
    /// # Panics
    /// Panics if the expression is not literal. Check
    /// [`is_literal`](Self::is_literal) first, or use
    /// [`as_literal`](Self::as_literal).
    pub fn literal(&self) -> i64 {
        match self {
            IndexExpr::Literal(v) => *v,
            other => panic!("literal() called on non-literal index expression {other}"),
        }
    }

    pub fn as_literal(&self) -> Option<i64> {
        match self {
            IndexExpr::Literal(v) => Some(*v),
            _ => None,
        }
    }

    /// Builds `lhs op rhs`, folding literals and trivial identities.
    pub fn binary(op: BinOp, lhs: IndexExpr, rhs: IndexExpr) -> IndexExpr {
        use IndexExpr::Literal;

        if let (Literal(a), Literal(b)) = (&lhs, &rhs) {
            if let Some(v) = op.apply(*a, *b) {
                return Literal(v);
            }
        }

        match (op, lhs.as_literal(), rhs.as_literal()) {
            (BinOp::Add, Some(0), _) => return rhs,
            (BinOp::Add | BinOp::Sub, _, Some(0)) => return lhs,
            (BinOp::Mul, Some(1), _) => return rhs,
            (BinOp::Mul, _, Some(1)) => return lhs,
            (BinOp::Mul, Some(0), _) | (BinOp::Mul, _, Some(0)) => return Literal(0),
            (BinOp::FloorDiv | BinOp::CeilDiv, _, Some(1)) => return lhs,
            _ => {}
        }

        if lhs == rhs {
            match op {
                BinOp::Sub => return Literal(0),
                BinOp::Min | BinOp::Max => return lhs,
                BinOp::Eq | BinOp::Le | BinOp::Ge => return Literal(1),
                BinOp::Ne | BinOp::Lt | BinOp::Gt => return Literal(0),
                _ => {}
            }
        }

        IndexExpr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// `then` if `cond` holds, otherwise `otherwise`. Folds when `cond` is
    /// literal or both branches are identical.
    pub fn select(cond: IndexExpr, then: IndexExpr, otherwise: IndexExpr) -> IndexExpr {
        if let Some(c) = cond.as_literal() {
            return if c != 0 { then } else { otherwise };
        }
        if then == otherwise {
            return then;
        }
        IndexExpr::Select {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn floor_div(self, rhs: impl Into<IndexExpr>) -> IndexExpr {
        Self::binary(BinOp::FloorDiv, self, rhs.into())
    }

    pub fn ceil_div(self, rhs: impl Into<IndexExpr>) -> IndexExpr {
        Self::binary(BinOp::CeilDiv, self, rhs.into())
    }

    /// Euclidean remainder.
    pub fn rem(self, rhs: impl Into<IndexExpr>) -> IndexExpr {
        Self::binary(BinOp::Rem, self, rhs.into())
    }

    pub fn min(self, rhs: impl Into<IndexExpr>) -> IndexExpr {
        Self::binary(BinOp::Min, self, rhs.into())
    }

    pub fn max(self, rhs: impl Into<IndexExpr>) -> IndexExpr {
        Self::binary(BinOp::Max, self, rhs.into())
    }

    /// Clamps into `[lo, hi]`.
    pub fn clamp(self, lo: impl Into<IndexExpr>, hi: impl Into<IndexExpr>) -> IndexExpr {
        self.max(lo).min(hi)
    }

    pub fn lt(self, rhs: impl Into<IndexExpr>) -> IndexExpr {
        Self::binary(BinOp::Lt, self, rhs.into())
    }

    pub fn le(self, rhs: impl Into<IndexExpr>) -> IndexExpr {
        Self::binary(BinOp::Le, self, rhs.into())
    }

    pub fn gt(self, rhs: impl Into<IndexExpr>) -> IndexExpr {
        Self::binary(BinOp::Gt, self, rhs.into())
    }

    pub fn ge(self, rhs: impl Into<IndexExpr>) -> IndexExpr {
        Self::binary(BinOp::Ge, self, rhs.into())
    }

    pub fn eq_expr(self, rhs: impl Into<IndexExpr>) -> IndexExpr {
        Self::binary(BinOp::Eq, self, rhs.into())
    }

    pub fn ne_expr(self, rhs: impl Into<IndexExpr>) -> IndexExpr {
        Self::binary(BinOp::Ne, self, rhs.into())
    }

    /// Computes the integer value using `env` for every symbolic leaf.
    pub fn evaluate(&self, env: &Bindings) -> Result<i64, IndexExprError> {
        match self {
            IndexExpr::Literal(v) => Ok(*v),
            IndexExpr::Symbol(name) => env
                .symbol(name)
                .ok_or_else(|| IndexExprError::UnboundSymbol(name.clone())),
            IndexExpr::Dim { operand, dim } => {
                env.dim(*operand, *dim).ok_or(IndexExprError::UnboundDim {
                    operand: *operand,
                    dim: *dim,
                })
            }
            IndexExpr::Load { operand, index } => {
                env.value(*operand, *index)
                    .ok_or(IndexExprError::UnboundLoad {
                        operand: *operand,
                        index: *index,
                    })
            }
            IndexExpr::Binary { op, lhs, rhs } => {
                let a = lhs.evaluate(env)?;
                let b = rhs.evaluate(env)?;
                op.apply(a, b).ok_or_else(|| IndexExprError::DivisionByZero {
                    expr: self.to_string(),
                })
            }
            IndexExpr::Select {
                cond,
                then,
                otherwise,
            } => {
                if cond.evaluate(env)? != 0 {
                    then.evaluate(env)
                } else {
                    otherwise.evaluate(env)
                }
            }
        }
    }

    /// Evaluates an expression used as an extent or index, rejecting
    /// negative results.
    pub fn evaluate_extent(&self, env: &Bindings) -> Result<usize, IndexExprError> {
        let value = self.evaluate(env)?;
        usize::try_from(value).map_err(|_| IndexExprError::NegativeExtent {
            expr: self.to_string(),
            value,
        })
    }

    /// Replaces every leaf bound in `env` by its literal and refolds.
    /// Unbound leaves are kept symbolic.
    pub fn substitute(&self, env: &Bindings) -> IndexExpr {
        match self {
            IndexExpr::Literal(_) => self.clone(),
            IndexExpr::Symbol(_) | IndexExpr::Dim { .. } | IndexExpr::Load { .. } => {
                self.evaluate(env).map_or_else(|_| self.clone(), IndexExpr::Literal)
            }
            IndexExpr::Binary { op, lhs, rhs } => {
                Self::binary(*op, lhs.substitute(env), rhs.substitute(env))
            }
            IndexExpr::Select {
                cond,
                then,
                otherwise,
            } => Self::select(
                cond.substitute(env),
                then.substitute(env),
                otherwise.substitute(env),
            ),
        }
    }
}

impl From<i64> for IndexExpr {
    fn from(value: i64) -> Self {
        IndexExpr::Literal(value)
    }
}

impl From<i32> for IndexExpr {
    fn from(value: i32) -> Self {
        IndexExpr::Literal(i64::from(value))
    }
}

impl From<usize> for IndexExpr {
    fn from(value: usize) -> Self {
        IndexExpr::Literal(value as i64)
    }
}

impl fmt::Display for IndexExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexExpr::Literal(v) => write!(f, "{v}"),
            IndexExpr::Symbol(name) => write!(f, "{name}"),
            IndexExpr::Dim { operand, dim } => write!(f, "dim({operand}, {dim})"),
            IndexExpr::Load { operand, index } => write!(f, "{operand}[{index}]"),
            IndexExpr::Binary { op, lhs, rhs } if op.is_infix() => {
                write!(f, "({lhs} {} {rhs})", op.symbol())
            }
            IndexExpr::Binary { op, lhs, rhs } => write!(f, "{}({lhs}, {rhs})", op.symbol()),
            IndexExpr::Select {
                cond,
                then,
                otherwise,
            } => write!(f, "select({cond}, {then}, {otherwise})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn n() -> IndexExpr {
        IndexExpr::dim(OperandId(0), 0)
    }

    #[test]
    fn test_literal_folding() {
        let e = (IndexExpr::lit(6) + 4) * 2;
        assert!(e.is_literal());
        assert_eq!(e.literal(), 20);
        assert_eq!(IndexExpr::lit(7).ceil_div(2).literal(), 4);
        assert_eq!(IndexExpr::lit(-7).floor_div(2).literal(), -4);
        assert_eq!(IndexExpr::lit(-7).ceil_div(2).literal(), -3);
        assert_eq!(IndexExpr::lit(-7).rem(3).literal(), 2);
        assert_eq!(IndexExpr::lit(3).lt(5).literal(), 1);
        assert_eq!(IndexExpr::lit(3).ge(5).literal(), 0);
    }

    #[test]
    fn test_symbolic_stays_composite() {
        let e = n() + 1;
        assert!(!e.is_literal());
        assert_eq!(e.as_literal(), None);
        assert_eq!(e.to_string(), "(dim(%0, 0) + 1)");
    }

    #[test]
    #[should_panic(expected = "non-literal")]
    fn test_literal_on_symbolic_panics() {
        let _ = (n() * 2).literal();
    }

    #[test]
    fn test_identities() {
        assert_eq!(n() + 0, n());
        assert_eq!(IndexExpr::lit(0) + n(), n());
        assert_eq!(n() * 1, n());
        assert_eq!(n() * 0, IndexExpr::lit(0));
        assert_eq!(n().ceil_div(1), n());
        assert_eq!(n() - n(), IndexExpr::lit(0));
        assert_eq!(n().min(n()), n());
        assert_eq!(n().le(n()), IndexExpr::lit(1));
    }

    #[test]
    fn test_division_by_literal_zero_is_deferred() {
        let e = IndexExpr::lit(4).floor_div(0);
        assert!(!e.is_literal());
        assert!(matches!(
            e.evaluate(&Bindings::new()),
            Err(IndexExprError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn test_select_folding() {
        assert_eq!(
            IndexExpr::select(IndexExpr::lit(0), n(), IndexExpr::lit(9)),
            IndexExpr::lit(9)
        );
        assert_eq!(IndexExpr::select(n().lt(3), n(), n()), n());

        let e = IndexExpr::select(n().lt(0), n() + 10, n());
        let mut env = Bindings::new();
        env.bind_dim(OperandId(0), 0, 4);
        assert_eq!(e.evaluate(&env).unwrap(), 4);
    }

    #[test]
    fn test_evaluate_unbound() {
        let e = IndexExpr::symbol("batch") * IndexExpr::load(OperandId(1), 0);
        let mut env = Bindings::new();
        assert_eq!(
            e.evaluate(&env),
            Err(IndexExprError::UnboundSymbol("batch".into()))
        );
        env.bind_symbol("batch", 3);
        assert_eq!(
            e.evaluate(&env),
            Err(IndexExprError::UnboundLoad {
                operand: OperandId(1),
                index: 0
            })
        );
        env.bind_values(OperandId(1), &[5]);
        assert_eq!(e.evaluate(&env).unwrap(), 15);
    }

    #[test]
    fn test_evaluate_extent_rejects_negative() {
        let e = n() - 5;
        let mut env = Bindings::new();
        env.bind_dim(OperandId(0), 0, 2);
        assert!(matches!(
            e.evaluate_extent(&env),
            Err(IndexExprError::NegativeExtent { value: -3, .. })
        ));
    }

    #[test]
    fn test_substitute_partial() {
        let e = (n() + IndexExpr::symbol("s")) * 2;
        let mut env = Bindings::new();
        env.bind_dim(OperandId(0), 0, 3);
        let partial = e.substitute(&env);
        assert!(!partial.is_literal());
        env.bind_symbol("s", 1);
        assert_eq!(e.substitute(&env), IndexExpr::lit(8));
    }

    #[test]
    fn test_display_prefix_ops() {
        let e = n().ceil_div(IndexExpr::symbol("k")).max(1);
        assert_eq!(e.to_string(), "max(ceildiv(dim(%0, 0), k), 1)");
    }

    proptest! {
        #[test]
        fn prop_folding_matches_evaluation(a in -1000i64..1000, b in -50i64..50, c in 1i64..20) {
            let sym = IndexExpr::symbol("a");
            let expr = ((sym.clone() * b) - c).floor_div(c).max(sym.clone().ceil_div(c));
            let folded = ((IndexExpr::lit(a) * b) - c).floor_div(c).max(IndexExpr::lit(a).ceil_div(c));

            let mut env = Bindings::new();
            env.bind_symbol("a", a);
            prop_assert!(folded.is_literal());
            prop_assert_eq!(expr.evaluate(&env).unwrap(), folded.literal());
        }
    }
}
