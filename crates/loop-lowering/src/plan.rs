// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Iteration plan: the output of kernel selection.
//!
//! A plan lists the loops of the nest (each with an extent expression and
//! an optional block size), the order in which the expanded loops are
//! traversed, and one [`AccessMap`] per operand and output describing how
//! loop indices become element offsets. Extents stay symbolic until
//! [`IterationPlan::extents`] evaluates them under the run-time bindings.

use crate::LoweringError;
use index_expr::{Bindings, IndexExpr, OperandId};
use std::fmt;
use tensor_core::TensorDescriptor;

/// Which lowering produced a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoweringPath {
    GenericMatMul,
    TiledMatMul,
    TopK,
    Slice,
    Reduce,
    ConstantOfShape,
}

impl LoweringPath {
    pub fn as_str(self) -> &'static str {
        match self {
            LoweringPath::GenericMatMul => "generic_matmul",
            LoweringPath::TiledMatMul => "tiled_matmul",
            LoweringPath::TopK => "top_k",
            LoweringPath::Slice => "slice",
            LoweringPath::Reduce => "reduce",
            LoweringPath::ConstantOfShape => "constant_of_shape",
        }
    }
}

impl fmt::Display for LoweringPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One loop of the nest.
///
/// A blocked loop expands into an outer loop over blocks and an inner loop
/// within a block.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LoopDim {
    pub name: String,
    pub extent: IndexExpr,
    pub block: Option<usize>,
    /// The loop is folded into an accumulator rather than indexing an
    /// output element.
    pub reduction: bool,
}

impl LoopDim {
    fn expanded_len(&self) -> usize {
        if self.block.is_some() {
            2
        } else {
            1
        }
    }
}

/// How one operand axis is indexed.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum AccessTerm {
    /// The index of a loop.
    Loop(usize),
    /// The index of a loop, or 0 when the bound operand has extent 1 on
    /// this axis.
    Broadcast(usize),
    /// `scale * loop + offset`.
    Affine {
        loop_index: usize,
        scale: IndexExpr,
        offset: IndexExpr,
    },
    /// Always index 0.
    Zero,
}

impl AccessTerm {
    pub fn loop_index(&self) -> Option<usize> {
        match self {
            AccessTerm::Loop(l) | AccessTerm::Broadcast(l) => Some(*l),
            AccessTerm::Affine { loop_index, .. } => Some(*loop_index),
            AccessTerm::Zero => None,
        }
    }
}

/// The buffer an access map addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum AccessTarget {
    Input(OperandId),
    Output(usize),
}

impl fmt::Display for AccessTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessTarget::Input(id) => write!(f, "{id}"),
            AccessTarget::Output(i) => write!(f, "out{i}"),
        }
    }
}

/// One term per axis of the target descriptor, in axis order.
///
/// Axes synthesized by broadcast padding have no term: the target has no
/// such axis in memory.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AccessMap {
    pub target: AccessTarget,
    pub terms: Vec<AccessTerm>,
}

impl AccessMap {
    /// Resolves the map against a bound descriptor.
    ///
    /// `extents` are the concrete loop extents. Every index the map can
    /// produce over them must lie inside the descriptor's sizes.
    pub fn bind(
        &self,
        desc: &TensorDescriptor<'_>,
        env: &Bindings,
        extents: &[usize],
    ) -> Result<BoundAccess, LoweringError> {
        if self.terms.len() != desc.rank() {
            return Err(LoweringError::InvalidPlan {
                op: self.target.to_string(),
                detail: format!(
                    "access has {} terms but the descriptor has rank {}",
                    self.terms.len(),
                    desc.rank()
                ),
            });
        }

        let mut terms = Vec::with_capacity(self.terms.len());
        for (axis, term) in self.terms.iter().enumerate() {
            let stride = desc.strides()[axis];
            let size = desc.sizes()[axis];
            let (loop_index, scale, offset) = match term {
                AccessTerm::Loop(l) => (Some(*l), 1, 0),
                AccessTerm::Broadcast(_) if size == 1 => (None, 0, 0),
                AccessTerm::Broadcast(l) => (Some(*l), 1, 0),
                AccessTerm::Affine {
                    loop_index,
                    scale,
                    offset,
                } => (Some(*loop_index), scale.evaluate(env)?, offset.evaluate(env)?),
                AccessTerm::Zero => (None, 0, 0),
            };
            terms.push(BoundTerm {
                loop_index,
                scale,
                offset,
                stride,
                size,
            });
        }

        // Never evaluated when one of its loops is empty.
        let reachable = terms
            .iter()
            .filter_map(|t| t.loop_index)
            .all(|l| extents.get(l).map_or(true, |&n| n > 0));
        if reachable {
            for (axis, t) in terms.iter().enumerate() {
                let last = t
                    .loop_index
                    .and_then(|l| extents.get(l))
                    .map_or(0, |&n| n as i64 - 1);
                let (first, last) = (t.offset, t.scale.saturating_mul(last).saturating_add(t.offset));
                let in_range = |i: i64| i >= 0 && (i as u64) < t.size as u64;
                if !in_range(first) || !in_range(last) {
                    return Err(LoweringError::InvalidPlan {
                        op: self.target.to_string(),
                        detail: format!(
                            "axis {axis} reaches indices {first}..={last} outside size {}",
                            t.size
                        ),
                    });
                }
            }
        }

        Ok(BoundAccess {
            base: desc.offset(),
            terms,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct BoundTerm {
    loop_index: Option<usize>,
    scale: i64,
    offset: i64,
    stride: usize,
    size: usize,
}

/// An access map with concrete strides and coefficients.
#[derive(Debug, Clone)]
pub struct BoundAccess {
    base: usize,
    terms: Vec<BoundTerm>,
}

impl BoundAccess {
    /// Absolute element offset for the loop indices `ivs`.
    #[inline]
    pub fn offset(&self, ivs: &[usize]) -> usize {
        let mut offset = self.base;
        for t in &self.terms {
            let iv = t.loop_index.map_or(0, |l| ivs[l] as i64);
            let index = t.scale * iv + t.offset;
            debug_assert!(
                index >= 0 && (index as usize) < t.size,
                "index {index} outside extent {}",
                t.size
            );
            offset += index as usize * t.stride;
        }
        offset
    }
}

// ── Plan ───────────────────────────────────────────────────────────

/// The complete loop nest for one operator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IterationPlan {
    pub op_name: String,
    pub path: LoweringPath,
    pub loops: Vec<LoopDim>,
    /// Expanded loop positions in traversal order, outermost first.
    pub permutation: Vec<usize>,
    pub accesses: Vec<AccessMap>,
}

impl IterationPlan {
    pub fn num_loops(&self) -> usize {
        self.loops.len()
    }

    /// Number of loops once every blocked loop is split in two.
    pub fn expanded_len(&self) -> usize {
        self.loops.iter().map(LoopDim::expanded_len).sum()
    }

    pub fn access(&self, target: AccessTarget) -> Option<&AccessMap> {
        self.accesses.iter().find(|a| a.target == target)
    }

    pub(crate) fn require_access(&self, target: AccessTarget) -> Result<&AccessMap, LoweringError> {
        self.access(target).ok_or_else(|| LoweringError::InvalidPlan {
            op: self.op_name.clone(),
            detail: format!("no access map for {target}"),
        })
    }

    /// Binds the access map of `target` to `desc`, checking it against the
    /// loop extents under `env`.
    pub(crate) fn bind_access(
        &self,
        target: AccessTarget,
        desc: &TensorDescriptor<'_>,
        env: &Bindings,
    ) -> Result<BoundAccess, LoweringError> {
        let extents = self.extents(env)?;
        self.require_access(target)?.bind(desc, env, &extents)
    }

    /// Concrete loop extents under `env`.
    pub fn extents(&self, env: &Bindings) -> Result<Vec<usize>, LoweringError> {
        self.loops
            .iter()
            .map(|l| l.extent.evaluate_extent(env).map_err(LoweringError::from))
            .collect()
    }

    /// Names of the expanded loops, outermost first.
    pub fn traversal_order(&self) -> Vec<String> {
        let names = self.expanded_names();
        self.permutation
            .iter()
            .map(|&p| names.get(p).cloned().unwrap_or_else(|| format!("#{p}")))
            .collect()
    }

    fn expanded_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.expanded_len());
        for l in &self.loops {
            if l.block.is_some() {
                names.push(format!("{}.outer", l.name));
                names.push(format!("{}.inner", l.name));
            } else {
                names.push(l.name.clone());
            }
        }
        names
    }

    /// Validates the plan.
    ///
    /// Checks:
    /// - The permutation visits every expanded loop exactly once.
    /// - A blocked loop's outer half is traversed before its inner half.
    /// - Block sizes are positive.
    /// - Access terms reference existing loops.
    /// - No two access maps share a target.
    pub fn validate(&self) -> Result<(), LoweringError> {
        let invalid = |detail: String| LoweringError::InvalidPlan {
            op: self.op_name.clone(),
            detail,
        };

        let expanded = self.expanded_len();
        if self.permutation.len() != expanded {
            return Err(invalid(format!(
                "permutation has {} entries for {expanded} loops",
                self.permutation.len()
            )));
        }
        let mut position = vec![None; expanded];
        for (at, &p) in self.permutation.iter().enumerate() {
            if p >= expanded {
                return Err(invalid(format!("loop {p} does not exist")));
            }
            if position[p].is_some() {
                return Err(invalid(format!("loop {p} appears twice")));
            }
            position[p] = Some(at);
        }

        let mut start = 0;
        for l in &self.loops {
            if let Some(block) = l.block {
                if block == 0 {
                    return Err(invalid(format!("loop '{}' has block size 0", l.name)));
                }
                if position[start] > position[start + 1] {
                    return Err(invalid(format!(
                        "loop '{}' visits its inner block first",
                        l.name
                    )));
                }
            }
            start += l.expanded_len();
        }

        for (i, access) in self.accesses.iter().enumerate() {
            for term in &access.terms {
                if let Some(l) = term.loop_index() {
                    if l >= self.loops.len() {
                        return Err(invalid(format!(
                            "access to {} references loop {l}",
                            access.target
                        )));
                    }
                }
            }
            if self.accesses[..i].iter().any(|a| a.target == access.target) {
                return Err(invalid(format!("duplicate access to {}", access.target)));
            }
        }

        Ok(())
    }

    /// Returns a human-readable summary of the plan.
    pub fn summary(&self) -> String {
        let loops: Vec<String> = self
            .loops
            .iter()
            .map(|l| {
                let mut s = format!("{}<{}", l.name, l.extent);
                if let Some(b) = l.block {
                    s.push_str(&format!(" by {b}"));
                }
                if l.reduction {
                    s.push_str(" (reduction)");
                }
                s
            })
            .collect();
        format!(
            "Plan '{}' ({}): {} loops [{}], order [{}], {} accesses",
            self.op_name,
            self.path,
            self.num_loops(),
            loops.join(", "),
            self.traversal_order().join(", "),
            self.accesses.len(),
        )
    }
}

/// Builder helper for constructing an `IterationPlan` incrementally.
///
/// Without an explicit order, non-reduction loops are traversed first and
/// each blocked loop keeps its outer half directly above its inner half.
pub(crate) struct PlanBuilder {
    op_name: String,
    path: LoweringPath,
    loops: Vec<LoopDim>,
    permutation: Option<Vec<usize>>,
    accesses: Vec<AccessMap>,
}

impl PlanBuilder {
    pub fn new(op_name: &str, path: LoweringPath) -> Self {
        Self {
            op_name: op_name.to_string(),
            path,
            loops: Vec::new(),
            permutation: None,
            accesses: Vec::new(),
        }
    }

    /// Adds a loop and returns its index.
    pub fn add_loop(&mut self, name: impl Into<String>, extent: IndexExpr) -> usize {
        self.push(name.into(), extent, false)
    }

    /// Adds a reduction loop and returns its index.
    pub fn add_reduction(&mut self, name: impl Into<String>, extent: IndexExpr) -> usize {
        self.push(name.into(), extent, true)
    }

    fn push(&mut self, name: String, extent: IndexExpr, reduction: bool) -> usize {
        self.loops.push(LoopDim {
            name,
            extent,
            block: None,
            reduction,
        });
        self.loops.len() - 1
    }

    pub fn block(&mut self, loop_index: usize, size: usize) {
        self.loops[loop_index].block = Some(size);
    }

    pub fn order(&mut self, permutation: Vec<usize>) {
        self.permutation = Some(permutation);
    }

    pub fn access(&mut self, target: AccessTarget, terms: Vec<AccessTerm>) {
        self.accesses.push(AccessMap { target, terms });
    }

    /// Consumes the builder and returns the finished plan.
    pub fn build(self) -> IterationPlan {
        let permutation = self.permutation.unwrap_or_else(|| {
            let mut starts = Vec::with_capacity(self.loops.len());
            let mut next = 0;
            for l in &self.loops {
                starts.push(next);
                next += l.expanded_len();
            }
            let mut order = Vec::with_capacity(next);
            for reduction in [false, true] {
                for (l, &start) in self.loops.iter().zip(&starts) {
                    if l.reduction == reduction {
                        order.extend(start..start + l.expanded_len());
                    }
                }
            }
            order
        });

        IterationPlan {
            op_name: self.op_name,
            path: self.path,
            loops: self.loops,
            permutation,
            accesses: self.accesses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiled_plan() -> IterationPlan {
        let mut b = PlanBuilder::new("mm", LoweringPath::TiledMatMul);
        let i = b.add_loop("i", IndexExpr::lit(4));
        let j = b.add_loop("j", IndexExpr::lit(5));
        let k = b.add_reduction("k", IndexExpr::lit(3));
        b.block(i, 4);
        b.block(j, 8);
        b.block(k, 3);
        b.order(vec![0, 2, 4, 1, 3, 5]);
        b.access(
            AccessTarget::Input(OperandId(0)),
            vec![AccessTerm::Loop(i), AccessTerm::Loop(k)],
        );
        b.access(
            AccessTarget::Input(OperandId(1)),
            vec![AccessTerm::Loop(k), AccessTerm::Loop(j)],
        );
        b.access(
            AccessTarget::Output(0),
            vec![AccessTerm::Loop(i), AccessTerm::Loop(j)],
        );
        b.build()
    }

    #[test]
    fn test_validate_ok() {
        let plan = tiled_plan();
        plan.validate().unwrap();
        assert_eq!(plan.num_loops(), 3);
        assert_eq!(plan.expanded_len(), 6);
    }

    #[test]
    fn test_traversal_order() {
        assert_eq!(
            tiled_plan().traversal_order(),
            vec!["i.outer", "j.outer", "k.outer", "i.inner", "j.inner", "k.inner"]
        );
    }

    #[test]
    fn test_default_order_puts_reductions_last() {
        let mut b = PlanBuilder::new("sum", LoweringPath::Reduce);
        b.add_reduction("d0", IndexExpr::lit(2));
        b.add_loop("d1", IndexExpr::lit(3));
        let plan = b.build();
        assert_eq!(plan.permutation, vec![1, 0]);
        assert_eq!(plan.traversal_order(), vec!["d1", "d0"]);
    }

    #[test]
    fn test_validate_bad_permutation() {
        let mut plan = tiled_plan();
        plan.permutation = vec![0, 2, 4, 1, 3, 3];
        assert!(plan.validate().is_err());

        let mut plan = tiled_plan();
        plan.permutation = vec![0, 2, 4, 1, 3];
        assert!(plan.validate().is_err());

        let mut plan = tiled_plan();
        plan.permutation = vec![0, 2, 4, 1, 3, 6];
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_validate_inner_before_outer() {
        let mut plan = tiled_plan();
        plan.permutation = vec![1, 2, 4, 0, 3, 5];
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_validate_zero_block() {
        let mut plan = tiled_plan();
        plan.loops[2].block = Some(0);
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_validate_dangling_access() {
        let mut plan = tiled_plan();
        plan.accesses[0].terms[1] = AccessTerm::Loop(7);
        assert!(plan.validate().is_err());

        let mut plan = tiled_plan();
        plan.accesses[1].target = AccessTarget::Input(OperandId(0));
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_summary() {
        let s = tiled_plan().summary();
        assert!(s.contains("mm"));
        assert!(s.contains("tiled_matmul"));
        assert!(s.contains("3 loops"));
        assert!(s.contains("k<3 by 3 (reduction)"));
    }

    #[test]
    fn test_bound_access_offsets() {
        let desc = TensorDescriptor::create(tensor_core::DType::F32, [4, 3]).unwrap();
        let env = Bindings::new();
        let plan = tiled_plan();
        let a = plan
            .access(AccessTarget::Input(OperandId(0)))
            .unwrap()
            .bind(&desc, &env, &[4, 5, 3])
            .unwrap();
        // ivs = [i, j, k]
        assert_eq!(a.offset(&[0, 0, 0]), 0);
        assert_eq!(a.offset(&[2, 4, 1]), 7);
    }

    #[test]
    fn test_broadcast_term_pins_size_one_axis() {
        let map = AccessMap {
            target: AccessTarget::Input(OperandId(0)),
            terms: vec![AccessTerm::Broadcast(0), AccessTerm::Loop(1)],
        };
        let env = Bindings::new();
        let single = TensorDescriptor::create(tensor_core::DType::F32, [1, 5]).unwrap();
        let batched = TensorDescriptor::create(tensor_core::DType::F32, [3, 5]).unwrap();
        assert_eq!(map.bind(&single, &env, &[3, 5]).unwrap().offset(&[2, 4]), 4);
        assert_eq!(map.bind(&batched, &env, &[3, 5]).unwrap().offset(&[2, 4]), 14);
    }

    #[test]
    fn test_affine_term() {
        let map = AccessMap {
            target: AccessTarget::Input(OperandId(0)),
            terms: vec![AccessTerm::Affine {
                loop_index: 0,
                scale: IndexExpr::lit(3),
                offset: IndexExpr::lit(2),
            }],
        };
        let desc = TensorDescriptor::create(tensor_core::DType::F32, [10]).unwrap();
        let bound = map.bind(&desc, &Bindings::new(), &[3]).unwrap();
        let reads: Vec<usize> = (0..3).map(|i| bound.offset(&[i])).collect();
        assert_eq!(reads, vec![2, 5, 8]);
    }

    #[test]
    fn test_bind_rejects_out_of_range_extents() {
        let map = AccessMap {
            target: AccessTarget::Input(OperandId(0)),
            terms: vec![AccessTerm::Loop(0), AccessTerm::Loop(1)],
        };
        let env = Bindings::new();
        let empty = TensorDescriptor::create(tensor_core::DType::F32, [0, 3]).unwrap();
        let err = map.bind(&empty, &env, &[1, 3]).unwrap_err();
        assert!(err.to_string().contains("outside size 0"));

        // An empty loop means the access is never evaluated.
        assert!(map.bind(&empty, &env, &[0, 3]).is_ok());
        assert!(map.bind(&empty, &env, &[1, 0]).is_ok());

        let affine = AccessMap {
            target: AccessTarget::Input(OperandId(0)),
            terms: vec![AccessTerm::Affine {
                loop_index: 0,
                scale: IndexExpr::lit(3),
                offset: IndexExpr::lit(2),
            }],
        };
        let desc = TensorDescriptor::create(tensor_core::DType::F32, [10]).unwrap();
        assert!(affine.bind(&desc, &env, &[3]).is_ok());
        assert!(affine.bind(&desc, &env, &[4]).is_err());
    }

    #[test]
    fn test_bind_rank_mismatch() {
        let map = AccessMap {
            target: AccessTarget::Output(0),
            terms: vec![AccessTerm::Loop(0)],
        };
        let desc = TensorDescriptor::create(tensor_core::DType::F32, [2, 2]).unwrap();
        assert!(matches!(
            map.bind(&desc, &Bindings::new(), &[2]),
            Err(LoweringError::InvalidPlan { .. })
        ));
    }

    #[test]
    fn test_plan_serializes() {
        let json = serde_json::to_string(&tiled_plan()).unwrap();
        assert!(json.contains("\"path\":\"tiled_matmul\""));
    }
}
