// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tiled lowering for plain rank-2 matrix products.
//!
//! `I`, `J` and `K` are each split into a loop over blocks and a loop
//! within a block, traversed as
//! `i.outer, j.outer, k.outer, i.inner, j.inner, k.inner`.
//! Both operands are packed into dense row-major panels and the result
//! accumulates into a zero-filled panel before it is stored. Within one
//! output element the contraction still runs `k = 0, 1, ...` from a zero
//! start, so results match the generic path bit for bit.

use crate::kernel::{unsupported, Kernel};
use crate::plan::PlanBuilder;
use crate::{AccessTarget, AccessTerm, IterationPlan, LoweringError, LoweringPath, TilingConfig};
use index_expr::{Bindings, OperandId};
use shape_inference::MatMulShape;
use std::ops::Range;
use tensor_core::{with_element, DType, Element, TensorDescriptor};

const I: usize = 0;
const J: usize = 1;
const K: usize = 2;

/// Tiled lowering of an `(M, K) x (K, N)` product.
#[derive(Debug)]
pub struct TiledMatMul<'r> {
    shape: &'r MatMulShape,
    tiling: TilingConfig,
}

impl<'r> TiledMatMul<'r> {
    pub fn new(shape: &'r MatMulShape, tiling: TilingConfig) -> Self {
        Self { shape, tiling }
    }
}

impl Kernel for TiledMatMul<'_> {
    fn path(&self) -> LoweringPath {
        LoweringPath::TiledMatMul
    }

    fn plan(&self, op_name: &str) -> IterationPlan {
        let s = self.shape;
        let (m, n, k) = (&s.output()[0], &s.output()[1], s.contraction());
        let blocks = self.tiling.blocks_for(m, n, k);
        tracing::debug!(
            "tiled matmul '{}': blocks {}x{}x{}",
            op_name,
            blocks.i,
            blocks.j,
            blocks.k
        );

        let mut b = PlanBuilder::new(op_name, self.path());
        let i = b.add_loop("i", m.clone());
        let j = b.add_loop("j", n.clone());
        let kk = b.add_reduction("k", k.clone());
        b.block(i, blocks.i);
        b.block(j, blocks.j);
        b.block(kk, blocks.k);
        b.order(vec![0, 2, 4, 1, 3, 5]);

        b.access(
            AccessTarget::Input(OperandId(0)),
            vec![AccessTerm::Loop(i), AccessTerm::Loop(kk)],
        );
        b.access(
            AccessTarget::Input(OperandId(1)),
            vec![AccessTerm::Loop(kk), AccessTerm::Loop(j)],
        );
        b.access(
            AccessTarget::Output(0),
            vec![AccessTerm::Loop(i), AccessTerm::Loop(j)],
        );
        b.build()
    }

    fn output_dtypes(&self, inputs: &[&TensorDescriptor<'_>]) -> Vec<DType> {
        vec![inputs[0].dtype()]
    }

    fn execute(
        &self,
        plan: &IterationPlan,
        inputs: &[&TensorDescriptor<'_>],
        outputs: &mut [TensorDescriptor<'_>],
        env: &Bindings,
    ) -> Result<(), LoweringError> {
        let dtype = inputs[0].dtype();
        with_element!(dtype, T => run::<T>(plan, inputs, &mut outputs[0], env),
            else Err(unsupported(self.path(), dtype)))
    }
}

/// One tile of the iteration space.
struct Tile {
    rows: Range<usize>,
    cols: Range<usize>,
    depth: Range<usize>,
}

/// Dense row-major panels: `a` is `M x K`, `b` is `K x N`, `c` is `M x N`.
struct Panels<T> {
    a: Vec<T>,
    b: Vec<T>,
    c: Vec<T>,
    k: usize,
    n: usize,
}

impl<T: Element> Panels<T> {
    #[inline]
    fn micro_kernel(&mut self, tile: &Tile) {
        for i in tile.rows.clone() {
            let a_row = &self.a[i * self.k..(i + 1) * self.k];
            let c_row = &mut self.c[i * self.n..(i + 1) * self.n];
            for j in tile.cols.clone() {
                let mut acc = c_row[j];
                for k in tile.depth.clone() {
                    acc = acc.elem_add(a_row[k].elem_mul(self.b[k * self.n + j]));
                }
                c_row[j] = acc;
            }
        }
    }
}

fn run<T: Element>(
    plan: &IterationPlan,
    inputs: &[&TensorDescriptor<'_>],
    out: &mut TensorDescriptor<'_>,
    env: &Bindings,
) -> Result<(), LoweringError> {
    let (a, b) = (inputs[0], inputs[1]);
    let extents = plan.extents(env)?;
    let (m, n, k) = (extents[I], extents[J], extents[K]);
    let block = |l: usize| plan.loops[l].block.unwrap_or(1).max(1);
    let (bi, bj, bk) = (block(I), block(J), block(K));

    let a_at = plan.bind_access(AccessTarget::Input(OperandId(0)), a, env)?;
    let b_at = plan.bind_access(AccessTarget::Input(OperandId(1)), b, env)?;
    let c_at = plan.bind_access(AccessTarget::Output(0), out, env)?;

    let (ra, rb) = (a.reader::<T>()?, b.reader::<T>()?);
    let mut panels = Panels {
        a: Vec::with_capacity(m * k),
        b: Vec::with_capacity(k * n),
        c: vec![T::zero(); m * n],
        k,
        n,
    };
    for i in 0..m {
        for kk in 0..k {
            panels.a.push(ra.load(a_at.offset(&[i, 0, kk])));
        }
    }
    for kk in 0..k {
        for j in 0..n {
            panels.b.push(rb.load(b_at.offset(&[0, j, kk])));
        }
    }

    for i0 in (0..m).step_by(bi) {
        for j0 in (0..n).step_by(bj) {
            for k0 in (0..k).step_by(bk) {
                panels.micro_kernel(&Tile {
                    rows: i0..(i0 + bi).min(m),
                    cols: j0..(j0 + bj).min(n),
                    depth: k0..(k0 + bk).min(k),
                });
            }
        }
    }

    let mut wc = out.writer::<T>()?;
    for i in 0..m {
        for j in 0..n {
            wc.store(c_at.offset(&[i, j, 0]), panels.c[i * n + j]);
        }
    }
    Ok(())
}
