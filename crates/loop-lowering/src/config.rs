// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Block-size parameters of the tiled matrix-product path.

use index_expr::IndexExpr;

/// Register-block sizes for the `I` (rows), `J` (columns) and `K`
/// (reduction) loops.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TilingConfig {
    #[serde(default = "default_i_block")]
    pub i_block: usize,
    #[serde(default = "default_j_block")]
    pub j_block: usize,
    #[serde(default = "default_k_block")]
    pub k_block: usize,
    /// Column block used when a known `J` is a multiple of this but not of
    /// `j_block`.
    #[serde(default = "default_narrow_j_block")]
    pub narrow_j_block: usize,
    /// Largest known `J` for which the narrow column block is chosen.
    #[serde(default = "default_large_problem_threshold")]
    pub large_problem_threshold: usize,
}

fn default_i_block() -> usize {
    4
}

fn default_j_block() -> usize {
    8
}

fn default_k_block() -> usize {
    8
}

fn default_narrow_j_block() -> usize {
    4
}

fn default_large_problem_threshold() -> usize {
    32
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            i_block: default_i_block(),
            j_block: default_j_block(),
            k_block: default_k_block(),
            narrow_j_block: default_narrow_j_block(),
            large_problem_threshold: default_large_problem_threshold(),
        }
    }
}

/// Options that steer kernel selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LoweringOptions {
    #[serde(default)]
    pub tiling: TilingConfig,
    /// Lower plain matrix products through the generic path.
    #[serde(default)]
    pub force_generic: bool,
}

/// Block sizes chosen for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Blocks {
    pub i: usize,
    pub j: usize,
    pub k: usize,
}

impl TilingConfig {
    /// Picks block sizes for extents `i`, `j`, `k`.
    ///
    /// A known `I` or `K` smaller than its default block shrinks the block
    /// to the extent. A known `J` that the default column block does not
    /// divide, but the narrow block does, uses the narrow block unless `J`
    /// exceeds the large-problem threshold. Unknown extents keep the
    /// defaults.
    pub fn blocks_for(&self, i: &IndexExpr, j: &IndexExpr, k: &IndexExpr) -> Blocks {
        let mut blocks = Blocks {
            i: self.i_block.max(1),
            j: self.j_block.max(1),
            k: self.k_block.max(1),
        };

        if let Some(n) = known(i) {
            if n < blocks.i {
                blocks.i = n;
                tracing::debug!("matmul: I block reduced to {}", blocks.i);
            }
        }
        if let Some(n) = known(j) {
            let narrow = self.narrow_j_block;
            let uneven = n % blocks.j != 0;
            if uneven && narrow > 0 && n % narrow == 0 && n <= self.large_problem_threshold {
                blocks.j = narrow;
                tracing::debug!("matmul: J block reduced to {}", blocks.j);
            }
        }
        if let Some(n) = known(k) {
            if n < blocks.k {
                blocks.k = n;
                tracing::debug!("matmul: K block reduced to {}", blocks.k);
            }
        }

        // Empty extents still need a non-zero step.
        blocks.i = blocks.i.max(1);
        blocks.k = blocks.k.max(1);
        blocks
    }

    /// Every block size must be positive.
    pub fn validate(&self) -> Result<(), String> {
        for (name, v) in [
            ("i_block", self.i_block),
            ("j_block", self.j_block),
            ("k_block", self.k_block),
            ("narrow_j_block", self.narrow_j_block),
        ] {
            if v == 0 {
                return Err(format!("{name} must be positive"));
            }
        }
        Ok(())
    }
}

fn known(e: &IndexExpr) -> Option<usize> {
    e.as_literal().and_then(|v| usize::try_from(v).ok())
}
