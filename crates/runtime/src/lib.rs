// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! The facade that drives one operator from definition to materialised
//! outputs.
//!
//! The runtime takes:
//! - A validated `OpDef` from `op-ir`.
//! - Operand descriptors from `tensor-core`.
//! - A `MemoryPool` from `memory-manager`, sized by the configured budget.
//!
//! And resolves the output shapes with `shape-inference`, lowers the
//! operator with `loop-lowering`, and records per-call timing and memory
//! metrics.
//!
//! # Pipeline
//! ```text
//! OpDef<Validated> ──resolve──▶ Resolution ──plan──▶ IterationPlan
//!                                                       │ execute
//! operands ─────────────bind───────────────────────────▶ TensorList
//! ```

mod config;
mod engine;
mod error;
mod metrics;

pub use config::RuntimeConfig;
pub use engine::{LoweringEngine, LoweringOutput};
pub use error::RuntimeError;
pub use metrics::LoweringMetrics;
