// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The lowering engine.
//!
//! ```text
//! LoweringEngine::new(config)
//!     │  .resolve_shape(op)     shapes only, no buffers
//!     │  .plan(op)              iteration plan, no buffers
//!     ▼
//! .lower(op, operands)
//!     │  resolve → bind → verify → allocate → execute
//!     ▼
//!   LoweringOutput
//! ```
//!
//! One engine owns one budgeted pool. Outputs borrow nothing from the
//! engine; their bytes return to the pool when they are dropped.

use crate::{LoweringMetrics, RuntimeConfig, RuntimeError};
use loop_lowering::{IterationPlan, LoweringOptions};
use memory_manager::{AllocationStats, MemoryPool};
use op_ir::{OpDef, Validated};
use shape_inference::{Resolution, ResolvedShape};
use std::time::Instant;
use tensor_core::{TensorDescriptor, TensorList};

// ── Lowering output ────────────────────────────────────────────

/// The result of lowering one operator.
#[derive(Debug)]
pub struct LoweringOutput {
    /// Materialised outputs, named `<op>:<index>`.
    pub outputs: TensorList<'static>,
    /// The plan that produced them.
    pub plan: IterationPlan,
    /// Timing and memory metrics of the call.
    pub metrics: LoweringMetrics,
}

// ── Engine ─────────────────────────────────────────────────────

/// Resolves, plans and executes operators against one memory pool.
///
/// # Example
/// ```
/// use op_ir::{OpDef, Operator, TensorType, ValueOperand};
/// use runtime::{LoweringEngine, RuntimeConfig};
/// use tensor_core::{DType, TensorDescriptor};
///
/// let engine = LoweringEngine::new(RuntimeConfig::default()).unwrap();
/// let op = OpDef::new(
///     "slice",
///     Operator::Slice {
///         starts: ValueOperand::Constant(vec![2]),
///         ends: ValueOperand::Constant(vec![10]),
///         axes: Some(ValueOperand::Constant(vec![0])),
///         steps: Some(ValueOperand::Constant(vec![3])),
///     },
///     vec![TensorType::of_static(DType::I32, &[10])],
/// )
/// .validate()
/// .unwrap();
///
/// let x = TensorDescriptor::from_slice([10], &(0..10).collect::<Vec<i32>>()).unwrap();
/// let out = engine.lower(&op, &[&x]).unwrap();
/// assert_eq!(out.outputs.get(0).unwrap().to_vec::<i32>().unwrap(), vec![2, 5, 8]);
/// ```
pub struct LoweringEngine {
    config: RuntimeConfig,
    options: LoweringOptions,
    pool: MemoryPool,
}

impl LoweringEngine {
    /// Creates an engine whose pool is sized by the configured budget.
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let budget = config.parse_budget()?;
        tracing::info!("lowering engine created: budget {budget}");
        if config.force_generic {
            tracing::info!("tiled matrix-product path disabled");
        }

        Ok(Self {
            options: config.lowering_options(),
            pool: MemoryPool::new(budget),
            config,
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The pool that every output is allocated from.
    pub fn pool(&self) -> &MemoryPool {
        &self.pool
    }

    /// Returns the current memory pool statistics.
    pub fn memory_stats(&self) -> AllocationStats {
        self.pool.stats()
    }

    /// Resolves the output shapes of `op` without touching any buffer.
    pub fn resolve_shape(&self, op: &OpDef<Validated>) -> Result<ResolvedShape, RuntimeError> {
        Ok(self.resolve(op)?.shape().clone())
    }

    /// Builds the iteration plan of `op` without touching any buffer.
    pub fn plan(&self, op: &OpDef<Validated>) -> Result<IterationPlan, RuntimeError> {
        let resolution = self.resolve(op)?;
        loop_lowering::plan_for(op, &resolution, &self.options).map_err(|source| {
            RuntimeError::LoweringError {
                op: op.name.clone(),
                source,
            }
        })
    }

    /// Lowers `op` over `operands` into freshly allocated outputs.
    ///
    /// Steps:
    /// 1. Resolve output shapes symbolically.
    /// 2. Check operands, bind run-time values, verify deferred conditions.
    /// 3. Allocate outputs from the pool.
    /// 4. Execute the selected kernel's plan.
    pub fn lower(
        &self,
        op: &OpDef<Validated>,
        operands: &[&TensorDescriptor<'_>],
    ) -> Result<LoweringOutput, RuntimeError> {
        let resolve_start = Instant::now();
        let resolution = self.resolve(op)?;
        let resolve_duration = resolve_start.elapsed();

        let execute_start = Instant::now();
        let lowered = loop_lowering::lower(op, &resolution, operands, &self.pool, &self.options)
            .map_err(|source| {
                tracing::warn!("lowering '{}' failed: {source}", op.name);
                RuntimeError::LoweringError {
                    op: op.name.clone(),
                    source,
                }
            })?;
        let execute_duration = execute_start.elapsed();

        let metrics = LoweringMetrics {
            op_name: op.name.clone(),
            path: lowered.path(),
            num_loops: lowered.plan.num_loops(),
            resolve_duration,
            execute_duration,
            output_bytes: lowered.output_bytes(),
            pool_peak_bytes: self.pool.stats().peak_allocated_bytes,
        };
        if self.config.enable_profiling {
            tracing::info!("{}", metrics.summary());
        }

        Ok(LoweringOutput {
            outputs: lowered.outputs,
            plan: lowered.plan,
            metrics,
        })
    }

    // ── Private helpers ────────────────────────────────────────

    fn resolve(&self, op: &OpDef<Validated>) -> Result<Resolution, RuntimeError> {
        let resolution = shape_inference::resolve(op).map_err(|source| RuntimeError::ShapeError {
            op: op.name.clone(),
            source,
        })?;
        tracing::debug!("'{}' resolves to {}", op.name, resolution.shape());
        Ok(resolution)
    }
}

impl std::fmt::Debug for LoweringEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoweringEngine")
            .field("budget", &self.config.memory_budget)
            .field("force_generic", &self.config.force_generic)
            .field("allocated_bytes", &self.pool.allocated_bytes())
            .finish()
    }
}
