// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-call lowering metrics.
//!
//! [`LoweringMetrics`] records which path lowered an operator, how long
//! shape resolution and plan execution took, and how much of the pool the
//! outputs occupy. They are the primary tool for comparing the tiled and
//! generic matrix-product paths.

use loop_lowering::LoweringPath;
use std::time::Duration;

use crate::RuntimeError;

/// Metrics for one lowering call.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LoweringMetrics {
    /// Operator name.
    pub op_name: String,
    /// Kernel that executed the plan.
    pub path: LoweringPath,
    /// Number of loops in the iteration plan before block expansion.
    pub num_loops: usize,
    /// Time spent resolving output shapes.
    pub resolve_duration: Duration,
    /// Time spent binding operands, allocating outputs and running the plan.
    pub execute_duration: Duration,
    /// Bytes of all output buffers.
    pub output_bytes: usize,
    /// High-water mark of the engine's pool after the call.
    pub pool_peak_bytes: usize,
}

impl LoweringMetrics {
    /// Wall-clock time of the whole call.
    pub fn total_duration(&self) -> Duration {
        self.resolve_duration + self.execute_duration
    }

    /// Serialises the metrics as a JSON object.
    pub fn to_json(&self) -> Result<String, RuntimeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Returns a human-readable summary suitable for log output.
    pub fn summary(&self) -> String {
        let peak_kb = self.pool_peak_bytes as f64 / 1024.0;
        format!(
            "Lowering '{}' ({}): {} loops, {:.3}ms resolve, {:.3}ms execute, \
             {} output bytes, pool peak {:.2} KB",
            self.op_name,
            self.path,
            self.num_loops,
            self.resolve_duration.as_secs_f64() * 1000.0,
            self.execute_duration.as_secs_f64() * 1000.0,
            self.output_bytes,
            peak_kb,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LoweringMetrics {
        LoweringMetrics {
            op_name: "mm".into(),
            path: LoweringPath::TiledMatMul,
            num_loops: 3,
            resolve_duration: Duration::from_millis(2),
            execute_duration: Duration::from_millis(5),
            output_bytes: 80,
            pool_peak_bytes: 2048,
        }
    }

    #[test]
    fn test_total_duration() {
        assert_eq!(sample().total_duration(), Duration::from_millis(7));
    }

    #[test]
    fn test_summary_format() {
        let s = sample().summary();
        assert!(s.starts_with("Lowering 'mm' (tiled_matmul)"));
        assert!(s.contains("3 loops"));
        assert!(s.contains("80 output bytes"));
        assert!(s.contains("pool peak 2.00 KB"));
    }

    #[test]
    fn test_to_json() {
        let json: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(json["op_name"], "mm");
        assert_eq!(json["path"], "tiled_matmul");
        assert_eq!(json["output_bytes"], 80);
    }
}
