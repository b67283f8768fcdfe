// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the lowering runtime.

/// Errors that can occur while configuring the engine or lowering an operator.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Shape resolution failed before any plan was built.
    #[error("shape inference failed for '{op}': {source}")]
    ShapeError {
        op: String,
        #[source]
        source: shape_inference::ShapeInferenceError,
    },

    /// Lowering or executing the plan failed.
    #[error("lowering failed for '{op}': {source}")]
    LoweringError {
        op: String,
        #[source]
        source: loop_lowering::LoweringError,
    },

    /// The configured memory budget could not be honoured.
    #[error("memory error: {0}")]
    MemoryError(#[from] memory_manager::AllocationError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Metrics could not be serialised.
    #[error("serialisation error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
