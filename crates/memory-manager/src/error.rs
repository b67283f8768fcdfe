// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for buffer allocation.

/// Errors raised when a buffer request cannot be satisfied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    /// The request would push live allocations past the pool budget.
    #[error("allocation of {requested_bytes} bytes exceeds budget: {available_bytes} available (budget: {budget_bytes})")]
    BudgetExceeded {
        requested_bytes: usize,
        available_bytes: usize,
        budget_bytes: usize,
    },

    /// The byte size of the request does not fit in `usize`.
    #[error("allocation size overflows: {elements} elements of {element_bytes} bytes")]
    SizeOverflow { elements: usize, element_bytes: usize },

    /// The host allocator refused the request.
    #[error("host allocator could not provide {requested_bytes} bytes")]
    OutOfMemory { requested_bytes: usize },

    /// A budget string could not be parsed.
    #[error("invalid memory budget: {0}")]
    InvalidBudget(String),
}
