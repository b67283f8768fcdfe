// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tolerance-based comparison of descriptors, for verification only.

use crate::TensorDescriptor;

/// Returns `true` when `a` and `b` have the same element kind and sizes and
/// every pair of elements satisfies `|a[i] - b[i]| <= atol + rtol * |b[i]|`.
///
/// Elements are compared in logical row-major order, so layouts may differ.
/// NaN never compares equal. Unbound descriptors never compare equal.
///
/// ```
/// use tensor_core::{approximately_equal, TensorDescriptor};
///
/// let a = TensorDescriptor::from_slice([2], &[1.0f32, 2.0]).unwrap();
/// let b = TensorDescriptor::from_slice([2], &[1.0f32, 2.001]).unwrap();
/// assert!(!approximately_equal(&a, &b, 0.0, 0.0));
/// assert!(approximately_equal(&a, &b, 1e-3, 0.0));
/// ```
pub fn approximately_equal(
    a: &TensorDescriptor<'_>,
    b: &TensorDescriptor<'_>,
    rtol: f64,
    atol: f64,
) -> bool {
    if a.sizes() != b.sizes() || a.dtype() != b.dtype() {
        return false;
    }
    let (Ok(lhs), Ok(rhs)) = (a.values_f64(), b.values_f64()) else {
        return false;
    };
    lhs.iter()
        .zip(&rhs)
        .all(|(&x, &y)| x == y || (x - y).abs() <= atol + rtol * y.abs())
}
