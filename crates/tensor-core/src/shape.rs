// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Concrete shapes, row-major stride derivation and index-set enumeration.

use std::fmt;

/// Dimension sizes of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a new shape from the given dimensions.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![2, 3, 4]);
    /// assert_eq!(s.rank(), 3);
    /// assert_eq!(s.num_elements(), 24);
    /// assert_eq!(s.contiguous_strides(), vec![12, 4, 1]);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Creates a scalar shape (rank 0).
    pub fn scalar() -> Self {
        Self { dims: vec![] }
    }

    pub fn vector(len: usize) -> Self {
        Self { dims: vec![len] }
    }

    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self {
            dims: vec![rows, cols],
        }
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Product of the dimensions. A scalar has one element.
    ///
    /// # Panics
    /// Panics if the product overflows `usize`; use
    /// [`checked_num_elements`](Self::checked_num_elements) for untrusted
    /// shapes.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn checked_num_elements(&self) -> Option<usize> {
        self.dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the size of a specific dimension, or `None` if out of bounds.
    pub fn dim(&self, index: usize) -> Option<usize> {
        self.dims.get(index).copied()
    }

    pub fn size_bytes(&self, dtype: super::DType) -> usize {
        self.num_elements() * dtype.size_bytes()
    }

    /// Row-major strides for this shape, in elements.
    pub fn contiguous_strides(&self) -> Vec<usize> {
        compute_strides_from_sizes(&self.dims)
    }

    /// Every index tuple of this shape, in row-major order.
    pub fn index_set(&self) -> RowMajorIndices {
        RowMajorIndices::new(&self.dims)
    }
}

/// Derives row-major strides (in elements) from dimension sizes.
///
/// The last stride is 1 and every other stride is the product of the sizes
/// strictly to its right.
///
/// ```
/// use tensor_core::compute_strides_from_sizes;
/// assert_eq!(compute_strides_from_sizes(&[4, 3, 5]), vec![15, 5, 1]);
/// assert!(compute_strides_from_sizes(&[]).is_empty());
/// ```
pub fn compute_strides_from_sizes(sizes: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; sizes.len()];
    for i in (0..sizes.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1].saturating_mul(sizes[i + 1]);
    }
    strides
}

/// Iterator over the index tuples of a shape in row-major order.
///
/// A rank-0 shape yields one empty tuple; a shape with a zero-sized
/// dimension yields nothing.
#[derive(Debug, Clone)]
pub struct RowMajorIndices {
    sizes: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl RowMajorIndices {
    pub fn new(sizes: &[usize]) -> Self {
        let next = if sizes.contains(&0) {
            None
        } else {
            Some(vec![0; sizes.len()])
        };
        Self {
            sizes: sizes.to_vec(),
            next,
        }
    }
}

impl Iterator for RowMajorIndices {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;

        let mut advanced = current.clone();
        for dim in (0..advanced.len()).rev() {
            advanced[dim] += 1;
            if advanced[dim] < self.sizes[dim] {
                self.next = Some(advanced);
                break;
            }
            advanced[dim] = 0;
        }

        Some(current)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self::new(dims.to_vec())
    }
}
