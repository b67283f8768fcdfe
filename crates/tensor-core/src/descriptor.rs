// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The runtime tensor descriptor.
//!
//! A [`TensorDescriptor`] pairs shape and stride metadata with a flat byte
//! buffer. Who releases that buffer is recorded in an explicit [`Storage`]
//! state rather than implied by a flag:
//!
//! ```text
//!   empty(dtype, rank) ──bind(buf)──► Owned ──take_buffer()──► Unbound
//!                                       │
//!   create(dtype, shape) ──────────────►┘
//!   create_unowned(&buf, ..) ─────────► Borrowed     (never released)
//!   create_unowned_mut(&mut buf, ..) ─► BorrowedMut  (never released)
//! ```
//!
//! Offsets and strides are measured in elements. The byte position of an
//! element is its linear offset times the element width.

use crate::{with_element, DType, Element, Shape, TensorError};
use memory_manager::{MemoryPool, PooledBuffer};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fmt;
use std::marker::PhantomData;

// ── Ownership state ────────────────────────────────────────────

/// Where a descriptor's bytes come from.
pub enum Storage<'a> {
    /// No buffer yet.
    Unbound,
    /// The descriptor is the sole releaser of this buffer.
    Owned(PooledBuffer),
    /// Caller memory, read-only.
    Borrowed(&'a [u8]),
    /// Caller memory, writable. Never released by the descriptor.
    BorrowedMut(&'a mut [u8]),
}

impl Storage<'_> {
    fn bytes(&self) -> Option<&[u8]> {
        match self {
            Storage::Unbound => None,
            Storage::Owned(buf) => Some(buf.as_slice()),
            Storage::Borrowed(bytes) => Some(bytes),
            Storage::BorrowedMut(bytes) => Some(bytes),
        }
    }

    fn ownership(&self) -> Ownership {
        match self {
            Storage::Unbound => Ownership::Unbound,
            Storage::Owned(_) => Ownership::Owned,
            Storage::Borrowed(_) | Storage::BorrowedMut(_) => Ownership::Borrowed,
        }
    }
}

/// Summary of a descriptor's [`Storage`] state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Ownership {
    Unbound,
    Owned,
    Borrowed,
}

// ── Descriptor ─────────────────────────────────────────────────

/// An N-dimensional strided view over a typed buffer.
///
/// # Examples
/// ```
/// use tensor_core::{DType, Ownership, TensorDescriptor};
///
/// let mut t = TensorDescriptor::create(DType::F32, [2, 3]).unwrap();
/// assert_eq!(t.ownership(), Ownership::Owned);
/// assert_eq!(t.strides(), &[3, 1]);
///
/// t.set::<f32>(&[1, 2], 7.5).unwrap();
/// assert_eq!(t.get::<f32>(&[1, 2]).unwrap(), 7.5);
/// assert!(t.get::<f32>(&[2, 0]).is_err());
/// ```
pub struct TensorDescriptor<'a> {
    dtype: DType,
    shape: Shape,
    strides: Vec<usize>,
    offset: usize,
    storage: Storage<'a>,
    name: Option<String>,
}

impl TensorDescriptor<'static> {
    /// Creates an unbound descriptor of fixed rank with all sizes zero.
    pub fn empty(dtype: DType, rank: usize) -> Self {
        Self {
            dtype,
            shape: Shape::new(vec![0; rank]),
            strides: vec![0; rank],
            offset: 0,
            storage: Storage::Unbound,
            name: None,
        }
    }

    /// Allocates a zero-filled, owned, row-major descriptor.
    pub fn create(dtype: DType, shape: impl Into<Shape>) -> Result<Self, TensorError> {
        Self::create_in(&MemoryPool::unbounded(), dtype, shape)
    }

    /// Like [`create`](Self::create) but charges the allocation to `pool`.
    pub fn create_in(
        pool: &MemoryPool,
        dtype: DType,
        shape: impl Into<Shape>,
    ) -> Result<Self, TensorError> {
        let shape = shape.into();
        let elements = shape.checked_num_elements().ok_or(
            memory_manager::AllocationError::SizeOverflow {
                elements: usize::MAX,
                element_bytes: dtype.size_bytes(),
            },
        )?;
        let buffer = pool.allocate_elements(elements, dtype.size_bytes())?;

        tracing::debug!(
            dtype = %dtype,
            shape = %shape,
            bytes = buffer.len(),
            "allocated owned descriptor"
        );

        Ok(Self {
            dtype,
            strides: shape.contiguous_strides(),
            shape,
            offset: 0,
            storage: Storage::Owned(buffer),
            name: None,
        })
    }

    /// Creates an owned descriptor holding a copy of `values` in row-major
    /// order.
    pub fn from_slice<T: Element>(shape: impl Into<Shape>, values: &[T]) -> Result<Self, TensorError> {
        let shape = shape.into();
        let width = T::DTYPE.size_bytes();
        if values.len() != shape.num_elements() {
            return Err(TensorError::BufferSizeMismatch {
                expected: shape.num_elements() * width,
                actual: values.len() * width,
            });
        }
        let mut desc = Self::create(T::DTYPE, shape)?;
        if let Storage::Owned(buf) = &mut desc.storage {
            buf.as_mut_slice()
                .copy_from_slice(bytemuck::cast_slice(values));
        }
        Ok(desc)
    }
}

impl<'a> TensorDescriptor<'a> {
    /// Binds a descriptor to read-only caller memory in row-major layout.
    pub fn create_unowned(
        buffer: &'a [u8],
        shape: impl Into<Shape>,
        dtype: DType,
    ) -> Result<Self, TensorError> {
        Self::unowned(Storage::Borrowed(buffer), shape.into(), dtype)
    }

    /// Binds a descriptor to writable caller memory in row-major layout.
    pub fn create_unowned_mut(
        buffer: &'a mut [u8],
        shape: impl Into<Shape>,
        dtype: DType,
    ) -> Result<Self, TensorError> {
        Self::unowned(Storage::BorrowedMut(buffer), shape.into(), dtype)
    }

    fn unowned(storage: Storage<'a>, shape: Shape, dtype: DType) -> Result<Self, TensorError> {
        let desc = Self {
            dtype,
            strides: shape.contiguous_strides(),
            shape,
            offset: 0,
            storage,
            name: None,
        };
        desc.check_fits()?;
        Ok(desc)
    }

    /// Attaches an owned buffer to an unbound descriptor.
    pub fn bind(&mut self, buffer: PooledBuffer) -> Result<(), TensorError> {
        if !matches!(self.storage, Storage::Unbound) {
            return Err(TensorError::AlreadyBound);
        }
        let required = self.required_bytes()?;
        if buffer.len() < required {
            return Err(TensorError::BufferSizeMismatch {
                expected: required,
                actual: buffer.len(),
            });
        }
        self.storage = Storage::Owned(buffer);
        Ok(())
    }

    /// Moves an owned buffer out, leaving the descriptor unbound.
    ///
    /// Returns `None` for borrowed or unbound descriptors.
    pub fn take_buffer(&mut self) -> Option<PooledBuffer> {
        match std::mem::replace(&mut self.storage, Storage::Unbound) {
            Storage::Owned(buf) => Some(buf),
            other => {
                self.storage = other;
                None
            }
        }
    }

    /// A read-only borrowed descriptor sharing this one's buffer and layout.
    pub fn view(&self) -> Result<TensorDescriptor<'_>, TensorError> {
        let bytes = self.storage.bytes().ok_or(TensorError::Unbound)?;
        Ok(TensorDescriptor {
            dtype: self.dtype,
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
            storage: Storage::Borrowed(bytes),
            name: self.name.clone(),
        })
    }

    // ── Metadata ───────────────────────────────────────────────

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn sizes(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// Element offset of the first element.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn byte_offset(&self) -> usize {
        self.offset * self.dtype.size_bytes()
    }

    pub fn num_elements(&self) -> usize {
        self.shape.num_elements()
    }

    /// Logical payload size: `num_elements() * element width`.
    pub fn buffer_size_bytes(&self) -> usize {
        self.num_elements() * self.dtype.size_bytes()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.set_name(name);
        self
    }

    pub fn ownership(&self) -> Ownership {
        self.storage.ownership()
    }

    pub fn is_bound(&self) -> bool {
        !matches!(self.storage, Storage::Unbound)
    }

    /// True when strides equal the row-major strides of the shape.
    /// Dimensions of size 1 may carry any stride.
    pub fn is_contiguous(&self) -> bool {
        let expected = self.shape.contiguous_strides();
        self.sizes()
            .iter()
            .zip(self.strides.iter().zip(&expected))
            .all(|(&size, (&s, &e))| size <= 1 || s == e)
    }

    // ── Layout mutation (rank is fixed) ───────────────────────

    /// Replaces the sizes and re-derives row-major strides.
    ///
    /// The element count must be unchanged and the current layout must be
    /// contiguous.
    pub fn reshape(&mut self, new_shape: impl Into<Shape>) -> Result<(), TensorError> {
        let new_shape = new_shape.into();
        if new_shape.rank() != self.rank() {
            return Err(TensorError::RankMismatch {
                expected: self.rank(),
                actual: new_shape.rank(),
            });
        }
        if new_shape.checked_num_elements() != Some(self.num_elements()) {
            return Err(TensorError::ShapeMismatch {
                op: "reshape",
                lhs: self.shape.clone(),
                rhs: new_shape,
            });
        }
        if !self.is_contiguous() {
            return Err(TensorError::NonContiguous { op: "reshape" });
        }
        self.strides = new_shape.contiguous_strides();
        self.shape = new_shape;
        Ok(())
    }

    /// Sets sizes on a descriptor, typically an unbound one before `bind`.
    ///
    /// Strides are re-derived. A bound buffer must still cover every
    /// reachable element.
    pub fn set_shape(&mut self, shape: impl Into<Shape>) -> Result<(), TensorError> {
        let shape = shape.into();
        if shape.rank() != self.rank() {
            return Err(TensorError::RankMismatch {
                expected: self.rank(),
                actual: shape.rank(),
            });
        }
        let previous = (
            std::mem::replace(&mut self.strides, shape.contiguous_strides()),
            std::mem::replace(&mut self.shape, shape),
        );
        if let Err(e) = self.check_fits() {
            (self.strides, self.shape) = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Overrides the strides with a custom layout.
    pub fn set_strides(&mut self, strides: Vec<usize>) -> Result<(), TensorError> {
        if strides.len() != self.rank() {
            return Err(TensorError::RankMismatch {
                expected: self.rank(),
                actual: strides.len(),
            });
        }
        let previous = std::mem::replace(&mut self.strides, strides);
        if let Err(e) = self.check_fits() {
            self.strides = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Replaces sizes and strides together, e.g. to describe a transposed
    /// view of the same buffer.
    pub fn set_layout(
        &mut self,
        shape: impl Into<Shape>,
        strides: Vec<usize>,
    ) -> Result<(), TensorError> {
        let shape = shape.into();
        for len in [shape.rank(), strides.len()] {
            if len != self.rank() {
                return Err(TensorError::RankMismatch {
                    expected: self.rank(),
                    actual: len,
                });
            }
        }
        let previous = (
            std::mem::replace(&mut self.strides, strides),
            std::mem::replace(&mut self.shape, shape),
        );
        if let Err(e) = self.check_fits() {
            (self.strides, self.shape) = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Restores row-major strides for the current sizes.
    pub fn recompute_strides(&mut self) {
        self.strides = self.shape.contiguous_strides();
    }

    /// Sets the element offset of the first element.
    pub fn set_offset(&mut self, offset: usize) -> Result<(), TensorError> {
        let previous = std::mem::replace(&mut self.offset, offset);
        if let Err(e) = self.check_fits() {
            self.offset = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Linear offset of the last reachable element, or `None` when the
    /// descriptor has no elements.
    ///
    /// Fails with [`TensorError::LayoutOverflow`] when the layout addresses
    /// past `usize::MAX`.
    pub fn max_linear_offset(&self) -> Result<Option<usize>, TensorError> {
        if self.num_elements() == 0 {
            return Ok(None);
        }
        self.sizes()
            .iter()
            .zip(&self.strides)
            .try_fold(self.offset, |acc, (&size, &stride)| {
                (size - 1).checked_mul(stride)?.checked_add(acc)
            })
            .map(Some)
            .ok_or_else(|| self.overflow())
    }

    fn required_bytes(&self) -> Result<usize, TensorError> {
        match self.max_linear_offset()? {
            None => Ok(0),
            Some(last) => last
                .checked_add(1)
                .and_then(|count| count.checked_mul(self.dtype.size_bytes()))
                .ok_or_else(|| self.overflow()),
        }
    }

    fn overflow(&self) -> TensorError {
        TensorError::LayoutOverflow {
            sizes: self.sizes().to_vec(),
            strides: self.strides.clone(),
            offset: self.offset,
        }
    }

    fn check_fits(&self) -> Result<(), TensorError> {
        let required = self.required_bytes()?;
        if let Some(bytes) = self.storage.bytes() {
            if bytes.len() < required {
                return Err(TensorError::BufferSizeMismatch {
                    expected: required,
                    actual: bytes.len(),
                });
            }
        }
        Ok(())
    }

    // ── Element access ─────────────────────────────────────────

    /// `offset + Σ indices[i] * strides[i]`, bounds-checked.
    pub fn linear_offset(&self, indices: &[usize]) -> Result<usize, TensorError> {
        if indices.len() != self.rank() {
            return Err(TensorError::RankMismatch {
                expected: self.rank(),
                actual: indices.len(),
            });
        }
        let mut linear = self.offset;
        for (dim, ((&index, &size), &stride)) in
            indices.iter().zip(self.sizes()).zip(&self.strides).enumerate()
        {
            if index >= size {
                return Err(TensorError::IndexOutOfBounds { dim, index, size });
            }
            linear = index
                .checked_mul(stride)
                .and_then(|step| linear.checked_add(step))
                .ok_or_else(|| self.overflow())?;
        }
        Ok(linear)
    }

    /// The bytes of the element at `indices`.
    pub fn element_at(&self, indices: &[usize]) -> Result<&[u8], TensorError> {
        let linear = self.linear_offset(indices)?;
        let width = self.dtype.size_bytes();
        let bytes = self.bytes()?;
        Ok(&bytes[linear * width..(linear + 1) * width])
    }

    /// Mutable bytes of the element at `indices`.
    pub fn element_at_mut(&mut self, indices: &[usize]) -> Result<&mut [u8], TensorError> {
        let linear = self.linear_offset(indices)?;
        let width = self.dtype.size_bytes();
        let bytes = self.bytes_mut()?;
        Ok(&mut bytes[linear * width..(linear + 1) * width])
    }

    pub fn get<T: Element>(&self, indices: &[usize]) -> Result<T, TensorError> {
        self.check_dtype::<T>()?;
        Ok(bytemuck::pod_read_unaligned(self.element_at(indices)?))
    }

    pub fn set<T: Element>(&mut self, indices: &[usize], value: T) -> Result<(), TensorError> {
        self.check_dtype::<T>()?;
        self.element_at_mut(indices)?
            .copy_from_slice(bytemuck::bytes_of(&value));
        Ok(())
    }

    /// The whole backing buffer.
    pub fn bytes(&self) -> Result<&[u8], TensorError> {
        self.storage.bytes().ok_or(TensorError::Unbound)
    }

    pub fn bytes_mut(&mut self) -> Result<&mut [u8], TensorError> {
        match &mut self.storage {
            Storage::Unbound => Err(TensorError::Unbound),
            Storage::Borrowed(_) => Err(TensorError::ReadOnly),
            Storage::Owned(buf) => Ok(buf.as_mut_slice()),
            Storage::BorrowedMut(bytes) => Ok(bytes),
        }
    }

    /// Typed reader addressed by absolute linear offset.
    pub fn reader<T: Element>(&self) -> Result<ElementReader<'_, T>, TensorError> {
        self.check_dtype::<T>()?;
        Ok(ElementReader {
            bytes: self.bytes()?,
            _marker: PhantomData,
        })
    }

    /// Typed writer addressed by absolute linear offset.
    pub fn writer<T: Element>(&mut self) -> Result<ElementWriter<'_, T>, TensorError> {
        self.check_dtype::<T>()?;
        Ok(ElementWriter {
            bytes: self.bytes_mut()?,
            _marker: PhantomData,
        })
    }

    fn check_dtype<T: Element>(&self) -> Result<(), TensorError> {
        if T::DTYPE != self.dtype {
            return Err(TensorError::DTypeMismatch {
                expected: T::DTYPE,
                actual: self.dtype,
            });
        }
        Ok(())
    }

    // ── Bulk helpers ───────────────────────────────────────────

    /// Gathers all elements in logical row-major order.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, TensorError> {
        let reader = self.reader::<T>()?;
        self.shape
            .index_set()
            .map(|idx| self.linear_offset(&idx).map(|o| reader.load(o)))
            .collect()
    }

    /// Writes `value` to every logical element.
    pub fn fill<T: Element>(&mut self, value: T) -> Result<(), TensorError> {
        let offsets = self.logical_offsets()?;
        let mut writer = self.writer::<T>()?;
        for o in offsets {
            writer.store(o, value);
        }
        Ok(())
    }

    /// All elements widened to `f64`, in logical row-major order.
    pub fn values_f64(&self) -> Result<Vec<f64>, TensorError> {
        with_element!(self.dtype, T => {
            Ok(self.to_vec::<T>()?.into_iter().map(Element::to_f64).collect())
        }, else {
            let bytes = self.bytes()?;
            self.logical_offsets()
                .map(|offsets| offsets.into_iter().map(|o| f64::from(bytes[o])).collect())
        })
    }

    /// Fills every element with a uniform sample from `[lo, hi]`,
    /// deterministically for a given seed. Integer kinds truncate.
    pub fn fill_random(&mut self, lo: f64, hi: f64, seed: u64) -> Result<(), TensorError> {
        if !(lo <= hi) || !lo.is_finite() || !hi.is_finite() {
            return Err(TensorError::Numeric {
                op: "fill_random",
                detail: format!("invalid range [{lo}, {hi}]"),
            });
        }
        let offsets = self.logical_offsets()?;
        let mut rng = StdRng::seed_from_u64(seed);
        with_element!(self.dtype, T => {
            let mut writer = self.writer::<T>()?;
            for o in offsets {
                writer.store(o, T::from_f64(rng.gen_range(lo..=hi)));
            }
            Ok(())
        }, else {
            let bytes = self.bytes_mut()?;
            for o in offsets {
                bytes[o] = u8::from(rng.gen_bool(0.5));
            }
            Ok(())
        })
    }

    fn logical_offsets(&self) -> Result<Vec<usize>, TensorError> {
        self.shape
            .index_set()
            .map(|idx| self.linear_offset(&idx))
            .collect()
    }
}

impl fmt::Debug for TensorDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorDescriptor")
            .field("name", &self.name)
            .field("dtype", &self.dtype)
            .field("sizes", &self.sizes())
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .field("ownership", &self.ownership())
            .finish()
    }
}

// ── Typed element access ───────────────────────────────────────

/// Reads elements of type `T` from a descriptor buffer.
pub struct ElementReader<'b, T> {
    bytes: &'b [u8],
    _marker: PhantomData<T>,
}

impl<T: Element> ElementReader<'_, T> {
    /// Reads the element at an absolute linear offset.
    ///
    /// # Panics
    /// Panics if the offset lies outside the buffer.
    #[inline]
    pub fn load(&self, offset: usize) -> T {
        let w = std::mem::size_of::<T>();
        bytemuck::pod_read_unaligned(&self.bytes[offset * w..(offset + 1) * w])
    }
}

/// Reads and writes elements of type `T` in a descriptor buffer.
pub struct ElementWriter<'b, T> {
    bytes: &'b mut [u8],
    _marker: PhantomData<T>,
}

impl<T: Element> ElementWriter<'_, T> {
    #[inline]
    pub fn load(&self, offset: usize) -> T {
        let w = std::mem::size_of::<T>();
        bytemuck::pod_read_unaligned(&self.bytes[offset * w..(offset + 1) * w])
    }

    /// Writes the element at an absolute linear offset.
    ///
    /// # Panics
    /// Panics if the offset lies outside the buffer.
    #[inline]
    pub fn store(&mut self, offset: usize, value: T) {
        let w = std::mem::size_of::<T>();
        self.bytes[offset * w..(offset + 1) * w].copy_from_slice(bytemuck::bytes_of(&value));
    }
}
