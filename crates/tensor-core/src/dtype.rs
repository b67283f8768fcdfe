// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element kinds and their Rust counterparts.
//!
//! [`DType`] is the run-time tag stored in every descriptor. [`Element`]
//! connects a Rust scalar type to its tag and supplies the arithmetic the
//! lowering kernels need, so kernels can be written once and instantiated
//! per element kind through [`with_element!`](crate::with_element).

use half::{bf16, f16};
use std::fmt;

/// Enumerates the element kinds a descriptor can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    F32,
    F64,
    F16,
    BF16,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    /// One byte per element, zero or one.
    Bool,
}

impl DType {
    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::I8 | DType::U8 | DType::Bool => 1,
            DType::F16 | DType::BF16 | DType::I16 | DType::U16 => 2,
            DType::F32 | DType::I32 | DType::U32 => 4,
            DType::F64 | DType::I64 | DType::U64 => 8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::F16 => "f16",
            DType::BF16 => "bf16",
            DType::I8 => "i8",
            DType::I16 => "i16",
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::U8 => "u8",
            DType::U16 => "u16",
            DType::U32 => "u32",
            DType::U64 => "u64",
            DType::Bool => "bool",
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, DType::F32 | DType::F64 | DType::F16 | DType::BF16)
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            DType::I8
                | DType::I16
                | DType::I32
                | DType::I64
                | DType::U8
                | DType::U16
                | DType::U32
                | DType::U64
        )
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Rust scalar type that can live in a descriptor buffer.
///
/// Integer arithmetic wraps. The 16-bit float kinds compute through `f32`.
pub trait Element: bytemuck::Pod + PartialOrd + fmt::Debug + Send + Sync + 'static {
    const DTYPE: DType;

    fn zero() -> Self;
    fn one() -> Self;
    /// Identity of a max-reduction.
    fn lowest() -> Self;
    /// Identity of a min-reduction.
    fn highest() -> Self;

    fn to_f64(self) -> f64;
    fn from_f64(v: f64) -> Self;

    fn elem_add(self, rhs: Self) -> Self;
    fn elem_mul(self, rhs: Self) -> Self;
    /// Divides by an element count (used by mean reductions).
    fn div_count(self, n: usize) -> Self;
}

macro_rules! impl_float_element {
    ($t:ty, $dtype:expr) => {
        impl Element for $t {
            const DTYPE: DType = $dtype;

            fn zero() -> Self {
                0.0
            }
            fn one() -> Self {
                1.0
            }
            fn lowest() -> Self {
                <$t>::NEG_INFINITY
            }
            fn highest() -> Self {
                <$t>::INFINITY
            }
            fn to_f64(self) -> f64 {
                self as f64
            }
            fn from_f64(v: f64) -> Self {
                v as $t
            }
            fn elem_add(self, rhs: Self) -> Self {
                self + rhs
            }
            fn elem_mul(self, rhs: Self) -> Self {
                self * rhs
            }
            fn div_count(self, n: usize) -> Self {
                self / n as $t
            }
        }
    };
}

macro_rules! impl_half_element {
    ($t:ty, $dtype:expr) => {
        impl Element for $t {
            const DTYPE: DType = $dtype;

            fn zero() -> Self {
                <$t>::ZERO
            }
            fn one() -> Self {
                <$t>::ONE
            }
            fn lowest() -> Self {
                <$t>::NEG_INFINITY
            }
            fn highest() -> Self {
                <$t>::INFINITY
            }
            fn to_f64(self) -> f64 {
                f64::from(self.to_f32())
            }
            fn from_f64(v: f64) -> Self {
                <$t>::from_f32(v as f32)
            }
            fn elem_add(self, rhs: Self) -> Self {
                <$t>::from_f32(self.to_f32() + rhs.to_f32())
            }
            fn elem_mul(self, rhs: Self) -> Self {
                <$t>::from_f32(self.to_f32() * rhs.to_f32())
            }
            fn div_count(self, n: usize) -> Self {
                <$t>::from_f32(self.to_f32() / n as f32)
            }
        }
    };
}

macro_rules! impl_int_element {
    ($t:ty, $dtype:expr) => {
        impl Element for $t {
            const DTYPE: DType = $dtype;

            fn zero() -> Self {
                0
            }
            fn one() -> Self {
                1
            }
            fn lowest() -> Self {
                <$t>::MIN
            }
            fn highest() -> Self {
                <$t>::MAX
            }
            fn to_f64(self) -> f64 {
                self as f64
            }
            fn from_f64(v: f64) -> Self {
                v as $t
            }
            fn elem_add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }
            fn elem_mul(self, rhs: Self) -> Self {
                self.wrapping_mul(rhs)
            }
            fn div_count(self, n: usize) -> Self {
                if n == 0 {
                    return self;
                }
                (self as i128 / n as i128) as $t
            }
        }
    };
}

impl_float_element!(f32, DType::F32);
impl_float_element!(f64, DType::F64);
impl_half_element!(f16, DType::F16);
impl_half_element!(bf16, DType::BF16);
impl_int_element!(i8, DType::I8);
impl_int_element!(i16, DType::I16);
impl_int_element!(i32, DType::I32);
impl_int_element!(i64, DType::I64);
impl_int_element!(u8, DType::U8);
impl_int_element!(u16, DType::U16);
impl_int_element!(u32, DType::U32);
impl_int_element!(u64, DType::U64);

/// Instantiates a generic body for the Rust type behind a [`DType`].
///
/// `Bool` has no [`Element`] impl and takes the `else` branch.
///
/// ```
/// use tensor_core::{with_element, DType, Element};
///
/// fn width(dtype: DType) -> Option<usize> {
///     with_element!(dtype, T => Some(std::mem::size_of::<T>()), else None)
/// }
/// assert_eq!(width(DType::BF16), Some(2));
/// assert_eq!(width(DType::Bool), None);
/// ```
#[macro_export]
macro_rules! with_element {
    ($dtype:expr, $T:ident => $body:expr, else $otherwise:expr) => {
        match $dtype {
            $crate::DType::F32 => {
                type $T = f32;
                $body
            }
            $crate::DType::F64 => {
                type $T = f64;
                $body
            }
            $crate::DType::F16 => {
                type $T = $crate::half::f16;
                $body
            }
            $crate::DType::BF16 => {
                type $T = $crate::half::bf16;
                $body
            }
            $crate::DType::I8 => {
                type $T = i8;
                $body
            }
            $crate::DType::I16 => {
                type $T = i16;
                $body
            }
            $crate::DType::I32 => {
                type $T = i32;
                $body
            }
            $crate::DType::I64 => {
                type $T = i64;
                $body
            }
            $crate::DType::U8 => {
                type $T = u8;
                $body
            }
            $crate::DType::U16 => {
                type $T = u16;
                $body
            }
            $crate::DType::U32 => {
                type $T = u32;
                $body
            }
            $crate::DType::U64 => {
                type $T = u64;
                $body
            }
            $crate::DType::Bool => $otherwise,
        }
    };
}
