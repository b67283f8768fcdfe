// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory budget configuration and parsing.
//!
//! A [`MemoryBudget`] caps the live bytes a [`MemoryPool`](crate::MemoryPool)
//! may hand out. Lowering calls allocate their output descriptors through a
//! pool, so the budget bounds the memory a single lowering may materialise.

use crate::AllocationError;
use std::fmt;

const KIB: usize = 1024;
const MIB: usize = 1024 * KIB;
const GIB: usize = 1024 * MIB;

/// A ceiling on live allocated bytes.
///
/// # Parsing
/// - `"512M"` or `"512MB"` → 512 × 1024² bytes
/// - `"1G"` or `"1GB"` → 1 × 1024³ bytes
/// - `"64K"` or `"64KB"` → 64 × 1024 bytes
/// - `"4096"` or `"4096B"` → raw byte count
/// - `"unlimited"` → no ceiling
///
/// # Examples
/// ```
/// use memory_manager::MemoryBudget;
///
/// assert_eq!(MemoryBudget::parse("1G").unwrap().as_mb(), 1024);
/// assert!(MemoryBudget::parse("unlimited").unwrap().is_unlimited());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MemoryBudget {
    bytes: usize,
}

impl MemoryBudget {
    /// A budget that never rejects a request.
    pub const fn unlimited() -> Self {
        Self { bytes: usize::MAX }
    }

    pub fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    pub fn from_kb(kb: usize) -> Self {
        Self::from_bytes(kb.saturating_mul(KIB))
    }

    pub fn from_mb(mb: usize) -> Self {
        Self::from_bytes(mb.saturating_mul(MIB))
    }

    pub fn from_gb(gb: usize) -> Self {
        Self::from_bytes(gb.saturating_mul(GIB))
    }

    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Returns the budget in megabytes (truncated).
    pub fn as_mb(&self) -> usize {
        self.bytes / MIB
    }

    pub fn is_unlimited(&self) -> bool {
        self.bytes == usize::MAX
    }

    /// Parses a human-readable budget string. Case-insensitive.
    pub fn parse(s: &str) -> Result<Self, AllocationError> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unlimited") {
            return Ok(Self::unlimited());
        }

        let upper = s.to_ascii_uppercase();
        let (digits, multiplier) = [
            ("GB", GIB),
            ("G", GIB),
            ("MB", MIB),
            ("M", MIB),
            ("KB", KIB),
            ("K", KIB),
            ("B", 1),
        ]
        .iter()
        .find_map(|(suffix, mult)| upper.strip_suffix(suffix).map(|rest| (rest, *mult)))
        .unwrap_or((upper.as_str(), 1));

        let value: usize = digits.trim().parse().map_err(|_| {
            AllocationError::InvalidBudget(format!(
                "'{s}': expected a number with an optional K/M/G suffix, or 'unlimited'"
            ))
        })?;

        let bytes = value
            .checked_mul(multiplier)
            .ok_or_else(|| AllocationError::InvalidBudget(format!("'{s}' overflows")))?;

        if bytes == 0 {
            return Err(AllocationError::InvalidBudget(format!("'{s}' is zero")));
        }

        Ok(Self { bytes })
    }
}

impl Default for MemoryBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl fmt::Display for MemoryBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bytes {
            usize::MAX => write!(f, "unlimited"),
            b if b >= GIB && b % GIB == 0 => write!(f, "{} GB", b / GIB),
            b if b >= MIB && b % MIB == 0 => write!(f, "{} MB", b / MIB),
            b if b >= KIB && b % KIB == 0 => write!(f, "{} KB", b / KIB),
            b => write!(f, "{b} B"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(MemoryBudget::from_kb(2).as_bytes(), 2048);
        assert_eq!(MemoryBudget::from_mb(512).as_mb(), 512);
        assert_eq!(MemoryBudget::from_gb(2).as_mb(), 2048);
        assert!(MemoryBudget::default().is_unlimited());
    }

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(MemoryBudget::parse("512M").unwrap().as_mb(), 512);
        assert_eq!(MemoryBudget::parse("512mb").unwrap().as_mb(), 512);
        assert_eq!(MemoryBudget::parse("1G").unwrap().as_mb(), 1024);
        assert_eq!(MemoryBudget::parse("64k").unwrap().as_bytes(), 64 * 1024);
        assert_eq!(MemoryBudget::parse("100B").unwrap().as_bytes(), 100);
        assert_eq!(MemoryBudget::parse(" 4096 ").unwrap().as_bytes(), 4096);
    }

    #[test]
    fn test_parse_unlimited() {
        assert!(MemoryBudget::parse("Unlimited").unwrap().is_unlimited());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            MemoryBudget::parse(""),
            Err(AllocationError::InvalidBudget(_))
        ));
        assert!(MemoryBudget::parse("abc").is_err());
        assert!(MemoryBudget::parse("0M").is_err());
        assert!(MemoryBudget::parse("99999999999999999999G").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(MemoryBudget::from_gb(1).to_string(), "1 GB");
        assert_eq!(MemoryBudget::from_mb(512).to_string(), "512 MB");
        assert_eq!(MemoryBudget::from_bytes(2048).to_string(), "2 KB");
        assert_eq!(MemoryBudget::from_bytes(100).to_string(), "100 B");
        assert_eq!(MemoryBudget::unlimited().to_string(), "unlimited");
    }

    #[test]
    fn test_serde_roundtrip() {
        let b = MemoryBudget::from_mb(256);
        let json = serde_json::to_string(&b).unwrap();
        let back: MemoryBudget = serde_json::from_str(&json).unwrap();
        assert_eq!(b, back);
    }
}
