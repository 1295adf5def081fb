//! Fixed-width balanced ternary words.
//!
//! This module provides the two machine sizes used by the VM:
//! - [`Tryte`]: 6 trits, one memory cell, value range [-364, +364]
//! - [`Word`]: 18 trits, one encoded instruction (three trytes)
//!
//! Both carry their integer value alongside the trit sequence so the hot
//! paths (comparisons, address arithmetic) never re-walk the trits. The
//! cache is an invariant: it always equals Σ tritᵢ·3ⁱ, which is why the
//! trit arrays are private and every constructor recomputes it.

use crate::ternary::Trit;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of trits in a tryte.
pub const TRITS_PER_TRYTE: usize = 6;

/// Number of trits in a machine word (three trytes).
pub const TRITS_PER_WORD: usize = 18;

/// A 6-trit balanced ternary word with its cached integer value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Tryte {
    /// Trits stored from least significant (index 0) to most significant.
    trits: [Trit; TRITS_PER_TRYTE],
    value: i32,
}

/// An 18-trit word holding one encoded instruction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Word {
    trits: [Trit; TRITS_PER_WORD],
    value: i64,
}

impl Tryte {
    /// Maximum representable value: +364 (all P's).
    pub const MAX: i32 = 364;

    /// Minimum representable value: -364 (all N's).
    pub const MIN: i32 = -364;

    /// The all-zero tryte.
    #[inline]
    pub const fn zero() -> Self {
        Self { trits: [Trit::O; TRITS_PER_TRYTE], value: 0 }
    }

    /// Build a tryte from a trit array (LSB first).
    pub fn from_trits(trits: [Trit; TRITS_PER_TRYTE]) -> Self {
        let mut value = 0;
        let mut power = 1;
        for t in trits {
            value += t.to_i8() as i32 * power;
            power *= 3;
        }
        Self { trits, value }
    }

    /// Encode a decimal integer in balanced ternary.
    ///
    /// Values outside [-364, +364] wrap modulo 3^6: the balanced digits
    /// beyond the sixth position are discarded, so `from_int(365) == -364`.
    pub fn from_int(value: i32) -> Self {
        let mut trits = [Trit::O; TRITS_PER_TRYTE];
        let negative = value < 0;
        let mut temp = if negative { -(value as i64) } else { value as i64 };

        for trit in trits.iter_mut() {
            let mut rem = temp % 3;
            temp /= 3;
            // Digit 2 becomes -1 with a carry into the next position
            if rem == 2 {
                rem = -1;
                temp += 1;
            }
            *trit = if negative {
                Trit::from_i8(-rem as i8)
            } else {
                Trit::from_i8(rem as i8)
            };
        }

        Self::from_trits(trits)
    }

    /// The cached integer value.
    #[inline]
    pub const fn value(&self) -> i32 {
        self.value
    }

    /// The underlying trit sequence (LSB first).
    #[inline]
    pub const fn trits(&self) -> &[Trit; TRITS_PER_TRYTE] {
        &self.trits
    }

    /// A single trit by index (0 = LSB).
    #[inline]
    pub const fn get(&self, index: usize) -> Trit {
        self.trits[index]
    }

    /// Return a copy with one trit replaced, cache re-established.
    pub fn with_trit(&self, index: usize, trit: Trit) -> Self {
        let mut trits = self.trits;
        trits[index] = trit;
        Self::from_trits(trits)
    }

    /// Negate all trits.
    pub fn neg(&self) -> Self {
        let mut trits = self.trits;
        for t in trits.iter_mut() {
            *t = t.neg();
        }
        Self { trits, value: -self.value }
    }

    /// Check if this tryte is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.value == 0
    }
}

impl Word {
    /// The all-zero word.
    #[inline]
    pub const fn zero() -> Self {
        Self { trits: [Trit::O; TRITS_PER_WORD], value: 0 }
    }

    /// Build a word from a trit array (LSB first).
    pub fn from_trits(trits: [Trit; TRITS_PER_WORD]) -> Self {
        let mut value = 0;
        let mut power = 1i64;
        for t in trits {
            value += t.to_i8() as i64 * power;
            power *= 3;
        }
        Self { trits, value }
    }

    /// Concatenate three trytes (little-endian by tryte).
    pub fn from_trytes(t0: &Tryte, t1: &Tryte, t2: &Tryte) -> Self {
        let mut trits = [Trit::O; TRITS_PER_WORD];
        for i in 0..TRITS_PER_TRYTE {
            trits[i] = t0.get(i);
            trits[i + TRITS_PER_TRYTE] = t1.get(i);
            trits[i + 2 * TRITS_PER_TRYTE] = t2.get(i);
        }
        Self::from_trits(trits)
    }

    /// Extract one of the three trytes (0 = least significant).
    pub fn tryte(&self, index: usize) -> Tryte {
        assert!(index < 3, "word tryte index {} out of range", index);
        let mut trits = [Trit::O; TRITS_PER_TRYTE];
        for (i, t) in trits.iter_mut().enumerate() {
            *t = self.trits[index * TRITS_PER_TRYTE + i];
        }
        Tryte::from_trits(trits)
    }

    /// The cached integer value.
    #[inline]
    pub const fn value(&self) -> i64 {
        self.value
    }

    /// The underlying trit sequence (LSB first).
    #[inline]
    pub const fn trits(&self) -> &[Trit; TRITS_PER_WORD] {
        &self.trits
    }
}

impl fmt::Display for Tryte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..TRITS_PER_TRYTE).rev() {
            write!(f, "{}", self.trits[i])?;
        }
        Ok(())
    }
}

impl fmt::Debug for Tryte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tryte({} = {})", self, self.value)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..TRITS_PER_WORD).rev() {
            write!(f, "{}", self.trits[i])?;
            if i > 0 && i % TRITS_PER_TRYTE == 0 {
                write!(f, " ")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word({} = {})", self, self.value)
    }
}

impl std::ops::Neg for Tryte {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Tryte::neg(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tryte_zero() {
        let zero = Tryte::zero();
        assert_eq!(zero.value(), 0);
        assert!(zero.is_zero());
    }

    #[test]
    fn test_tryte_from_int_roundtrip() {
        for val in [-364, -100, -42, -1, 0, 1, 42, 100, 364] {
            assert_eq!(Tryte::from_int(val).value(), val);
        }
    }

    #[test]
    fn test_tryte_wraps_beyond_range() {
        // One past the top wraps to the bottom (mod 3^6) and vice versa
        assert_eq!(Tryte::from_int(365).value(), -364);
        assert_eq!(Tryte::from_int(-365).value(), 364);
        assert_eq!(Tryte::from_int(729).value(), 0);
        assert_eq!(Tryte::from_int(1000).value(), 1000 - 729);
    }

    #[test]
    fn test_cache_matches_trits() {
        for val in [-364, -17, 0, 5, 121, 364] {
            let t = Tryte::from_int(val);
            let mut recomputed = 0;
            let mut power = 1;
            for trit in t.trits() {
                recomputed += trit.to_i8() as i32 * power;
                power *= 3;
            }
            assert_eq!(t.value(), recomputed);
        }
    }

    #[test]
    fn test_tryte_negation() {
        let value = Tryte::from_int(42);
        assert_eq!(value.neg().value(), -42);
        assert_eq!(value.neg().neg(), value);
    }

    #[test]
    fn test_with_trit_recomputes_cache() {
        // 0 with the top trit set to P is +243
        let t = Tryte::zero().with_trit(5, Trit::P);
        assert_eq!(t.value(), 243);
        assert_eq!(t.with_trit(5, Trit::O).value(), 0);
    }

    #[test]
    fn test_word_from_trytes() {
        let t0 = Tryte::from_int(5);
        let t1 = Tryte::from_int(-17);
        let t2 = Tryte::from_int(100);
        let word = Word::from_trytes(&t0, &t1, &t2);

        assert_eq!(word.tryte(0), t0);
        assert_eq!(word.tryte(1), t1);
        assert_eq!(word.tryte(2), t2);
        assert_eq!(
            word.value(),
            5 + (-17_i64) * 729 + 100 * 729 * 729
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Tryte::from_int(1)), "00000+");
        assert_eq!(format!("{}", Tryte::from_int(-1)), "00000-");
        assert_eq!(format!("{}", Tryte::from_int(8)), "000+0-");
    }
}
