//! Single balanced ternary digit (trit).
//!
//! A trit holds one of three values: -1, 0, or +1.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single balanced ternary digit.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trit {
    /// Negative (-1)
    N,
    /// Zero (0)
    O,
    /// Positive (+1)
    P,
}

impl Trit {
    /// All possible trit values in order: N, O, P
    pub const ALL: [Trit; 3] = [Trit::N, Trit::O, Trit::P];

    /// Create a trit from an integer value.
    ///
    /// # Panics
    /// Panics if value is not in {-1, 0, 1}.
    #[inline]
    pub fn from_i8(value: i8) -> Self {
        match value {
            -1 => Trit::N,
            0 => Trit::O,
            1 => Trit::P,
            _ => panic!("Invalid trit value: {} (must be -1, 0, or 1)", value),
        }
    }

    /// Convert to integer value.
    #[inline]
    pub const fn to_i8(self) -> i8 {
        match self {
            Trit::N => -1,
            Trit::O => 0,
            Trit::P => 1,
        }
    }

    /// Negate the trit (flip N ↔ P, O stays O).
    #[inline]
    pub const fn neg(self) -> Self {
        match self {
            Trit::N => Trit::P,
            Trit::O => Trit::O,
            Trit::P => Trit::N,
        }
    }

    /// Tri-valued AND. Zero absorbs; P only when both operands are P.
    ///
    /// ```text
    ///        N  O  P
    ///    N   N  O  N
    ///    O   O  O  O
    ///    P   N  O  P
    /// ```
    #[inline]
    pub const fn and(self, other: Self) -> Self {
        match (self, other) {
            (Trit::O, _) | (_, Trit::O) => Trit::O,
            (Trit::P, Trit::P) => Trit::P,
            _ => Trit::N,
        }
    }

    /// Tri-valued OR. P dominates; zero yields the other operand.
    ///
    /// ```text
    ///        N  O  P
    ///    N   N  N  P
    ///    O   N  O  P
    ///    P   P  P  P
    /// ```
    #[inline]
    pub const fn or(self, other: Self) -> Self {
        match (self, other) {
            (Trit::P, _) | (_, Trit::P) => Trit::P,
            (Trit::O, t) => t,
            (t, Trit::O) => t,
            _ => Trit::N,
        }
    }

    /// Returns true if this trit is zero.
    #[inline]
    pub const fn is_zero(self) -> bool {
        matches!(self, Trit::O)
    }
}

impl Default for Trit {
    fn default() -> Self {
        Trit::O
    }
}

impl fmt::Debug for Trit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trit::N => write!(f, "N"),
            Trit::O => write!(f, "O"),
            Trit::P => write!(f, "P"),
        }
    }
}

impl fmt::Display for Trit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trit::N => write!(f, "-"),
            Trit::O => write!(f, "0"),
            Trit::P => write!(f, "+"),
        }
    }
}

impl std::ops::Neg for Trit {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Trit::neg(self)
    }
}

impl From<i8> for Trit {
    fn from(value: i8) -> Self {
        Trit::from_i8(value)
    }
}

impl From<Trit> for i8 {
    fn from(trit: Trit) -> Self {
        trit.to_i8()
    }
}
