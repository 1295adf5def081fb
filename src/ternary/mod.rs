//! Balanced ternary number system primitives.
//!
//! This module provides the core types for working with balanced ternary:
//! - [`Trit`] - A single balanced ternary digit (-1, 0, +1)
//! - [`Tryte`] - A 6-trit word (one memory cell, range -364 to +364)
//! - [`Word`] - An 18-trit word (one encoded instruction)

mod trit;
mod tryte;
pub mod arith;

pub use trit::Trit;
pub use tryte::{Tryte, Word, TRITS_PER_TRYTE, TRITS_PER_WORD};
