//! # Zarya
//!
//! A balanced ternary virtual machine and its TRIAS assembler.
//!
//! The machine computes in trits (-1, 0, +1) packed six to a tryte; an
//! instruction is three trytes with the addressing mode folded into the
//! opcode's top trit. Programs are stack-oriented and interact with the
//! host through synchronous traps raised by the `INT` instruction.

pub mod asm;
pub mod emu;
pub mod ternary;
pub mod vm;

// Re-export commonly used types
pub use asm::{assemble, load_image, save_image, AsmError};
pub use emu::{Console, Emulator};
pub use ternary::{Trit, Tryte, Word};
pub use vm::{NoTraps, TrapHandler, VmError, VmState};
