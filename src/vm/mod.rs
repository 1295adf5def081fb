//! The Zarya stack machine.
//!
//! This module implements the complete virtual machine:
//! - 365 six-trit memory cells shared by program, data, and stack
//! - four general registers R0-R3, PC, SP, and a flags tryte
//! - the 3-tryte instruction format with a trit-packed addressing mode
//! - the trap-driven interrupt model backed by a host callback

pub mod exec;
pub mod instr;
pub mod state;

pub use exec::{NoTraps, TrapHandler, VmError};
pub use instr::{
    get_addr_mode, get_base_opcode, make_opcode, AddrMode, Instruction, Op, OpGroup, OpInfo,
    INSTRUCTION_SIZE, OP_TABLE,
};
pub use state::{VmState, MAX_ADDRESS, MEMORY_SIZE_TRYTES, NUM_REGISTERS};
