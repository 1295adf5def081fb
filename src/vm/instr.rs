//! Instruction model: opcode table, addressing modes, encode/decode.
//!
//! An instruction is one 18-trit word made of three trytes: opcode,
//! operand1, operand2. The opcode tryte packs the addressing mode into its
//! most significant trit; the remaining five trits hold the base opcode in
//! [-121, +121].

use crate::ternary::{Trit, Tryte, Word, TRITS_PER_TRYTE};
use serde::{Deserialize, Serialize};

/// Size of one encoded instruction, in trytes.
pub const INSTRUCTION_SIZE: usize = 3;

/// How an operand tryte is interpreted, encoded in the opcode's high trit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddrMode {
    /// Operand is a literal value (mode trit N, prefix `#` or none).
    Immediate,
    /// Operand names a register index (mode trit O, bare `Rn`).
    Register,
    /// Operand names a register holding a memory address (mode trit P, `@`).
    Indirect,
}

impl AddrMode {
    /// Decode from the opcode's high trit.
    pub fn from_trit(t: Trit) -> Self {
        match t {
            Trit::N => AddrMode::Immediate,
            Trit::O => AddrMode::Register,
            Trit::P => AddrMode::Indirect,
        }
    }

    /// Encode as a trit for the opcode's high position.
    pub fn to_trit(self) -> Trit {
        match self {
            AddrMode::Immediate => Trit::N,
            AddrMode::Register => Trit::O,
            AddrMode::Indirect => Trit::P,
        }
    }
}

/// Instruction group, used by the execution engine for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpGroup {
    System,
    Stack,
    Arithmetic,
    Logic,
    Compare,
    Control,
    Io,
    Memory,
    /// Assembly-time only; the VM never sees these.
    Pseudo,
}

/// Every operation the assembler understands. Basic opcodes translate
/// directly to machine code; pseudo opcodes expand to a sequence of basic
/// instructions during code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Nop,
    // Stack
    Push,
    Pop,
    Dup,
    Swap,
    Drop,
    Over,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    // Logic
    And,
    Or,
    Not,
    // Comparison
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
    // Control
    Jmp,
    Jz,
    Jnz,
    Call,
    Ret,
    Halt,
    // I/O
    In,
    Out,
    // Memory
    Load,
    Store,
    // System
    Int,
    Cli,
    Sti,
    // Pseudo
    Mov,
    Inc,
    Dec,
    Pushr,
    Popr,
    Clear,
    Cmp,
    Test,
}

/// Static metadata for one table entry.
pub struct OpInfo {
    pub op: Op,
    pub mnemonic: &'static str,
    pub base: i32,
    pub operands: usize,
    pub group: OpGroup,
    pub description: &'static str,
}

/// The full instruction table: basic opcodes followed by pseudo opcodes.
pub static OP_TABLE: &[OpInfo] = &[
    OpInfo { op: Op::Nop, mnemonic: "NOP", base: 0, operands: 0, group: OpGroup::System, description: "no operation" },
    OpInfo { op: Op::Push, mnemonic: "PUSH", base: 1, operands: 1, group: OpGroup::Stack, description: "push a value (any addressing mode)" },
    OpInfo { op: Op::Pop, mnemonic: "POP", base: 2, operands: 1, group: OpGroup::Stack, description: "pop into a register or memory cell" },
    OpInfo { op: Op::Dup, mnemonic: "DUP", base: 3, operands: 0, group: OpGroup::Stack, description: "duplicate the top of the stack" },
    OpInfo { op: Op::Swap, mnemonic: "SWAP", base: 4, operands: 0, group: OpGroup::Stack, description: "exchange the two top elements" },
    OpInfo { op: Op::Drop, mnemonic: "DROP", base: 5, operands: 0, group: OpGroup::Stack, description: "discard the top element" },
    OpInfo { op: Op::Over, mnemonic: "OVER", base: 6, operands: 0, group: OpGroup::Stack, description: "copy the second element on top" },
    OpInfo { op: Op::Add, mnemonic: "ADD", base: 10, operands: 0, group: OpGroup::Arithmetic, description: "add the two top elements" },
    OpInfo { op: Op::Sub, mnemonic: "SUB", base: 11, operands: 0, group: OpGroup::Arithmetic, description: "subtract the top from the second element" },
    OpInfo { op: Op::Mul, mnemonic: "MUL", base: 12, operands: 0, group: OpGroup::Arithmetic, description: "multiply the two top elements" },
    OpInfo { op: Op::Div, mnemonic: "DIV", base: 13, operands: 0, group: OpGroup::Arithmetic, description: "divide the second element by the top" },
    OpInfo { op: Op::And, mnemonic: "AND", base: 20, operands: 0, group: OpGroup::Logic, description: "tri-valued AND" },
    OpInfo { op: Op::Or, mnemonic: "OR", base: 21, operands: 0, group: OpGroup::Logic, description: "tri-valued OR" },
    OpInfo { op: Op::Not, mnemonic: "NOT", base: 22, operands: 0, group: OpGroup::Logic, description: "tri-valued NOT" },
    OpInfo { op: Op::Eq, mnemonic: "EQ", base: 30, operands: 0, group: OpGroup::Compare, description: "equal" },
    OpInfo { op: Op::Neq, mnemonic: "NEQ", base: 31, operands: 0, group: OpGroup::Compare, description: "not equal" },
    OpInfo { op: Op::Lt, mnemonic: "LT", base: 32, operands: 0, group: OpGroup::Compare, description: "less than" },
    OpInfo { op: Op::Gt, mnemonic: "GT", base: 33, operands: 0, group: OpGroup::Compare, description: "greater than" },
    OpInfo { op: Op::Le, mnemonic: "LE", base: 34, operands: 0, group: OpGroup::Compare, description: "less than or equal" },
    OpInfo { op: Op::Ge, mnemonic: "GE", base: 35, operands: 0, group: OpGroup::Compare, description: "greater than or equal" },
    OpInfo { op: Op::Jmp, mnemonic: "JMP", base: 40, operands: 1, group: OpGroup::Control, description: "unconditional jump" },
    OpInfo { op: Op::Jz, mnemonic: "JZ", base: 41, operands: 1, group: OpGroup::Control, description: "jump if zero" },
    OpInfo { op: Op::Jnz, mnemonic: "JNZ", base: 42, operands: 1, group: OpGroup::Control, description: "jump if not zero" },
    OpInfo { op: Op::Call, mnemonic: "CALL", base: 43, operands: 1, group: OpGroup::Control, description: "call a subroutine" },
    OpInfo { op: Op::Ret, mnemonic: "RET", base: 44, operands: 0, group: OpGroup::Control, description: "return from a subroutine" },
    OpInfo { op: Op::Halt, mnemonic: "HALT", base: 45, operands: 0, group: OpGroup::Control, description: "stop the program" },
    OpInfo { op: Op::In, mnemonic: "IN", base: 50, operands: 0, group: OpGroup::Io, description: "input a value" },
    OpInfo { op: Op::Out, mnemonic: "OUT", base: 51, operands: 0, group: OpGroup::Io, description: "output a value" },
    OpInfo { op: Op::Load, mnemonic: "LOAD", base: 60, operands: 1, group: OpGroup::Memory, description: "load a value from memory" },
    OpInfo { op: Op::Store, mnemonic: "STORE", base: 61, operands: 1, group: OpGroup::Memory, description: "store a value to memory" },
    OpInfo { op: Op::Int, mnemonic: "INT", base: 70, operands: 1, group: OpGroup::System, description: "raise an interrupt" },
    OpInfo { op: Op::Cli, mnemonic: "CLI", base: 71, operands: 0, group: OpGroup::System, description: "disable interrupts" },
    OpInfo { op: Op::Sti, mnemonic: "STI", base: 72, operands: 0, group: OpGroup::System, description: "enable interrupts" },
    OpInfo { op: Op::Mov, mnemonic: "MOV", base: 100, operands: 2, group: OpGroup::Pseudo, description: "move between registers" },
    OpInfo { op: Op::Inc, mnemonic: "INC", base: 101, operands: 1, group: OpGroup::Pseudo, description: "increment a register" },
    OpInfo { op: Op::Dec, mnemonic: "DEC", base: 102, operands: 1, group: OpGroup::Pseudo, description: "decrement a register" },
    OpInfo { op: Op::Pushr, mnemonic: "PUSHR", base: 110, operands: 1, group: OpGroup::Pseudo, description: "push a register value" },
    OpInfo { op: Op::Popr, mnemonic: "POPR", base: 111, operands: 1, group: OpGroup::Pseudo, description: "pop into a register" },
    OpInfo { op: Op::Clear, mnemonic: "CLEAR", base: 112, operands: 1, group: OpGroup::Pseudo, description: "drop N stack elements" },
    OpInfo { op: Op::Cmp, mnemonic: "CMP", base: 120, operands: 2, group: OpGroup::Pseudo, description: "compare two values" },
    OpInfo { op: Op::Test, mnemonic: "TEST", base: 121, operands: 1, group: OpGroup::Pseudo, description: "push a value for testing" },
];

impl Op {
    /// Metadata for this operation.
    pub fn info(self) -> &'static OpInfo {
        OP_TABLE
            .iter()
            .find(|e| e.op == self)
            .expect("every Op has a table entry")
    }

    /// The base opcode with the addressing-mode trit zeroed.
    #[inline]
    pub fn base(self) -> i32 {
        self.info().base
    }

    /// Number of assembly operands.
    #[inline]
    pub fn operand_count(self) -> usize {
        self.info().operands
    }

    /// Execution dispatch group.
    #[inline]
    pub fn group(self) -> OpGroup {
        self.info().group
    }

    /// Pseudo instructions are resolved at assembly time only.
    #[inline]
    pub fn is_pseudo(self) -> bool {
        self.group() == OpGroup::Pseudo
    }

    /// Look up an operation by base opcode.
    pub fn from_base(base: i32) -> Option<Op> {
        OP_TABLE.iter().find(|e| e.base == base).map(|e| e.op)
    }

    /// Look up an operation by mnemonic, case-insensitively.
    pub fn by_mnemonic(name: &str) -> Option<&'static OpInfo> {
        OP_TABLE.iter().find(|e| e.mnemonic.eq_ignore_ascii_case(name))
    }
}

/// Combine an addressing mode and a base opcode into an opcode tryte.
///
/// The base opcode occupies the low five trits; the mode occupies the top
/// trit. Returns a fresh tryte, cache established.
pub fn make_opcode(mode: AddrMode, base: i32) -> Tryte {
    debug_assert!(
        (-121..=121).contains(&base),
        "base opcode {} out of range [-121, 121]",
        base
    );
    Tryte::from_int(base).with_trit(TRITS_PER_TRYTE - 1, mode.to_trit())
}

/// Extract the addressing mode from an opcode tryte.
#[inline]
pub fn get_addr_mode(opcode: &Tryte) -> AddrMode {
    AddrMode::from_trit(opcode.get(TRITS_PER_TRYTE - 1))
}

/// Extract the base opcode, with the addressing-mode trit zeroed.
#[inline]
pub fn get_base_opcode(opcode: &Tryte) -> i32 {
    opcode.with_trit(TRITS_PER_TRYTE - 1, Trit::O).value()
}

/// One decoded instruction: opcode plus two operand trytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Tryte,
    pub operand1: Tryte,
    pub operand2: Tryte,
}

impl Instruction {
    pub fn new(opcode: Tryte, operand1: Tryte, operand2: Tryte) -> Self {
        Self { opcode, operand1, operand2 }
    }

    /// Encode into an 18-trit word (little-endian by tryte).
    pub fn encode(&self) -> Word {
        Word::from_trytes(&self.opcode, &self.operand1, &self.operand2)
    }

    /// Decode from an 18-trit word. Tryte caches are recomputed from the
    /// trits during extraction.
    pub fn decode(word: &Word) -> Self {
        Self {
            opcode: word.tryte(0),
            operand1: word.tryte(1),
            operand2: word.tryte(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr_mode_trit_roundtrip() {
        for mode in [AddrMode::Immediate, AddrMode::Register, AddrMode::Indirect] {
            assert_eq!(AddrMode::from_trit(mode.to_trit()), mode);
        }
    }

    #[test]
    fn test_make_opcode_roundtrip() {
        for mode in [AddrMode::Immediate, AddrMode::Register, AddrMode::Indirect] {
            for base in [-121, -40, -1, 0, 1, 45, 70, 121] {
                let opcode = make_opcode(mode, base);
                assert_eq!(get_addr_mode(&opcode), mode, "mode for base {}", base);
                assert_eq!(get_base_opcode(&opcode), base, "base for mode {:?}", mode);
            }
        }
    }

    #[test]
    fn test_base_lookup() {
        assert_eq!(Op::from_base(0), Some(Op::Nop));
        assert_eq!(Op::from_base(10), Some(Op::Add));
        assert_eq!(Op::from_base(45), Some(Op::Halt));
        assert_eq!(Op::from_base(121), Some(Op::Test));
        assert_eq!(Op::from_base(7), None);
        assert_eq!(Op::from_base(-10), None);
    }

    #[test]
    fn test_mnemonic_lookup_case_insensitive() {
        assert_eq!(Op::by_mnemonic("PUSH").unwrap().op, Op::Push);
        assert_eq!(Op::by_mnemonic("push").unwrap().op, Op::Push);
        assert_eq!(Op::by_mnemonic("Mov").unwrap().op, Op::Mov);
        assert!(Op::by_mnemonic("FROB").is_none());
    }

    #[test]
    fn test_pseudo_flags() {
        assert!(Op::Mov.is_pseudo());
        assert!(Op::Clear.is_pseudo());
        assert!(!Op::Push.is_pseudo());
        assert!(!Op::Halt.is_pseudo());
    }

    #[test]
    fn test_encode_decode_identity() {
        let inst = Instruction::new(
            make_opcode(AddrMode::Immediate, Op::Push.base()),
            Tryte::from_int(100),
            Tryte::from_int(-37),
        );
        let word = inst.encode();
        assert_eq!(Instruction::decode(&word), inst);
    }

    #[test]
    fn test_decode_recovers_mode_and_base() {
        let inst = Instruction::new(
            make_opcode(AddrMode::Indirect, Op::Pop.base()),
            Tryte::from_int(2),
            Tryte::zero(),
        );
        let decoded = Instruction::decode(&inst.encode());
        assert_eq!(get_addr_mode(&decoded.opcode), AddrMode::Indirect);
        assert_eq!(get_base_opcode(&decoded.opcode), Op::Pop.base());
    }
}
