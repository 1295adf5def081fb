//! Two-pass code generation.
//!
//! Pass 1 walks the syntax tree with an address cursor and records every
//! label's address; pseudo instructions count their full expansion so
//! labels after them stay correct. Pass 2 emits encoded words into a
//! contiguous buffer, expanding pseudo instructions and resolving label
//! references against the symbol table. `.org` moves the cursor (and with
//! it all later label addresses) without padding the emitted image.
//!
//! A final `HALT` is appended so every image terminates.

use crate::asm::ast::{Directive, Node, Operand, OperandKind, Program, SymbolTable};
use crate::asm::parser::SyntaxError;
use crate::ternary::Tryte;
use crate::vm::{make_opcode, AddrMode, Instruction, Op, INSTRUCTION_SIZE};

/// Generate the tryte image for a parsed program.
pub fn generate(program: &Program, symbols: &mut SymbolTable) -> Result<Vec<Tryte>, SyntaxError> {
    let mut gen = CodeGen { symbols, code: Vec::new(), current_address: 0 };
    gen.layout(program)?;
    gen.current_address = 0;
    gen.emit(program)?;
    Ok(gen.code)
}

struct CodeGen<'a> {
    symbols: &'a mut SymbolTable,
    code: Vec<Tryte>,
    current_address: i32,
}

impl CodeGen<'_> {
    /// Pass 1: assign label addresses.
    fn layout(&mut self, program: &Program) -> Result<(), SyntaxError> {
        for node in &program.nodes {
            match node {
                Node::Label { name, .. } => {
                    self.symbols.set_address(name, self.current_address);
                }
                Node::Instruction { op, operands, line } => {
                    let words = expansion_words(*op, operands, *line)?;
                    self.current_address += words * INSTRUCTION_SIZE as i32;
                }
                Node::Directive { directive, .. } => match directive {
                    Directive::Org(address) => self.current_address = *address,
                    Directive::Db(_) | Directive::Dw(_) => self.current_address += 1,
                    Directive::Ds(text) => self.current_address += text.len() as i32,
                },
            }
        }
        Ok(())
    }

    /// Pass 2: emit words, expanding pseudo instructions.
    fn emit(&mut self, program: &Program) -> Result<(), SyntaxError> {
        for node in &program.nodes {
            match node {
                Node::Label { .. } => {}
                Node::Instruction { op, operands, line } => {
                    if op.is_pseudo() {
                        self.expand_pseudo(*op, operands, *line)?;
                    } else {
                        self.emit_basic(*op, operands.first(), operands.get(1))?;
                    }
                }
                Node::Directive { directive, .. } => match directive {
                    Directive::Org(address) => self.current_address = *address,
                    Directive::Db(value) | Directive::Dw(value) => {
                        self.code.push(Tryte::from_int(*value));
                        self.current_address += 1;
                    }
                    Directive::Ds(text) => {
                        for byte in text.bytes() {
                            self.code.push(Tryte::from_int(byte as i32));
                        }
                        self.current_address += text.len() as i32;
                    }
                },
            }
        }

        // Guarantee termination
        self.emit_basic(Op::Halt, None, None)
    }

    /// Encode one machine instruction and append its three trytes.
    fn emit_basic(
        &mut self,
        op: Op,
        operand1: Option<&Operand>,
        operand2: Option<&Operand>,
    ) -> Result<(), SyntaxError> {
        let mode = operand1.map(|o| o.mode).unwrap_or(AddrMode::Immediate);
        let inst = Instruction::new(
            make_opcode(mode, op.base()),
            self.operand_tryte(operand1)?,
            self.operand_tryte(operand2)?,
        );

        let word = inst.encode();
        for i in 0..INSTRUCTION_SIZE {
            self.code.push(word.tryte(i));
        }
        self.current_address += INSTRUCTION_SIZE as i32;
        Ok(())
    }

    fn operand_tryte(&self, operand: Option<&Operand>) -> Result<Tryte, SyntaxError> {
        let operand = match operand {
            Some(op) => op,
            None => return Ok(Tryte::zero()),
        };

        match &operand.kind {
            OperandKind::Number(value) => Ok(Tryte::from_int(*value)),
            OperandKind::Char(c) => Ok(Tryte::from_int(*c as i32)),
            OperandKind::Register(index) => Ok(Tryte::from_int(*index as i32)),
            OperandKind::Identifier(name) => match self.symbols.lookup(name) {
                Some(symbol) => Ok(Tryte::from_int(symbol.address)),
                None => Err(SyntaxError {
                    line: operand.line,
                    near: name.clone(),
                    message: "unknown label".into(),
                }),
            },
        }
    }

    fn expand_pseudo(
        &mut self,
        op: Op,
        operands: &[Operand],
        line: usize,
    ) -> Result<(), SyntaxError> {
        let one = Operand {
            kind: OperandKind::Number(1),
            mode: AddrMode::Immediate,
            line,
        };

        match op {
            // MOV dst, src -> PUSH src; POP dst
            Op::Mov => {
                self.emit_basic(Op::Push, operands.get(1), None)?;
                self.emit_basic(Op::Pop, operands.first(), None)
            }
            // INC r -> PUSH r; PUSH #1; ADD; POP r
            Op::Inc => {
                self.emit_basic(Op::Push, operands.first(), None)?;
                self.emit_basic(Op::Push, Some(&one), None)?;
                self.emit_basic(Op::Add, None, None)?;
                self.emit_basic(Op::Pop, operands.first(), None)
            }
            // DEC r -> PUSH r; PUSH #1; SUB; POP r
            Op::Dec => {
                self.emit_basic(Op::Push, operands.first(), None)?;
                self.emit_basic(Op::Push, Some(&one), None)?;
                self.emit_basic(Op::Sub, None, None)?;
                self.emit_basic(Op::Pop, operands.first(), None)
            }
            Op::Pushr => self.emit_basic(Op::Push, operands.first(), None),
            Op::Popr => self.emit_basic(Op::Pop, operands.first(), None),
            // CLEAR n -> DROP, n times
            Op::Clear => {
                let count = clear_count(operands, line)?;
                for _ in 0..count {
                    self.emit_basic(Op::Drop, None, None)?;
                }
                Ok(())
            }
            // CMP a, b -> PUSH a; PUSH b; SUB
            Op::Cmp => {
                self.emit_basic(Op::Push, operands.first(), None)?;
                self.emit_basic(Op::Push, operands.get(1), None)?;
                self.emit_basic(Op::Sub, None, None)
            }
            // TEST v -> PUSH v
            Op::Test => self.emit_basic(Op::Push, operands.first(), None),
            _ => unreachable!("not a pseudo instruction: {:?}", op),
        }
    }
}

/// Number of machine words a statement expands to.
fn expansion_words(op: Op, operands: &[Operand], line: usize) -> Result<i32, SyntaxError> {
    Ok(match op {
        Op::Mov => 2,
        Op::Inc | Op::Dec => 4,
        Op::Pushr | Op::Popr | Op::Test => 1,
        Op::Cmp => 3,
        Op::Clear => clear_count(operands, line)?,
        _ => 1,
    })
}

/// `CLEAR` repeats `DROP`; the count must be a literal.
fn clear_count(operands: &[Operand], line: usize) -> Result<i32, SyntaxError> {
    match operands.first() {
        Some(Operand { kind: OperandKind::Number(n), mode: AddrMode::Immediate, .. })
            if *n >= 0 =>
        {
            Ok(*n)
        }
        Some(op) => Err(SyntaxError {
            line,
            near: op.describe(),
            message: "CLEAR count must be an immediate number".into(),
        }),
        None => Err(SyntaxError {
            line,
            near: "CLEAR".into(),
            message: "CLEAR count must be an immediate number".into(),
        }),
    }
}
