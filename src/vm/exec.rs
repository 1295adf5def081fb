//! The fetch-decode-execute engine.
//!
//! A step fetches three trytes at PC, validates the base opcode, dispatches
//! to the group handler, and advances PC by 3 unless the handler moved it.
//! Steps are atomic: a handler that consumed stack operands restores them
//! before returning a recoverable error, so the machine is observable in a
//! consistent state between steps.

use crate::ternary::{arith, Tryte};
use crate::vm::instr::{
    get_addr_mode, get_base_opcode, AddrMode, Instruction, Op, OpGroup, INSTRUCTION_SIZE,
};
use crate::vm::state::{VmState, NUM_REGISTERS};
use thiserror::Error;

/// Everything that can stop a step.
///
/// `Halt` is a sentinel, not a failure: `run` translates it into normal
/// termination, and hosts driving `step` directly must do the same.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("invalid address")]
    InvalidAddress,
    #[error("invalid opcode {0}")]
    InvalidOpcode(i32),
    #[error("invalid parameter")]
    InvalidParameter,
    #[error("invalid register {0}")]
    InvalidRegister(i32),
    #[error("invalid addressing mode")]
    InvalidAddressingMode,
    #[error("invalid instruction")]
    InvalidInstruction,
    #[error("stack overflow")]
    StackOverflow,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("out of memory")]
    OutOfMemory,
    #[error("invalid interrupt {0}")]
    InvalidInterrupt(i32),
    #[error("interrupts disabled")]
    InterruptsDisabled,
    #[error("no interrupt handler installed")]
    NoInterruptHandler,
    #[error("halt")]
    Halt,
}

/// Host-side trap sink invoked by the `INT` instruction.
///
/// The handler runs to completion before the next fetch and may mutate the
/// stack and memory. The VM does not own its handler; the host lends it to
/// every `step` call, which keeps ownership acyclic.
pub trait TrapHandler {
    fn handle(&mut self, vm: &mut VmState, int_num: i32) -> Result<(), VmError>;
}

impl<F> TrapHandler for F
where
    F: FnMut(&mut VmState, i32) -> Result<(), VmError>,
{
    fn handle(&mut self, vm: &mut VmState, int_num: i32) -> Result<(), VmError> {
        self(vm, int_num)
    }
}

/// A host with no devices: every trap reports the missing handler.
pub struct NoTraps;

impl TrapHandler for NoTraps {
    fn handle(&mut self, _vm: &mut VmState, _int_num: i32) -> Result<(), VmError> {
        Err(VmError::NoInterruptHandler)
    }
}

impl VmState {
    /// Execute a single instruction.
    pub fn step(&mut self, traps: &mut dyn TrapHandler) -> Result<(), VmError> {
        let pc = self.pc.value();
        if pc < 0 || pc as usize + (INSTRUCTION_SIZE - 1) >= self.memory.len() {
            return Err(VmError::InvalidAddress);
        }

        let inst = Instruction::new(
            self.memory[pc as usize],
            self.memory[pc as usize + 1],
            self.memory[pc as usize + 2],
        );

        let base = get_base_opcode(&inst.opcode);
        let op = Op::from_base(base).ok_or(VmError::InvalidOpcode(base))?;
        if op.is_pseudo() {
            // Pseudo opcodes exist only in the assembler
            return Err(VmError::InvalidOpcode(base));
        }

        let old_pc = self.pc.value();
        self.execute(op, &inst, traps)?;

        if self.pc.value() == old_pc {
            self.pc = Tryte::from_int(old_pc + INSTRUCTION_SIZE as i32);
        }

        Ok(())
    }

    /// Run until `HALT`. The sentinel is swallowed; real errors bubble up.
    pub fn run(&mut self, traps: &mut dyn TrapHandler) -> Result<(), VmError> {
        loop {
            match self.step(traps) {
                Ok(()) => {}
                Err(VmError::Halt) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    /// Run at most `max_steps` instructions. Returns how many executed.
    /// The step budget belongs to the host; the VM itself has no timeouts.
    pub fn run_limited(
        &mut self,
        traps: &mut dyn TrapHandler,
        max_steps: u64,
    ) -> Result<u64, VmError> {
        let mut executed = 0;
        while executed < max_steps {
            match self.step(traps) {
                Ok(()) => executed += 1,
                Err(VmError::Halt) => return Ok(executed + 1),
                Err(e) => return Err(e),
            }
        }
        Ok(executed)
    }

    /// Resolve an operand tryte under an addressing mode.
    fn resolve_operand(&self, operand: &Tryte, mode: AddrMode) -> Result<Tryte, VmError> {
        match mode {
            AddrMode::Immediate => Ok(*operand),
            AddrMode::Register => {
                let index = operand.value();
                if index < 0 || index as usize >= NUM_REGISTERS {
                    return Err(VmError::InvalidRegister(index));
                }
                Ok(self.registers[index as usize])
            }
            AddrMode::Indirect => {
                let index = operand.value();
                if index < 0 || index as usize >= NUM_REGISTERS {
                    return Err(VmError::InvalidRegister(index));
                }
                self.read(self.registers[index as usize].value())
            }
        }
    }

    fn execute(
        &mut self,
        op: Op,
        inst: &Instruction,
        traps: &mut dyn TrapHandler,
    ) -> Result<(), VmError> {
        match op.group() {
            OpGroup::Stack => self.exec_stack(op, inst),
            OpGroup::Arithmetic => self.exec_arithmetic(op),
            OpGroup::Logic => self.exec_logic(op),
            OpGroup::Compare => self.exec_compare(op),
            OpGroup::Memory => self.exec_memory(op, inst),
            OpGroup::Control => self.exec_control(op),
            OpGroup::System => self.exec_system(op, inst, traps),
            // IN/OUT were never wired to the engine; character I/O goes
            // through traps
            OpGroup::Io => Err(VmError::InvalidOpcode(op.base())),
            OpGroup::Pseudo => Err(VmError::InvalidOpcode(op.base())),
        }
    }

    // ==================== Stack group ====================

    fn exec_stack(&mut self, op: Op, inst: &Instruction) -> Result<(), VmError> {
        let mode = get_addr_mode(&inst.opcode);

        match op {
            Op::Push => {
                let value = self.resolve_operand(&inst.operand1, mode)?;
                self.push(value)
            }
            Op::Pop => {
                match mode {
                    AddrMode::Register | AddrMode::Indirect => {}
                    AddrMode::Immediate => return Err(VmError::InvalidAddressingMode),
                }
                let value = self.pop()?;
                let index = inst.operand1.value();
                if index < 0 || index as usize >= NUM_REGISTERS {
                    self.push(value)?;
                    return Err(VmError::InvalidRegister(index));
                }
                match mode {
                    AddrMode::Register => {
                        self.registers[index as usize] = value;
                        Ok(())
                    }
                    AddrMode::Indirect => {
                        let addr = self.registers[index as usize].value();
                        if let Err(e) = self.write(addr, value) {
                            self.push(value)?;
                            return Err(e);
                        }
                        Ok(())
                    }
                    AddrMode::Immediate => unreachable!(),
                }
            }
            Op::Dup => {
                require_immediate(mode)?;
                self.dup()
            }
            Op::Swap => {
                require_immediate(mode)?;
                self.swap()
            }
            Op::Drop => {
                require_immediate(mode)?;
                self.pop().map(|_| ())
            }
            Op::Over => {
                require_immediate(mode)?;
                let sp = self.sp.value();
                if sp < 1 {
                    return Err(VmError::StackUnderflow);
                }
                let second = self.memory[sp as usize - 1];
                self.push(second)
            }
            _ => Err(VmError::InvalidOpcode(op.base())),
        }
    }

    // ==================== Arithmetic group ====================

    fn exec_arithmetic(&mut self, op: Op) -> Result<(), VmError> {
        let op1 = self.pop()?;
        let op2 = match self.pop() {
            Ok(v) => v,
            Err(e) => {
                self.push(op1)?;
                return Err(e);
            }
        };

        let result = match op {
            Op::Add => arith::add(&op2, &op1),
            Op::Sub => arith::sub(&op2, &op1),
            Op::Mul => arith::mul(&op2, &op1),
            Op::Div => {
                if op1.value() == 0 {
                    self.push(op2)?;
                    self.push(op1)?;
                    return Err(VmError::DivisionByZero);
                }
                arith::div(&op2, &op1)
            }
            _ => return Err(VmError::InvalidOpcode(op.base())),
        };

        self.push(result)
    }

    // ==================== Logic group ====================

    fn exec_logic(&mut self, op: Op) -> Result<(), VmError> {
        if op == Op::Not {
            let op1 = self.pop()?;
            return self.push(Tryte::from_int(-op1.value()));
        }

        let op2 = self.pop()?;
        let op1 = match self.pop() {
            Ok(v) => v,
            Err(e) => {
                self.push(op2)?;
                return Err(e);
            }
        };

        // Whole-tryte truth values: the operands are treated as single
        // tri-valued quantities, not tritwise vectors
        let result = match op {
            Op::And => {
                if op1.value() == 0 || op2.value() == 0 {
                    0
                } else if op1.value() == 1 && op2.value() == 1 {
                    1
                } else {
                    -1
                }
            }
            Op::Or => {
                if op1.value() == 1 || op2.value() == 1 {
                    1
                } else if op1.value() == 0 {
                    op2.value()
                } else if op2.value() == 0 {
                    op1.value()
                } else {
                    -1
                }
            }
            _ => return Err(VmError::InvalidOpcode(op.base())),
        };

        self.push(Tryte::from_int(result))
    }

    // ==================== Comparison group ====================

    fn exec_compare(&mut self, op: Op) -> Result<(), VmError> {
        let op1 = self.pop()?;
        let op2 = match self.pop() {
            Ok(v) => v,
            Err(e) => {
                self.push(op1)?;
                return Err(e);
            }
        };

        let (a, b) = (op2.value(), op1.value());
        let holds = match op {
            Op::Eq => a == b,
            Op::Neq => a != b,
            Op::Lt => a < b,
            Op::Gt => a > b,
            Op::Le => a <= b,
            Op::Ge => a >= b,
            _ => return Err(VmError::InvalidOpcode(op.base())),
        };

        self.push(Tryte::from_int(if holds { 1 } else { -1 }))
    }

    // ==================== Memory group ====================

    fn exec_memory(&mut self, op: Op, inst: &Instruction) -> Result<(), VmError> {
        let mode = get_addr_mode(&inst.opcode);

        match op {
            Op::Load => {
                // Immediate mode takes the address from the stack; register
                // and indirect modes take it from the instruction
                let addr = if mode == AddrMode::Immediate {
                    self.pop()?
                } else {
                    self.resolve_operand(&inst.operand1, mode)?
                };

                let value = match self.read(addr.value()) {
                    Ok(v) => v,
                    Err(e) => {
                        if mode == AddrMode::Immediate {
                            self.push(addr)?;
                        }
                        return Err(e);
                    }
                };
                self.push(value)
            }
            Op::Store => {
                let value = self.pop()?;

                let addr = if mode == AddrMode::Immediate {
                    match self.pop() {
                        Ok(a) => a,
                        Err(e) => {
                            self.push(value)?;
                            return Err(e);
                        }
                    }
                } else {
                    match self.resolve_operand(&inst.operand1, mode) {
                        Ok(a) => a,
                        Err(e) => {
                            self.push(value)?;
                            return Err(e);
                        }
                    }
                };

                if let Err(e) = self.write(addr.value(), value) {
                    if mode == AddrMode::Immediate {
                        self.push(addr)?;
                    }
                    self.push(value)?;
                    return Err(e);
                }
                Ok(())
            }
            _ => Err(VmError::InvalidOpcode(op.base())),
        }
    }

    // ==================== Control group ====================

    fn exec_control(&mut self, op: Op) -> Result<(), VmError> {
        match op {
            Op::Jmp => {
                let addr = self.pop()?;
                if let Err(e) = self.check_jump_target(&addr) {
                    self.push(addr)?;
                    return Err(e);
                }
                self.pc = addr;
                Ok(())
            }
            Op::Jz | Op::Jnz => {
                let cond = self.pop()?;
                let addr = match self.pop() {
                    Ok(a) => a,
                    Err(e) => {
                        self.push(cond)?;
                        return Err(e);
                    }
                };
                if let Err(e) = self.check_jump_target(&addr) {
                    self.push(addr)?;
                    self.push(cond)?;
                    return Err(e);
                }
                let taken = if op == Op::Jz {
                    cond.value() == 0
                } else {
                    cond.value() != 0
                };
                if taken {
                    self.pc = addr;
                }
                Ok(())
            }
            Op::Call => {
                let target = self.pop()?;
                if let Err(e) = self.check_jump_target(&target) {
                    self.push(target)?;
                    return Err(e);
                }
                let return_addr = Tryte::from_int(self.pc.value() + INSTRUCTION_SIZE as i32);
                let old_pc = self.pc;
                self.pc = target;
                if let Err(e) = self.push(return_addr) {
                    self.pc = old_pc;
                    return Err(e);
                }
                Ok(())
            }
            Op::Ret => {
                let addr = self.pop()?;
                if let Err(e) = self.check_jump_target(&addr) {
                    self.push(addr)?;
                    return Err(e);
                }
                self.pc = addr;
                Ok(())
            }
            Op::Halt => Err(VmError::Halt),
            _ => Err(VmError::InvalidOpcode(op.base())),
        }
    }

    fn check_jump_target(&self, addr: &Tryte) -> Result<(), VmError> {
        if addr.value() < 0 || addr.value() as usize >= self.memory.len() {
            return Err(VmError::InvalidAddress);
        }
        Ok(())
    }

    // ==================== System group ====================

    fn exec_system(
        &mut self,
        op: Op,
        inst: &Instruction,
        traps: &mut dyn TrapHandler,
    ) -> Result<(), VmError> {
        match op {
            Op::Nop => Ok(()),
            Op::Cli => {
                self.set_interrupts_enabled(false);
                Ok(())
            }
            Op::Sti => {
                self.set_interrupts_enabled(true);
                Ok(())
            }
            Op::Int => {
                let mode = get_addr_mode(&inst.opcode);
                let value = self.resolve_operand(&inst.operand1, mode)?;
                match value.value() {
                    1 => {
                        self.set_interrupts_enabled(true);
                        Ok(())
                    }
                    -1 => {
                        self.set_interrupts_enabled(false);
                        Ok(())
                    }
                    0 => Ok(()),
                    num => {
                        if !self.interrupts_enabled() {
                            return Err(VmError::InterruptsDisabled);
                        }
                        traps.handle(self, num)
                    }
                }
            }
            _ => Err(VmError::InvalidOpcode(op.base())),
        }
    }
}

fn require_immediate(mode: AddrMode) -> Result<(), VmError> {
    if mode != AddrMode::Immediate {
        return Err(VmError::InvalidAddressingMode);
    }
    Ok(())
}
