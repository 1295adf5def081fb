//! Emulator shell: owns the machine and its console devices.
//!
//! The VM raises traps through the [`TrapHandler`] borrowed for each step;
//! the shell owns the device set and lends it, so there is no back-pointer
//! between the two. Trap numbers start at 2 because +1, 0, and -1 are the
//! `INT` control values (enable, no-op, disable) and can never reach a
//! handler.

use crate::ternary::Tryte;
use crate::vm::{TrapHandler, VmError, VmState};
use std::io::{BufRead, Read, Write};

/// Write a character popped from the stack.
pub const INT_PUTCHAR: i32 = 2;
/// Read a character and push it.
pub const INT_GETCHAR: i32 = 3;
/// Write the zero-terminated string at the popped address.
pub const INT_PUTS: i32 = 4;
/// Read a line into memory: pops max length, then destination address.
pub const INT_GETS: i32 = 5;
/// Clear the screen.
pub const INT_CLEAR: i32 = 6;
/// Move the cursor: pops column, then row.
pub const INT_SETPOS: i32 = 7;
/// Reserved for a timer device.
pub const INT_TIMER: i32 = 8;
/// Reserved for a keyboard device.
pub const INT_KEYBOARD: i32 = 9;

/// Character I/O devices multiplexed over the trap interface.
///
/// Reads and writes go through injected handles so tests can capture both
/// sides; the default wiring is stdin/stdout.
pub struct Console {
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

impl Console {
    /// A console on the process's stdin and stdout.
    pub fn new() -> Self {
        Self {
            input: Box::new(std::io::BufReader::new(std::io::stdin())),
            output: Box::new(std::io::stdout()),
        }
    }

    /// A console on caller-supplied handles.
    pub fn with_io(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        Self { input, output }
    }

    fn putchar(&mut self, vm: &mut VmState) -> Result<(), VmError> {
        let value = vm.pop()?;
        // Console writes are best-effort, like the terminal they stand for
        let _ = self.output.write_all(&[value.value() as u8]);
        let _ = self.output.flush();
        Ok(())
    }

    fn getchar(&mut self, vm: &mut VmState) -> Result<(), VmError> {
        let mut buf = [0u8; 1];
        let value = match self.input.read(&mut buf) {
            Ok(1) => buf[0] as i32,
            _ => -1,
        };
        vm.push(Tryte::from_int(value))
    }

    fn puts(&mut self, vm: &mut VmState) -> Result<(), VmError> {
        let start = vm.pop()?;
        if start.value() < 0 {
            vm.push(start)?;
            return Err(VmError::InvalidAddress);
        }

        let mut addr = start.value() as usize;
        while addr < vm.memory.len() && !vm.memory[addr].is_zero() {
            let _ = self.output.write_all(&[vm.memory[addr].value() as u8]);
            addr += 1;
        }
        let _ = self.output.flush();
        Ok(())
    }

    fn gets(&mut self, vm: &mut VmState) -> Result<(), VmError> {
        let maxlen = vm.pop()?;
        let addr = match vm.pop() {
            Ok(a) => a,
            Err(e) => {
                vm.push(maxlen)?;
                return Err(e);
            }
        };

        let mut line = String::new();
        let _ = self.input.read_line(&mut line);
        let text = line.trim_end_matches(|c| c == '\n' || c == '\r');

        let base = addr.value();
        let mut stored = 0;
        for byte in text.bytes() {
            if stored + 1 >= maxlen.value() {
                break;
            }
            vm.write(base + stored, Tryte::from_int(byte as i32))?;
            stored += 1;
        }
        vm.write(base + stored, Tryte::zero())
    }

    fn clear(&mut self) -> Result<(), VmError> {
        let _ = self.output.write_all(b"\x1b[2J\x1b[H");
        let _ = self.output.flush();
        Ok(())
    }

    fn setpos(&mut self, vm: &mut VmState) -> Result<(), VmError> {
        let col = vm.pop()?;
        let row = match vm.pop() {
            Ok(r) => r,
            Err(e) => {
                vm.push(col)?;
                return Err(e);
            }
        };
        let _ = write!(self.output, "\x1b[{};{}H", row.value(), col.value());
        let _ = self.output.flush();
        Ok(())
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl TrapHandler for Console {
    fn handle(&mut self, vm: &mut VmState, int_num: i32) -> Result<(), VmError> {
        match int_num {
            INT_PUTCHAR => self.putchar(vm),
            INT_GETCHAR => self.getchar(vm),
            INT_PUTS => self.puts(vm),
            INT_GETS => self.gets(vm),
            INT_CLEAR => self.clear(),
            INT_SETPOS => self.setpos(vm),
            // TIMER and KEYBOARD have no device behind them
            other => Err(VmError::InvalidInterrupt(other)),
        }
    }
}

/// A machine wired to its console.
pub struct Emulator {
    pub vm: VmState,
    pub console: Console,
}

impl Emulator {
    pub fn new() -> Self {
        Self { vm: VmState::new(), console: Console::new() }
    }

    pub fn with_console(console: Console) -> Self {
        Self { vm: VmState::new(), console }
    }

    pub fn load_program(&mut self, program: &[Tryte]) -> Result<(), VmError> {
        self.vm.load_program(program)
    }

    /// Execute one instruction, devices attached.
    pub fn step(&mut self) -> Result<(), VmError> {
        self.vm.step(&mut self.console)
    }

    /// Run until `HALT`.
    pub fn run(&mut self) -> Result<(), VmError> {
        self.vm.run(&mut self.console)
    }

    /// Run with a step budget; returns the number of instructions executed.
    pub fn run_limited(&mut self, max_steps: u64) -> Result<u64, VmError> {
        self.vm.run_limited(&mut self.console, max_steps)
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    /// A writer the test can keep a handle to after moving it into the
    /// console.
    #[derive(Clone, Default)]
    struct SharedOutput(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedOutput {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn emulator_with(input: &str) -> (Emulator, SharedOutput) {
        let output = SharedOutput::default();
        let console = Console::with_io(
            Box::new(Cursor::new(input.as_bytes().to_vec())),
            Box::new(output.clone()),
        );
        (Emulator::with_console(console), output)
    }

    fn output_string(output: &SharedOutput) -> String {
        String::from_utf8_lossy(&output.0.borrow()).into_owned()
    }

    #[test]
    fn test_putchar() {
        let (mut emu, out) = emulator_with("");
        let code = assemble("STI\nPUSH #72\nINT 2\nHALT\n").unwrap();
        emu.load_program(&code).unwrap();
        emu.run().unwrap();
        assert_eq!(output_string(&out), "H");
    }

    #[test]
    fn test_getchar_pushes_input() {
        let (mut emu, _) = emulator_with("x");
        let code = assemble("STI\nINT 3\nHALT\n").unwrap();
        emu.load_program(&code).unwrap();
        emu.run().unwrap();
        assert_eq!(emu.vm.pop().unwrap().value(), 'x' as i32);
    }

    #[test]
    fn test_getchar_eof_pushes_minus_one() {
        let (mut emu, _) = emulator_with("");
        let code = assemble("STI\nINT 3\nHALT\n").unwrap();
        emu.load_program(&code).unwrap();
        emu.run().unwrap();
        assert_eq!(emu.vm.pop().unwrap().value(), -1);
    }

    #[test]
    fn test_puts_zero_terminated() {
        let (mut emu, out) = emulator_with("");
        let code = assemble(
            "STI\nPUSH msg\nINT 4\nHALT\nmsg: .ds \"Hi\"\n.db 0\n",
        )
        .unwrap();
        emu.load_program(&code).unwrap();
        emu.run().unwrap();
        assert_eq!(output_string(&out), "Hi");
    }

    #[test]
    fn test_gets_stores_line() {
        let (mut emu, _) = emulator_with("abc\n");
        let code = assemble("STI\nPUSH #100\nPUSH #10\nINT 5\nHALT\n").unwrap();
        emu.load_program(&code).unwrap();
        emu.run().unwrap();

        assert_eq!(emu.vm.memory[100].value(), 'a' as i32);
        assert_eq!(emu.vm.memory[101].value(), 'b' as i32);
        assert_eq!(emu.vm.memory[102].value(), 'c' as i32);
        assert_eq!(emu.vm.memory[103].value(), 0);
    }

    #[test]
    fn test_gets_respects_max_length() {
        let (mut emu, _) = emulator_with("abcdefgh\n");
        let code = assemble("STI\nPUSH #100\nPUSH #4\nINT 5\nHALT\n").unwrap();
        emu.load_program(&code).unwrap();
        emu.run().unwrap();

        assert_eq!(emu.vm.memory[100].value(), 'a' as i32);
        assert_eq!(emu.vm.memory[102].value(), 'c' as i32);
        assert_eq!(emu.vm.memory[103].value(), 0);
    }

    #[test]
    fn test_setpos_escape_sequence() {
        let (mut emu, out) = emulator_with("");
        // Row 5, column 12: pushed row first, column on top
        let code = assemble("STI\nPUSH #5\nPUSH #12\nINT 7\nHALT\n").unwrap();
        emu.load_program(&code).unwrap();
        emu.run().unwrap();
        assert_eq!(output_string(&out), "\x1b[5;12H");
    }

    #[test]
    fn test_clear_escape_sequence() {
        let (mut emu, out) = emulator_with("");
        let code = assemble("STI\nINT 6\nHALT\n").unwrap();
        emu.load_program(&code).unwrap();
        emu.run().unwrap();
        assert_eq!(output_string(&out), "\x1b[2J\x1b[H");
    }

    #[test]
    fn test_unwired_trap_is_invalid() {
        let (mut emu, _) = emulator_with("");
        let code = assemble("STI\nINT 8\nHALT\n").unwrap();
        emu.load_program(&code).unwrap();
        assert_eq!(emu.run(), Err(VmError::InvalidInterrupt(8)));
    }
}
