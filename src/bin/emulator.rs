//! Zarya VM CLI.
//!
//! `emulator <program> [-q]` loads a binary image and either runs it to
//! completion (`-q`, printing initial and final state) or drops into an
//! interactive loop: `s` steps one instruction, `r` runs to halt, `q`
//! quits.

use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use zarya::asm::load_image;
use zarya::vm::{VmError, VmState, NUM_REGISTERS};
use zarya::Emulator;

#[derive(Parser)]
#[command(name = "emulator")]
#[command(version)]
#[command(about = "Emulator for the Zarya balanced ternary VM")]
struct Cli {
    /// Binary image to execute
    program: PathBuf,

    /// Quick mode: run to completion, print initial and final state
    #[arg(short, long)]
    quiet: bool,
}

fn print_state(vm: &VmState) {
    println!("PC:    {}", vm.pc.value());
    println!("SP:    {}", vm.sp.value());
    println!("Flags: {}", vm.flags.value());
    for i in 0..NUM_REGISTERS {
        println!("R{}:    {}", i, vm.registers[i].value());
    }
    println!();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let image = match load_image(&cli.program) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("error: cannot load '{}': {}", cli.program.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut emu = Emulator::new();
    if let Err(e) = emu.load_program(&image) {
        eprintln!("error: cannot load program: {}", e);
        return ExitCode::FAILURE;
    }

    println!("loaded {} trytes\n", image.len());
    println!("=== initial state ===");
    print_state(&emu.vm);

    if cli.quiet {
        if let Err(e) = emu.run() {
            eprintln!("execution error: {}", e);
            return ExitCode::FAILURE;
        }
        println!("=== final state ===");
        print_state(&emu.vm);
        return ExitCode::SUCCESS;
    }

    repl(&mut emu)
}

fn repl(emu: &mut Emulator) -> ExitCode {
    println!("commands:");
    println!("  s - execute one step");
    println!("  r - run until halt");
    println!("  q - quit");
    println!();

    let stdin = std::io::stdin();
    let mut halted = false;

    loop {
        print!("(s/r/q) ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        if stdin.read_line(&mut line).unwrap_or(0) == 0 {
            return ExitCode::SUCCESS;
        }

        match line.trim() {
            "q" => return ExitCode::SUCCESS,
            "s" => {
                if halted {
                    println!("program halted");
                    return ExitCode::SUCCESS;
                }
                match emu.step() {
                    Ok(()) => print_state(&emu.vm),
                    Err(VmError::Halt) => {
                        halted = true;
                        println!("program halted");
                        print_state(&emu.vm);
                    }
                    Err(e) => {
                        eprintln!("execution error: {}", e);
                        return ExitCode::FAILURE;
                    }
                }
            }
            "r" => {
                if !halted {
                    if let Err(e) = emu.run() {
                        eprintln!("execution error: {}", e);
                        return ExitCode::FAILURE;
                    }
                    halted = true;
                }
                println!("=== final state ===");
                print_state(&emu.vm);
                return ExitCode::SUCCESS;
            }
            _ => println!("unknown command"),
        }
    }
}
