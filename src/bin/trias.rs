//! TRIAS assembler CLI.
//!
//! `trias [-o outfile] [-v] input` assembles a source file to a binary
//! image (default `a.out`). Exits 0 on success, 1 on any error.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use zarya::asm::{assemble, save_image};

#[derive(Parser)]
#[command(name = "trias")]
#[command(version)]
#[command(about = "Assembler for the Zarya balanced ternary VM")]
struct Cli {
    /// Source file to assemble
    input: PathBuf,

    /// Output image file
    #[arg(short, default_value = "a.out")]
    output: PathBuf,

    /// Print progress
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let source = match std::fs::read_to_string(&cli.input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", cli.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if cli.verbose {
        println!("assembling {} -> {}", cli.input.display(), cli.output.display());
    }

    let image = match assemble(&source) {
        Ok(image) => image,
        Err(e) => {
            for diagnostic in e.diagnostics() {
                eprintln!("{}", diagnostic);
            }
            return ExitCode::FAILURE;
        }
    };

    if cli.verbose {
        println!("assembled {} trytes", image.len());
    }

    if let Err(e) = save_image(&cli.output, &image) {
        eprintln!("error: cannot write '{}': {}", cli.output.display(), e);
        return ExitCode::FAILURE;
    }

    if cli.verbose {
        println!("wrote {}", cli.output.display());
    }

    ExitCode::SUCCESS
}
