//! The TRIAS assembler.
//!
//! Source text flows through the classic pipeline: lexer → parser (syntax
//! tree + symbol table) → two-pass code generator → tryte image. The image
//! module defines the on-disk format shared with the emulator.

pub mod ast;
pub mod codegen;
pub mod image;
pub mod lexer;
pub mod parser;

pub use ast::{Directive, Node, Operand, OperandKind, Program, SymbolTable};
pub use image::{image_from_bytes, image_to_bytes, load_image, save_image, ImageError};
pub use parser::SyntaxError;

use crate::ternary::Tryte;
use thiserror::Error;

/// Anything that can go wrong between source text and image.
#[derive(Debug, Error)]
pub enum AsmError {
    /// One or more parse diagnostics.
    #[error("{}", format_parse_errors(.0))]
    Parse(Vec<SyntaxError>),

    /// A code generation diagnostic (unresolved label, bad expansion).
    #[error("{0}")]
    Codegen(SyntaxError),
}

impl AsmError {
    /// All diagnostics, in source order.
    pub fn diagnostics(&self) -> Vec<&SyntaxError> {
        match self {
            AsmError::Parse(errors) => errors.iter().collect(),
            AsmError::Codegen(error) => vec![error],
        }
    }
}

fn format_parse_errors(errors: &[SyntaxError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assemble source text into a loadable tryte image.
pub fn assemble(source: &str) -> Result<Vec<Tryte>, AsmError> {
    let (program, mut symbols) = parser::parse(source).map_err(AsmError::Parse)?;
    codegen::generate(&program, &mut symbols).map_err(AsmError::Codegen)
}
