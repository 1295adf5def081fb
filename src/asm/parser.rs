//! TRIAS parser.
//!
//! One statement per line: an optional label followed by an instruction or
//! directive. Each operand is tagged with its addressing mode here, so the
//! code generator never re-inspects prefixes. Errors flip the parser into
//! panic mode; recovery skips to the next newline or directive keyword and
//! parsing resumes, collecting every diagnostic in one run.

use crate::asm::ast::{Directive, Node, Operand, OperandKind, Program, SymbolTable};
use crate::asm::lexer::{Lexed, Lexer, Token};
use crate::vm::{AddrMode, Op};
use std::fmt;

/// Longest accepted label name.
pub const MAX_LABEL_LENGTH: usize = 255;

/// A parse diagnostic tied to a source line and the offending token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: usize,
    pub near: String,
    pub message: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.near == "end of file" {
            write!(f, "[line {}] error at end of file: {}", self.line, self.message)
        } else {
            write!(f, "[line {}] error near '{}': {}", self.line, self.near, self.message)
        }
    }
}

impl std::error::Error for SyntaxError {}

/// Parse a complete source file into a program and its symbol table.
///
/// Labels get placeholder addresses; the code generator's layout pass
/// assigns the real ones.
pub fn parse(source: &str) -> Result<(Program, SymbolTable), Vec<SyntaxError>> {
    let mut parser = Parser::new(source);
    parser.parse_program()
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Lexed,
    errors: Vec<SyntaxError>,
    panic_mode: bool,
    symbols: SymbolTable,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            errors: Vec::new(),
            panic_mode: false,
            symbols: SymbolTable::new(),
        }
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    fn check(&self, token: &Token) -> bool {
        self.current.token == *token
    }

    fn matches(&mut self, token: &Token) -> bool {
        if !self.check(token) {
            return false;
        }
        self.advance();
        true
    }

    fn error_at_current(&mut self, message: impl Into<String>) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.errors.push(SyntaxError {
            line: self.current.line,
            near: self.current.token.lexeme(),
            message: message.into(),
        });
    }

    /// Skip to the next statement boundary: past a newline, or up to a
    /// directive keyword.
    fn synchronize(&mut self) {
        self.panic_mode = false;
        loop {
            match self.current.token {
                Token::Eof => return,
                Token::Newline => {
                    self.advance();
                    return;
                }
                Token::Org | Token::Db | Token::Dw | Token::Ds => return,
                _ => self.advance(),
            }
        }
    }

    fn parse_program(&mut self) -> Result<(Program, SymbolTable), Vec<SyntaxError>> {
        let mut program = Program::default();

        while !self.check(&Token::Eof) {
            if self.matches(&Token::Newline) {
                continue;
            }

            let node = match self.current.token.clone() {
                Token::Identifier(name) => {
                    let line = self.current.line;
                    self.advance();
                    if self.check(&Token::Colon) {
                        self.parse_label(&name, line)
                    } else {
                        self.parse_instruction(&name, line)
                    }
                }
                Token::Org | Token::Db | Token::Dw | Token::Ds => {
                    let directive = self.current.token.clone();
                    let line = self.current.line;
                    self.advance();
                    self.parse_directive(&directive, line)
                }
                Token::Error(message) => {
                    self.error_at_current(message);
                    None
                }
                _ => {
                    self.error_at_current("expected instruction, label or directive");
                    None
                }
            };

            match node {
                Some(node) => program.nodes.push(node),
                None => self.synchronize(),
            }
        }

        if self.errors.is_empty() {
            Ok((program, std::mem::take(&mut self.symbols)))
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    fn parse_label(&mut self, name: &str, line: usize) -> Option<Node> {
        if !is_valid_label_name(name) {
            self.error_at_current("invalid label name");
            return None;
        }

        self.advance(); // the colon

        if self.symbols.define(name, line).is_err() {
            self.errors.push(SyntaxError {
                line,
                near: name.to_string(),
                message: "label already defined".into(),
            });
            self.panic_mode = true;
            return None;
        }

        Some(Node::Label { name: name.to_string(), line })
    }

    fn parse_instruction(&mut self, mnemonic: &str, line: usize) -> Option<Node> {
        let info = match Op::by_mnemonic(mnemonic) {
            Some(info) => info,
            None => {
                self.errors.push(SyntaxError {
                    line,
                    near: mnemonic.to_string(),
                    message: "unknown instruction".into(),
                });
                self.panic_mode = true;
                return None;
            }
        };

        // Immediate-mode LOAD and STORE take their address from the stack
        // and are written bare; every other mnemonic has a fixed arity
        let bare_form = matches!(info.op, Op::Load | Op::Store)
            && (self.check(&Token::Newline) || self.check(&Token::Eof));

        let mut operands = Vec::with_capacity(info.operands);
        let wanted = if bare_form { 0 } else { info.operands };
        for i in 0..wanted {
            if i > 0 {
                if !self.matches(&Token::Comma) {
                    self.error_at_current("expected comma");
                    return None;
                }
                // An operand may continue on the next line after a comma
                while self.matches(&Token::Newline) {}
            }

            if self.check(&Token::Newline) || self.check(&Token::Eof) {
                self.error_at_current("expected operand");
                return None;
            }

            operands.push(self.parse_operand()?);
        }

        if !self.matches(&Token::Newline) && !self.check(&Token::Eof) {
            self.error_at_current("expected end of line");
            return None;
        }

        Some(Node::Instruction { op: info.op, operands, line })
    }

    fn parse_operand(&mut self) -> Option<Operand> {
        let line = self.current.line;

        let prefix = if self.matches(&Token::Hash) {
            Some(AddrMode::Immediate)
        } else if self.matches(&Token::At) {
            Some(AddrMode::Indirect)
        } else {
            None
        };

        let operand = match self.current.token.clone() {
            Token::Number(value) => {
                if prefix == Some(AddrMode::Indirect) {
                    self.error_at_current("number cannot be used in indirect mode");
                    return None;
                }
                Operand { kind: OperandKind::Number(value), mode: AddrMode::Immediate, line }
            }
            Token::Char(c) => {
                if prefix == Some(AddrMode::Indirect) {
                    self.error_at_current("character cannot be used in indirect mode");
                    return None;
                }
                Operand { kind: OperandKind::Char(c), mode: AddrMode::Immediate, line }
            }
            Token::Identifier(name) => {
                if let Some(index) = register_index(&name) {
                    if prefix == Some(AddrMode::Immediate) {
                        self.error_at_current("register cannot be immediate");
                        return None;
                    }
                    if index > 7 {
                        self.error_at_current("invalid register number");
                        return None;
                    }
                    let mode = if prefix == Some(AddrMode::Indirect) {
                        AddrMode::Indirect
                    } else {
                        AddrMode::Register
                    };
                    Operand { kind: OperandKind::Register(index as u8), mode, line }
                } else {
                    // A label reference; it may be defined later
                    let mode = prefix.unwrap_or(AddrMode::Immediate);
                    Operand { kind: OperandKind::Identifier(name), mode, line }
                }
            }
            _ => {
                self.error_at_current("expected number, register or label");
                return None;
            }
        };

        self.advance();
        Some(operand)
    }

    fn parse_directive(&mut self, directive: &Token, line: usize) -> Option<Node> {
        let parsed = match directive {
            Token::Org => match self.current.token {
                Token::Number(value) => {
                    self.advance();
                    Directive::Org(value)
                }
                _ => {
                    self.error_at_current("expected number after .org");
                    return None;
                }
            },
            Token::Db | Token::Dw => match self.current.token {
                Token::Number(value) => {
                    self.advance();
                    if *directive == Token::Db {
                        Directive::Db(value)
                    } else {
                        Directive::Dw(value)
                    }
                }
                _ => {
                    self.error_at_current("expected number after directive");
                    return None;
                }
            },
            Token::Ds => match self.current.token.clone() {
                Token::Str(text) => {
                    self.advance();
                    Directive::Ds(text)
                }
                _ => {
                    self.error_at_current("expected string after .ds");
                    return None;
                }
            },
            _ => unreachable!("caller checked the directive token"),
        };

        if !self.matches(&Token::Newline) && !self.check(&Token::Eof) {
            self.error_at_current("expected end of line");
            return None;
        }

        Some(Node::Directive { directive: parsed, line })
    }
}

/// `Rn` names: an `R` followed by nothing but digits.
fn register_index(name: &str) -> Option<u32> {
    let digits = name.strip_prefix('R')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Letters first, then letters, digits, or underscores; bounded length.
fn is_valid_label_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_LABEL_LENGTH {
        return false;
    }
    let mut bytes = name.bytes();
    let first = bytes.next().unwrap();
    if !first.is_ascii_alphabetic() {
        return false;
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> (Program, SymbolTable) {
        parse(source).unwrap_or_else(|errors| {
            panic!("unexpected parse errors for {:?}: {:?}", source, errors)
        })
    }

    fn first_error(source: &str) -> SyntaxError {
        parse(source).expect_err("expected a parse error").remove(0)
    }

    #[test]
    fn test_simple_program() {
        let (program, _) = parse_ok("PUSH #42\nPOP R0\nHALT\n");
        assert_eq!(program.nodes.len(), 3);

        match &program.nodes[0] {
            Node::Instruction { op, operands, .. } => {
                assert_eq!(*op, Op::Push);
                assert_eq!(operands[0].mode, AddrMode::Immediate);
                assert_eq!(operands[0].kind, OperandKind::Number(42));
            }
            other => panic!("expected instruction, got {:?}", other),
        }
    }

    #[test]
    fn test_addressing_modes() {
        // Bare numbers and labels are immediate
        let (program, _) = parse_ok("PUSH 42\n");
        match &program.nodes[0] {
            Node::Instruction { operands, .. } => {
                assert_eq!(operands[0].mode, AddrMode::Immediate)
            }
            _ => unreachable!(),
        }

        // Bare register
        let (program, _) = parse_ok("PUSH R3\n");
        match &program.nodes[0] {
            Node::Instruction { operands, .. } => {
                assert_eq!(operands[0].mode, AddrMode::Register);
                assert_eq!(operands[0].kind, OperandKind::Register(3));
            }
            _ => unreachable!(),
        }

        // Indirect through a register
        let (program, _) = parse_ok("POP @R1\n");
        match &program.nodes[0] {
            Node::Instruction { operands, .. } => {
                assert_eq!(operands[0].mode, AddrMode::Indirect)
            }
            _ => unreachable!(),
        }

        // Indirect through a label
        let (program, _) = parse_ok("PUSH @target\n");
        match &program.nodes[0] {
            Node::Instruction { operands, .. } => {
                assert_eq!(operands[0].mode, AddrMode::Indirect)
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_mode_conflicts() {
        assert_eq!(first_error("PUSH #R0\n").message, "register cannot be immediate");
        assert_eq!(
            first_error("PUSH @42\n").message,
            "number cannot be used in indirect mode"
        );
    }

    #[test]
    fn test_register_range() {
        parse_ok("PUSH R7\n");
        assert_eq!(first_error("PUSH R8\n").message, "invalid register number");
    }

    #[test]
    fn test_char_operand() {
        let (program, _) = parse_ok("PUSH 'A'\n");
        match &program.nodes[0] {
            Node::Instruction { operands, .. } => {
                assert_eq!(operands[0].kind, OperandKind::Char('A'));
                assert_eq!(operands[0].mode, AddrMode::Immediate);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_labels() {
        let (program, symbols) = parse_ok("start: PUSH #1\nJMP start\n");
        assert!(matches!(&program.nodes[0], Node::Label { name, .. } if name == "start"));
        assert!(symbols.lookup("start").is_some());

        // Forward references are fine at parse time
        parse_ok("JMP later\nlater: HALT\n");
    }

    #[test]
    fn test_label_redefinition() {
        assert_eq!(
            first_error("a: NOP\na: NOP\n").message,
            "label already defined"
        );
    }

    #[test]
    fn test_consecutive_labels() {
        let (program, symbols) = parse_ok("a:\nb: HALT\n");
        assert_eq!(program.nodes.len(), 3);
        assert_eq!(symbols.len(), 2);
    }

    #[test]
    fn test_unknown_instruction() {
        let err = first_error("FROB R0\n");
        assert_eq!(err.message, "unknown instruction");
        assert_eq!(err.near, "FROB");
    }

    #[test]
    fn test_operand_arity() {
        assert_eq!(first_error("PUSH\n").message, "expected operand");
        assert_eq!(first_error("MOV R0\nHALT\n").message, "expected comma");
        assert_eq!(first_error("NOP 5\n").message, "expected end of line");
    }

    #[test]
    fn test_bare_load_store() {
        // The immediate-mode forms name no operand; the address comes from
        // the stack at run time
        let (program, _) = parse_ok("STORE\nLOAD\n");
        for node in &program.nodes {
            match node {
                Node::Instruction { operands, .. } => assert!(operands.is_empty()),
                other => panic!("expected instruction, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_load_store_with_register_operand() {
        let (program, _) = parse_ok("STORE R1\nLOAD @R2\n");
        match &program.nodes[0] {
            Node::Instruction { op, operands, .. } => {
                assert_eq!(*op, Op::Store);
                assert_eq!(operands.len(), 1);
                assert_eq!(operands[0].mode, AddrMode::Register);
            }
            _ => unreachable!(),
        }
        match &program.nodes[1] {
            Node::Instruction { operands, .. } => {
                assert_eq!(operands[0].mode, AddrMode::Indirect)
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_directives() {
        let (program, _) = parse_ok(".org 100\n.db 42\n.dw 7\n.ds \"hi\"\n");
        assert_eq!(program.nodes.len(), 4);
        assert!(matches!(
            &program.nodes[0],
            Node::Directive { directive: Directive::Org(100), .. }
        ));
        assert!(matches!(
            &program.nodes[3],
            Node::Directive { directive: Directive::Ds(s), .. } if s == "hi"
        ));
    }

    #[test]
    fn test_directive_arguments() {
        assert_eq!(first_error(".org label\n").message, "expected number after .org");
        assert_eq!(first_error(".ds 42\n").message, "expected string after .ds");
        assert_eq!(first_error(".db \"x\"\n").message, "expected number after directive");
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let (program, _) = parse_ok("; header\n\nNOP ; trailing\n\nHALT\n");
        assert_eq!(program.nodes.len(), 2);
    }

    #[test]
    fn test_error_format() {
        let err = first_error("PUSH @42\n");
        assert_eq!(
            err.to_string(),
            "[line 1] error near '42': number cannot be used in indirect mode"
        );
    }

    #[test]
    fn test_recovery_collects_multiple_errors() {
        let errors = parse("FROB\nPUSH @42\nHALT\n").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line, 1);
        assert_eq!(errors[1].line, 2);
    }

    #[test]
    fn test_operand_after_comma_newline() {
        // A comma may be followed by a line break before the next operand
        parse_ok("MOV R0,\nR1\n");
    }

    #[test]
    fn test_missing_final_newline_ok() {
        parse_ok("HALT");
    }
}
