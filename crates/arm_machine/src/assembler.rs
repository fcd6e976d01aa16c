// Decoder for the handful of AArch64 instructions the visualizer runs.
// Spacing inside memory operands is free, operand shape is not.

use alloc::string::{String, ToString};
use heapless::{String as BoundedString, Vec};
use thiserror_no_std::Error;

use crate::isa::{Immediate, Instruction, MemoryOperand, Opcode, Operand};
use crate::registers::{RegisterRef, UnknownRegister};

/// Operand tokens after the mnemonic. `stp x29, x30, [sp, #-16]!` has four.
const MAX_TOKENS: usize = 5;
/// Room for one memory operand after its two tokens are glued together.
const OPERAND_CAP: usize = 48;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblerError {
    #[error("{0}")]
    Kind(AssemblerErrorKind),
    #[error("line {line}: {kind}")]
    WithLine { line: u32, kind: AssemblerErrorKind },
}

impl AssemblerError {
    fn with_line(self, line: u32) -> Self {
        match self {
            AssemblerError::WithLine { .. } => self,
            AssemblerError::Kind(kind) => AssemblerError::WithLine { line, kind },
        }
    }

    pub fn line_number(&self) -> Option<u32> {
        match self {
            Self::Kind(_) => None,
            Self::WithLine { line, .. } => Some(*line),
        }
    }

    pub fn error_kind(&self) -> &AssemblerErrorKind {
        match self {
            Self::Kind(kind) => kind,
            Self::WithLine { kind, .. } => kind,
        }
    }
}

impl From<AssemblerErrorKind> for AssemblerError {
    fn from(kind: AssemblerErrorKind) -> Self {
        AssemblerError::Kind(kind)
    }
}

impl From<UnknownRegister> for AssemblerError {
    fn from(err: UnknownRegister) -> Self {
        AssemblerError::Kind(AssemblerErrorKind::UnknownRegister(err))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblerErrorKind {
    #[error("too many tokens")]
    TooManyTokens,
    #[error("`{0}` is missing an operand")]
    MissingOperand(&'static str),
    #[error("unexpected operand `{0}`")]
    UnexpectedOperand(String),
    #[error("{0}")]
    UnknownRegister(UnknownRegister),
    #[error("invalid immediate `{0}`")]
    InvalidImmediate(String),
    #[error("invalid memory operand `{0}`")]
    InvalidMemoryOperand(String),
    #[error("memory operand `{0}` is missing its offset")]
    MissingOffset(String),
    #[error("invalid offset `{0}`")]
    InvalidOffset(String),
    #[error("`{0}` does not support writeback")]
    UnexpectedWriteback(&'static str),
    #[error("line number overflow")]
    LineNumberOverflow,
}

/// What a single source line decodes to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    /// Blank line.
    Empty,
    Instruction(Instruction),
    /// A mnemonic outside the supported set. Not fatal, the machine skips it.
    Unsupported(String),
}

/// Line by line decoder. Keeps the line count so errors can point at the
/// offending line of a listing.
#[derive(Debug, Default)]
pub struct Assembler {
    line_number: u32,
}

impl Assembler {
    pub fn new() -> Self {
        Self { line_number: 0 }
    }

    pub fn line_number(&self) -> u32 {
        self.line_number
    }

    pub fn add_line(&mut self, line: &str) -> Result<Statement, AssemblerError> {
        self.line_number = self
            .line_number
            .checked_add(1)
            .ok_or(AssemblerError::Kind(AssemblerErrorKind::LineNumberOverflow))?;
        let line_number = self.line_number;
        parse_line(line).map_err(|err| err.with_line(line_number))
    }
}

/// Decodes one line without any line bookkeeping.
pub fn parse_line(line: &str) -> Result<Statement, AssemblerError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Statement::Empty);
    }

    let mut words = line.split_whitespace();
    let Some(mnemonic) = words.next() else {
        return Ok(Statement::Empty);
    };
    // Unsupported lines are never tokenized, however long they are.
    let Some(opcode) = Opcode::from_mnemonic(mnemonic) else {
        return Ok(Statement::Unsupported(mnemonic.to_string()));
    };

    let mut tokens: Vec<&str, MAX_TOKENS> = Vec::new();
    for token in words {
        tokens
            .push(token)
            .map_err(|_| AssemblerError::Kind(AssemblerErrorKind::TooManyTokens))?;
    }

    let mut operands = Operands::new(opcode, &tokens);
    let instruction = match opcode {
        Opcode::Add | Opcode::Sub => {
            let dst = operands.register()?;
            let lhs = operands.register()?;
            let rhs = operands.source()?;
            if opcode == Opcode::Add {
                Instruction::Add { dst, lhs, rhs }
            } else {
                Instruction::Sub { dst, lhs, rhs }
            }
        }
        Opcode::Mov => {
            let dst = operands.register()?;
            let src = operands.source()?;
            Instruction::Mov { dst, src }
        }
        Opcode::Strb | Opcode::Ldrb => {
            let register = operands.register()?;
            let address = operands.memory()?;
            if address.writeback {
                return Err(AssemblerErrorKind::UnexpectedWriteback(opcode.mnemonic()).into());
            }
            if opcode == Opcode::Strb {
                Instruction::Strb {
                    src: register,
                    address,
                }
            } else {
                Instruction::Ldrb {
                    dst: register,
                    address,
                }
            }
        }
        Opcode::Stp => {
            let first = operands.register()?;
            let second = operands.register()?;
            let address = operands.memory()?;
            Instruction::Stp {
                first,
                second,
                address,
            }
        }
    };
    operands.finish()?;

    Ok(Statement::Instruction(instruction))
}

/// Cursor over the operand tokens of one line.
struct Operands<'t, 'a> {
    opcode: Opcode,
    tokens: &'t [&'a str],
}

impl<'t, 'a> Operands<'t, 'a> {
    fn new(opcode: Opcode, tokens: &'t [&'a str]) -> Self {
        Self { opcode, tokens }
    }

    fn next(&mut self) -> Result<&'a str, AssemblerError> {
        let Some((first, rest)) = self.tokens.split_first() else {
            return Err(AssemblerErrorKind::MissingOperand(self.opcode.mnemonic()).into());
        };
        self.tokens = rest;
        Ok(*first)
    }

    fn register(&mut self) -> Result<RegisterRef, AssemblerError> {
        let token = strip_comma(self.next()?);
        Ok(token.parse::<RegisterRef>()?)
    }

    /// A register or a `#` immediate.
    fn source(&mut self) -> Result<Operand, AssemblerError> {
        let token = strip_comma(self.next()?);
        match token.strip_prefix('#') {
            Some(literal) => {
                let immediate = parse_number(literal)
                    .filter(|immediate| {
                        (Immediate::MIN..=Immediate::MAX).contains(&immediate.value)
                    })
                    .ok_or_else(|| AssemblerErrorKind::InvalidImmediate(token.to_string()))?;
                Ok(Operand::Immediate(immediate))
            }
            None => Ok(Operand::Register(token.parse::<RegisterRef>()?)),
        }
    }

    /// `[base, #offset]` written as one token or split over two.
    fn memory(&mut self) -> Result<MemoryOperand, AssemblerError> {
        let first = self.next()?;
        let mut text: BoundedString<OPERAND_CAP> = BoundedString::new();
        push_operand(&mut text, first)?;
        if !first.ends_with(']') && !first.ends_with("]!") {
            let second = self.next()?;
            push_operand(&mut text, second)?;
        }
        parse_memory(text.as_str())
    }

    fn finish(&self) -> Result<(), AssemblerError> {
        match self.tokens.first() {
            Some(extra) => Err(AssemblerErrorKind::UnexpectedOperand(extra.to_string()).into()),
            None => Ok(()),
        }
    }
}

fn push_operand<const N: usize>(
    text: &mut BoundedString<N>,
    token: &str,
) -> Result<(), AssemblerError> {
    text.push_str(token)
        .map_err(|_| AssemblerErrorKind::InvalidMemoryOperand(token.to_string()).into())
}

fn parse_memory(text: &str) -> Result<MemoryOperand, AssemblerError> {
    let invalid = || AssemblerError::from(AssemblerErrorKind::InvalidMemoryOperand(text.to_string()));

    let (body, writeback) = match text.strip_suffix('!') {
        Some(body) => (body, true),
        None => (text, false),
    };
    let inner = body
        .strip_prefix('[')
        .and_then(|body| body.strip_suffix(']'))
        .ok_or_else(invalid)?;

    let mut parts = inner.split(',');
    let base = parts.next().map(str::trim).unwrap_or_default();
    let base = base.parse::<RegisterRef>()?;
    let offset = match parts.next() {
        None => 0,
        Some(offset) => parse_offset(text, offset.trim())?,
    };
    if parts.next().is_some() {
        return Err(invalid());
    }

    let operand = MemoryOperand::new(base, offset);
    Ok(if writeback {
        operand.with_writeback()
    } else {
        operand
    })
}

fn parse_offset(operand: &str, offset: &str) -> Result<i64, AssemblerError> {
    let literal = offset.strip_prefix('#').unwrap_or(offset);
    if literal.is_empty() {
        return Err(AssemblerErrorKind::MissingOffset(operand.to_string()).into());
    }
    parse_number(literal)
        .and_then(|immediate| i64::try_from(immediate.value).ok())
        .ok_or_else(|| AssemblerErrorKind::InvalidOffset(offset.to_string()).into())
}

/// Decimal or `0x` hex with an optional leading `-`.
fn parse_number(literal: &str) -> Option<Immediate> {
    let (negative, magnitude) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal),
    };
    let value = match magnitude
        .strip_prefix("0x")
        .or_else(|| magnitude.strip_prefix("0X"))
    {
        Some(hex) if hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
            Immediate::hex(i128::from(u64::from_str_radix(hex, 16).ok()?))
        }
        Some(_) => return None,
        None if magnitude.bytes().all(|b| b.is_ascii_digit()) => {
            Immediate::decimal(i128::from(magnitude.parse::<u64>().ok()?))
        }
        None => return None,
    };
    if negative {
        Some(Immediate {
            value: value.value.checked_neg()?,
            ..value
        })
    } else {
        Some(value)
    }
}

fn strip_comma(token: &str) -> &str {
    token.strip_suffix(',').unwrap_or(token)
}
