use core::fmt;

use crate::registers::RegisterRef;

/// How an immediate was spelled, so labels can show it the same way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Radix {
    Decimal,
    Hex,
}

/// `#imm`. Kept signed so `#-16` shows up in labels the way it was written;
/// it is applied to registers modulo 2^64.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Immediate {
    pub value: i128,
    pub radix: Radix,
}

impl Immediate {
    /// Lowest value an immediate may take.
    pub const MIN: i128 = i64::MIN as i128;
    /// Highest value an immediate may take.
    pub const MAX: i128 = u64::MAX as i128;

    pub fn decimal(value: i128) -> Self {
        Self {
            value,
            radix: Radix::Decimal,
        }
    }

    pub fn hex(value: i128) -> Self {
        Self {
            value,
            radix: Radix::Hex,
        }
    }

    /// Two's complement truncation to a register value.
    pub fn bits(self) -> u64 {
        self.value as u64
    }
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.radix {
            Radix::Decimal => write!(f, "#{}", self.value),
            Radix::Hex if self.value < 0 => write!(f, "#-{:#x}", self.value.unsigned_abs()),
            Radix::Hex => write!(f, "#{:#x}", self.value),
        }
    }
}

/// Source operand of `add`, `sub` and `mov`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    Register(RegisterRef),
    Immediate(Immediate),
}

impl Operand {
    pub fn register(self) -> Option<RegisterRef> {
        match self {
            Operand::Register(register) => Some(register),
            Operand::Immediate(_) => None,
        }
    }
}

impl From<RegisterRef> for Operand {
    fn from(register: RegisterRef) -> Self {
        Operand::Register(register)
    }
}

impl From<Immediate> for Operand {
    fn from(immediate: Immediate) -> Self {
        Operand::Immediate(immediate)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(register) => write!(f, "{register}"),
            Operand::Immediate(immediate) => write!(f, "{immediate}"),
        }
    }
}

/// `[base, #offset]`, with `writeback` set for the `!` form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryOperand {
    pub base: RegisterRef,
    pub offset: i64,
    pub writeback: bool,
}

impl MemoryOperand {
    pub fn new(base: RegisterRef, offset: i64) -> Self {
        Self {
            base,
            offset,
            writeback: false,
        }
    }

    pub fn with_writeback(self) -> Self {
        Self {
            writeback: true,
            ..self
        }
    }
}

impl fmt::Display for MemoryOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, #{}]", self.base, self.offset)?;
        if self.writeback {
            f.write_str("!")?;
        }
        Ok(())
    }
}

/// Mnemonics the machine understands. Matching is case sensitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    Add,
    Sub,
    Mov,
    Strb,
    Ldrb,
    Stp,
}

impl Opcode {
    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        match mnemonic {
            "add" => Some(Opcode::Add),
            "sub" => Some(Opcode::Sub),
            "mov" => Some(Opcode::Mov),
            "strb" => Some(Opcode::Strb),
            "ldrb" => Some(Opcode::Ldrb),
            "stp" => Some(Opcode::Stp),
            _ => None,
        }
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mov => "mov",
            Opcode::Strb => "strb",
            Opcode::Ldrb => "ldrb",
            Opcode::Stp => "stp",
        }
    }
}

/// A fully decoded line, ready to apply to a [`crate::Machine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    Add {
        dst: RegisterRef,
        lhs: RegisterRef,
        rhs: Operand,
    },
    Sub {
        dst: RegisterRef,
        lhs: RegisterRef,
        rhs: Operand,
    },
    Mov {
        dst: RegisterRef,
        src: Operand,
    },
    Strb {
        src: RegisterRef,
        address: MemoryOperand,
    },
    Ldrb {
        dst: RegisterRef,
        address: MemoryOperand,
    },
    Stp {
        first: RegisterRef,
        second: RegisterRef,
        address: MemoryOperand,
    },
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Add { .. } => Opcode::Add,
            Instruction::Sub { .. } => Opcode::Sub,
            Instruction::Mov { .. } => Opcode::Mov,
            Instruction::Strb { .. } => Opcode::Strb,
            Instruction::Ldrb { .. } => Opcode::Ldrb,
            Instruction::Stp { .. } => Opcode::Stp,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.opcode().mnemonic();
        match self {
            Instruction::Add { dst, lhs, rhs } | Instruction::Sub { dst, lhs, rhs } => {
                write!(f, "{mnemonic} {dst}, {lhs}, {rhs}")
            }
            Instruction::Mov { dst, src } => write!(f, "{mnemonic} {dst}, {src}"),
            Instruction::Strb { src, address } => write!(f, "{mnemonic} {src}, {address}"),
            Instruction::Ldrb { dst, address } => write!(f, "{mnemonic} {dst}, {address}"),
            Instruction::Stp {
                first,
                second,
                address,
            } => write!(f, "{mnemonic} {first}, {second}, {address}"),
        }
    }
}
