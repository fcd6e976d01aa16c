use core::fmt;
use core::str::FromStr;

use alloc::string::{String, ToString};
use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;
use variant_count::VariantCount;

/// Number of general purpose registers, `x0` through `x30`.
pub const GENERAL_REGISTER_COUNT: u8 = 31;

const LOW_WORD_MASK: u64 = 0xFFFF_FFFF;
const HIGH_WORD_MASK: u64 = !LOW_WORD_MASK;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown register `{0}`")]
pub struct UnknownRegister(pub String);

/// The backing 64 bit registers of the machine.
///
/// `fp` is its own register here and is not an alias of `x29`.
#[repr(u8)]
#[derive(
    VariantCount, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum Register {
    X0,
    X1,
    X2,
    X3,
    X4,
    X5,
    X6,
    X7,
    X8,
    X9,
    X10,
    X11,
    X12,
    X13,
    X14,
    X15,
    X16,
    X17,
    X18,
    X19,
    X20,
    X21,
    X22,
    X23,
    X24,
    X25,
    X26,
    X27,
    X28,
    X29,
    X30,
    Sp,
    Fp,
}

impl Register {
    /// Every register in display order.
    pub const ALL: [Register; Register::VARIANT_COUNT] = [
        Register::X0,
        Register::X1,
        Register::X2,
        Register::X3,
        Register::X4,
        Register::X5,
        Register::X6,
        Register::X7,
        Register::X8,
        Register::X9,
        Register::X10,
        Register::X11,
        Register::X12,
        Register::X13,
        Register::X14,
        Register::X15,
        Register::X16,
        Register::X17,
        Register::X18,
        Register::X19,
        Register::X20,
        Register::X21,
        Register::X22,
        Register::X23,
        Register::X24,
        Register::X25,
        Register::X26,
        Register::X27,
        Register::X28,
        Register::X29,
        Register::X30,
        Register::Sp,
        Register::Fp,
    ];

    /// Looks up `x<number>`.
    pub fn general(number: u8) -> Option<Register> {
        if number >= GENERAL_REGISTER_COUNT {
            return None;
        }
        Register::ALL.get(usize::from(number)).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// `sp` and `fp` hold byte addresses into the stack.
    pub fn is_stack_register(self) -> bool {
        matches!(self, Register::Sp | Register::Fp)
    }

    pub fn number(self) -> Option<u8> {
        if self.is_stack_register() {
            None
        } else {
            Some(self as u8)
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.number() {
            Some(number) => write!(f, "x{number}"),
            None if *self == Register::Sp => f.write_str("sp"),
            None => f.write_str("fp"),
        }
    }
}

impl FromStr for Register {
    type Err = UnknownRegister;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.parse::<RegisterRef>()? {
            RegisterRef {
                register,
                width: Width::X,
            } => Ok(register),
            RegisterRef { width: Width::W, .. } => Err(UnknownRegister(name.to_string())),
        }
    }
}

impl From<Register> for String {
    fn from(register: Register) -> Self {
        register.to_string()
    }
}

impl TryFrom<String> for Register {
    type Error = UnknownRegister;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

/// Which view of a backing register an operand names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Width {
    /// The full 64 bit register, `x<n>`, `sp` or `fp`.
    X,
    /// The low 32 bit alias, `w<n>`.
    W,
}

/// A register as it is named in source, ex `w3` is `X3` viewed as 32 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegisterRef {
    pub register: Register,
    pub width: Width,
}

impl RegisterRef {
    pub fn x(register: Register) -> Self {
        Self {
            register,
            width: Width::X,
        }
    }

    /// Returns `None` for `sp` and `fp` which have no 32 bit alias here.
    pub fn w(register: Register) -> Option<Self> {
        if register.is_stack_register() {
            return None;
        }
        Some(Self {
            register,
            width: Width::W,
        })
    }

    pub fn is_alias(self) -> bool {
        self.width == Width::W
    }

    /// The 64 bit view of the same register.
    pub fn backing(self) -> Self {
        Self::x(self.register)
    }
}

impl From<Register> for RegisterRef {
    fn from(register: Register) -> Self {
        Self::x(register)
    }
}

impl fmt::Display for RegisterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.width, self.register.number()) {
            (Width::W, Some(number)) => write!(f, "w{number}"),
            _ => fmt::Display::fmt(&self.register, f),
        }
    }
}

impl FromStr for RegisterRef {
    type Err = UnknownRegister;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownRegister(name.to_string());
        match name {
            "sp" => return Ok(Self::x(Register::Sp)),
            "fp" => return Ok(Self::x(Register::Fp)),
            _ => {}
        }

        let mut chars = name.chars();
        let width = match chars.next() {
            Some('x') => Width::X,
            Some('w') => Width::W,
            _ => return Err(unknown()),
        };
        let digits = chars.as_str();
        // Reject `x01` and `x+1`, only the canonical spelling names a register.
        if digits.is_empty()
            || !digits.bytes().all(|b| b.is_ascii_digit())
            || (digits.len() > 1 && digits.starts_with('0'))
        {
            return Err(unknown());
        }
        let number = digits.parse::<u8>().map_err(|_| unknown())?;
        let register = Register::general(number).ok_or_else(unknown)?;
        Ok(Self { register, width })
    }
}

impl From<RegisterRef> for String {
    fn from(register: RegisterRef) -> Self {
        register.to_string()
    }
}

impl TryFrom<String> for RegisterRef {
    type Error = UnknownRegister;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        name.parse()
    }
}

/// Values of every backing register.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterFile {
    values: [u64; Register::VARIANT_COUNT],
}

impl RegisterFile {
    /// All general registers start at zero, `sp` and `fp` at `stack_top`.
    pub fn new(stack_top: u64) -> Self {
        let mut file = Self {
            values: [0; Register::VARIANT_COUNT],
        };
        file.set(Register::Sp, stack_top);
        file.set(Register::Fp, stack_top);
        file
    }

    pub fn get(&self, register: Register) -> u64 {
        self.values.get(register.index()).copied().unwrap_or_default()
    }

    pub fn set(&mut self, register: Register, value: u64) {
        if let Some(slot) = self.values.get_mut(register.index()) {
            *slot = value;
        }
    }

    /// Reading a `w` alias yields the low 32 bits of its backing register.
    pub fn read(&self, register: RegisterRef) -> u64 {
        let value = self.get(register.register);
        match register.width {
            Width::X => value,
            Width::W => value & LOW_WORD_MASK,
        }
    }

    /// Writing a `w` alias replaces only the low 32 bits and keeps whatever
    /// the upper half of the backing register held before.
    pub fn write(&mut self, register: RegisterRef, value: u64) {
        let value = match register.width {
            Width::X => value,
            Width::W => {
                (self.get(register.register) & HIGH_WORD_MASK) | (value & LOW_WORD_MASK)
            }
        };
        self.set(register.register, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Register, u64)> + '_ {
        Register::ALL
            .into_iter()
            .map(|register| (register, self.get(register)))
    }
}
