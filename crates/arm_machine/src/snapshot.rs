use core::fmt;
use core::num::ParseIntError;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::labels::Label;
use crate::registers::{Register, RegisterRef};

/// A 64 bit value that crosses the serialization boundary as a decimal
/// string, so shells that only have doubles never lose the high bits.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Word(pub u64);

impl Word {
    pub fn value(self) -> u64 {
        self.0
    }

    /// Bytes most significant first, the order the stack view draws a slot in.
    pub fn bytes_be(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl From<u64> for Word {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Word> for String {
    fn from(word: Word) -> Self {
        word.0.to_string()
    }
}

impl TryFrom<String> for Word {
    type Error = ParseIntError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        text.parse().map(Word)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::LowerHex for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Everything a shell needs to draw one step. Owns all of its data, later
/// changes to the machine never reach a `State` already handed out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub instruction: String,
    pub stack: Vec<Word>,
    pub registers: BTreeMap<Register, Word>,
    pub labels: BTreeMap<usize, Vec<Label>>,
    pub register_labels: BTreeMap<Register, Vec<Label>>,
    pub modified_stack: Vec<usize>,
    pub modified_registers: Vec<RegisterRef>,
}

impl State {
    pub fn register(&self, register: Register) -> Option<u64> {
        self.registers.get(&register).copied().map(Word::value)
    }

    pub fn slot(&self, slot: usize) -> Option<u64> {
        self.stack.get(slot).copied().map(Word::value)
    }

    pub fn slot_labels(&self, slot: usize) -> &[Label] {
        self.labels.get(&slot).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn labels_of(&self, register: Register) -> &[Label] {
        self.register_labels
            .get(&register)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn slot_modified(&self, slot: usize) -> bool {
        self.modified_stack.contains(&slot)
    }

    pub fn register_modified(&self, register: RegisterRef) -> bool {
        self.modified_registers.contains(&register)
    }
}
