use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::registers::Register;

/// How many rendered steps a label stays visible unless the producing
/// operation asks for something else.
pub const DEFAULT_LABEL_RENDERS: u32 = 2;

/// Lifetime used by byte and pair operations: visible on the producing step only.
pub const SINGLE_RENDER: u32 = 1;

/// A provenance note on a slot or register. Serializes as `[text, renders]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, u32)", into = "(String, u32)")]
pub struct Label {
    pub text: String,
    pub renders: u32,
}

impl Label {
    pub fn new(text: impl Into<String>, renders: u32) -> Self {
        Self {
            text: text.into(),
            renders,
        }
    }
}

impl From<(String, u32)> for Label {
    fn from((text, renders): (String, u32)) -> Self {
        Self { text, renders }
    }
}

impl From<Label> for (String, u32) {
    fn from(label: Label) -> Self {
        (label.text, label.renders)
    }
}

/// Labels for every stack slot and every backing register.
///
/// `w` aliases share the list of their backing `x` register.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelStore {
    slots: Vec<Vec<Label>>,
    registers: [Vec<Label>; Register::VARIANT_COUNT],
}

impl LabelStore {
    pub fn new(slot_count: usize) -> Self {
        Self {
            slots: vec![Vec::new(); slot_count],
            registers: core::array::from_fn(|_| Vec::new()),
        }
    }

    /// Adds `text` to a slot or refreshes its count if the slot already
    /// carries it. Slots past the end of the stack are ignored.
    pub fn add_slot(&mut self, slot: usize, text: String, renders: u32) {
        if let Some(labels) = self.slots.get_mut(slot) {
            upsert(labels, text, renders);
        }
    }

    /// Drops whatever the slot carried and leaves only `label`.
    pub fn replace_slot(&mut self, slot: usize, label: Label) {
        if let Some(labels) = self.slots.get_mut(slot) {
            labels.clear();
            labels.push(label);
        }
    }

    pub fn add_register(&mut self, register: Register, text: String, renders: u32) {
        if let Some(labels) = self.registers.get_mut(register.index()) {
            upsert(labels, text, renders);
        }
    }

    pub fn slot(&self, slot: usize) -> &[Label] {
        self.slots.get(slot).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn register(&self, register: Register) -> &[Label] {
        self.registers
            .get(register.index())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// One rendered step has passed. Labels on their last render are
    /// dropped and the rest count down.
    pub fn decay(&mut self) {
        for labels in self.slots.iter_mut().chain(self.registers.iter_mut()) {
            labels.retain(|label| label.renders > 1);
            for label in labels.iter_mut() {
                label.renders = label.renders.saturating_sub(1);
            }
        }
    }

    /// Non-empty slot lists in slot order.
    pub fn slot_entries(&self) -> impl Iterator<Item = (usize, &[Label])> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, labels)| !labels.is_empty())
            .map(|(slot, labels)| (slot, labels.as_slice()))
    }

    /// Non-empty register lists in register order.
    pub fn register_entries(&self) -> impl Iterator<Item = (Register, &[Label])> + '_ {
        Register::ALL
            .into_iter()
            .map(|register| (register, self.register(register)))
            .filter(|(_, labels)| !labels.is_empty())
    }
}

fn upsert(labels: &mut Vec<Label>, text: String, renders: u32) {
    match labels.iter_mut().find(|label| label.text == text) {
        Some(existing) => existing.renders = renders,
        None => labels.push(Label { text, renders }),
    }
}

#[cfg(test)]
mod test;
