use alloc::collections::BTreeSet;
use alloc::format;
use alloc::string::{String, ToString};

use crate::assembler::{Statement, parse_line};
use crate::isa::{Instruction, MemoryOperand, Operand};
use crate::labels::{DEFAULT_LABEL_RENDERS, Label, LabelStore, SINGLE_RENDER};
use crate::memory::{ByteLocation, MemoryStack, SLOT_SIZE_BYTES};
use crate::registers::{Register, RegisterFile, RegisterRef};
use crate::snapshot::{State, Word};
use crate::{MachineError, StepError};

const BYTE_MASK: u64 = 0xFF;
const SLOT_STRIDE: i128 = SLOT_SIZE_BYTES as i128;

/// What happened to the line handed to [`Machine::step`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Executed,
    /// Blank line, nothing to do.
    Empty,
    /// Mnemonic outside the supported set; the state is left as it was.
    Unsupported(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub state: State,
    pub outcome: Outcome,
}

/// Registers, stack and labels of one run.
///
/// Every instruction either applies completely or, when an operand does not
/// resolve, fails before anything is written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Machine {
    registers: RegisterFile,
    stack: MemoryStack,
    labels: LabelStore,
    modified_stack: BTreeSet<usize>,
    modified_registers: BTreeSet<RegisterRef>,
    label_renders: u32,
}

impl Machine {
    /// A machine with `stack_slots` zeroed slots and `sp`/`fp` pointing at
    /// the highest one.
    pub fn new(stack_slots: usize) -> Result<Self, MachineError> {
        let stack = MemoryStack::new(stack_slots)?;
        Ok(Self {
            registers: RegisterFile::new(stack.top_address()),
            labels: LabelStore::new(stack.len()),
            stack,
            modified_stack: BTreeSet::new(),
            modified_registers: BTreeSet::new(),
            label_renders: DEFAULT_LABEL_RENDERS,
        })
    }

    pub fn with_seeds(
        stack_slots: usize,
        seeds: &[(Register, u64)],
    ) -> Result<Self, MachineError> {
        let mut machine = Self::new(stack_slots)?;
        for (register, value) in seeds {
            machine.set_register(*register, *value);
        }
        Ok(machine)
    }

    /// Lifetime given to labels that do not ask for a specific one.
    pub fn set_label_renders(&mut self, renders: u32) {
        self.label_renders = renders;
    }

    pub fn label_renders(&self) -> u32 {
        self.label_renders
    }

    /// Seeds a register without touching labels or the modified set.
    pub fn set_register(&mut self, register: Register, value: u64) {
        self.registers.set(register, value);
    }

    pub fn register(&self, register: RegisterRef) -> u64 {
        self.registers.read(register)
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn stack(&self) -> &MemoryStack {
        &self.stack
    }

    pub fn labels(&self) -> &LabelStore {
        &self.labels
    }

    /// Forgets which slots and registers the previous instruction touched.
    pub fn clear_modified(&mut self) {
        self.modified_stack.clear();
        self.modified_registers.clear();
    }

    /// One rendered step has passed.
    pub fn decay_labels(&mut self) {
        self.labels.decay();
    }

    /// Decodes and applies one line, then snapshots the result.
    pub fn step(&mut self, line: &str) -> Result<Step, StepError> {
        let statement = parse_line(line)?;
        Ok(self.apply(&statement, line)?)
    }

    /// Applies an already decoded line. `text` becomes the instruction text
    /// of the returned snapshot.
    pub fn apply(&mut self, statement: &Statement, text: &str) -> Result<Step, MachineError> {
        self.clear_modified();
        let outcome = match statement {
            Statement::Empty => Outcome::Empty,
            Statement::Unsupported(mnemonic) => Outcome::Unsupported(mnemonic.clone()),
            Statement::Instruction(instruction) => {
                self.execute(instruction)?;
                Outcome::Executed
            }
        };
        Ok(Step {
            state: self.snapshot(text.trim()),
            outcome,
        })
    }

    pub fn execute(&mut self, instruction: &Instruction) -> Result<(), MachineError> {
        match *instruction {
            Instruction::Add { dst, lhs, rhs } => self.add(dst, lhs, rhs),
            Instruction::Sub { dst, lhs, rhs } => self.sub(dst, lhs, rhs),
            Instruction::Mov { dst, src } => self.mov(dst, src),
            Instruction::Strb { src, address } => self.strb(src, address)?,
            Instruction::Ldrb { dst, address } => self.ldrb(dst, address)?,
            Instruction::Stp {
                first,
                second,
                address,
            } => self.stp(first, second, address)?,
        }
        Ok(())
    }

    /// `dst = lhs + rhs`, wrapping at 64 bits.
    pub fn add(&mut self, dst: RegisterRef, lhs: RegisterRef, rhs: Operand) {
        let value = self.registers.read(lhs).wrapping_add(self.operand(rhs));
        self.write_result(dst, value, format!("add {dst}"));
    }

    /// `dst = lhs - rhs`, wrapping at 64 bits.
    pub fn sub(&mut self, dst: RegisterRef, lhs: RegisterRef, rhs: Operand) {
        let value = self.registers.read(lhs).wrapping_sub(self.operand(rhs));
        self.write_result(dst, value, format!("sub {dst}"));
    }

    /// Copies `src` into `dst`. Moving out of `sp` or `fp` also renames the
    /// slot that register points at after the destination.
    pub fn mov(&mut self, dst: RegisterRef, src: Operand) {
        let value = self.operand(src);
        let pointed_slot = src
            .register()
            .filter(|register| register.register.is_stack_register())
            .and_then(|_| slot_of(value));
        self.write_result(dst, value, format!("mov {src}"));
        if let Some(slot) = pointed_slot {
            self.labels
                .replace_slot(slot, Label::new(dst.to_string(), SINGLE_RENDER));
        }
    }

    /// Stores the low byte of `src` into one byte of a slot.
    pub fn strb(&mut self, src: RegisterRef, address: MemoryOperand) -> Result<(), MachineError> {
        let location = self.locate(address)?;
        let byte = (self.registers.read(src) & BYTE_MASK) as u8;
        self.stack.write_byte(location, byte)?;
        self.labels
            .add_slot(location.slot, format!("{src}[0:8]"), SINGLE_RENDER);
        self.modified_stack.insert(location.slot);
        Ok(())
    }

    /// Loads one byte. A `w` destination keeps the upper half of its
    /// backing register, an `x` destination is replaced by the byte.
    pub fn ldrb(&mut self, dst: RegisterRef, address: MemoryOperand) -> Result<(), MachineError> {
        let location = self.locate(address)?;
        let byte = self.stack.read_byte(location)?;
        self.registers.write(dst, u64::from(byte));
        self.labels.add_register(
            dst.register,
            format!("ldrb [{}, #{}]", address.base, address.offset),
            self.label_renders,
        );
        self.labels.add_slot(
            location.slot,
            format!("ldrb {dst}[{}]", location.byte),
            SINGLE_RENDER,
        );
        self.mark_register(dst);
        Ok(())
    }

    /// Stores `first` at the effective address and `second` one slot above
    /// it. With writeback the base register ends up holding the address.
    pub fn stp(
        &mut self,
        first: RegisterRef,
        second: RegisterRef,
        address: MemoryOperand,
    ) -> Result<(), MachineError> {
        let effective = self.effective_address(address);
        let low = self.stack.locate(effective)?;
        let high = self.stack.locate(effective.saturating_add(SLOT_STRIDE))?;
        let new_base =
            u64::try_from(effective).map_err(|_| MachineError::OutOfBounds(effective))?;

        let first_value = self.registers.read(first);
        let second_value = self.registers.read(second);
        self.stack.write(low.slot, first_value, SLOT_SIZE_BYTES)?;
        self.stack.write(high.slot, second_value, SLOT_SIZE_BYTES)?;
        self.labels
            .add_slot(low.slot, format!("stp {first}"), SINGLE_RENDER);
        self.labels
            .add_slot(high.slot, format!("stp {second}"), SINGLE_RENDER);
        self.modified_stack.insert(low.slot);
        self.modified_stack.insert(high.slot);

        if address.writeback {
            self.registers.write(address.base, new_base);
            self.mark_register(address.base);
        }
        Ok(())
    }

    /// A fully owned copy of the current state.
    pub fn snapshot(&self, instruction: &str) -> State {
        State {
            instruction: instruction.to_string(),
            stack: self.stack.slots().iter().copied().map(Word).collect(),
            registers: self
                .registers
                .iter()
                .map(|(register, value)| (register, Word(value)))
                .collect(),
            labels: self
                .labels
                .slot_entries()
                .map(|(slot, labels)| (slot, labels.to_vec()))
                .collect(),
            register_labels: self
                .labels
                .register_entries()
                .map(|(register, labels)| (register, labels.to_vec()))
                .collect(),
            modified_stack: self.modified_stack.iter().copied().collect(),
            modified_registers: self.modified_registers.iter().copied().collect(),
        }
    }

    fn operand(&self, operand: Operand) -> u64 {
        match operand {
            Operand::Register(register) => self.registers.read(register),
            Operand::Immediate(immediate) => immediate.bits(),
        }
    }

    fn write_result(&mut self, dst: RegisterRef, value: u64, label: String) {
        self.registers.write(dst, value);
        self.labels
            .add_register(dst.register, label, self.label_renders);
        self.mark_register(dst);
    }

    /// Records `register` and, for a `w` alias, its backing `x` register.
    fn mark_register(&mut self, register: RegisterRef) {
        self.modified_registers.insert(register);
        if register.is_alias() {
            self.modified_registers.insert(register.backing());
        }
    }

    fn effective_address(&self, address: MemoryOperand) -> i128 {
        i128::from(self.registers.read(address.base)).saturating_add(i128::from(address.offset))
    }

    fn locate(&self, address: MemoryOperand) -> Result<ByteLocation, MachineError> {
        self.stack.locate(self.effective_address(address))
    }
}

fn slot_of(address: u64) -> Option<usize> {
    address
        .checked_div(SLOT_SIZE_BYTES as u64)
        .and_then(|slot| usize::try_from(slot).ok())
}
