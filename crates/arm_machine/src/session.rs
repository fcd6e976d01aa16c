use core::fmt;

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use heapless::Vec as BoundedVec;

use crate::assembler::{Assembler, Statement};
use crate::labels::DEFAULT_LABEL_RENDERS;
use crate::machine::{Machine, Outcome};
use crate::registers::Register;
use crate::snapshot::State;
use crate::{MAX_STACK_SLOTS, MachineError, StepError};

/// Instruction text of the first snapshot in every trace.
pub const INIT_INSTRUCTION: &str = "init";

/// Slot count of the demo stack.
pub const DEFAULT_STACK_SLOTS: usize = 16;

/// Saved frame chain seed, `x29`.
pub const FRAME_CHAIN_SEED: u64 = 0x1111_1111_1111_1111;
/// Saved link register seed, `x30`.
pub const LINK_REGISTER_SEED: u64 = 0x2222_2222_2222_2222;

const SEED_CAP: usize = Register::VARIANT_COUNT;

/// Everything that decides how a fresh run starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub stack_slots: usize,
    pub seeds: BoundedVec<(Register, u64), SEED_CAP>,
    pub label_renders: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let mut seeds = BoundedVec::new();
        // Two entries always fit in a register sized buffer.
        let _ = seeds.push((Register::X29, FRAME_CHAIN_SEED));
        let _ = seeds.push((Register::X30, LINK_REGISTER_SEED));
        Self {
            stack_slots: DEFAULT_STACK_SLOTS,
            seeds,
            label_renders: DEFAULT_LABEL_RENDERS,
        }
    }
}

impl SessionConfig {
    /// No seeds, default stack and label lifetime.
    pub fn unseeded() -> Self {
        Self {
            seeds: BoundedVec::new(),
            ..Self::default()
        }
    }

    pub fn with_stack_slots(self, stack_slots: usize) -> Self {
        Self {
            stack_slots,
            ..self
        }
    }

    pub fn with_label_renders(self, label_renders: u32) -> Self {
        Self {
            label_renders,
            ..self
        }
    }

    /// Sets the starting value of `register`, replacing an earlier seed for it.
    pub fn with_seed(mut self, register: Register, value: u64) -> Result<Self, MachineError> {
        if let Some(seed) = self.seeds.iter_mut().find(|(seeded, _)| *seeded == register) {
            seed.1 = value;
            return Ok(self);
        }
        self.seeds
            .push((register, value))
            .map_err(|_| MachineError::TooManySeeds)?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), MachineError> {
        if self.stack_slots == 0 || self.stack_slots > MAX_STACK_SLOTS {
            return Err(MachineError::InvalidStackSize(self.stack_slots));
        }
        Ok(())
    }

    /// A freshly initialized machine for this configuration.
    pub fn machine(&self) -> Result<Machine, MachineError> {
        self.validate()?;
        let mut machine = Machine::with_seeds(self.stack_slots, &self.seeds)?;
        machine.set_label_renders(self.label_renders);
        Ok(machine)
    }
}

/// Non-fatal events of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    UnsupportedOpcode { line: u32, opcode: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnsupportedOpcode { line, opcode } => {
                write!(f, "line {line}: unsupported opcode `{opcode}`")
            }
        }
    }
}

/// The line that stopped a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineError {
    pub line: u32,
    pub text: String,
    pub error: StepError,
}

/// Snapshot sequence of one run over a listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trace {
    /// `"init"` first, then one per executed line.
    pub states: Vec<State>,
    pub diagnostics: Vec<Diagnostic>,
    /// Set when a line failed. `states` then ends with the last good line.
    pub failure: Option<LineError>,
}

impl Trace {
    fn new(initial: State) -> Self {
        let mut states = Vec::new();
        states.push(initial);
        Self {
            states,
            diagnostics: Vec::new(),
            failure: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    pub fn last(&self) -> Option<&State> {
        self.states.last()
    }
}

/// Owns the starting machine of a listing and the trace of its last run.
///
/// Every edit re-runs the whole listing on a copy of the starting machine,
/// so the same text always yields the same trace.
#[derive(Clone, Debug)]
pub struct Session {
    config: SessionConfig,
    machine: Machine,
    source: String,
    trace: Trace,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self, MachineError> {
        let machine = config.machine()?;
        let trace = Trace::new(machine.snapshot(INIT_INSTRUCTION));
        Ok(Self {
            config,
            machine,
            source: String::new(),
            trace,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The machine every run starts from.
    pub fn persistent(&self) -> &Machine {
        &self.machine
    }

    /// Seeds `register` in the starting machine and re-runs the current
    /// listing. The seed is kept in the config so later reconfiguration
    /// built from [`Session::config`] carries it along.
    pub fn set_register(
        &mut self,
        register: Register,
        value: u64,
    ) -> Result<&Trace, MachineError> {
        let config = self.config.clone().with_seed(register, value)?;
        self.reconfigure(config)
    }

    /// Replaces the starting machine with a fresh one from `config` and
    /// re-runs the current listing on it. On error nothing changes.
    pub fn reconfigure(&mut self, config: SessionConfig) -> Result<&Trace, MachineError> {
        self.machine = config.machine()?;
        self.config = config;
        self.trace = self.run(&self.source);
        Ok(&self.trace)
    }

    /// The listing of the last [`Session::update`].
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Re-runs `source` from the starting machine and keeps the result.
    pub fn update(&mut self, source: &str) -> &Trace {
        self.source = source.to_string();
        self.trace = self.run(source);
        &self.trace
    }

    /// Runs `source` without touching the stored trace.
    pub fn run(&self, source: &str) -> Trace {
        let mut machine = self.machine.clone();
        let mut trace = Trace::new(machine.snapshot(INIT_INSTRUCTION));
        let mut assembler = Assembler::new();

        for line in source.lines() {
            let text = line.trim();
            let statement = match assembler.add_line(text) {
                Ok(statement) => statement,
                Err(err) => {
                    trace.failure = Some(LineError {
                        line: assembler.line_number(),
                        text: text.to_string(),
                        error: err.into(),
                    });
                    break;
                }
            };
            if statement == Statement::Empty {
                continue;
            }

            let step = match machine.apply(&statement, text) {
                Ok(step) => step,
                Err(err) => {
                    trace.failure = Some(LineError {
                        line: assembler.line_number(),
                        text: text.to_string(),
                        error: err.into(),
                    });
                    break;
                }
            };
            if let Outcome::Unsupported(opcode) = step.outcome {
                trace.diagnostics.push(Diagnostic::UnsupportedOpcode {
                    line: assembler.line_number(),
                    opcode,
                });
            }
            trace.states.push(step.state);
            machine.decay_labels();
        }

        trace
    }
}
