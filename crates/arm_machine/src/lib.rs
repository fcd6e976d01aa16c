#![no_std]

#![cfg_attr(
    not(test),
    deny(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::todo,
        clippy::unimplemented,
        clippy::indexing_slicing,
        clippy::string_slice,
        clippy::arithmetic_side_effects,
        clippy::panicking_unwrap,
        clippy::out_of_bounds_indexing,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
    )
)]
#![cfg_attr(not(test), warn(clippy::missing_panics_doc))]

//! Interpreter core for the stack visualizer.
//!
//! A [`Machine`] holds a small AArch64 style register file, a downward
//! growing stack made of 8 byte slots and a set of provenance labels.
//! Every supported instruction is applied as one atomic transition and
//! after each one the caller can take a [`State`] snapshot, a fully owned
//! copy of everything a shell needs to draw that step.
//!
//! The [`assembler`] turns source lines into [`isa::Instruction`]s and the
//! [`session`] re-runs a whole listing from a fresh machine every time the
//! listing changes, so the snapshot sequence is a pure function of the
//! source text and the seed registers.

extern crate alloc;

use thiserror_no_std::Error;

pub mod assembler;
pub mod isa;
pub mod labels;
pub mod machine;
pub mod memory;
pub mod registers;
pub mod session;
pub mod snapshot;

pub use assembler::{AssemblerError, AssemblerErrorKind};
pub use isa::{Immediate, Instruction, MemoryOperand, Operand, Radix};
pub use labels::{Label, LabelStore};
pub use machine::{Machine, Outcome, Step};
pub use memory::{ByteLocation, MemoryStack, SLOT_SIZE_BYTES};
pub use registers::{Register, RegisterFile, RegisterRef, UnknownRegister, Width};
pub use session::{Diagnostic, LineError, Session, SessionConfig, Trace};
pub use snapshot::{State, Word};

/// Largest stack the machine will allocate. Keeps every byte address
/// comfortably inside `u64` and `i128` arithmetic.
pub const MAX_STACK_SLOTS: usize = 4096;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MachineError {
    #[error("memory address {0} is out of stack bounds")]
    OutOfBounds(i128),
    #[error("access size {0} does not fit a stack slot")]
    SizeExceeded(usize),
    #[error("stack size {0} is not supported")]
    InvalidStackSize(usize),
    #[error("too many seed registers")]
    TooManySeeds,
}

/// Anything that stops a single line from producing a snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("{0}")]
    Decode(#[from] AssemblerError),
    #[error("{0}")]
    Machine(#[from] MachineError),
}
