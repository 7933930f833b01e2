//! User-mode interpreter core for the VAX-11 subset that v7-era Unix
//! binaries exercise.
//!
//! The crate loads a shared-text `a.out` image into a flat 4 MiB guest
//! address space, then fetches, decodes, and executes instructions one
//! at a time. System calls leave the core through the [`TrapService`]
//! trait; the core itself never touches the host OS.

/// Typed values in the integer widths and floating formats.
pub mod value;
pub use value::{DataType, FloatValue, IntValue, Value, MAX_VALUE_BYTES};

/// Runtime fault taxonomy.
pub mod fault;
pub use fault::{Fault, ReservedOperandKind};

/// Flat guest memory with the high-address alias window.
pub mod memory;
pub use memory::{Memory, HIGH_ALIAS_BASE, MEM_SIZE};

/// v7-style `a.out` executable images.
pub mod image;
pub use image::{AoutImage, LoadError, AOUT_HEADER_SIZE, AOUT_MAGIC, SEG_UNIT_SIZE};

/// Registers, processor status, and the attached memory.
pub mod state;
pub use state::{Cpu, Flag, AP, FP, NBPW, PC, SP};

/// Operand specifier resolution.
pub mod operand;
pub use operand::Operand;

/// Shared flag-setting integer arithmetic.
pub(crate) mod arith;

/// Execution strategies.
pub(crate) mod exec;

/// The instruction catalog.
pub mod opcode;
pub use opcode::{lookup, Op};

/// The change-mode trap boundary and system-call table.
pub mod trap;
pub use trap::{
    dispatch_trap, errno, syscall_entry, SyscallEntry, SyscallOutcome, TrapService, SYSENT,
};

/// The fetch/decode/execute loop.
pub mod interp;
pub use interp::{run, run_traced, step, step_traced, StepOutcome, TraceSink};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
