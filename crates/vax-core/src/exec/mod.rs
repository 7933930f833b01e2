//! Execution strategies, one module per instruction family.
//!
//! Every strategy shares one signature: it receives the resolved
//! operands, the processor, and the trap service, and reports whether
//! execution continues. Operand side effects (auto-increment and the
//! like) already happened during resolution, so strategies only read,
//! compute, write, and set flags.

pub(crate) mod alu;
pub(crate) mod branch;
pub(crate) mod call;
pub(crate) mod data;
pub(crate) mod decimal;
pub(crate) mod field;
pub(crate) mod string;

use crate::fault::Fault;
use crate::operand::Operand;
use crate::state::{Cpu, Flag};
use crate::trap::TrapService;
use crate::value::Value;

/// What the instruction decided about the step loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    /// Fall through to the next instruction.
    Continue,
    /// The guest terminated with this exit status.
    Exit(i32),
}

/// Strategy function signature shared by the whole catalog.
pub(crate) type ExecFn =
    fn(&[Operand], &mut Cpu, &mut dyn TrapService) -> Result<Control, Fault>;

/// Sets N and Z from a value, using the subtype's sign and zero rules.
pub(crate) fn set_nz(cpu: &mut Cpu, value: &Value) {
    cpu.set_flag(Flag::N, value.is_negative());
    cpu.set_flag(Flag::Z, value.is_zero());
}

/// Splits a two- or three-operand arithmetic form into
/// `(first, second, dest)`; the two-operand form reuses its second
/// operand as the destination.
pub(crate) fn binary(ops: &[Operand]) -> (&Operand, &Operand, &Operand) {
    let dest = &ops[ops.len() - 1];
    let second = if ops.len() == 3 { &ops[1] } else { dest };
    (&ops[0], second, dest)
}

pub(crate) fn nop(
    _ops: &[Operand],
    _cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    Ok(Control::Continue)
}
