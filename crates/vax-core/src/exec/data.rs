//! Data movement, clears, complements, tests, compares, and integer
//! width conversions.

use super::{set_nz, Control};
use crate::fault::Fault;
use crate::operand::Operand;
use crate::state::{Cpu, Flag};
use crate::trap::TrapService;
use crate::value::IntValue;

/// MOV of any width or format: N/Z from the value, V cleared, C kept.
pub(crate) fn mov(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let val = ops[0].value(cpu)?;
    ops[1].set_value(cpu, &val)?;
    set_nz(cpu, &val);
    cpu.set_flag(Flag::V, false);
    Ok(Control::Continue)
}

/// MOVZ: widen without sign extension; N and C clear.
pub(crate) fn movz(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let src = ops[0].int_value(cpu)?;
    let widened = IntValue::from_i64(i64::from(src.uint()), ops[1].data_type());
    ops[1].set_int(cpu, &widened)?;
    cpu.set_flag(Flag::N, false);
    cpu.set_flag(Flag::Z, widened.is_zero());
    cpu.set_flag(Flag::V, false);
    cpu.set_flag(Flag::C, false);
    Ok(Control::Continue)
}

pub(crate) fn pushl(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let val = ops[0].int_value(cpu)?;
    cpu.push(val.uint())?;
    set_nz(cpu, &val.into());
    cpu.set_flag(Flag::V, false);
    Ok(Control::Continue)
}

/// MOVA: the operand's effective address becomes a longword value.
pub(crate) fn mova(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let addr = IntValue::longword(ops[0].address()? as i32);
    ops[1].set_int(cpu, &addr)?;
    set_nz(cpu, &addr.into());
    cpu.set_flag(Flag::V, false);
    Ok(Control::Continue)
}

pub(crate) fn pusha(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let addr = IntValue::longword(ops[0].address()? as i32);
    cpu.push(addr.uint())?;
    set_nz(cpu, &addr.into());
    cpu.set_flag(Flag::V, false);
    Ok(Control::Continue)
}

/// MCOM: bytewise complement; V and C clear.
pub(crate) fn mcom(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let com = ops[0].int_value(cpu)?.bit_invert();
    ops[1].set_int(cpu, &com)?;
    set_nz(cpu, &com.into());
    cpu.set_flag(Flag::V, false);
    cpu.set_flag(Flag::C, false);
    Ok(Control::Continue)
}

/// MNEG: two's-complement negate through the subtractor, so V reports
/// the most-negative value and C the nonzero source.
pub(crate) fn mneg(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let src = ops[0].int_value(cpu)?;
    let zero = IntValue::from_i32(0, src.data_type());
    let neg = crate::arith::sub(cpu, &zero, &src);
    ops[1].set_int(cpu, &neg)?;
    Ok(Control::Continue)
}

/// Floating MNEG: flips the sign bit, keeps true zero clean, faults on
/// the negative-zero pattern.
pub(crate) fn fmneg(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let neg = ops[0].float_value(cpu)?.negated()?;
    ops[1].set_float(cpu, &neg)?;
    cpu.set_flag(Flag::N, neg.is_negative());
    cpu.set_flag(Flag::Z, neg.is_zero());
    cpu.set_flag(Flag::V, false);
    cpu.set_flag(Flag::C, false);
    Ok(Control::Continue)
}

pub(crate) fn clr(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let zero = IntValue::from_i32(0, ops[0].data_type());
    ops[0].set_int(cpu, &zero)?;
    cpu.set_flag(Flag::N, false);
    cpu.set_flag(Flag::Z, true);
    cpu.set_flag(Flag::V, false);
    Ok(Control::Continue)
}

/// TST of any width or format: compare against zero, V and C clear.
pub(crate) fn tst(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let val = ops[0].value(cpu)?;
    set_nz(cpu, &val);
    cpu.set_flag(Flag::V, false);
    cpu.set_flag(Flag::C, false);
    Ok(Control::Continue)
}

/// CMP: N/Z from the signed comparison, C from the unsigned one.
pub(crate) fn cmp(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let lhs = ops[0].int_value(cpu)?;
    let rhs = ops[1].int_value(cpu)?;
    cpu.set_flag(Flag::N, lhs.sint() < rhs.sint());
    cpu.set_flag(Flag::Z, lhs.sint() == rhs.sint());
    cpu.set_flag(Flag::V, false);
    cpu.set_flag(Flag::C, lhs.uint() < rhs.uint());
    Ok(Control::Continue)
}

/// Integer CVT: re-type the signed value; V reports a sign flip from
/// narrowing, C clears.
pub(crate) fn cvt(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let src = ops[0].int_value(cpu)?;
    let converted = IntValue::from_i32(src.sint(), ops[1].data_type());
    ops[1].set_int(cpu, &converted)?;
    set_nz(cpu, &converted.into());
    cpu.set_flag(Flag::V, src.is_negative() != converted.is_negative());
    cpu.set_flag(Flag::C, false);
    Ok(Control::Continue)
}
