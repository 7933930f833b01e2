//! Integer arithmetic, logical, and shift strategies.

use super::{binary, set_nz, Control};
use crate::arith;
use crate::fault::Fault;
use crate::operand::Operand;
use crate::state::{Cpu, Flag};
use crate::trap::TrapService;
use crate::value::IntValue;

pub(crate) fn add(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let (first, second, dest) = binary(ops);
    let augend = second.int_value(cpu)?;
    let addend = first.int_value(cpu)?;
    let sum = arith::add(cpu, &augend, &addend);
    dest.set_int(cpu, &sum)?;
    Ok(Control::Continue)
}

/// SUB: `second - first` (minuend is the second operand).
pub(crate) fn sub(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let (first, second, dest) = binary(ops);
    let minuend = second.int_value(cpu)?;
    let subtrahend = first.int_value(cpu)?;
    let diff = arith::sub(cpu, &minuend, &subtrahend);
    dest.set_int(cpu, &diff)?;
    Ok(Control::Continue)
}

pub(crate) fn mul(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let (first, second, dest) = binary(ops);
    let multiplier = first.int_value(cpu)?;
    let multiplicand = second.int_value(cpu)?;
    let product = arith::mul(cpu, &multiplier, &multiplicand);
    dest.set_int(cpu, &product)?;
    Ok(Control::Continue)
}

/// DIV: `second / first`. On a failed division the three-operand form
/// stores the unmodified dividend, then N/Z are re-read from the
/// destination and C clears while V stays set.
pub(crate) fn div(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let (divisor_op, dividend_op, dest) = binary(ops);
    let divisor = divisor_op.int_value(cpu)?;
    let dividend = dividend_op.int_value(cpu)?;
    match arith::div(cpu, &dividend, &divisor) {
        Some(quotient) => dest.set_int(cpu, &quotient)?,
        None => {
            if ops.len() == 3 {
                dest.set_int(cpu, &dividend)?;
            }
            let left = dest.int_value(cpu)?;
            set_nz(cpu, &left.into());
            cpu.set_flag(Flag::C, false);
        }
    }
    Ok(Control::Continue)
}

fn logical(
    ops: &[Operand],
    cpu: &mut Cpu,
    f: fn(u32, u32) -> u32,
    writes: bool,
) -> Result<Control, Fault> {
    let (first, second, dest) = binary(ops);
    let mask = first.int_value(cpu)?;
    let src = second.int_value(cpu)?;
    let result = IntValue::from_i32(f(src.uint(), mask.uint()) as i32, src.data_type());
    if writes {
        dest.set_int(cpu, &result)?;
    }
    set_nz(cpu, &result.into());
    cpu.set_flag(Flag::V, false);
    Ok(Control::Continue)
}

/// BIT: AND without a destination.
pub(crate) fn bit(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    logical(ops, cpu, |src, mask| src & mask, false)
}

pub(crate) fn bis(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    logical(ops, cpu, |src, mask| src | mask, true)
}

pub(crate) fn bic(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    logical(ops, cpu, |src, mask| src & !mask, true)
}

pub(crate) fn xor(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    logical(ops, cpu, |src, mask| src ^ mask, true)
}

pub(crate) fn inc(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let arg = ops[0].int_value(cpu)?;
    let one = IntValue::from_i32(1, arg.data_type());
    let sum = arith::add(cpu, &arg, &one);
    ops[0].set_int(cpu, &sum)?;
    Ok(Control::Continue)
}

pub(crate) fn dec(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let arg = ops[0].int_value(cpu)?;
    let one = IntValue::from_i32(1, arg.data_type());
    let diff = arith::sub(cpu, &arg, &one);
    ops[0].set_int(cpu, &diff)?;
    Ok(Control::Continue)
}

/// ASH: positive counts shift left (all-zero past the width), negative
/// counts shift right arithmetically with the distance clamped just
/// short of the width. V reports a sign change, C clears.
pub(crate) fn ash(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let count = ops[0].int_value(cpu)?.sint();
    let src = ops[1].int_value(cpu)?;
    let max = i32::try_from(src.size() * 8 - 1).unwrap_or(63);

    let wide = src.slong();
    let shifted = if count >= 0 {
        if count > max {
            0
        } else {
            wide << count
        }
    } else {
        wide >> (-count).min(max)
    };
    let result = IntValue::from_i64(shifted, src.data_type());
    ops[2].set_int(cpu, &result)?;
    cpu.set_flag(Flag::N, result.is_negative());
    cpu.set_flag(Flag::Z, result.is_zero());
    cpu.set_flag(Flag::V, src.is_negative() != result.is_negative());
    cpu.set_flag(Flag::C, false);
    Ok(Control::Continue)
}
