//! Variable bit-field extract/insert and single-bit test branches.
//!
//! Register-resident fields live in the named register and its
//! successor viewed as one 64-bit unit; memory fields address the
//! surrounding longword pair. Field positions beyond 31 are legal only
//! for memory bases.

use super::Control;
use crate::fault::{Fault, ReservedOperandKind};
use crate::operand::Operand;
use crate::state::{Cpu, Flag};
use crate::trap::TrapService;
use crate::value::{DataType, IntValue};

fn field_pair(cpu: &Cpu, base: &Operand, pos: &mut u32) -> Result<(u64, Option<u32>), Fault> {
    if let Some(reg) = base.register() {
        if *pos > 31 {
            return Err(Fault::ReservedOperand(ReservedOperandKind::FieldPosition));
        }
        Ok((cpu.reg_value(reg, DataType::Q).slong() as u64, None))
    } else {
        let addr = base.address()?.wrapping_add(*pos >> 5);
        *pos &= 31;
        let lo = u64::from(cpu.memory.load_int(addr, DataType::L)?.uint());
        let hi = u64::from(cpu.memory.load_int(addr.wrapping_add(4), DataType::L)?.uint());
        Ok((hi << 32 | lo, Some(addr)))
    }
}

fn ext(ops: &[Operand], cpu: &mut Cpu, sign_extend: bool) -> Result<Control, Fault> {
    let mut pos = ops[0].int_value(cpu)?.uint();
    let size = ops[1].int_value(cpu)?.uint();
    if size > 32 {
        return Err(Fault::ReservedOperand(ReservedOperandKind::FieldSize));
    }

    let extracted = if size == 0 {
        IntValue::longword(0)
    } else {
        let (src, _) = field_pair(cpu, &ops[2], &mut pos)?;
        let lspace = 64 - (pos + size);
        let bits = if sign_extend {
            ((src << lspace) as i64 >> (lspace + pos)) as u64
        } else {
            (src << lspace) >> (lspace + pos)
        };
        IntValue::longword(bits as i32)
    };

    ops[3].set_int(cpu, &extracted)?;
    cpu.set_flag(Flag::N, extracted.is_negative());
    cpu.set_flag(Flag::Z, extracted.is_zero());
    cpu.set_flag(Flag::V, false);
    Ok(Control::Continue)
}

pub(crate) fn extv(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    ext(ops, cpu, true)
}

pub(crate) fn extzv(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    ext(ops, cpu, false)
}

/// INSV replaces the field bits and leaves every flag alone.
pub(crate) fn insv(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let size = ops[2].int_value(cpu)?.uint();
    if size > 32 {
        return Err(Fault::ReservedOperand(ReservedOperandKind::FieldSize));
    }
    if size == 0 {
        return Ok(Control::Continue);
    }

    let mut pos = ops[1].int_value(cpu)?.uint();
    let src = u64::from(ops[0].int_value(cpu)?.uint()) << (pos & 63);
    let (org, mem_addr) = field_pair(cpu, &ops[3], &mut pos)?;
    let mask = !(u64::MAX << size) << pos;
    let inserted = (org & !mask) | (src & mask);

    if let Some(addr) = mem_addr {
        cpu.memory.write(addr, &inserted.to_le_bytes())?;
    } else if let Some(reg) = ops[3].register() {
        cpu.set_reg_value(reg, &IntValue::from_i64(inserted as i64, DataType::Q));
    }
    Ok(Control::Continue)
}

fn bb(
    ops: &[Operand],
    cpu: &mut Cpu,
    branch_on_set: bool,
    set_bit: bool,
    clear_bit: bool,
) -> Result<Control, Fault> {
    let pos = ops[0].int_value(cpu)?.uint();
    let base = &ops[1];

    let is_set = if let Some(reg) = base.register() {
        if pos > 31 {
            return Err(Fault::ReservedOperand(ReservedOperandKind::FieldPosition));
        }
        let bit = 1u32 << (pos & 0x1f);
        let val = cpu.reg(reg);
        if set_bit {
            cpu.set_reg(reg, val | bit);
        } else if clear_bit {
            cpu.set_reg(reg, val & !bit);
        }
        val & bit != 0
    } else {
        // Negative positions step the base address backwards.
        let addr = base.address()?.wrapping_add(((pos as i32) >> 3) as u32);
        let byte = cpu.memory.load_byte(addr)?;
        let bit = 1u8 << (pos & 7);
        if set_bit {
            cpu.memory.store_byte(addr, byte | bit)?;
        } else if clear_bit {
            cpu.memory.store_byte(addr, byte & !bit)?;
        }
        byte & bit != 0
    };

    if is_set == branch_on_set {
        cpu.set_pc(ops[2].address()?);
    }
    Ok(Control::Continue)
}

macro_rules! bit_branch {
    ($($name:ident => ($on_set:literal, $set:literal, $clear:literal);)*) => {
        $(pub(crate) fn $name(
            ops: &[Operand],
            cpu: &mut Cpu,
            _service: &mut dyn TrapService,
        ) -> Result<Control, Fault> {
            bb(ops, cpu, $on_set, $set, $clear)
        })*
    };
}

bit_branch! {
    bbs => (true, false, false);
    bbc => (false, false, false);
    bbss => (true, true, false);
    bbcs => (false, true, false);
    bbsc => (true, false, true);
    bbcc => (false, false, true);
}

fn blb(ops: &[Operand], cpu: &mut Cpu, branch_on_set: bool) -> Result<Control, Fault> {
    let is_set = ops[0].int_value(cpu)?.uint() & 1 == 1;
    if is_set == branch_on_set {
        cpu.set_pc(ops[1].address()?);
    }
    Ok(Control::Continue)
}

pub(crate) fn blbs(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    blb(ops, cpu, true)
}

pub(crate) fn blbc(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    blb(ops, cpu, false)
}
