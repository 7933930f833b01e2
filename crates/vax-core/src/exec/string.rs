//! Character-string strategies. Each leaves its residue in the low
//! registers the way the hardware documents.

use super::Control;
use crate::arith;
use crate::fault::Fault;
use crate::operand::Operand;
use crate::state::{Cpu, Flag};
use crate::trap::TrapService;
use crate::value::{DataType, IntValue};

/// MOVC3/MOVC5: copy with optional fill. Flags compare the two lengths;
/// R0 holds the unmoved source count, R1/R3 the advanced addresses.
pub(crate) fn movc(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let src_len = ops[0].int_value(cpu)?;
    let mut src_addr = ops[1].address()?;
    let (fill, dest_len, mut dest_addr) = if ops.len() == 5 {
        (
            ops[2].int_value(cpu)?.uint() as u8,
            ops[3].int_value(cpu)?,
            ops[4].address()?,
        )
    } else {
        (0, src_len, ops[2].address()?)
    };

    let mut slen = src_len.uint();
    let mut dlen = dest_len.uint();
    while slen > 0 && dlen > 0 {
        let byte = cpu.memory.load_byte(src_addr)?;
        cpu.memory.store_byte(dest_addr, byte)?;
        src_addr = src_addr.wrapping_add(1);
        dest_addr = dest_addr.wrapping_add(1);
        slen -= 1;
        dlen -= 1;
    }
    while dlen > 0 {
        cpu.memory.store_byte(dest_addr, fill)?;
        dest_addr = dest_addr.wrapping_add(1);
        dlen -= 1;
    }

    cpu.set_reg(0, slen);
    cpu.set_reg(1, src_addr);
    cpu.set_reg(2, 0);
    cpu.set_reg(3, dest_addr);
    cpu.set_reg(4, 0);
    cpu.set_reg(5, 0);
    arith::sub(cpu, &src_len, &dest_len);
    cpu.set_flag(Flag::V, false);
    Ok(Control::Continue)
}

/// CMPC3/CMPC5: compare with optional fill on the shorter side. Flags
/// come from the last byte subtraction performed.
pub(crate) fn cmpc(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let mut s1len = ops[0].int_value(cpu)?.uint();
    let mut s1addr = ops[1].address()?;
    let (fill, mut s2len, mut s2addr) = if ops.len() == 5 {
        (
            ops[2].int_value(cpu)?,
            ops[3].int_value(cpu)?.uint(),
            ops[4].address()?,
        )
    } else {
        (IntValue::from_i32(0, DataType::B), s1len, ops[2].address()?)
    };

    'compare: {
        while s1len > 0 && s2len > 0 {
            let b1 = cpu.memory.load_int(s1addr, DataType::B)?;
            let b2 = cpu.memory.load_int(s2addr, DataType::B)?;
            arith::sub(cpu, &b1, &b2);
            if !cpu.flag(Flag::Z) {
                break 'compare;
            }
            s1len -= 1;
            s2len -= 1;
            s1addr = s1addr.wrapping_add(1);
            s2addr = s2addr.wrapping_add(1);
        }
        while s1len > 0 {
            let b1 = cpu.memory.load_int(s1addr, DataType::B)?;
            arith::sub(cpu, &b1, &fill);
            if !cpu.flag(Flag::Z) {
                break 'compare;
            }
            s1len -= 1;
            s1addr = s1addr.wrapping_add(1);
        }
        while s2len > 0 {
            let b2 = cpu.memory.load_int(s2addr, DataType::B)?;
            arith::sub(cpu, &fill, &b2);
            if !cpu.flag(Flag::Z) {
                break 'compare;
            }
            s2len -= 1;
            s2addr = s2addr.wrapping_add(1);
        }
    }

    cpu.set_reg(0, s1len);
    cpu.set_reg(1, s1addr);
    cpu.set_reg(2, s2len);
    cpu.set_reg(3, s2addr);
    cpu.set_flag(Flag::V, false);
    Ok(Control::Continue)
}

fn scan_char(ops: &[Operand], cpu: &mut Cpu, stop_on_match: bool) -> Result<Control, Fault> {
    let target = ops[0].int_value(cpu)?.uint();
    let mut len = ops[1].int_value(cpu)?.uint();
    let mut addr = ops[2].address()?;

    while len > 0 {
        let byte = u32::from(cpu.memory.load_byte(addr)?);
        if (byte == target) == stop_on_match {
            break;
        }
        len -= 1;
        addr = addr.wrapping_add(1);
    }

    cpu.set_reg(0, len);
    cpu.set_reg(1, addr);
    cpu.set_flag(Flag::N, false);
    cpu.set_flag(Flag::Z, len == 0);
    cpu.set_flag(Flag::V, false);
    cpu.set_flag(Flag::C, false);
    Ok(Control::Continue)
}

/// LOCC: find the target byte; Z set when the string ran out first.
pub(crate) fn locc(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    scan_char(ops, cpu, true)
}

/// SKPC: find the first byte that is not the target.
pub(crate) fn skpc(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    scan_char(ops, cpu, false)
}
