//! Packed-decimal strategies: convert-to-packed, packed move, and the
//! edit-pattern interpreter.
//!
//! Packed strings hold one 4-bit digit per nibble, most significant
//! first, with the sign nibble in the low half of the final byte.
//! Every piece of edit scratch state lives on the stack of the single
//! invocation; nothing is shared between calls or processors.

use std::collections::VecDeque;

use super::Control;
use crate::fault::{Fault, ReservedOperandKind};
use crate::operand::Operand;
use crate::state::{Cpu, Flag};
use crate::trap::TrapService;

/// Reads the sign nibble of the packed string at `addr` with `len`
/// digits. Faults on nibble codes outside the defined sign set.
fn packed_sign_negative(cpu: &Cpu, addr: u32, len: u32) -> Result<bool, Fault> {
    let sign = cpu.memory.load_byte(addr.wrapping_add(len / 2))? & 0xf;
    match sign {
        0xa | 0xc | 0xe | 0xf => Ok(false),
        0xb | 0xd => Ok(true),
        _ => Err(Fault::ReservedOperand(ReservedOperandKind::PackedSign)),
    }
}

/// `true` when every digit nibble of the packed string is zero.
fn packed_is_zero(cpu: &Cpu, addr: u32, len: u32) -> Result<bool, Fault> {
    for i in 0..len / 2 {
        if cpu.memory.load_byte(addr.wrapping_add(i))? != 0 {
            return Ok(false);
        }
    }
    let last = cpu.memory.load_byte(addr.wrapping_add(len / 2))?;
    Ok(last & 0xf0 == 0)
}

/// CVTLP: longword to packed, producing `len` digits plus the sign
/// nibble. Leaves the canonical zeroed residue with R3 addressing the
/// destination.
pub(crate) fn cvtlp(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let src_val = ops[0].int_value(cpu)?;
    let mut len = ops[1].int_value(cpu)?.uint();
    let dest_addr = ops[2].address()?;

    let mut src = i64::from(src_val.sint());
    let mut tail: u8 = if src >= 0 { 12 } else { 13 };
    src = src.abs();
    if len != 0 {
        tail += ((src % 10) as u8) << 4;
        src /= 10;
        len -= 1;
    }

    let mut bytes = VecDeque::new();
    bytes.push_front(tail);
    while len > 0 {
        len -= 1;
        let mut val = (src % 10) as u8;
        src /= 10;
        if len > 0 {
            len -= 1;
            val |= ((src % 10) as u8) << 4;
            src /= 10;
        }
        bytes.push_front(val);
    }

    let mut addr = dest_addr;
    for byte in bytes {
        cpu.memory.store_byte(addr, byte)?;
        addr = addr.wrapping_add(1);
    }

    cpu.set_reg(0, 0);
    cpu.set_reg(1, 0);
    cpu.set_reg(2, 0);
    cpu.set_reg(3, dest_addr);
    cpu.set_flag(Flag::N, src_val.is_negative());
    cpu.set_flag(Flag::Z, src_val.is_zero());
    cpu.set_flag(Flag::C, false);
    Ok(Control::Continue)
}

/// MOVP: copy a packed string and set N/Z from the copied digits and
/// sign nibble.
pub(crate) fn movp(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let len = ops[0].int_value(cpu)?.uint();
    let src_addr = ops[1].address()?;
    let dest_addr = ops[2].address()?;

    for i in 0..len / 2 + 1 {
        let byte = cpu.memory.load_byte(src_addr.wrapping_add(i))?;
        cpu.memory.store_byte(dest_addr.wrapping_add(i), byte)?;
    }

    cpu.set_reg(0, 0);
    cpu.set_reg(1, src_addr);
    cpu.set_reg(2, 0);
    cpu.set_reg(3, dest_addr);
    let negative = packed_sign_negative(cpu, dest_addr, len)?;
    let zero = packed_is_zero(cpu, dest_addr, len)?;
    cpu.set_flag(Flag::N, negative);
    cpu.set_flag(Flag::Z, zero);
    cpu.set_flag(Flag::V, false);
    Ok(Control::Continue)
}

/// Per-invocation edit state. The significance indicator itself lives
/// in the carry flag, as guest code observes it there.
struct EditState {
    digits: VecDeque<u8>,
    out: Vec<u8>,
    sign: u8,
    fill: u8,
}

impl EditState {
    fn load(cpu: &Cpu, mut addr: u32, len: u32, negative: bool) -> Result<Self, Fault> {
        let mut digits = VecDeque::new();
        let mut len = len as i32;
        if len % 2 == 0 {
            digits.push_back(cpu.memory.load_byte(addr)? & 0xf);
            addr = addr.wrapping_add(1);
            len -= 1;
        }
        while len > 0 {
            let pair = cpu.memory.load_byte(addr)?;
            addr = addr.wrapping_add(1);
            digits.push_back(pair >> 4);
            len -= 1;
            if len > 0 {
                digits.push_back(pair & 0xf);
                len -= 1;
            }
        }
        Ok(Self {
            digits,
            out: Vec::new(),
            sign: if negative { b'-' } else { b' ' },
            fill: b' ',
        })
    }

    fn emit_digits(
        &mut self,
        cpu: &mut Cpu,
        count: u8,
        floating_sign: bool,
    ) -> Result<(), Fault> {
        if usize::from(count) > self.digits.len() {
            return Err(Fault::ReservedOperand(ReservedOperandKind::EditPattern));
        }
        for _ in 0..count {
            let digit = self
                .digits
                .pop_front()
                .ok_or(Fault::ReservedOperand(ReservedOperandKind::EditPattern))?;
            if digit != 0 {
                if floating_sign && !cpu.flag(Flag::C) {
                    self.out.push(self.sign);
                }
                cpu.set_flag(Flag::C, true);
                cpu.set_flag(Flag::Z, false);
            }
            if cpu.flag(Flag::C) {
                self.out.push(b'0' + digit);
            } else {
                self.out.push(self.fill);
            }
        }
        Ok(())
    }

    /// Runs the pattern stream; returns the address of the terminating
    /// pattern byte.
    fn run(&mut self, cpu: &mut Cpu, mut addr: u32) -> Result<u32, Fault> {
        loop {
            let code = cpu.memory.load_byte(addr)?;
            match code {
                0x00 => {
                    if !self.digits.is_empty() {
                        return Err(Fault::ReservedOperand(ReservedOperandKind::EditPattern));
                    }
                    if cpu.flag(Flag::N) {
                        cpu.set_flag(Flag::Z, false);
                    }
                    return Ok(addr);
                }
                0x01 => {
                    if !cpu.flag(Flag::C) {
                        self.out.push(self.sign);
                        cpu.set_flag(Flag::C, true);
                    }
                }
                0x91..=0x9f => self.emit_digits(cpu, code & 0xf, false)?,
                0xa1..=0xaf => self.emit_digits(cpu, code & 0xf, true)?,
                _ => return Err(Fault::ReservedOperand(ReservedOperandKind::EditPattern)),
            }
            addr = addr.wrapping_add(1);
        }
    }
}

/// EDITPC: run the edit pattern over the packed source. The carry flag
/// carries the significance indicator during the pattern; the residue
/// registers land as the hardware leaves them.
pub(crate) fn editpc(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let src_len = ops[0].int_value(cpu)?.uint();
    let src_addr = ops[1].address()?;
    let ptn_addr = ops[2].address()?;
    let dest_addr = ops[3].address()?;

    if src_len > 31 {
        return Err(Fault::ReservedOperand(ReservedOperandKind::PackedLength));
    }

    let negative = packed_sign_negative(cpu, src_addr, src_len)?;
    cpu.set_flag(Flag::N, negative);
    cpu.set_flag(Flag::V, false);
    cpu.set_flag(Flag::C, false);

    let mut edit = EditState::load(cpu, src_addr, src_len, negative)?;
    let end_addr = edit.run(cpu, ptn_addr)?;

    cpu.memory.write(dest_addr, &edit.out)?;

    let out_len = u32::try_from(edit.out.len()).unwrap_or(0);
    cpu.set_reg(0, src_len);
    cpu.set_reg(1, src_addr);
    cpu.set_reg(2, 0);
    cpu.set_reg(3, end_addr);
    cpu.set_reg(4, 0);
    cpu.set_reg(5, dest_addr.wrapping_add(out_len));
    Ok(Control::Continue)
}
