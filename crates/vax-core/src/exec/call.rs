//! Procedure call/return and the change-mode trap instruction.

use super::Control;
use crate::fault::Fault;
use crate::operand::Operand;
use crate::state::{Cpu, Flag, AP, FP, SP};
use crate::trap::{dispatch_trap, TrapService};
use crate::value::DataType;

/// Builds a call frame. The stack-based variant pushes the argument
/// count first and points AP at it; the general variant points AP at
/// the caller-supplied argument list. The saved status longword packs
/// the pre-call SP low bits, the variant flag, the entry mask, and the
/// processor status with T cleared.
fn call(ops: &[Operand], cpu: &mut Cpu, stack_args: bool) -> Result<Control, Fault> {
    if stack_args {
        let nargs = ops[0].int_value(cpu)?;
        cpu.push(nargs.uint())?;
    }
    let pre_sp = cpu.reg(SP);
    cpu.set_reg(SP, pre_sp & !0x3);

    let addr = ops[1].address()?;
    let entry_mask = cpu.memory.load_int(addr, DataType::W)?.uint();
    for i in (0..=11).rev() {
        if entry_mask & 1 << i != 0 {
            cpu.push(cpu.reg(i))?;
        }
    }
    cpu.push(cpu.pc())?;
    cpu.push(cpu.reg(FP))?;
    cpu.push(cpu.reg(AP))?;

    cpu.set_flag(Flag::N, false);
    cpu.set_flag(Flag::Z, false);
    cpu.set_flag(Flag::V, false);
    cpu.set_flag(Flag::C, false);

    let mut status = pre_sp << 30;
    if stack_args {
        status |= 1 << 29;
    }
    status |= (entry_mask & 0xfff) << 16;
    status |= cpu.psl() & 0xffef;
    cpu.push(status)?;

    // Condition handler slot.
    cpu.push(0)?;

    cpu.set_reg(FP, cpu.reg(SP));
    if stack_args {
        cpu.set_reg(AP, pre_sp);
    } else {
        cpu.set_reg(AP, ops[0].address()?);
    }

    cpu.set_flag(Flag::Iv, entry_mask & 0x4000 != 0);
    cpu.set_flag(Flag::Dv, entry_mask & 0x8000 != 0);
    cpu.set_flag(Flag::Fu, false);

    cpu.set_pc(addr.wrapping_add(2));
    Ok(Control::Continue)
}

pub(crate) fn callg(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    call(ops, cpu, false)
}

pub(crate) fn calls(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    call(ops, cpu, true)
}

/// Unwinds the frame CALLS/CALLG built, restoring the masked registers
/// and the saved processor status, then discards stack arguments for
/// the stack-based variant.
pub(crate) fn ret(
    _ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    cpu.set_reg(SP, cpu.reg(FP).wrapping_add(4));
    let status = cpu.pop()?;
    let ap = cpu.pop()?;
    cpu.set_reg(AP, ap);
    let fp = cpu.pop()?;
    cpu.set_reg(FP, fp);
    let pc = cpu.pop()?;
    cpu.set_pc(pc);

    let entry_mask = status >> 16 & 0xfff;
    for i in 0..=11 {
        if entry_mask & 1 << i != 0 {
            let val = cpu.pop()?;
            cpu.set_reg(i, val);
        }
    }

    cpu.set_reg(SP, cpu.reg(SP) | status >> 30);
    cpu.set_psl(status & 0xffff);

    let called_with_stack_args = status & 1 << 29 != 0;
    if called_with_stack_args {
        let nargs = cpu.pop()? & 0xff;
        cpu.set_reg(SP, cpu.reg(SP).wrapping_add(nargs * 4));
    }
    Ok(Control::Continue)
}

/// CHMK hands the code to the trap dispatcher; an exit request from the
/// service ends the run.
pub(crate) fn chmk(
    ops: &[Operand],
    cpu: &mut Cpu,
    service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let code = ops[0].int_value(cpu)?.uint();
    match dispatch_trap(cpu, code, service)? {
        Some(status) => Ok(Control::Exit(status)),
        None => Ok(Control::Continue),
    }
}
