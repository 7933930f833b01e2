//! Control transfer strategies: unconditional and conditional branches,
//! jumps, the case dispatch, and the loop-closing branch family.

use super::Control;
use crate::arith;
use crate::fault::Fault;
use crate::operand::Operand;
use crate::state::{Cpu, Flag};
use crate::trap::TrapService;
use crate::value::{DataType, IntValue};

fn take(cpu: &mut Cpu, target: &Operand) -> Result<(), Fault> {
    cpu.set_pc(target.address()?);
    Ok(())
}

fn branch_if(ops: &[Operand], cpu: &mut Cpu, cond: bool) -> Result<Control, Fault> {
    if cond {
        take(cpu, &ops[0])?;
    }
    Ok(Control::Continue)
}

macro_rules! conditional {
    ($($name:ident => |$cpu:ident| $cond:expr;)*) => {
        $(pub(crate) fn $name(
            ops: &[Operand],
            $cpu: &mut Cpu,
            _service: &mut dyn TrapService,
        ) -> Result<Control, Fault> {
            let cond = $cond;
            branch_if(ops, $cpu, cond)
        })*
    };
}

conditional! {
    br => |cpu| true;
    bneq => |cpu| !cpu.flag(Flag::Z);
    beql => |cpu| cpu.flag(Flag::Z);
    bgtr => |cpu| !cpu.flag(Flag::N) && !cpu.flag(Flag::Z);
    bleq => |cpu| cpu.flag(Flag::N) || cpu.flag(Flag::Z);
    bgeq => |cpu| !cpu.flag(Flag::N);
    blss => |cpu| cpu.flag(Flag::N);
    bgtru => |cpu| !cpu.flag(Flag::C) && !cpu.flag(Flag::Z);
    blequ => |cpu| cpu.flag(Flag::C) || cpu.flag(Flag::Z);
    bvc => |cpu| !cpu.flag(Flag::V);
    bvs => |cpu| cpu.flag(Flag::V);
    bcc => |cpu| !cpu.flag(Flag::C);
    blssu => |cpu| cpu.flag(Flag::C);
}

pub(crate) fn jmp(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    take(cpu, &ops[0])?;
    Ok(Control::Continue)
}

/// CASE: index the displacement table when the selector lands inside
/// `base..=base+limit`, otherwise fall past the table.
pub(crate) fn case(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let sel = ops[0].int_value(cpu)?;
    let base = ops[1].int_value(cpu)?;
    let limit = ops[2].int_value(cpu)?;
    let offset = IntValue::from_i32(sel.sint().wrapping_sub(base.sint()), sel.data_type());

    arith::sub(cpu, &offset, &limit);
    cpu.set_flag(Flag::V, false);

    if cpu.flag(Flag::C) || cpu.flag(Flag::Z) {
        let disp_addr = cpu.pc().wrapping_add(offset.uint().wrapping_mul(2));
        let disp = cpu.memory.load_int(disp_addr, DataType::W)?.sint();
        cpu.branch(disp);
    } else {
        cpu.branch(limit.uint().wrapping_add(1).wrapping_mul(2) as i32);
    }
    Ok(Control::Continue)
}

fn aob(ops: &[Operand], cpu: &mut Cpu, inclusive: bool) -> Result<Control, Fault> {
    let limit = ops[0].int_value(cpu)?;
    let index = ops[1].int_value(cpu)?;
    let pre_c = cpu.flag(Flag::C);

    let one = IntValue::from_i32(1, index.data_type());
    let index = arith::add(cpu, &index, &one);
    ops[1].set_int(cpu, &index)?;
    cpu.set_flag(Flag::C, pre_c);

    let taken = if inclusive {
        index.sint() <= limit.sint()
    } else {
        index.sint() < limit.sint()
    };
    if taken {
        take(cpu, &ops[2])?;
    }
    Ok(Control::Continue)
}

pub(crate) fn aoblss(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    aob(ops, cpu, false)
}

pub(crate) fn aobleq(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    aob(ops, cpu, true)
}

fn sob(ops: &[Operand], cpu: &mut Cpu, strict: bool) -> Result<Control, Fault> {
    let index = ops[0].int_value(cpu)?;
    let pre_c = cpu.flag(Flag::C);

    let one = IntValue::from_i32(1, index.data_type());
    let index = arith::sub(cpu, &index, &one);
    ops[0].set_int(cpu, &index)?;
    cpu.set_flag(Flag::C, pre_c);

    let taken = if strict {
        !cpu.flag(Flag::N) && !cpu.flag(Flag::Z)
    } else {
        !cpu.flag(Flag::N)
    };
    if taken {
        take(cpu, &ops[1])?;
    }
    Ok(Control::Continue)
}

pub(crate) fn sobgeq(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    sob(ops, cpu, false)
}

pub(crate) fn sobgtr(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    sob(ops, cpu, true)
}

/// ACB: add the addend to the index; branch while the index has not
/// passed the limit in the addend's direction. C survives the add.
pub(crate) fn acb(
    ops: &[Operand],
    cpu: &mut Cpu,
    _service: &mut dyn TrapService,
) -> Result<Control, Fault> {
    let limit = ops[0].int_value(cpu)?;
    let addend = ops[1].int_value(cpu)?;
    let index = ops[2].int_value(cpu)?;
    let pre_c = cpu.flag(Flag::C);

    let index = arith::add(cpu, &index, &addend);
    ops[2].set_int(cpu, &index)?;
    cpu.set_flag(Flag::C, pre_c);

    let taken = if addend.is_negative() {
        index.sint() >= limit.sint()
    } else {
        index.sint() <= limit.sint()
    };
    if taken {
        take(cpu, &ops[3])?;
    }
    Ok(Control::Continue)
}
