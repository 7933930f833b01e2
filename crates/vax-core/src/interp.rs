//! The fetch/decode/execute loop.

use crate::exec::Control;
use crate::fault::Fault;
use crate::opcode::{self, Op};
use crate::operand::Operand;
use crate::state::Cpu;
use crate::trap::TrapService;

/// Result of a single instruction step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The instruction completed and execution continues.
    Continue,
    /// The guest terminated with this exit status.
    Exited(i32),
}

/// Receives one rendered instruction per step, before it executes.
pub trait TraceSink {
    /// Called with the instruction's start address and its disassembly.
    fn record(&mut self, pc: u32, disassembly: &str);
}

fn decode(cpu: &mut Cpu) -> Result<(&'static Op, Vec<Operand>), Fault> {
    let op = opcode::fetch(cpu)?;
    let mut operands = Vec::with_capacity(op.operands.len());
    for &ty in op.operands {
        operands.push(Operand::resolve(cpu, ty)?);
    }
    Ok((op, operands))
}

fn execute(
    op: &Op,
    operands: &[Operand],
    cpu: &mut Cpu,
    service: &mut dyn TrapService,
) -> Result<StepOutcome, Fault> {
    match (op.exec)(operands, cpu, service)? {
        Control::Continue => Ok(StepOutcome::Continue),
        Control::Exit(status) => Ok(StepOutcome::Exited(status)),
    }
}

fn render(op: &Op, operands: &[Operand]) -> String {
    let mut text = op.mnemonic.to_owned();
    for (i, operand) in operands.iter().enumerate() {
        text.push(if i == 0 { '\t' } else { ',' });
        text.push_str(operand.mnemonic());
    }
    text
}

/// Runs one instruction.
pub fn step(cpu: &mut Cpu, service: &mut dyn TrapService) -> Result<StepOutcome, Fault> {
    let (op, operands) = decode(cpu)?;
    execute(op, &operands, cpu, service)
}

/// Runs one instruction, reporting its disassembly to the sink first.
pub fn step_traced(
    cpu: &mut Cpu,
    service: &mut dyn TrapService,
    sink: &mut dyn TraceSink,
) -> Result<StepOutcome, Fault> {
    let pc = cpu.pc();
    let (op, operands) = decode(cpu)?;
    sink.record(pc, &render(op, &operands));
    execute(op, &operands, cpu, service)
}

/// Runs instructions until the guest exits, returning its status.
pub fn run(cpu: &mut Cpu, service: &mut dyn TrapService) -> Result<i32, Fault> {
    loop {
        if let StepOutcome::Exited(status) = step(cpu, service)? {
            return Ok(status);
        }
    }
}

/// [`run`], with every instruction reported to the sink.
pub fn run_traced(
    cpu: &mut Cpu,
    service: &mut dyn TrapService,
    sink: &mut dyn TraceSink,
) -> Result<i32, Fault> {
    loop {
        if let StepOutcome::Exited(status) = step_traced(cpu, service, sink)? {
            return Ok(status);
        }
    }
}
