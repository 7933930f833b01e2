//! Operand specifier resolution.
//!
//! Each operand begins with a mode byte whose top nibble selects one of
//! the addressing modes; resolution consumes the specifier bytes from
//! the instruction stream, applies register side effects (auto-increment
//! and auto-decrement) immediately, and yields a placed [`Operand`] that
//! later reads and writes go through. Branch displacements skip the mode
//! byte entirely and encode a PC-relative target.

use crate::fault::Fault;
use crate::state::{Cpu, PC};
use crate::value::{DataType, FloatValue, IntValue, Value, MAX_VALUE_BYTES};

const REG_NAMES: [&str; 16] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "ap", "fp", "sp",
    "pc",
];

/// Where a resolved operand lives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Place {
    /// General register (wide types span consecutive registers).
    Register(usize),
    /// Guest memory at a virtual address.
    Memory(u32),
    /// Short literal or immediate constant, already expanded.
    Constant(Value),
}

/// A fully resolved operand: its place, its width/format, and the
/// disassembly text and stream length the resolver produced.
#[derive(Debug, Clone)]
pub struct Operand {
    place: Place,
    ty: DataType,
    mnemonic: String,
    len: u8,
}

impl Operand {
    /// Resolves the next operand specifier of type `ty` from the
    /// instruction stream, applying register side effects.
    pub fn resolve(cpu: &mut Cpu, ty: DataType) -> Result<Self, Fault> {
        if ty.is_branch_displacement() {
            return Self::resolve_branch(cpu, ty);
        }
        let head = cpu.fetch_byte()?;
        Self::resolve_with_head(cpu, ty, head)
    }

    fn resolve_with_head(cpu: &mut Cpu, ty: DataType, head: u8) -> Result<Self, Fault> {
        let reg = usize::from(head & 0x0f);
        match head >> 4 {
            0x0..=0x3 => Ok(Self::literal(head & 0x3f, ty)),
            0x4 => Self::resolve_indexed(cpu, ty, reg),
            0x5 => Ok(Self {
                place: Place::Register(reg),
                ty,
                mnemonic: REG_NAMES[reg].to_owned(),
                len: 1,
            }),
            0x6 => Ok(Self {
                place: Place::Memory(cpu.reg(reg)),
                ty,
                mnemonic: format!("({})", REG_NAMES[reg]),
                len: 1,
            }),
            0x7 => {
                let size = u32::try_from(ty.size()).unwrap_or(0);
                let addr = cpu.reg(reg).wrapping_sub(size);
                cpu.set_reg(reg, addr);
                Ok(Self {
                    place: Place::Memory(addr),
                    ty,
                    mnemonic: format!("-({})", REG_NAMES[reg]),
                    len: 1,
                })
            }
            0x8 if reg == PC => {
                // Immediate: the constant follows in the stream.
                let value = Self::fetch_value(cpu, ty)?;
                Ok(Self {
                    mnemonic: format!("${}{}", value.hex_string(), ty.annotation()),
                    place: Place::Constant(value),
                    ty,
                    len: 1 + u8::try_from(ty.size()).unwrap_or(0),
                })
            }
            0x8 => {
                let addr = cpu.reg(reg);
                cpu.set_reg(reg, addr.wrapping_add(u32::try_from(ty.size()).unwrap_or(0)));
                Ok(Self {
                    place: Place::Memory(addr),
                    ty,
                    mnemonic: format!("({})+", REG_NAMES[reg]),
                    len: 1,
                })
            }
            0x9 if reg == PC => {
                let pointer = Self::fetch_value(cpu, DataType::L)?.as_int().uint();
                Ok(Self {
                    place: Place::Memory(pointer),
                    ty,
                    mnemonic: format!("*0x{pointer:x}"),
                    len: 5,
                })
            }
            0x9 => {
                let pointer = cpu.memory.load_int(cpu.reg(reg), DataType::L)?.uint();
                cpu.set_reg(reg, cpu.reg(reg).wrapping_add(4));
                Ok(Self {
                    place: Place::Memory(pointer),
                    ty,
                    mnemonic: format!("@({})+", REG_NAMES[reg]),
                    len: 1,
                })
            }
            _ => Self::resolve_displacement(cpu, ty, head, reg),
        }
    }

    /// Byte, word, and longword displacement modes, direct and deferred.
    fn resolve_displacement(cpu: &mut Cpu, ty: DataType, head: u8, reg: usize) -> Result<Self, Fault> {
        let disp_ty = match head >> 5 {
            5 => DataType::B,
            6 => DataType::W,
            _ => DataType::L,
        };
        let deferred = head >> 4 & 1 == 1;
        let disp = Self::fetch_value(cpu, disp_ty)?.as_int().sint();
        // For PC-relative forms the base is the PC after the specifier.
        let base = cpu.reg(reg);
        let direct = base.wrapping_add(disp as u32);
        let addr = if deferred {
            cpu.memory.load_int(direct, DataType::L)?.uint()
        } else {
            direct
        };
        let star = if deferred { "*" } else { "" };
        let mnemonic = if reg == PC {
            format!("{star}0x{direct:x}")
        } else {
            format!("{star}0x{:x}({})", disp as u32, REG_NAMES[reg])
        };
        Ok(Self {
            place: Place::Memory(addr),
            ty,
            mnemonic,
            len: 1 + u8::try_from(disp_ty.size()).unwrap_or(0),
        })
    }

    /// Indexed mode: the base specifier follows and must name memory;
    /// the index register is scaled by the operand size. The base
    /// resolves first, so its side effects are visible to the index
    /// register read.
    fn resolve_indexed(cpu: &mut Cpu, ty: DataType, index_reg: usize) -> Result<Self, Fault> {
        let head = cpu.fetch_byte()?;
        let base = Self::resolve_with_head(cpu, ty, head)?;
        let Place::Memory(base_addr) = base.place else {
            return Err(Fault::ReservedAddressingMode);
        };
        let scale = cpu.reg(index_reg).wrapping_mul(u32::try_from(ty.size()).unwrap_or(0));
        Ok(Self {
            place: Place::Memory(base_addr.wrapping_add(scale)),
            ty,
            mnemonic: format!("{}[{}]", base.mnemonic, REG_NAMES[index_reg]),
            len: base.len + 1,
        })
    }

    /// Branch displacement pseudo-operand: a signed offset relative to
    /// the PC after the displacement bytes.
    fn resolve_branch(cpu: &mut Cpu, ty: DataType) -> Result<Self, Fault> {
        let offset = Self::fetch_value(cpu, ty)?.as_int().sint();
        let target = cpu.pc().wrapping_add(offset as u32);
        Ok(Self {
            place: Place::Memory(target),
            ty,
            mnemonic: format!("0x{target:x}"),
            len: u8::try_from(ty.size()).unwrap_or(0),
        })
    }

    /// Short literal: the low six mode-byte bits, expanded per type.
    /// Floating expansions place the bits in the format's exponent and
    /// fraction fields.
    fn literal(raw: u8, ty: DataType) -> Self {
        let val = u32::from(raw);
        let value = match ty {
            DataType::F | DataType::D => {
                let packed: u32 = val << 4 | 0x4000;
                let mut bytes = [0u8; 8];
                bytes[..4].copy_from_slice(&packed.to_le_bytes());
                Value::Float(FloatValue::from_bytes(&bytes[..ty.size()], ty))
            }
            DataType::G => {
                let packed: u32 = val << 1 | 0x4000;
                let mut bytes = [0u8; 8];
                bytes[..4].copy_from_slice(&packed.to_le_bytes());
                Value::Float(FloatValue::from_bytes(&bytes, ty))
            }
            DataType::H => {
                let packed: u32 = val >> 3 | 0x4000 | val << 29;
                let mut bytes = [0u8; 16];
                bytes[..4].copy_from_slice(&packed.to_le_bytes());
                Value::Float(FloatValue::from_bytes(&bytes, ty))
            }
            _ => Value::Int(IntValue::from_i32(val as i32, ty)),
        };
        Self {
            place: Place::Constant(value),
            ty,
            mnemonic: format!("$0x{val:x}{}", ty.annotation()),
            len: 1,
        }
    }

    fn fetch_value(cpu: &mut Cpu, ty: DataType) -> Result<Value, Fault> {
        let mut bytes = [0u8; MAX_VALUE_BYTES];
        for b in bytes.iter_mut().take(ty.size()) {
            *b = cpu.fetch_byte()?;
        }
        Ok(Value::from_raw(&bytes, ty))
    }

    // --- access ---

    /// Operand type as declared by the instruction.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.ty
    }

    /// Stream bytes the specifier consumed.
    #[must_use]
    pub const fn len(&self) -> u8 {
        self.len
    }

    /// `true` when the specifier consumed no stream bytes (never the
    /// case for resolved operands; kept for the conventional pairing).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Disassembly text for this operand.
    #[must_use]
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    /// The register this operand names, if it is register mode.
    #[must_use]
    pub const fn register(&self) -> Option<usize> {
        match self.place {
            Place::Register(reg) => Some(reg),
            _ => None,
        }
    }

    /// Effective address. Register and constant operands have none.
    pub const fn address(&self) -> Result<u32, Fault> {
        match self.place {
            Place::Memory(addr) => Ok(addr),
            _ => Err(Fault::ReservedAddressingMode),
        }
    }

    /// Reads the operand as a typed value.
    pub fn value(&self, cpu: &Cpu) -> Result<Value, Fault> {
        match &self.place {
            Place::Register(reg) => {
                let raw = cpu.reg_value(*reg, self.ty);
                Ok(Value::from_raw(raw.bytes(), self.ty))
            }
            Place::Memory(addr) => cpu.memory.load(*addr, self.ty),
            Place::Constant(value) => Ok(*value),
        }
    }

    /// Reads the operand through the integer view.
    pub fn int_value(&self, cpu: &Cpu) -> Result<IntValue, Fault> {
        Ok(self.value(cpu)?.as_int())
    }

    /// Reads the operand as a float of its declared format.
    pub fn float_value(&self, cpu: &Cpu) -> Result<FloatValue, Fault> {
        Ok(self.value(cpu)?.as_float(self.ty))
    }

    /// Writes raw value bytes to the operand's place. Constants reject
    /// writes with a reserved-addressing-mode fault.
    pub fn set_bytes(&self, cpu: &mut Cpu, bytes: &[u8]) -> Result<(), Fault> {
        match &self.place {
            Place::Register(reg) => {
                cpu.set_reg_value(*reg, &IntValue::from_bytes(bytes, self.ty));
                Ok(())
            }
            Place::Memory(addr) => {
                cpu.memory.write(*addr, &bytes[..self.ty.size().min(bytes.len())])
            }
            Place::Constant(_) => Err(Fault::ReservedAddressingMode),
        }
    }

    /// Writes an integer value.
    pub fn set_int(&self, cpu: &mut Cpu, value: &IntValue) -> Result<(), Fault> {
        self.set_bytes(cpu, value.bytes())
    }

    /// Writes a float value.
    pub fn set_float(&self, cpu: &mut Cpu, value: &FloatValue) -> Result<(), Fault> {
        self.set_bytes(cpu, value.bytes())
    }

    /// Writes a typed value.
    pub fn set_value(&self, cpu: &mut Cpu, value: &Value) -> Result<(), Fault> {
        self.set_bytes(cpu, value.bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::Operand;
    use crate::fault::Fault;
    use crate::image::AoutImage;
    use crate::state::Cpu;
    use crate::value::{DataType, IntValue};

    fn cpu_with_text(text: &[u8]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load(&AoutImage {
            text: text.to_vec(),
            data: Vec::new(),
            bss_size: 0,
        });
        cpu.set_pc(0);
        cpu
    }

    #[test]
    fn short_literal_decodes_to_its_low_six_bits() {
        let mut cpu = cpu_with_text(&[0x05]);
        let op = Operand::resolve(&mut cpu, DataType::L).expect("resolve");
        assert_eq!(op.int_value(&cpu).expect("value").uint(), 5);
        assert_eq!(op.len(), 1);
        assert_eq!(op.mnemonic(), "$0x5");
        assert!(op.set_int(&mut cpu, &IntValue::longword(1)).is_err());
    }

    #[test]
    fn float_literal_expands_into_the_exponent_field() {
        let mut cpu = cpu_with_text(&[0x05, 0x05]);
        let f = Operand::resolve(&mut cpu, DataType::F).expect("resolve");
        assert_eq!(f.float_value(&cpu).expect("value").bytes(), &[0x50, 0x40, 0x00, 0x00]);
        let g = Operand::resolve(&mut cpu, DataType::G).expect("resolve");
        // 5 << 1 | 0x4000 in the low word, fraction zero.
        assert_eq!(&g.float_value(&cpu).expect("value").bytes()[..2], &[0x0a, 0x40]);
    }

    #[test]
    fn register_mode_reads_and_writes_the_register() {
        let mut cpu = cpu_with_text(&[0x53]);
        cpu.set_reg(3, 0xdead_beef);
        let op = Operand::resolve(&mut cpu, DataType::W).expect("resolve");
        assert_eq!(op.int_value(&cpu).expect("value").uint(), 0xbeef);
        op.set_int(&mut cpu, &IntValue::from_i32(0x1234, DataType::W))
            .expect("write");
        assert_eq!(cpu.reg(3), 0xdead_1234);
        assert!(op.address().is_err());
    }

    #[test]
    fn autoincrement_uses_the_pre_increment_address() {
        let mut cpu = cpu_with_text(&[0x82]);
        cpu.set_reg(2, 0x1000);
        let op = Operand::resolve(&mut cpu, DataType::B).expect("resolve");
        assert_eq!(op.address().expect("addr"), 0x1000);
        assert_eq!(cpu.reg(2), 0x1001);
        assert_eq!(op.mnemonic(), "(r2)+");
    }

    #[test]
    fn autodecrement_steps_then_addresses() {
        let mut cpu = cpu_with_text(&[0x74]);
        cpu.set_reg(4, 0x1000);
        let op = Operand::resolve(&mut cpu, DataType::L).expect("resolve");
        assert_eq!(op.address().expect("addr"), 0xffc);
        assert_eq!(cpu.reg(4), 0xffc);
    }

    #[test]
    fn immediate_reads_the_constant_from_the_stream() {
        let mut cpu = cpu_with_text(&[0x8f, 0x78, 0x56, 0x34, 0x12]);
        let op = Operand::resolve(&mut cpu, DataType::L).expect("resolve");
        assert_eq!(op.int_value(&cpu).expect("value").uint(), 0x1234_5678);
        assert_eq!(op.len(), 5);
        assert_eq!(cpu.pc(), 5);
        assert_eq!(op.mnemonic(), "$0x12345678");
    }

    #[test]
    fn deferred_autoincrement_always_steps_by_four() {
        let mut cpu = cpu_with_text(&[0x96]);
        cpu.set_reg(6, 0x800);
        cpu.memory
            .write(0x800, &0x2000u32.to_le_bytes())
            .expect("pointer");
        let op = Operand::resolve(&mut cpu, DataType::B).expect("resolve");
        assert_eq!(op.address().expect("addr"), 0x2000);
        assert_eq!(cpu.reg(6), 0x804);
        assert_eq!(op.mnemonic(), "@(r6)+");
    }

    #[test]
    fn byte_displacement_adds_a_signed_offset_to_the_register() {
        let mut cpu = cpu_with_text(&[0xa1, 0xfe]);
        cpu.set_reg(1, 0x1000);
        let op = Operand::resolve(&mut cpu, DataType::L).expect("resolve");
        assert_eq!(op.address().expect("addr"), 0xffe);
        assert_eq!(op.len(), 2);
    }

    #[test]
    fn pc_relative_displacement_is_rendered_absolute() {
        // Longword displacement off the PC: base is the PC after the
        // specifier (offset 6 here), plus 0x100.
        let mut cpu = cpu_with_text(&[0xef, 0x00, 0x01, 0x00, 0x00, 0x00]);
        let op = Operand::resolve(&mut cpu, DataType::B).expect("resolve");
        assert_eq!(op.address().expect("addr"), 0x106);
        assert_eq!(op.mnemonic(), "0x106");
    }

    #[test]
    fn deferred_displacement_loads_the_pointer() {
        let mut cpu = cpu_with_text(&[0xb5, 0x10]);
        cpu.set_reg(5, 0x400);
        cpu.memory
            .write(0x410, &0x3000u32.to_le_bytes())
            .expect("pointer");
        let op = Operand::resolve(&mut cpu, DataType::W).expect("resolve");
        assert_eq!(op.address().expect("addr"), 0x3000);
        assert_eq!(op.mnemonic(), "*0x10(r5)");
    }

    #[test]
    fn indexed_mode_scales_by_the_operand_size() {
        let mut cpu = cpu_with_text(&[0x47, 0x63]);
        cpu.set_reg(7, 3);
        cpu.set_reg(3, 0x1000);
        let op = Operand::resolve(&mut cpu, DataType::L).expect("resolve");
        assert_eq!(op.address().expect("addr"), 0x100c);
        assert_eq!(op.len(), 2);
        assert_eq!(op.mnemonic(), "(r3)[r7]");
    }

    #[test]
    fn indexed_base_side_effects_precede_the_index_read() {
        // (r2)+[r2]: the base autoincrement lands before the index
        // register is read, so the scale uses the stepped value.
        let mut cpu = cpu_with_text(&[0x42, 0x82]);
        cpu.set_reg(2, 2);
        let op = Operand::resolve(&mut cpu, DataType::B).expect("resolve");
        assert_eq!(cpu.reg(2), 3);
        assert_eq!(op.address().expect("addr"), 2 + 3);
    }

    #[test]
    fn indexed_base_must_name_memory() {
        let mut cpu = cpu_with_text(&[0x47, 0x53]);
        assert_eq!(
            Operand::resolve(&mut cpu, DataType::L).unwrap_err(),
            Fault::ReservedAddressingMode
        );
    }

    #[test]
    fn branch_displacement_targets_pc_plus_offset() {
        let mut cpu = cpu_with_text(&[0x10, 0x00]);
        let op = Operand::resolve(&mut cpu, DataType::BrB).expect("resolve");
        assert_eq!(op.address().expect("addr"), 0x11);
        assert_eq!(cpu.pc(), 1);
        let back = Operand::resolve(&mut cpu, DataType::BrB).expect("resolve");
        assert_eq!(back.address().expect("addr"), 2);
    }

    #[test]
    fn truncated_specifier_faults_as_end_of_text() {
        let mut cpu = cpu_with_text(&[0xa1]);
        assert_eq!(
            Operand::resolve(&mut cpu, DataType::L).unwrap_err(),
            Fault::EndOfText
        );
    }
}
