//! Architectural execution state: general registers, processor status,
//! and the attached guest memory.

use crate::fault::Fault;
use crate::image::AoutImage;
use crate::memory::{Memory, MEM_SIZE};
use crate::value::{DataType, IntValue, MAX_VALUE_BYTES};

/// Argument pointer register index.
pub const AP: usize = 12;
/// Frame pointer register index.
pub const FP: usize = 13;
/// Stack pointer register index.
pub const SP: usize = 14;
/// Program counter register index.
pub const PC: usize = 15;

/// Pointer/stack-slot width in bytes.
pub const NBPW: u32 = 4;

/// Processor status condition and trap-enable flags, by PSL bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Flag {
    /// Carry (borrow convention on subtract).
    C = 0,
    /// Overflow.
    V = 1,
    /// Zero.
    Z = 2,
    /// Negative.
    N = 3,
    /// Trace enable.
    T = 4,
    /// Integer overflow trap enable.
    Iv = 5,
    /// Floating underflow trap enable.
    Fu = 6,
    /// Decimal overflow trap enable.
    Dv = 7,
}

impl Flag {
    /// Bit mask of this flag within the PSL.
    #[must_use]
    pub const fn mask(self) -> u32 {
        1 << self as u32
    }
}

/// One virtual processor: sixteen general registers, the processor
/// status longword, and its private memory.
///
/// `Clone` performs a full deep copy, which is how a fork-style service
/// duplicates a running machine.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Cpu {
    registers: [u32; 16],
    psl: u32,
    /// Attached guest memory.
    pub memory: Memory,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// Creates a processor with zeroed registers and empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registers: [0; 16],
            psl: 0,
            memory: Memory::new(),
        }
    }

    /// Loads an executable image and resets execution state. The PC
    /// starts at 2, past the entry register save mask.
    pub fn load(&mut self, image: &AoutImage) {
        self.memory.load_image(image);
        self.registers = [0; 16];
        self.psl = 0;
        self.registers[PC] = 2;
    }

    // --- longword register access ---

    /// Reads one register.
    #[must_use]
    pub const fn reg(&self, n: usize) -> u32 {
        self.registers[n]
    }

    /// Writes one register.
    pub fn set_reg(&mut self, n: usize, val: u32) {
        self.registers[n] = val;
    }

    /// Current program counter.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.registers[PC]
    }

    /// Sets the program counter.
    pub fn set_pc(&mut self, pc: u32) {
        self.registers[PC] = pc;
    }

    /// Adds a signed displacement to the program counter.
    pub fn branch(&mut self, displacement: i32) {
        self.registers[PC] = self.registers[PC].wrapping_add(displacement as u32);
    }

    // --- typed register access ---

    /// Reads a typed value starting at register `n`. Wide types span
    /// consecutive registers; words past the register file read as zero.
    #[must_use]
    pub fn reg_value(&self, n: usize, ty: DataType) -> IntValue {
        let mut bytes = [0u8; MAX_VALUE_BYTES];
        let words = ty.size().div_ceil(4);
        for i in 0..words {
            let word = if n + i <= PC { self.registers[n + i] } else { 0 };
            bytes[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
        }
        IntValue::from_bytes(&bytes, ty)
    }

    /// Writes a typed value starting at register `n`. Narrow types merge
    /// into the register's low bytes; words past the register file are
    /// dropped.
    pub fn set_reg_value(&mut self, n: usize, value: &IntValue) {
        let src = value.bytes();
        let size = src.len();
        if size < 4 {
            let mut le = self.registers[n].to_le_bytes();
            le[..size].copy_from_slice(src);
            self.registers[n] = u32::from_le_bytes(le);
            return;
        }
        for i in 0..size / 4 {
            if n + i > PC {
                break;
            }
            let mut le = [0u8; 4];
            le.copy_from_slice(&src[i * 4..i * 4 + 4]);
            self.registers[n + i] = u32::from_le_bytes(le);
        }
    }

    // --- flags ---

    /// Reads one PSL flag.
    #[must_use]
    pub const fn flag(&self, flag: Flag) -> bool {
        self.psl & flag.mask() != 0
    }

    /// Writes one PSL flag.
    pub fn set_flag(&mut self, flag: Flag, on: bool) {
        if on {
            self.psl |= flag.mask();
        } else {
            self.psl &= !flag.mask();
        }
    }

    /// Raw processor status longword.
    #[must_use]
    pub const fn psl(&self) -> u32 {
        self.psl
    }

    /// Replaces the processor status longword.
    pub fn set_psl(&mut self, psl: u32) {
        self.psl = psl;
    }

    // --- stack ---

    /// Pushes a longword: decrement SP, then store.
    pub fn push(&mut self, val: u32) -> Result<(), Fault> {
        self.registers[SP] = self.registers[SP].wrapping_sub(NBPW);
        self.memory
            .write(self.registers[SP], &val.to_le_bytes())
    }

    /// Pops a longword: load, then increment SP.
    pub fn pop(&mut self) -> Result<u32, Fault> {
        let mut le = [0u8; 4];
        self.memory.read(self.registers[SP], &mut le)?;
        self.registers[SP] = self.registers[SP].wrapping_add(NBPW);
        Ok(u32::from_le_bytes(le))
    }

    // --- instruction stream ---

    /// Consumes one instruction-stream byte, advancing the PC. Faults
    /// once the PC leaves the text segment.
    pub fn fetch_byte(&mut self) -> Result<u8, Fault> {
        let byte = self
            .memory
            .read_text(self.registers[PC])
            .ok_or(Fault::EndOfText)?;
        self.registers[PC] = self.registers[PC].wrapping_add(1);
        Ok(byte)
    }

    /// Peeks the next instruction-stream byte without consuming it.
    #[must_use]
    pub fn peek_byte(&self) -> Option<u8> {
        self.memory.read_text(self.registers[PC])
    }

    // --- process arguments ---

    /// Lays out the argument and environment block at the top of memory
    /// and points AP and SP at it, matching the v7 user-stack layout:
    /// argument count, argument pointers, a null, environment pointers,
    /// a null, then the string bytes themselves.
    pub fn init_args(&mut self, args: &[Vec<u8>], envs: &[Vec<u8>]) -> Result<(), Fault> {
        let nchars: u32 = args
            .iter()
            .chain(envs)
            .map(|s| u32::try_from(s.len()).unwrap_or(0) + 1)
            .sum();
        let nchars = (nchars + NBPW - 1) & !(NBPW - 1);
        let n = u32::try_from(args.len() + envs.len()).unwrap_or(0);

        let mut ucp = MEM_SIZE - nchars - NBPW;
        let ap = ucp - (n + 3) * NBPW;
        self.registers[SP] = ap;
        self.registers[AP] = ap;

        let mut slot = ap;
        let store_slot = |mem: &mut Memory, slot: &mut u32, val: u32| {
            mem.write(*slot, &val.to_le_bytes())?;
            *slot += NBPW;
            Ok::<(), Fault>(())
        };

        store_slot(
            &mut self.memory,
            &mut slot,
            u32::try_from(args.len()).unwrap_or(0),
        )?;
        for group in [args, envs] {
            for s in group {
                store_slot(&mut self.memory, &mut slot, ucp)?;
                self.memory.write(ucp, s)?;
                self.memory
                    .store_byte(ucp + u32::try_from(s.len()).unwrap_or(0), 0)?;
                ucp += u32::try_from(s.len()).unwrap_or(0) + 1;
            }
            store_slot(&mut self.memory, &mut slot, 0)?;
        }
        Ok(())
    }
}
