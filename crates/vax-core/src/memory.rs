//! Flat guest memory with the high-address alias window.

use crate::fault::Fault;
use crate::image::AoutImage;
use crate::value::{DataType, IntValue, Value};

/// Guest address space size in bytes (4 MiB).
pub const MEM_SIZE: u32 = 0x40_0000;

/// Start of the virtual window that aliases onto the top of the buffer.
/// Stack addresses handed out near `0x8000_0000` land in the last 256
/// bytes of physical memory.
pub const HIGH_ALIAS_BASE: u32 = 0x7fff_ff00;

/// Flat byte-addressed guest memory.
///
/// The buffer holds text at 0, data above it, and the argument block at
/// the very top. `text_size` marks the end of executable bytes for the
/// fetch path.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Memory {
    mem: Vec<u8>,
    text_size: u32,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    /// Creates zero-filled memory with no loaded program.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mem: vec![0u8; MEM_SIZE as usize],
            text_size: 0,
        }
    }

    /// End of the loaded text segment.
    #[must_use]
    pub const fn text_size(&self) -> u32 {
        self.text_size
    }

    /// Places a parsed executable image: text at 0, data at the next
    /// segment boundary, everything above zeroed.
    pub fn load_image(&mut self, image: &AoutImage) {
        self.mem.fill(0);
        self.mem[..image.text.len()].copy_from_slice(&image.text);
        let data_base = image.data_base() as usize;
        self.mem[data_base..data_base + image.data.len()].copy_from_slice(&image.data);
        self.text_size = u32::try_from(image.text.len()).unwrap_or(0);
    }

    /// Maps a virtual address plus access length to a buffer offset,
    /// applying the high-alias window.
    fn map(&self, addr: u32, len: usize) -> Result<usize, Fault> {
        let phys = if addr >= HIGH_ALIAS_BASE {
            MEM_SIZE.wrapping_sub(0x8000_0000u32.wrapping_sub(addr))
        } else {
            addr
        };
        let end = (phys as usize).checked_add(len);
        match end {
            Some(end) if phys < MEM_SIZE && end <= MEM_SIZE as usize => Ok(phys as usize),
            _ => Err(Fault::AddressOutOfRange { addr }),
        }
    }

    /// Reads raw bytes into `dst`.
    pub fn read(&self, addr: u32, dst: &mut [u8]) -> Result<(), Fault> {
        let base = self.map(addr, dst.len())?;
        dst.copy_from_slice(&self.mem[base..base + dst.len()]);
        Ok(())
    }

    /// Writes raw bytes from `src`.
    pub fn write(&mut self, addr: u32, src: &[u8]) -> Result<(), Fault> {
        let base = self.map(addr, src.len())?;
        self.mem[base..base + src.len()].copy_from_slice(src);
        Ok(())
    }

    /// Loads a typed value.
    pub fn load(&self, addr: u32, ty: DataType) -> Result<Value, Fault> {
        let base = self.map(addr, ty.size())?;
        Ok(Value::from_raw(&self.mem[base..base + ty.size()], ty))
    }

    /// Loads a typed value through the integer view.
    pub fn load_int(&self, addr: u32, ty: DataType) -> Result<IntValue, Fault> {
        Ok(self.load(addr, ty)?.as_int())
    }

    /// Loads one byte.
    pub fn load_byte(&self, addr: u32) -> Result<u8, Fault> {
        let base = self.map(addr, 1)?;
        Ok(self.mem[base])
    }

    /// Stores one byte.
    pub fn store_byte(&mut self, addr: u32, byte: u8) -> Result<(), Fault> {
        let base = self.map(addr, 1)?;
        self.mem[base] = byte;
        Ok(())
    }

    /// Stores a value's visible bytes.
    pub fn store(&mut self, addr: u32, value: &Value) -> Result<(), Fault> {
        self.write(addr, value.bytes())
    }

    /// Reads a NUL-terminated guest string, excluding the terminator.
    pub fn read_cstring(&self, addr: u32) -> Result<Vec<u8>, Fault> {
        let mut out = Vec::new();
        let mut p = addr;
        loop {
            let b = self.load_byte(p)?;
            if b == 0 {
                return Ok(out);
            }
            out.push(b);
            p = p.wrapping_add(1);
        }
    }

    /// Fetches a text-segment byte; `None` once the stream runs past the
    /// end of loaded text.
    #[must_use]
    pub fn read_text(&self, addr: u32) -> Option<u8> {
        if addr < self.text_size {
            Some(self.mem[addr as usize])
        } else {
            None
        }
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("size", &self.mem.len())
            .field("text_size", &self.text_size)
            .finish()
    }
}
