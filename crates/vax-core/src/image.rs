//! v7-style `a.out` executable images.
//!
//! The 32-byte header carries eight little-endian longwords: magic, text
//! size, data size, bss size, symbol table size, entry point, and two
//! fields the loader ignores. Only the shared-text magic is accepted;
//! its text loads at address zero and its data at the next segment
//! boundary above the text.

use std::io::Read;
use std::path::Path;

use thiserror::Error;

/// Shared-text magic number (octal 0410).
pub const AOUT_MAGIC: u32 = 0o410;

/// Header size in bytes.
pub const AOUT_HEADER_SIZE: usize = 32;

/// Segment alignment for the data base address.
pub const SEG_UNIT_SIZE: u32 = 0x200;

/// Errors raised while reading an executable image. Distinct from
/// runtime faults; nothing here can occur once a program is running.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file ended before the header or the declared segments.
    #[error("truncated executable image")]
    TruncatedImage,
    /// The magic longword is not the supported shared-text format.
    #[error("unsupported magic 0o{magic:o} (expected 0o410)")]
    BadMagic {
        /// The magic longword found in the header.
        magic: u32,
    },
    /// Underlying I/O failure.
    #[error("failed to read image")]
    Io(#[from] std::io::Error),
}

/// A parsed executable: segment bytes plus the declared BSS size.
#[derive(Debug, Clone)]
pub struct AoutImage {
    /// Text segment, loaded at address zero.
    pub text: Vec<u8>,
    /// Initialized data segment.
    pub data: Vec<u8>,
    /// Zero-filled region above the data segment, in bytes.
    pub bss_size: u32,
}

impl AoutImage {
    /// Parses a complete image from raw file bytes.
    pub fn parse(raw: &[u8]) -> Result<Self, LoadError> {
        if raw.len() < AOUT_HEADER_SIZE {
            return Err(LoadError::TruncatedImage);
        }
        let field = |i: usize| {
            u32::from_le_bytes([raw[i * 4], raw[i * 4 + 1], raw[i * 4 + 2], raw[i * 4 + 3]])
        };
        let magic = field(0);
        if magic != AOUT_MAGIC {
            return Err(LoadError::BadMagic { magic });
        }
        let text_size = field(1) as usize;
        let data_size = field(2) as usize;
        let bss_size = field(3);

        let text_end = AOUT_HEADER_SIZE + text_size;
        let data_end = text_end + data_size;
        if raw.len() < data_end {
            return Err(LoadError::TruncatedImage);
        }
        Ok(Self {
            text: raw[AOUT_HEADER_SIZE..text_end].to_vec(),
            data: raw[text_end..data_end].to_vec(),
            bss_size,
        })
    }

    /// Parses an image from a reader.
    pub fn read(mut source: impl Read) -> Result<Self, LoadError> {
        let mut raw = Vec::new();
        source.read_to_end(&mut raw)?;
        Self::parse(&raw)
    }

    /// Parses an image from a file on the host.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        Self::read(std::fs::File::open(path)?)
    }

    /// Load address of the data segment: the text size rounded up to the
    /// next segment boundary.
    #[must_use]
    pub fn data_base(&self) -> u32 {
        let text = u32::try_from(self.text.len()).unwrap_or(0);
        (text + SEG_UNIT_SIZE - 1) & !(SEG_UNIT_SIZE - 1)
    }

    /// First address past the data segment and BSS.
    #[must_use]
    pub fn brk(&self) -> u32 {
        self.data_base() + u32::try_from(self.data.len()).unwrap_or(0) + self.bss_size
    }
}
