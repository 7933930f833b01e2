//! Width- and format-tagged numeric values.
//!
//! Every value is an immutable little-endian byte sequence whose visible
//! length always equals its tag's declared size. Integer values follow
//! two's-complement conventions; floating values follow the four VAX
//! formats (F/D/G/H), which differ from IEEE 754 in exponent bias and
//! significand layout and have no distinct signed zero.

use crate::fault::{Fault, ReservedOperandKind};

/// Maximum operand size in bytes (octaword / H-floating).
pub const MAX_VALUE_BYTES: usize = 16;

/// Operand width/format tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DataType {
    /// Byte integer.
    B,
    /// Word integer (2 bytes).
    W,
    /// Longword integer (4 bytes).
    L,
    /// Quadword integer (8 bytes).
    Q,
    /// Octaword integer (16 bytes).
    O,
    /// F-floating (4 bytes, bias 128, 8-bit exponent).
    F,
    /// D-floating (8 bytes, bias 128, 8-bit exponent).
    D,
    /// G-floating (8 bytes, bias 1024, 11-bit exponent).
    G,
    /// H-floating (16 bytes, bias 16384, 15-bit exponent).
    H,
    /// Byte branch displacement (control transfers only).
    BrB,
    /// Word branch displacement (control transfers only).
    BrW,
}

impl DataType {
    /// Returns the number of instruction-stream or memory bytes this
    /// width occupies.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::B | Self::BrB => 1,
            Self::W | Self::BrW => 2,
            Self::L | Self::F => 4,
            Self::Q | Self::D | Self::G => 8,
            Self::O | Self::H => 16,
        }
    }

    /// Returns `true` for the four floating formats.
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F | Self::D | Self::G | Self::H)
    }

    /// Returns `true` for the branch-displacement pseudo widths.
    #[must_use]
    pub const fn is_branch_displacement(self) -> bool {
        matches!(self, Self::BrB | Self::BrW)
    }

    /// Disassembly annotation appended to literal operands of this type.
    #[must_use]
    pub const fn annotation(self) -> &'static str {
        match self {
            Self::F => " [f-float]",
            Self::D => " [d-float]",
            Self::G => " [g-float]",
            Self::H => " [h-float]",
            _ => "",
        }
    }
}

/// Integer value: two's-complement little-endian bytes plus a width tag.
///
/// The tag may name a floating format when raw float bytes are being moved
/// or tested through integer paths; only `size()` matters then.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntValue {
    bytes: [u8; MAX_VALUE_BYTES],
    ty: DataType,
}

impl IntValue {
    /// Builds a value from raw bytes, truncating or zero-padding to the
    /// tag's size.
    #[must_use]
    pub fn from_bytes(src: &[u8], ty: DataType) -> Self {
        let mut bytes = [0u8; MAX_VALUE_BYTES];
        let n = ty.size().min(src.len());
        bytes[..n].copy_from_slice(&src[..n]);
        Self { bytes, ty }
    }

    /// Builds a value from a host integer, sign-extending or truncating to
    /// the tag's width.
    #[must_use]
    pub fn from_i64(val: i64, ty: DataType) -> Self {
        let mut bytes = [0u8; MAX_VALUE_BYTES];
        bytes[..8].copy_from_slice(&val.to_le_bytes());
        if val < 0 {
            bytes[8..].fill(0xff);
        }
        Self { bytes, ty }
    }

    /// Builds a longword-or-narrower value from a host `i32`.
    #[must_use]
    pub fn from_i32(val: i32, ty: DataType) -> Self {
        Self::from_i64(i64::from(val), ty)
    }

    /// Builds a longword value (the stack/pointer width).
    #[must_use]
    pub fn longword(val: i32) -> Self {
        Self::from_i32(val, DataType::L)
    }

    /// Returns the value's visible bytes (length equals the tag size).
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.ty.size()]
    }

    /// Returns the width/format tag.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.ty
    }

    /// Returns the width in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.ty.size()
    }

    /// Signed 32-bit view: narrow widths sign-extend, wider widths
    /// truncate to the low longword.
    #[must_use]
    pub fn sint(&self) -> i32 {
        match self.ty.size() {
            1 => i32::from(self.bytes[0] as i8),
            2 => i32::from(i16::from_le_bytes([self.bytes[0], self.bytes[1]])),
            _ => i32::from_le_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]]),
        }
    }

    /// Unsigned 32-bit view, masked to the tag width.
    #[must_use]
    pub fn uint(&self) -> u32 {
        let raw = self.sint() as u32;
        match self.ty.size() {
            1 => raw & 0xff,
            2 => raw & 0xffff,
            _ => raw,
        }
    }

    /// Signed 64-bit view: narrow widths sign-extend, the octaword
    /// truncates to the low quadword.
    #[must_use]
    pub fn slong(&self) -> i64 {
        match self.ty.size() {
            1 => i64::from(self.bytes[0] as i8),
            2 => i64::from(i16::from_le_bytes([self.bytes[0], self.bytes[1]])),
            4 => i64::from(i32::from_le_bytes([
                self.bytes[0],
                self.bytes[1],
                self.bytes[2],
                self.bytes[3],
            ])),
            _ => {
                let mut le = [0u8; 8];
                le.copy_from_slice(&self.bytes[..8]);
                i64::from_le_bytes(le)
            }
        }
    }

    /// Returns the value with every byte inverted.
    #[must_use]
    pub fn bit_invert(&self) -> Self {
        let mut bytes = [0u8; MAX_VALUE_BYTES];
        for (dst, src) in bytes.iter_mut().zip(self.bytes.iter()) {
            *dst = !src;
        }
        Self { bytes, ty: self.ty }
    }

    /// Sign bit of the top byte.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.bytes[self.ty.size() - 1] & 0x80 != 0
    }

    /// `true` when every byte is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.bytes().iter().all(|&b| b == 0)
    }

    /// `true` for the one value with no positive two's-complement
    /// counterpart: `0x80` in the top byte, zero elsewhere.
    #[must_use]
    pub fn is_largest_negative(&self) -> bool {
        let n = self.ty.size();
        self.bytes[n - 1] == 0x80 && self.bytes[..n - 1].iter().all(|&b| b == 0)
    }

    /// Hex rendering, most significant byte first.
    #[must_use]
    pub fn hex_string(&self) -> String {
        let mut out = String::from("0x");
        for b in self.bytes().iter().rev() {
            out.push_str(&format!("{b:02x}"));
        }
        out
    }
}

/// Floating value in one of the four VAX formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatValue {
    bytes: [u8; MAX_VALUE_BYTES],
    ty: DataType,
}

impl FloatValue {
    /// Builds a value from raw bytes, truncating or zero-padding to the
    /// format's size. `ty` must be one of the floating formats.
    #[must_use]
    pub fn from_bytes(src: &[u8], ty: DataType) -> Self {
        debug_assert!(ty.is_float());
        let mut bytes = [0u8; MAX_VALUE_BYTES];
        let n = ty.size().min(src.len());
        bytes[..n].copy_from_slice(&src[..n]);
        Self { bytes, ty }
    }

    /// Converts a host double into the target format's layout.
    ///
    /// The host sign, unbiased exponent, and 52-bit significand are
    /// extracted and re-packed with the format's own bias and field
    /// positions. Zero maps to the all-zero pattern in every format.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_f64(val: f64, ty: DataType) -> Self {
        debug_assert!(ty.is_float());
        if val == 0.0 {
            return Self {
                bytes: [0u8; MAX_VALUE_BYTES],
                ty,
            };
        }

        let bits = val.to_bits();
        let sign = bits >> 63;
        let src_exponent = ((bits >> 52 & 0x7ff) as i64) - 1023;
        let significand = bits & 0xf_ffff_ffff_ffff;

        let mut bytes = [0u8; MAX_VALUE_BYTES];
        match ty {
            DataType::F => {
                let fexp = (src_exponent + 1 + 128) as u64 & 0xff;
                let fval = (sign << 15
                    | fexp << 7
                    | significand >> 45 & 0x7f
                    | significand >> 13 & 0xffff_0000) as u32;
                bytes[..4].copy_from_slice(&fval.to_le_bytes());
            }
            DataType::D => {
                let dexp = (src_exponent + 1 + 128) as u64 & 0xff;
                let dval = sign << 15
                    | dexp << 7
                    | significand >> 45 & 0x7f
                    | significand >> 13 & 0xffff_0000
                    | significand << 19 & 0xffff_0000_0000
                    | significand << 51 & 0xffff_0000_0000_0000;
                bytes[..8].copy_from_slice(&dval.to_le_bytes());
            }
            DataType::G => {
                let gexp = (src_exponent + 1 + 1024) as u64 & 0x7ff;
                let gval = sign << 15
                    | gexp << 4
                    | significand >> 48 & 0xf
                    | significand >> 16 & 0xffff_0000
                    | significand << 16 & 0xffff_0000_0000
                    | significand << 48 & 0xffff_0000_0000_0000;
                bytes[..8].copy_from_slice(&gval.to_le_bytes());
            }
            _ => {
                let hexp = (src_exponent + 1 + 16384) as u64 & 0x7fff;
                let hlower = sign << 15
                    | hexp
                    | significand >> 20 & 0xffff_0000
                    | significand << 12 & 0xffff_0000_0000
                    | significand << 44 & 0xffff_0000_0000_0000;
                let hupper = significand << 12 & 0xffff;
                bytes[..8].copy_from_slice(&hlower.to_le_bytes());
                bytes[8..16].copy_from_slice(&hupper.to_le_bytes());
            }
        }
        Self { bytes, ty }
    }

    /// Returns the value's visible bytes (length equals the format size).
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.ty.size()]
    }

    /// Returns the format tag.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.ty
    }

    /// Sign bit (bit 15 of the first word in every format).
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        self.bytes[1] & 0x80 != 0
    }

    /// `true` when the exponent field is zero, which every format defines
    /// as the value zero regardless of the significand bits.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        let word = u16::from_le_bytes([self.bytes[0], self.bytes[1]]);
        let exponent = match self.ty {
            DataType::F | DataType::D => word >> 7 & 0xff,
            DataType::G => word >> 4 & 0x7ff,
            _ => word & 0x7fff,
        };
        exponent == 0
    }

    /// The reserved pattern: sign set with a zero exponent field. The
    /// formats have no signed zero, so this value is unrepresentable and
    /// operating on it is a fault.
    #[must_use]
    pub fn is_minus_zero(&self) -> bool {
        self.is_negative() && self.is_zero()
    }

    /// Negation: flips the sign bit unless the value is zero (zero stays
    /// the clean unsigned pattern). The negative-zero pattern faults.
    pub fn negated(&self) -> Result<Self, Fault> {
        if self.is_minus_zero() {
            return Err(Fault::ReservedOperand(ReservedOperandKind::FloatNegativeZero));
        }
        let mut bytes = self.bytes;
        if !self.is_zero() {
            bytes[1] ^= 0x80;
        }
        Ok(Self { bytes, ty: self.ty })
    }

    /// Hex rendering, most significant byte first.
    #[must_use]
    pub fn hex_string(&self) -> String {
        let mut out = String::from("0x");
        for b in self.bytes().iter().rev() {
            out.push_str(&format!("{b:02x}"));
        }
        out
    }
}

/// A typed value as loaded from a register, memory, or the instruction
/// stream; the subtype follows the width/format tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    /// Integer subtype.
    Int(IntValue),
    /// Floating subtype.
    Float(FloatValue),
}

impl Value {
    /// Builds the subtype matching `ty` from raw bytes.
    #[must_use]
    pub fn from_raw(src: &[u8], ty: DataType) -> Self {
        if ty.is_float() {
            Self::Float(FloatValue::from_bytes(src, ty))
        } else {
            Self::Int(IntValue::from_bytes(src, ty))
        }
    }

    /// Returns the visible bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Int(v) => v.bytes(),
            Self::Float(v) => v.bytes(),
        }
    }

    /// Returns the width/format tag.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Int(v) => v.data_type(),
            Self::Float(v) => v.data_type(),
        }
    }

    /// Sign test dispatched to the subtype's rule.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        match self {
            Self::Int(v) => v.is_negative(),
            Self::Float(v) => v.is_negative(),
        }
    }

    /// Zero test dispatched to the subtype's rule.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Int(v) => v.is_zero(),
            Self::Float(v) => v.is_zero(),
        }
    }

    /// Reinterprets the payload bytes as an integer value of the same
    /// size, regardless of subtype.
    #[must_use]
    pub fn as_int(&self) -> IntValue {
        match self {
            Self::Int(v) => *v,
            Self::Float(v) => IntValue::from_bytes(v.bytes(), v.data_type()),
        }
    }

    /// Reinterprets the payload bytes as a float of format `ty`.
    #[must_use]
    pub fn as_float(&self, ty: DataType) -> FloatValue {
        match self {
            Self::Float(v) if v.data_type() == ty => *v,
            other => FloatValue::from_bytes(other.bytes(), ty),
        }
    }

    /// Hex rendering, most significant byte first.
    #[must_use]
    pub fn hex_string(&self) -> String {
        match self {
            Self::Int(v) => v.hex_string(),
            Self::Float(v) => v.hex_string(),
        }
    }
}

impl From<IntValue> for Value {
    fn from(v: IntValue) -> Self {
        Self::Int(v)
    }
}

impl From<FloatValue> for Value {
    fn from(v: FloatValue) -> Self {
        Self::Float(v)
    }
}
