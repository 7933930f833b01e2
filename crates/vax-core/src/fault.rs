//! Runtime fault taxonomy for the interpreter core.
//!
//! Faults that indicate a corrupted or unsupported instruction stream
//! terminate the virtual processor's step loop; arithmetic conditions are
//! reported through condition codes only and never appear here.

use thiserror::Error;

/// Precondition violations the hardware reports as a reserved-operand fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ReservedOperandKind {
    /// Bit-field position outside `0..=31` for a register-resident field.
    FieldPosition,
    /// Bit-field size greater than 32.
    FieldSize,
    /// Packed-decimal string with a sign nibble outside the defined codes.
    PackedSign,
    /// Packed-decimal source longer than 31 digits.
    PackedLength,
    /// Edit-pattern stream violated the pattern interpreter's contract.
    EditPattern,
    /// Floating negation applied to the negative-zero bit pattern.
    FloatNegativeZero,
}

/// Faults raised while fetching, decoding, or executing one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Fault {
    /// Opcode bytes match no catalog entry. Carries the raw byte pair.
    #[error("illegal instruction 0x{raw:04x}")]
    IllegalOpcode {
        /// Raw opcode bytes as accumulated by the two-byte fetch.
        raw: u16,
    },
    /// Fetch or operand resolution ran past the loaded program text.
    #[error("instruction stream ran past end of program text")]
    EndOfText,
    /// Operand value violates a hardware precondition.
    #[error("reserved operand ({0:?})")]
    ReservedOperand(ReservedOperandKind),
    /// Addressing mode is not legal for the access the instruction needs,
    /// e.g. taking the address of a register operand or storing through a
    /// short literal.
    #[error("reserved addressing mode")]
    ReservedAddressingMode,
    /// Address fell outside the flat buffer after high-alias mapping.
    #[error("address 0x{addr:08x} outside mapped memory")]
    AddressOutOfRange {
        /// The unmapped virtual address.
        addr: u32,
    },
}

impl Fault {
    /// Returns `true` for faults that indicate the instruction stream itself
    /// is bad, as opposed to a data-dependent operand condition.
    #[must_use]
    pub const fn is_stream_fault(self) -> bool {
        matches!(self, Self::IllegalOpcode { .. } | Self::EndOfText)
    }
}

#[cfg(test)]
mod tests {
    use super::{Fault, ReservedOperandKind};

    #[test]
    fn stream_faults_are_classified() {
        assert!(Fault::IllegalOpcode { raw: 0xfdff }.is_stream_fault());
        assert!(Fault::EndOfText.is_stream_fault());
        assert!(!Fault::ReservedOperand(ReservedOperandKind::FieldSize).is_stream_fault());
        assert!(!Fault::AddressOutOfRange { addr: 0x1000 }.is_stream_fault());
    }

    #[test]
    fn illegal_opcode_reports_raw_bytes() {
        let text = Fault::IllegalOpcode { raw: 0xfd0a }.to_string();
        assert!(text.contains("0xfd0a"));
    }
}
