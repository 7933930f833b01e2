//! The instruction catalog and opcode fetch.
//!
//! Opcodes are one byte, or two when the first byte is the 0xFD escape;
//! the fetch accumulates bytes little-endian and matches against the
//! catalog after each one. Every record names the operand type list the
//! resolver consumes and the strategy that executes the instruction.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::exec::{self, ExecFn};
use crate::fault::Fault;
use crate::state::Cpu;
use crate::value::DataType;

/// One instruction record.
#[derive(Clone, Copy)]
pub struct Op {
    /// Accumulated opcode bytes (two-byte forms carry the escape in the
    /// low byte).
    pub opcode: u16,
    /// Assembler mnemonic.
    pub mnemonic: &'static str,
    /// Operand type list, in specifier order.
    pub operands: &'static [DataType],
    pub(crate) exec: ExecFn,
}

impl std::fmt::Debug for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Op")
            .field("opcode", &self.opcode)
            .field("mnemonic", &self.mnemonic)
            .field("operands", &self.operands)
            .finish()
    }
}

macro_rules! catalog {
    ($($bin:literal $mnemonic:ident ($exec:path $(, $ty:ident)*);)*) => {
        static CATALOG: &[Op] = &[
            $(Op {
                opcode: $bin,
                mnemonic: stringify!($mnemonic),
                operands: &[$(DataType::$ty),*],
                exec: $exec,
            },)*
        ];
    };
}

catalog! {
    0x01 nop (exec::nop);

    0x90 movb (exec::data::mov, B, B);
    0xb0 movw (exec::data::mov, W, W);
    0xd0 movl (exec::data::mov, L, L);
    0x7d movq (exec::data::mov, Q, Q);
    0x7dfd movo (exec::data::mov, O, O);
    0x50 movf (exec::data::mov, F, F);
    0x70 movd (exec::data::mov, D, D);
    0x50fd movg (exec::data::mov, G, G);
    0x70fd movh (exec::data::mov, H, H);

    0x9b movzbw (exec::data::movz, B, W);
    0x9a movzbl (exec::data::movz, B, L);
    0x3c movzwl (exec::data::movz, W, L);

    0xdd pushl (exec::data::pushl, L);

    0x9e movab (exec::data::mova, B, L);
    0x3e movaw (exec::data::mova, W, L);
    0xde moval (exec::data::mova, L, L);
    0x7e movaq (exec::data::mova, Q, L);
    0x7efd movao (exec::data::mova, O, L);

    0x9f pushab (exec::data::pusha, B);
    0x3f pushaw (exec::data::pusha, W);
    0xdf pushal (exec::data::pusha, L);
    0x7f pushaq (exec::data::pusha, Q);
    0x7ffd pushao (exec::data::pusha, O);

    0x92 mcomb (exec::data::mcom, B, B);
    0xb2 mcomw (exec::data::mcom, W, W);
    0xd2 mcoml (exec::data::mcom, L, L);

    0x8e mnegb (exec::data::mneg, B, B);
    0xae mnegw (exec::data::mneg, W, W);
    0xce mnegl (exec::data::mneg, L, L);

    0x52 mnegf (exec::data::fmneg, F, F);
    0x72 mnegd (exec::data::fmneg, D, D);
    0x52fd mnegg (exec::data::fmneg, G, G);
    0x72fd mnegh (exec::data::fmneg, H, H);

    0x80 addb2 (exec::alu::add, B, B);
    0x81 addb3 (exec::alu::add, B, B, B);
    0xa0 addw2 (exec::alu::add, W, W);
    0xa1 addw3 (exec::alu::add, W, W, W);
    0xc0 addl2 (exec::alu::add, L, L);
    0xc1 addl3 (exec::alu::add, L, L, L);

    0x82 subb2 (exec::alu::sub, B, B);
    0x83 subb3 (exec::alu::sub, B, B, B);
    0xa2 subw2 (exec::alu::sub, W, W);
    0xa3 subw3 (exec::alu::sub, W, W, W);
    0xc2 subl2 (exec::alu::sub, L, L);
    0xc3 subl3 (exec::alu::sub, L, L, L);

    0x84 mulb2 (exec::alu::mul, B, B);
    0x85 mulb3 (exec::alu::mul, B, B, B);
    0xa4 mulw2 (exec::alu::mul, W, W);
    0xa5 mulw3 (exec::alu::mul, W, W, W);
    0xc4 mull2 (exec::alu::mul, L, L);
    0xc5 mull3 (exec::alu::mul, L, L, L);

    0x86 divb2 (exec::alu::div, B, B);
    0x87 divb3 (exec::alu::div, B, B, B);
    0xa6 divw2 (exec::alu::div, W, W);
    0xa7 divw3 (exec::alu::div, W, W, W);
    0xc6 divl2 (exec::alu::div, L, L);
    0xc7 divl3 (exec::alu::div, L, L, L);

    0x93 bitb (exec::alu::bit, B, B);
    0xb3 bitw (exec::alu::bit, W, W);
    0xd3 bitl (exec::alu::bit, L, L);

    0x88 bisb2 (exec::alu::bis, B, B);
    0x89 bisb3 (exec::alu::bis, B, B, B);
    0xa8 bisw2 (exec::alu::bis, W, W);
    0xa9 bisw3 (exec::alu::bis, W, W, W);
    0xc8 bisl2 (exec::alu::bis, L, L);
    0xc9 bisl3 (exec::alu::bis, L, L, L);

    0x8a bicb2 (exec::alu::bic, B, B);
    0x8b bicb3 (exec::alu::bic, B, B, B);
    0xaa bicw2 (exec::alu::bic, W, W);
    0xab bicw3 (exec::alu::bic, W, W, W);
    0xca bicl2 (exec::alu::bic, L, L);
    0xcb bicl3 (exec::alu::bic, L, L, L);

    0x8c xorb2 (exec::alu::xor, B, B);
    0x8d xorb3 (exec::alu::xor, B, B, B);
    0xac xorw2 (exec::alu::xor, W, W);
    0xad xorw3 (exec::alu::xor, W, W, W);
    0xcc xorl2 (exec::alu::xor, L, L);
    0xcd xorl3 (exec::alu::xor, L, L, L);

    0x94 clrb (exec::data::clr, B);
    0xb4 clrw (exec::data::clr, W);
    0xd4 clrl (exec::data::clr, L);
    0x7c clrq (exec::data::clr, Q);
    0x7cfd clro (exec::data::clr, O);

    0x96 incb (exec::alu::inc, B);
    0xb6 incw (exec::alu::inc, W);
    0xd6 incl (exec::alu::inc, L);

    0x97 decb (exec::alu::dec, B);
    0xb7 decw (exec::alu::dec, W);
    0xd7 decl (exec::alu::dec, L);

    0x78 ashl (exec::alu::ash, B, L, L);
    0x79 ashq (exec::alu::ash, B, Q, Q);

    0x95 tstb (exec::data::tst, B);
    0xb5 tstw (exec::data::tst, W);
    0xd5 tstl (exec::data::tst, L);
    0x53 tstf (exec::data::tst, F);
    0x73 tstd (exec::data::tst, D);
    0x53fd tstg (exec::data::tst, G);
    0x73fd tsth (exec::data::tst, H);

    0x91 cmpb (exec::data::cmp, B, B);
    0xb1 cmpw (exec::data::cmp, W, W);
    0xd1 cmpl (exec::data::cmp, L, L);

    0xee extv (exec::field::extv, L, B, B, L);
    0xef extzv (exec::field::extzv, L, B, B, L);
    0xf0 insv (exec::field::insv, L, L, B, B);

    0x17 jmp (exec::branch::jmp, B);
    0x11 brb (exec::branch::br, BrB);
    0x31 brw (exec::branch::br, BrW);
    0x12 bneq (exec::branch::bneq, BrB);
    0x13 beql (exec::branch::beql, BrB);
    0x14 bgtr (exec::branch::bgtr, BrB);
    0x15 bleq (exec::branch::bleq, BrB);
    0x18 bgeq (exec::branch::bgeq, BrB);
    0x19 blss (exec::branch::blss, BrB);
    0x1a bgtru (exec::branch::bgtru, BrB);
    0x1b blequ (exec::branch::blequ, BrB);
    0x1c bvc (exec::branch::bvc, BrB);
    0x1d bvs (exec::branch::bvs, BrB);
    0x1e bcc (exec::branch::bcc, BrB);
    0x1f blssu (exec::branch::blssu, BrB);

    0xe0 bbs (exec::field::bbs, L, B, BrB);
    0xe1 bbc (exec::field::bbc, L, B, BrB);
    0xe2 bbss (exec::field::bbss, L, B, BrB);
    0xe3 bbcs (exec::field::bbcs, L, B, BrB);
    0xe4 bbsc (exec::field::bbsc, L, B, BrB);
    0xe5 bbcc (exec::field::bbcc, L, B, BrB);
    0xe6 bbssi (exec::field::bbss, L, B, BrB);
    0xe7 bbcci (exec::field::bbcc, L, B, BrB);

    0xe8 blbs (exec::field::blbs, L, BrB);
    0xe9 blbc (exec::field::blbc, L, BrB);

    0xfa callg (exec::call::callg, B, B);
    0xfb calls (exec::call::calls, L, B);
    0x04 ret (exec::call::ret);
    0xbc chmk (exec::call::chmk, W);

    0x8f caseb (exec::branch::case, B, B, B);
    0xaf casew (exec::branch::case, W, W, W);
    0xcf casel (exec::branch::case, L, L, L);

    0xf2 aoblss (exec::branch::aoblss, L, L, BrB);
    0xf3 aobleq (exec::branch::aobleq, L, L, BrB);
    0xf4 sobgeq (exec::branch::sobgeq, L, BrB);
    0xf5 sobgtr (exec::branch::sobgtr, L, BrB);

    0x99 cvtbw (exec::data::cvt, B, W);
    0x98 cvtbl (exec::data::cvt, B, L);
    0x33 cvtwb (exec::data::cvt, W, B);
    0x32 cvtwl (exec::data::cvt, W, L);
    0xf6 cvtlb (exec::data::cvt, L, B);
    0xf7 cvtlw (exec::data::cvt, L, W);

    0xf9 cvtlp (exec::decimal::cvtlp, L, W, B);

    0x9d acbb (exec::branch::acb, B, B, B, BrW);
    0x3d acbw (exec::branch::acb, W, W, W, BrW);
    0xf1 acbl (exec::branch::acb, L, L, L, BrW);

    0x28 movc3 (exec::string::movc, W, B, B);
    0x2c movc5 (exec::string::movc, W, B, B, W, B);
    0x29 cmpc3 (exec::string::cmpc, W, B, B);
    0x2d cmpc5 (exec::string::cmpc, W, B, B, W, B);
    0x3a locc (exec::string::locc, B, W, B);
    0x3b skpc (exec::string::skpc, B, W, B);

    0x34 movp (exec::decimal::movp, W, B, B);
    0x38 editpc (exec::decimal::editpc, W, B, B, B);
}

fn table() -> &'static HashMap<u16, &'static Op> {
    static MAP: OnceLock<HashMap<u16, &'static Op>> = OnceLock::new();
    MAP.get_or_init(|| CATALOG.iter().map(|op| (op.opcode, op)).collect())
}

/// Looks up a catalog record by its accumulated opcode.
#[must_use]
pub fn lookup(opcode: u16) -> Option<&'static Op> {
    table().get(&opcode).copied()
}

/// Fetches the next opcode from the instruction stream. Unmatched byte
/// pairs report the accumulated raw value.
pub(crate) fn fetch(cpu: &mut Cpu) -> Result<&'static Op, Fault> {
    let mut raw: u16 = 0;
    for i in 0..2 {
        let byte = cpu.fetch_byte()?;
        raw |= u16::from(byte) << (i * 8);
        if let Some(op) = lookup(raw) {
            return Ok(op);
        }
    }
    Err(Fault::IllegalOpcode { raw })
}

#[cfg(test)]
mod tests {
    use super::{fetch, lookup, CATALOG};
    use crate::fault::Fault;
    use crate::image::AoutImage;
    use crate::state::Cpu;
    use crate::value::DataType;

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
    fn catalog_has_no_duplicate_opcodes() {
        let mut seen = std::collections::HashSet::new();
        for op in CATALOG {
            assert!(seen.insert(op.opcode), "duplicate 0x{:04x}", op.opcode);
        }
    }

    #[test]
    fn single_byte_opcodes_match_after_one_byte() {
        let mut cpu = cpu_with_text(&[0xd0, 0x01, 0x50]);
        let op = fetch(&mut cpu).expect("fetch");
        assert_eq!(op.mnemonic, "movl");
        assert_eq!(op.operands, &[DataType::L, DataType::L]);
        assert_eq!(cpu.pc(), 1);
    }

    #[test]
    fn escape_prefix_selects_the_two_byte_page() {
        let mut cpu = cpu_with_text(&[0xfd, 0x50]);
        let op = fetch(&mut cpu).expect("fetch");
        assert_eq!(op.mnemonic, "movg");
        assert_eq!(op.opcode, 0x50fd);
        assert_eq!(cpu.pc(), 2);
    }

    #[test]
    fn unmatched_pair_reports_the_raw_bytes() {
        let mut cpu = cpu_with_text(&[0xfd, 0xff]);
        assert_eq!(
            fetch(&mut cpu).unwrap_err(),
            Fault::IllegalOpcode { raw: 0xfffd }
        );
    }

    #[test]
    fn running_off_text_is_end_of_text() {
        let mut cpu = cpu_with_text(&[]);
        assert_eq!(fetch(&mut cpu).unwrap_err(), Fault::EndOfText);
    }

    #[test]
    fn lookup_by_raw_opcode() {
        assert_eq!(lookup(0xbc).expect("chmk").mnemonic, "chmk");
        assert!(lookup(0xffff).is_none());
    }
}
