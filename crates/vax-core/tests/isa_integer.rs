//! Integer instruction coverage: data movement, arithmetic, logicals,
//! shifts, conversions, and bit fields, executed through the full
//! fetch/decode/execute path.

#![allow(
    clippy::pedantic,
    clippy::nursery,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use proptest::prelude::*;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

use vax_core::{
    errno, step, AoutImage, Cpu, Fault, Flag, ReservedOperandKind, StepOutcome, SyscallEntry,
    SyscallOutcome, TrapService,
};

struct NoService;

impl TrapService for NoService {
    fn syscall(&mut self, _entry: &SyscallEntry, _args: &[i32], _cpu: &mut Cpu) -> SyscallOutcome {
        SyscallOutcome::Error(errno::EINVAL)
    }
}

fn boot(text: &[u8]) -> Cpu {
    let mut cpu = Cpu::new();
    cpu.load(&AoutImage {
        text: text.to_vec(),
        data: Vec::new(),
        bss_size: 0,
    });
    cpu.set_pc(0);
    cpu
}

fn exec(cpu: &mut Cpu) -> StepOutcome {
    step(cpu, &mut NoService).expect("step")
}

fn flags(cpu: &Cpu) -> (bool, bool, bool, bool) {
    (
        cpu.flag(Flag::N),
        cpu.flag(Flag::Z),
        cpu.flag(Flag::V),
        cpu.flag(Flag::C),
    )
}

#[test]
fn movb_merges_into_the_register_low_byte() {
    // movb $0x5, r0
    let mut cpu = boot(&[0x90, 0x05, 0x50]);
    cpu.set_reg(0, 0xffff_ff00);
    exec(&mut cpu);
    assert_eq!(cpu.reg(0), 0xffff_ff05);
    assert_eq!(flags(&cpu), (false, false, false, false));
}

#[test]
fn movw_immediate_sets_n_from_the_word_sign() {
    // movw $0x8000, r2
    let mut cpu = boot(&[0xb0, 0x8f, 0x00, 0x80, 0x52]);
    exec(&mut cpu);
    assert_eq!(cpu.reg(2) & 0xffff, 0x8000);
    assert!(cpu.flag(Flag::N));
    assert!(!cpu.flag(Flag::Z));
}

#[test]
fn movq_spans_a_register_pair() {
    // movq $-1, r4
    let mut cpu = boot(&[
        0x7d, 0x8f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x54,
    ]);
    exec(&mut cpu);
    assert_eq!(cpu.reg(4), 0xffff_ffff);
    assert_eq!(cpu.reg(5), 0xffff_ffff);
    assert!(cpu.flag(Flag::N));
}

#[test]
fn mov_keeps_carry_and_clears_v() {
    // movl $1, r0
    let mut cpu = boot(&[0xd0, 0x01, 0x50]);
    cpu.set_flag(Flag::C, true);
    cpu.set_flag(Flag::V, true);
    exec(&mut cpu);
    assert_eq!(flags(&cpu), (false, false, false, true));
}

#[test]
fn addl3_adds_registers_into_a_third() {
    // addl3 r0, r1, r2
    let mut cpu = boot(&[0xc1, 0x50, 0x51, 0x52]);
    cpu.set_reg(0, 70);
    cpu.set_reg(1, 30);
    exec(&mut cpu);
    assert_eq!(cpu.reg(2), 100);
    assert_eq!(flags(&cpu), (false, false, false, false));
}

#[test]
fn addl2_signed_overflow_sets_v() {
    // addl2 r0, r1
    let mut cpu = boot(&[0xc0, 0x50, 0x51]);
    cpu.set_reg(0, 1);
    cpu.set_reg(1, 0x7fff_ffff);
    exec(&mut cpu);
    assert_eq!(cpu.reg(1), 0x8000_0000);
    assert_eq!(flags(&cpu), (true, false, true, false));
}

#[test]
fn subl2_subtracts_the_first_operand_from_the_second() {
    // subl2 r0, r1
    let mut cpu = boot(&[0xc2, 0x50, 0x51]);
    cpu.set_reg(0, 3);
    cpu.set_reg(1, 10);
    exec(&mut cpu);
    assert_eq!(cpu.reg(1), 7);
    assert!(!cpu.flag(Flag::C));
}

#[test]
fn subb3_borrow_sets_carry_at_byte_width() {
    // subb3 r0, r1, r2
    let mut cpu = boot(&[0x83, 0x50, 0x51, 0x52]);
    cpu.set_reg(0, 1);
    cpu.set_reg(1, 0);
    exec(&mut cpu);
    assert_eq!(cpu.reg(2) & 0xff, 0xff);
    assert_eq!(flags(&cpu), (true, false, false, true));
}

#[test]
fn mull2_reports_a_dropped_high_half_in_v() {
    // mull2 r0, r1
    let mut cpu = boot(&[0xc4, 0x50, 0x51]);
    cpu.set_reg(0, 0x10000);
    cpu.set_reg(1, 0x10000);
    exec(&mut cpu);
    assert_eq!(cpu.reg(1), 0);
    assert_eq!(flags(&cpu), (false, true, true, false));
}

#[test]
fn divl3_stores_the_truncated_quotient() {
    // divl3 r0, r1, r2
    let mut cpu = boot(&[0xc7, 0x50, 0x51, 0x52]);
    cpu.set_reg(0, 2);
    cpu.set_reg(1, (-7i32) as u32);
    exec(&mut cpu);
    assert_eq!(cpu.reg(2) as i32, -3);
    assert_eq!(flags(&cpu), (true, false, false, false));
}

#[test]
fn divl3_by_zero_stores_the_dividend_with_v_set() {
    // divl3 r0, r1, r2
    let mut cpu = boot(&[0xc7, 0x50, 0x51, 0x52]);
    cpu.set_reg(0, 0);
    cpu.set_reg(1, 41);
    exec(&mut cpu);
    assert_eq!(cpu.reg(2), 41);
    assert_eq!(flags(&cpu), (false, false, true, false));
}

#[test]
fn bicl2_clears_the_mask_bits() {
    // bicl2 r0, r1
    let mut cpu = boot(&[0xca, 0x50, 0x51]);
    cpu.set_reg(0, 0x0000_ff00);
    cpu.set_reg(1, 0x1234_5678);
    exec(&mut cpu);
    assert_eq!(cpu.reg(1), 0x1234_0078);
}

#[test]
fn bitl_sets_flags_without_writing() {
    // bitl r0, r1
    let mut cpu = boot(&[0xd3, 0x50, 0x51]);
    cpu.set_reg(0, 0x0f);
    cpu.set_reg(1, 0xf0);
    exec(&mut cpu);
    assert_eq!(cpu.reg(1), 0xf0);
    assert!(cpu.flag(Flag::Z));
}

#[test]
fn xorb2_works_at_byte_width() {
    // xorb2 r0, r1
    let mut cpu = boot(&[0x8c, 0x50, 0x51]);
    cpu.set_reg(0, 0xff);
    cpu.set_reg(1, 0xaaaa_aa0f);
    exec(&mut cpu);
    assert_eq!(cpu.reg(1), 0xaaaa_aaf0);
    assert!(cpu.flag(Flag::N));
}

#[test]
fn incb_wraps_with_carry_and_zero() {
    // incb r0
    let mut cpu = boot(&[0x96, 0x50]);
    cpu.set_reg(0, 0xff);
    exec(&mut cpu);
    assert_eq!(cpu.reg(0) & 0xff, 0);
    assert_eq!(flags(&cpu), (false, true, false, true));
}

#[test]
fn decl_borrows_through_zero() {
    // decl r0
    let mut cpu = boot(&[0xd7, 0x50]);
    cpu.set_reg(0, 0);
    exec(&mut cpu);
    assert_eq!(cpu.reg(0), 0xffff_ffff);
    assert_eq!(flags(&cpu), (true, false, false, true));
}

#[test]
fn ashl_left_and_right_shifts() {
    // ashl $4, r1, r2
    let mut cpu = boot(&[0x78, 0x04, 0x51, 0x52]);
    cpu.set_reg(1, 0x10);
    exec(&mut cpu);
    assert_eq!(cpu.reg(2), 0x100);

    // ashl $-3, r1, r2 (count via register to go negative)
    let mut cpu = boot(&[0x78, 0x50, 0x51, 0x52]);
    cpu.set_reg(0, (-3i32) as u32);
    cpu.set_reg(1, (-64i32) as u32);
    exec(&mut cpu);
    assert_eq!(cpu.reg(2) as i32, -8);
    assert!(cpu.flag(Flag::N));
}

#[test]
fn ashl_shift_past_the_width_produces_zero_with_v() {
    // ashl $33, r1, r2
    let mut cpu = boot(&[0x78, 0x21, 0x51, 0x52]);
    cpu.set_reg(1, 0x8000_0000);
    exec(&mut cpu);
    assert_eq!(cpu.reg(2), 0);
    assert!(cpu.flag(Flag::Z));
    // Sign changed from negative to zero.
    assert!(cpu.flag(Flag::V));
}

#[test]
fn movzbl_widens_without_sign_extension() {
    // movzbl r0, r1
    let mut cpu = boot(&[0x9a, 0x50, 0x51]);
    cpu.set_reg(0, 0x80);
    cpu.set_reg(1, 0xffff_ffff);
    exec(&mut cpu);
    assert_eq!(cpu.reg(1), 0x80);
    assert_eq!(flags(&cpu), (false, false, false, false));
}

#[test]
fn cvtlb_narrowing_sign_flip_sets_v() {
    // cvtlb r0, r1
    let mut cpu = boot(&[0xf6, 0x50, 0x51]);
    cpu.set_reg(0, 128);
    exec(&mut cpu);
    assert_eq!(cpu.reg(1) & 0xff, 0x80);
    assert_eq!(flags(&cpu), (true, false, true, false));
}

#[test]
fn cvtbw_sign_extends() {
    // cvtbw r0, r1
    let mut cpu = boot(&[0x99, 0x50, 0x51]);
    cpu.set_reg(0, 0xfe);
    exec(&mut cpu);
    assert_eq!(cpu.reg(1) & 0xffff, 0xfffe);
    assert!(cpu.flag(Flag::N));
    assert!(!cpu.flag(Flag::V));
}

#[test]
fn mnegb_of_the_most_negative_byte_overflows() {
    // mnegb r0, r1
    let mut cpu = boot(&[0x8e, 0x50, 0x51]);
    cpu.set_reg(0, 0x80);
    exec(&mut cpu);
    assert_eq!(cpu.reg(1) & 0xff, 0x80);
    assert!(cpu.flag(Flag::V));
    assert!(cpu.flag(Flag::C));
}

#[test]
fn mcoml_complements_and_clears_carry() {
    // mcoml r0, r1
    let mut cpu = boot(&[0xd2, 0x50, 0x51]);
    cpu.set_reg(0, 0x0000_ffff);
    cpu.set_flag(Flag::C, true);
    exec(&mut cpu);
    assert_eq!(cpu.reg(1), 0xffff_0000);
    assert_eq!(flags(&cpu), (true, false, false, false));
}

#[test]
fn cmpl_signed_and_unsigned_views_disagree() {
    // cmpl r0, r1 with -1 vs 1
    let mut cpu = boot(&[0xd1, 0x50, 0x51]);
    cpu.set_reg(0, (-1i32) as u32);
    cpu.set_reg(1, 1);
    exec(&mut cpu);
    // Signed: -1 < 1 so N; unsigned: 0xffffffff > 1 so no C.
    assert_eq!(flags(&cpu), (true, false, false, false));
}

#[test]
fn tstl_clears_v_and_c() {
    // tstl r0
    let mut cpu = boot(&[0xd5, 0x50]);
    cpu.set_reg(0, 0);
    cpu.set_flag(Flag::C, true);
    exec(&mut cpu);
    assert_eq!(flags(&cpu), (false, true, false, false));
}

#[test]
fn clrq_zeroes_the_pair_and_sets_z() {
    // clrq r4
    let mut cpu = boot(&[0x7c, 0x54]);
    cpu.set_reg(4, 7);
    cpu.set_reg(5, 9);
    exec(&mut cpu);
    assert_eq!((cpu.reg(4), cpu.reg(5)), (0, 0));
    assert!(cpu.flag(Flag::Z));
}

#[test]
fn pushl_and_moval_cooperate_on_the_stack() {
    // pushl r0, then moval (sp), r1
    let mut cpu = boot(&[0xdd, 0x50, 0xde, 0x6e, 0x51]);
    cpu.set_reg(0, 0x1234);
    cpu.set_reg(14, 0x2000);
    exec(&mut cpu);
    assert_eq!(cpu.reg(14), 0x1ffc);
    exec(&mut cpu);
    assert_eq!(cpu.reg(1), 0x1ffc);
}

#[test]
fn extzv_pulls_a_field_out_of_memory() {
    // extzv $4, $8, (r6), r0
    let mut cpu = boot(&[0xef, 0x04, 0x08, 0x66, 0x50]);
    cpu.set_reg(6, 0x1000);
    cpu.memory
        .write(0x1000, &0xabcd_ef12u32.to_le_bytes())
        .expect("seed");
    exec(&mut cpu);
    assert_eq!(cpu.reg(0), 0xf1);
}

#[test]
fn extv_sign_extends_the_field() {
    // extv $4, $8, (r6), r0
    let mut cpu = boot(&[0xee, 0x04, 0x08, 0x66, 0x50]);
    cpu.set_reg(6, 0x1000);
    cpu.memory
        .write(0x1000, &0x0000_0f12u32.to_le_bytes())
        .expect("seed");
    exec(&mut cpu);
    assert_eq!(cpu.reg(0) as i32, i32::from(0xf1u8 as i8));
    assert!(cpu.flag(Flag::N));
}

#[test]
fn field_position_past_31_on_a_register_base_faults() {
    // extzv $32, $1, r3, r0
    let mut cpu = boot(&[0xef, 0x20, 0x01, 0x53, 0x50]);
    let err = step(&mut cpu, &mut NoService).unwrap_err();
    assert_eq!(
        err,
        Fault::ReservedOperand(ReservedOperandKind::FieldPosition)
    );
}

#[test]
fn field_size_past_32_faults() {
    // extzv $0, $33, r3, r0
    let mut cpu = boot(&[0xef, 0x00, 0x21, 0x53, 0x50]);
    let err = step(&mut cpu, &mut NoService).unwrap_err();
    assert_eq!(err, Fault::ReservedOperand(ReservedOperandKind::FieldSize));
}

#[test]
fn insv_replaces_field_bits_and_leaves_flags_alone() {
    // insv r0, $4, $8, (r6)
    let mut cpu = boot(&[0xf0, 0x50, 0x04, 0x08, 0x66]);
    cpu.set_reg(0, 0x5a);
    cpu.set_reg(6, 0x1000);
    cpu.memory
        .write(0x1000, &[0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0])
        .expect("seed");
    cpu.set_flag(Flag::Z, true);
    exec(&mut cpu);
    let mut le = [0u8; 4];
    cpu.memory.read(0x1000, &mut le).expect("read");
    assert_eq!(u32::from_le_bytes(le), 0xffff_f5af);
    assert!(cpu.flag(Flag::Z));
}

#[test]
fn field_position_in_memory_advances_the_base_address() {
    // extzv r1, $8, (r6), r0 with pos 40: the base moves up one byte
    // per 32 positions, leaving bit offset 8 within the new quadword.
    let mut cpu = boot(&[0xef, 0x51, 0x08, 0x66, 0x50]);
    cpu.set_reg(1, 40);
    cpu.set_reg(6, 0x1000);
    cpu.memory
        .write(0x1000, &[0, 0, 0x77, 0, 0, 0, 0, 0, 0, 0, 0, 0])
        .expect("seed");
    exec(&mut cpu);
    assert_eq!(cpu.reg(0), 0x77);
}

proptest! {
    #[test]
    fn movl_immediate_round_trips_any_longword(v in any::<i32>()) {
        let mut text = vec![0xd0, 0x8f];
        text.extend_from_slice(&v.to_le_bytes());
        text.push(0x53);
        let mut cpu = boot(&text);
        exec(&mut cpu);
        prop_assert_eq!(cpu.reg(3) as i32, v);
        prop_assert_eq!(cpu.flag(Flag::N), v < 0);
        prop_assert_eq!(cpu.flag(Flag::Z), v == 0);
    }

    #[test]
    fn addl3_matches_wrapping_addition(a in any::<u32>(), b in any::<u32>()) {
        let mut cpu = boot(&[0xc1, 0x50, 0x51, 0x52]);
        cpu.set_reg(0, a);
        cpu.set_reg(1, b);
        exec(&mut cpu);
        prop_assert_eq!(cpu.reg(2), a.wrapping_add(b));
        prop_assert_eq!(cpu.flag(Flag::C), a.checked_add(b).is_none());
    }
}
