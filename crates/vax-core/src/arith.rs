//! Width-generic integer arithmetic with condition-code side effects.
//!
//! Addition ripples through the value bytes so every width up to the
//! octaword shares one code path. Subtraction runs through the adder on
//! the inverted subtrahend and reports carry in the borrow convention
//! (C set when the unsigned subtraction borrowed). Division refuses to
//! produce a result on divide-by-zero and on the one overflowing
//! quotient; callers decide what the destination receives then.

use crate::state::{Cpu, Flag};
use crate::value::{IntValue, MAX_VALUE_BYTES};

fn add_impl(cpu: &mut Cpu, a: &IntValue, b: &IntValue, carry_in: u32) -> IntValue {
    let n = a.size();
    let mut out = [0u8; MAX_VALUE_BYTES];
    let mut carry = carry_in;
    for i in 0..n {
        let s = u32::from(a.bytes()[i]) + u32::from(b.bytes()[i]) + carry;
        out[i] = (s & 0xff) as u8;
        carry = s >> 8;
    }
    let sum = IntValue::from_bytes(&out, a.data_type());
    cpu.set_flag(Flag::N, sum.is_negative());
    cpu.set_flag(Flag::Z, sum.is_zero());
    cpu.set_flag(
        Flag::V,
        a.is_negative() == b.is_negative() && sum.is_negative() != a.is_negative(),
    );
    cpu.set_flag(Flag::C, carry != 0);
    sum
}

/// `a + b`, setting N/Z/V/C.
pub fn add(cpu: &mut Cpu, a: &IntValue, b: &IntValue) -> IntValue {
    add_impl(cpu, a, b, 0)
}

/// `a - b`, setting N/Z/V and C in the borrow convention.
pub fn sub(cpu: &mut Cpu, a: &IntValue, b: &IntValue) -> IntValue {
    let diff = add_impl(cpu, a, &b.bit_invert(), 1);
    cpu.set_flag(Flag::C, !cpu.flag(Flag::C));
    diff
}

/// `a * b`, truncated to the operand width. V reports a product whose
/// discarded high half is not the sign extension of the kept low half;
/// C always clears.
pub fn mul(cpu: &mut Cpu, a: &IntValue, b: &IntValue) -> IntValue {
    let wide = i64::from(a.sint()).wrapping_mul(i64::from(b.sint()));
    let product = IntValue::from_i64(wide, a.data_type());
    cpu.set_flag(Flag::N, product.is_negative());
    cpu.set_flag(Flag::Z, product.is_zero());
    cpu.set_flag(Flag::V, product.slong() != wide);
    cpu.set_flag(Flag::C, false);
    product
}

/// `dividend / b`, truncated toward zero. Returns `None` with V set on
/// a zero divisor and on the most-negative-value by minus-one quotient;
/// N, Z, and C are untouched then. On success N/Z track the quotient
/// and V/C clear.
pub fn div(cpu: &mut Cpu, dividend: &IntValue, divisor: &IntValue) -> Option<IntValue> {
    if divisor.uint() == 0 || (dividend.is_largest_negative() && divisor.sint() == -1) {
        cpu.set_flag(Flag::V, true);
        return None;
    }
    let quotient = IntValue::from_i64(
        i64::from(dividend.sint()) / i64::from(divisor.sint()),
        dividend.data_type(),
    );
    cpu.set_flag(Flag::N, quotient.is_negative());
    cpu.set_flag(Flag::Z, quotient.is_zero());
    cpu.set_flag(Flag::V, false);
    cpu.set_flag(Flag::C, false);
    Some(quotient)
}

#[cfg(test)]
mod tests {
    use super::{add, div, mul, sub};
    use crate::state::{Cpu, Flag};
    use crate::value::{DataType, IntValue};
    use proptest::prelude::*;

    fn lw(v: i64) -> IntValue {
        IntValue::from_i64(v, DataType::L)
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
    fn signed_overflow_on_add_sets_v_without_carry() {
        let mut cpu = Cpu::new();
        let sum = add(&mut cpu, &lw(0x7fff_ffff), &lw(1));
        assert_eq!(sum.uint(), 0x8000_0000);
        assert_eq!(flags(&cpu), (true, false, true, false));
    }

    #[test]
    fn unsigned_wrap_on_add_sets_carry_without_v() {
        let mut cpu = Cpu::new();
        let sum = add(&mut cpu, &lw(-1), &lw(1));
        assert_eq!(sum.uint(), 0);
        assert_eq!(flags(&cpu), (false, true, false, true));
    }

    #[test]
    fn borrow_on_sub_sets_carry() {
        let mut cpu = Cpu::new();
        let diff = sub(&mut cpu, &lw(0), &lw(1));
        assert_eq!(diff.uint(), 0xffff_ffff);
        assert_eq!(flags(&cpu), (true, false, false, true));
    }

    #[test]
    fn sub_without_borrow_clears_carry() {
        let mut cpu = Cpu::new();
        let diff = sub(&mut cpu, &lw(5), &lw(3));
        assert_eq!(diff.uint(), 2);
        assert_eq!(flags(&cpu), (false, false, false, false));
    }

    #[test]
    fn byte_width_arithmetic_wraps_at_the_byte() {
        let mut cpu = Cpu::new();
        let a = IntValue::from_i32(0x7f, DataType::B);
        let sum = add(&mut cpu, &a, &IntValue::from_i32(1, DataType::B));
        assert_eq!(sum.uint(), 0x80);
        assert!(cpu.flag(Flag::V));
        assert!(!cpu.flag(Flag::C));
    }

    #[test]
    fn mul_reports_a_dropped_high_half() {
        let mut cpu = Cpu::new();
        let product = mul(&mut cpu, &lw(0x10000), &lw(0x10000));
        assert_eq!(product.uint(), 0);
        assert_eq!(flags(&cpu), (false, true, true, false));
    }

    #[test]
    fn mul_in_range_clears_v() {
        let mut cpu = Cpu::new();
        let product = mul(&mut cpu, &lw(-3), &lw(7));
        assert_eq!(product.sint(), -21);
        assert_eq!(flags(&cpu), (true, false, false, false));
    }

    #[test]
    fn div_by_zero_yields_no_result_and_sets_v() {
        let mut cpu = Cpu::new();
        cpu.set_flag(Flag::N, true);
        cpu.set_flag(Flag::C, true);
        assert!(div(&mut cpu, &lw(10), &lw(0)).is_none());
        assert_eq!(flags(&cpu), (true, false, true, true));
    }

    #[test]
    fn most_negative_by_minus_one_overflows() {
        let mut cpu = Cpu::new();
        assert!(div(&mut cpu, &lw(i64::from(i32::MIN)), &lw(-1)).is_none());
        assert!(cpu.flag(Flag::V));
    }

    #[test]
    fn div_truncates_toward_zero() {
        let mut cpu = Cpu::new();
        let q = div(&mut cpu, &lw(-7), &lw(2)).expect("quotient");
        assert_eq!(q.sint(), -3);
        assert_eq!(flags(&cpu), (true, false, false, false));
    }

    proptest! {
        #[test]
        fn add_matches_wrapping_semantics(a in any::<i32>(), b in any::<i32>()) {
            let mut cpu = Cpu::new();
            let sum = add(&mut cpu, &lw(i64::from(a)), &lw(i64::from(b)));
            prop_assert_eq!(sum.uint(), (a as u32).wrapping_add(b as u32));
            prop_assert_eq!(cpu.flag(Flag::C), (a as u32).checked_add(b as u32).is_none());
            prop_assert_eq!(cpu.flag(Flag::V), a.checked_add(b).is_none());
        }

        #[test]
        fn sub_matches_borrow_semantics(a in any::<i32>(), b in any::<i32>()) {
            let mut cpu = Cpu::new();
            let diff = sub(&mut cpu, &lw(i64::from(a)), &lw(i64::from(b)));
            prop_assert_eq!(diff.uint(), (a as u32).wrapping_sub(b as u32));
            prop_assert_eq!(cpu.flag(Flag::C), (a as u32) < (b as u32));
            prop_assert_eq!(cpu.flag(Flag::V), a.checked_sub(b).is_none());
        }
    }
}
