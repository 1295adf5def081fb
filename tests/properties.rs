//! Property tests for the numeric core and the instruction encoding.

use proptest::prelude::*;
use zarya::asm::{image_from_bytes, image_to_bytes};
use zarya::ternary::{arith, Tryte};
use zarya::vm::{get_addr_mode, get_base_opcode, make_opcode, AddrMode, Instruction};

/// Reduce an integer into the balanced 6-trit domain.
fn wrap(value: i64) -> i32 {
    let m = 729i64; // 3^6
    let mut r = value.rem_euclid(m);
    if r > 364 {
        r -= m;
    }
    r as i32
}

fn tryte_value() -> impl Strategy<Value = i32> {
    Tryte::MIN..=Tryte::MAX
}

fn addr_mode() -> impl Strategy<Value = AddrMode> {
    prop_oneof![
        Just(AddrMode::Immediate),
        Just(AddrMode::Register),
        Just(AddrMode::Indirect),
    ]
}

proptest! {
    #[test]
    fn tryte_int_roundtrip(value in tryte_value()) {
        prop_assert_eq!(Tryte::from_int(value).value(), value);
    }

    #[test]
    fn tryte_wrap_matches_modular_reduction(value in -100_000i32..100_000) {
        prop_assert_eq!(Tryte::from_int(value).value(), wrap(value as i64));
    }

    #[test]
    fn cache_always_matches_trits(value in tryte_value()) {
        let tryte = Tryte::from_int(value);
        let mut recomputed = 0i32;
        let mut power = 1i32;
        for trit in tryte.trits() {
            recomputed += trit.to_i8() as i32 * power;
            power *= 3;
        }
        prop_assert_eq!(tryte.value(), recomputed);
    }

    #[test]
    fn add_is_commutative(a in tryte_value(), b in tryte_value()) {
        let (ta, tb) = (Tryte::from_int(a), Tryte::from_int(b));
        prop_assert_eq!(arith::add(&ta, &tb), arith::add(&tb, &ta));
    }

    #[test]
    fn add_matches_integer_addition(a in tryte_value(), b in tryte_value()) {
        let sum = arith::add(&Tryte::from_int(a), &Tryte::from_int(b));
        prop_assert_eq!(sum.value(), wrap(a as i64 + b as i64));
    }

    #[test]
    fn sub_self_is_zero(a in tryte_value()) {
        let ta = Tryte::from_int(a);
        prop_assert!(arith::sub(&ta, &ta).is_zero());
    }

    #[test]
    fn additive_inverse(a in tryte_value()) {
        let ta = Tryte::from_int(a);
        prop_assert!(arith::add(&ta, &ta.neg()).is_zero());
    }

    #[test]
    fn mul_matches_integer_multiplication(a in tryte_value(), b in tryte_value()) {
        let product = arith::mul(&Tryte::from_int(a), &Tryte::from_int(b));
        prop_assert_eq!(product.value(), wrap(a as i64 * b as i64));
    }

    #[test]
    fn shift_left_multiplies_by_three(a in -121i32..=121) {
        let shifted = arith::shift_left(&Tryte::from_int(a));
        prop_assert_eq!(shifted.value(), a * 3);
    }

    #[test]
    fn opcode_pack_roundtrip(mode in addr_mode(), base in -121i32..=121) {
        let opcode = make_opcode(mode, base);
        prop_assert_eq!(get_addr_mode(&opcode), mode);
        prop_assert_eq!(get_base_opcode(&opcode), base);
    }

    #[test]
    fn instruction_encode_decode_identity(
        opcode in tryte_value(),
        op1 in tryte_value(),
        op2 in tryte_value(),
    ) {
        let inst = Instruction::new(
            Tryte::from_int(opcode),
            Tryte::from_int(op1),
            Tryte::from_int(op2),
        );
        prop_assert_eq!(Instruction::decode(&inst.encode()), inst);
    }

    #[test]
    fn image_bytes_roundtrip(values in prop::collection::vec(tryte_value(), 0..64)) {
        let trytes: Vec<Tryte> = values.iter().map(|&v| Tryte::from_int(v)).collect();
        let restored = image_from_bytes(&image_to_bytes(&trytes)).unwrap();
        prop_assert_eq!(restored, trytes);
    }
}
