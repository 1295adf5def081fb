//! Balanced ternary tryte arithmetic and logic.
//!
//! Addition is ripple-carry over the trit sequences; the carry out of the
//! most significant trit is discarded, so the whole module computes modulo
//! 3^6. Result caches are always recomputed from the trits, never derived
//! from the operand caches.

use crate::ternary::{Trit, Tryte, TRITS_PER_TRYTE};

/// Add two trytes. Carry out of the top trit is discarded.
pub fn add(a: &Tryte, b: &Tryte) -> Tryte {
    let mut trits = [Trit::O; TRITS_PER_TRYTE];
    let mut carry = 0i8;

    for (i, trit) in trits.iter_mut().enumerate() {
        let mut sum = a.get(i).to_i8() + b.get(i).to_i8() + carry;
        if sum > 1 {
            sum -= 3;
            carry = 1;
        } else if sum < -1 {
            sum += 3;
            carry = -1;
        } else {
            carry = 0;
        }
        *trit = Trit::from_i8(sum);
    }

    Tryte::from_trits(trits)
}

/// Subtract b from a, as addition of the per-trit negation.
#[inline]
pub fn sub(a: &Tryte, b: &Tryte) -> Tryte {
    add(a, &b.neg())
}

/// Multiply two trytes. Schoolbook products accumulate into a 12-position
/// buffer, carries are normalized left-to-right, and the upper half is
/// discarded.
pub fn mul(a: &Tryte, b: &Tryte) -> Tryte {
    let mut acc = [0i32; TRITS_PER_TRYTE * 2];

    for i in 0..TRITS_PER_TRYTE {
        for j in 0..TRITS_PER_TRYTE {
            acc[i + j] += a.get(i).to_i8() as i32 * b.get(j).to_i8() as i32;
        }
    }

    for i in 0..TRITS_PER_TRYTE * 2 - 1 {
        while acc[i] > 1 {
            acc[i] -= 3;
            acc[i + 1] += 1;
        }
        while acc[i] < -1 {
            acc[i] += 3;
            acc[i + 1] -= 1;
        }
    }

    let mut trits = [Trit::O; TRITS_PER_TRYTE];
    for (i, trit) in trits.iter_mut().enumerate() {
        *trit = Trit::from_i8(acc[i] as i8);
    }
    Tryte::from_trits(trits)
}

/// Integer division over the cached values. Division by zero yields the
/// zero tryte; the execution engine is responsible for trapping it.
pub fn div(a: &Tryte, b: &Tryte) -> Tryte {
    if b.value() == 0 {
        return Tryte::zero();
    }
    Tryte::from_int(a.value() / b.value())
}

/// Tritwise tri-valued AND.
pub fn and(a: &Tryte, b: &Tryte) -> Tryte {
    let mut trits = [Trit::O; TRITS_PER_TRYTE];
    for (i, trit) in trits.iter_mut().enumerate() {
        *trit = a.get(i).and(b.get(i));
    }
    Tryte::from_trits(trits)
}

/// Tritwise tri-valued OR.
pub fn or(a: &Tryte, b: &Tryte) -> Tryte {
    let mut trits = [Trit::O; TRITS_PER_TRYTE];
    for (i, trit) in trits.iter_mut().enumerate() {
        *trit = a.get(i).or(b.get(i));
    }
    Tryte::from_trits(trits)
}

/// Tritwise NOT, the per-trit negation.
#[inline]
pub fn not(a: &Tryte) -> Tryte {
    a.neg()
}

/// Shift one trit position left (multiply by 3). Position 0 is filled with
/// zero, the top trit is lost.
pub fn shift_left(a: &Tryte) -> Tryte {
    let mut trits = [Trit::O; TRITS_PER_TRYTE];
    for i in 1..TRITS_PER_TRYTE {
        trits[i] = a.get(i - 1);
    }
    Tryte::from_trits(trits)
}

/// Shift one trit position right (divide by 3, rounding). The top trit is
/// filled with zero, position 0 is lost.
pub fn shift_right(a: &Tryte) -> Tryte {
    let mut trits = [Trit::O; TRITS_PER_TRYTE];
    for i in 0..TRITS_PER_TRYTE - 1 {
        trits[i] = a.get(i + 1);
    }
    Tryte::from_trits(trits)
}
