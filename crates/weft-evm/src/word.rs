//! 256-bit word arithmetic with two's-complement signed variants

use weft_primitives::{U256, U512};

/// Most negative signed word, `-2^255`
pub const MIN_NEGATIVE: U256 = U256([0, 0, 0, 0x8000_0000_0000_0000]);

/// Sign bit set
pub fn is_negative(value: U256) -> bool {
    value.bit(255)
}

/// Two's-complement negation
pub fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

fn abs(value: U256) -> U256 {
    if is_negative(value) {
        negate(value)
    } else {
        value
    }
}

fn low_half(value: U512) -> U256 {
    let mut bytes = [0u8; 64];
    value.to_big_endian(&mut bytes);
    U256::from_big_endian(&bytes[32..])
}

/// Wrapping addition
pub fn add(a: U256, b: U256) -> U256 {
    a.overflowing_add(b).0
}

/// Wrapping subtraction
pub fn sub(a: U256, b: U256) -> U256 {
    a.overflowing_sub(b).0
}

/// Wrapping multiplication
pub fn mul(a: U256, b: U256) -> U256 {
    a.overflowing_mul(b).0
}

/// Unsigned division, zero divisor gives zero
pub fn div(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        U256::zero()
    } else {
        a / b
    }
}

/// Unsigned remainder, zero divisor gives zero
pub fn rem(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        U256::zero()
    } else {
        a % b
    }
}

/// Signed division truncating toward zero. `MIN_NEGATIVE / -1` wraps to `MIN_NEGATIVE`.
pub fn sdiv(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    if a == MIN_NEGATIVE && b == U256::MAX {
        return MIN_NEGATIVE;
    }
    let quotient = abs(a) / abs(b);
    if is_negative(a) != is_negative(b) {
        negate(quotient)
    } else {
        quotient
    }
}

/// Signed remainder; the result takes the sign of the dividend
pub fn smod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let remainder = abs(a) % abs(b);
    if is_negative(a) {
        negate(remainder)
    } else {
        remainder
    }
}

/// `(a + b) % m` without intermediate overflow
pub fn addmod(a: U256, b: U256, m: U256) -> U256 {
    if m.is_zero() {
        return U256::zero();
    }
    low_half((U512::from(a) + U512::from(b)) % U512::from(m))
}

/// `(a * b) % m` without intermediate overflow
pub fn mulmod(a: U256, b: U256, m: U256) -> U256 {
    if m.is_zero() {
        return U256::zero();
    }
    low_half(a.full_mul(b) % U512::from(m))
}

/// Wrapping exponentiation
pub fn exp(base: U256, exponent: U256) -> U256 {
    base.overflowing_pow(exponent).0
}

/// Extend the sign of the `(b + 1)`-byte value `x`
pub fn signextend(b: U256, x: U256) -> U256 {
    if b >= U256::from(31u64) {
        return x;
    }
    let bit = b.low_u64() as usize * 8 + 7;
    let mask = (U256::one() << bit) - U256::one();
    if x.bit(bit) {
        x | !mask
    } else {
        x & mask
    }
}

/// Signed less-than
pub fn slt(a: U256, b: U256) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

/// Signed greater-than
pub fn sgt(a: U256, b: U256) -> bool {
    slt(b, a)
}

/// The `i`-th byte of `x`, counting from the most significant
pub fn byte(i: U256, x: U256) -> U256 {
    if i >= U256::from(32u64) {
        return U256::zero();
    }
    U256::from(x.byte(31 - i.low_u64() as usize))
}

/// Logical left shift; shifts of 256 or more give zero
pub fn shl(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256u64) {
        U256::zero()
    } else {
        value << shift.low_u64() as usize
    }
}

/// Logical right shift; shifts of 256 or more give zero
pub fn shr(shift: U256, value: U256) -> U256 {
    if shift >= U256::from(256u64) {
        U256::zero()
    } else {
        value >> shift.low_u64() as usize
    }
}

/// Arithmetic right shift; shifts of 256 or more give zero or all ones
pub fn sar(shift: U256, value: U256) -> U256 {
    let negative = is_negative(value);
    if shift >= U256::from(256u64) {
        return if negative { U256::MAX } else { U256::zero() };
    }
    let shift = shift.low_u64() as usize;
    if negative {
        !((!value) >> shift)
    } else {
        value >> shift
    }
}

/// Boolean as a word
pub fn from_bool(value: bool) -> U256 {
    if value {
        U256::one()
    } else {
        U256::zero()
    }
}

/// The word as `u64`, or `None` if it does not fit
pub fn to_u64(value: U256) -> Option<u64> {
    if value.bits() > 64 {
        None
    } else {
        Some(value.low_u64())
    }
}

/// The word as `usize`, saturating at `usize::MAX`
pub fn to_usize_saturating(value: U256) -> usize {
    to_u64(value)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(usize::MAX)
}
