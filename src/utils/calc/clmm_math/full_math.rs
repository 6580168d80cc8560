// Copyright (c) Raydium Foundation
// Licensed under Apache 2.0
// Source: https://github.com/raydium-io/raydium-clmm/programs/amm/src/libraries/full_math.rs
// Adapted for client-side use: zero divisors and overflow are returned, never panicked on

//! 全精度乘除
//!
//! `a * b` 总是在两倍位宽下计算后再做除法，中间结果不会被截断

use super::big_num::{U256, U512};
use crate::common::errors::{ClmmError, ClmmResult};

pub trait MulDiv<RHS = Self> {
    type Output;

    /// `floor(self * num / denom)`，除数为 0 或结果溢出时返回 None
    fn mul_div_floor(self, num: RHS, denom: RHS) -> Option<Self::Output>;

    /// `ceil(self * num / denom)`
    fn mul_div_ceil(self, num: RHS, denom: RHS) -> Option<Self::Output>;
}

pub trait Upcast512 {
    fn as_u512(self) -> U512;
}
impl Upcast512 for U256 {
    fn as_u512(self) -> U512 {
        U512([self.0[0], self.0[1], self.0[2], self.0[3], 0, 0, 0, 0])
    }
}

pub trait Downcast512 {
    /// 高位非零时返回 None
    fn checked_as_u256(self) -> Option<U256>;
}
impl Downcast512 for U512 {
    fn checked_as_u256(self) -> Option<U256> {
        if self.0[4..].iter().any(|w| *w != 0) {
            return None;
        }
        Some(U256([self.0[0], self.0[1], self.0[2], self.0[3]]))
    }
}

pub trait Downcast256 {
    fn checked_as_u128(self) -> Option<u128>;
}
impl Downcast256 for U256 {
    fn checked_as_u128(self) -> Option<u128> {
        if self.0[2] != 0 || self.0[3] != 0 {
            return None;
        }
        Some((self.0[1] as u128) << 64 | self.0[0] as u128)
    }
}

impl MulDiv for U256 {
    type Output = U256;

    fn mul_div_floor(self, num: Self, denom: Self) -> Option<Self::Output> {
        if denom.is_zero() {
            return None;
        }
        let r = (self.as_u512() * num.as_u512()) / denom.as_u512();
        r.checked_as_u256()
    }

    fn mul_div_ceil(self, num: Self, denom: Self) -> Option<Self::Output> {
        if denom.is_zero() {
            return None;
        }
        let r = (self.as_u512() * num.as_u512() + (denom - U256::one()).as_u512()) / denom.as_u512();
        r.checked_as_u256()
    }
}

impl MulDiv for u128 {
    type Output = u128;

    fn mul_div_floor(self, num: Self, denom: Self) -> Option<Self::Output> {
        U256::from(self)
            .mul_div_floor(U256::from(num), U256::from(denom))?
            .checked_as_u128()
    }

    fn mul_div_ceil(self, num: Self, denom: Self) -> Option<Self::Output> {
        U256::from(self)
            .mul_div_ceil(U256::from(num), U256::from(denom))?
            .checked_as_u128()
    }
}

// ============================================================================
// 带错误语义的版本，供 sqrt price / liquidity 计算使用
// ============================================================================

pub fn mul_div_floor(a: U256, b: U256, denominator: U256) -> ClmmResult<U256> {
    if denominator.is_zero() {
        return Err(ClmmError::DivisionByZero);
    }
    a.mul_div_floor(b, denominator).ok_or(ClmmError::MathOverflow("mul_div_floor"))
}

/// `(a * b + denominator - 1) / denominator`
pub fn mul_div_ceil(a: U256, b: U256, denominator: U256) -> ClmmResult<U256> {
    if denominator.is_zero() {
        return Err(ClmmError::DivisionByZero);
    }
    a.mul_div_ceil(b, denominator).ok_or(ClmmError::MathOverflow("mul_div_ceil"))
}

/// floor 结果在余数非零时加一
pub fn mul_div_rounding_up(a: U256, b: U256, denominator: U256) -> ClmmResult<U256> {
    if denominator.is_zero() {
        return Err(ClmmError::DivisionByZero);
    }
    let numerator = a.as_u512() * b.as_u512();
    let denominator = denominator.as_u512();
    let mut result = numerator / denominator;
    if !(numerator % denominator).is_zero() {
        result = result + U512::one();
    }
    result
        .checked_as_u256()
        .ok_or(ClmmError::MathOverflow("mul_div_rounding_up"))
}

/// growth 累加器的减法，按 2^128 取模
#[inline]
pub fn wrapping_sub_u128(a: u128, b: u128) -> u128 {
    a.wrapping_sub(b)
}

pub fn u256_to_u128(value: U256, context: &'static str) -> ClmmResult<u128> {
    value.checked_as_u128().ok_or(ClmmError::MathOverflow(context))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_floor_and_ceil() {
        let r = mul_div_floor(U256::from(7u64), U256::from(3u64), U256::from(2u64)).unwrap();
        assert_eq!(r, U256::from(10u64));
        let r = mul_div_ceil(U256::from(7u64), U256::from(3u64), U256::from(2u64)).unwrap();
        assert_eq!(r, U256::from(11u64));
        // 整除时不进位
        let r = mul_div_ceil(U256::from(8u64), U256::from(3u64), U256::from(2u64)).unwrap();
        assert_eq!(r, U256::from(12u64));
        let r = mul_div_rounding_up(U256::from(8u64), U256::from(3u64), U256::from(2u64)).unwrap();
        assert_eq!(r, U256::from(12u64));
        let r = mul_div_rounding_up(U256::from(7u64), U256::from(3u64), U256::from(2u64)).unwrap();
        assert_eq!(r, U256::from(11u64));
    }

    #[test]
    fn test_division_by_zero() {
        let err = mul_div_floor(U256::one(), U256::one(), U256::zero()).unwrap_err();
        assert_eq!(err, ClmmError::DivisionByZero);
        assert_eq!(err.to_string(), "division by 0");
        assert!(mul_div_ceil(U256::one(), U256::one(), U256::zero()).is_err());
        assert!(mul_div_rounding_up(U256::one(), U256::one(), U256::zero()).is_err());
        assert_eq!(5u128.mul_div_floor(1, 0), None);
    }

    #[test]
    fn test_full_width_product() {
        // 2^200 * 2^100 超出 256 位，只能在 512 位下得到正确的商
        let a = U256([0, 0, 0, 1 << 8]);
        let b = U256([0, 1 << 36, 0, 0]);
        assert_eq!(mul_div_floor(a, b, b).unwrap(), a);
        assert_eq!(mul_div_ceil(a, b, b).unwrap(), a);
        let r = u128::MAX.mul_div_floor(u128::MAX, u128::MAX).unwrap();
        assert_eq!(r, u128::MAX);
        // 结果超出 u128
        assert_eq!(u128::MAX.mul_div_floor(2, 1), None);
    }

    #[test]
    fn test_wrapping_sub() {
        assert_eq!(wrapping_sub_u128(1, 3), u128::MAX - 1);
        assert_eq!(wrapping_sub_u128(10, 3), 7);
    }
}
