// Copyright (c) Raydium Foundation
// Licensed under Apache 2.0
// Source: https://github.com/raydium-io/raydium-clmm/programs/amm/src/libraries/liquidity_math.rs
// Amount/liquidity conversions with the rounding policy of the client SDK

//! 流动性与 token 数量互换
//!
//! 存入/支付方向向上取整，取出/接收方向向下取整。
//! 所有函数都会先把 `sqrt_price_a_x64 <= sqrt_price_b_x64` 排好序。

use super::big_num::{U256, U512};
use super::fixed_point_64::{Q64, RESOLUTION};
use super::full_math::{
    Downcast512, Upcast512, mul_div_ceil, mul_div_floor, mul_div_rounding_up, u256_to_u128,
};
use crate::common::errors::{ClmmError, ClmmResult};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

#[inline]
fn sort(sqrt_price_a_x64: u128, sqrt_price_b_x64: u128) -> (u128, u128) {
    if sqrt_price_a_x64 > sqrt_price_b_x64 {
        (sqrt_price_b_x64, sqrt_price_a_x64)
    } else {
        (sqrt_price_a_x64, sqrt_price_b_x64)
    }
}

/// 在价格穿越 tick 时把 `liquidity_net` 加到当前流动性上
pub fn add_delta(x: u128, y: i128) -> ClmmResult<u128> {
    let z = if y < 0 {
        x.checked_sub(y.unsigned_abs())
    } else {
        x.checked_add(y as u128)
    };
    z.ok_or(ClmmError::LiquidityOverflow { liquidity: x, delta: y })
}

/// `L * (sqrt_b - sqrt_a) / (sqrt_a * sqrt_b)`
pub fn get_token_amount_a_from_liquidity(
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    liquidity: u128,
    round_up: bool,
) -> ClmmResult<u128> {
    let (sqrt_price_a_x64, sqrt_price_b_x64) = sort(sqrt_price_a_x64, sqrt_price_b_x64);
    if sqrt_price_a_x64 == 0 {
        return Err(ClmmError::SqrtPriceOutOfRange { sqrt_price_x64: 0 });
    }
    let numerator_1 = U256::from(liquidity) << RESOLUTION;
    let numerator_2 = U256::from(sqrt_price_b_x64 - sqrt_price_a_x64);
    let sqrt_a = U256::from(sqrt_price_a_x64);
    let sqrt_b = U256::from(sqrt_price_b_x64);

    let amount = if round_up {
        mul_div_rounding_up(mul_div_ceil(numerator_1, numerator_2, sqrt_b)?, U256::one(), sqrt_a)?
    } else {
        mul_div_floor(numerator_1, numerator_2, sqrt_b)? / sqrt_a
    };
    u256_to_u128(amount, "token amount a")
}

/// `L * (sqrt_b - sqrt_a) / 2^64`
pub fn get_token_amount_b_from_liquidity(
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    liquidity: u128,
    round_up: bool,
) -> ClmmResult<u128> {
    let (sqrt_price_a_x64, sqrt_price_b_x64) = sort(sqrt_price_a_x64, sqrt_price_b_x64);
    if sqrt_price_a_x64 == 0 {
        return Err(ClmmError::SqrtPriceOutOfRange { sqrt_price_x64: 0 });
    }
    let liquidity = U256::from(liquidity);
    let delta = U256::from(sqrt_price_b_x64 - sqrt_price_a_x64);
    let amount = if round_up {
        mul_div_ceil(liquidity, delta, U256::from(Q64))?
    } else {
        mul_div_floor(liquidity, delta, U256::from(Q64))?
    };
    u256_to_u128(amount, "token amount b")
}

/// `amount_a * sqrt_a * sqrt_b / (sqrt_b - sqrt_a) / 2^64`
pub fn get_liquidity_from_token_amount_a(
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    amount_a: u128,
    round_up: bool,
) -> ClmmResult<u128> {
    let (sqrt_price_a_x64, sqrt_price_b_x64) = sort(sqrt_price_a_x64, sqrt_price_b_x64);
    if sqrt_price_a_x64 == sqrt_price_b_x64 {
        return Err(ClmmError::DivisionByZero);
    }
    // amount * a * b 最多 384 位
    let numerator = U256::from(amount_a).as_u512()
        * U256::from(sqrt_price_a_x64).as_u512()
        * U256::from(sqrt_price_b_x64).as_u512();
    let denominator = U256::from(sqrt_price_b_x64 - sqrt_price_a_x64).as_u512();
    let result = numerator / denominator;

    let liquidity = if round_up {
        let q64 = U256::from(Q64).as_u512();
        let mut l = result / q64;
        if !(result % q64).is_zero() {
            l = l + U512::one();
        }
        l
    } else {
        result >> RESOLUTION
    };
    let liquidity = liquidity
        .checked_as_u256()
        .ok_or(ClmmError::MathOverflow("liquidity from amount a"))?;
    u256_to_u128(liquidity, "liquidity from amount a")
}

/// `amount_b * 2^64 / (sqrt_b - sqrt_a)`
pub fn get_liquidity_from_token_amount_b(
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    amount_b: u128,
) -> ClmmResult<u128> {
    let (sqrt_price_a_x64, sqrt_price_b_x64) = sort(sqrt_price_a_x64, sqrt_price_b_x64);
    let liquidity = mul_div_floor(
        U256::from(amount_b),
        U256::from(Q64),
        U256::from(sqrt_price_b_x64 - sqrt_price_a_x64),
    )?;
    u256_to_u128(liquidity, "liquidity from amount b")
}

/// 区间内取两侧推出的流动性的较小值，避免不平衡存入多记流动性
pub fn get_liquidity_from_token_amounts(
    sqrt_price_current_x64: u128,
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    amount_a: u128,
    amount_b: u128,
) -> ClmmResult<u128> {
    let (sqrt_price_a_x64, sqrt_price_b_x64) = sort(sqrt_price_a_x64, sqrt_price_b_x64);

    if sqrt_price_current_x64 <= sqrt_price_a_x64 {
        get_liquidity_from_token_amount_a(sqrt_price_a_x64, sqrt_price_b_x64, amount_a, false)
    } else if sqrt_price_current_x64 < sqrt_price_b_x64 {
        let liquidity_a =
            get_liquidity_from_token_amount_a(sqrt_price_current_x64, sqrt_price_b_x64, amount_a, false)?;
        let liquidity_b =
            get_liquidity_from_token_amount_b(sqrt_price_a_x64, sqrt_price_current_x64, amount_b)?;
        Ok(liquidity_a.min(liquidity_b))
    } else {
        get_liquidity_from_token_amount_b(sqrt_price_a_x64, sqrt_price_b_x64, amount_b)
    }
}

/// 返回 `(amount_a, amount_b)`，区间外的一侧为 0
pub fn get_amounts_from_liquidity(
    sqrt_price_current_x64: u128,
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    liquidity: u128,
    round_up: bool,
) -> ClmmResult<(u128, u128)> {
    let (sqrt_price_a_x64, sqrt_price_b_x64) = sort(sqrt_price_a_x64, sqrt_price_b_x64);

    if sqrt_price_current_x64 <= sqrt_price_a_x64 {
        let amount_a =
            get_token_amount_a_from_liquidity(sqrt_price_a_x64, sqrt_price_b_x64, liquidity, round_up)?;
        Ok((amount_a, 0))
    } else if sqrt_price_current_x64 < sqrt_price_b_x64 {
        let amount_a = get_token_amount_a_from_liquidity(
            sqrt_price_current_x64,
            sqrt_price_b_x64,
            liquidity,
            round_up,
        )?;
        let amount_b = get_token_amount_b_from_liquidity(
            sqrt_price_a_x64,
            sqrt_price_current_x64,
            liquidity,
            round_up,
        )?;
        Ok((amount_a, amount_b))
    } else {
        let amount_b =
            get_token_amount_b_from_liquidity(sqrt_price_a_x64, sqrt_price_b_x64, liquidity, round_up)?;
        Ok((0, amount_b))
    }
}

/// 在 `get_amounts_from_liquidity` 的基础上按滑点放大（`amount_max`）或缩小
pub fn get_amounts_from_liquidity_with_slippage(
    sqrt_price_current_x64: u128,
    sqrt_price_a_x64: u128,
    sqrt_price_b_x64: u128,
    liquidity: u128,
    amount_max: bool,
    round_up: bool,
    slippage: Decimal,
) -> ClmmResult<(u128, u128)> {
    if slippage.is_sign_negative() || slippage > Decimal::ONE {
        return Err(ClmmError::InvalidSlippage(slippage.to_string()));
    }
    let (amount_a, amount_b) = get_amounts_from_liquidity(
        sqrt_price_current_x64,
        sqrt_price_a_x64,
        sqrt_price_b_x64,
        liquidity,
        round_up,
    )?;
    let coefficient = if amount_max {
        Decimal::ONE + slippage
    } else {
        Decimal::ONE - slippage
    };
    Ok((
        apply_coefficient(amount_a, coefficient)?,
        apply_coefficient(amount_b, coefficient)?,
    ))
}

fn apply_coefficient(amount: u128, coefficient: Decimal) -> ClmmResult<u128> {
    Decimal::from_u128(amount)
        .and_then(|amount| amount.checked_mul(coefficient))
        .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|scaled| scaled.to_u128())
        .ok_or_else(|| ClmmError::DecimalConversion(format!("{amount} * {coefficient}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::calc::clmm_math::tick_math::get_sqrt_price_at_tick;

    #[test]
    fn test_add_delta() {
        assert_eq!(add_delta(1000, 500).unwrap(), 1500);
        assert_eq!(add_delta(1000, -300).unwrap(), 700);
        assert_eq!(
            add_delta(10, -11).unwrap_err(),
            ClmmError::LiquidityOverflow { liquidity: 10, delta: -11 }
        );
        assert!(add_delta(u128::MAX, 1).is_err());
    }

    #[test]
    fn test_amount_b_rounding() {
        // 价差 0.5 * 2^64，L = 3 => 1.5
        let a = Q64;
        let b = Q64 + Q64 / 2;
        assert_eq!(get_token_amount_b_from_liquidity(a, b, 3, false).unwrap(), 1);
        assert_eq!(get_token_amount_b_from_liquidity(a, b, 3, true).unwrap(), 2);
        assert_eq!(get_token_amount_b_from_liquidity(b, a, 3, true).unwrap(), 2);
    }

    #[test]
    fn test_amount_a_known_value() {
        // sqrt 从 1 到 2：L * (2 - 1) / (1 * 2) = L / 2
        let a = Q64;
        let b = Q64 * 2;
        assert_eq!(get_token_amount_a_from_liquidity(a, b, 1_000, false).unwrap(), 500);
        assert_eq!(get_token_amount_a_from_liquidity(a, b, 1_001, false).unwrap(), 500);
        assert_eq!(get_token_amount_a_from_liquidity(a, b, 1_001, true).unwrap(), 501);
    }

    #[test]
    fn test_liquidity_from_amounts_single_side() {
        let a = Q64;
        let b = Q64 * 2;
        // 价格在区间下方，只用 A
        let l = get_liquidity_from_token_amounts(Q64 / 2, a, b, 500, 1_000_000).unwrap();
        assert_eq!(l, 1_000);
        // 价格在区间上方，只用 B：1000 * 2^64 / 2^64
        let l = get_liquidity_from_token_amounts(Q64 * 3, a, b, 1_000_000, 1_000).unwrap();
        assert_eq!(l, 1_000);
    }

    #[test]
    fn test_liquidity_from_amounts_takes_min_inside_range() {
        let lower = get_sqrt_price_at_tick(-600).unwrap();
        let upper = get_sqrt_price_at_tick(600).unwrap();
        let current = get_sqrt_price_at_tick(0).unwrap();
        let a_heavy = get_liquidity_from_token_amounts(current, lower, upper, 10_000_000, 1_000_000).unwrap();
        assert_eq!(a_heavy, get_liquidity_from_token_amount_b(lower, current, 1_000_000).unwrap());
        let b_heavy = get_liquidity_from_token_amounts(current, lower, upper, 1_000_000, 10_000_000).unwrap();
        assert_eq!(
            b_heavy,
            get_liquidity_from_token_amount_a(current, upper, 1_000_000, false).unwrap()
        );
    }

    #[test]
    fn test_amounts_zero_out_of_range_side() {
        let lower = get_sqrt_price_at_tick(-600).unwrap();
        let upper = get_sqrt_price_at_tick(600).unwrap();
        let (amount_a, amount_b) =
            get_amounts_from_liquidity(get_sqrt_price_at_tick(-1200).unwrap(), lower, upper, 1 << 40, true).unwrap();
        assert!(amount_a > 0);
        assert_eq!(amount_b, 0);
        let (amount_a, amount_b) =
            get_amounts_from_liquidity(get_sqrt_price_at_tick(1200).unwrap(), upper, lower, 1 << 40, true).unwrap();
        assert_eq!(amount_a, 0);
        assert!(amount_b > 0);
    }

    #[test]
    fn test_liquidity_round_trip_never_overstates() {
        let lower = get_sqrt_price_at_tick(-6_000).unwrap();
        let upper = get_sqrt_price_at_tick(3_000).unwrap();
        for tick in [-9_000, -6_000, -10, 0, 2_999, 3_000, 9_000] {
            let current = get_sqrt_price_at_tick(tick).unwrap();
            let liquidity = 123_456_789_000u128;
            let (amount_a, amount_b) = get_amounts_from_liquidity(current, lower, upper, liquidity, false).unwrap();
            let recovered = get_liquidity_from_token_amounts(current, lower, upper, amount_a, amount_b).unwrap();
            assert!(recovered <= liquidity, "tick {tick}: {recovered} > {liquidity}");
        }
    }

    #[test]
    fn test_amounts_with_slippage() {
        let a = Q64;
        let b = Q64 * 2;
        let (max_a, _) =
            get_amounts_from_liquidity_with_slippage(Q64 / 2, a, b, 1_000, true, true, Decimal::new(1, 2)).unwrap();
        assert_eq!(max_a, 505);
        let (min_a, _) =
            get_amounts_from_liquidity_with_slippage(Q64 / 2, a, b, 1_000, false, false, Decimal::new(1, 2)).unwrap();
        assert_eq!(min_a, 495);
        assert!(
            get_amounts_from_liquidity_with_slippage(Q64 / 2, a, b, 1_000, true, true, Decimal::new(-1, 2)).is_err()
        );
    }
}
