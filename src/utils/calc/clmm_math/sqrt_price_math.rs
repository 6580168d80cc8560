// Copyright (c) Raydium Foundation
// Licensed under Apache 2.0
// Source: https://github.com/raydium-io/raydium-clmm/programs/amm/src/libraries/sqrt_price_math.rs
// Rounding follows the client SDK so that quotes match on-chain settlement

//! 给定输入/输出量后计算下一个 sqrt price

use super::big_num::U256;
use super::fixed_point_64::RESOLUTION;
use super::full_math::{mul_div_ceil, mul_div_rounding_up, u256_to_u128};
use crate::common::errors::{ClmmError, ClmmResult};

/// 按 token A 数量移动价格，结果向上取整
///
/// 加入 A 价格下降，取出 A 价格上升；向上取整保证价格不会越过精确值
pub fn get_next_sqrt_price_from_amount_a_rounding_up(
    sqrt_price_x64: u128,
    liquidity: u128,
    amount: u128,
    add: bool,
) -> ClmmResult<u128> {
    if amount == 0 {
        return Ok(sqrt_price_x64);
    }
    let sqrt_price = U256::from(sqrt_price_x64);
    let liquidity_left_shift = U256::from(liquidity) << RESOLUTION;
    let amount_mul_sqrt_price = U256::from(amount)
        .checked_mul(sqrt_price)
        .ok_or(ClmmError::MathOverflow("amount * sqrt_price"))?;

    let next = if add {
        let numerator_1 = liquidity_left_shift;
        match numerator_1.checked_add(amount_mul_sqrt_price) {
            Some(denominator) => mul_div_ceil(numerator_1, sqrt_price, denominator)?,
            None => {
                // liquidity / (liquidity / sqrt_price + amount)
                let denominator = (numerator_1 / sqrt_price)
                    .checked_add(U256::from(amount))
                    .ok_or(ClmmError::MathOverflow("liquidity / sqrt_price + amount"))?;
                mul_div_rounding_up(numerator_1, U256::one(), denominator)?
            }
        }
    } else {
        if liquidity_left_shift <= amount_mul_sqrt_price {
            return Err(ClmmError::SqrtPriceUnderflow { liquidity, amount });
        }
        let denominator = liquidity_left_shift - amount_mul_sqrt_price;
        mul_div_ceil(liquidity_left_shift, sqrt_price, denominator)?
    };
    u256_to_u128(next, "next sqrt price from amount a")
}

/// 按 token B 数量移动价格，结果向下取整
pub fn get_next_sqrt_price_from_amount_b_rounding_down(
    sqrt_price_x64: u128,
    liquidity: u128,
    amount: u128,
    add: bool,
) -> ClmmResult<u128> {
    if liquidity == 0 {
        return Err(ClmmError::DivisionByZero);
    }
    let sqrt_price = U256::from(sqrt_price_x64);
    let delta_y = U256::from(amount) << RESOLUTION;
    let next = if add {
        sqrt_price
            .checked_add(delta_y / U256::from(liquidity))
            .ok_or(ClmmError::MathOverflow("sqrt_price + amount / liquidity"))?
    } else {
        let amount_div_liquidity = mul_div_rounding_up(delta_y, U256::one(), U256::from(liquidity))?;
        if sqrt_price <= amount_div_liquidity {
            return Err(ClmmError::SqrtPriceUnderflow { liquidity, amount });
        }
        sqrt_price - amount_div_liquidity
    };
    u256_to_u128(next, "next sqrt price from amount b")
}

/// 精确输入：输入 A（zero_for_one）价格下降，输入 B 价格上升
pub fn get_next_sqrt_price_from_input(
    sqrt_price_x64: u128,
    liquidity: u128,
    amount_in: u128,
    zero_for_one: bool,
) -> ClmmResult<u128> {
    if sqrt_price_x64 == 0 || liquidity == 0 {
        return Err(ClmmError::DivisionByZero);
    }
    if zero_for_one {
        get_next_sqrt_price_from_amount_a_rounding_up(sqrt_price_x64, liquidity, amount_in, true)
    } else {
        get_next_sqrt_price_from_amount_b_rounding_down(sqrt_price_x64, liquidity, amount_in, true)
    }
}

/// 精确输出：取出 B（zero_for_one）价格下降，取出 A 价格上升
pub fn get_next_sqrt_price_from_output(
    sqrt_price_x64: u128,
    liquidity: u128,
    amount_out: u128,
    zero_for_one: bool,
) -> ClmmResult<u128> {
    if sqrt_price_x64 == 0 || liquidity == 0 {
        return Err(ClmmError::DivisionByZero);
    }
    if zero_for_one {
        get_next_sqrt_price_from_amount_b_rounding_down(sqrt_price_x64, liquidity, amount_out, false)
    } else {
        get_next_sqrt_price_from_amount_a_rounding_up(sqrt_price_x64, liquidity, amount_out, false)
    }
}
