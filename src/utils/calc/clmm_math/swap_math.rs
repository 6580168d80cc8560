// Copyright (c) Raydium Foundation
// Licensed under Apache 2.0
// Source: https://github.com/raydium-io/raydium-clmm/programs/amm/src/libraries/swap_math.rs
// Client-side port; amounts are u128 so one step can describe any u64 swap without truncation

use super::big_num::U256;
use super::full_math::{mul_div_ceil, mul_div_floor, u256_to_u128};
use super::liquidity_math::{get_token_amount_a_from_liquidity, get_token_amount_b_from_liquidity};
use super::sqrt_price_math::{get_next_sqrt_price_from_input, get_next_sqrt_price_from_output};
use crate::common::errors::{ClmmError, ClmmResult};
pub use crate::constants::FEE_RATE_DENOMINATOR_VALUE;

/// 单步计算结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapStep {
    /// 这一步结束时的价格
    pub sqrt_price_next_x64: u128,
    /// 输入量（不含手续费）
    pub amount_in: u128,
    /// 输出量
    pub amount_out: u128,
    /// 手续费
    pub fee_amount: u128,
}

/// 计算单步 swap 结果（核心算法）
///
/// 在当前流动性下把价格从 `sqrt_price_current_x64` 推向 `sqrt_price_target_x64`，
/// 剩余数量不够时停在中间价格。精确输入时先扣手续费再推价格。
pub fn compute_swap_step(
    sqrt_price_current_x64: u128,
    sqrt_price_target_x64: u128,
    liquidity: u128,
    amount_remaining: u128,
    fee_rate: u32,
    is_base_input: bool,
    zero_for_one: bool,
) -> ClmmResult<SwapStep> {
    if fee_rate >= FEE_RATE_DENOMINATOR_VALUE {
        return Err(ClmmError::MathOverflow("fee_rate >= FEE_RATE_DENOMINATOR_VALUE"));
    }
    let mut swap_step = SwapStep::default();

    if is_base_input {
        // 精确输入模式
        let amount_remaining_less_fee = u256_to_u128(
            mul_div_floor(
                U256::from(amount_remaining),
                U256::from(FEE_RATE_DENOMINATOR_VALUE - fee_rate),
                U256::from(FEE_RATE_DENOMINATOR_VALUE),
            )?,
            "amount_remaining_less_fee",
        )?;
        let amount_in = calculate_amount_in_range(
            sqrt_price_current_x64,
            sqrt_price_target_x64,
            liquidity,
            zero_for_one,
            is_base_input,
        )?;
        if let Some(amount_in) = amount_in {
            swap_step.amount_in = amount_in;
        }
        swap_step.sqrt_price_next_x64 = match amount_in {
            Some(amount_in) if amount_remaining_less_fee >= amount_in => sqrt_price_target_x64,
            _ => get_next_sqrt_price_from_input(
                sqrt_price_current_x64,
                liquidity,
                amount_remaining_less_fee,
                zero_for_one,
            )?,
        };
    } else {
        // 精确输出模式
        let amount_out = calculate_amount_in_range(
            sqrt_price_current_x64,
            sqrt_price_target_x64,
            liquidity,
            zero_for_one,
            is_base_input,
        )?;
        if let Some(amount_out) = amount_out {
            swap_step.amount_out = amount_out;
        }
        swap_step.sqrt_price_next_x64 = match amount_out {
            Some(amount_out) if amount_remaining >= amount_out => sqrt_price_target_x64,
            _ => get_next_sqrt_price_from_output(
                sqrt_price_current_x64,
                liquidity,
                amount_remaining,
                zero_for_one,
            )?,
        };
    }

    // 是否达到目标价格
    let max = sqrt_price_target_x64 == swap_step.sqrt_price_next_x64;

    if zero_for_one {
        if !(max && is_base_input) {
            swap_step.amount_in = get_token_amount_a_from_liquidity(
                swap_step.sqrt_price_next_x64,
                sqrt_price_current_x64,
                liquidity,
                true,
            )?;
        }
        if !(max && !is_base_input) {
            swap_step.amount_out = get_token_amount_b_from_liquidity(
                swap_step.sqrt_price_next_x64,
                sqrt_price_current_x64,
                liquidity,
                false,
            )?;
        }
    } else {
        if !(max && is_base_input) {
            swap_step.amount_in = get_token_amount_b_from_liquidity(
                sqrt_price_current_x64,
                swap_step.sqrt_price_next_x64,
                liquidity,
                true,
            )?;
        }
        if !(max && !is_base_input) {
            swap_step.amount_out = get_token_amount_a_from_liquidity(
                sqrt_price_current_x64,
                swap_step.sqrt_price_next_x64,
                liquidity,
                false,
            )?;
        }
    }

    // 精确输出模式：不超过剩余量
    if !is_base_input && swap_step.amount_out > amount_remaining {
        swap_step.amount_out = amount_remaining;
    }

    swap_step.fee_amount = if is_base_input && swap_step.sqrt_price_next_x64 != sqrt_price_target_x64 {
        // 未达到目标价格，剩余部分全部作为手续费
        amount_remaining
            .checked_sub(swap_step.amount_in)
            .ok_or(ClmmError::MathOverflow("amount_remaining - amount_in"))?
    } else {
        // amount_in * fee_rate / (1 - fee_rate)，向上取整
        u256_to_u128(
            mul_div_ceil(
                U256::from(swap_step.amount_in),
                U256::from(fee_rate),
                U256::from(FEE_RATE_DENOMINATOR_VALUE - fee_rate),
            )?,
            "fee_amount",
        )?
    };

    Ok(swap_step)
}

/// 预计算走完整个价格区间需要的输入（精确输入）或能拿到的输出（精确输出）
///
/// 溢出说明区间内的量超出了任何可能的剩余量，返回 None
fn calculate_amount_in_range(
    sqrt_price_current_x64: u128,
    sqrt_price_target_x64: u128,
    liquidity: u128,
    zero_for_one: bool,
    is_base_input: bool,
) -> ClmmResult<Option<u128>> {
    let result = if is_base_input {
        if zero_for_one {
            get_token_amount_a_from_liquidity(sqrt_price_target_x64, sqrt_price_current_x64, liquidity, true)
        } else {
            get_token_amount_b_from_liquidity(sqrt_price_current_x64, sqrt_price_target_x64, liquidity, true)
        }
    } else if zero_for_one {
        get_token_amount_b_from_liquidity(sqrt_price_target_x64, sqrt_price_current_x64, liquidity, false)
    } else {
        get_token_amount_a_from_liquidity(sqrt_price_current_x64, sqrt_price_target_x64, liquidity, false)
    };

    match result {
        Ok(amount) => Ok(Some(amount)),
        Err(ClmmError::MathOverflow(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
