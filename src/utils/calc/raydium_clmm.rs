// Copyright (c) Raydium Foundation
// Licensed under Apache 2.0
// Raydium CLMM swap simulation using official math libraries

//! Raydium CLMM 完整 swap 模拟
//!
//! tick-by-tick 遍历：在当前 tick array 内找下一个已初始化 tick，用完后通过
//! bitmap 找下一个 tick array，逐步推动价格直到数量用完或触及价格限制。
//! 所有中间状态都在本地 `SwapState` 里，不修改调用方的池子和 tick array。

use super::clmm_math::liquidity_math::add_delta;
use super::clmm_math::swap_math::compute_swap_step;
use super::clmm_math::tick_math::{
    MAX_SQRT_PRICE_X64, MAX_TICK, MIN_SQRT_PRICE_X64, MIN_TICK, get_sqrt_price_at_tick, get_tick_at_sqrt_price,
};
use super::clmm_tick::tick_query::next_initialized_tick_array_start_index;
use super::clmm_tick::{TickArrayBitmapExtension, TickArrayBitmapSource, TickArrayCache, tick_count};
use crate::common::clmm_state::PoolState;
use crate::common::errors::{ClmmError, ClmmResult};
use crate::common::types::QuoteConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Swap 状态
#[derive(Debug, Clone)]
pub struct SwapState {
    /// 剩余需要满足的数量（精确输入为正，精确输出为负）
    pub amount_specified_remaining: i128,
    /// 已计算的另一侧数量（精确输入时为负的输出量，精确输出时为正的输入量）
    pub amount_calculated: i128,
    /// 当前价格
    pub sqrt_price_x64: u128,
    /// 当前 tick
    pub tick: i32,
    /// 当前流动性
    pub liquidity: u128,
    /// 累计手续费（输入 token）
    pub fee_amount: u128,
    /// 途中新用到的 tick array 起始 index
    pub accounts: Vec<i32>,
}

/// Step 计算状态
#[derive(Debug, Clone, Default)]
pub struct StepComputations {
    pub sqrt_price_start_x64: u128,
    pub tick_next: i32,
    pub initialized: bool,
    pub sqrt_price_next_x64: u128,
    pub amount_in: u128,
    pub amount_out: u128,
    pub fee_amount: u128,
}

/// swap 模拟输入
#[derive(Debug, Clone, Copy)]
pub struct SwapComputeParams<'a> {
    pub tick_array_cache: &'a TickArrayCache,
    pub tick_array_bitmap: &'a [u64; 16],
    pub bitmap_extension: &'a TickArrayBitmapExtension,
    pub zero_for_one: bool,
    pub fee_rate: u32,
    pub liquidity: u128,
    pub tick_current: i32,
    pub tick_spacing: u16,
    pub sqrt_price_x64: u128,
    /// 正数为精确输入，负数为精确输出，绝对值不能超过 u64::MAX
    pub amount_specified: i128,
    /// 第一个要使用的 tick array
    pub last_saved_tick_array_start_index: i32,
    /// None 时使用协议边界 `MIN_SQRT_PRICE_X64 + 1` / `MAX_SQRT_PRICE_X64 - 1`
    pub sqrt_price_limit_x64: Option<u128>,
}

impl<'a> SwapComputeParams<'a> {
    /// 从池子快照构建
    pub fn from_pool(
        pool: &'a PoolState,
        tick_array_cache: &'a TickArrayCache,
        zero_for_one: bool,
        amount_specified: i128,
        first_tick_array_start_index: i32,
        sqrt_price_limit_x64: Option<u128>,
    ) -> Self {
        Self {
            tick_array_cache,
            tick_array_bitmap: &pool.tick_array_bitmap,
            bitmap_extension: &pool.tick_array_bitmap_extension,
            zero_for_one,
            fee_rate: pool.trade_fee_rate,
            liquidity: pool.liquidity,
            tick_current: pool.tick_current,
            tick_spacing: pool.tick_spacing,
            sqrt_price_x64: pool.sqrt_price_x64,
            amount_specified,
            last_saved_tick_array_start_index: first_tick_array_start_index,
            sqrt_price_limit_x64,
        }
    }
}

/// swap 模拟结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapComputeResult {
    /// 流动性不足提前结束时为 false
    pub all_trade: bool,
    pub amount_specified_remaining: i128,
    pub amount_calculated: i128,
    pub fee_amount: u128,
    pub sqrt_price_x64: u128,
    pub liquidity: u128,
    pub tick_current: i32,
    /// 除第一个 tick array 之外需要附加的 tick array 起始 index，按使用顺序
    pub accounts: Vec<i32>,
}

impl SwapComputeResult {
    fn from_state(state: SwapState, all_trade: bool) -> Self {
        Self {
            all_trade,
            amount_specified_remaining: state.amount_specified_remaining,
            amount_calculated: state.amount_calculated,
            fee_amount: state.fee_amount,
            sqrt_price_x64: state.sqrt_price_x64,
            liquidity: state.liquidity,
            tick_current: state.tick,
            accounts: state.accounts,
        }
    }
}

/// swap 过程中查询 bitmap 用的视图，tick 跟随模拟状态
struct SwapBitmapView<'a> {
    tick_current: i32,
    tick_spacing: u16,
    tick_array_bitmap: &'a [u64; 16],
    bitmap_extension: &'a TickArrayBitmapExtension,
}

impl TickArrayBitmapSource for SwapBitmapView<'_> {
    fn tick_current(&self) -> i32 {
        self.tick_current
    }

    fn tick_spacing(&self) -> u16 {
        self.tick_spacing
    }

    fn tick_array_bitmap(&self) -> &[u64; 16] {
        self.tick_array_bitmap
    }

    fn bitmap_extension(&self) -> &TickArrayBitmapExtension {
        self.bitmap_extension
    }
}

fn to_i128(value: u128, context: &'static str) -> ClmmResult<i128> {
    i128::try_from(value).map_err(|_| ClmmError::MathOverflow(context))
}

/// 默认价格限制
pub fn default_sqrt_price_limit(zero_for_one: bool) -> u128 {
    if zero_for_one {
        MIN_SQRT_PRICE_X64 + 1
    } else {
        MAX_SQRT_PRICE_X64 - 1
    }
}

/// 完整的 swap 模拟
///
/// tick array 只从 `tick_array_cache` 里取，缺少时返回 `TickArrayNotLoaded`，不会去链上拉取。
/// 流动性耗尽时默认返回 `LiquidityInsufficient`，`catch_liquidity_insufficient` 打开时
/// 返回 `all_trade = false` 的部分结果。
pub fn swap_compute(params: SwapComputeParams<'_>, config: &QuoteConfig) -> ClmmResult<SwapComputeResult> {
    let SwapComputeParams {
        tick_array_cache,
        tick_array_bitmap,
        bitmap_extension,
        zero_for_one,
        fee_rate,
        liquidity,
        tick_current,
        tick_spacing,
        sqrt_price_x64,
        amount_specified,
        last_saved_tick_array_start_index,
        sqrt_price_limit_x64,
    } = params;

    if amount_specified == 0 {
        return Err(ClmmError::ZeroAmountSpecified);
    }
    if amount_specified.unsigned_abs() > u128::from(u64::MAX) {
        return Err(ClmmError::MathOverflow("amount_specified exceeds u64"));
    }

    let sqrt_price_limit_x64 = sqrt_price_limit_x64.unwrap_or_else(|| default_sqrt_price_limit(zero_for_one));
    if zero_for_one {
        if sqrt_price_limit_x64 < MIN_SQRT_PRICE_X64 {
            return Err(ClmmError::SqrtPriceLimitOutOfRange {
                sqrt_price_limit_x64,
                min: MIN_SQRT_PRICE_X64,
                max: MAX_SQRT_PRICE_X64,
            });
        }
        if sqrt_price_limit_x64 >= sqrt_price_x64 {
            return Err(ClmmError::SqrtPriceLimitWrongSide {
                sqrt_price_limit_x64,
                sqrt_price_x64,
                zero_for_one,
            });
        }
    } else {
        if sqrt_price_limit_x64 > MAX_SQRT_PRICE_X64 {
            return Err(ClmmError::SqrtPriceLimitOutOfRange {
                sqrt_price_limit_x64,
                min: MIN_SQRT_PRICE_X64,
                max: MAX_SQRT_PRICE_X64,
            });
        }
        if sqrt_price_limit_x64 <= sqrt_price_x64 {
            return Err(ClmmError::SqrtPriceLimitWrongSide {
                sqrt_price_limit_x64,
                sqrt_price_x64,
                zero_for_one,
            });
        }
    }

    let base_input = amount_specified > 0;
    let ticks_in_array = tick_count(tick_spacing);
    let mut last_saved_tick_array_start_index = last_saved_tick_array_start_index;

    // 第一个 tick array 必须包含当前 tick，或位于 swap 方向的前方
    let first_array_behind = if zero_for_one {
        last_saved_tick_array_start_index > tick_current
    } else {
        last_saved_tick_array_start_index + ticks_in_array <= tick_current
    };
    if first_array_behind {
        return Err(ClmmError::InvalidTickArray { tick_current });
    }

    let mut tick_array_current = tick_array_cache
        .get(&last_saved_tick_array_start_index)
        .ok_or(ClmmError::TickArrayNotLoaded {
            start_index: last_saved_tick_array_start_index,
        })?;

    let mut state = SwapState {
        amount_specified_remaining: amount_specified,
        amount_calculated: 0,
        sqrt_price_x64,
        tick: if tick_current > last_saved_tick_array_start_index {
            (last_saved_tick_array_start_index + ticks_in_array - 1).min(tick_current)
        } else {
            last_saved_tick_array_start_index
        },
        liquidity,
        fee_amount: 0,
        accounts: Vec::new(),
    };
    // 向上 swap 且第一个 tick array 在当前价格前方时，array 的第一个槽位还没有被穿过
    let mut include_current = !zero_for_one && tick_current < tick_array_current.start_tick_index;

    debug!(
        zero_for_one,
        amount_specified,
        tick_current,
        sqrt_price_x64,
        liquidity,
        first_tick_array = last_saved_tick_array_start_index,
        "swap_compute start"
    );

    let mut loop_count: u32 = 0;
    while state.amount_specified_remaining != 0 && state.sqrt_price_x64 != sqrt_price_limit_x64 {
        if loop_count >= config.max_swap_loop {
            return Err(ClmmError::LiquidityLimit {
                max_loop: config.max_swap_loop,
            });
        }

        let mut step = StepComputations {
            sqrt_price_start_x64: state.sqrt_price_x64,
            ..Default::default()
        };

        let next_init_tick = match tick_array_current.next_init_tick(
            state.tick,
            tick_spacing,
            zero_for_one,
            include_current,
        ) {
            Some(tick_state) => tick_state,
            None => {
                let view = SwapBitmapView {
                    tick_current: state.tick,
                    tick_spacing,
                    tick_array_bitmap,
                    bitmap_extension,
                };
                let next_start_index = match next_initialized_tick_array_start_index(
                    &view,
                    tick_array_current.start_tick_index,
                    zero_for_one,
                )? {
                    Some(start_index) => start_index,
                    None => {
                        if config.catch_liquidity_insufficient {
                            warn!(
                                tick = state.tick,
                                amount_remaining = state.amount_specified_remaining,
                                "swap_compute stopped: liquidity insufficient"
                            );
                            return Ok(SwapComputeResult::from_state(state, false));
                        }
                        return Err(ClmmError::LiquidityInsufficient {
                            tick: state.tick,
                            amount_remaining: state.amount_specified_remaining,
                        });
                    }
                };
                tick_array_current = tick_array_cache
                    .get(&next_start_index)
                    .ok_or(ClmmError::TickArrayNotLoaded {
                        start_index: next_start_index,
                    })?;
                if last_saved_tick_array_start_index != next_start_index {
                    state.accounts.push(next_start_index);
                    last_saved_tick_array_start_index = next_start_index;
                }
                tick_array_current.first_initialized_tick(zero_for_one)?
            }
        };

        step.tick_next = next_init_tick.tick.clamp(MIN_TICK, MAX_TICK);
        step.initialized = next_init_tick.is_initialized();
        step.sqrt_price_next_x64 = get_sqrt_price_at_tick(step.tick_next)?;

        let target_price = if (zero_for_one && step.sqrt_price_next_x64 < sqrt_price_limit_x64)
            || (!zero_for_one && step.sqrt_price_next_x64 > sqrt_price_limit_x64)
        {
            sqrt_price_limit_x64
        } else {
            step.sqrt_price_next_x64
        };

        let swap_step = compute_swap_step(
            state.sqrt_price_x64,
            target_price,
            state.liquidity,
            state.amount_specified_remaining.unsigned_abs(),
            fee_rate,
            base_input,
            zero_for_one,
        )?;
        state.sqrt_price_x64 = swap_step.sqrt_price_next_x64;
        step.amount_in = swap_step.amount_in;
        step.amount_out = swap_step.amount_out;
        step.fee_amount = swap_step.fee_amount;

        state.fee_amount = state
            .fee_amount
            .checked_add(step.fee_amount)
            .ok_or(ClmmError::MathOverflow("fee_amount"))?;

        let amount_in_with_fee = to_i128(
            step.amount_in
                .checked_add(step.fee_amount)
                .ok_or(ClmmError::MathOverflow("amount_in + fee_amount"))?,
            "amount_in + fee_amount",
        )?;
        let amount_out = to_i128(step.amount_out, "amount_out")?;
        if base_input {
            state.amount_specified_remaining = state
                .amount_specified_remaining
                .checked_sub(amount_in_with_fee)
                .ok_or(ClmmError::MathOverflow("amount_specified_remaining"))?;
            state.amount_calculated = state
                .amount_calculated
                .checked_sub(amount_out)
                .ok_or(ClmmError::MathOverflow("amount_calculated"))?;
        } else {
            state.amount_specified_remaining = state
                .amount_specified_remaining
                .checked_add(amount_out)
                .ok_or(ClmmError::MathOverflow("amount_specified_remaining"))?;
            state.amount_calculated = state
                .amount_calculated
                .checked_add(amount_in_with_fee)
                .ok_or(ClmmError::MathOverflow("amount_calculated"))?;
        }

        if state.sqrt_price_x64 == step.sqrt_price_next_x64 {
            // 穿过 tick
            if step.initialized {
                let liquidity_net = if zero_for_one {
                    next_init_tick.liquidity_net.checked_neg().ok_or(ClmmError::LiquidityOverflow {
                        liquidity: state.liquidity,
                        delta: next_init_tick.liquidity_net,
                    })?
                } else {
                    next_init_tick.liquidity_net
                };
                state.liquidity = add_delta(state.liquidity, liquidity_net)?;
            }
            include_current = false;
            state.tick = if zero_for_one {
                step.tick_next - 1
            } else {
                step.tick_next
            };
        } else if state.sqrt_price_x64 != step.sqrt_price_start_x64 {
            let tick = get_tick_at_sqrt_price(state.sqrt_price_x64)?;
            include_current =
                tick != state.tick && !zero_for_one && tick_array_current.start_tick_index == tick;
            state.tick = tick;
        }

        trace!(
            loop_count,
            tick_next = step.tick_next,
            initialized = step.initialized,
            amount_in = step.amount_in,
            amount_out = step.amount_out,
            fee_amount = step.fee_amount,
            sqrt_price_x64 = state.sqrt_price_x64,
            liquidity = state.liquidity,
            tick = state.tick,
            "swap step"
        );
        loop_count += 1;
    }

    // 预先带上方向上的下一个 tick array，成交时价格多走一点也不会缺账户
    let view = SwapBitmapView {
        tick_current: state.tick,
        tick_spacing,
        tick_array_bitmap,
        bitmap_extension,
    };
    if let Some(next_start_index) = next_initialized_tick_array_start_index(&view, state.tick, zero_for_one)? {
        if next_start_index != last_saved_tick_array_start_index {
            state.accounts.push(next_start_index);
        }
    }

    debug!(
        amount_calculated = state.amount_calculated,
        amount_remaining = state.amount_specified_remaining,
        fee_amount = state.fee_amount,
        tick = state.tick,
        steps = loop_count,
        "swap_compute done"
    );

    Ok(SwapComputeResult::from_state(state, true))
}
