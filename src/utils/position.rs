//! 头寸收益计算
//!
//! 和链上 `update_position` 的算法一致：先算区间内的 growth，再和头寸上次
//! 记录的值相减，乘以流动性。growth 累加器只用 wrapping 减法。

use crate::common::clmm_state::{PoolState, PositionState, RewardInfo};
use crate::common::errors::{ClmmError, ClmmResult};
use crate::constants::REWARD_NUM;
use crate::utils::calc::clmm_math::big_num::U256;
use crate::utils::calc::clmm_math::fixed_point_64::Q64;
use crate::utils::calc::clmm_math::full_math::{mul_div_floor, u256_to_u128, wrapping_sub_u128};
use crate::utils::calc::clmm_math::liquidity_math::get_amounts_from_liquidity;
use crate::utils::calc::clmm_math::tick_math::get_sqrt_price_at_tick;
use crate::utils::calc::clmm_tick::TickState;
use tracing::warn;

/// 区间内的手续费 growth `(a, b)`
pub fn get_fee_growth_inside(pool: &PoolState, tick_lower: &TickState, tick_upper: &TickState) -> (u128, u128) {
    let tick_current = pool.tick_current;
    let (fee_growth_below_a, fee_growth_below_b) = if tick_current >= tick_lower.tick {
        (tick_lower.fee_growth_outside_a_x64, tick_lower.fee_growth_outside_b_x64)
    } else {
        (
            wrapping_sub_u128(pool.fee_growth_global_a_x64, tick_lower.fee_growth_outside_a_x64),
            wrapping_sub_u128(pool.fee_growth_global_b_x64, tick_lower.fee_growth_outside_b_x64),
        )
    };
    let (fee_growth_above_a, fee_growth_above_b) = if tick_current < tick_upper.tick {
        (tick_upper.fee_growth_outside_a_x64, tick_upper.fee_growth_outside_b_x64)
    } else {
        (
            wrapping_sub_u128(pool.fee_growth_global_a_x64, tick_upper.fee_growth_outside_a_x64),
            wrapping_sub_u128(pool.fee_growth_global_b_x64, tick_upper.fee_growth_outside_b_x64),
        )
    };
    (
        wrapping_sub_u128(
            wrapping_sub_u128(pool.fee_growth_global_a_x64, fee_growth_below_a),
            fee_growth_above_a,
        ),
        wrapping_sub_u128(
            wrapping_sub_u128(pool.fee_growth_global_b_x64, fee_growth_below_b),
            fee_growth_above_b,
        ),
    )
}

/// 区间内每个奖励的 growth，未启用的槽位为 0
///
/// 边界 tick 没有被引用过（`liquidity_gross == 0`）时 outside 值无意义：
/// 下边界按全部 growth 都在下方处理，上边界按 0 处理
pub fn get_reward_growths_inside(
    tick_current: i32,
    tick_lower: &TickState,
    tick_upper: &TickState,
    reward_infos: &[RewardInfo; REWARD_NUM],
) -> [u128; REWARD_NUM] {
    let mut reward_growths_inside = [0u128; REWARD_NUM];
    for (i, reward_info) in reward_infos.iter().enumerate() {
        if !reward_info.initialized() {
            continue;
        }
        let global = reward_info.reward_growth_global_x64;

        let reward_growth_below = if tick_lower.liquidity_gross == 0 {
            global
        } else if tick_current < tick_lower.tick {
            wrapping_sub_u128(global, tick_lower.reward_growths_outside_x64[i])
        } else {
            tick_lower.reward_growths_outside_x64[i]
        };

        let reward_growth_above = if tick_upper.liquidity_gross == 0 {
            0
        } else if tick_current < tick_upper.tick {
            tick_upper.reward_growths_outside_x64[i]
        } else {
            wrapping_sub_u128(global, tick_upper.reward_growths_outside_x64[i])
        };

        reward_growths_inside[i] =
            wrapping_sub_u128(wrapping_sub_u128(global, reward_growth_below), reward_growth_above);
    }
    reward_growths_inside
}

/// `(inside - last) * liquidity / 2^64`
///
/// 快照不一致时差值会回绕成一个最高位为 1 的数，按 0 处理
fn accrued_amount(
    growth_inside: u128,
    growth_inside_last: u128,
    liquidity: u128,
    context: &'static str,
) -> ClmmResult<u64> {
    let delta = wrapping_sub_u128(growth_inside, growth_inside_last);
    if delta >> 127 == 1 {
        warn!(
            growth_inside,
            growth_inside_last,
            context,
            "negative growth delta, accrued amount floored to 0"
        );
        return Ok(0);
    }
    let amount = u256_to_u128(
        mul_div_floor(U256::from(delta), U256::from(liquidity), U256::from(Q64))?,
        context,
    )?;
    u64::try_from(amount).map_err(|_| ClmmError::MathOverflow(context))
}

/// 头寸当前可领取的手续费 `(a, b)`，包含已记账的 `token_fees_owed`
pub fn get_position_fees(
    pool: &PoolState,
    position: &PositionState,
    tick_lower: &TickState,
    tick_upper: &TickState,
) -> ClmmResult<(u64, u64)> {
    let (fee_growth_inside_a, fee_growth_inside_b) = get_fee_growth_inside(pool, tick_lower, tick_upper);
    let fee_a = accrued_amount(
        fee_growth_inside_a,
        position.fee_growth_inside_a_last_x64,
        position.liquidity,
        "position fee a",
    )?;
    let fee_b = accrued_amount(
        fee_growth_inside_b,
        position.fee_growth_inside_b_last_x64,
        position.liquidity,
        "position fee b",
    )?;
    Ok((
        position
            .token_fees_owed_a
            .checked_add(fee_a)
            .ok_or(ClmmError::MathOverflow("position fee a"))?,
        position
            .token_fees_owed_b
            .checked_add(fee_b)
            .ok_or(ClmmError::MathOverflow("position fee b"))?,
    ))
}

/// 头寸每个奖励当前可领取的数量，包含已记账的 `reward_amount_owed`
pub fn get_position_rewards(
    pool: &PoolState,
    position: &PositionState,
    tick_lower: &TickState,
    tick_upper: &TickState,
) -> ClmmResult<Vec<u64>> {
    let reward_growths_inside =
        get_reward_growths_inside(pool.tick_current, tick_lower, tick_upper, &pool.reward_infos);
    reward_growths_inside
        .iter()
        .zip(position.reward_infos.iter())
        .map(|(&growth_inside, reward_info)| {
            let accrued = accrued_amount(
                growth_inside,
                reward_info.growth_inside_last_x64,
                position.liquidity,
                "position reward",
            )?;
            reward_info
                .reward_amount_owed
                .checked_add(accrued)
                .ok_or(ClmmError::MathOverflow("position reward"))
        })
        .collect()
}

/// 按当前价格把头寸流动性折算成 `(amount_a, amount_b)`
pub fn get_amounts_from_position(pool: &PoolState, position: &PositionState, round_up: bool) -> ClmmResult<(u64, u64)> {
    let (amount_a, amount_b) = get_amounts_from_liquidity(
        pool.sqrt_price_x64,
        get_sqrt_price_at_tick(position.tick_lower_index)?,
        get_sqrt_price_at_tick(position.tick_upper_index)?,
        position.liquidity,
        round_up,
    )?;
    Ok((
        u64::try_from(amount_a).map_err(|_| ClmmError::MathOverflow("position amount a"))?,
        u64::try_from(amount_b).map_err(|_| ClmmError::MathOverflow("position amount b"))?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::clmm_state::{MintInfo, PositionRewardInfo};
    use solana_sdk::pubkey::Pubkey;

    fn pool(tick_current: i32) -> PoolState {
        let mut pool = PoolState::new(
            Pubkey::new_unique(),
            MintInfo::new(Pubkey::new_unique(), 6),
            MintInfo::new(Pubkey::new_unique(), 6),
            60,
            2_500,
            get_sqrt_price_at_tick(tick_current).unwrap(),
            tick_current,
        );
        pool.liquidity = 1_000_000;
        pool
    }

    fn boundary(tick: i32, fee_outside_a: u128, fee_outside_b: u128) -> TickState {
        TickState {
            tick,
            liquidity_gross: 1_000_000,
            fee_growth_outside_a_x64: fee_outside_a,
            fee_growth_outside_b_x64: fee_outside_b,
            ..Default::default()
        }
    }

    #[test]
    fn test_fee_growth_inside_in_range() {
        let mut pool = pool(0);
        pool.fee_growth_global_a_x64 = 100 * Q64;
        pool.fee_growth_global_b_x64 = 50 * Q64;
        let lower = boundary(-60, 10 * Q64, 5 * Q64);
        let upper = boundary(60, 20 * Q64, 5 * Q64);
        assert_eq!(get_fee_growth_inside(&pool, &lower, &upper), (70 * Q64, 40 * Q64));
    }

    #[test]
    fn test_fee_growth_inside_out_of_range() {
        let mut pool = pool(120);
        pool.fee_growth_global_a_x64 = 100 * Q64;
        pool.fee_growth_global_b_x64 = 100 * Q64;
        let lower = boundary(-60, 10 * Q64, 10 * Q64);
        let upper = boundary(60, 30 * Q64, 30 * Q64);
        // 价格在区间上方
        assert_eq!(get_fee_growth_inside(&pool, &lower, &upper), (20 * Q64, 20 * Q64));
    }

    #[test]
    fn test_fee_growth_inside_wraps() {
        let mut pool = pool(0);
        pool.fee_growth_global_a_x64 = 5;
        let lower = boundary(-60, 10, 0);
        let upper = boundary(60, 0, 0);
        let (inside_a, _) = get_fee_growth_inside(&pool, &lower, &upper);
        assert_eq!(inside_a, u128::MAX - 4);
    }

    #[test]
    fn test_position_fees() {
        let mut pool = pool(0);
        pool.fee_growth_global_a_x64 = 3 * Q64;
        pool.fee_growth_global_b_x64 = Q64;
        let lower = boundary(-60, 0, 0);
        let upper = boundary(60, 0, 0);
        let position = PositionState {
            tick_lower_index: -60,
            tick_upper_index: 60,
            liquidity: 1_000,
            fee_growth_inside_a_last_x64: Q64,
            token_fees_owed_a: 7,
            ..Default::default()
        };
        assert_eq!(get_position_fees(&pool, &position, &lower, &upper).unwrap(), (2_007, 1_000));
    }

    #[test]
    fn test_negative_delta_floored() {
        let mut pool = pool(0);
        pool.fee_growth_global_a_x64 = Q64;
        let lower = boundary(-60, 0, 0);
        let upper = boundary(60, 0, 0);
        let position = PositionState {
            liquidity: 1_000,
            fee_growth_inside_a_last_x64: 2 * Q64,
            ..Default::default()
        };
        assert_eq!(get_position_fees(&pool, &position, &lower, &upper).unwrap(), (0, 0));
    }

    #[test]
    fn test_reward_growths_inside() {
        let mut pool = pool(0);
        pool.reward_infos[0].token_mint = Pubkey::new_unique();
        pool.reward_infos[0].reward_growth_global_x64 = 10 * Q64;
        pool.reward_infos[1].token_mint = Pubkey::new_unique();
        pool.reward_infos[1].reward_growth_global_x64 = 10 * Q64;
        // 未启用的槽位即使有 growth 也不计算
        pool.reward_infos[2].reward_growth_global_x64 = 10 * Q64;

        let mut lower = boundary(-60, 0, 0);
        lower.reward_growths_outside_x64 = [2 * Q64, 0, 0];
        let mut upper = boundary(60, 0, 0);
        upper.reward_growths_outside_x64 = [3 * Q64, 0, 0];
        assert_eq!(
            get_reward_growths_inside(pool.tick_current, &lower, &upper, &pool.reward_infos),
            [5 * Q64, 10 * Q64, 0]
        );

        // 未被引用的下边界：全部 growth 都算在下方
        lower.liquidity_gross = 0;
        assert_eq!(
            get_reward_growths_inside(pool.tick_current, &lower, &upper, &pool.reward_infos),
            [0u128.wrapping_sub(3 * Q64), 0, 0]
        );
        // 未被引用的上边界按 0 处理
        lower.liquidity_gross = 1;
        upper.liquidity_gross = 0;
        assert_eq!(
            get_reward_growths_inside(pool.tick_current, &lower, &upper, &pool.reward_infos),
            [8 * Q64, 10 * Q64, 0]
        );

        let position = PositionState {
            liquidity: 100,
            reward_infos: [
                PositionRewardInfo {
                    growth_inside_last_x64: 6 * Q64,
                    reward_amount_owed: 1,
                },
                PositionRewardInfo::default(),
                PositionRewardInfo::default(),
            ],
            ..Default::default()
        };
        upper.liquidity_gross = 1;
        assert_eq!(
            get_position_rewards(&pool, &position, &lower, &upper).unwrap(),
            vec![1, 1_000, 0]
        );
    }

    #[test]
    fn test_amounts_from_position() {
        let pool = pool(0);
        let position = PositionState {
            tick_lower_index: -60,
            tick_upper_index: 60,
            liquidity: 1_000_000_000,
            ..Default::default()
        };
        let (amount_a, amount_b) = get_amounts_from_position(&pool, &position, false).unwrap();
        // 对称区间在价格 1 处两侧数量相同
        assert!(amount_a.abs_diff(amount_b) <= 2);
        assert!(amount_a > 2_900_000 && amount_a < 3_100_000);

        let (up_a, up_b) = get_amounts_from_position(&pool, &position, true).unwrap();
        assert!(up_a >= amount_a && up_b >= amount_b);

        let below = PositionState {
            tick_lower_index: 60,
            tick_upper_index: 120,
            ..position
        };
        let (only_a, none_b) = get_amounts_from_position(&pool, &below, false).unwrap();
        assert!(only_a > 0);
        assert_eq!(none_b, 0);
    }
}
