//! Quote / simulation helpers for swap routing.
//!
//! CLMM 报价入口：给定输入（或输出）mint 和数量，跑一遍 swap 模拟，
//! 返回另一侧的数量、需要附带的 tick array 以及价格影响。
//! `QuoteExactInResult` 是跨池子比较用的统一结果。

use crate::common::clmm_state::{MintInfo, PoolState};
use crate::common::errors::{ClmmError, ClmmResult};
use crate::common::types::QuoteConfig;
use crate::utils::calc::clmm_math::price_math::{price_to_sqrt_price_x64, sqrt_price_x64_to_price};
use crate::utils::calc::clmm_tick::TickArrayCache;
use crate::utils::calc::clmm_tick::tick_query::{
    first_initialized_tick_array, pre_initialized_tick_array_start_index,
};
use crate::utils::calc::raydium_clmm::{SwapComputeParams, SwapComputeResult, swap_compute};
use crate::utils::token::{TransferAmountFee, get_transfer_amount_fee};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteExactInResult {
    /// Output amount for an exact-in swap (in smallest units).
    pub amount_out: u64,
    /// Total fee amount paid (in input token units, smallest units).
    pub fee_amount: u64,
    /// Optional price impact estimation in basis points.
    pub price_impact_bps: Option<u64>,
    /// Number of extra on-chain accounts read to produce this quote.
    pub extra_accounts_read: usize,
}

/// swap 模拟结果加上调用方需要传给链上指令的 tick array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountAndRemainAccounts {
    /// 流动性不足时为 false（仅在 `catch_liquidity_insufficient` 打开时出现）
    pub all_trade: bool,
    /// 精确输入时是输出量，精确输出时是所需输入量（含手续费）
    pub amount: u64,
    /// 交易手续费（输入 token）
    pub fee_amount: u64,
    /// 成交后的价格
    pub sqrt_price_x64: u128,
    pub liquidity: u128,
    pub tick_current: i32,
    /// tick array 起始 index，按链上指令需要的顺序
    pub remaining_accounts: Vec<i32>,
}

/// 精确输入报价
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClmmQuoteExactIn {
    pub all_trade: bool,
    /// 用户转出的数量，fee 为 transfer fee
    pub real_amount_in: TransferAmountFee,
    /// 池子输出量，fee 为输出 mint 的 transfer fee，到账 = amount - fee
    pub amount_out: TransferAmountFee,
    /// 按滑点计算的最小输出
    pub min_amount_out: TransferAmountFee,
    /// 成交前价格（输入 token 计价）
    pub current_price: Decimal,
    /// 成交后价格（输入 token 计价）
    pub execution_price: Decimal,
    pub price_impact: Decimal,
    /// 交易手续费（输入 token）
    pub fee: u64,
    pub remaining_accounts: Vec<i32>,
}

impl ClmmQuoteExactIn {
    /// 转成跨池子比较用的结果
    pub fn to_exact_in_result(&self) -> QuoteExactInResult {
        QuoteExactInResult {
            amount_out: self.amount_out.amount.saturating_sub(self.amount_out.fee),
            fee_amount: self.fee,
            price_impact_bps: (self.price_impact * Decimal::from(10_000u32)).round().to_u64(),
            extra_accounts_read: self.remaining_accounts.len(),
        }
    }
}

/// 精确输出报价
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClmmQuoteExactOut {
    pub all_trade: bool,
    /// 用户需要转出的数量，fee 为输入 mint 的 transfer fee
    pub amount_in: TransferAmountFee,
    /// 按滑点计算的最大输入
    pub max_amount_in: TransferAmountFee,
    /// 为了到账 `amount_out`，池子需要输出的数量
    pub real_amount_out: TransferAmountFee,
    pub current_price: Decimal,
    pub execution_price: Decimal,
    pub price_impact: Decimal,
    pub fee: u64,
    pub remaining_accounts: Vec<i32>,
}

#[derive(Debug, Clone, Copy)]
pub struct ComputeAmountOutParams<'a> {
    pub pool: &'a PoolState,
    pub tick_array_cache: &'a TickArrayCache,
    pub input_mint: Pubkey,
    pub amount_in: u64,
    /// 0.01 = 1%
    pub slippage: Decimal,
    /// 池子方向（token B / token A）的限价，None 或 0 时不限价
    pub price_limit: Option<Decimal>,
    pub config: &'a QuoteConfig,
}

#[derive(Debug, Clone, Copy)]
pub struct ComputeAmountInParams<'a> {
    pub pool: &'a PoolState,
    pub tick_array_cache: &'a TickArrayCache,
    pub output_mint: Pubkey,
    /// 希望到账的数量
    pub amount_out: u64,
    pub slippage: Decimal,
    pub price_limit: Option<Decimal>,
    pub config: &'a QuoteConfig,
}

fn to_u64(value: u128, context: &'static str) -> ClmmResult<u64> {
    u64::try_from(value).map_err(|_| ClmmError::MathOverflow(context))
}

fn check_slippage(slippage: Decimal) -> ClmmResult<()> {
    if slippage < Decimal::ZERO || slippage > Decimal::ONE {
        return Err(ClmmError::InvalidSlippage(slippage.to_string()));
    }
    Ok(())
}

fn sqrt_price_limit_from_price(pool: &PoolState, price_limit: Option<Decimal>) -> ClmmResult<Option<u128>> {
    match price_limit {
        Some(price) if !price.is_zero() => Ok(Some(price_to_sqrt_price_x64(
            price,
            pool.mint_a.decimals,
            pool.mint_b.decimals,
        )?)),
        _ => Ok(None),
    }
}

/// 报价方向上的价格：输入 A 时为 B/A，输入 B 时取倒数
fn oriented_price(sqrt_price_x64: u128, mint_a: &MintInfo, mint_b: &MintInfo, base_in: bool) -> ClmmResult<Decimal> {
    let price = sqrt_price_x64_to_price(sqrt_price_x64, mint_a.decimals, mint_b.decimals)?;
    if base_in {
        Ok(price)
    } else {
        Decimal::ONE
            .checked_div(price)
            .ok_or_else(|| ClmmError::InvalidPrice(price.to_string()))
    }
}

/// `|execution - current| / current`
fn price_impact(current_price: Decimal, execution_price: Decimal) -> ClmmResult<Decimal> {
    (execution_price - current_price)
        .abs()
        .checked_div(current_price)
        .ok_or_else(|| ClmmError::InvalidPrice(current_price.to_string()))
}

fn apply_slippage(amount: u64, slippage: Decimal, round_up: bool) -> ClmmResult<u64> {
    let factor = if round_up {
        Decimal::ONE + slippage
    } else {
        Decimal::ONE - slippage
    };
    let value = Decimal::from(amount)
        .checked_mul(factor)
        .ok_or_else(|| ClmmError::DecimalConversion(format!("{amount} * {factor}")))?;
    let value = if round_up { value.ceil() } else { value.floor() };
    value
        .to_u64()
        .ok_or_else(|| ClmmError::DecimalConversion(value.to_string()))
}

fn into_amount_and_remain_accounts(
    result: SwapComputeResult,
    pre_tick_array: Option<i32>,
    first_tick_array: i32,
    base_input: bool,
) -> ClmmResult<AmountAndRemainAccounts> {
    let amount = if base_input {
        // 输出量记为负数
        to_u64(result.amount_calculated.unsigned_abs(), "amount out")?
    } else {
        to_u64(result.amount_calculated.unsigned_abs(), "amount in")?
    };
    let mut remaining_accounts = Vec::with_capacity(result.accounts.len() + 2);
    if let Some(pre_tick_array) = pre_tick_array {
        remaining_accounts.push(pre_tick_array);
    }
    remaining_accounts.push(first_tick_array);
    remaining_accounts.extend(result.accounts);

    Ok(AmountAndRemainAccounts {
        all_trade: result.all_trade,
        amount,
        fee_amount: to_u64(result.fee_amount, "fee amount")?,
        sqrt_price_x64: result.sqrt_price_x64,
        liquidity: result.liquidity,
        tick_current: result.tick_current,
        remaining_accounts,
    })
}

fn simulate(
    pool: &PoolState,
    tick_array_cache: &TickArrayCache,
    zero_for_one: bool,
    amount_specified: i128,
    sqrt_price_limit_x64: Option<u128>,
    config: &QuoteConfig,
) -> ClmmResult<AmountAndRemainAccounts> {
    let first_tick_array = first_initialized_tick_array(pool, zero_for_one)?.ok_or(ClmmError::InvalidTickArray {
        tick_current: pool.tick_current,
    })?;
    let pre_tick_array = pre_initialized_tick_array_start_index(pool, zero_for_one);

    let result = swap_compute(
        SwapComputeParams::from_pool(
            pool,
            tick_array_cache,
            zero_for_one,
            amount_specified,
            first_tick_array,
            sqrt_price_limit_x64,
        ),
        config,
    )?;
    into_amount_and_remain_accounts(result, pre_tick_array, first_tick_array, amount_specified > 0)
}

/// 精确输入：`amount_in` 个 `input_mint` 能换多少
///
/// remaining accounts 依次为反方向最近的 tick array（如果有）、第一个 tick array、swap 途中用到的 tick array
pub fn get_output_amount_and_remain_accounts(
    pool: &PoolState,
    tick_array_cache: &TickArrayCache,
    input_mint: &Pubkey,
    amount_in: u64,
    sqrt_price_limit_x64: Option<u128>,
    config: &QuoteConfig,
) -> ClmmResult<AmountAndRemainAccounts> {
    let zero_for_one = pool.zero_for_one_for_input(input_mint)?;
    simulate(
        pool,
        tick_array_cache,
        zero_for_one,
        i128::from(amount_in),
        sqrt_price_limit_x64,
        config,
    )
}

/// 精确输出：换到 `amount_out` 个 `output_mint` 需要多少输入
pub fn get_input_amount_and_remain_accounts(
    pool: &PoolState,
    tick_array_cache: &TickArrayCache,
    output_mint: &Pubkey,
    amount_out: u64,
    sqrt_price_limit_x64: Option<u128>,
    config: &QuoteConfig,
) -> ClmmResult<AmountAndRemainAccounts> {
    // 输出 B 即输入 A
    let zero_for_one = !pool.zero_for_one_for_input(output_mint)?;
    simulate(
        pool,
        tick_array_cache,
        zero_for_one,
        -i128::from(amount_out),
        sqrt_price_limit_x64,
        config,
    )
}

/// 精确输入报价，处理 transfer fee、滑点和价格影响
pub fn compute_amount_out(params: ComputeAmountOutParams<'_>) -> ClmmResult<ClmmQuoteExactIn> {
    let ComputeAmountOutParams {
        pool,
        tick_array_cache,
        input_mint,
        amount_in,
        slippage,
        price_limit,
        config,
    } = params;
    check_slippage(slippage)?;
    let base_in = pool.zero_for_one_for_input(&input_mint)?;
    let (mint_in, mint_out) = if base_in {
        (&pool.mint_a, &pool.mint_b)
    } else {
        (&pool.mint_b, &pool.mint_a)
    };
    debug!(pool = %pool.id, %input_mint, amount_in, %slippage, "compute_amount_out");

    let sqrt_price_limit_x64 = sqrt_price_limit_from_price(pool, price_limit)?;
    let real_amount_in = get_transfer_amount_fee(amount_in, mint_in.transfer_fee_config.as_ref(), config.epoch, false)?;
    let amount_after_fee = real_amount_in.amount - real_amount_in.fee;

    let swap = get_output_amount_and_remain_accounts(
        pool,
        tick_array_cache,
        &input_mint,
        amount_after_fee,
        sqrt_price_limit_x64,
        config,
    )?;

    let out_fee_config = mint_out.transfer_fee_config.as_ref();
    let amount_out = get_transfer_amount_fee(swap.amount, out_fee_config, config.epoch, false)?;
    let min_amount_out = get_transfer_amount_fee(
        apply_slippage(swap.amount, slippage, false)?,
        out_fee_config,
        config.epoch,
        false,
    )?;

    let current_price = oriented_price(pool.sqrt_price_x64, &pool.mint_a, &pool.mint_b, base_in)?;
    let execution_price = oriented_price(swap.sqrt_price_x64, &pool.mint_a, &pool.mint_b, base_in)?;
    let price_impact = price_impact(current_price, execution_price)?;

    debug!(
        amount_out = amount_out.amount,
        transfer_fee_out = amount_out.fee,
        fee = swap.fee_amount,
        %price_impact,
        accounts = swap.remaining_accounts.len(),
        "compute_amount_out done"
    );

    Ok(ClmmQuoteExactIn {
        all_trade: swap.all_trade,
        real_amount_in,
        amount_out,
        min_amount_out,
        current_price,
        execution_price,
        price_impact,
        fee: swap.fee_amount,
        remaining_accounts: swap.remaining_accounts,
    })
}

/// 精确输出报价：`amount_out` 是用户希望到账的数量
pub fn compute_amount_in(params: ComputeAmountInParams<'_>) -> ClmmResult<ClmmQuoteExactOut> {
    let ComputeAmountInParams {
        pool,
        tick_array_cache,
        output_mint,
        amount_out,
        slippage,
        price_limit,
        config,
    } = params;
    check_slippage(slippage)?;
    let base_in = !pool.zero_for_one_for_input(&output_mint)?;
    let (mint_in, mint_out) = if base_in {
        (&pool.mint_a, &pool.mint_b)
    } else {
        (&pool.mint_b, &pool.mint_a)
    };
    debug!(pool = %pool.id, %output_mint, amount_out, %slippage, "compute_amount_in");

    let sqrt_price_limit_x64 = sqrt_price_limit_from_price(pool, price_limit)?;
    // 池子要多输出 transfer fee，用户才能到账 amount_out
    let real_amount_out =
        get_transfer_amount_fee(amount_out, mint_out.transfer_fee_config.as_ref(), config.epoch, true)?;

    let swap = get_input_amount_and_remain_accounts(
        pool,
        tick_array_cache,
        &output_mint,
        real_amount_out.amount,
        sqrt_price_limit_x64,
        config,
    )?;

    let in_fee_config = mint_in.transfer_fee_config.as_ref();
    let amount_in = get_transfer_amount_fee(swap.amount, in_fee_config, config.epoch, true)?;
    let max_amount_in = get_transfer_amount_fee(
        apply_slippage(swap.amount, slippage, true)?,
        in_fee_config,
        config.epoch,
        true,
    )?;

    let current_price = oriented_price(pool.sqrt_price_x64, &pool.mint_a, &pool.mint_b, base_in)?;
    let execution_price = oriented_price(swap.sqrt_price_x64, &pool.mint_a, &pool.mint_b, base_in)?;
    let price_impact = price_impact(current_price, execution_price)?;

    debug!(
        amount_in = amount_in.amount,
        transfer_fee_in = amount_in.fee,
        fee = swap.fee_amount,
        %price_impact,
        accounts = swap.remaining_accounts.len(),
        "compute_amount_in done"
    );

    Ok(ClmmQuoteExactOut {
        all_trade: swap.all_trade,
        amount_in,
        max_amount_in,
        real_amount_out,
        current_price,
        execution_price,
        price_impact,
        fee: swap.fee_amount,
        remaining_accounts: swap.remaining_accounts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::calc::clmm_math::fixed_point_64::Q64;
    use crate::utils::calc::clmm_tick::{TickArrayState, TickState};
    use crate::utils::token::{TransferFee, TransferFeeConfig};
    use std::str::FromStr;

    const SPACING: u16 = 60;

    fn tick(tick: i32, liquidity_net: i128) -> TickState {
        TickState {
            tick,
            liquidity_net,
            liquidity_gross: liquidity_net.unsigned_abs(),
            ..Default::default()
        }
    }

    /// 头寸 [-3600, 3600) 流动性 1e9，tick array -7200 / -3600 / 0 / 3600 都已初始化
    fn pool_and_cache() -> (PoolState, TickArrayCache) {
        let mut pool = PoolState::new(
            Pubkey::new_unique(),
            MintInfo::new(Pubkey::new_unique(), 6),
            MintInfo::new(Pubkey::new_unique(), 6),
            SPACING,
            2_500,
            Q64,
            0,
        );
        pool.liquidity = 1_000_000_000;
        let mut cache = TickArrayCache::new();
        let mut lower = TickArrayState::new(-3600, SPACING).unwrap();
        lower.set_tick(tick(-3600, 1_000_000_000), SPACING).unwrap();
        let mut upper = TickArrayState::new(3600, SPACING).unwrap();
        upper.set_tick(tick(3600, -1_000_000_000), SPACING).unwrap();
        let mut current = TickArrayState::new(0, SPACING).unwrap();
        current.set_tick(tick(60, 1), SPACING).unwrap();
        let mut far = TickArrayState::new(-7200, SPACING).unwrap();
        far.set_tick(tick(-7200, 1), SPACING).unwrap();
        for array in [lower, upper, current, far] {
            pool.flip_tick_array_bit(array.start_tick_index).unwrap();
            cache.insert(array.start_tick_index, array);
        }
        (pool, cache)
    }

    #[test]
    fn test_output_amount_and_accounts() {
        let (pool, cache) = pool_and_cache();
        let config = QuoteConfig::default();
        let result =
            get_output_amount_and_remain_accounts(&pool, &cache, &pool.mint_a.address, 1_000_000, None, &config)
                .unwrap();
        assert!(result.all_trade);
        assert!(result.amount > 990_000 && result.amount < 1_000_000);
        assert!((2_500..=2_501).contains(&result.fee_amount));
        // 反方向的 3600 在最前，当前 array 0，途中进入 -3600，最后预带 -7200
        assert_eq!(result.remaining_accounts, vec![3600, 0, -3600, -7200]);
    }

    #[test]
    fn test_input_amount_exact_out() {
        let (pool, cache) = pool_and_cache();
        let config = QuoteConfig::default();
        let result =
            get_input_amount_and_remain_accounts(&pool, &cache, &pool.mint_a.address, 1_000_000, None, &config)
                .unwrap();
        // 输出 A 即输入 B，价格向上
        assert!(result.amount > 1_000_000);
        assert!(result.sqrt_price_x64 > Q64);
        assert_eq!(result.remaining_accounts[0], -3600);
        assert_eq!(result.remaining_accounts[1], 0);
    }

    #[test]
    fn test_unknown_mint() {
        let (pool, cache) = pool_and_cache();
        let err = get_output_amount_and_remain_accounts(
            &pool,
            &cache,
            &Pubkey::new_unique(),
            1_000,
            None,
            &QuoteConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ClmmError::InvalidMint(_)));
    }

    #[test]
    fn test_no_tick_array_in_direction() {
        let (mut pool, cache) = pool_and_cache();
        pool.tick_array_bitmap = [0; 16];
        let err = get_output_amount_and_remain_accounts(
            &pool,
            &cache,
            &pool.mint_a.address,
            1_000,
            None,
            &QuoteConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, ClmmError::InvalidTickArray { tick_current: 0 });
    }

    #[test]
    fn test_compute_amount_out_with_slippage() {
        let (pool, cache) = pool_and_cache();
        let config = QuoteConfig::default();
        let quote = compute_amount_out(ComputeAmountOutParams {
            pool: &pool,
            tick_array_cache: &cache,
            input_mint: pool.mint_a.address,
            amount_in: 1_000_000,
            slippage: Decimal::from_str("0.01").unwrap(),
            price_limit: None,
            config: &config,
        })
        .unwrap();
        assert_eq!(quote.real_amount_in, TransferAmountFee { amount: 1_000_000, fee: 0 });
        assert_eq!(quote.amount_out.fee, 0);
        assert_eq!(
            quote.min_amount_out.amount,
            quote.amount_out.amount * 99 / 100
        );
        assert_eq!(quote.current_price, Decimal::ONE);
        assert!(quote.execution_price < Decimal::ONE);
        assert!(quote.price_impact > Decimal::ZERO);

        let summary = quote.to_exact_in_result();
        assert_eq!(summary.amount_out, quote.amount_out.amount);
        assert_eq!(summary.fee_amount, quote.fee);
        assert_eq!(summary.extra_accounts_read, 4);
        assert!(summary.price_impact_bps.is_some());
    }

    #[test]
    fn test_compute_amount_out_transfer_fee() {
        let (mut pool, cache) = pool_and_cache();
        let fee = TransferFee {
            epoch: 0,
            maximum_fee: u64::MAX,
            transfer_fee_basis_points: 100,
        };
        pool.mint_a = pool.mint_a.with_transfer_fee(TransferFeeConfig {
            older_transfer_fee: fee,
            newer_transfer_fee: fee,
        });
        let config = QuoteConfig::default();
        let with_fee = compute_amount_out(ComputeAmountOutParams {
            pool: &pool,
            tick_array_cache: &cache,
            input_mint: pool.mint_a.address,
            amount_in: 1_000_000,
            slippage: Decimal::ZERO,
            price_limit: None,
            config: &config,
        })
        .unwrap();
        assert_eq!(with_fee.real_amount_in.fee, 10_000);
        let direct =
            get_output_amount_and_remain_accounts(&pool, &cache, &pool.mint_a.address, 990_000, None, &config)
                .unwrap();
        assert_eq!(with_fee.amount_out.amount, direct.amount);
        assert_eq!(with_fee.min_amount_out.amount, direct.amount);
    }

    #[test]
    fn test_compute_amount_in_bounds() {
        let (pool, cache) = pool_and_cache();
        let config = QuoteConfig::default();
        let quote = compute_amount_in(ComputeAmountInParams {
            pool: &pool,
            tick_array_cache: &cache,
            output_mint: pool.mint_b.address,
            amount_out: 500_000,
            slippage: Decimal::from_str("0.05").unwrap(),
            price_limit: None,
            config: &config,
        })
        .unwrap();
        assert_eq!(quote.real_amount_out, TransferAmountFee { amount: 500_000, fee: 0 });
        assert!(quote.amount_in.amount > 500_000);
        assert!(quote.max_amount_in.amount >= quote.amount_in.amount * 105 / 100);
        assert!(quote.fee > 0);
    }

    #[test]
    fn test_price_limit_stops_swap() {
        let (pool, cache) = pool_and_cache();
        let config = QuoteConfig::default();
        let quote = |price_limit: Option<Decimal>| {
            compute_amount_out(ComputeAmountOutParams {
                pool: &pool,
                tick_array_cache: &cache,
                input_mint: pool.mint_a.address,
                amount_in: 100_000_000,
                slippage: Decimal::ZERO,
                price_limit,
                config: &config,
            })
            .unwrap()
        };
        let limited = quote(Some(Decimal::from_str("0.99").unwrap()));
        // 0 等同于不限价
        let unlimited = quote(Some(Decimal::ZERO));
        assert_eq!(unlimited, quote(None));
        assert!(limited.amount_out.amount < unlimited.amount_out.amount);
        assert!(limited.execution_price >= Decimal::from_str("0.98").unwrap());
        assert!(unlimited.execution_price < Decimal::from_str("0.9").unwrap());
    }

    #[test]
    fn test_invalid_slippage() {
        let (pool, cache) = pool_and_cache();
        let config = QuoteConfig::default();
        let err = compute_amount_out(ComputeAmountOutParams {
            pool: &pool,
            tick_array_cache: &cache,
            input_mint: pool.mint_a.address,
            amount_in: 1_000,
            slippage: Decimal::from_str("1.5").unwrap(),
            price_limit: None,
            config: &config,
        })
        .unwrap_err();
        assert!(matches!(err, ClmmError::InvalidSlippage(_)));
    }
}
