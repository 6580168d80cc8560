//! 测试工具函数
//!
//! 构建测试用的池子和 tick array 缓存，所有数据都在内存里，不依赖 RPC

#![allow(dead_code)]

use clmm_quote_sdk::utils::calc::clmm_math::tick_math::get_sqrt_price_at_tick;
use clmm_quote_sdk::{MintInfo, PoolState, TickArrayCache, TickArrayState, TickState};
use solana_sdk::pubkey::Pubkey;

/// 只设置流动性字段的 tick
pub fn tick(tick: i32, liquidity_net: i128) -> TickState {
    TickState {
        tick,
        liquidity_net,
        liquidity_gross: liquidity_net.unsigned_abs(),
        ..Default::default()
    }
}

/// 新建一个 6/6 decimals 的池子，价格对应 `tick_current`
pub fn new_pool(tick_spacing: u16, trade_fee_rate: u32, tick_current: i32, liquidity: u128) -> PoolState {
    let mut pool = PoolState::new(
        Pubkey::new_unique(),
        MintInfo::new(Pubkey::new_unique(), 6),
        MintInfo::new(Pubkey::new_unique(), 6),
        tick_spacing,
        trade_fee_rate,
        get_sqrt_price_at_tick(tick_current).expect("valid tick"),
        tick_current,
    );
    pool.liquidity = liquidity;
    pool
}

/// 把 tick 写进对应的 tick array，并在池子 bitmap 上标记
pub fn insert_ticks(pool: &mut PoolState, cache: &mut TickArrayCache, ticks: &[TickState]) {
    let tick_spacing = pool.tick_spacing;
    for tick_state in ticks {
        let start_index =
            clmm_quote_sdk::utils::calc::clmm_tick::get_array_start_index(tick_state.tick, tick_spacing);
        if !cache.contains_key(&start_index) {
            cache.insert(start_index, TickArrayState::new(start_index, tick_spacing).expect("valid start"));
            pool.flip_tick_array_bit(start_index).expect("flip bit");
        }
        cache
            .get_mut(&start_index)
            .expect("array just inserted")
            .set_tick(*tick_state, tick_spacing)
            .expect("aligned tick");
    }
}

/// tick spacing 60，流动性 1e9，价格在 tick 0，手续费 0；
/// 唯一的 tick array [-3600, 0) 里只有 tick -60，liquidity_net = -5e8
pub fn example_pool() -> (PoolState, TickArrayCache) {
    let mut pool = new_pool(60, 0, 0, 1_000_000_000);
    let mut cache = TickArrayCache::new();
    insert_ticks(&mut pool, &mut cache, &[tick(-60, -500_000_000)]);
    (pool, cache)
}

/// 深度池子：一个覆盖 [-7200, 7140] 的头寸，流动性 `liquidity`
pub fn deep_pool(trade_fee_rate: u32, liquidity: u128) -> (PoolState, TickArrayCache) {
    let mut pool = new_pool(60, trade_fee_rate, 0, liquidity);
    let mut cache = TickArrayCache::new();
    let net = i128::try_from(liquidity).expect("liquidity fits i128");
    insert_ticks(&mut pool, &mut cache, &[tick(-7200, net), tick(7140, -net)]);
    (pool, cache)
}
