use crate::constants::DEFAULT_MAX_SWAP_LOOP;
use serde::{Deserialize, Serialize};

/// 报价引擎配置
///
/// 所有字段都有默认值，通常只需要 `QuoteConfig::default()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteConfig {
    /// swap 模拟最多执行的步数，超过后返回 `LiquidityLimit`
    pub max_swap_loop: u32,
    /// 流动性不足时是否返回部分成交结果（`all_trade = false`）而不是报错
    pub catch_liquidity_insufficient: bool,
    /// 当前 epoch，用于选择生效的 Token-2022 transfer fee
    pub epoch: u64,
}

impl QuoteConfig {
    pub fn new() -> Self {
        Self {
            max_swap_loop: DEFAULT_MAX_SWAP_LOOP,
            catch_liquidity_insufficient: false,
            epoch: 0,
        }
    }

    /// 设置最大步数
    pub fn with_max_swap_loop(mut self, max_swap_loop: u32) -> Self {
        self.max_swap_loop = max_swap_loop;
        self
    }

    /// 流动性不足时返回部分结果
    pub fn with_catch_liquidity_insufficient(mut self, catch_liquidity_insufficient: bool) -> Self {
        self.catch_liquidity_insufficient = catch_liquidity_insufficient;
        self
    }

    pub fn with_epoch(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self::new()
    }
}
