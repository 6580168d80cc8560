//! CLMM 池子、头寸的客户端快照
//!
//! 字段只保留报价和收益计算需要的部分，由调用方从链上账户解码后填入。
//! 报价过程只读这些数据，不会修改。

use crate::common::errors::{ClmmError, ClmmResult};
use crate::constants::REWARD_NUM;
use crate::utils::calc::clmm_math::price_math::sqrt_price_x64_to_price;
use crate::utils::calc::clmm_tick::tick_array_bitmap::flip_tick_array_bit;
use crate::utils::calc::clmm_tick::tick_query::is_overflow_default_tickarray_bitmap;
use crate::utils::calc::clmm_tick::{TickArrayBitmapExtension, TickArrayBitmapSource};
use crate::utils::token::TransferFeeConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// 池子一侧的 mint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintInfo {
    pub address: Pubkey,
    pub decimals: u8,
    /// Token-2022 transfer fee，没有扩展时为 None
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_fee_config: Option<TransferFeeConfig>,
}

impl MintInfo {
    pub fn new(address: Pubkey, decimals: u8) -> Self {
        Self {
            address,
            decimals,
            transfer_fee_config: None,
        }
    }

    pub fn with_transfer_fee(mut self, transfer_fee_config: TransferFeeConfig) -> Self {
        self.transfer_fee_config = Some(transfer_fee_config);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardInfo {
    pub reward_state: u8,
    pub open_time: u64,
    pub end_time: u64,
    pub last_update_time: u64,
    pub emissions_per_second_x64: u128,
    pub token_mint: Pubkey,
    pub reward_growth_global_x64: u128,
}

impl RewardInfo {
    /// 奖励槽位是否启用
    pub fn initialized(&self) -> bool {
        self.token_mint != Pubkey::default()
    }
}

/// 池子状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub id: Pubkey,
    pub mint_a: MintInfo,
    pub mint_b: MintInfo,
    pub tick_spacing: u16,
    /// 交易手续费率，分母 1_000_000
    pub trade_fee_rate: u32,
    pub liquidity: u128,
    pub sqrt_price_x64: u128,
    pub tick_current: i32,
    pub fee_growth_global_a_x64: u128,
    pub fee_growth_global_b_x64: u128,
    pub reward_infos: [RewardInfo; REWARD_NUM],
    /// 主 bitmap，覆盖 tick 0 两侧各 512 个 tick array
    pub tick_array_bitmap: [u64; 16],
    #[serde(default)]
    pub tick_array_bitmap_extension: TickArrayBitmapExtension,
}

impl PoolState {
    /// 空池子：只有价格，没有流动性和已初始化的 tick array
    pub fn new(
        id: Pubkey,
        mint_a: MintInfo,
        mint_b: MintInfo,
        tick_spacing: u16,
        trade_fee_rate: u32,
        sqrt_price_x64: u128,
        tick_current: i32,
    ) -> Self {
        Self {
            id,
            mint_a,
            mint_b,
            tick_spacing,
            trade_fee_rate,
            liquidity: 0,
            sqrt_price_x64,
            tick_current,
            fee_growth_global_a_x64: 0,
            fee_growth_global_b_x64: 0,
            reward_infos: [RewardInfo::default(); REWARD_NUM],
            tick_array_bitmap: [0; 16],
            tick_array_bitmap_extension: TickArrayBitmapExtension::default(),
        }
    }

    /// 当前价格（token B / token A，已按 decimals 换算）
    pub fn current_price(&self) -> ClmmResult<Decimal> {
        sqrt_price_x64_to_price(self.sqrt_price_x64, self.mint_a.decimals, self.mint_b.decimals)
    }

    /// 输入 `input_mint` 时的方向：输入 A 即 zero_for_one
    pub fn zero_for_one_for_input(&self, input_mint: &Pubkey) -> ClmmResult<bool> {
        if *input_mint == self.mint_a.address {
            Ok(true)
        } else if *input_mint == self.mint_b.address {
            Ok(false)
        } else {
            Err(ClmmError::InvalidMint(input_mint.to_string()))
        }
    }

    /// 翻转 tick array 的初始化位，超出主 bitmap 的写到扩展 bitmap
    pub fn flip_tick_array_bit(&mut self, tick_array_start_index: i32) -> ClmmResult<()> {
        if is_overflow_default_tickarray_bitmap(self.tick_spacing, &[tick_array_start_index]) {
            self.tick_array_bitmap_extension
                .flip_tick_array_bit(tick_array_start_index, self.tick_spacing)
        } else {
            flip_tick_array_bit(&mut self.tick_array_bitmap, tick_array_start_index, self.tick_spacing)
        }
    }
}

impl TickArrayBitmapSource for PoolState {
    fn tick_current(&self) -> i32 {
        self.tick_current
    }

    fn tick_spacing(&self) -> u16 {
        self.tick_spacing
    }

    fn tick_array_bitmap(&self) -> &[u64; 16] {
        &self.tick_array_bitmap
    }

    fn bitmap_extension(&self) -> &TickArrayBitmapExtension {
        &self.tick_array_bitmap_extension
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRewardInfo {
    pub growth_inside_last_x64: u128,
    pub reward_amount_owed: u64,
}

/// 头寸快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionState {
    pub pool_id: Pubkey,
    pub tick_lower_index: i32,
    pub tick_upper_index: i32,
    pub liquidity: u128,
    pub fee_growth_inside_a_last_x64: u128,
    pub fee_growth_inside_b_last_x64: u128,
    pub token_fees_owed_a: u64,
    pub token_fees_owed_b: u64,
    pub reward_infos: [PositionRewardInfo; REWARD_NUM],
}
