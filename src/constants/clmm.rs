//! Raydium CLMM 协议常量
//!
//! 与链上程序保持一致，修改任何一个值都会导致报价与链上结果不一致

pub use crate::utils::calc::clmm_math::tick_math::{
    MAX_SQRT_PRICE_X64, MAX_TICK, MIN_SQRT_PRICE_X64, MIN_TICK,
};

/// 每个 tick array 包含的 tick 槽位数
pub const TICK_ARRAY_SIZE: usize = 60;
/// `TICK_ARRAY_SIZE` as i32, for tick arithmetic
pub const TICK_ARRAY_SIZE_I32: i32 = TICK_ARRAY_SIZE as i32;

/// 主 bitmap 单侧覆盖的 tick array 数量（整个 bitmap 为 1024 位）
pub const TICK_ARRAY_BITMAP_SIZE: i32 = 512;

/// 扩展 bitmap 每侧的条目数
pub const EXTENSION_TICKARRAY_BITMAP_SIZE: usize = 14;

/// 奖励槽位数
pub const REWARD_NUM: usize = 3;

/// 费率分母（100%）
pub const FEE_RATE_DENOMINATOR_VALUE: u32 = 1_000_000;

/// Token-2022 transfer fee 基点分母
pub const TRANSFER_FEE_POINT: u64 = 10_000;

/// swap 单次模拟允许的最大步数
pub const DEFAULT_MAX_SWAP_LOOP: u32 = 10;
