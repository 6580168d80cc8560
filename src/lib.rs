//! Raydium CLMM 链下报价 SDK
//!
//! 在不发送交易的前提下，按链上程序完全相同的整数算法计算：
//! - swap 报价与模拟（精确输入 / 精确输出，含 Token-2022 transfer fee）
//! - 存取流动性时的 token 数量
//! - 头寸的手续费与奖励收益
//!
//! 池子、tick array 等账户的获取和解码由调用方完成，这里只做计算。
//!
//! ```ignore
//! let quote = compute_amount_out(ComputeAmountOutParams {
//!     pool: &pool,
//!     tick_array_cache: &cache,
//!     input_mint: pool.mint_a.address,
//!     amount_in: 1_000_000,
//!     slippage: Decimal::new(1, 2),
//!     price_limit: None,
//!     config: &QuoteConfig::default(),
//! })?;
//! ```

pub mod common;
pub mod constants;
pub mod utils;

pub use crate::common::{
    ClmmError, ClmmResult, MintInfo, PoolState, PositionRewardInfo, PositionState, QuoteConfig, RewardInfo,
};
pub use crate::utils::calc::clmm_tick::{
    TickArrayBitmapExtension, TickArrayBitmapSource, TickArrayCache, TickArrayState, TickState,
};
pub use crate::utils::calc::raydium_clmm::{SwapComputeParams, SwapComputeResult, swap_compute};
pub use crate::utils::position::{
    get_amounts_from_position, get_fee_growth_inside, get_position_fees, get_position_rewards,
    get_reward_growths_inside,
};
pub use crate::utils::quote::{
    AmountAndRemainAccounts, ClmmQuoteExactIn, ClmmQuoteExactOut, ComputeAmountInParams, ComputeAmountOutParams,
    QuoteExactInResult, compute_amount_in, compute_amount_out, get_input_amount_and_remain_accounts,
    get_output_amount_and_remain_accounts,
};
pub use crate::utils::token::{TransferAmountFee, TransferFee, TransferFeeConfig, get_transfer_amount_fee};
