//! CLMM 计算错误定义
//!
//! 所有无效输入都会带上出错的数值，方便排查报价偏差。
//! "找不到下一个 tick array" 属于正常结果，用 `Option` 表达，不在这里。

/// CLMM 计算错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClmmError {
    #[error("division by 0")]
    DivisionByZero,
    #[error("math overflow in {0}")]
    MathOverflow(&'static str),
    #[error("tick {tick} out of range [{min}, {max}]")]
    TickOutOfRange { tick: i32, min: i32, max: i32 },
    #[error("sqrt_price_x64 {sqrt_price_x64} out of range")]
    SqrtPriceOutOfRange { sqrt_price_x64: u128 },
    #[error("invalid tick array start index {start_index} for tick spacing {tick_spacing}")]
    InvalidTickArrayStartIndex { start_index: i32, tick_spacing: u16 },
    #[error("invalid tick array boundary: start index {start_index} is inside the default bitmap")]
    InvalidTickArrayBoundary { start_index: i32 },
    #[error("invalid tick spacing {tick_spacing}")]
    InvalidTickSpacing { tick_spacing: u16 },
    #[error("tick {tick} is not aligned to tick spacing {tick_spacing}")]
    TickNotAligned { tick: i32, tick_spacing: u16 },
    #[error("tick {tick} does not belong to tick array starting at {start_index}")]
    TickNotInArray { tick: i32, start_index: i32 },
    #[error("no initialized tick in tick array {start_index} (zero_for_one: {zero_for_one})")]
    TickNotFound { start_index: i32, zero_for_one: bool },
    #[error("invalid tick array: {start_index} is not in the tick array cache")]
    TickArrayNotLoaded { start_index: i32 },
    #[error("invalid tick array: no initialized tick array around tick {tick_current}")]
    InvalidTickArray { tick_current: i32 },
    #[error("amountSpecified must not be 0")]
    ZeroAmountSpecified,
    #[error("sqrt_price_limit_x64 {sqrt_price_limit_x64} must be within [{min}, {max}]")]
    SqrtPriceLimitOutOfRange {
        sqrt_price_limit_x64: u128,
        min: u128,
        max: u128,
    },
    #[error(
        "sqrt_price_limit_x64 {sqrt_price_limit_x64} on the wrong side of current {sqrt_price_x64} (zero_for_one: {zero_for_one})"
    )]
    SqrtPriceLimitWrongSide {
        sqrt_price_limit_x64: u128,
        sqrt_price_x64: u128,
        zero_for_one: bool,
    },
    #[error("swapCompute LiquidityInsufficient at tick {tick} (remaining {amount_remaining})")]
    LiquidityInsufficient { tick: i32, amount_remaining: i128 },
    #[error("liquidity limit: swap needs more than {max_loop} steps")]
    LiquidityLimit { max_loop: u32 },
    #[error("liquidity {liquidity} + delta {delta} out of range")]
    LiquidityOverflow { liquidity: u128, delta: i128 },
    #[error("next sqrt price underflow: liquidity {liquidity}, amount {amount}")]
    SqrtPriceUnderflow { liquidity: u128, amount: u128 },
    #[error("mint {0} does not belong to this pool")]
    InvalidMint(String),
    #[error("invalid price {0}")]
    InvalidPrice(String),
    #[error("invalid slippage {0}")]
    InvalidSlippage(String),
    #[error("decimal conversion failed: {0}")]
    DecimalConversion(String),
}

pub type ClmmResult<T> = Result<T, ClmmError>;
