//! 人类可读价格与 sqrt price / tick 的换算
//!
//! 价格 = token B / token A，按两边 decimals 缩放。这一层只是方便函数，
//! 链上精度以 `tick_math` 为准。

use super::tick_math::{get_sqrt_price_at_tick, get_tick_at_sqrt_price};
use crate::common::errors::{ClmmError, ClmmResult};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, MathematicalOps};

/// 2^64 as Decimal
fn two_pow_64() -> Decimal {
    Decimal::from_i128_with_scale(1i128 << 64, 0)
}

/// 10^exp，exp 为负时返回小数
pub fn pow10(exp: i32) -> ClmmResult<Decimal> {
    match exp {
        0..=28 => Ok(Decimal::from_i128_with_scale(10i128.pow(exp as u32), 0)),
        -28..=-1 => Ok(Decimal::from_i128_with_scale(1, exp.unsigned_abs())),
        _ => Err(ClmmError::DecimalConversion(format!("10^{exp}"))),
    }
}

/// Q64.64 -> Decimal
pub fn x64_to_decimal(num: u128) -> ClmmResult<Decimal> {
    Decimal::from_u128(num)
        .and_then(|n| n.checked_div(two_pow_64()))
        .ok_or_else(|| ClmmError::DecimalConversion(format!("x64 {num}")))
}

/// Decimal -> Q64.64，向下取整
pub fn decimal_to_x64(num: Decimal) -> ClmmResult<u128> {
    if num.is_sign_negative() {
        return Err(ClmmError::DecimalConversion(num.to_string()));
    }
    num.checked_mul(two_pow_64())
        .map(|n| n.floor())
        .and_then(|n| n.to_u128())
        .ok_or_else(|| ClmmError::DecimalConversion(num.to_string()))
}

pub fn price_to_sqrt_price_x64(price: Decimal, decimals_a: u8, decimals_b: u8) -> ClmmResult<u128> {
    if price <= Decimal::ZERO {
        return Err(ClmmError::InvalidPrice(price.to_string()));
    }
    let scaled = price
        .checked_mul(pow10(decimals_b as i32 - decimals_a as i32)?)
        .ok_or_else(|| ClmmError::InvalidPrice(price.to_string()))?;
    let sqrt = scaled
        .sqrt()
        .ok_or_else(|| ClmmError::InvalidPrice(price.to_string()))?;
    decimal_to_x64(sqrt)
}

pub fn sqrt_price_x64_to_price(sqrt_price_x64: u128, decimals_a: u8, decimals_b: u8) -> ClmmResult<Decimal> {
    let sqrt = x64_to_decimal(sqrt_price_x64)?;
    sqrt.checked_mul(sqrt)
        .and_then(|p| p.checked_mul(pow10(decimals_a as i32 - decimals_b as i32).ok()?))
        .ok_or_else(|| ClmmError::DecimalConversion(format!("sqrt price {sqrt_price_x64}")))
}

pub fn get_tick_from_price(price: Decimal, decimals_a: u8, decimals_b: u8) -> ClmmResult<i32> {
    get_tick_at_sqrt_price(price_to_sqrt_price_x64(price, decimals_a, decimals_b)?)
}

pub fn get_price_from_tick(tick: i32, decimals_a: u8, decimals_b: u8) -> ClmmResult<Decimal> {
    sqrt_price_x64_to_price(get_sqrt_price_at_tick(tick)?, decimals_a, decimals_b)
}

/// 价格对齐到 tick spacing 网格
///
/// `tick / spacing` 非负时向上取整、为负时向下取整，两侧都远离零。
/// 链上与 SDK 都按这个规则选网格线，不要改成四舍五入。
pub fn get_tick_from_price_rounded_to_spacing(
    price: Decimal,
    tick_spacing: u16,
    decimals_a: u8,
    decimals_b: u8,
) -> ClmmResult<i32> {
    let tick = get_tick_from_price(price, decimals_a, decimals_b)?;
    round_tick_to_spacing(tick, tick_spacing)
}

pub(crate) fn round_tick_to_spacing(tick: i32, tick_spacing: u16) -> ClmmResult<i32> {
    if tick_spacing == 0 {
        return Err(ClmmError::InvalidTickSpacing { tick_spacing });
    }
    let spacing = i32::from(tick_spacing);
    let quotient = if tick < 0 {
        tick.div_euclid(spacing)
    } else {
        (tick + spacing - 1) / spacing
    };
    Ok(quotient * spacing)
}

/// 返回对齐后的 `(tick, price)`
pub fn round_price_with_tick_spacing(
    price: Decimal,
    tick_spacing: u16,
    decimals_a: u8,
    decimals_b: u8,
) -> ClmmResult<(i32, Decimal)> {
    let tick = get_tick_from_price_rounded_to_spacing(price, tick_spacing, decimals_a, decimals_b)?;
    Ok((tick, get_price_from_tick(tick, decimals_a, decimals_b)?))
}
