// Copyright (c) Raydium Foundation
// Licensed under Apache 2.0
// Source: https://github.com/raydium-io/raydium-clmm/programs/amm/src/libraries/fixed_point_64.rs

//! Q64.64 定点数常量

/// 小数部分的位数
pub const RESOLUTION: u8 = 64;
/// 1.0 in Q64.64
pub const Q64: u128 = 1u128 << RESOLUTION;
