//! 池子内置的 tick array bitmap
//!
//! 1024 位，每一位代表一个 tick array 是否已初始化，中心对齐在 tick 0：
//! 第 `i` 位对应起始 index `(i - 512) * tick_count`。
//! 超出这个范围的 array 记录在 `TickArrayBitmapExtension` 里。

use super::tick_array::tick_count;
use crate::common::errors::{ClmmError, ClmmResult};
use crate::constants::{MAX_TICK, MIN_TICK, TICK_ARRAY_BITMAP_SIZE, TICK_ARRAY_SIZE_I32};
use crate::utils::calc::clmm_math::big_num::{U1024, U512};

/// 主 bitmap 单侧覆盖的最大 tick
pub fn max_tick_in_tickarray_bitmap(tick_spacing: u16) -> i32 {
    i32::from(tick_spacing) * TICK_ARRAY_SIZE_I32 * TICK_ARRAY_BITMAP_SIZE
}

/// 包含该 tick array 的 512 位 bitmap 的 `[min, max)` 边界
pub fn get_bitmap_tick_boundary(tick_array_start_index: i32, tick_spacing: u16) -> (i32, i32) {
    let ticks_in_one_bitmap = max_tick_in_tickarray_bitmap(tick_spacing);
    let abs_start = tick_array_start_index.abs();
    let mut m = abs_start / ticks_in_one_bitmap;
    if tick_array_start_index < 0 && abs_start % ticks_in_one_bitmap != 0 {
        m += 1;
    }
    let min_value = ticks_in_one_bitmap * m;
    if tick_array_start_index < 0 {
        (-min_value, -min_value + ticks_in_one_bitmap)
    } else {
        (min_value, min_value + ticks_in_one_bitmap)
    }
}

/// tick array 在所属 512 位 bitmap 中的位序号
pub fn tick_array_offset_in_bitmap(tick_array_start_index: i32, tick_spacing: u16) -> i32 {
    let m = tick_array_start_index.abs() % max_tick_in_tickarray_bitmap(tick_spacing);
    let mut tick_array_offset_in_bitmap = m / tick_count(tick_spacing);
    if tick_array_start_index < 0 && m != 0 {
        tick_array_offset_in_bitmap = TICK_ARRAY_BITMAP_SIZE - tick_array_offset_in_bitmap;
    }
    tick_array_offset_in_bitmap
}

/// 位序号（相对于 tick 0，以 array 为单位）
fn compressed_position(tick_index: i32, tick_spacing: u16) -> i32 {
    let multiplier = tick_count(tick_spacing);
    let mut compressed = tick_index / multiplier + TICK_ARRAY_BITMAP_SIZE;
    if tick_index < 0 && tick_index % multiplier != 0 {
        compressed -= 1;
    }
    compressed
}

/// 当前 tick 所在的 tick array 是否已初始化，返回 `(是否初始化, 起始 index)`
pub fn check_current_tick_array_is_initialized(
    bit_map: U1024,
    tick_current: i32,
    tick_spacing: u16,
) -> ClmmResult<(bool, i32)> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick_current) {
        return Err(ClmmError::TickOutOfRange {
            tick: tick_current,
            min: MIN_TICK,
            max: MAX_TICK,
        });
    }
    let compressed = compressed_position(tick_current, tick_spacing);
    let start_index = (compressed - TICK_ARRAY_BITMAP_SIZE) * tick_count(tick_spacing);
    if !(0..2 * TICK_ARRAY_BITMAP_SIZE).contains(&compressed) {
        return Err(ClmmError::InvalidTickArrayBoundary { start_index });
    }
    Ok((bit_map.bit(compressed as usize), start_index))
}

/// 在主 bitmap 中按方向找下一个已初始化的 tick array
///
/// 找不到时返回 `(false, 边界)`：向下为 `-max_tick`，向上为 `max_tick - tick_count`，
/// 调用方从这个边界继续去扩展 bitmap 里找。
/// 下一个候选已经超出主 bitmap 时原样返回 `(false, last_tick_array_start_index)`。
pub fn next_initialized_tick_array_start_index(
    bit_map: U1024,
    last_tick_array_start_index: i32,
    tick_spacing: u16,
    zero_for_one: bool,
) -> (bool, i32) {
    let tick_boundary = max_tick_in_tickarray_bitmap(tick_spacing);
    let multiplier = tick_count(tick_spacing);
    let next_tick_array_start_index = if zero_for_one {
        last_tick_array_start_index - multiplier
    } else {
        last_tick_array_start_index + multiplier
    };

    if next_tick_array_start_index < -tick_boundary || next_tick_array_start_index >= tick_boundary {
        return (false, last_tick_array_start_index);
    }

    let bit_pos = compressed_position(next_tick_array_start_index, tick_spacing).abs();

    if zero_for_one {
        // 把 bit_pos 移到最高位，再数前导零
        let offset_bit_map = bit_map << (2 * TICK_ARRAY_BITMAP_SIZE - 1 - bit_pos) as usize;
        if offset_bit_map.is_zero() {
            (false, -tick_boundary)
        } else {
            let next_bit = offset_bit_map.leading_zeros() as i32;
            (true, (bit_pos - next_bit - TICK_ARRAY_BITMAP_SIZE) * multiplier)
        }
    } else {
        let offset_bit_map = bit_map >> bit_pos as usize;
        if offset_bit_map.is_zero() {
            (false, tick_boundary - multiplier)
        } else {
            let next_bit = offset_bit_map.trailing_zeros() as i32;
            (true, (bit_pos + next_bit - TICK_ARRAY_BITMAP_SIZE) * multiplier)
        }
    }
}

/// 在单个 512 位 bitmap 中按方向查找，`next_tick_array_start_index` 本身也参与匹配
///
/// 找不到时返回这个 bitmap 在该方向上的边界
pub fn next_initialized_tick_array_in_bitmap(
    tickarray_bitmap: U512,
    next_tick_array_start_index: i32,
    tick_spacing: u16,
    zero_for_one: bool,
) -> (bool, i32) {
    let (bitmap_min_tick_boundary, bitmap_max_tick_boundary) =
        get_bitmap_tick_boundary(next_tick_array_start_index, tick_spacing);
    let tick_array_offset_in_bitmap = tick_array_offset_in_bitmap(next_tick_array_start_index, tick_spacing);
    let multiplier = tick_count(tick_spacing);

    if zero_for_one {
        let offset_bit_map = tickarray_bitmap << (TICK_ARRAY_BITMAP_SIZE - 1 - tick_array_offset_in_bitmap) as usize;
        if offset_bit_map.is_zero() {
            (false, bitmap_min_tick_boundary)
        } else {
            let next_bit = offset_bit_map.leading_zeros() as i32;
            (true, next_tick_array_start_index - next_bit * multiplier)
        }
    } else {
        let offset_bit_map = tickarray_bitmap >> tick_array_offset_in_bitmap as usize;
        if offset_bit_map.is_zero() {
            (false, bitmap_max_tick_boundary - multiplier)
        } else {
            let next_bit = offset_bit_map.trailing_zeros() as i32;
            (true, next_tick_array_start_index + next_bit * multiplier)
        }
    }
}

/// 翻转主 bitmap 中某个 tick array 的位，起始 index 必须在主 bitmap 范围内
pub fn flip_tick_array_bit(
    bit_map: &mut [u64; 16],
    tick_array_start_index: i32,
    tick_spacing: u16,
) -> ClmmResult<()> {
    let tick_boundary = max_tick_in_tickarray_bitmap(tick_spacing);
    if tick_array_start_index % tick_count(tick_spacing) != 0 {
        return Err(ClmmError::InvalidTickArrayStartIndex {
            start_index: tick_array_start_index,
            tick_spacing,
        });
    }
    if tick_array_start_index < -tick_boundary || tick_array_start_index >= tick_boundary {
        return Err(ClmmError::InvalidTickArrayBoundary {
            start_index: tick_array_start_index,
        });
    }
    let bit_pos = (tick_array_start_index / tick_count(tick_spacing) + TICK_ARRAY_BITMAP_SIZE) as usize;
    bit_map[bit_pos / 64] ^= 1u64 << (bit_pos % 64);
    Ok(())
}
