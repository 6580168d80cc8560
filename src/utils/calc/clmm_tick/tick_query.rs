//! 跨 tick array 的查询
//!
//! 组合主 bitmap 和扩展 bitmap，回答"下一个有流动性的 tick array 在哪"。
//! 找不到属于正常结果，返回 `None`；只有输入本身不合法才返回错误。

use super::tick_array::{get_array_start_index, tick_count};
use super::tick_array_bitmap::{self, max_tick_in_tickarray_bitmap};
use super::tick_array_bitmap_extension::TickArrayBitmapExtension;
use crate::common::errors::ClmmResult;
use crate::constants::{EXTENSION_TICKARRAY_BITMAP_SIZE, MAX_TICK, MIN_TICK, TICK_ARRAY_BITMAP_SIZE};
use crate::utils::calc::clmm_math::big_num::U1024;

/// 合并后的位空间半径：主 bitmap 一侧 512 位 + 扩展一侧 14 x 512 位
const MERGED_BITMAP_HALF: i32 = (EXTENSION_TICKARRAY_BITMAP_SIZE as i32 + 1) * TICK_ARRAY_BITMAP_SIZE;

/// `all_initialized_tick_array_start_indexes` 最多返回的数量
const MAX_TICK_ARRAY_SCAN: usize = 512;

/// tick array 查询需要的池子视图
pub trait TickArrayBitmapSource {
    fn tick_current(&self) -> i32;
    fn tick_spacing(&self) -> u16;
    fn tick_array_bitmap(&self) -> &[u64; 16];
    fn bitmap_extension(&self) -> &TickArrayBitmapExtension;
}

/// 主 bitmap 在当前 tick spacing 下实际可用的 `[min, max)`
pub fn tick_range(tick_spacing: u16) -> (i32, i32) {
    let mut max_tick_boundary = max_tick_in_tickarray_bitmap(tick_spacing);
    let mut min_tick_boundary = -max_tick_boundary;
    if max_tick_boundary > MAX_TICK {
        max_tick_boundary = get_array_start_index(MAX_TICK, tick_spacing) + tick_count(tick_spacing);
    }
    if min_tick_boundary < MIN_TICK {
        min_tick_boundary = get_array_start_index(MIN_TICK, tick_spacing);
    }
    (min_tick_boundary, max_tick_boundary)
}

/// 任一 tick 所在的 array 超出主 bitmap 时返回 true
pub fn is_overflow_default_tickarray_bitmap(tick_spacing: u16, tick_indexs: &[i32]) -> bool {
    let (min_tick_array_start_index_boundary, max_tick_array_index_boundary) = tick_range(tick_spacing);
    tick_indexs.iter().any(|&tick_index| {
        let tick_array_start_index = get_array_start_index(tick_index, tick_spacing);
        tick_array_start_index >= max_tick_array_index_boundary
            || tick_array_start_index < min_tick_array_start_index_boundary
    })
}

/// 从 `last_tick_array_start_index` 出发（不含自身）按方向找下一个已初始化的 tick array
///
/// 先查主 bitmap，落到边界后转到扩展 bitmap，交替进行直到越过 tick 范围
pub fn next_initialized_tick_array_start_index<S: TickArrayBitmapSource + ?Sized>(
    source: &S,
    last_tick_array_start_index: i32,
    zero_for_one: bool,
) -> ClmmResult<Option<i32>> {
    let tick_spacing = source.tick_spacing();
    let bit_map = U1024::from_words(source.tick_array_bitmap());
    let mut last_tick_array_start_index = get_array_start_index(last_tick_array_start_index, tick_spacing);

    loop {
        let (is_found, start_index) = tick_array_bitmap::next_initialized_tick_array_start_index(
            bit_map,
            last_tick_array_start_index,
            tick_spacing,
            zero_for_one,
        );
        if is_found {
            return Ok(Some(start_index));
        }
        last_tick_array_start_index = start_index;
        if !(MIN_TICK..=MAX_TICK).contains(&last_tick_array_start_index) {
            // tick spacing 足够大时主 bitmap 已经覆盖全部 tick
            return Ok(None);
        }

        let (is_found, start_index) = source.bitmap_extension().next_initialized_tick_array_from_one_bitmap(
            last_tick_array_start_index,
            tick_spacing,
            zero_for_one,
        )?;
        if is_found {
            return Ok(Some(start_index));
        }
        last_tick_array_start_index = start_index;
        if !(MIN_TICK..=MAX_TICK).contains(&last_tick_array_start_index) {
            return Ok(None);
        }
    }
}

/// swap 开始时第一个要用的 tick array：当前 tick 所在的 array 已初始化就用它，否则按方向找下一个
pub fn first_initialized_tick_array<S: TickArrayBitmapSource + ?Sized>(
    source: &S,
    zero_for_one: bool,
) -> ClmmResult<Option<i32>> {
    let tick_spacing = source.tick_spacing();
    let tick_current = source.tick_current();
    let current_start_index = get_array_start_index(tick_current, tick_spacing);

    let (is_initialized, start_index) = if is_overflow_default_tickarray_bitmap(tick_spacing, &[tick_current]) {
        source
            .bitmap_extension()
            .check_tick_array_is_initialized(current_start_index, tick_spacing)?
    } else {
        tick_array_bitmap::check_current_tick_array_is_initialized(
            U1024::from_words(source.tick_array_bitmap()),
            tick_current,
            tick_spacing,
        )?
    };
    if is_initialized {
        return Ok(Some(start_index));
    }
    next_initialized_tick_array_start_index(source, current_start_index, zero_for_one)
}

/// 与 swap 方向相反的那一侧最近的已初始化 tick array
///
/// 放在 remaining accounts 最前面，价格在成交时小幅回摆也不会缺账户
pub fn pre_initialized_tick_array_start_index<S: TickArrayBitmapSource + ?Sized>(
    source: &S,
    zero_for_one: bool,
) -> Option<i32> {
    let tick_spacing = source.tick_spacing();
    let current_offset = source.tick_current().div_euclid(tick_count(tick_spacing));
    let found = if zero_for_one {
        search_high_bit_from_start(source, current_offset + 1, 1)
    } else {
        search_low_bit_from_start(source, current_offset - 1, 1)
    };
    found.first().copied()
}

/// 以 `tick_array_start_index` 为中心，两侧各取最多 `expected_count` 个已初始化的 tick array
///
/// 左侧按从近到远排列，右侧包含起点自身
pub fn initialized_tick_arrays_in_range<S: TickArrayBitmapSource + ?Sized>(
    source: &S,
    tick_array_start_index: i32,
    expected_count: usize,
) -> Vec<i32> {
    let tick_array_offset = tick_array_start_index.div_euclid(tick_count(source.tick_spacing()));
    let mut result = search_low_bit_from_start(source, tick_array_offset - 1, expected_count);
    result.extend(search_high_bit_from_start(source, tick_array_offset, expected_count));
    result
}

/// 池子所有已初始化 tick array 的起始 index，从小到大
pub fn all_initialized_tick_array_start_indexes<S: TickArrayBitmapSource + ?Sized>(source: &S) -> Vec<i32> {
    search_high_bit_from_start(source, -MERGED_BITMAP_HALF, MAX_TICK_ARRAY_SCAN)
}

/// 合并位空间中 `array_offset`（起始 index / tick_count）对应的位
fn is_tick_array_bit_set<S: TickArrayBitmapSource + ?Sized>(source: &S, array_offset: i32) -> bool {
    let index = array_offset + MERGED_BITMAP_HALF;
    if !(0..2 * MERGED_BITMAP_HALF).contains(&index) {
        return false;
    }
    let group = (index / TICK_ARRAY_BITMAP_SIZE) as usize;
    let bit = (index % TICK_ARRAY_BITMAP_SIZE) as usize;
    let extension = source.bitmap_extension();
    let words: &[u64] = match group {
        g if g < EXTENSION_TICKARRAY_BITMAP_SIZE => {
            &extension.negative_tick_array_bitmap[EXTENSION_TICKARRAY_BITMAP_SIZE - 1 - g]
        }
        g if g == EXTENSION_TICKARRAY_BITMAP_SIZE => &source.tick_array_bitmap()[..8],
        g if g == EXTENSION_TICKARRAY_BITMAP_SIZE + 1 => &source.tick_array_bitmap()[8..],
        g => &extension.positive_tick_array_bitmap[g - EXTENSION_TICKARRAY_BITMAP_SIZE - 2],
    };
    words[bit / 64] & (1u64 << (bit % 64)) != 0
}

/// 从 `start` 往下（含 `start`）收集已初始化 array 的起始 index
fn search_low_bit_from_start<S: TickArrayBitmapSource + ?Sized>(
    source: &S,
    start: i32,
    expected_count: usize,
) -> Vec<i32> {
    let multiplier = tick_count(source.tick_spacing());
    (-MERGED_BITMAP_HALF..=start.min(MERGED_BITMAP_HALF - 1))
        .rev()
        .filter(|&offset| is_tick_array_bit_set(source, offset))
        .take(expected_count)
        .map(|offset| offset * multiplier)
        .collect()
}

/// 从 `start` 往上（含 `start`）收集
fn search_high_bit_from_start<S: TickArrayBitmapSource + ?Sized>(
    source: &S,
    start: i32,
    expected_count: usize,
) -> Vec<i32> {
    let multiplier = tick_count(source.tick_spacing());
    (start.max(-MERGED_BITMAP_HALF)..MERGED_BITMAP_HALF)
        .filter(|&offset| is_tick_array_bit_set(source, offset))
        .take(expected_count)
        .map(|offset| offset * multiplier)
        .collect()
}
