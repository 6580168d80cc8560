//! 扩展 tick array bitmap
//!
//! 主 bitmap 只覆盖 `[-max_tick, max_tick)`，更远的 tick array 按每 512 个一组
//! 记录在这里：正负两侧各 14 组。

use super::tick_array::{check_is_valid_start_index, get_array_start_index, tick_count};
use super::tick_array_bitmap::{
    max_tick_in_tickarray_bitmap, next_initialized_tick_array_in_bitmap, tick_array_offset_in_bitmap,
};
use crate::common::errors::{ClmmError, ClmmResult};
use crate::constants::{EXTENSION_TICKARRAY_BITMAP_SIZE, MAX_TICK, MIN_TICK};
use crate::utils::calc::clmm_math::big_num::U512;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickArrayBitmapExtension {
    /// `[max_tick * (i + 1), max_tick * (i + 2))`
    pub positive_tick_array_bitmap: [[u64; 8]; EXTENSION_TICKARRAY_BITMAP_SIZE],
    /// `[-max_tick * (i + 2), -max_tick * (i + 1))`
    pub negative_tick_array_bitmap: [[u64; 8]; EXTENSION_TICKARRAY_BITMAP_SIZE],
}

impl TickArrayBitmapExtension {
    /// 扩展 bitmap 覆盖的 `[min, max)`
    pub fn extension_tick_boundary(tick_spacing: u16) -> (i32, i32) {
        let positive_tick_boundary = max_tick_in_tickarray_bitmap(tick_spacing);
        let extension_span = positive_tick_boundary * (EXTENSION_TICKARRAY_BITMAP_SIZE as i32 + 1);
        (-extension_span, extension_span)
    }

    /// 起始 index 必须落在扩展区间，不能在主 bitmap 里
    pub fn check_extension_boundary(tick_index: i32, tick_spacing: u16) -> ClmmResult<()> {
        let positive_tick_boundary = max_tick_in_tickarray_bitmap(tick_spacing);
        let negative_tick_boundary = -positive_tick_boundary;
        let (min_boundary, max_boundary) = Self::extension_tick_boundary(tick_spacing);
        let in_default_bitmap = (negative_tick_boundary..positive_tick_boundary).contains(&tick_index);
        let in_extension = (min_boundary..max_boundary).contains(&tick_index);
        if in_default_bitmap || !in_extension {
            return Err(ClmmError::InvalidTickArrayBoundary { start_index: tick_index });
        }
        Ok(())
    }

    /// 该 tick array 属于哪一组 bitmap
    pub fn get_bitmap_offset(tick_index: i32, tick_spacing: u16) -> ClmmResult<usize> {
        if !check_is_valid_start_index(tick_index, tick_spacing) {
            return Err(ClmmError::InvalidTickArrayStartIndex {
                start_index: tick_index,
                tick_spacing,
            });
        }
        Self::check_extension_boundary(tick_index, tick_spacing)?;
        let ticks_in_one_bitmap = max_tick_in_tickarray_bitmap(tick_spacing);
        let mut offset = tick_index.abs() / ticks_in_one_bitmap - 1;
        if tick_index < 0 && tick_index.abs() % ticks_in_one_bitmap == 0 {
            offset -= 1;
        }
        Ok(offset as usize)
    }

    /// 返回 `(组号, 该组 bitmap)`
    pub fn get_bitmap(&self, tick_index: i32, tick_spacing: u16) -> ClmmResult<(usize, U512)> {
        let offset = Self::get_bitmap_offset(tick_index, tick_spacing)?;
        let words = if tick_index < 0 {
            &self.negative_tick_array_bitmap[offset]
        } else {
            &self.positive_tick_array_bitmap[offset]
        };
        Ok((offset, U512::from_words(words)))
    }

    pub fn check_tick_array_is_initialized(
        &self,
        tick_array_start_index: i32,
        tick_spacing: u16,
    ) -> ClmmResult<(bool, i32)> {
        let (_, tickarray_bitmap) = self.get_bitmap(tick_array_start_index, tick_spacing)?;
        let offset = tick_array_offset_in_bitmap(tick_array_start_index, tick_spacing);
        Ok((tickarray_bitmap.bit(offset as usize), tick_array_start_index))
    }

    /// 翻转某个 tick array 的初始化位
    pub fn flip_tick_array_bit(&mut self, tick_array_start_index: i32, tick_spacing: u16) -> ClmmResult<()> {
        let (offset, tickarray_bitmap) = self.get_bitmap(tick_array_start_index, tick_spacing)?;
        let bit = tick_array_offset_in_bitmap(tick_array_start_index, tick_spacing);
        let flipped = tickarray_bitmap ^ (U512::one() << bit as usize);
        if tick_array_start_index < 0 {
            self.negative_tick_array_bitmap[offset] = flipped.0;
        } else {
            self.positive_tick_array_bitmap[offset] = flipped.0;
        }
        Ok(())
    }

    /// 从 `last_tick_array_start_index` 的下一个 array 开始，只在它所属的那一组里找
    ///
    /// 下一个 array 已经超出 tick 范围时返回 `(false, next)`
    pub fn next_initialized_tick_array_from_one_bitmap(
        &self,
        last_tick_array_start_index: i32,
        tick_spacing: u16,
        zero_for_one: bool,
    ) -> ClmmResult<(bool, i32)> {
        let multiplier = tick_count(tick_spacing);
        let next_tick_array_start_index = if zero_for_one {
            last_tick_array_start_index - multiplier
        } else {
            last_tick_array_start_index + multiplier
        };
        let min_tick_array_start_index = get_array_start_index(MIN_TICK, tick_spacing);
        let max_tick_array_start_index = get_array_start_index(MAX_TICK, tick_spacing);

        if next_tick_array_start_index < min_tick_array_start_index
            || next_tick_array_start_index > max_tick_array_start_index
        {
            return Ok((false, next_tick_array_start_index));
        }

        let (_, tickarray_bitmap) = self.get_bitmap(next_tick_array_start_index, tick_spacing)?;
        Ok(next_initialized_tick_array_in_bitmap(
            tickarray_bitmap,
            next_tick_array_start_index,
            tick_spacing,
            zero_for_one,
        ))
    }
}
