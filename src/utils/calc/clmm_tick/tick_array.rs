//! Tick 与 tick array
//!
//! 一个 tick array 固定 60 个槽位，覆盖 `[start, start + 60 * tick_spacing)`。
//! swap 模拟时在单个 array 内部用 `next_init_tick` 逐个找下一个已初始化 tick，
//! 跨 array 由 `tick_query` 负责。

use crate::common::errors::{ClmmError, ClmmResult};
use crate::constants::{MAX_TICK, MIN_TICK, REWARD_NUM, TICK_ARRAY_SIZE, TICK_ARRAY_SIZE_I32};
use serde::{Deserialize, Serialize};

/// 单个 tick 的链上状态（客户端只保留报价和收益计算用到的字段）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickState {
    pub tick: i32,
    /// 从左往右穿过该 tick 时流动性的变化量
    pub liquidity_net: i128,
    /// 引用该 tick 的头寸流动性总和，非 0 即为已初始化
    pub liquidity_gross: u128,
    pub fee_growth_outside_a_x64: u128,
    pub fee_growth_outside_b_x64: u128,
    pub reward_growths_outside_x64: [u128; REWARD_NUM],
}

impl TickState {
    pub fn is_initialized(&self) -> bool {
        self.liquidity_gross != 0
    }
}

/// Tick array 状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickArrayState {
    pub start_tick_index: i32,
    #[serde(with = "ticks_serde")]
    pub ticks: [TickState; TICK_ARRAY_SIZE],
    pub initialized_tick_count: u8,
}

impl TickArrayState {
    /// 创建一个空的 tick array，起始 index 必须对齐到 array 边界
    pub fn new(start_tick_index: i32, tick_spacing: u16) -> ClmmResult<Self> {
        if !check_is_valid_start_index(start_tick_index, tick_spacing) {
            return Err(ClmmError::InvalidTickArrayStartIndex {
                start_index: start_tick_index,
                tick_spacing,
            });
        }
        Ok(Self {
            start_tick_index,
            ticks: [TickState::default(); TICK_ARRAY_SIZE],
            initialized_tick_count: 0,
        })
    }

    /// tick 在本 array 中的槽位，tick 不在本 array 时报错
    pub fn get_tick_offset_in_array(&self, tick_index: i32, tick_spacing: u16) -> ClmmResult<usize> {
        let start_tick_index = get_array_start_index(tick_index, tick_spacing);
        if start_tick_index != self.start_tick_index {
            return Err(ClmmError::TickNotInArray {
                tick: tick_index,
                start_index: self.start_tick_index,
            });
        }
        Ok(((tick_index - self.start_tick_index) / i32::from(tick_spacing)) as usize)
    }

    pub fn get_tick_state(&self, tick_index: i32, tick_spacing: u16) -> ClmmResult<&TickState> {
        let offset = self.get_tick_offset_in_array(tick_index, tick_spacing)?;
        Ok(&self.ticks[offset])
    }

    /// 写入一个 tick，并维护 `initialized_tick_count`
    ///
    /// 主要用于从账户数据或测试数据构建 tick array
    pub fn set_tick(&mut self, tick_state: TickState, tick_spacing: u16) -> ClmmResult<()> {
        if tick_state.tick % i32::from(tick_spacing) != 0 {
            return Err(ClmmError::TickNotAligned {
                tick: tick_state.tick,
                tick_spacing,
            });
        }
        let offset = self.get_tick_offset_in_array(tick_state.tick, tick_spacing)?;
        let was_initialized = self.ticks[offset].is_initialized();
        match (was_initialized, tick_state.is_initialized()) {
            (false, true) => self.initialized_tick_count = self.initialized_tick_count.saturating_add(1),
            (true, false) => self.initialized_tick_count = self.initialized_tick_count.saturating_sub(1),
            _ => {}
        }
        self.ticks[offset] = tick_state;
        Ok(())
    }

    /// 在本 array 内找下一个已初始化 tick
    ///
    /// zero_for_one 时找 `tick <= current_tick_index`；反方向找 `tick > current_tick_index`，
    /// `include_current` 为 true 时当前槽位也算（当前 tick 还没有被穿过）。
    /// `current_tick_index` 不在本 array 内时返回 None。
    pub fn next_init_tick(
        &self,
        current_tick_index: i32,
        tick_spacing: u16,
        zero_for_one: bool,
        include_current: bool,
    ) -> Option<&TickState> {
        if get_array_start_index(current_tick_index, tick_spacing) != self.start_tick_index {
            return None;
        }
        let offset_in_array = (current_tick_index - self.start_tick_index) / i32::from(tick_spacing);

        if zero_for_one {
            self.ticks[..=offset_in_array as usize]
                .iter()
                .rev()
                .find(|tick| tick.is_initialized())
        } else {
            let from = if include_current { offset_in_array } else { offset_in_array + 1 };
            if from >= TICK_ARRAY_SIZE_I32 {
                return None;
            }
            self.ticks[from as usize..].iter().find(|tick| tick.is_initialized())
        }
    }

    /// 按方向取本 array 的第一个已初始化 tick：zero_for_one 从最高槽位往下找
    pub fn first_initialized_tick(&self, zero_for_one: bool) -> ClmmResult<&TickState> {
        let found = if zero_for_one {
            self.ticks.iter().rev().find(|tick| tick.is_initialized())
        } else {
            self.ticks.iter().find(|tick| tick.is_initialized())
        };
        found.ok_or(ClmmError::TickNotFound {
            start_index: self.start_tick_index,
            zero_for_one,
        })
    }

    /// 按方向相邻的 tick array 起始 index
    pub fn next_tick_array_start_index(&self, tick_spacing: u16, zero_for_one: bool) -> i32 {
        if zero_for_one {
            self.start_tick_index - tick_count(tick_spacing)
        } else {
            self.start_tick_index + tick_count(tick_spacing)
        }
    }
}

/// 一个 tick array 覆盖的 tick 数
pub fn tick_count(tick_spacing: u16) -> i32 {
    TICK_ARRAY_SIZE_I32 * i32::from(tick_spacing)
}

/// 任意 tick 所在 tick array 的起始 index（向负无穷取整）
pub fn get_array_start_index(tick_index: i32, tick_spacing: u16) -> i32 {
    let ticks_in_array = tick_count(tick_spacing);
    let mut start = tick_index / ticks_in_array;
    if tick_index < 0 && tick_index % ticks_in_array != 0 {
        start -= 1;
    }
    start * ticks_in_array
}

/// 起始 index 是否合法
///
/// 超出 tick 范围时只允许 MIN_TICK 所在的那个 array
pub fn check_is_valid_start_index(tick_index: i32, tick_spacing: u16) -> bool {
    if !(MIN_TICK..=MAX_TICK).contains(&tick_index) {
        if tick_index > MAX_TICK {
            return false;
        }
        return tick_index == get_array_start_index(MIN_TICK, tick_spacing);
    }
    tick_index % tick_count(tick_spacing) == 0
}

mod ticks_serde {
    use super::{TICK_ARRAY_SIZE, TickState};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ticks: &[TickState; TICK_ARRAY_SIZE], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(ticks.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[TickState; TICK_ARRAY_SIZE], D::Error> {
        let ticks = Vec::<TickState>::deserialize(deserializer)?;
        let len = ticks.len();
        ticks
            .try_into()
            .map_err(|_| D::Error::invalid_length(len, &"60 tick states"))
    }
}
