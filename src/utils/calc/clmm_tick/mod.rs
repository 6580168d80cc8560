//! Tick array 数据结构与查询
//!
//! - `tick_array`: 单个 tick array 内的游标
//! - `tick_array_bitmap` / `tick_array_bitmap_extension`: 哪些 tick array 已初始化
//! - `tick_query`: 组合两个 bitmap 的跨 array 查询

pub mod tick_array;
pub mod tick_array_bitmap;
pub mod tick_array_bitmap_extension;
pub mod tick_query;

pub use tick_array::{TickArrayState, TickState, check_is_valid_start_index, get_array_start_index, tick_count};
pub use tick_array_bitmap_extension::TickArrayBitmapExtension;
pub use tick_query::TickArrayBitmapSource;

/// 起始 index -> tick array，由调用方预先加载
pub type TickArrayCache = std::collections::HashMap<i32, TickArrayState>;
