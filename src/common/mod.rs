pub mod clmm_state;
pub mod errors;
pub mod types;

pub use clmm_state::{MintInfo, PoolState, PositionRewardInfo, PositionState, RewardInfo};
pub use errors::{ClmmError, ClmmResult};
pub use types::QuoteConfig;
