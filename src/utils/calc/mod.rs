// Raydium CLMM official math library
pub mod clmm_math;
// Tick array 与 bitmap 索引
pub mod clmm_tick;
pub mod raydium_clmm;
