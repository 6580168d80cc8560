pub mod clmm;

pub use clmm::*;
