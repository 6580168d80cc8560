// Copyright (c) Raydium Foundation
// Licensed under Apache 2.0
// Source: https://github.com/raydium-io/raydium-clmm/programs/amm/src/libraries/big_num.rs
// Client-side subset: fixed-width types used by the quote math and the tick array bitmaps

///! U128 is more efficient that u128
///! https://github.com/solana-labs/solana/issues/19549
use uint::construct_uint;

construct_uint! {
    pub struct U128(2);
}

construct_uint! {
    pub struct U256(4);
}

// 扩展 bitmap 的单个条目（8 x u64）
construct_uint! {
    pub struct U512(8);
}

// 主 bitmap 合并后的 1024 位整数（16 x u64）
construct_uint! {
    pub struct U1024(16);
}

impl U1024 {
    /// 把池子里的 16 个 u64 按小端合并成一个整数
    pub fn from_words(words: &[u64; 16]) -> Self {
        U1024(*words)
    }
}

impl U512 {
    /// 扩展 bitmap 条目合并
    pub fn from_words(words: &[u64; 8]) -> Self {
        U512(*words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_words_little_endian() {
        let mut words = [0u64; 16];
        words[1] = 1;
        let merged = U1024::from_words(&words);
        assert!(merged.bit(64));
        assert_eq!(merged.trailing_zeros(), 64);

        let entry = U512::from_words(&[0, 0, 0, 0, 0, 0, 0, 1 << 63]);
        assert_eq!(entry.leading_zeros(), 0);
    }
}
