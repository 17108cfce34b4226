//! テスト用ユーティリティ
//!
//! テストコードで使用する便利な関数を提供します。

use crate::num::{TrieChar, TrieIndex};

/// 文字列をUnicodeスカラー値で符号化文字列に変換する
pub(crate) fn chars(s: &str) -> Vec<TrieChar> {
    s.chars()
        .map(|c| TrieChar::try_from(u32::from(c)).unwrap())
        .collect()
}

pub(crate) fn idx(i: u32) -> TrieIndex {
    TrieIndex::new(i).unwrap()
}
