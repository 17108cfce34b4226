//! サフィックスの符号化
//!
//! このモジュールは、呼び出し元が扱う符号化文字列と、テイル内部の
//! サフィックス表現([`Suffix`])との相互変換を提供します。
//! 内部表現は番兵文字[`TRIE_CHAR_TERM`]で終端されているものとして扱われ、
//! 長さ以降の位置はすべて番兵文字として読み出されます。

use crate::errors::{Result, TailError};
use crate::num::{TrieChar, TRIE_CHAR_TERM};

/// 1つのサフィックスに格納できる最大文字数
///
/// 永続化フォーマットの長さフィールドが符号付き16ビットであることに由来します。
pub const MAX_SUFFIX_LEN: usize = i16::MAX as usize;

/// テイルに格納されるサフィックス
#[derive(Clone, Default, Eq, PartialEq, Debug, Hash)]
pub struct Suffix {
    chars: Box<[TrieChar]>,
}

impl Suffix {
    /// 空のサフィックスを作成します。
    #[inline(always)]
    pub fn empty() -> Self {
        Self::default()
    }

    /// 番兵文字を除いた文字数を返します。
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// 指定位置の文字を取得します。
    ///
    /// `i`がサフィックスの長さ以上の場合は[`TRIE_CHAR_TERM`]を返します。
    #[inline(always)]
    pub fn char_at(&self, i: usize) -> TrieChar {
        self.chars.get(i).copied().unwrap_or(TRIE_CHAR_TERM)
    }

    /// 番兵文字の手前までの符号化文字列を返します。
    #[inline(always)]
    pub fn as_chars(&self) -> &[TrieChar] {
        &self.chars
    }

    /// 検証済みの文字列から直接作成します。
    pub(crate) fn from_raw(chars: Vec<TrieChar>) -> Self {
        debug_assert!(chars.len() <= MAX_SUFFIX_LEN);
        debug_assert!(!chars.contains(&TRIE_CHAR_TERM));
        Self {
            chars: chars.into_boxed_slice(),
        }
    }
}

/// 符号化文字列をサフィックスに変換します。
///
/// # 引数
///
/// * `text` - 番兵文字を含まない符号化文字列
///
/// # 戻り値
///
/// 変換されたサフィックス
///
/// # エラー
///
/// 以下の場合に[`TailError`]が返されます。
///
/// - `text`に番兵文字が含まれている場合
/// - `text`の長さが[`MAX_SUFFIX_LEN`]を超える場合
pub fn encode(text: &[TrieChar]) -> Result<Suffix> {
    if let Some(pos) = text.iter().position(|&c| c == TRIE_CHAR_TERM) {
        return Err(TailError::invalid_argument(
            "text",
            format!("contains the terminator character at position {pos}"),
        ));
    }
    if text.len() > MAX_SUFFIX_LEN {
        return Err(TailError::invalid_argument(
            "text",
            format!(
                "length {} exceeds the maximum suffix length {MAX_SUFFIX_LEN}",
                text.len()
            ),
        ));
    }
    Ok(Suffix {
        chars: text.into(),
    })
}

/// サフィックスを番兵文字の手前までの符号化文字列に変換します。
#[inline(always)]
pub fn decode(suffix: &Suffix) -> &[TrieChar] {
    suffix.as_chars()
}
