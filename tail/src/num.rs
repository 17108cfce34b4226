//! テイルで扱う数値型を提供するモジュール
//!
//! このモジュールは、テイルのレコードを指す`TrieIndex`型と、
//! レコードに付随するデータ値・符号化文字の型を定義します。
//! `TrieIndex`は31ビットに制限されており、永続化フォーマットの
//! 符号付き32ビット整数に常に収まることが保証されます。

use std::fmt;

/// 各レコードに関連付けられるデータ値
pub type TrieData = i32;

/// データが設定されていないことを表す予約値
pub const TRIE_DATA_ERROR: TrieData = -1;

/// 符号化された文字の値
///
/// 外部テキストとの対応付け(アルファベット写像)はテイルの責務ではありません。
pub type TrieChar = u16;

/// サフィックスの終端を表す番兵文字
///
/// 通常の符号化テキストには現れない値です。
pub const TRIE_CHAR_TERM: TrieChar = 0;

/// u32から他の型への変換を提供するトレイト
pub trait FromU32 {
    /// u32値から実装型を生成する
    fn from_u32(src: u32) -> Self;
}

#[cfg(any(target_pointer_width = "32", target_pointer_width = "64"))]
impl FromU32 for usize {
    #[inline(always)]
    fn from_u32(src: u32) -> Self {
        // Since the pointer width is guaranteed to be 32 or 64,
        // the following process always succeeds.
        unsafe { Self::try_from(src).unwrap_unchecked() }
    }
}

/// テイル内のレコードを指すインデックス
///
/// 0から2^31-1までの整数を表現します。0は[`TrieIndex::NULL`]として予約されており、
/// 有効なレコードは`1..=num_records`の範囲にあります。
///
/// データ値([`TrieData`])などの無関係な整数と取り違えないよう、
/// 生の整数ではなく専用の型で表現しています。
#[derive(Clone, Copy, Default, Eq, PartialEq, Debug, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TrieIndex(u32);

impl TrieIndex {
    /// どのレコードも指さないことを表すヌル値
    pub const NULL: Self = Self(0);

    /// TrieIndex型で表現可能な最大値(2^31 - 1 = 0x7fff_ffff)
    pub const MAX: Self = Self(0x7fff_ffff);

    /// 指定されたu32値からTrieIndexを生成する
    ///
    /// # 引数
    ///
    /// * `x` - TrieIndexに変換するu32値
    ///
    /// # 戻り値
    ///
    /// * `Some(TrieIndex)` - 変換に成功した場合
    /// * `None` - xが31ビットの範囲を超えている場合
    ///
    /// # 例
    ///
    /// ```
    /// # use datrie_tail::num::TrieIndex;
    /// assert!(TrieIndex::new(100).is_some());
    /// assert!(TrieIndex::new(0x7fff_ffff).is_some());
    /// assert!(TrieIndex::new(0x8000_0000).is_none());
    /// ```
    #[inline(always)]
    pub const fn new(x: u32) -> Option<Self> {
        if x <= Self::MAX.get() {
            Some(Self(x))
        } else {
            None
        }
    }

    /// 永続化フォーマットの符号付き32ビット値からTrieIndexを生成する
    ///
    /// 負の値に対しては`None`を返します。
    #[inline(always)]
    pub const fn from_i32(x: i32) -> Option<Self> {
        if x < 0 { None } else { Some(Self(x as u32)) }
    }

    /// 内部のu32値を取得する
    #[inline(always)]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// 永続化フォーマット用の符号付き32ビット値を取得する
    ///
    /// 31ビットに制限されているため、この変換は常に正の値を返します。
    #[inline(always)]
    pub const fn to_i32(self) -> i32 {
        self.0 as i32
    }

    /// ヌル値かどうかを判定する
    #[inline(always)]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// 次のインデックスを返す
    ///
    /// 31ビットの範囲を超える場合は`None`を返します。
    #[inline(always)]
    pub const fn succ(self) -> Option<Self> {
        Self::new(self.0 + 1)
    }

    #[inline(always)]
    pub(crate) fn as_usize(self) -> usize {
        usize::from_u32(self.0)
    }
}

impl fmt::Display for TrieIndex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
