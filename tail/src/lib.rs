//! # datrie-tail
//!
//! ダブル配列トライのサフィックス格納領域(テイル)の実装です。
//!
//! ## 概要
//!
//! ダブル配列トライは、キーの分岐する接頭辞部分だけを遷移配列に格納し、
//! 他のキーと共有されない残りの部分(サフィックス)をテイルに移します。
//! これにより、長い非共有部分のために配列のスロットを浪費せずに済みます。
//!
//! このライブラリは、トライ層から呼び出されるテイル部分を提供します。
//!
//! - **インデックスによるO(1)アクセス**: レコードは[`TrieIndex`]で参照されます
//! - **空きスロットの再利用**: 削除されたスロットは未使用レコード内に連結された空きリストで管理されます
//! - **照合**: [`Tail::walk_str`]と[`Tail::walk_char`]による格納サフィックスとの比較
//! - **永続化**: 固定レイアウトのバイナリ形式での読み込みと、原子的な保存
//!
//! ## 使用例
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use datrie_tail::{IoMode, Tail};
//!
//! let dir = tempfile::tempdir()?;
//!
//! let mut tail = Tail::open(dir.path(), "words", IoMode::Write)?;
//! let cat = tail.add_suffix(&[3, 1, 20])?;
//! let dog = tail.add_suffix(&[4, 15, 7])?;
//! tail.set_data(dog, 42)?;
//! tail.delete(cat)?;
//! tail.close()?;
//!
//! let tail = Tail::open(dir.path(), "words", IoMode::Read)?;
//! assert!(tail.get_suffix(cat).is_err());
//! assert_eq!(tail.get_suffix(dog)?, &[4, 15, 7]);
//! assert_eq!(tail.get_data(dog)?, 42);
//! # Ok(())
//! # }
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(any(target_pointer_width = "32", target_pointer_width = "64")))]
compile_error!("`target_pointer_width` must be 32 or 64");

/// サフィックスの符号化
pub mod codec;

/// bincodeの共通設定
mod common;

/// エラー型の定義
pub mod errors;

/// 数値型の定義
pub mod num;

/// テイル本体
pub mod tail;

#[cfg(test)]
mod test_utils;

// Re-exports
pub use codec::{Suffix, MAX_SUFFIX_LEN};
pub use errors::{Result, TailError};
pub use num::{TrieChar, TrieData, TrieIndex, TRIE_CHAR_TERM, TRIE_DATA_ERROR};
pub use tail::{IoMode, Record, RecordStore, Tail, TailConfig};

/// このライブラリのバージョン番号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
