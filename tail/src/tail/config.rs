//! テイルを開く際の設定
//!
//! このモジュールは、テイルの入出力モードと、保存先ファイルの決定方法などの
//! 設定を定義します。

use std::path::{Path, PathBuf};

use crate::errors::{Result, TailError};

/// テイルファイルの既定の拡張子
pub const DEFAULT_EXTENSION: &str = ".tl";

/// テイルの入出力モード。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    /// 読み取り専用。
    ///
    /// ファイルが存在しない場合、テイルを開くことはできません。
    /// 保存は常に何もせずに成功します。
    Read,

    /// 読み書き可能。
    ///
    /// ファイルが存在しない場合は空のテイルとして開き、
    /// 閉じる際に変更があれば保存します。
    Write,
}

/// テイルの設定。
///
/// # 例
///
/// ```
/// use datrie_tail::TailConfig;
///
/// let config = TailConfig::default()
///     .extension(".tail")
///     .trim_trailing_free(true);
/// let path = config.resolve_path("dict", "words").unwrap();
/// assert_eq!(path, std::path::Path::new("dict/words.tail"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailConfig {
    extension: String,
    trim_trailing_free: bool,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            trim_trailing_free: false,
        }
    }
}

impl TailConfig {
    /// 論理名に付加するファイル拡張子を設定します。
    ///
    /// 既定値は[`DEFAULT_EXTENSION`]です。
    pub fn extension<S>(mut self, extension: S) -> Self
    where
        S: Into<String>,
    {
        self.extension = extension.into();
        self
    }

    /// 保存時に末尾の未使用スロットを切り詰めるかどうかを設定します。
    ///
    /// 有効にすると、保存のたびにファイルが縮み、切り詰められたインデックスは
    /// 以降の追加で末尾から再び割り当てられます。既定では無効です。
    pub fn trim_trailing_free(mut self, yes: bool) -> Self {
        self.trim_trailing_free = yes;
        self
    }

    #[inline(always)]
    pub(crate) const fn trims_trailing_free(&self) -> bool {
        self.trim_trailing_free
    }

    /// ディレクトリと論理名からテイルファイルのパスを決定します。
    ///
    /// パスは`<dir>/<name><extension>`になります。
    ///
    /// # エラー
    ///
    /// `name`が空の場合、またはパス区切り文字や`..`を含む場合はエラーを返します。
    pub fn resolve_path<P>(&self, dir: P, name: &str) -> Result<PathBuf>
    where
        P: AsRef<Path>,
    {
        if name.is_empty() {
            return Err(TailError::invalid_argument("name", "must not be empty"));
        }
        if name.contains(['/', '\\']) || name == ".." || name == "." {
            return Err(TailError::invalid_argument(
                "name",
                format!("'{name}' is not a plain file name"),
            ));
        }
        Ok(dir.as_ref().join(format!("{name}{}", self.extension)))
    }
}
