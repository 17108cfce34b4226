//! ダブル配列トライのテイル
//!
//! ダブル配列の経路が分岐しなくなった時点で、キーの残りの部分(サフィックス)は
//! 遷移配列から取り出され、テイルに格納されます。トライ層はテイルのレコードを
//! [`TrieIndex`]で参照し、検索時には[`Tail::walk_str`]と[`Tail::walk_char`]で
//! 格納されたサフィックスと照合します。
//!
//! # テイルの開き方
//!
//! - [`Tail::open`]: ディレクトリと論理名からテイルファイルを開く
//! - [`Tail::open_with_config`]: [`TailConfig`]を指定して開く
//!
//! 変更は[`Tail::save`]で保存されます。[`Tail::close`]は書き込みモードで
//! 変更がある場合に保存してからテイルを解放します。
pub(crate) mod config;
pub(crate) mod format;
pub(crate) mod store;

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::codec;
use crate::errors::{Result, TailError};
use crate::num::{TrieChar, TrieData, TrieIndex, TRIE_CHAR_TERM, TRIE_DATA_ERROR};

pub use crate::tail::config::{IoMode, TailConfig, DEFAULT_EXTENSION};
pub use crate::tail::format::{FREE_SLOT_MARKER, TAIL_SIGNATURE};
pub use crate::tail::store::{Record, RecordStore};

/// ファイルに永続化されるサフィックスの格納領域。
///
/// テイルは1つの[`RecordStore`]と空きリストを所有し、開いた時点で決まった
/// ファイルパスに保存します。内部で排他制御は行わないため、複数のスレッドから
/// 使用する場合は呼び出し元で全体を1つのロックで保護してください。
#[derive(Debug)]
pub struct Tail {
    store: RecordStore,
    path: PathBuf,
    mode: IoMode,
    config: TailConfig,
    is_dirty: bool,
}

impl Tail {
    /// 既定の設定でテイルを開きます。
    ///
    /// # 引数
    ///
    /// * `dir` - テイルファイルを格納するディレクトリ
    /// * `name` - テイルの論理名。実際のファイル名は[`TailConfig::resolve_path`]で決まります。
    /// * `mode` - 入出力モード
    ///
    /// # エラー
    ///
    /// [`Tail::open_with_config`]を参照してください。
    pub fn open<P>(dir: P, name: &str, mode: IoMode) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        Self::open_with_config(dir, name, mode, TailConfig::default())
    }

    /// 設定を指定してテイルを開きます。
    ///
    /// ファイルが存在すれば読み込みます。存在せず`mode`が[`IoMode::Write`]であれば、
    /// 空のテイルとして初期化します。空のテイルは変更されるまでファイルを作成しません。
    /// 長さ0のファイルも空のテイルとして扱います。
    ///
    /// # 例
    ///
    /// ```
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use datrie_tail::{IoMode, Tail, TRIE_DATA_ERROR};
    ///
    /// let dir = tempfile::tempdir()?;
    /// let mut tail = Tail::open(dir.path(), "words", IoMode::Write)?;
    ///
    /// let i = tail.add_suffix(&[3, 1, 20])?;
    /// assert_eq!(tail.get_suffix(i)?, &[3, 1, 20]);
    /// assert_eq!(tail.get_data(i)?, TRIE_DATA_ERROR);
    ///
    /// tail.close()?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # エラー
    ///
    /// この関数は以下の場合にエラーを返します:
    /// - `name`がファイル名として不正な場合。
    /// - パスがディレクトリを指している場合。
    /// - ファイルが存在せず、`mode`が[`IoMode::Read`]の場合。
    /// - ファイルを読み込めない場合。
    /// - ファイルの内容がテイルのバイナリ形式に一致しない場合。
    pub fn open_with_config<P>(dir: P, name: &str, mode: IoMode, config: TailConfig) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = config.resolve_path(dir, name)?;
        if path.is_dir() {
            return Err(TailError::PathIsDirectory(path));
        }

        let store = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => RecordStore::new(),
            Ok(bytes) => RecordStore::from_bytes(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound && mode == IoMode::Write => {
                log::debug!("[datrie-tail] {} does not exist; starting empty", path.display());
                RecordStore::new()
            }
            Err(e) => return Err(e.into()),
        };
        log::debug!(
            "[datrie-tail] opened {} ({:?}, {} records)",
            path.display(),
            mode,
            store.num_records(),
        );

        Ok(Self {
            store,
            path,
            mode,
            config,
            is_dirty: false,
        })
    }

    /// テイルファイルのパスを返します。
    #[inline(always)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline(always)]
    pub const fn mode(&self) -> IoMode {
        self.mode
    }

    /// 最後に保存(または読み込み)した時点から変更されているかどうかを返します。
    #[inline(always)]
    pub const fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// スロット数(使用中と未使用の合計)を返します。
    #[inline(always)]
    pub fn num_records(&self) -> usize {
        self.store.num_records()
    }

    /// 空きリストの先頭を返します。
    #[inline(always)]
    pub fn first_free(&self) -> TrieIndex {
        self.store.first_free()
    }

    /// 内部のレコードストアへの参照を返します。
    #[inline(always)]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// 使用中のエントリを`(インデックス, データ, サフィックス)`の組としてインデックス順に列挙します。
    pub fn iter(&self) -> impl Iterator<Item = (TrieIndex, TrieData, &[TrieChar])> + '_ {
        self.store
            .iter()
            .map(|(index, data, suffix)| (index, data, codec::decode(suffix)))
    }

    /// 変更を保存します。
    ///
    /// 読み取り専用で開いた場合、または変更がない場合は何もせずに成功します。
    /// それ以外の場合は同じディレクトリの一時ファイルに全レコードを書き込み、
    /// 同期してから元のファイルと置き換えます。失敗した場合は元のファイルは
    /// 変更されず、メモリ上のレコードと変更フラグもそのまま残るため、再試行できます。
    ///
    /// # エラー
    ///
    /// 一時ファイルの作成、書き込み、同期、置き換えのいずれかに失敗した場合にエラーを返します。
    pub fn save(&mut self) -> Result<()> {
        if !self.is_dirty {
            return Ok(());
        }
        if self.mode == IoMode::Read {
            log::warn!(
                "[datrie-tail] {} was opened read-only; changes are not saved",
                self.path.display()
            );
            return Ok(());
        }

        // The trimmed image replaces the store only after it is persisted.
        let trimmed = if self.config.trims_trailing_free()
            && self.store.records().last().is_some_and(Record::is_free)
        {
            let mut store = self.store.clone();
            let num_trimmed = store.trim_trailing_free();
            Some((store, num_trimmed))
        } else {
            None
        };
        let image = trimmed.as_ref().map_or(&self.store, |(store, _)| store);

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut temp_file = NamedTempFile::new_in(dir)?;
        {
            let mut wtr = BufWriter::new(temp_file.as_file_mut());
            image.write(&mut wtr)?;
            wtr.flush()?;
        }
        temp_file.as_file().sync_all()?;
        temp_file.persist(&self.path)?;

        if let Some((store, num_trimmed)) = trimmed {
            log::debug!("[datrie-tail] trimmed {num_trimmed} trailing free records");
            self.store = store;
        }
        self.is_dirty = false;
        log::debug!(
            "[datrie-tail] saved {} ({} records)",
            self.path.display(),
            self.store.num_records(),
        );
        Ok(())
    }

    /// テイルを閉じます。
    ///
    /// 書き込みモードで変更がある場合は保存してから解放します。
    /// 保存に失敗してもテイルは解放され、エラーが返されます。
    pub fn close(mut self) -> Result<()> {
        let result = self.save();
        if let Err(e) = &result {
            log::error!("[datrie-tail] failed to save {} on close: {e}", self.path.display());
        }
        // Dropping must not retry the save.
        self.is_dirty = false;
        result
    }

    /// 指定されたエントリのサフィックスを取得します。
    ///
    /// # エラー
    ///
    /// `index`が使用中のエントリを指していない場合は[`TailError::InvalidIndex`]を返します。
    #[inline(always)]
    pub fn get_suffix(&self, index: TrieIndex) -> Result<&[TrieChar]> {
        Ok(codec::decode(self.store.suffix(index)?))
    }

    /// 指定されたエントリのサフィックスを置き換えます。
    ///
    /// # エラー
    ///
    /// 以下の場合にエラーを返し、テイルは変更されません。
    /// - `suffix`に番兵文字が含まれる、または長すぎる場合。
    /// - `index`が使用中のエントリを指していない場合。
    pub fn set_suffix(&mut self, index: TrieIndex, suffix: &[TrieChar]) -> Result<()> {
        let suffix = codec::encode(suffix)?;
        self.store.set_suffix(index, suffix)?;
        self.is_dirty = true;
        Ok(())
    }

    /// 指定されたエントリのデータを取得します。
    ///
    /// データが設定されていない場合は[`TRIE_DATA_ERROR`]を返します。
    #[inline(always)]
    pub fn get_data(&self, index: TrieIndex) -> Result<TrieData> {
        self.store.data(index)
    }

    /// 指定されたエントリのデータを設定します。
    pub fn set_data(&mut self, index: TrieIndex, data: TrieData) -> Result<()> {
        self.store.set_data(index, data)?;
        self.is_dirty = true;
        Ok(())
    }

    /// 新しいサフィックスを追加し、そのインデックスを返します。
    ///
    /// 解放済みのスロットがあれば、最後に解放されたものから再利用します。
    /// 追加されたエントリのデータは[`TRIE_DATA_ERROR`]です。
    pub fn add_suffix(&mut self, suffix: &[TrieChar]) -> Result<TrieIndex> {
        let suffix = codec::encode(suffix)?;
        let index = self.store.new_record(suffix, TRIE_DATA_ERROR)?;
        self.is_dirty = true;
        Ok(index)
    }

    /// エントリを削除し、スロットを再利用可能にします。
    ///
    /// # エラー
    ///
    /// `index`が使用中のエントリを指していない場合(二重削除を含む)は
    /// [`TailError::InvalidIndex`]を返します。
    pub fn delete(&mut self, index: TrieIndex) -> Result<()> {
        self.store.release(index)?;
        self.is_dirty = true;
        Ok(())
    }

    /// 文字列を用いてエントリのサフィックスを辿ります。
    ///
    /// サフィックスの`*suffix_idx`の位置から`s`と1文字ずつ比較し、
    /// 最初に一致しなかった文字、または`s`の終端で停止します。
    /// 番兵文字と一致した場合はそれも1文字として数え、その位置で停止します。
    ///
    /// # 引数
    ///
    /// * `index` - エントリのインデックス
    /// * `suffix_idx` - サフィックス内の現在位置。一致した文字の直後に更新されますが、
    ///   番兵文字の位置を越えることはありません。
    /// * `s` - 照合する符号化文字列
    ///
    /// # 戻り値
    ///
    /// 一致した文字数
    ///
    /// # 例
    ///
    /// ```
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use datrie_tail::{IoMode, Tail, TRIE_CHAR_TERM};
    ///
    /// let dir = tempfile::tempdir()?;
    /// let mut tail = Tail::open(dir.path(), "words", IoMode::Write)?;
    /// let i = tail.add_suffix(&[1, 2, 3])?;
    ///
    /// let mut suffix_idx = 0;
    /// assert_eq!(tail.walk_str(i, &mut suffix_idx, &[1, 2, 9])?, 2);
    /// assert_eq!(suffix_idx, 2);
    ///
    /// assert_eq!(tail.walk_str(i, &mut suffix_idx, &[3, TRIE_CHAR_TERM])?, 2);
    /// assert_eq!(suffix_idx, 3);
    /// # Ok(())
    /// # }
    /// ```
    pub fn walk_str(&self, index: TrieIndex, suffix_idx: &mut usize, s: &[TrieChar]) -> Result<usize> {
        let suffix = self.store.suffix(index)?;

        let mut i = 0;
        let mut j = *suffix_idx;
        while i < s.len() {
            let c = suffix.char_at(j);
            if s[i] != c {
                break;
            }
            i += 1;
            // stop and stay at the terminator
            if c == TRIE_CHAR_TERM {
                break;
            }
            j += 1;
        }
        *suffix_idx = j;
        Ok(i)
    }

    /// 1文字を用いてエントリのサフィックスを辿ります。
    ///
    /// サフィックスの`*suffix_idx`の位置の文字(長さ以降は番兵文字)が`c`と一致すれば
    /// `true`を返し、`*suffix_idx`を1つ進めます。番兵文字と一致した場合は
    /// 位置を進めません。一致しなければ`false`を返し、位置は変わりません。
    #[inline]
    pub fn walk_char(&self, index: TrieIndex, suffix_idx: &mut usize, c: TrieChar) -> Result<bool> {
        let suffix = self.store.suffix(index)?;

        let suffix_char = suffix.char_at(*suffix_idx);
        if suffix_char != c {
            return Ok(false);
        }
        if suffix_char != TRIE_CHAR_TERM {
            *suffix_idx += 1;
        }
        Ok(true)
    }

    /// 空きリストの整合性を検査します。
    ///
    /// すべてのスロットが使用中か未使用のいずれか一方であり、空きリストが
    /// すべての未使用スロットをちょうど1回ずつ辿ってヌルで終端することを確認します。
    pub fn verify(&self) -> Result<()> {
        self.store
            .check_free_list()
            .map_err(|cause| TailError::invalid_state("free list is inconsistent", cause))
    }
}

impl Drop for Tail {
    fn drop(&mut self) {
        if self.is_dirty
            && self.mode == IoMode::Write
            && let Err(e) = self.save()
        {
            log::error!(
                "[datrie-tail] failed to save {} on drop: {e}",
                self.path.display()
            );
        }
    }
}
