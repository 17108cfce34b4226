//! レコードストアと空きリスト
//!
//! このモジュールは、インデックスからレコードへの写像と、未使用レコードを
//! 再利用するための空きリストを提供します。空きリストは未使用レコード自身の
//! 中に連結されており、別途のビットマップは持ちません。
//!
//! インデックス0はヌル値として予約されており、`i`番目のレコードは
//! 内部配列の`i - 1`番目の要素に格納されます。

use crate::codec::Suffix;
use crate::errors::{Result, TailError};
use crate::num::{TrieData, TrieIndex, TRIE_DATA_ERROR};

/// テイルの1スロット分のレコード
///
/// 使用中と未使用は同じスロットの排他的な状態です。
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Record {
    /// 未使用のスロット
    ///
    /// `next`は空きリスト上の次のスロットを指し、末尾では[`TrieIndex::NULL`]です。
    Free {
        /// 次の未使用スロット
        next: TrieIndex,
    },

    /// 使用中のスロット
    InUse {
        /// サフィックスに関連付けられたデータ
        data: TrieData,
        /// 格納されたサフィックス
        suffix: Suffix,
    },
}

impl Record {
    #[inline(always)]
    pub const fn is_free(&self) -> bool {
        matches!(self, Self::Free { .. })
    }
}

/// インデックスでアクセスするレコードの集合
///
/// 挿入・削除・保存・読み込みを通じてインデックスは変化しません。
/// 例外として、設定により保存時に末尾の未使用スロットが切り詰められることがあります。
#[derive(Clone, Default, Eq, PartialEq, Debug)]
pub struct RecordStore {
    records: Vec<Record>,
    first_free: TrieIndex,
}

impl RecordStore {
    /// 空のレコードストアを作成します。
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(records: Vec<Record>, first_free: TrieIndex) -> Self {
        Self {
            records,
            first_free,
        }
    }

    /// スロット数(使用中と未使用の合計)を返します。
    #[inline(always)]
    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    /// 空きリストの先頭を返します。
    ///
    /// 空きリストが空の場合は[`TrieIndex::NULL`]です。
    #[inline(always)]
    pub fn first_free(&self) -> TrieIndex {
        self.first_free
    }

    /// インデックス順に並んだすべてのスロットを返します。
    #[inline(always)]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[inline(always)]
    fn slot(&self, index: TrieIndex) -> Option<&Record> {
        if index.is_null() {
            return None;
        }
        self.records.get(index.as_usize() - 1)
    }

    #[inline(always)]
    fn slot_mut(&mut self, index: TrieIndex) -> Option<&mut Record> {
        if index.is_null() {
            return None;
        }
        self.records.get_mut(index.as_usize() - 1)
    }

    /// 指定されたスロットが使用中かどうかを判定します。
    #[inline(always)]
    pub fn is_in_use(&self, index: TrieIndex) -> bool {
        matches!(self.slot(index), Some(Record::InUse { .. }))
    }

    /// 使用中のスロットのサフィックスを取得します。
    ///
    /// # エラー
    ///
    /// `index`がヌル、範囲外、または未使用の場合は[`TailError::InvalidIndex`]を返します。
    #[inline(always)]
    pub fn suffix(&self, index: TrieIndex) -> Result<&Suffix> {
        match self.slot(index) {
            Some(Record::InUse { suffix, .. }) => Ok(suffix),
            _ => Err(TailError::InvalidIndex(index)),
        }
    }

    /// 使用中のスロットのデータを取得します。
    ///
    /// データが一度も設定されていない場合は[`TRIE_DATA_ERROR`]を返します。
    ///
    /// # エラー
    ///
    /// `index`がヌル、範囲外、または未使用の場合は[`TailError::InvalidIndex`]を返します。
    #[inline(always)]
    pub fn data(&self, index: TrieIndex) -> Result<TrieData> {
        match self.slot(index) {
            Some(Record::InUse { data, .. }) => Ok(*data),
            _ => Err(TailError::InvalidIndex(index)),
        }
    }

    /// 使用中のスロットのサフィックスを置き換えます。
    pub fn set_suffix(&mut self, index: TrieIndex, new_suffix: Suffix) -> Result<()> {
        match self.slot_mut(index) {
            Some(Record::InUse { suffix, .. }) => {
                *suffix = new_suffix;
                Ok(())
            }
            _ => Err(TailError::InvalidIndex(index)),
        }
    }

    /// 使用中のスロットのデータを置き換えます。
    pub fn set_data(&mut self, index: TrieIndex, new_data: TrieData) -> Result<()> {
        match self.slot_mut(index) {
            Some(Record::InUse { data, .. }) => {
                *data = new_data;
                Ok(())
            }
            _ => Err(TailError::InvalidIndex(index)),
        }
    }

    /// 新しいスロットを確保します。
    ///
    /// 空きリストが空でなければ先頭のスロットを取り出し、空であれば
    /// 末尾に新しいスロットを追加します。確保したスロットは
    /// データが[`TRIE_DATA_ERROR`]、サフィックスが空の使用中状態になります。
    ///
    /// # エラー
    ///
    /// インデックスが31ビットの範囲を使い切った場合、または空きリストが
    /// 使用中のスロットを指している場合にエラーを返します。
    pub fn allocate(&mut self) -> Result<TrieIndex> {
        let fresh = Record::InUse {
            data: TRIE_DATA_ERROR,
            suffix: Suffix::empty(),
        };

        if !self.first_free.is_null() {
            let index = self.first_free;
            let Some(slot) = self.slot_mut(index) else {
                return Err(TailError::invalid_state(
                    "free list is broken",
                    format!("first free index {index} is out of range"),
                ));
            };
            let Record::Free { next } = *slot else {
                return Err(TailError::invalid_state(
                    "free list is broken",
                    format!("first free index {index} is in use"),
                ));
            };
            *slot = fresh;
            self.first_free = next;
            return Ok(index);
        }

        let index = u32::try_from(self.records.len() + 1)
            .ok()
            .and_then(TrieIndex::new)
            .ok_or_else(|| {
                TailError::invalid_state(
                    "cannot grow the record store",
                    format!("all {} indices are in use", TrieIndex::MAX),
                )
            })?;
        self.records.push(fresh);
        Ok(index)
    }

    /// 使用中のスロットを解放し、空きリストの先頭に追加します。
    ///
    /// # エラー
    ///
    /// `index`がヌル、範囲外、またはすでに解放済みの場合は
    /// [`TailError::InvalidIndex`]を返します。二重解放はここで拒否されます。
    pub fn release(&mut self, index: TrieIndex) -> Result<()> {
        let next = self.first_free;
        match self.slot_mut(index) {
            Some(slot) if !slot.is_free() => {
                *slot = Record::Free { next };
                self.first_free = index;
                Ok(())
            }
            _ => Err(TailError::InvalidIndex(index)),
        }
    }

    /// 新しいレコードを追加し、そのインデックスを返します。
    pub fn new_record(&mut self, suffix: Suffix, data: TrieData) -> Result<TrieIndex> {
        let index = self.allocate()?;
        if let Some(slot) = self.slot_mut(index) {
            *slot = Record::InUse { data, suffix };
        }
        Ok(index)
    }

    /// 使用中のレコードをインデックス順に列挙します。
    pub fn iter(&self) -> impl Iterator<Item = (TrieIndex, TrieData, &Suffix)> + '_ {
        self.records
            .iter()
            .zip(1u32..)
            .filter_map(|(record, i)| match record {
                Record::InUse { data, suffix } => Some((TrieIndex::new(i)?, *data, suffix)),
                Record::Free { .. } => None,
            })
    }

    /// 使用中のレコード数を返します。
    pub fn num_in_use(&self) -> usize {
        self.records.iter().filter(|r| !r.is_free()).count()
    }

    /// 空きリストの整合性を検査します。
    ///
    /// 以下を満たさない場合は、最初に見つかった違反の説明を返します。
    ///
    /// - 空きリストは範囲内の未使用スロットだけを辿り、ヌルで終端する
    /// - 同じスロットを二度辿らない(循環しない)
    /// - すべての未使用スロットが空きリストから到達可能である
    pub fn check_free_list(&self) -> std::result::Result<(), String> {
        let mut visited = vec![false; self.records.len()];
        let mut num_visited = 0;
        let mut cur = self.first_free;
        while !cur.is_null() {
            let next = match self.slot(cur) {
                Some(Record::Free { next }) => *next,
                Some(Record::InUse { .. }) => {
                    return Err(format!("free list reaches in-use index {cur}"));
                }
                None => return Err(format!("free list reaches out-of-range index {cur}")),
            };
            let seen = &mut visited[cur.as_usize() - 1];
            if *seen {
                return Err(format!("free list has a cycle at index {cur}"));
            }
            *seen = true;
            num_visited += 1;
            cur = next;
        }

        let num_free = self.records.iter().filter(|r| r.is_free()).count();
        if num_visited != num_free {
            let orphan = self
                .records
                .iter()
                .zip(visited)
                .position(|(r, seen)| r.is_free() && !seen)
                .map_or(0, |i| i + 1);
            return Err(format!(
                "free index {orphan} is not reachable from the free list"
            ));
        }
        Ok(())
    }

    /// 末尾に連続する未使用スロットを取り除きます。
    ///
    /// 残った未使用スロットの空きリスト上の順序は保たれます。
    ///
    /// # 戻り値
    ///
    /// 取り除いたスロット数
    pub fn trim_trailing_free(&mut self) -> usize {
        let new_len = self
            .records
            .iter()
            .rposition(|r| !r.is_free())
            .map_or(0, |i| i + 1);
        let num_trimmed = self.records.len() - new_len;
        if num_trimmed == 0 {
            return 0;
        }

        let mut kept = Vec::new();
        let mut cur = self.first_free;
        for _ in 0..self.records.len() {
            let Some(Record::Free { next }) = self.slot(cur) else {
                break;
            };
            if cur.as_usize() <= new_len {
                kept.push(cur);
            }
            cur = *next;
        }
        self.records.truncate(new_len);

        self.first_free = kept.first().copied().unwrap_or(TrieIndex::NULL);
        for (i, &index) in kept.iter().enumerate() {
            let next = kept.get(i + 1).copied().unwrap_or(TrieIndex::NULL);
            if let Some(slot) = self.slot_mut(index) {
                *slot = Record::Free { next };
            }
        }
        num_trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::codec;
    use crate::test_utils::idx;

    fn store_with(n: usize) -> RecordStore {
        let mut store = RecordStore::new();
        for i in 0..n {
            let suffix = codec::encode(&[i as u16 + 1]).unwrap();
            store.new_record(suffix, TRIE_DATA_ERROR).unwrap();
        }
        store
    }

    #[test]
    fn test_allocate_appends() {
        let mut store = RecordStore::new();
        assert_eq!(idx(1), store.allocate().unwrap());
        assert_eq!(idx(2), store.allocate().unwrap());
        assert_eq!(2, store.num_records());
        assert_eq!(TRIE_DATA_ERROR, store.data(idx(1)).unwrap());
        assert!(store.suffix(idx(2)).unwrap().is_empty());
    }

    #[test]
    fn test_release_is_lifo() {
        let mut store = store_with(4);
        store.release(idx(2)).unwrap();
        store.release(idx(4)).unwrap();
        assert_eq!(idx(4), store.first_free());
        assert_eq!(idx(4), store.allocate().unwrap());
        assert_eq!(idx(2), store.allocate().unwrap());
        assert_eq!(idx(5), store.allocate().unwrap());
        store.check_free_list().unwrap();
    }

    #[test]
    fn test_double_release() {
        let mut store = store_with(2);
        store.release(idx(1)).unwrap();
        assert!(matches!(
            store.release(idx(1)),
            Err(TailError::InvalidIndex(i)) if i == idx(1)
        ));
        store.check_free_list().unwrap();
    }

    #[test]
    fn test_invalid_indices() {
        let mut store = store_with(1);
        assert!(store.suffix(TrieIndex::NULL).is_err());
        assert!(store.data(idx(2)).is_err());
        assert!(store.set_data(idx(2), 0).is_err());
        assert!(store.release(TrieIndex::NULL).is_err());
        store.release(idx(1)).unwrap();
        assert!(store.suffix(idx(1)).is_err());
        assert!(store.set_suffix(idx(1), Suffix::empty()).is_err());
    }

    #[test]
    fn test_iter_skips_free() {
        let mut store = store_with(3);
        store.set_data(idx(3), 30).unwrap();
        store.release(idx(2)).unwrap();
        let entries: Vec<_> = store
            .iter()
            .map(|(i, d, s)| (i.get(), d, s.as_chars().to_vec()))
            .collect();
        assert_eq!(
            vec![(1, TRIE_DATA_ERROR, vec![1]), (3, 30, vec![3])],
            entries
        );
        assert_eq!(2, store.num_in_use());
    }

    #[test]
    fn test_check_free_list_detects_orphan() {
        let store = RecordStore::from_parts(
            vec![Record::Free {
                next: TrieIndex::NULL,
            }],
            TrieIndex::NULL,
        );
        assert!(store.check_free_list().is_err());
    }

    #[test]
    fn test_check_free_list_detects_cycle() {
        let store = RecordStore::from_parts(
            vec![Record::Free { next: idx(2) }, Record::Free { next: idx(1) }],
            idx(1),
        );
        assert!(store.check_free_list().is_err());
    }

    #[test]
    fn test_trim_trailing_free() {
        let mut store = store_with(5);
        store.release(idx(2)).unwrap();
        store.release(idx(5)).unwrap();
        store.release(idx(4)).unwrap();
        assert_eq!(2, store.trim_trailing_free());
        assert_eq!(3, store.num_records());
        assert_eq!(idx(2), store.first_free());
        store.check_free_list().unwrap();
        assert_eq!(idx(2), store.allocate().unwrap());
        assert_eq!(idx(4), store.allocate().unwrap());
    }

    #[test]
    fn test_trim_all_free() {
        let mut store = store_with(2);
        store.release(idx(1)).unwrap();
        store.release(idx(2)).unwrap();
        assert_eq!(2, store.trim_trailing_free());
        assert_eq!(0, store.num_records());
        assert!(store.first_free().is_null());
    }
}
