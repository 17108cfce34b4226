//! テイルのバイナリ形式
//!
//! すべての整数はビッグエンディアンの固定幅で書き込まれます。
//!
//! ```text
//! signature      : u16 = 0xDFFD
//! first_free     : i32             0 は空きリストが空であることを表す
//! num_records    : i32             インデックス 1..=num_records のレコードが続く
//! レコード(インデックス順):
//!   data_or_next : i32             使用中ならデータ、未使用なら次の空きインデックス
//!   suffix_len   : i16             -1 は未使用スロット、0 以上は使用中スロットの文字数
//!   chars        : u16 * suffix_len
//! ```
//!
//! 長さ0のサフィックスを持つ使用中スロットと未使用スロットは、
//! `suffix_len`の予約値(-1)によって区別されます。

use std::io::{Read, Write};

use bincode::{
    de::Decoder,
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};

use crate::codec::Suffix;
use crate::common;
use crate::errors::{Result, TailError};
use crate::num::{TrieChar, TrieIndex, TRIE_CHAR_TERM};
use crate::tail::store::{Record, RecordStore};

/// テイルファイルを識別するシグネチャ
pub const TAIL_SIGNATURE: u16 = 0xDFFD;

/// 未使用スロットを表す長さフィールドの予約値
pub const FREE_SLOT_MARKER: i16 = -1;

// Caps the up-front allocation driven by an untrusted header.
const PREALLOC_LIMIT: usize = 1 << 16;

impl Encode for RecordStore {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        let num_records = i32::try_from(self.num_records())
            .map_err(|_| EncodeError::Other("too many tail records"))?;

        Encode::encode(&TAIL_SIGNATURE, encoder)?;
        Encode::encode(&self.first_free().to_i32(), encoder)?;
        Encode::encode(&num_records, encoder)?;

        for record in self.records() {
            match record {
                Record::Free { next } => {
                    Encode::encode(&next.to_i32(), encoder)?;
                    Encode::encode(&FREE_SLOT_MARKER, encoder)?;
                }
                Record::InUse { data, suffix } => {
                    let len = i16::try_from(suffix.len())
                        .map_err(|_| EncodeError::Other("tail suffix is too long"))?;
                    Encode::encode(data, encoder)?;
                    Encode::encode(&len, encoder)?;
                    for c in suffix.as_chars() {
                        Encode::encode(c, encoder)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl<Context> Decode<Context> for RecordStore {
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        let signature: u16 = Decode::decode(decoder)?;
        if signature != TAIL_SIGNATURE {
            return Err(DecodeError::OtherString(format!(
                "signature mismatch: expected {TAIL_SIGNATURE:#06x}, found {signature:#06x}"
            )));
        }

        let first_free: i32 = Decode::decode(decoder)?;
        let num_records: i32 = Decode::decode(decoder)?;
        let num_records = usize::try_from(num_records).map_err(|_| {
            DecodeError::OtherString(format!("negative record count {num_records}"))
        })?;
        let first_free = decode_link(first_free, num_records)?;

        let mut records = Vec::with_capacity(num_records.min(PREALLOC_LIMIT));
        for i in 1..=num_records {
            let head: i32 = Decode::decode(decoder)?;
            let len: i16 = Decode::decode(decoder)?;
            let record = match len {
                FREE_SLOT_MARKER => Record::Free {
                    next: decode_link(head, num_records)?,
                },
                len if len >= 0 => Record::InUse {
                    data: head,
                    suffix: decode_suffix(decoder, len as usize, i)?,
                },
                _ => {
                    return Err(DecodeError::OtherString(format!(
                        "record {i} has an invalid suffix length {len}"
                    )));
                }
            };
            records.push(record);
        }

        let store = RecordStore::from_parts(records, first_free);
        store.check_free_list().map_err(DecodeError::OtherString)?;
        Ok(store)
    }
}

fn decode_link(raw: i32, num_records: usize) -> Result<TrieIndex, DecodeError> {
    TrieIndex::from_i32(raw)
        .filter(|index| index.as_usize() <= num_records)
        .ok_or_else(|| DecodeError::OtherString(format!("free link {raw} is out of range")))
}

fn decode_suffix<D: Decoder>(
    decoder: &mut D,
    len: usize,
    index: usize,
) -> Result<Suffix, DecodeError> {
    let mut chars = Vec::with_capacity(len);
    for _ in 0..len {
        let c: TrieChar = Decode::decode(decoder)?;
        if c == TRIE_CHAR_TERM {
            return Err(DecodeError::OtherString(format!(
                "record {index} contains the terminator character"
            )));
        }
        chars.push(c);
    }
    Ok(Suffix::from_raw(chars))
}

impl RecordStore {
    /// リーダーからレコードストアを読み込みます。
    ///
    /// リーダーの終端までをテイルのバイナリ形式として解釈します。
    ///
    /// # エラー
    ///
    /// この関数は以下の場合にエラーを返します:
    /// - データを読み込めない場合。
    /// - シグネチャが一致しない、データが途中で切れている、空きリストが壊れているなど、
    ///   内容がテイルのバイナリ形式に一致しない場合。
    pub fn read<R>(mut rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let mut bytes = Vec::new();
        rdr.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// バイト列からレコードストアを復元します。
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (store, consumed): (Self, usize) =
            bincode::decode_from_slice(bytes, common::bincode_config())
                .map_err(|e| TailError::invalid_format("tail", e.to_string()))?;
        if consumed != bytes.len() {
            return Err(TailError::invalid_format(
                "tail",
                format!("{} trailing bytes after the last record", bytes.len() - consumed),
            ));
        }
        Ok(store)
    }

    /// レコードストアをテイルのバイナリ形式でライターに書き込みます。
    ///
    /// 使用中・未使用を問わず、すべてのスロットがインデックス順に書き込まれます。
    pub fn write<W>(&self, mut wtr: W) -> Result<()>
    where
        W: Write,
    {
        bincode::encode_into_std_write(self, &mut wtr, common::bincode_config())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::codec;
    use crate::test_utils::idx;
    use crate::num::TRIE_DATA_ERROR;

    fn to_bytes(store: &RecordStore) -> Vec<u8> {
        let mut buf = vec![];
        store.write(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_empty_layout() {
        let buf = to_bytes(&RecordStore::new());
        assert_eq!(vec![0xDF, 0xFD, 0, 0, 0, 0, 0, 0, 0, 0], buf);
    }

    #[test]
    fn test_record_layout() {
        let mut store = RecordStore::new();
        let i = store
            .new_record(codec::encode(&[0x61, 0x0102]).unwrap(), 7)
            .unwrap();
        store
            .new_record(codec::encode(&[]).unwrap(), TRIE_DATA_ERROR)
            .unwrap();
        store.release(i).unwrap();

        #[rustfmt::skip]
        let expected = vec![
            0xDF, 0xFD,
            0, 0, 0, 1,
            0, 0, 0, 2,
            // index 1: free, next = 0
            0, 0, 0, 0, 0xFF, 0xFF,
            // index 2: in use, empty suffix
            0xFF, 0xFF, 0xFF, 0xFF, 0, 0,
        ];
        assert_eq!(expected, to_bytes(&store));
    }

    #[test]
    fn test_empty_suffix_is_not_free() {
        let mut store = RecordStore::new();
        let i = store.new_record(Suffix::empty(), 0).unwrap();
        let restored = RecordStore::from_bytes(&to_bytes(&store)).unwrap();
        assert!(restored.is_in_use(i));
        assert!(restored.suffix(i).unwrap().is_empty());
        assert_eq!(0, restored.data(i).unwrap());
    }

    #[test]
    fn test_restores_free_chain() {
        let mut store = RecordStore::new();
        for c in 1..=4 {
            store.new_record(codec::encode(&[c]).unwrap(), c as i32).unwrap();
        }
        store.release(idx(3)).unwrap();
        store.release(idx(1)).unwrap();

        let mut restored = RecordStore::from_bytes(&to_bytes(&store)).unwrap();
        assert_eq!(store, restored);
        assert_eq!(idx(1), restored.allocate().unwrap());
        assert_eq!(idx(3), restored.allocate().unwrap());
    }

    #[test]
    fn test_signature_mismatch() {
        let mut buf = to_bytes(&RecordStore::new());
        buf[0] = 0;
        assert!(matches!(
            RecordStore::from_bytes(&buf),
            Err(TailError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_truncated() {
        let mut store = RecordStore::new();
        store.new_record(codec::encode(&[1, 2, 3]).unwrap(), 0).unwrap();
        let buf = to_bytes(&store);
        for len in 0..buf.len() {
            assert!(
                matches!(
                    RecordStore::from_bytes(&buf[..len]),
                    Err(TailError::InvalidFormat(_))
                ),
                "len = {len}"
            );
        }
    }

    #[test]
    fn test_trailing_bytes() {
        let mut buf = to_bytes(&RecordStore::new());
        buf.push(0);
        assert!(RecordStore::from_bytes(&buf).is_err());
    }

    #[test]
    fn test_negative_count() {
        let buf = vec![0xDF, 0xFD, 0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF];
        assert!(RecordStore::from_bytes(&buf).is_err());
    }

    #[test]
    fn test_invalid_length_marker() {
        #[rustfmt::skip]
        let buf = vec![
            0xDF, 0xFD,
            0, 0, 0, 0,
            0, 0, 0, 1,
            0, 0, 0, 0, 0xFF, 0xFE,
        ];
        assert!(RecordStore::from_bytes(&buf).is_err());
    }

    #[test]
    fn test_free_link_out_of_range() {
        #[rustfmt::skip]
        let buf = vec![
            0xDF, 0xFD,
            0, 0, 0, 1,
            0, 0, 0, 1,
            0, 0, 0, 2, 0xFF, 0xFF,
        ];
        assert!(RecordStore::from_bytes(&buf).is_err());
    }

    #[test]
    fn test_orphaned_free_slot() {
        #[rustfmt::skip]
        let buf = vec![
            0xDF, 0xFD,
            0, 0, 0, 0,
            0, 0, 0, 1,
            0, 0, 0, 0, 0xFF, 0xFF,
        ];
        assert!(RecordStore::from_bytes(&buf).is_err());
    }

    #[test]
    fn test_first_free_points_to_in_use() {
        #[rustfmt::skip]
        let buf = vec![
            0xDF, 0xFD,
            0, 0, 0, 1,
            0, 0, 0, 1,
            0, 0, 0, 5, 0, 1, 0, 0x61,
        ];
        assert!(RecordStore::from_bytes(&buf).is_err());
    }

    #[test]
    fn test_terminator_in_suffix() {
        #[rustfmt::skip]
        let buf = vec![
            0xDF, 0xFD,
            0, 0, 0, 0,
            0, 0, 0, 1,
            0, 0, 0, 5, 0, 1, 0, 0,
        ];
        assert!(RecordStore::from_bytes(&buf).is_err());
    }
}
