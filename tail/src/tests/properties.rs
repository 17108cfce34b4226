use std::collections::BTreeMap;
use std::io;

use proptest::prelude::*;

use crate::errors::TailError;
use crate::num::{TrieChar, TrieIndex, TRIE_CHAR_TERM};
use crate::tail::{IoMode, Tail};

#[derive(Debug, Clone)]
enum Op {
    Add(Vec<TrieChar>),
    Delete(usize),
    SetData(usize, i32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => prop::collection::vec(1..=TrieChar::MAX, 0..8).prop_map(Op::Add),
        2 => any::<usize>().prop_map(Op::Delete),
        1 => (any::<usize>(), any::<i32>()).prop_map(|(i, d)| Op::SetData(i, d)),
    ]
}

fn common_prefix_len(a: &[TrieChar], b: &[TrieChar]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

proptest! {
    /// 任意の追加・削除の後でも空きリストが健全で、保存と読み込みで内容が保たれることのテスト
    #[test]
    fn test_free_list_soundness(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let dir = tempfile::tempdir().unwrap();
        let mut tail = Tail::open(dir.path(), "words", IoMode::Write).unwrap();
        let mut model: BTreeMap<TrieIndex, (Vec<TrieChar>, i32)> = BTreeMap::new();
        let mut changed = false;

        for op in ops {
            match op {
                Op::Add(s) => {
                    changed = true;
                    let i = tail.add_suffix(&s).unwrap();
                    prop_assert!(!model.contains_key(&i));
                    model.insert(i, (s, crate::num::TRIE_DATA_ERROR));
                }
                Op::Delete(k) if !model.is_empty() => {
                    let i = *model.keys().nth(k % model.len()).unwrap();
                    tail.delete(i).unwrap();
                    changed = true;
                    model.remove(&i);
                    prop_assert!(tail.delete(i).is_err());
                }
                Op::SetData(k, d) if !model.is_empty() => {
                    let i = *model.keys().nth(k % model.len()).unwrap();
                    tail.set_data(i, d).unwrap();
                    changed = true;
                    model.get_mut(&i).unwrap().1 = d;
                }
                _ => {}
            }
            tail.verify().unwrap();
        }

        prop_assert_eq!(model.len(), tail.store().num_in_use());
        prop_assert_eq!(changed, tail.is_dirty());
        tail.close().unwrap();

        // an untouched tail never creates its file
        if !changed {
            let err = Tail::open(dir.path(), "words", IoMode::Read).unwrap_err();
            prop_assert!(matches!(
                err,
                TailError::IoError(ref e) if e.kind() == io::ErrorKind::NotFound
            ));
            return Ok(());
        }

        let tail = Tail::open(dir.path(), "words", IoMode::Read).unwrap();
        tail.verify().unwrap();
        for (i, (s, d)) in &model {
            prop_assert_eq!(s.as_slice(), tail.get_suffix(*i).unwrap());
            prop_assert_eq!(*d, tail.get_data(*i).unwrap());
        }
    }

    /// 照合された文字数が最長共通接頭辞の長さと一致することのテスト
    #[test]
    fn test_walk_str_matches_common_prefix(
        stored in prop::collection::vec(1..=4u16, 0..8),
        query in prop::collection::vec(0..=4u16, 0..8),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let mut tail = Tail::open(dir.path(), "words", IoMode::Write).unwrap();
        let i = tail.add_suffix(&stored).unwrap();

        let mut terminated = stored.clone();
        terminated.push(TRIE_CHAR_TERM);
        let lcp = common_prefix_len(&terminated, &query);
        let mut suffix_idx = 0;
        prop_assert_eq!(lcp, tail.walk_str(i, &mut suffix_idx, &query).unwrap());
        // the cursor never moves past the terminator
        prop_assert_eq!(lcp.min(stored.len()), suffix_idx);

        // walking char by char agrees with walking the whole string
        let mut char_idx = 0;
        let mut matched = 0;
        for &c in &query {
            if !tail.walk_char(i, &mut char_idx, c).unwrap() {
                break;
            }
            matched += 1;
            if c == TRIE_CHAR_TERM {
                break;
            }
        }
        prop_assert_eq!(lcp, matched);
        prop_assert_eq!(suffix_idx, char_idx);
    }
}
