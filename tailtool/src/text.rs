//! 文字列と符号化文字列の相互変換

use datrie_tail::{TrieChar, TRIE_CHAR_TERM};

use crate::TailToolError;

/// 文字列をUnicodeスカラー値ごとにトライ文字へ変換します。
///
/// 16ビットに収まらない文字と、番兵文字に当たるU+0000はエラーになります。
pub fn encode(text: &str) -> Result<Vec<TrieChar>, TailToolError> {
    text.chars()
        .map(|c| match TrieChar::try_from(u32::from(c)) {
            Ok(TRIE_CHAR_TERM) | Err(_) => Err(TailToolError::UnencodableChar(c)),
            Ok(tc) => Ok(tc),
        })
        .collect()
}

/// トライ文字を表示用の文字列に変換します。
///
/// サロゲート領域の値は`\u{XXXX}`形式で表示します。
pub fn decode(chars: &[TrieChar]) -> String {
    let mut s = String::with_capacity(chars.len());
    for &c in chars {
        match char::from_u32(u32::from(c)) {
            Some(ch) => s.push(ch),
            None => s.push_str(&format!("\\u{{{c:04x}}}")),
        }
    }
    s
}
