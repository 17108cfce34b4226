//! テイルの共通設定
//!
//! このモジュールは、テイルファイルの読み書きにおける共通の設定を提供します。
use bincode::config::{self, BigEndian, Fixint};

/// シリアライゼーションの共通bincode設定を取得します。
///
/// この関数は、ビッグエンディアンと固定長整数エンコーディングを使用する
/// bincode設定を返します。テイルファイルのすべての整数は
/// ネットワークバイトオーダーの固定幅で書き込まれるため、
/// 異なるプラットフォーム間で同一のバイト列になります。
///
/// # 戻り値
///
/// ビッグエンディアンと固定長整数エンコーディングが設定された
/// bincode設定オブジェクト
pub const fn bincode_config() -> config::Configuration<BigEndian, Fixint> {
    config::standard()
        .with_big_endian()
        .with_fixed_int_encoding()
}
