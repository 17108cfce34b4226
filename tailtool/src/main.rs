//! テイルファイルの検査・編集ツール
//!
//! ダブル配列トライのテイルファイルを開き、エントリの一覧表示、追加、
//! データの更新、削除、整合性の検査を行うCLIツールです。
//! 文字列はUnicodeスカラー値ごとに1文字として符号化されます。

mod text;

use std::path::PathBuf;

use clap::{Args, Parser};
use datrie_tail::{IoMode, Tail, TailError, TrieData, TrieIndex};
use thiserror::Error;

/// コマンドライン引数の構造体
#[derive(Parser, Debug)]
#[clap(name = "tailtool", version)]
struct Cli {
    /// 実行するサブコマンド
    #[clap(subcommand)]
    command: Command,
}

/// 対象のテイルファイルを指定する引数
#[derive(Args, Debug)]
struct Target {
    /// Directory containing the tail file.
    #[clap(short = 'd', long, default_value = ".")]
    dir: PathBuf,

    /// Logical name of the tail. The file is `<dir>/<name>.tl`.
    #[clap(short = 'n', long)]
    name: String,
}

/// 利用可能なサブコマンド
#[derive(Parser, Debug)]
enum Command {
    /// 使用中のエントリを一覧表示します
    List {
        #[clap(flatten)]
        target: Target,
    },

    /// 文字列をサフィックスとして追加し、割り当てられたインデックスを表示します
    Add {
        #[clap(flatten)]
        target: Target,

        /// Suffix text.
        text: String,

        /// Data associated with the new entry.
        #[clap(long, allow_negative_numbers = true)]
        data: Option<TrieData>,
    },

    /// エントリのデータとサフィックスを表示します
    Get {
        #[clap(flatten)]
        target: Target,

        /// Index of the entry.
        index: u32,
    },

    /// エントリのデータを更新します
    SetData {
        #[clap(flatten)]
        target: Target,

        /// Index of the entry.
        index: u32,

        /// New data.
        #[clap(allow_negative_numbers = true)]
        data: TrieData,
    },

    /// エントリを削除します
    Delete {
        #[clap(flatten)]
        target: Target,

        /// Index of the entry.
        index: u32,
    },

    /// 空きリストの整合性を検査し、統計を表示します
    Check {
        #[clap(flatten)]
        target: Target,
    },
}

/// ツールの実行中に発生する可能性のあるエラー
#[derive(Debug, Error)]
pub enum TailToolError {
    /// テイルの操作に失敗した
    #[error(transparent)]
    Tail(#[from] TailError),

    /// 符号化できない文字を含む入力
    #[error("character {0:?} does not fit in a 16-bit trie character")]
    UnencodableChar(char),

    /// インデックスの範囲外
    #[error("index {0} is out of range")]
    IndexOutOfRange(u32),
}

fn open(target: &Target, mode: IoMode) -> Result<Tail, TailToolError> {
    Ok(Tail::open(&target.dir, &target.name, mode)?)
}

fn parse_index(index: u32) -> Result<TrieIndex, TailToolError> {
    TrieIndex::new(index).ok_or(TailToolError::IndexOutOfRange(index))
}

fn main() -> Result<(), TailToolError> {
    let cli = Cli::parse();
    match cli.command {
        Command::List { target } => {
            let tail = open(&target, IoMode::Read)?;
            for (index, data, suffix) in tail.iter() {
                println!("{index}\t{data}\t{}", text::decode(suffix));
            }
        }
        Command::Add { target, text, data } => {
            let suffix = text::encode(&text)?;
            let mut tail = open(&target, IoMode::Write)?;
            let index = tail.add_suffix(&suffix)?;
            if let Some(data) = data {
                tail.set_data(index, data)?;
            }
            tail.close()?;
            println!("{index}");
        }
        Command::Get { target, index } => {
            let index = parse_index(index)?;
            let tail = open(&target, IoMode::Read)?;
            let data = tail.get_data(index)?;
            let suffix = tail.get_suffix(index)?;
            println!("{index}\t{data}\t{}", text::decode(suffix));
        }
        Command::SetData {
            target,
            index,
            data,
        } => {
            let index = parse_index(index)?;
            let mut tail = open(&target, IoMode::Write)?;
            tail.set_data(index, data)?;
            tail.close()?;
        }
        Command::Delete { target, index } => {
            let index = parse_index(index)?;
            let mut tail = open(&target, IoMode::Write)?;
            tail.delete(index)?;
            tail.close()?;
        }
        Command::Check { target } => {
            let tail = open(&target, IoMode::Read)?;
            tail.verify()?;
            let num_in_use = tail.store().num_in_use();
            println!("path: {}", tail.path().display());
            println!("records: {}", tail.num_records());
            println!("in use: {num_in_use}");
            println!("free: {}", tail.num_records() - num_in_use);
            println!("first free: {}", tail.first_free());
        }
    }
    Ok(())
}
