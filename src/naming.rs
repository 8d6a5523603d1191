//! ログファイル名の作成と、書き込み先ファイルの決定
//!
//! ログファイル名は、`[{prefix}-]<yyyymmdd>-<seq>[{extension}]`となる。日付はUTCで、
//! 連番は4桁のゼロ埋めとする。ファイル名の辞書順は、ファイルを作成した順序と一致する。
//! 連番が`MAX_SEQUENCE`に達した日は、そのファイルに追記し続ける。
//!
//! 書き込み先は、毎回ディレクトリを走査して決定するため、プロセスを再起動しても
//! 同じファイルへの追記を再開できる。

use std::{fs, path::Path, time::SystemTime};

use regex::Regex;
use time::{macros::format_description, OffsetDateTime};

use crate::{
    diagnostics::Diagnostics,
    error::{Error, Result},
};

/// 1日に作成できる連番の最大値
///
/// 連番を4桁に収めて、ファイル名の辞書順と作成順を一致させる。
pub(crate) const MAX_SEQUENCE: u32 = 9999;

/// ディレクトリを走査したときのファイルの情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FileEntry {
    pub(crate) name: String,
    pub(crate) len: u64,
    pub(crate) modified: Option<SystemTime>,
}

/// 書き込み先として決定したファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Resolved {
    pub(crate) stem: String,
    pub(crate) sequence: u32,
    /// 連番のファイルに追記できる場合は`true`
    pub(crate) reusable: bool,
}

impl Resolved {
    /// 連番を1つ進める。すでに新しいファイルを指している場合、又は連番が最大値に
    /// 達している場合は何もしない。
    pub(crate) fn force_new_sequence(mut self) -> Self {
        if self.reusable {
            if let Some(next) = next_sequence(self.sequence) {
                self.sequence = next;
                self.reusable = false;
            }
        }
        self
    }

    pub(crate) fn file_name(&self, extension: &str) -> String {
        log_filename(&self.stem, self.sequence, extension)
    }
}

/// 日付を含むファイル名の語幹を作成して、返却する。
///
/// # 引数
///
/// * prefix: ファイル名の接頭語。空の場合は日付のみとなる。
/// * today: ファイルの日付(UTC)。
///
/// # 戻り値
///
/// `{prefix}-<yyyymmdd>`または`<yyyymmdd>`。
pub(crate) fn filename_stem(prefix: &str, today: &OffsetDateTime) -> Result<String> {
    let date = today.format(format_description!("[year][month][day]"))?;

    if prefix.is_empty() {
        Ok(date)
    } else {
        Ok(format!("{}-{}", prefix, date))
    }
}

fn next_sequence(sequence: u32) -> Option<u32> {
    sequence.checked_add(1).filter(|next| *next <= MAX_SEQUENCE)
}

/// 語幹、連番及び拡張子からログファイル名を作成する。
pub(crate) fn log_filename(stem: &str, sequence: u32, extension: &str) -> String {
    format!("{}-{:04}{}", stem, sequence, extension)
}

/// 語幹で始まるファイル名から連番を取り出す正規表現を作成する。
fn sequence_pattern(stem: &str, extension: &str) -> Regex {
    let pattern = if extension.is_empty() {
        format!(r"^{}-(\d{{4}})(?:\.[^.-]*)?$", regex::escape(stem))
    } else {
        format!(r"^{}-(\d{{4}}){}$", regex::escape(stem), regex::escape(extension))
    };

    Regex::new(&pattern)
        .expect("Unable to build a sequence pattern; this is a bug in rolling-file-writer")
}

/// ディレクトリ内のファイルを、ファイル名の昇順で返却する。
///
/// 情報を取得できなかったエントリは、診断メッセージを出力して読み飛ばす。
pub(crate) fn list_files(directory: &Path, diagnostics: &Diagnostics) -> Result<Vec<FileEntry>> {
    let read_dir = fs::read_dir(directory).map_err(|source| Error::ScanDirectory {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                diagnostics.error(format_args!("read directory entry failed, {}", err));
                continue;
            }
        };
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                diagnostics.error(format_args!(
                    "get file info of {:?} failed, {}",
                    entry.file_name(),
                    err
                ));
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };

        entries.push(FileEntry {
            name,
            len: metadata.len(),
            modified: metadata.modified().ok(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(entries)
}

/// 書き込み先のファイルを決定する。
///
/// 語幹に一致するファイルのうち、連番が最大のファイルが最大サイズ未満であれば、その連番を
/// 再利用する。最大サイズに達していれば、次の連番とする。一致するファイルがなければ0とする。
/// 4桁でない連番のファイルは、他のファイルとみなして無視する。
///
/// # 引数
///
/// * entries: ディレクトリ内のファイル。
/// * stem: 現在の日付の語幹。
/// * extension: ファイルの拡張子。
/// * max_file_size: 最大ファイルサイズ。
///
/// # 戻り値
///
/// 書き込み先のファイル。
pub(crate) fn resolve(
    entries: &[FileEntry],
    stem: &str,
    extension: &str,
    max_file_size: u64,
) -> Resolved {
    let pattern = sequence_pattern(stem, extension);

    let latest = entries
        .iter()
        .filter_map(|entry| {
            let captures = pattern.captures(&entry.name)?;
            let sequence = captures[1].parse::<u32>().ok()?;
            Some((sequence, entry.len))
        })
        .max_by_key(|(sequence, _)| *sequence);

    let (sequence, reusable) = match latest {
        Some((sequence, len)) if len >= max_file_size => match next_sequence(sequence) {
            Some(next) => (next, false),
            None => (sequence, true),
        },
        Some((sequence, _)) => (sequence, true),
        None => (0, false),
    };

    Resolved {
        stem: stem.to_string(),
        sequence,
        reusable,
    }
}
