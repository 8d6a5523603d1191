use std::{io, path::PathBuf};

use thiserror::Error;

/// `RollingFileAppender`の操作で発生するエラー
#[derive(Error, Debug)]
pub enum Error {
    /// ログディレクトリが指定されていない
    #[error("log directory is required")]
    EmptyDirectory,

    /// ログディレクトリを作成できなかった
    #[error("failed to create log directory {}: {source}", .path.display())]
    CreateDirectory { path: PathBuf, source: io::Error },

    /// ログファイルを開けなかった
    #[error("failed to open log file {}: {source}", .path.display())]
    OpenFile { path: PathBuf, source: io::Error },

    /// ログディレクトリを走査できなかった
    #[error("failed to scan log directory {}: {source}", .path.display())]
    ScanDirectory { path: PathBuf, source: io::Error },

    /// 書き込むデータが最大ファイルサイズを超えている
    #[error("data to write is too large ({len} bytes), the max file size is {limit} bytes")]
    Oversize { len: usize, limit: u64 },

    /// 閉じられたアペンダーに書き込もうとした
    #[error("writer closed")]
    Closed,

    /// ファイル名の日付を作成できなかった
    #[error("failed to format file name date: {0}")]
    DateFormat(#[from] time::error::Format),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(err) => err,
            Error::Oversize { .. } => io::Error::new(io::ErrorKind::InvalidInput, err),
            Error::Closed => io::Error::new(io::ErrorKind::BrokenPipe, err),
            other => io::Error::new(io::ErrorKind::Other, other),
        }
    }
}
