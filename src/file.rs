use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

/// 書き込んだバイト数を追跡するログファイル
///
/// サイズはアトミックなカウンタで保持するため、`size`はシステムコールを発行しない。
#[derive(Debug)]
pub(crate) struct SizedFile {
    path: PathBuf,
    file: Option<File>,
    size: AtomicU64,
}

impl SizedFile {
    /// ファイルを追記モードで開く。ファイルが存在しない場合は作成する。
    ///
    /// # 引数
    ///
    /// * path: ログファイルパス。
    ///
    /// # 戻り値
    ///
    /// `SizedFile`インスタンス。
    pub(crate) fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = open_append(&path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path,
            file: Some(file),
            size: AtomicU64::new(size),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// ファイル名を返却する。
    pub(crate) fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    pub(crate) fn size(&self) -> u64 {
        self.size.load(Ordering::Acquire)
    }

    /// ファイルの末尾にデータを書き込み、実際に書き込んだバイト数だけサイズを増やす。
    pub(crate) fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.file.as_ref().ok_or_else(closed_error)?;
        let written = file.write(buf)?;
        self.size.fetch_add(written as u64, Ordering::AcqRel);

        Ok(written)
    }

    pub(crate) fn flush(&self) -> io::Result<()> {
        match self.file.as_ref() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }

    /// ファイルを閉じる。2回目以降の呼び出しは何もしない。
    pub(crate) fn close(&mut self) {
        self.file.take();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.file.is_none()
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "file is closed")
}

/// ファイルを追記モードで開く。
///
/// 親ディレクトリが削除されていた場合は、ディレクトリを作成してから再度開く。
fn open_append(path: &Path) -> io::Result<File> {
    let mut open_options = OpenOptions::new();
    open_options.read(true).append(true).create(true);

    let new_file = open_options.open(path);
    if new_file.is_err() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
            return open_options.open(path);
        }
    }

    new_file
}
