use std::{
    fmt,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use crate::{
    clock::{Clock, SystemClock},
    diagnostics::Diagnostics,
};

/// 既定の最大ファイルサイズ(2GiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;
/// 既定の保存期間(7日)
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// 既定の最大ファイル数
pub const DEFAULT_MAX_FILE_COUNT: usize = 10_000;
/// 既定のメンテナンス間隔
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// `RollingFileAppender`の設定
///
/// ディレクトリ以外の項目は、`with_*`メソッドで変更する。不正な値は無視され、既定値が残る。
#[derive(Clone)]
pub struct WriterConfig {
    pub(crate) directory: PathBuf,
    pub(crate) max_file_size: u64,
    pub(crate) retention: Duration,
    pub(crate) max_file_count: usize,
    pub(crate) prefix: String,
    pub(crate) extension: String,
    pub(crate) tick_interval: Duration,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) clock: Arc<dyn Clock>,
}

impl WriterConfig {
    /// 既定値で`WriterConfig`を作成する。
    ///
    /// # 引数
    ///
    /// * directory: ファイルを作成するディレクトリ。
    ///
    /// # 戻り値
    ///
    /// `WriterConfig`インスタンス。
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            retention: DEFAULT_RETENTION,
            max_file_count: DEFAULT_MAX_FILE_COUNT,
            prefix: String::new(),
            extension: String::new(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            diagnostics: Diagnostics::discard(),
            clock: Arc::new(SystemClock),
        }
    }

    /// 最大ファイルサイズをバイトで指定する。0は無視する。
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        if bytes > 0 {
            self.max_file_size = bytes;
        }
        self
    }

    /// ファイルの保存期間を指定する。`Duration::ZERO`の場合、期間による削除をしない。
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// 残す最大ファイル数を指定する。0の場合は既定値に戻す。
    pub fn with_max_file_count(mut self, count: usize) -> Self {
        self.max_file_count = if count == 0 {
            DEFAULT_MAX_FILE_COUNT
        } else {
            count
        };
        self
    }

    /// ファイル名の接頭語を指定する。
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.trim().to_string();
        self
    }

    /// ファイルの拡張子を指定する。`.log`のように、ピリオドを含めて指定する。
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim().to_string();
        self
    }

    /// 日付の切り替えと古いファイルの削除を確認する間隔を指定する。0は無視する。
    ///
    /// 書き込みがない間に日付が変わった場合、新しいファイルに切り替わるまでの遅れは、
    /// この間隔とロックの待ち時間の合計以下になる。
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        if !interval.is_zero() {
            self.tick_interval = interval;
        }
        self
    }

    /// 診断メッセージの出力先を指定する。
    pub fn with_diagnostics(mut self, sink: impl Write + Send + 'static) -> Self {
        self.diagnostics = Diagnostics::new(sink);
        self
    }

    /// ファイル名の日付と保存期間の判定に使用する時計を指定する。
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn max_file_count(&self) -> usize {
        self.max_file_count
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }
}

impl fmt::Debug for WriterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterConfig")
            .field("directory", &self.directory)
            .field("max_file_size", &self.max_file_size)
            .field("retention", &self.retention)
            .field("max_file_count", &self.max_file_count)
            .field("prefix", &self.prefix)
            .field("extension", &self.extension)
            .field("tick_interval", &self.tick_interval)
            .finish_non_exhaustive()
    }
}
