use std::{
    fs, io, mem,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
        Arc, Mutex, MutexGuard, Once, PoisonError,
    },
    thread::{self, JoinHandle},
    time::SystemTime,
};

use tracing_subscriber::fmt::MakeWriter;

use crate::{
    config::WriterConfig,
    error::{Error, Result},
    file::SizedFile,
    naming,
    retention::{self, RetentionPolicy},
};

/// ログファイルを切り替えながら書き込むアペンダー
///
/// 以下いずれかの条件で、ログの記録を新しいファイルに切り替える。
///
/// - 書き込むとファイルが最大サイズに達するとき
/// - 日付(UTC)が変わったとき
///
/// また、バックグラウンドのスレッドが、設定された間隔で日付の切り替えを確認し、
/// 保存期間を経過したファイルと、最大ファイル数を超えたファイルを削除する。
///
/// 書き込み、ファイルの切り替え及びファイルの削除は、1つのロックで直列化される。
pub struct RollingFileAppender {
    inner: Arc<Inner>,
    close_once: Once,
    shutdown: Mutex<Option<mpsc::Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// `MakeWriter`が返却するライター
#[derive(Debug)]
pub struct RollingWriter<'a>(&'a RollingFileAppender);

struct Inner {
    config: WriterConfig,
    directory: PathBuf,
    closed: AtomicBool,
    active: Mutex<SizedFile>,
}

impl RollingFileAppender {
    /// `RollingFileAppender`を作成する。
    ///
    /// ディレクトリが存在しない場合は作成し、ディレクトリ内のファイルから書き込み先の
    /// ファイルを決定して開いたあと、バックグラウンドのスレッドを開始する。
    ///
    /// # 引数
    ///
    /// * config: アペンダーの設定。
    ///
    /// # 戻り値
    ///
    /// `RollingFileAppender`インスタンス。ディレクトリが指定されていない場合、
    /// ディレクトリを作成できない場合、又はファイルを開けない場合はエラー。
    pub fn new(config: WriterConfig) -> Result<Self> {
        if config.directory.as_os_str().is_empty() {
            return Err(Error::EmptyDirectory);
        }
        let directory = create_log_directory(&config.directory)?;

        let entries = naming::list_files(&directory, &config.diagnostics)?;
        let stem = naming::filename_stem(&config.prefix, &config.clock.now_utc())?;
        let resolved = naming::resolve(&entries, &stem, &config.extension, config.max_file_size);
        let path = directory.join(resolved.file_name(&config.extension));
        let active = SizedFile::open(&path).map_err(|source| Error::OpenFile { path, source })?;

        let inner = Arc::new(Inner {
            config,
            directory,
            closed: AtomicBool::new(false),
            active: Mutex::new(active),
        });

        let (shutdown, signal) = mpsc::channel();
        let worker = {
            let inner = Arc::clone(&inner);
            thread::Builder::new()
                .name("rolling-file-maintenance".to_string())
                .spawn(move || inner.run_maintenance(signal))?
        };

        Ok(Self {
            inner,
            close_once: Once::new(),
            shutdown: Mutex::new(Some(shutdown)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// データを書き込む。
    ///
    /// 書き込むとファイルが最大サイズに達する場合は、新しいファイルに切り替えてから書き込む。
    ///
    /// # 引数
    ///
    /// * buf: 書き込むデータ。
    ///
    /// # 戻り値
    ///
    /// 書き込んだバイト数。アペンダーが閉じられている場合、又はデータが最大ファイルサイズを
    /// 超えている場合はエラー。
    pub fn append(&self, buf: &[u8]) -> Result<usize> {
        if self.inner.is_closed() {
            return Err(Error::Closed);
        }

        let mut active = self.inner.lock_active();
        if self.inner.is_closed() || active.is_closed() {
            return Err(Error::Closed);
        }

        let limit = self.inner.config.max_file_size;
        let len = buf.len() as u64;
        if len > limit {
            return Err(Error::Oversize {
                len: buf.len(),
                limit,
            });
        }
        if len + active.size() >= limit {
            self.inner.rotate(&mut active, true);
        }

        Ok(active.write(buf)?)
    }

    /// アペンダーを閉じる。
    ///
    /// バックグラウンドのスレッドを停止して、書き込み中のファイルを閉じる。
    /// 2回目以降の呼び出しは何もしない。閉じたあとの書き込みはエラーになる。
    pub fn close(&self) -> Result<()> {
        let mut result = Ok(());
        self.close_once.call_once(|| {
            self.inner.closed.store(true, Ordering::Release);
            self.shutdown
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();

            {
                let mut active = self.inner.lock_active();
                result = active.flush().map_err(Error::from);
                active.close();
            }

            let worker = self
                .worker
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(worker) = worker {
                if worker.join().is_err() {
                    self.inner
                        .config
                        .diagnostics
                        .error(format_args!("maintenance worker panicked"));
                }
            }
        });

        result
    }

    /// 書き込み中のファイルの絶対パスを返却する。
    pub fn path(&self) -> PathBuf {
        self.inner.lock_active().path().to_path_buf()
    }

    pub fn config(&self) -> &WriterConfig {
        &self.inner.config
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn flush_active(&self) -> io::Result<()> {
        self.inner.lock_active().flush()
    }
}

impl Inner {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // 書き込み中にパニックしても、ファイルの状態は壊れないため、ロックの汚染は無視する
    fn lock_active(&self) -> MutexGuard<'_, SizedFile> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_stem(&self) -> Result<String> {
        naming::filename_stem(&self.config.prefix, &self.config.clock.now_utc())
    }

    /// 書き込み先のファイルを切り替える。
    ///
    /// 新しいファイルを開けなかった場合は、現在のファイルへの書き込みを続ける。
    fn rotate(&self, active: &mut SizedFile, force_new_sequence: bool) {
        let diagnostics = &self.config.diagnostics;
        let entries = match naming::list_files(&self.directory, diagnostics) {
            Ok(entries) => entries,
            Err(err) => {
                diagnostics.error(format_args!("analysis files failed, {}", err));
                return;
            }
        };

        let stem = match self.current_stem() {
            Ok(stem) => stem,
            Err(err) => {
                diagnostics.error(format_args!("create file name failed, {}", err));
                return;
            }
        };

        let mut resolved = naming::resolve(
            &entries,
            &stem,
            &self.config.extension,
            self.config.max_file_size,
        );
        if force_new_sequence {
            resolved = resolved.force_new_sequence();
        }

        let path = self.directory.join(resolved.file_name(&self.config.extension));
        if path == active.path() {
            return;
        }
        match SizedFile::open(&path) {
            Ok(next) => {
                let mut previous = mem::replace(active, next);
                previous.close();
                diagnostics.debug(format_args!("rotate to `{}`", path.display()));
            }
            Err(err) => {
                diagnostics.error(format_args!(
                    "open file `{}` to write failed, {}",
                    path.display(),
                    err
                ));
            }
        }
    }

    fn run_maintenance(&self, signal: mpsc::Receiver<()>) {
        let interval = self.config.tick_interval;
        loop {
            match signal.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => self.maintain(),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.config
            .diagnostics
            .info(format_args!("maintenance worker exit"));
    }

    /// 日付の切り替えを確認したあと、古いファイルを削除する。
    fn maintain(&self) {
        let mut active = self.lock_active();
        if self.is_closed() {
            return;
        }

        match self.current_stem() {
            Ok(stem) => {
                let same_day = active
                    .file_name()
                    .map_or(false, |name| name.starts_with(&stem));
                if !same_day {
                    self.config
                        .diagnostics
                        .debug(format_args!("auto-rotate by day"));
                    self.rotate(&mut active, false);
                }
            }
            Err(err) => {
                self.config
                    .diagnostics
                    .error(format_args!("create file name failed, {}", err));
            }
        }

        self.clear_expired(&active);
    }

    fn clear_expired(&self, active: &SizedFile) {
        let diagnostics = &self.config.diagnostics;
        let entries = match naming::list_files(&self.directory, diagnostics) {
            Ok(entries) => entries,
            Err(err) => {
                diagnostics.error(format_args!("scan directory failed, {}", err));
                return;
            }
        };

        let policy = RetentionPolicy {
            prefix: &self.config.prefix,
            extension: &self.config.extension,
            retention: self.config.retention,
            max_file_count: self.config.max_file_count,
        };
        let now = SystemTime::from(self.config.clock.now_utc());
        retention::sweep(
            &self.directory,
            &entries,
            active.file_name(),
            &policy,
            now,
            diagnostics,
        );
    }
}

impl Drop for RollingFileAppender {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl std::fmt::Debug for RollingFileAppender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollingFileAppender")
            .field("config", &self.inner.config)
            .field("closed", &self.inner.is_closed())
            .finish_non_exhaustive()
    }
}

impl io::Write for RollingFileAppender {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.append(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_active()
    }
}

impl io::Write for &RollingFileAppender {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.append(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_active()
    }
}

impl<'a> MakeWriter<'a> for RollingFileAppender {
    type Writer = RollingWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        RollingWriter(self)
    }
}

impl io::Write for RollingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.0.append(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush_active()
    }
}

/// ログディレクトリを作成して、その絶対パスを返却する。
fn create_log_directory(directory: &Path) -> Result<PathBuf> {
    fs::create_dir_all(directory)
        .and_then(|()| fs::canonicalize(directory))
        .map_err(|source| Error::CreateDirectory {
            path: directory.to_path_buf(),
            source,
        })
}
