//! アペンダー内部の診断メッセージの出力先
//!
//! アペンダー自身が`tracing`の出力先になるため、内部のメッセージは`tracing`を経由せず、
//! 設定されたライターに1行ずつ直接書き込む。

use std::{
    fmt,
    io::{self, Write},
    sync::{Arc, Mutex, PoisonError},
};

use time::{format_description::well_known::Rfc3339, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Level {
    Debug,
    Info,
    Error,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Debug => "D",
            Level::Info => "I",
            Level::Error => "E",
        }
    }
}

/// 診断メッセージの出力先
///
/// 既定では、すべてのメッセージを破棄する。
#[derive(Clone)]
pub struct Diagnostics {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Diagnostics {
    /// 指定されたライターにメッセージを出力する`Diagnostics`を作成する。
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        let sink: Box<dyn Write + Send> = Box::new(sink);
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    /// メッセージを破棄する`Diagnostics`を作成する。
    pub fn discard() -> Self {
        Self::new(io::sink())
    }

    pub(crate) fn debug(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Debug, args);
    }

    pub(crate) fn info(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Info, args);
    }

    pub(crate) fn error(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Error, args);
    }

    fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        let line = format_line(OffsetDateTime::now_utc(), level, args);
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        // 出力先の失敗は、ログの書き込みに影響させない
        let _ = sink.write_all(line.as_bytes());
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::discard()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics").finish_non_exhaustive()
    }
}

fn format_line(at: OffsetDateTime, level: Level, args: fmt::Arguments<'_>) -> String {
    let timestamp = at
        .format(&Rfc3339)
        .unwrap_or_else(|_| at.unix_timestamp().to_string());

    format!("{} [{}] {}\n", timestamp, level.tag(), args)
}
