//! Rolling File Writer
//!
//! ----------------------------------------------------------------------------
//!
//! このクレートには、ログをファイルに記録する`RollingFileAppender`構造体が含まれている。
//! `RollingFileAppender`は、`std::io::Write`と`tracing-subscriber`クレートの`MakeWriter`を
//! 実装しているため、`tracing_subscriber::fmt().with_writer(appender)`のように、
//! ログの出力先として直接指定できる。
//!
//! `RollingFileAppender`は、以下いずれかの条件で、ログの記録を新しいファイルに切り替える。
//!
//! - 日付(UTC)が変わったとき
//! - 書き込むとファイルが指定されたサイズに達するとき
//!
//! ファイル名は`[{prefix}-]<yyyymmdd>-<seq>[{extension}]`となり、起動時にディレクトリ内の
//! ファイルから書き込み先を決定するため、再起動後も同じファイルへの追記を再開する。
//!
//! また、`RollingFileAppender`は、保存期間と残しておく最大ファイル数を持つ。
//! バックグラウンドのスレッドが、保存期間を経過したファイルと、最大ファイル数を超えた
//! ファイルを、最も古いファイルから削除する。書き込み中のファイルは削除しない。
//!
//! ```no_run
//! use std::{io::Write, time::Duration};
//!
//! use rolling_file_writer::{RollingFileAppender, WriterConfig};
//!
//! let config = WriterConfig::new("logs")
//!     .with_prefix("app")
//!     .with_extension(".log")
//!     .with_max_file_size(64 * 1024 * 1024)
//!     .with_retention(Duration::from_secs(3 * 24 * 60 * 60))
//!     .with_max_file_count(100);
//! let mut appender = RollingFileAppender::new(config)?;
//! writeln!(appender, "hello")?;
//! appender.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod appenders;
pub mod clock;
pub mod config;
pub mod diagnostics;
pub mod error;
mod file;
mod naming;
mod retention;

pub use appenders::{RollingFileAppender, RollingWriter};
pub use clock::{Clock, SystemClock};
pub use config::WriterConfig;
pub use diagnostics::Diagnostics;
pub use error::{Error, Result};
