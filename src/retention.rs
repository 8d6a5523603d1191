//! 古いログファイルの削除
//!
//! ファイル名の昇順(古い順)に、次のいずれかに該当するファイルを削除する。
//! ただし、書き込み中のファイルは削除しない。
//!
//! - 最終更新日時から保存期間を経過したファイル
//! - 新しい方から数えて、最大ファイル数を超えたファイル

use std::{
    fs,
    path::Path,
    time::{Duration, SystemTime},
};

use crate::{diagnostics::Diagnostics, naming::FileEntry};

/// 削除の対象とするファイルと、削除の条件
#[derive(Debug, Clone)]
pub(crate) struct RetentionPolicy<'a> {
    pub(crate) prefix: &'a str,
    pub(crate) extension: &'a str,
    /// `Duration::ZERO`の場合は、期間による削除をしない
    pub(crate) retention: Duration,
    pub(crate) max_file_count: usize,
}

impl RetentionPolicy<'_> {
    fn applies_to(&self, name: &str) -> bool {
        (self.prefix.is_empty() || name.starts_with(self.prefix))
            && (self.extension.is_empty() || name.ends_with(self.extension))
    }

    fn is_expired(&self, entry: &FileEntry, now: SystemTime) -> bool {
        if self.retention.is_zero() {
            return false;
        }
        match entry.modified.and_then(|modified| modified.checked_add(self.retention)) {
            Some(expires_at) => expires_at < now,
            None => false,
        }
    }
}

/// 削除するファイルを決定する。
///
/// # 引数
///
/// * entries: ファイル名の昇順に並んだ、ディレクトリ内のファイル。
/// * active: 書き込み中のファイル名。
/// * policy: 削除の条件。
/// * now: 現在日時。
///
/// # 戻り値
///
/// 削除するファイル。
pub(crate) fn plan<'e>(
    entries: &'e [FileEntry],
    active: Option<&str>,
    policy: &RetentionPolicy<'_>,
    now: SystemTime,
) -> Vec<&'e FileEntry> {
    let candidates: Vec<&FileEntry> = entries
        .iter()
        .filter(|entry| policy.applies_to(&entry.name))
        .collect();
    let total = candidates.len();

    candidates
        .into_iter()
        .enumerate()
        .filter(|(_, entry)| Some(entry.name.as_str()) != active)
        .filter(|(index, entry)| {
            total - index > policy.max_file_count || policy.is_expired(entry, now)
        })
        .map(|(_, entry)| entry)
        .collect()
}

/// 古いファイルを削除する。
///
/// 削除できなかったファイルは、診断メッセージを出力して読み飛ばす。
///
/// # 戻り値
///
/// 削除したファイルの数。
pub(crate) fn sweep(
    directory: &Path,
    entries: &[FileEntry],
    active: Option<&str>,
    policy: &RetentionPolicy<'_>,
    now: SystemTime,
    diagnostics: &Diagnostics,
) -> usize {
    let mut removed = 0;
    for entry in plan(entries, active, policy, now) {
        match fs::remove_file(directory.join(&entry.name)) {
            Ok(()) => {
                removed += 1;
                diagnostics.debug(format_args!("retention clear file `{}`", entry.name));
            }
            Err(err) => {
                diagnostics.error(format_args!(
                    "retention clear file `{}` failed, {}",
                    entry.name, err
                ));
            }
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const HOUR: Duration = Duration::from_secs(60 * 60);

    fn entry(name: &str, age: Duration, now: SystemTime) -> FileEntry {
        FileEntry {
            name: name.to_string(),
            len: 0,
            modified: now.checked_sub(age),
        }
    }

    fn policy(retention: Duration, max_file_count: usize) -> RetentionPolicy<'static> {
        RetentionPolicy {
            prefix: "test",
            extension: ".log",
            retention,
            max_file_count,
        }
    }

    fn names<'a>(planned: &[&'a FileEntry]) -> Vec<&'a str> {
        planned.iter().map(|entry| entry.name.as_str()).collect()
    }

    #[test]
    fn test_plan_keeps_newest_files_within_count() {
        let now = SystemTime::now();
        let entries: Vec<FileEntry> = (0..5)
            .map(|seq| entry(&format!("test-20240101-{:04}.log", seq), HOUR, now))
            .collect();

        let planned = plan(
            &entries,
            Some("test-20240101-0004.log"),
            &policy(Duration::ZERO, 2),
            now,
        );

        assert_eq!(
            vec![
                "test-20240101-0000.log",
                "test-20240101-0001.log",
                "test-20240101-0002.log"
            ],
            names(&planned)
        );
    }

    #[test]
    fn test_plan_removes_expired_files() {
        let now = SystemTime::now();
        let entries = vec![
            entry("test-20240101-0000.log", 3 * HOUR, now),
            entry("test-20240101-0001.log", 2 * HOUR, now),
            entry("test-20240101-0002.log", HOUR / 2, now),
        ];

        let planned = plan(&entries, None, &policy(HOUR, 100), now);

        assert_eq!(
            vec!["test-20240101-0000.log", "test-20240101-0001.log"],
            names(&planned)
        );
    }

    #[test]
    fn test_plan_never_removes_active_file() {
        let now = SystemTime::now();
        let entries = vec![
            entry("test-20240101-0000.log", 3 * HOUR, now),
            entry("test-20240101-0001.log", 3 * HOUR, now),
        ];

        let planned = plan(
            &entries,
            Some("test-20240101-0000.log"),
            &policy(HOUR, 1),
            now,
        );

        assert_eq!(vec!["test-20240101-0001.log"], names(&planned));
    }

    #[test]
    fn test_plan_zero_retention_disables_age_check() {
        let now = SystemTime::now();
        let entries = vec![entry("test-20240101-0000.log", 1000 * HOUR, now)];

        assert!(plan(&entries, None, &policy(Duration::ZERO, 10), now).is_empty());
    }

    #[test]
    fn test_plan_ignores_other_files() {
        let now = SystemTime::now();
        let entries = vec![
            entry("other-20240101-0000.log", 3 * HOUR, now),
            entry("test-20240101-0000.txt", 3 * HOUR, now),
            entry("test-20240101-0001.log", 3 * HOUR, now),
        ];

        let planned = plan(&entries, None, &policy(HOUR, 10), now);

        assert_eq!(vec!["test-20240101-0001.log"], names(&planned));
    }

    #[test]
    fn test_sweep_removes_files_and_skips_failures() {
        let dir = TempDir::new().unwrap();
        let now = SystemTime::now();
        for name in ["test-0000.log", "test-0001.log", "test-0002.log"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let mut entries = vec![entry("test-0000-gone.log", HOUR, now)];
        entries.extend(
            ["test-0000.log", "test-0001.log", "test-0002.log"]
                .iter()
                .map(|name| entry(name, HOUR, now)),
        );

        let removed = sweep(
            dir.path(),
            &entries,
            Some("test-0002.log"),
            &policy(Duration::ZERO, 1),
            now,
            &Diagnostics::discard(),
        );

        assert_eq!(2, removed);
        assert!(!dir.path().join("test-0000.log").exists());
        assert!(!dir.path().join("test-0001.log").exists());
        assert!(dir.path().join("test-0002.log").exists());
    }
}
