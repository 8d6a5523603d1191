use time::OffsetDateTime;

/// ファイル名の日付と保存期間の判定に使用する時計
pub trait Clock: Send + Sync + 'static {
    /// 現在のUTC日時を返却する。
    fn now_utc(&self) -> OffsetDateTime;
}

/// システム時計
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
