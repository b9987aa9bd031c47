use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::error::{AppError, AppResult};

/// 予約時間帯を表す半開区間 `[start, end)`。
/// `end > start` を満たさない区間は構築できないため、
/// 不正な区間が永続化されることはない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Self> {
        if end <= start {
            return Err(AppError::InvalidIntervalError(format!(
                "終了時刻（{end}）は開始時刻（{start}）より後である必要があります。"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    // 重複判定は a1 < b2 && a2 > b1 のみ。
    // 端が接するだけの区間（a2 == b1）は重複とみなさない
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && self.end > other.start
    }
}
