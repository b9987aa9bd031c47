use super::Reservation;
use crate::model::{id::ReservationId, interval::TimeInterval};

// 候補区間と既存予約との重複判定。
// rejected / cancelled の予約は時間帯を占有しないため判定から除外する。
// 予約更新時は exclude に自身の ID を渡して除外する（そうしないと
// すべての更新が自分自身と衝突してしまう）
pub fn find_conflicts<'a>(
    candidate: &TimeInterval,
    existing: &'a [Reservation],
    exclude: Option<ReservationId>,
) -> Vec<&'a Reservation> {
    existing
        .iter()
        .filter(|r| Some(r.reservation_id) != exclude)
        .filter(|r| r.is_blocking())
        .filter(|r| r.interval.overlaps(candidate))
        .collect()
}

pub fn has_conflict(
    candidate: &TimeInterval,
    existing: &[Reservation],
    exclude: Option<ReservationId>,
) -> bool {
    !find_conflicts(candidate, existing, exclude).is_empty()
}
