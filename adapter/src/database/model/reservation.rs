use chrono::{DateTime, Utc};
use kernel::model::{
    id::{ReservationId, SpaceId, UserId},
    interval::TimeInterval,
    reservation::Reservation,
};
use shared::error::AppError;

// reservations テーブルのレコードを受ける型
#[derive(sqlx::FromRow)]
pub struct ReservationRow {
    pub reservation_id: ReservationId,
    pub space_id: SpaceId,
    pub user_id: UserId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub purpose: String,
    pub description: Option<String>,
    pub attendees: Option<i32>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = AppError;

    fn try_from(value: ReservationRow) -> Result<Self, Self::Error> {
        let ReservationRow {
            reservation_id,
            space_id,
            user_id,
            start_time,
            end_time,
            purpose,
            description,
            attendees,
            status,
            created_at,
        } = value;
        Ok(Reservation {
            reservation_id,
            reserved_by: user_id,
            space_id,
            // end > start は永続化時の不変条件。読み出し時にも検証する
            interval: TimeInterval::new(start_time, end_time)?,
            purpose: purpose.parse()?,
            description,
            attendees,
            status: status.parse()?,
            created_at,
        })
    }
}
