use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    id::{ReservationId, SpaceId, UserId},
    interval::TimeInterval,
};
use shared::error::AppError;

pub mod conflict;
pub mod event;
pub mod status;

use status::ReservationStatus;

#[derive(Debug, Clone, Serialize)]
pub struct Reservation {
    pub reservation_id: ReservationId,
    // 予約者とスペースへの参照は作成後に変更されない
    pub reserved_by: UserId,
    pub space_id: SpaceId,
    pub interval: TimeInterval,
    pub purpose: ReservationPurpose,
    pub description: Option<String>,
    pub attendees: Option<i32>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    // rejected / cancelled 以外の予約はスペースの時間帯を占有する
    pub fn is_blocking(&self) -> bool {
        self.status.is_blocking()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationPurpose {
    Class,
    Meeting,
    Event,
    Study,
    Other,
}

impl std::fmt::Display for ReservationPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReservationPurpose::Class => "class",
            ReservationPurpose::Meeting => "meeting",
            ReservationPurpose::Event => "event",
            ReservationPurpose::Study => "study",
            ReservationPurpose::Other => "other",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ReservationPurpose {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "class" => Ok(ReservationPurpose::Class),
            "meeting" => Ok(ReservationPurpose::Meeting),
            "event" => Ok(ReservationPurpose::Event),
            "study" => Ok(ReservationPurpose::Study),
            "other" => Ok(ReservationPurpose::Other),
            _ => Err(AppError::ConversionEntityError(format!(
                "不明な予約目的です: {s}"
            ))),
        }
    }
}
