use chrono::{DateTime, Utc};
use garde::Validate;
use kernel::model::{id::SpaceId, reservation::ReservationPurpose};
use serde::Deserialize;

// 予約作成コマンド。
// 時間帯そのものの妥当性（end > start）は TimeInterval の構築時に
// 検証するため、ここでは項目単位の検証のみを行う
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    #[garde(skip)]
    pub space_id: SpaceId,
    #[garde(skip)]
    pub start_time: DateTime<Utc>,
    #[garde(skip)]
    pub end_time: DateTime<Utc>,
    #[garde(skip)]
    pub purpose: ReservationPurpose,
    #[garde(inner(length(max = 500)))]
    pub description: Option<String>,
    #[garde(inner(range(min = 1)))]
    pub attendees: Option<i32>,
}

// 予約時間帯の変更用の型
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReservationRequest {
    #[garde(skip)]
    pub start_time: DateTime<Utc>,
    #[garde(skip)]
    pub end_time: DateTime<Utc>,
}
