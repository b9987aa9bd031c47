use chrono::{DateTime, Utc};
use derive_new::new;

use crate::model::{
    id::{ReservationId, SpaceId, UserId},
    interval::TimeInterval,
};

use super::ReservationPurpose;

#[derive(Debug, new)]
pub struct CreateReservation {
    pub space_id: SpaceId,
    pub reserved_by: UserId,
    pub interval: TimeInterval,
    pub purpose: ReservationPurpose,
    pub description: Option<String>,
    pub attendees: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, new)]
pub struct UpdateReservationInterval {
    pub reservation_id: ReservationId,
    pub requested_by: UserId,
    pub new_interval: TimeInterval,
}
