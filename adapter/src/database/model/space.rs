use chrono::{DateTime, Utc};
use kernel::model::{
    id::SpaceId,
    space::{schedule::WeeklySchedule, Equipment, Location, Space},
};
use shared::error::AppError;
use sqlx::types::Json;

// spaces テーブルのレコードを受ける型。
// space_type / status は TEXT、equipment / availability は JSONB で持つ
#[derive(sqlx::FromRow)]
pub struct SpaceRow {
    pub space_id: SpaceId,
    pub space_name: String,
    pub description: String,
    pub capacity: i32,
    pub space_type: String,
    pub building: String,
    pub floor: i32,
    pub equipment: Json<Vec<Equipment>>,
    pub availability: Json<WeeklySchedule>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SpaceRow> for Space {
    type Error = AppError;

    fn try_from(value: SpaceRow) -> Result<Self, Self::Error> {
        let SpaceRow {
            space_id,
            space_name,
            description,
            capacity,
            space_type,
            building,
            floor,
            equipment,
            availability,
            status,
            created_at,
        } = value;
        Ok(Space {
            space_id,
            space_name,
            description,
            capacity,
            space_type: space_type.parse()?,
            location: Location { building, floor },
            equipment: equipment.0,
            availability: availability.0,
            status: status.parse()?,
            created_at,
        })
    }
}
