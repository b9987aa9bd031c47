use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::id::SpaceId;
use shared::error::AppError;

pub mod event;
pub mod schedule;

use schedule::WeeklySchedule;

#[derive(Debug, Clone, Serialize)]
pub struct Space {
    pub space_id: SpaceId,
    pub space_name: String,
    pub description: String,
    pub capacity: i32,
    pub space_type: SpaceType,
    pub location: Location,
    pub equipment: Vec<Equipment>,
    pub availability: WeeklySchedule,
    pub status: SpaceStatus,
    pub created_at: DateTime<Utc>,
}

impl Space {
    // 予約を受け付けるのは status が available のスペースのみ
    pub fn is_available(&self) -> bool {
        self.status == SpaceStatus::Available
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub building: String,
    pub floor: i32,
}

// 備品は説明的な情報であり、予約の制約には使わない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub description: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceType {
    Classroom,
    Laboratory,
    ComputerLab,
    Auditorium,
    MeetingZone,
    Other,
}

impl std::fmt::Display for SpaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SpaceType::Classroom => "classroom",
            SpaceType::Laboratory => "laboratory",
            SpaceType::ComputerLab => "computer_lab",
            SpaceType::Auditorium => "auditorium",
            SpaceType::MeetingZone => "meeting_zone",
            SpaceType::Other => "other",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SpaceType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classroom" => Ok(SpaceType::Classroom),
            "laboratory" => Ok(SpaceType::Laboratory),
            "computer_lab" => Ok(SpaceType::ComputerLab),
            "auditorium" => Ok(SpaceType::Auditorium),
            "meeting_zone" => Ok(SpaceType::MeetingZone),
            "other" => Ok(SpaceType::Other),
            _ => Err(AppError::ConversionEntityError(format!(
                "不明なスペース種別です: {s}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceStatus {
    #[default]
    Available,
    Maintenance,
    Unavailable,
}

impl std::fmt::Display for SpaceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SpaceStatus::Available => "available",
            SpaceStatus::Maintenance => "maintenance",
            SpaceStatus::Unavailable => "unavailable",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SpaceStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(SpaceStatus::Available),
            "maintenance" => Ok(SpaceStatus::Maintenance),
            "unavailable" => Ok(SpaceStatus::Unavailable),
            _ => Err(AppError::ConversionEntityError(format!(
                "不明なスペース状態です: {s}"
            ))),
        }
    }
}
