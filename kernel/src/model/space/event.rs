use super::{schedule::WeeklySchedule, Equipment, Location, SpaceStatus, SpaceType};
use crate::model::id::{SpaceId, UserId};

pub struct CreateSpace {
    pub space_name: String,
    pub description: String,
    pub capacity: i32,
    pub space_type: SpaceType,
    pub location: Location,
    pub equipment: Vec<Equipment>,
    pub availability: WeeklySchedule,
    pub status: SpaceStatus,
}

#[derive(Debug)]
pub struct UpdateSpace {
    pub space_id: SpaceId,
    pub space_name: Option<String>,
    pub description: Option<String>,
    pub capacity: Option<i32>,
    pub space_type: Option<SpaceType>,
    pub location: Option<Location>,
    pub equipment: Option<Vec<Equipment>>,
    pub availability: Option<WeeklySchedule>,
    pub status: Option<SpaceStatus>,
    pub requested_user: UserId,
}

#[derive(Debug)]
pub struct DeleteSpace {
    pub space_id: SpaceId,
    pub requested_user: UserId,
}
