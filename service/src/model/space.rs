use garde::Validate;
use kernel::model::{
    reservation::Reservation,
    space::{
        event::{CreateSpace, UpdateSpace},
        schedule::WeeklySchedule,
        Equipment, Location, SpaceStatus, SpaceType,
    },
};
use kernel::model::id::{SpaceId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSpaceRequest {
    #[garde(length(min = 1))]
    pub space_name: String,
    #[garde(length(min = 1))]
    pub description: String,
    #[garde(range(min = 1))]
    pub capacity: i32,
    #[garde(skip)]
    pub space_type: SpaceType,
    #[garde(skip)]
    pub location: Location,
    #[garde(skip)]
    #[serde(default)]
    pub equipment: Vec<Equipment>,
    #[garde(skip)]
    #[serde(default)]
    pub availability: WeeklySchedule,
    #[garde(skip)]
    #[serde(default)]
    pub status: SpaceStatus,
}

impl From<CreateSpaceRequest> for CreateSpace {
    fn from(value: CreateSpaceRequest) -> Self {
        let CreateSpaceRequest {
            space_name,
            description,
            capacity,
            space_type,
            location,
            equipment,
            availability,
            status,
        } = value;
        CreateSpace {
            space_name,
            description,
            capacity,
            space_type,
            location,
            equipment,
            availability,
            status,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSpaceRequest {
    #[garde(inner(length(min = 1)))]
    pub space_name: Option<String>,
    #[garde(inner(length(min = 1)))]
    pub description: Option<String>,
    #[garde(inner(range(min = 1)))]
    pub capacity: Option<i32>,
    #[garde(skip)]
    pub space_type: Option<SpaceType>,
    #[garde(skip)]
    pub location: Option<Location>,
    #[garde(skip)]
    pub equipment: Option<Vec<Equipment>>,
    #[garde(skip)]
    pub availability: Option<WeeklySchedule>,
    #[garde(skip)]
    pub status: Option<SpaceStatus>,
}

impl UpdateSpaceRequest {
    pub fn into_event(self, space_id: SpaceId, requested_user: UserId) -> UpdateSpace {
        let UpdateSpaceRequest {
            space_name,
            description,
            capacity,
            space_type,
            location,
            equipment,
            availability,
            status,
        } = self;
        UpdateSpace {
            space_id,
            space_name,
            description,
            capacity,
            space_type,
            location,
            equipment,
            availability,
            status,
            requested_user,
        }
    }
}

// 空き照会の結果
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceAvailability {
    pub available: bool,
    pub conflicting_reservations: Vec<Reservation>,
}
