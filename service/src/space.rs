use derive_new::new;
use garde::Validate;

use kernel::model::{
    id::SpaceId,
    space::{event::DeleteSpace, Space},
    user::User,
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::model::space::{CreateSpaceRequest, UpdateSpaceRequest};

#[derive(Clone, new)]
pub struct SpaceService {
    registry: AppRegistry,
}

impl SpaceService {
    // スペースの作成・変更・削除は管理者のみが行える
    pub async fn create(&self, actor: &User, req: CreateSpaceRequest) -> AppResult<SpaceId> {
        if !actor.is_admin() {
            return Err(AppError::ForbiddenOperation);
        }
        req.validate(&())?;

        self.registry.space_repository().create(req.into()).await
    }

    pub async fn update(
        &self,
        actor: &User,
        space_id: SpaceId,
        req: UpdateSpaceRequest,
    ) -> AppResult<()> {
        if !actor.is_admin() {
            return Err(AppError::ForbiddenOperation);
        }
        req.validate(&())?;

        let event = req.into_event(space_id, actor.user_id);
        self.registry.space_repository().update(event).await
    }

    pub async fn delete(&self, actor: &User, space_id: SpaceId) -> AppResult<()> {
        if !actor.is_admin() {
            return Err(AppError::ForbiddenOperation);
        }

        let event = DeleteSpace {
            space_id,
            requested_user: actor.user_id,
        };
        self.registry.space_repository().delete(event).await
    }

    pub async fn find_all(&self) -> AppResult<Vec<Space>> {
        self.registry.space_repository().find_all().await
    }

    pub async fn find_by_id(&self, space_id: SpaceId) -> AppResult<Space> {
        self.registry
            .space_repository()
            .find_by_id(space_id)
            .await?
            .ok_or_else(|| {
                AppError::EntityNotFound(format!("スペース（{space_id}）が見つかりませんでした。"))
            })
    }
}
