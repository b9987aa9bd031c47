use async_trait::async_trait;
use chrono::Utc;
use derive_new::new;
use uuid::Uuid;

use kernel::model::{
    id::SpaceId,
    space::{
        event::{CreateSpace, DeleteSpace, UpdateSpace},
        Space,
    },
};
use kernel::repository::space::SpaceRepository;
use shared::error::{AppError, AppResult};
use sqlx::types::Json;

use crate::database::{
    map_store_error, model::space::SpaceRow, set_transaction_serializable, ConnectionPool,
};

#[derive(new)]
pub struct SpaceRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl SpaceRepository for SpaceRepositoryImpl {
    async fn create(&self, event: CreateSpace) -> AppResult<SpaceId> {
        let space_id = SpaceId::new();
        let res = sqlx::query(
            r#"
            INSERT INTO spaces
            (space_id, space_name, description, capacity, space_type,
             building, floor, equipment, availability, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(space_id.raw())
        .bind(&event.space_name)
        .bind(&event.description)
        .bind(event.capacity)
        .bind(event.space_type.to_string())
        .bind(&event.location.building)
        .bind(event.location.floor)
        .bind(Json(&event.equipment))
        .bind(Json(&event.availability))
        .bind(event.status.to_string())
        .bind(Utc::now())
        .execute(self.db.inner_ref())
        .await
        .map_err(map_store_error)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No space record has been created".into(),
            ));
        }

        Ok(space_id)
    }

    async fn find_all(&self) -> AppResult<Vec<Space>> {
        let rows: Vec<SpaceRow> = sqlx::query_as(
            r#"
            SELECT space_id, space_name, description, capacity, space_type,
                   building, floor, equipment, availability, status, created_at
            FROM spaces
            ORDER BY space_name ASC
            "#,
        )
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(map_store_error)?;

        rows.into_iter().map(Space::try_from).collect()
    }

    async fn find_by_id(&self, space_id: SpaceId) -> AppResult<Option<Space>> {
        let row: Option<SpaceRow> = sqlx::query_as(
            r#"
            SELECT space_id, space_name, description, capacity, space_type,
                   building, floor, equipment, availability, status, created_at
            FROM spaces
            WHERE space_id = $1
            "#,
        )
        .bind(space_id.raw())
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(map_store_error)?;

        row.map(Space::try_from).transpose()
    }

    // 指定のあった項目だけを更新する
    async fn update(&self, event: UpdateSpace) -> AppResult<()> {
        let res = sqlx::query(
            r#"
            UPDATE spaces SET
                space_name = COALESCE($2, space_name),
                description = COALESCE($3, description),
                capacity = COALESCE($4, capacity),
                space_type = COALESCE($5, space_type),
                building = COALESCE($6, building),
                floor = COALESCE($7, floor),
                equipment = COALESCE($8, equipment),
                availability = COALESCE($9, availability),
                status = COALESCE($10, status)
            WHERE space_id = $1
            "#,
        )
        .bind(event.space_id.raw())
        .bind(event.space_name)
        .bind(event.description)
        .bind(event.capacity)
        .bind(event.space_type.map(|t| t.to_string()))
        .bind(event.location.as_ref().map(|l| l.building.clone()))
        .bind(event.location.as_ref().map(|l| l.floor))
        .bind(event.equipment.as_ref().map(Json))
        .bind(event.availability.as_ref().map(Json))
        .bind(event.status.map(|s| s.to_string()))
        .execute(self.db.inner_ref())
        .await
        .map_err(map_store_error)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound(format!(
                "スペース（{}）が見つかりませんでした。",
                event.space_id
            )));
        }

        Ok(())
    }

    async fn delete(&self, event: DeleteSpace) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        // トランザクション分離レベルを SERIALIZABLE に設定する
        set_transaction_serializable(&mut tx).await?;

        // ① 時間帯を占有している予約が残っていないか確認。
        //    残っている場合は削除できない
        let blocking: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT reservation_id
            FROM reservations
            WHERE space_id = $1
              AND status NOT IN ('rejected', 'cancelled')
            LIMIT 1
            "#,
        )
        .bind(event.space_id.raw())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_store_error)?;

        if blocking.is_some() {
            return Err(AppError::UnprocessableEntity(format!(
                "スペース（{}）には占有中の予約が残っているため削除できません。",
                event.space_id
            )));
        }

        // ② スペースを削除する
        let res = sqlx::query("DELETE FROM spaces WHERE space_id = $1")
            .bind(event.space_id.raw())
            .execute(&mut *tx)
            .await
            .map_err(map_store_error)?;

        if res.rows_affected() < 1 {
            return Err(AppError::EntityNotFound(format!(
                "スペース（{}）が見つかりませんでした。",
                event.space_id
            )));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(())
    }
}
