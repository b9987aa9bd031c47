use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_new::new;
use uuid::Uuid;

use kernel::model::{
    id::{ReservationId, SpaceId, UserId},
    reservation::{
        event::{CreateReservation, UpdateReservationInterval},
        status::ReservationStatus,
        Reservation,
    },
    space::SpaceStatus,
};
use kernel::repository::reservation::ReservationRepository;
use shared::error::{AppError, AppResult};

use crate::database::{
    map_store_error, model::reservation::ReservationRow, set_transaction_serializable,
    ConnectionPool,
};

#[derive(new)]
pub struct ReservationRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl ReservationRepository for ReservationRepositoryImpl {
    // 予約操作を行う
    async fn create_if_vacant(&self, event: CreateReservation) -> AppResult<ReservationId> {
        let mut tx = self.db.begin().await?;

        // トランザクション分離レベルを SERIALIZABLE に設定する
        set_transaction_serializable(&mut tx).await?;

        // 事前のチェックとして、以下を調べる。
        // - 指定のスペース ID をもつスペースが存在するか
        // - スペースが予約を受け付ける状態（available）か
        // - 希望時間帯が、占有中の既存予約と重なっていないか
        //
        // 上記のすべてが Yes だった場合、このブロック以降の処理に進む
        {
            // ① スペースの存在確認 ＋ status チェック
            let space_row: Option<(String,)> =
                sqlx::query_as("SELECT status FROM spaces WHERE space_id = $1")
                    .bind(event.space_id.raw())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(map_store_error)?;

            let Some((status,)) = space_row else {
                return Err(AppError::EntityNotFound(format!(
                    "スペース（{}）が見つかりませんでした。",
                    event.space_id
                )));
            };

            if status.parse::<SpaceStatus>()? != SpaceStatus::Available {
                return Err(AppError::OutOfScheduleError(format!(
                    "スペース（{}）は現在予約を受け付けていません。",
                    event.space_id
                )));
            }

            // ② 希望予約時間帯が占有中の既存予約と重なっていないか確認
            //    重複条件：
            //        existing.start < new.end AND new.start < existing.end
            let overlap: Option<(Uuid,)> = sqlx::query_as(
                r#"
                SELECT reservation_id
                FROM reservations
                WHERE space_id = $1
                  AND status NOT IN ('rejected', 'cancelled')
                  AND start_time < $3
                  AND $2 < end_time
                LIMIT 1
                "#,
            )
            .bind(event.space_id.raw())
            .bind(event.interval.start())
            .bind(event.interval.end())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_store_error)?;

            if overlap.is_some() {
                return Err(AppError::ReservationConflictError(format!(
                    "スペース（{}）は指定時間帯にすでに予約が存在します。",
                    event.space_id
                )));
            }
        }

        // チェックを通過したので reservations テーブルにレコードを追加する。
        // 新規予約のステータスは必ず pending
        let reservation_id = ReservationId::new();
        let res = sqlx::query(
            r#"
            INSERT INTO reservations
            (reservation_id, space_id, user_id, start_time, end_time,
             purpose, description, attendees, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(reservation_id.raw())
        .bind(event.space_id.raw())
        .bind(event.reserved_by.raw())
        .bind(event.interval.start())
        .bind(event.interval.end())
        .bind(event.purpose.to_string())
        .bind(event.description)
        .bind(event.attendees)
        .bind(ReservationStatus::Pending.to_string())
        .bind(event.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_store_error)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No reservation record has been created".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(reservation_id)
    }

    // 予約時間帯の変更を行う
    async fn update_interval_if_vacant(&self, event: UpdateReservationInterval) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        // トランザクション分離レベルを SERIALIZABLE に設定する
        set_transaction_serializable(&mut tx).await?;

        {
            // ① 予約の存在確認
            let row: Option<(Uuid,)> =
                sqlx::query_as("SELECT space_id FROM reservations WHERE reservation_id = $1")
                    .bind(event.reservation_id.raw())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(map_store_error)?;

            let Some((space_id,)) = row else {
                return Err(AppError::EntityNotFound(format!(
                    "予約（{}）が見つかりませんでした。",
                    event.reservation_id
                )));
            };

            // ② 自身のレコードを除外したうえで、新しい時間帯が
            //    占有中の既存予約と重なっていないか確認
            let overlap: Option<(Uuid,)> = sqlx::query_as(
                r#"
                SELECT reservation_id
                FROM reservations
                WHERE space_id = $1
                  AND reservation_id <> $2
                  AND status NOT IN ('rejected', 'cancelled')
                  AND start_time < $4
                  AND $3 < end_time
                LIMIT 1
                "#,
            )
            .bind(space_id)
            .bind(event.reservation_id.raw())
            .bind(event.new_interval.start())
            .bind(event.new_interval.end())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_store_error)?;

            if overlap.is_some() {
                return Err(AppError::ReservationConflictError(
                    "指定の時間帯にはすでに別の予約が存在します。".into(),
                ));
            }
        }

        let res = sqlx::query(
            "UPDATE reservations SET start_time = $1, end_time = $2 WHERE reservation_id = $3",
        )
        .bind(event.new_interval.start())
        .bind(event.new_interval.end())
        .bind(event.reservation_id.raw())
        .execute(&mut *tx)
        .await
        .map_err(map_store_error)?;

        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No reservation record has been updated".into(),
            ));
        }

        tx.commit().await.map_err(AppError::TransactionError)?;

        Ok(())
    }

    // ステータスを CAS で更新する。
    // 読み取り時のステータスから変わっていた場合は更新しない
    async fn compare_and_set_status(
        &self,
        reservation_id: ReservationId,
        expected: ReservationStatus,
        new: ReservationStatus,
    ) -> AppResult<()> {
        let res = sqlx::query(
            "UPDATE reservations SET status = $1 WHERE reservation_id = $2 AND status = $3",
        )
        .bind(new.to_string())
        .bind(reservation_id.raw())
        .bind(expected.to_string())
        .execute(self.db.inner_ref())
        .await
        .map_err(map_store_error)?;

        if res.rows_affected() < 1 {
            // レコードが無いのか、並行更新でステータスが変わったのかを切り分ける
            let row: Option<(String,)> =
                sqlx::query_as("SELECT status FROM reservations WHERE reservation_id = $1")
                    .bind(reservation_id.raw())
                    .fetch_optional(self.db.inner_ref())
                    .await
                    .map_err(map_store_error)?;
            return match row {
                None => Err(AppError::EntityNotFound(format!(
                    "予約（{reservation_id}）が見つかりませんでした。"
                ))),
                Some((current,)) => Err(AppError::ConcurrentUpdateError(format!(
                    "予約（{reservation_id}）のステータスは {current} に変更されています。"
                ))),
            };
        }

        Ok(())
    }

    async fn find_by_id(&self, reservation_id: ReservationId) -> AppResult<Option<Reservation>> {
        let row: Option<ReservationRow> = sqlx::query_as(
            r#"
            SELECT reservation_id, space_id, user_id, start_time, end_time,
                   purpose, description, attendees, status, created_at
            FROM reservations
            WHERE reservation_id = $1
            "#,
        )
        .bind(reservation_id.raw())
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(map_store_error)?;

        row.map(Reservation::try_from).transpose()
    }

    async fn find_blocking_by_space_id(
        &self,
        space_id: SpaceId,
        exclude: Option<ReservationId>,
    ) -> AppResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(
            r#"
            SELECT reservation_id, space_id, user_id, start_time, end_time,
                   purpose, description, attendees, status, created_at
            FROM reservations
            WHERE space_id = $1
              AND status NOT IN ('rejected', 'cancelled')
              AND ($2::uuid IS NULL OR reservation_id <> $2)
            ORDER BY start_time ASC
            "#,
        )
        .bind(space_id.raw())
        .bind(exclude.map(|id| id.raw()))
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(map_store_error)?;

        rows.into_iter().map(Reservation::try_from).collect()
    }

    async fn find_by_space_id(&self, space_id: SpaceId) -> AppResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(
            r#"
            SELECT reservation_id, space_id, user_id, start_time, end_time,
                   purpose, description, attendees, status, created_at
            FROM reservations
            WHERE space_id = $1
            ORDER BY start_time ASC
            "#,
        )
        .bind(space_id.raw())
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(map_store_error)?;

        rows.into_iter().map(Reservation::try_from).collect()
    }

    async fn find_by_user_id(&self, user_id: UserId) -> AppResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(
            r#"
            SELECT reservation_id, space_id, user_id, start_time, end_time,
                   purpose, description, attendees, status, created_at
            FROM reservations
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id.raw())
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(map_store_error)?;

        rows.into_iter().map(Reservation::try_from).collect()
    }

    async fn find_all(&self) -> AppResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(
            r#"
            SELECT reservation_id, space_id, user_id, start_time, end_time,
                   purpose, description, attendees, status, created_at
            FROM reservations
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(map_store_error)?;

        rows.into_iter().map(Reservation::try_from).collect()
    }

    async fn find_completable(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(
            r#"
            SELECT reservation_id, space_id, user_id, start_time, end_time,
                   purpose, description, attendees, status, created_at
            FROM reservations
            WHERE status = 'approved'
              AND end_time <= $1
            ORDER BY end_time ASC
            "#,
        )
        .bind(now)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(map_store_error)?;

        rows.into_iter().map(Reservation::try_from).collect()
    }
}
