use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::error::AppResult;

use crate::model::{
    id::{ReservationId, SpaceId, UserId},
    reservation::{
        event::{CreateReservation, UpdateReservationInterval},
        status::ReservationStatus,
        Reservation,
    },
};

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    // 予約を作成する。スペースの存在・状態の確認と重複チェック、
    // INSERT までを不可分な一操作として実行する
    async fn create_if_vacant(&self, event: CreateReservation) -> AppResult<ReservationId>;
    // 予約時間帯を変更する。自身のレコードを除外した重複チェックと
    // UPDATE を不可分な一操作として実行する
    async fn update_interval_if_vacant(&self, event: UpdateReservationInterval) -> AppResult<()>;
    // 現在のステータスが expected のときに限り new に更新する
    async fn compare_and_set_status(
        &self,
        reservation_id: ReservationId,
        expected: ReservationStatus,
        new: ReservationStatus,
    ) -> AppResult<()>;
    // reservation_id から Reservation 型のデータを渡す
    async fn find_by_id(&self, reservation_id: ReservationId) -> AppResult<Option<Reservation>>;
    // スペースの時間帯を占有している予約（rejected / cancelled 以外）を取得する
    async fn find_blocking_by_space_id(
        &self,
        space_id: SpaceId,
        exclude: Option<ReservationId>,
    ) -> AppResult<Vec<Reservation>>;
    // スペース ID に紐づく予約一覧を取得する
    async fn find_by_space_id(&self, space_id: SpaceId) -> AppResult<Vec<Reservation>>;
    // ユーザー ID に紐づく予約一覧を取得する
    async fn find_by_user_id(&self, user_id: UserId) -> AppResult<Vec<Reservation>>;
    async fn find_all(&self) -> AppResult<Vec<Reservation>>;
    // approved のまま終了時刻を過ぎた予約を取得する
    async fn find_completable(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>>;
}
