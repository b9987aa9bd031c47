use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_new::new;

use kernel::model::{
    id::{ReservationId, SpaceId, UserId},
    reservation::{
        conflict,
        event::{CreateReservation, UpdateReservationInterval},
        status::ReservationStatus,
        Reservation,
    },
    space::{
        event::{CreateSpace, DeleteSpace, UpdateSpace},
        Space,
    },
};
use kernel::repository::{reservation::ReservationRepository, space::SpaceRepository};
use shared::error::{AppError, AppResult};

// テスト・ローカル開発用のインメモリストア。
// すべてのミューテーションを単一のロックで直列化することで、
// チェックと書き込みを不可分な一操作にしている。
// スペース単位の直列化はこれに包含される
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    spaces: HashMap<SpaceId, Space>,
    reservations: HashMap<ReservationId, Reservation>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl MemoryState {
    fn reservations_for_space(&self, space_id: SpaceId) -> Vec<Reservation> {
        self.reservations
            .values()
            .filter(|r| r.space_id == space_id)
            .cloned()
            .collect()
    }
}

#[derive(new)]
pub struct InMemorySpaceRepository {
    store: Arc<MemoryStore>,
}

#[async_trait]
impl SpaceRepository for InMemorySpaceRepository {
    async fn create(&self, event: CreateSpace) -> AppResult<SpaceId> {
        let mut state = self.store.write();

        // スペース名は一意
        if state
            .spaces
            .values()
            .any(|s| s.space_name == event.space_name)
        {
            return Err(AppError::UnprocessableEntity(format!(
                "スペース名（{}）はすでに使われています。",
                event.space_name
            )));
        }

        let space_id = SpaceId::new();
        let space = Space {
            space_id,
            space_name: event.space_name,
            description: event.description,
            capacity: event.capacity,
            space_type: event.space_type,
            location: event.location,
            equipment: event.equipment,
            availability: event.availability,
            status: event.status,
            created_at: Utc::now(),
        };
        state.spaces.insert(space_id, space);

        Ok(space_id)
    }

    async fn find_all(&self) -> AppResult<Vec<Space>> {
        let state = self.store.read();
        let mut spaces: Vec<Space> = state.spaces.values().cloned().collect();
        spaces.sort_by(|a, b| a.space_name.cmp(&b.space_name));
        Ok(spaces)
    }

    async fn find_by_id(&self, space_id: SpaceId) -> AppResult<Option<Space>> {
        Ok(self.store.read().spaces.get(&space_id).cloned())
    }

    async fn update(&self, event: UpdateSpace) -> AppResult<()> {
        let mut state = self.store.write();
        let Some(space) = state.spaces.get_mut(&event.space_id) else {
            return Err(AppError::EntityNotFound(format!(
                "スペース（{}）が見つかりませんでした。",
                event.space_id
            )));
        };

        if let Some(space_name) = event.space_name {
            space.space_name = space_name;
        }
        if let Some(description) = event.description {
            space.description = description;
        }
        if let Some(capacity) = event.capacity {
            space.capacity = capacity;
        }
        if let Some(space_type) = event.space_type {
            space.space_type = space_type;
        }
        if let Some(location) = event.location {
            space.location = location;
        }
        if let Some(equipment) = event.equipment {
            space.equipment = equipment;
        }
        if let Some(availability) = event.availability {
            space.availability = availability;
        }
        if let Some(status) = event.status {
            space.status = status;
        }

        Ok(())
    }

    async fn delete(&self, event: DeleteSpace) -> AppResult<()> {
        let mut state = self.store.write();

        // 占有中の予約が残っているスペースは削除できない
        let has_blocking = state
            .reservations
            .values()
            .any(|r| r.space_id == event.space_id && r.is_blocking());
        if has_blocking {
            return Err(AppError::UnprocessableEntity(format!(
                "スペース（{}）には占有中の予約が残っているため削除できません。",
                event.space_id
            )));
        }

        if state.spaces.remove(&event.space_id).is_none() {
            return Err(AppError::EntityNotFound(format!(
                "スペース（{}）が見つかりませんでした。",
                event.space_id
            )));
        }

        Ok(())
    }
}

#[derive(new)]
pub struct InMemoryReservationRepository {
    store: Arc<MemoryStore>,
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn create_if_vacant(&self, event: CreateReservation) -> AppResult<ReservationId> {
        // 書き込みロックを取ったまま存在確認・状態確認・重複チェック・挿入まで
        // 行うことで、並行する予約リクエストと順序づける
        let mut state = self.store.write();

        let Some(space) = state.spaces.get(&event.space_id) else {
            return Err(AppError::EntityNotFound(format!(
                "スペース（{}）が見つかりませんでした。",
                event.space_id
            )));
        };

        if !space.is_available() {
            return Err(AppError::OutOfScheduleError(format!(
                "スペース（{}）は現在予約を受け付けていません。",
                event.space_id
            )));
        }

        let existing = state.reservations_for_space(event.space_id);
        if conflict::has_conflict(&event.interval, &existing, None) {
            return Err(AppError::ReservationConflictError(format!(
                "スペース（{}）は指定時間帯にすでに予約が存在します。",
                event.space_id
            )));
        }

        let reservation_id = ReservationId::new();
        let reservation = Reservation {
            reservation_id,
            reserved_by: event.reserved_by,
            space_id: event.space_id,
            interval: event.interval,
            purpose: event.purpose,
            description: event.description,
            attendees: event.attendees,
            status: ReservationStatus::Pending,
            created_at: event.created_at,
        };
        state.reservations.insert(reservation_id, reservation);

        Ok(reservation_id)
    }

    async fn update_interval_if_vacant(&self, event: UpdateReservationInterval) -> AppResult<()> {
        let mut state = self.store.write();

        let Some(space_id) = state
            .reservations
            .get(&event.reservation_id)
            .map(|r| r.space_id)
        else {
            return Err(AppError::EntityNotFound(format!(
                "予約（{}）が見つかりませんでした。",
                event.reservation_id
            )));
        };
        let existing = state.reservations_for_space(space_id);
        if conflict::has_conflict(&event.new_interval, &existing, Some(event.reservation_id)) {
            return Err(AppError::ReservationConflictError(
                "指定の時間帯にはすでに別の予約が存在します。".into(),
            ));
        }

        if let Some(reservation) = state.reservations.get_mut(&event.reservation_id) {
            reservation.interval = event.new_interval;
        }

        Ok(())
    }

    async fn compare_and_set_status(
        &self,
        reservation_id: ReservationId,
        expected: ReservationStatus,
        new: ReservationStatus,
    ) -> AppResult<()> {
        let mut state = self.store.write();
        let Some(reservation) = state.reservations.get_mut(&reservation_id) else {
            return Err(AppError::EntityNotFound(format!(
                "予約（{reservation_id}）が見つかりませんでした。"
            )));
        };

        if reservation.status != expected {
            return Err(AppError::ConcurrentUpdateError(format!(
                "予約（{reservation_id}）のステータスは {} に変更されています。",
                reservation.status
            )));
        }

        reservation.status = new;
        Ok(())
    }

    async fn find_by_id(&self, reservation_id: ReservationId) -> AppResult<Option<Reservation>> {
        Ok(self.store.read().reservations.get(&reservation_id).cloned())
    }

    async fn find_blocking_by_space_id(
        &self,
        space_id: SpaceId,
        exclude: Option<ReservationId>,
    ) -> AppResult<Vec<Reservation>> {
        let state = self.store.read();
        let mut reservations: Vec<Reservation> = state
            .reservations
            .values()
            .filter(|r| r.space_id == space_id && r.is_blocking())
            .filter(|r| Some(r.reservation_id) != exclude)
            .cloned()
            .collect();
        reservations.sort_by_key(|r| r.interval.start());
        Ok(reservations)
    }

    async fn find_by_space_id(&self, space_id: SpaceId) -> AppResult<Vec<Reservation>> {
        let state = self.store.read();
        let mut reservations: Vec<Reservation> = state
            .reservations
            .values()
            .filter(|r| r.space_id == space_id)
            .cloned()
            .collect();
        reservations.sort_by_key(|r| r.interval.start());
        Ok(reservations)
    }

    async fn find_by_user_id(&self, user_id: UserId) -> AppResult<Vec<Reservation>> {
        let state = self.store.read();
        let mut reservations: Vec<Reservation> = state
            .reservations
            .values()
            .filter(|r| r.reserved_by == user_id)
            .cloned()
            .collect();
        reservations.sort_by_key(|r| r.created_at);
        Ok(reservations)
    }

    async fn find_all(&self) -> AppResult<Vec<Reservation>> {
        let state = self.store.read();
        let mut reservations: Vec<Reservation> = state.reservations.values().cloned().collect();
        reservations.sort_by_key(|r| r.created_at);
        Ok(reservations)
    }

    async fn find_completable(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        let state = self.store.read();
        let mut reservations: Vec<Reservation> = state
            .reservations
            .values()
            .filter(|r| r.status == ReservationStatus::Approved && r.interval.end() <= now)
            .cloned()
            .collect();
        reservations.sort_by_key(|r| r.interval.end());
        Ok(reservations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use kernel::model::{
        interval::TimeInterval,
        reservation::ReservationPurpose,
        space::{schedule::WeeklySchedule, Location, SpaceStatus, SpaceType},
    };

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, hour, min, 0).unwrap()
    }

    fn create_space_event(name: &str) -> CreateSpace {
        CreateSpace {
            space_name: name.into(),
            description: "Test Description".into(),
            capacity: 10,
            space_type: SpaceType::Classroom,
            location: Location {
                building: "B1".into(),
                floor: 2,
            },
            equipment: vec![],
            availability: WeeklySchedule::default(),
            status: SpaceStatus::Available,
        }
    }

    fn create_reservation_event(space_id: SpaceId, start: (u32, u32), end: (u32, u32)) -> CreateReservation {
        CreateReservation::new(
            space_id,
            UserId::new(),
            TimeInterval::new(at(start.0, start.1), at(end.0, end.1)).unwrap(),
            ReservationPurpose::Study,
            None,
            None,
            Utc::now(),
        )
    }

    async fn setup() -> (Arc<MemoryStore>, SpaceId) {
        let store = MemoryStore::new();
        let spaces = InMemorySpaceRepository::new(store.clone());
        let space_id = spaces.create(create_space_event("Test Space")).await.unwrap();
        (store, space_id)
    }

    #[tokio::test]
    async fn create_rejects_overlapping_reservation() {
        let (store, space_id) = setup().await;
        let repo = InMemoryReservationRepository::new(store);

        repo.create_if_vacant(create_reservation_event(space_id, (10, 0), (11, 0)))
            .await
            .unwrap();
        let res = repo
            .create_if_vacant(create_reservation_event(space_id, (10, 30), (10, 45)))
            .await;
        assert!(matches!(res, Err(AppError::ReservationConflictError(_))));
    }

    #[tokio::test]
    async fn concurrent_overlapping_creates_allow_at_most_one_winner() {
        let (store, space_id) = setup().await;
        let repo = Arc::new(InMemoryReservationRepository::new(store));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.create_if_vacant(create_reservation_event(space_id, (10, 0), (11, 0)))
                    .await
            }));
        }

        let mut winners = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(AppError::ReservationConflictError(_)) => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(conflicts, 7);
    }

    #[tokio::test]
    async fn compare_and_set_detects_concurrent_change() {
        let (store, space_id) = setup().await;
        let repo = InMemoryReservationRepository::new(store);

        let id = repo
            .create_if_vacant(create_reservation_event(space_id, (10, 0), (11, 0)))
            .await
            .unwrap();

        repo.compare_and_set_status(id, ReservationStatus::Pending, ReservationStatus::Approved)
            .await
            .unwrap();

        // 読み取りが古くなった CAS は失敗し、状態は変わらない
        let res = repo
            .compare_and_set_status(id, ReservationStatus::Pending, ReservationStatus::Rejected)
            .await;
        assert!(matches!(res, Err(AppError::ConcurrentUpdateError(_))));

        let stored = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReservationStatus::Approved);
    }

    #[tokio::test]
    async fn cancelled_reservation_frees_the_slot() {
        let (store, space_id) = setup().await;
        let repo = InMemoryReservationRepository::new(store);

        let id = repo
            .create_if_vacant(create_reservation_event(space_id, (10, 0), (11, 0)))
            .await
            .unwrap();
        repo.compare_and_set_status(id, ReservationStatus::Pending, ReservationStatus::Cancelled)
            .await
            .unwrap();

        repo.create_if_vacant(create_reservation_event(space_id, (10, 0), (11, 0)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_interval_excludes_own_record() {
        let (store, space_id) = setup().await;
        let repo = InMemoryReservationRepository::new(store);

        let id = repo
            .create_if_vacant(create_reservation_event(space_id, (10, 0), (11, 0)))
            .await
            .unwrap();

        // 自身の時間帯を広げる更新は自分自身とは衝突しない
        let event = UpdateReservationInterval::new(
            id,
            UserId::new(),
            TimeInterval::new(at(10, 0), at(11, 30)).unwrap(),
        );
        repo.update_interval_if_vacant(event).await.unwrap();

        let stored = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.interval.end(), at(11, 30));
    }

    #[tokio::test]
    async fn space_with_blocking_reservation_cannot_be_deleted() {
        let (store, space_id) = setup().await;
        let spaces = InMemorySpaceRepository::new(store.clone());
        let reservations = InMemoryReservationRepository::new(store);

        let id = reservations
            .create_if_vacant(create_reservation_event(space_id, (10, 0), (11, 0)))
            .await
            .unwrap();

        let res = spaces
            .delete(DeleteSpace {
                space_id,
                requested_user: UserId::new(),
            })
            .await;
        assert!(matches!(res, Err(AppError::UnprocessableEntity(_))));

        // 予約をキャンセルすれば削除できる
        reservations
            .compare_and_set_status(id, ReservationStatus::Pending, ReservationStatus::Cancelled)
            .await
            .unwrap();
        spaces
            .delete(DeleteSpace {
                space_id,
                requested_user: UserId::new(),
            })
            .await
            .unwrap();
    }
}
