use chrono::{DateTime, Utc};
use derive_new::new;
use garde::Validate;

use kernel::model::{
    id::{ReservationId, SpaceId, UserId},
    interval::TimeInterval,
    reservation::{
        conflict,
        event::{CreateReservation, UpdateReservationInterval},
        status::ReservationStatus,
        Reservation,
    },
    space::Space,
    user::User,
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::model::{
    reservation::{CreateReservationRequest, UpdateReservationRequest},
    space::SpaceAvailability,
};

#[derive(Clone, new)]
pub struct ReservationService {
    registry: AppRegistry,
}

impl ReservationService {
    // 予約を作成する。
    // スペースの存在・状態・利用可能時間帯を確認したうえで、
    // 重複チェックと INSERT はストア側で不可分に実行される
    pub async fn create(
        &self,
        actor: &User,
        req: CreateReservationRequest,
    ) -> AppResult<ReservationId> {
        req.validate(&())?;

        let interval = TimeInterval::new(req.start_time, req.end_time)?;

        // ① スペースの存在確認
        let space = self.load_space(req.space_id).await?;

        // ② スペースの状態と利用可能時間帯の確認
        self.ensure_bookable(&space, &interval)?;

        // ③ 重複チェック付きで永続化する。新規予約は pending で作られる
        let event = CreateReservation::new(
            req.space_id,
            actor.user_id,
            interval,
            req.purpose,
            req.description,
            req.attendees,
            Utc::now(),
        );
        self.registry
            .reservation_repository()
            .create_if_vacant(event)
            .await
    }

    // 予約時間帯を変更する。
    // 所有者または管理者のみが変更でき、pending / approved の間だけ許可される
    pub async fn update_interval(
        &self,
        actor: &User,
        reservation_id: ReservationId,
        req: UpdateReservationRequest,
    ) -> AppResult<()> {
        req.validate(&())?;
        let new_interval = TimeInterval::new(req.start_time, req.end_time)?;

        let reservation = self.load_reservation(reservation_id).await?;

        // ① 所有者か管理者かの確認
        if reservation.reserved_by != actor.user_id && !actor.is_admin() {
            return Err(AppError::ForbiddenOperation);
        }

        // ② 終了状態に達した予約は変更できない
        if !matches!(
            reservation.status,
            ReservationStatus::Pending | ReservationStatus::Approved
        ) {
            return Err(AppError::InvalidTransitionError(format!(
                "ステータスが {} の予約の時間帯は変更できません。",
                reservation.status
            )));
        }

        // ③ 新しい時間帯についてスペースの状態と利用可能時間帯を再確認
        let space = self.load_space(reservation.space_id).await?;
        self.ensure_bookable(&space, &new_interval)?;

        // ④ 自身のレコードを除外した重複チェック付きで時間帯を差し替える
        let event = UpdateReservationInterval::new(reservation_id, actor.user_id, new_interval);
        self.registry
            .reservation_repository()
            .update_interval_if_vacant(event)
            .await
    }

    // 予約ステータスを変更する。
    // ロールの確認を先に行い、そのうえで遷移の妥当性を検証する
    pub async fn set_status(
        &self,
        actor: &User,
        reservation_id: ReservationId,
        new_status: ReservationStatus,
    ) -> AppResult<()> {
        let reservation = self.load_reservation(reservation_id).await?;

        // ① ロール確認。管理者は任意の遷移を、
        //    所有者は自身の予約のキャンセルのみを要求できる
        let is_owner = reservation.reserved_by == actor.user_id;
        if !actor.is_admin() && !(is_owner && new_status == ReservationStatus::Cancelled) {
            return Err(AppError::ForbiddenOperation);
        }

        // ② 遷移の妥当性確認
        reservation.status.validate_transition(new_status)?;

        // ③ 読み取ったステータスから変わっていない場合に限り更新する
        self.registry
            .reservation_repository()
            .compare_and_set_status(reservation_id, reservation.status, new_status)
            .await
    }

    // 空き照会。読み取りのみで何も変更しない
    pub async fn check_availability(
        &self,
        space_id: SpaceId,
        interval: &TimeInterval,
    ) -> AppResult<SpaceAvailability> {
        let space = self.load_space(space_id).await?;

        let existing = self
            .registry
            .reservation_repository()
            .find_blocking_by_space_id(space_id, None)
            .await?;
        let conflicting: Vec<Reservation> = conflict::find_conflicts(interval, &existing, None)
            .into_iter()
            .cloned()
            .collect();

        let available = conflicting.is_empty() && self.ensure_bookable(&space, interval).is_ok();

        Ok(SpaceAvailability {
            available,
            conflicting_reservations: conflicting,
        })
    }

    pub async fn find_by_id(
        &self,
        actor: &User,
        reservation_id: ReservationId,
    ) -> AppResult<Reservation> {
        let reservation = self.load_reservation(reservation_id).await?;

        // 所有者か管理者のみ参照できる
        if reservation.reserved_by != actor.user_id && !actor.is_admin() {
            return Err(AppError::ForbiddenOperation);
        }

        Ok(reservation)
    }

    // 管理者は全件、それ以外のユーザーは自身の予約のみを取得する
    pub async fn find_all(&self, actor: &User) -> AppResult<Vec<Reservation>> {
        let repo = self.registry.reservation_repository();
        if actor.is_admin() {
            repo.find_all().await
        } else {
            repo.find_by_user_id(actor.user_id).await
        }
    }

    pub async fn find_by_space_id(&self, space_id: SpaceId) -> AppResult<Vec<Reservation>> {
        self.registry
            .reservation_repository()
            .find_by_space_id(space_id)
            .await
    }

    // 他ユーザーの予約一覧を参照できるのは管理者のみ
    pub async fn find_by_user_id(
        &self,
        actor: &User,
        user_id: UserId,
    ) -> AppResult<Vec<Reservation>> {
        if !actor.is_admin() && actor.user_id != user_id {
            return Err(AppError::ForbiddenOperation);
        }
        self.registry
            .reservation_repository()
            .find_by_user_id(user_id)
            .await
    }

    // approved のまま終了時刻を過ぎた予約を completed に進める。
    // CAS で進めるため、並行する管理者操作と競合しても二重遷移しない。
    // 何度実行しても completed 済みの予約には触れない
    pub async fn run_completion_sweep(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let repo = self.registry.reservation_repository();
        let targets = repo.find_completable(now).await?;

        let mut completed = 0;
        for reservation in targets {
            match repo
                .compare_and_set_status(
                    reservation.reservation_id,
                    ReservationStatus::Approved,
                    ReservationStatus::Completed,
                )
                .await
            {
                Ok(()) => completed += 1,
                // 並行してステータスが変わった予約はスキップする
                Err(e) if e.is_retryable() => {
                    tracing::debug!(
                        reservation_id = %reservation.reservation_id,
                        "skipped during completion sweep: {e}"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(completed)
    }

    fn ensure_bookable(&self, space: &Space, interval: &TimeInterval) -> AppResult<()> {
        // スペースが available でなければ時間帯に関係なく拒否する
        if !space.is_available() {
            return Err(AppError::OutOfScheduleError(format!(
                "スペース（{}）は現在予約を受け付けていません。",
                space.space_id
            )));
        }

        // 設定が有効な場合、候補区間が曜日ごとの利用可能時間帯に
        // 収まることも要求する
        if self.registry.reservation_config().enforce_schedule
            && !space.availability.covers(interval)
        {
            return Err(AppError::OutOfScheduleError(format!(
                "指定の時間帯はスペース（{}）の利用可能時間外です。",
                space.space_id
            )));
        }

        Ok(())
    }

    async fn load_space(&self, space_id: SpaceId) -> AppResult<Space> {
        self.registry
            .space_repository()
            .find_by_id(space_id)
            .await?
            .ok_or_else(|| {
                AppError::EntityNotFound(format!("スペース（{space_id}）が見つかりませんでした。"))
            })
    }

    async fn load_reservation(&self, reservation_id: ReservationId) -> AppResult<Reservation> {
        self.registry
            .reservation_repository()
            .find_by_id(reservation_id)
            .await?
            .ok_or_else(|| {
                AppError::EntityNotFound(format!(
                    "予約（{reservation_id}）が見つかりませんでした。"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};
    use kernel::model::{
        reservation::ReservationPurpose,
        role::Role,
        space::{
            schedule::{TimeWindow, WeeklySchedule},
            Location, SpaceStatus, SpaceType,
        },
    };
    use shared::config::ReservationConfig;

    use crate::model::space::CreateSpaceRequest;
    use crate::space::SpaceService;

    fn admin() -> User {
        User {
            user_id: UserId::new(),
            user_name: "admin".into(),
            email: "admin@example.com".into(),
            role: Role::Admin,
        }
    }

    fn member(name: &str) -> User {
        User {
            user_id: UserId::new(),
            user_name: name.into(),
            email: format!("{name}@example.com"),
            role: Role::User,
        }
    }

    // 2025-06-02 は月曜日
    fn monday(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, hour, min, 0).unwrap()
    }

    fn monday_morning_schedule() -> WeeklySchedule {
        WeeklySchedule {
            monday: vec![TimeWindow {
                start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            }],
            ..Default::default()
        }
    }

    fn space_request(status: SpaceStatus) -> CreateSpaceRequest {
        CreateSpaceRequest {
            space_name: "Room 101".into(),
            description: "Test room".into(),
            capacity: 20,
            space_type: SpaceType::Classroom,
            location: Location {
                building: "Main".into(),
                floor: 1,
            },
            equipment: vec![],
            availability: monday_morning_schedule(),
            status,
        }
    }

    fn reserve_request(
        space_id: SpaceId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> CreateReservationRequest {
        CreateReservationRequest {
            space_id,
            start_time: start,
            end_time: end,
            purpose: ReservationPurpose::Study,
            description: None,
            attendees: Some(3),
        }
    }

    async fn setup_with_config(
        config: ReservationConfig,
    ) -> (ReservationService, SpaceService, SpaceId) {
        let registry = AppRegistry::in_memory(config);
        let spaces = SpaceService::new(registry.clone());
        let reservations = ReservationService::new(registry);
        let space_id = spaces
            .create(&admin(), space_request(SpaceStatus::Available))
            .await
            .unwrap();
        (reservations, spaces, space_id)
    }

    async fn setup() -> (ReservationService, SpaceService, SpaceId) {
        setup_with_config(ReservationConfig::default()).await
    }

    #[tokio::test]
    async fn monday_window_scenario() {
        let (service, _, space_id) = setup().await;
        let user = member("alice");

        // 9:00-12:00 の利用可能時間内の予約は受け付けられ、pending になる
        let first = service
            .create(&user, reserve_request(space_id, monday(10, 0), monday(11, 0)))
            .await
            .unwrap();
        let stored = service.find_by_id(&user, first).await.unwrap();
        assert_eq!(stored.status, ReservationStatus::Pending);

        // 重なる時間帯は拒否される
        let res = service
            .create(
                &member("bob"),
                reserve_request(space_id, monday(10, 30), monday(10, 45)),
            )
            .await;
        assert!(matches!(res, Err(AppError::ReservationConflictError(_))));

        // 端が接するだけの時間帯は重複にならない
        service
            .create(
                &member("carol"),
                reserve_request(space_id, monday(11, 0), monday(11, 30)),
            )
            .await
            .unwrap();

        // 利用可能時間外は拒否される
        let res = service
            .create(&user, reserve_request(space_id, monday(8, 0), monday(8, 30)))
            .await;
        assert!(matches!(res, Err(AppError::OutOfScheduleError(_))));
    }

    #[tokio::test]
    async fn lifecycle_scenario() {
        let (service, _, space_id) = setup().await;
        let owner = member("alice");
        let admin = admin();

        let id = service
            .create(&owner, reserve_request(space_id, monday(10, 0), monday(11, 0)))
            .await
            .unwrap();

        // 管理者は承認できる
        service
            .set_status(&admin, id, ReservationStatus::Approved)
            .await
            .unwrap();

        // 所有者が承認を要求してもロール確認で弾かれる
        let res = service
            .set_status(&owner, id, ReservationStatus::Approved)
            .await;
        assert!(matches!(res, Err(AppError::ForbiddenOperation)));

        // 管理者は完了にできる
        service
            .set_status(&admin, id, ReservationStatus::Completed)
            .await
            .unwrap();

        // 完了後はいかなる遷移もできない
        let res = service
            .set_status(&admin, id, ReservationStatus::Cancelled)
            .await;
        assert!(matches!(res, Err(AppError::InvalidTransitionError(_))));

        let stored = service.find_by_id(&owner, id).await.unwrap();
        assert_eq!(stored.status, ReservationStatus::Completed);
    }

    #[tokio::test]
    async fn cancelled_reservation_frees_slot_and_cannot_cancel_twice() {
        let (service, _, space_id) = setup().await;
        let user = member("alice");

        let id = service
            .create(&user, reserve_request(space_id, monday(10, 0), monday(11, 0)))
            .await
            .unwrap();
        service
            .set_status(&user, id, ReservationStatus::Cancelled)
            .await
            .unwrap();

        // キャンセル済みの予約は時間帯を占有しない
        service
            .create(
                &member("bob"),
                reserve_request(space_id, monday(10, 0), monday(11, 0)),
            )
            .await
            .unwrap();

        // 二重キャンセルは InvalidTransition
        let res = service
            .set_status(&user, id, ReservationStatus::Cancelled)
            .await;
        assert!(matches!(res, Err(AppError::InvalidTransitionError(_))));
    }

    #[tokio::test]
    async fn create_fails_for_unknown_space() {
        let (service, _, _) = setup().await;
        let res = service
            .create(
                &member("alice"),
                reserve_request(SpaceId::new(), monday(10, 0), monday(11, 0)),
            )
            .await;
        assert!(matches!(res, Err(AppError::EntityNotFound(_))));
    }

    #[tokio::test]
    async fn create_rejects_invalid_interval() {
        let (service, _, space_id) = setup().await;
        let res = service
            .create(
                &member("alice"),
                reserve_request(space_id, monday(11, 0), monday(10, 0)),
            )
            .await;
        assert!(matches!(res, Err(AppError::InvalidIntervalError(_))));
    }

    #[tokio::test]
    async fn create_rejects_space_under_maintenance() {
        let (service, spaces, space_id) = setup().await;
        let admin = admin();

        let req = crate::model::space::UpdateSpaceRequest {
            space_name: None,
            description: None,
            capacity: None,
            space_type: None,
            location: None,
            equipment: None,
            availability: None,
            status: Some(SpaceStatus::Maintenance),
        };
        spaces.update(&admin, space_id, req).await.unwrap();

        let res = service
            .create(
                &member("alice"),
                reserve_request(space_id, monday(10, 0), monday(11, 0)),
            )
            .await;
        assert!(matches!(res, Err(AppError::OutOfScheduleError(_))));
    }

    #[tokio::test]
    async fn schedule_enforcement_can_be_disabled() {
        let config = ReservationConfig {
            enforce_schedule: false,
            ..Default::default()
        };
        let (service, _, space_id) = setup_with_config(config).await;

        // 利用可能時間外でも、強制が無効なら受け付けられる
        service
            .create(
                &member("alice"),
                reserve_request(space_id, monday(8, 0), monday(8, 30)),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn validation_rejects_overlong_description() {
        let (service, _, space_id) = setup().await;
        let mut req = reserve_request(space_id, monday(10, 0), monday(11, 0));
        req.description = Some("x".repeat(501));
        let res = service.create(&member("alice"), req).await;
        assert!(matches!(res, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn stranger_cannot_touch_someone_elses_reservation() {
        let (service, _, space_id) = setup().await;
        let owner = member("alice");
        let stranger = member("mallory");

        let id = service
            .create(&owner, reserve_request(space_id, monday(10, 0), monday(11, 0)))
            .await
            .unwrap();

        let update = UpdateReservationRequest {
            start_time: monday(9, 0),
            end_time: monday(10, 0),
        };
        let res = service.update_interval(&stranger, id, update).await;
        assert!(matches!(res, Err(AppError::ForbiddenOperation)));

        let res = service
            .set_status(&stranger, id, ReservationStatus::Cancelled)
            .await;
        assert!(matches!(res, Err(AppError::ForbiddenOperation)));
    }

    #[tokio::test]
    async fn owner_can_shift_interval_over_its_own_slot() {
        let (service, _, space_id) = setup().await;
        let owner = member("alice");

        let id = service
            .create(&owner, reserve_request(space_id, monday(10, 0), monday(11, 0)))
            .await
            .unwrap();

        // 自身の時間帯と重なる変更は自分自身とは衝突しない
        let update = UpdateReservationRequest {
            start_time: monday(10, 30),
            end_time: monday(11, 30),
        };
        service.update_interval(&owner, id, update).await.unwrap();

        let stored = service.find_by_id(&owner, id).await.unwrap();
        assert_eq!(stored.interval.start(), monday(10, 30));
        assert_eq!(stored.interval.end(), monday(11, 30));
    }

    #[tokio::test]
    async fn interval_update_is_rejected_after_terminal_state() {
        let (service, _, space_id) = setup().await;
        let owner = member("alice");

        let id = service
            .create(&owner, reserve_request(space_id, monday(10, 0), monday(11, 0)))
            .await
            .unwrap();
        service
            .set_status(&owner, id, ReservationStatus::Cancelled)
            .await
            .unwrap();

        let update = UpdateReservationRequest {
            start_time: monday(9, 0),
            end_time: monday(10, 0),
        };
        let res = service.update_interval(&owner, id, update).await;
        assert!(matches!(res, Err(AppError::InvalidTransitionError(_))));
    }

    #[tokio::test]
    async fn check_availability_reports_conflicts_without_mutating() {
        let (service, _, space_id) = setup().await;
        let user = member("alice");

        service
            .create(&user, reserve_request(space_id, monday(10, 0), monday(11, 0)))
            .await
            .unwrap();

        let interval = TimeInterval::new(monday(10, 30), monday(11, 30)).unwrap();
        let availability = service.check_availability(space_id, &interval).await.unwrap();
        assert!(!availability.available);
        assert_eq!(availability.conflicting_reservations.len(), 1);

        let interval = TimeInterval::new(monday(11, 0), monday(12, 0)).unwrap();
        let availability = service.check_availability(space_id, &interval).await.unwrap();
        assert!(availability.available);
        assert!(availability.conflicting_reservations.is_empty());
    }

    #[tokio::test]
    async fn completion_sweep_is_idempotent() {
        let (service, _, space_id) = setup().await;
        let user = member("alice");
        let admin = admin();

        let id = service
            .create(&user, reserve_request(space_id, monday(10, 0), monday(11, 0)))
            .await
            .unwrap();
        service
            .set_status(&admin, id, ReservationStatus::Approved)
            .await
            .unwrap();

        // 終了時刻より前のスイープでは何も起きない
        let n = service.run_completion_sweep(monday(10, 30)).await.unwrap();
        assert_eq!(n, 0);

        // 終了時刻を過ぎたら completed に進む
        let n = service.run_completion_sweep(monday(12, 0)).await.unwrap();
        assert_eq!(n, 1);
        let stored = service.find_by_id(&user, id).await.unwrap();
        assert_eq!(stored.status, ReservationStatus::Completed);

        // もう一度実行しても二重遷移しない
        let n = service.run_completion_sweep(monday(12, 0)).await.unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn listing_is_scoped_by_role() {
        let (service, _, space_id) = setup().await;
        let alice = member("alice");
        let bob = member("bob");
        let admin = admin();

        service
            .create(&alice, reserve_request(space_id, monday(9, 0), monday(10, 0)))
            .await
            .unwrap();
        service
            .create(&bob, reserve_request(space_id, monday(10, 0), monday(11, 0)))
            .await
            .unwrap();

        assert_eq!(service.find_all(&admin).await.unwrap().len(), 2);
        assert_eq!(service.find_all(&alice).await.unwrap().len(), 1);

        // 他ユーザーの予約一覧は管理者のみ
        let res = service.find_by_user_id(&alice, bob.user_id).await;
        assert!(matches!(res, Err(AppError::ForbiddenOperation)));
        assert_eq!(
            service.find_by_user_id(&admin, bob.user_id).await.unwrap().len(),
            1
        );
    }
}
