use std::sync::Arc;

use adapter::database::ConnectionPool;
use adapter::repository::memory::{
    InMemoryReservationRepository, InMemorySpaceRepository, MemoryStore,
};
use adapter::repository::reservation::ReservationRepositoryImpl;
use adapter::repository::space::SpaceRepositoryImpl;
use kernel::repository::reservation::ReservationRepository;
use kernel::repository::space::SpaceRepository;
use shared::config::{AppConfig, ReservationConfig};

#[derive(Clone)]
pub struct AppRegistry {
    space_repository: Arc<dyn SpaceRepository>,
    reservation_repository: Arc<dyn ReservationRepository>,
    reservation_config: ReservationConfig,
}

impl AppRegistry {
    pub fn new(pool: ConnectionPool, app_config: AppConfig) -> Self {
        let space_repository = Arc::new(SpaceRepositoryImpl::new(pool.clone()));
        let reservation_repository = Arc::new(ReservationRepositoryImpl::new(pool.clone()));
        Self {
            space_repository,
            reservation_repository,
            reservation_config: app_config.reservation,
        }
    }

    // テスト・ローカル開発用。ストアをインメモリ実装に差し替える
    pub fn in_memory(reservation_config: ReservationConfig) -> Self {
        let store = MemoryStore::new();
        Self {
            space_repository: Arc::new(InMemorySpaceRepository::new(store.clone())),
            reservation_repository: Arc::new(InMemoryReservationRepository::new(store)),
            reservation_config,
        }
    }

    pub fn space_repository(&self) -> Arc<dyn SpaceRepository> {
        self.space_repository.clone()
    }

    pub fn reservation_repository(&self) -> Arc<dyn ReservationRepository> {
        self.reservation_repository.clone()
    }

    pub fn reservation_config(&self) -> &ReservationConfig {
        &self.reservation_config
    }
}
