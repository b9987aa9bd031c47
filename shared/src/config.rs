use anyhow::Result;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub reservation: ReservationConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        let database = DatabaseConfig {
            host: std::env::var("DATABASE_HOST")?,
            port: std::env::var("DATABASE_PORT")?.parse()?,
            username: std::env::var("DATABASE_USERNAME")?,
            password: std::env::var("DATABASE_PASSWORD")?,
            database: std::env::var("DATABASE_NAME")?,
            acquire_timeout_secs: env_or("DATABASE_ACQUIRE_TIMEOUT_SECS", 5)?,
        };
        let reservation = ReservationConfig {
            enforce_schedule: env_or("RESERVATION_ENFORCE_SCHEDULE", true)?,
            auto_complete: env_or("RESERVATION_AUTO_COMPLETE", true)?,
            sweep_interval_secs: env_or("RESERVATION_SWEEP_INTERVAL_SECS", 60)?,
        };
        Ok(Self {
            database,
            reservation,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ReservationConfig {
    // 予約作成・変更時に曜日ごとの利用可能時間帯を強制するかどうか
    pub enforce_schedule: bool,
    // approved のまま終了時刻を過ぎた予約を自動で completed に進めるかどうか
    pub auto_complete: bool,
    pub sweep_interval_secs: u64,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            enforce_schedule: true,
            auto_complete: true,
            sweep_interval_secs: 60,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => Ok(v.parse::<T>()?),
        Err(_) => Ok(default),
    }
}
