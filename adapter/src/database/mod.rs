use shared::{
    config::DatabaseConfig,
    error::{AppError, AppResult},
};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::time::Duration;

pub mod model;

fn make_pg_connect_options(cfg: &DatabaseConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&cfg.host)
        .port(cfg.port)
        .username(&cfg.username)
        .password(&cfg.password)
        .database(&cfg.database)
}

#[derive(Clone)]
pub struct ConnectionPool(PgPool);

impl ConnectionPool {
    pub fn new(pool: PgPool) -> Self {
        Self(pool)
    }

    pub fn inner_ref(&self) -> &PgPool {
        &self.0
    }

    pub async fn begin(&self) -> AppResult<sqlx::Transaction<'_, sqlx::Postgres>> {
        self.0.begin().await.map_err(map_store_error)
    }
}

// 接続待ちには上限を設ける。タイムアウトしたストア呼び出しは
// リトライ可能なエラーとして返り、黙って成功扱いにはならない
pub fn connect_database_with(cfg: &DatabaseConfig) -> ConnectionPool {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .connect_lazy_with(make_pg_connect_options(cfg));
    ConnectionPool(pool)
}

// sqlx のエラーを AppError に変換する。
// 直列化失敗（SQLSTATE 40001）とタイムアウトはリトライで解消しうる
pub fn map_store_error(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::PoolTimedOut => AppError::StoreUnavailableError(e),
        sqlx::Error::Database(db) if db.code().as_deref() == Some("40001") => {
            AppError::TransactionError(e)
        }
        _ => AppError::SpecificOperationError(e),
    }
}

// create_if_vacant / update_interval_if_vacant / delete のトランザクションで
// 分離レベルを SERIALIZABLE にするために内部的に使う
pub(crate) async fn set_transaction_serializable(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
) -> AppResult<()> {
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut **tx)
        .await
        .map_err(map_store_error)?;
    Ok(())
}
