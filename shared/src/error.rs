use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    UnprocessableEntity(String),
    #[error("{0}")]
    EntityNotFound(String),
    #[error("{0}")]
    InvalidIntervalError(String),
    #[error("{0}")]
    ReservationConflictError(String),
    #[error("{0}")]
    OutOfScheduleError(String),
    #[error("{0}")]
    InvalidTransitionError(String),
    #[error("{0}")]
    ValidationError(#[from] garde::Report),
    #[error("許可されていない操作です")]
    ForbiddenOperation,
    #[error("{0}")]
    ConversionEntityError(String),
    #[error("データベース処理実行中にエラーが発生しました。")]
    SpecificOperationError(#[source] sqlx::Error),
    #[error("No rows affected: {0}")]
    NoRowsAffectedError(String),
    #[error("トランザクションを実行できませんでした。")]
    TransactionError(#[source] sqlx::Error),
    #[error("ストアへの接続がタイムアウトしました。")]
    StoreUnavailableError(#[source] sqlx::Error),
    #[error("{0}")]
    ConcurrentUpdateError(String),
}

impl AppError {
    // リトライで解消しうるエラーかどうか。
    // 呼び出し側が自動リトライしてよいのはこの種別のみ
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::TransactionError(_)
                | AppError::StoreUnavailableError(_)
                | AppError::ConcurrentUpdateError(_)
        )
    }
}

pub type AppResult<T> = Result<T, AppError>;
