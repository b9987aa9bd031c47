use std::time::Duration;

use adapter::database::connect_database_with;
use anyhow::{Context, Result};
use registry::AppRegistry;
use service::reservation::ReservationService;
use shared::config::AppConfig;
use shared::env::{which, Environment};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_logger()?;
    bootstrap().await
}

fn init_logger() -> Result<()> {
    let log_level = match which() {
        Environment::Development => "debug",
        Environment::Production => "info",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.into());

    let subscriber = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_target(false);

    tracing_subscriber::registry()
        .with(subscriber)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

async fn bootstrap() -> Result<()> {
    let app_config = AppConfig::new()?;
    let pool = connect_database_with(&app_config.database);
    let registry = AppRegistry::new(pool, app_config);

    let config = registry.reservation_config().clone();
    let service = ReservationService::new(registry);

    // approved のまま終了時刻を過ぎた予約を定期的に completed へ進める。
    // スイープは CAS で進めるため、多重に動いても二重遷移しない
    let sweeper = if config.auto_complete {
        let service = service.clone();
        let interval = Duration::from_secs(config.sweep_interval_secs);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match service.run_completion_sweep(chrono::Utc::now()).await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(completed = n, "completion sweep finished"),
                    Err(e) => tracing::error!(
                        error.cause_chain = ?e,
                        error.message = %e,
                        "completion sweep failed"
                    ),
                }
            }
        }))
    } else {
        None
    };

    tracing::info!("reservation engine started");

    tokio::signal::ctrl_c()
        .await
        .context("Unexpected error happened in server")?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    Ok(())
}
