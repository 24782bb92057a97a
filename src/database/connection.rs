use std::{future::Future, time::Duration};

use log::{debug, info, warn};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{
    config::Config,
    error::{Error, HttpError, Result},
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Connections are opened on first use so a cold database doesn't fail start-up.
pub fn establish_pool(config: &Config) -> Result<Pool<Postgres>> {
    debug!("Creating pool ({} connections)", config.db_max_connections);

    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(&config.database_url)
        .map_err(Error::from)
}

pub async fn run_migrations(pool: &Pool<Postgres>) -> Result<()> {
    info!("Running migrations...");
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| Error::from(sqlx::Error::from(e)))?;
    info!("Migrations applied");

    Ok(())
}

/// Calls `probe` until it succeeds, sleeping `delay` between attempts.
/// Returns how many attempts it took.
pub async fn wait_for_db<F, Fut>(mut probe: F, attempts: u32, delay: Duration) -> Result<u32>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), sqlx::Error>>,
{
    info!("Waiting for database...");

    for attempt in 1..=attempts.max(1) {
        match probe().await {
            Ok(()) => {
                info!("Database available!");
                return Ok(attempt);
            }
            Err(e) => {
                warn!(
                    "Database unavailable ({e}), waiting {} second(s)...",
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
            }
        }
    }

    Err(HttpError::Internal.new("Database did not become available"))
}

pub async fn ping(pool: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ready_database_is_probed_once() {
        let mut calls = 0;
        let attempts = wait_for_db(
            || {
                calls += 1;
                async { Ok(()) }
            },
            5,
            Duration::ZERO,
        )
        .await
        .unwrap();

        assert_eq!(attempts, 1);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn unavailable_database_is_retried() {
        let mut calls = 0;
        let attempts = wait_for_db(
            || {
                calls += 1;
                let ready = calls > 5;
                async move {
                    if ready {
                        Ok(())
                    } else {
                        Err(sqlx::Error::PoolTimedOut)
                    }
                }
            },
            10,
            Duration::ZERO,
        )
        .await
        .unwrap();

        assert_eq!(attempts, 6);
        assert_eq!(calls, 6);
    }

    #[tokio::test]
    async fn gives_up_after_the_attempt_budget() {
        let mut calls = 0;
        let result = wait_for_db(
            || {
                calls += 1;
                async { Err(sqlx::Error::PoolClosed) }
            },
            3,
            Duration::ZERO,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 3);
    }
}
