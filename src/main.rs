use std::{sync::Arc, time::Duration};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use recipe_api::{
    authentication::cryptography::hash_password,
    config::Config,
    connection::{establish_pool, ping, run_migrations, wait_for_db},
    form::{is_valid_email, normalize_email},
    memory_state,
    routes,
    schema::NewUser,
    state::AppState,
    store::{PgStore, Store},
};

#[derive(Parser, Debug)]
#[command(version, about = "Recipe management API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// Keep everything in process memory instead of Postgres.
        #[arg(long)]
        in_memory: bool,
    },
    /// Block until the database accepts connections.
    WaitForDb,
    /// Apply pending migrations and exit.
    Migrate,
    /// Create an administrator account.
    CreateSuperuser {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SUPERUSER_PASSWORD")]
        password: String,
        #[arg(long, default_value = "")]
        name: String,
    },
    /// Remove a user together with everything they own.
    DeleteUser {
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = Config::load();

    match cli.command.unwrap_or(Command::Serve { in_memory: false }) {
        Command::Serve { in_memory } => serve(config, in_memory).await,
        Command::WaitForDb => {
            let pool = establish_pool(&config)?;
            wait(&config, &pool).await
        }
        Command::Migrate => {
            let pool = establish_pool(&config)?;
            wait(&config, &pool).await?;
            run_migrations(&pool).await?;
            Ok(())
        }
        Command::CreateSuperuser {
            email,
            password,
            name,
        } => create_superuser(&config, &email, &password, name).await,
        Command::DeleteUser { email } => delete_user(&config, &email).await,
    }
}

async fn serve(config: Config, in_memory: bool) -> anyhow::Result<()> {
    let state = if in_memory {
        warn!("Using the in-memory store, data is lost on exit");
        memory_state(&config)?
    } else {
        let pool = establish_pool(&config)?;
        wait(&config, &pool).await?;
        run_migrations(&pool).await?;
        AppState::new(Arc::new(PgStore::new(pool)), &config)?
    };

    let (address, server) = warp::serve(routes::api(state))
        .try_bind_with_graceful_shutdown(config.address, shutdown_signal())
        .with_context(|| format!("Failed to bind {}", config.address))?;

    info!("Listening on http://{address}");
    server.await;
    info!("Server stopped");

    Ok(())
}

async fn wait(config: &Config, pool: &sqlx::PgPool) -> anyhow::Result<()> {
    wait_for_db(|| ping(pool), config.db_wait_attempts, Duration::from_secs(1)).await?;
    Ok(())
}

async fn pg_store(config: &Config) -> anyhow::Result<PgStore> {
    let pool = establish_pool(config)?;
    wait(config, &pool).await?;
    Ok(PgStore::new(pool))
}

async fn create_superuser(
    config: &Config,
    email: &str,
    password: &str,
    name: String,
) -> anyhow::Result<()> {
    if !is_valid_email(email) {
        bail!("'{email}' is not a valid email address");
    }
    if password.is_empty() {
        bail!("Password may not be blank");
    }

    let store = pg_store(config).await?;
    let user = store
        .create_user(NewUser {
            email: normalize_email(email),
            name,
            password: hash_password(password)
                .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?,
            is_staff: true,
            is_superuser: true,
        })
        .await?;

    info!("Superuser {} created", user.email);
    Ok(())
}

async fn delete_user(config: &Config, email: &str) -> anyhow::Result<()> {
    let store = pg_store(config).await?;

    let Some(user) = store.get_user_by_email(&normalize_email(email)).await? else {
        bail!("No user with email '{email}'");
    };
    store.delete_user(user.id).await?;

    info!("Deleted user {}", user.email);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}
