use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;
mod manager;
mod middleware;
mod models;
mod rate_limiter;
mod repositories;
mod routes;
mod state;
mod validation;

use common::{
    database::{DatabaseConfig, health_check, init_pool, run_migrations},
    jwt::{JwtConfig, JwtService},
    settings::{ServiceConfig, StorageBackend},
};

use crate::{
    manager::{UserManager, UserStoreError},
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::{InMemoryUserRepository, PgUserRepository, UserRepository},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting authentication service");

    let service_config = ServiceConfig::from_env(3000)?;

    let repository: Arc<dyn UserRepository> = match service_config.storage_backend {
        StorageBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = init_pool(&db_config).await?;

            if health_check(&pool).await? {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }

            run_migrations(&pool).await?;
            Arc::new(PgUserRepository::new(pool))
        }
        StorageBackend::Memory => {
            info!("Using in-memory user storage");
            Arc::new(InMemoryUserRepository::new())
        }
    };

    let jwt_service = JwtService::new(JwtConfig::from_env()?);
    let rate_limiter = RateLimiter::new(RateLimiterConfig::default());
    info!(
        "Login throttling: {} attempts per {} seconds",
        rate_limiter.config().max_attempts,
        rate_limiter.config().window_seconds
    );

    let app_state = AppState {
        users: UserManager::new(repository),
        jwt_service,
        rate_limiter,
    };

    // Optional bootstrap account, skipped when it already exists
    if let (Ok(email), Ok(password)) = (
        std::env::var("SUPERUSER_EMAIL"),
        std::env::var("SUPERUSER_PASSWORD"),
    ) {
        match app_state.users.create_superuser(&email, &password).await {
            Ok(user) => info!("Created superuser {}", user),
            Err(UserStoreError::EmailTaken) => info!("Superuser {} already exists", email),
            Err(e) => return Err(e.into()),
        }
    }

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let address = service_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Authentication service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
