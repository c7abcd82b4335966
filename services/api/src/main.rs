use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;
mod middleware;
mod models;
mod repositories;
mod routes;
mod serializers;
mod state;
mod storage;

use common::{
    database::{DatabaseConfig, health_check, init_pool, run_migrations},
    jwt::{JwtConfig, JwtService},
    settings::{ServiceConfig, StorageBackend},
};

use crate::{
    repositories::{InMemoryRecipeRepository, PgRecipeRepository, RecipeRepository},
    state::AppState,
    storage::MediaStorage,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting recipe API service");

    let service_config = ServiceConfig::from_env(3001)?;

    let recipes: Arc<dyn RecipeRepository> = match service_config.storage_backend {
        StorageBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = init_pool(&db_config).await?;

            // Check database connectivity
            if health_check(&pool).await? {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }

            run_migrations(&pool).await?;
            Arc::new(PgRecipeRepository::new(pool))
        }
        StorageBackend::Memory => {
            info!("Using in-memory recipe storage");
            Arc::new(InMemoryRecipeRepository::new())
        }
    };

    let media = MediaStorage::from_env();
    info!("Storing uploaded images under {}", media.root().display());

    let app_state = AppState {
        recipes,
        jwt_service: JwtService::new(JwtConfig::from_env()?),
        media,
    };

    info!("Recipe API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let address = service_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Recipe API service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
