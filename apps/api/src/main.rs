//! Inventra API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

#[cfg(test)]
mod test_support;

use inventra_core::AppError;
use tracing::info;

use crate::api_config::{ApiConfig, StorageConfig, init_tracing};
use crate::api_services::RepositorySet;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let repositories = match &config.storage {
        StorageConfig::Memory => {
            info!("using in-memory storage");
            RepositorySet::in_memory()
        }
        StorageConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let pool =
                api_services::connect_and_migrate(database_url.as_str(), *max_connections).await?;
            if config.migrate_only {
                info!("database migrations applied successfully");
                return Ok(());
            }
            RepositorySet::postgres(&pool)
        }
    };

    if let Some(owner) = &config.bootstrap_owner {
        api_services::seed_bootstrap_owner(&repositories, owner).await?;
    }

    let app = api_router::build_router(api_services::build_app_state(repositories));
    let address = config.socket_address()?;

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "inventra-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
