use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use inventra_core::{AppError, WorkspaceId};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Memory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

/// Owner membership seeded at startup so a fresh deployment has a reviewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOwner {
    pub workspace_id: WorkspaceId,
    pub subject: String,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub api_host: String,
    pub api_port: u16,
    pub storage: StorageConfig,
    pub bootstrap_owner: Option<BootstrapOwner>,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        let storage = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "memory".to_owned())
            .as_str()
        {
            "memory" => StorageConfig::Memory,
            "postgres" => StorageConfig::Postgres {
                database_url: required_non_empty_env("DATABASE_URL")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .map(|value| {
                        value.parse::<u32>().map_err(|error| {
                            AppError::Validation(format!(
                                "invalid DATABASE_MAX_CONNECTIONS: {error}"
                            ))
                        })
                    })
                    .transpose()?
                    .unwrap_or(10),
            },
            other => {
                return Err(AppError::Validation(format!(
                    "STORAGE_BACKEND must be either 'memory' or 'postgres', got '{other}'"
                )));
            }
        };

        if migrate_only && storage == StorageConfig::Memory {
            return Err(AppError::Validation(
                "the migrate command requires STORAGE_BACKEND=postgres".to_owned(),
            ));
        }

        let bootstrap_subject = optional_non_empty_env("BOOTSTRAP_OWNER_SUBJECT");
        let bootstrap_workspace = optional_non_empty_env("BOOTSTRAP_WORKSPACE_ID");
        let bootstrap_owner = match (bootstrap_subject, bootstrap_workspace) {
            (Some(subject), Some(workspace_id)) => Some(BootstrapOwner {
                workspace_id: WorkspaceId::from_str(workspace_id.as_str()).map_err(|error| {
                    AppError::Validation(format!("invalid BOOTSTRAP_WORKSPACE_ID: {error}"))
                })?,
                subject,
            }),
            (None, None) => None,
            _ => {
                return Err(AppError::Validation(
                    "BOOTSTRAP_OWNER_SUBJECT and BOOTSTRAP_WORKSPACE_ID must be set together"
                        .to_owned(),
                ));
            }
        };

        Ok(Self {
            migrate_only,
            api_host,
            api_port,
            storage,
            bootstrap_owner,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn optional_non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
