//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_audit_repository;
mod in_memory_authorization_repository;
mod in_memory_entity_repository;
mod in_memory_pending_change_repository;
mod postgres_audit_repository;
mod postgres_authorization_repository;
mod postgres_entity_repository;
mod postgres_pending_change_repository;
mod tracing_change_event_publisher;

pub use in_memory_audit_repository::InMemoryAuditRepository;
pub use in_memory_authorization_repository::InMemoryAuthorizationRepository;
pub use in_memory_entity_repository::InMemoryEntityRepository;
pub use in_memory_pending_change_repository::InMemoryPendingChangeRepository;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_authorization_repository::PostgresAuthorizationRepository;
pub use postgres_entity_repository::PostgresEntityRepository;
pub use postgres_pending_change_repository::PostgresPendingChangeRepository;
pub use tracing_change_event_publisher::TracingChangeEventPublisher;
