use std::sync::Arc;

use inventra_application::{
    AuditRepository, AuthorizationRepository, ChangeEventPublisher, EntityGatewayRegistry,
    EntityRepository, PendingChangeRepository,
};
use inventra_domain::{Borrower, CatalogEntity, Category, Company, Container, Item, Label, Loan, Location};
use inventra_infrastructure::{
    InMemoryAuditRepository, InMemoryAuthorizationRepository, InMemoryEntityRepository,
    InMemoryPendingChangeRepository, PostgresAuditRepository, PostgresAuthorizationRepository,
    PostgresEntityRepository, PostgresPendingChangeRepository, TracingChangeEventPublisher,
};
use sqlx::PgPool;

/// Adapters behind every application port, for one storage backend.
pub struct RepositorySet {
    pub authorization_repository: Arc<dyn AuthorizationRepository>,
    pub pending_change_repository: Arc<dyn PendingChangeRepository>,
    pub audit_repository: Arc<dyn AuditRepository>,
    pub event_publisher: Arc<dyn ChangeEventPublisher>,
    pub gateway_registry: EntityGatewayRegistry,
}

impl RepositorySet {
    pub fn in_memory() -> Self {
        let gateway_registry = EntityGatewayRegistry::new()
            .register::<Item>(in_memory_catalog())
            .register::<Location>(in_memory_catalog())
            .register::<Container>(in_memory_catalog())
            .register::<Category>(in_memory_catalog())
            .register::<Label>(in_memory_catalog())
            .register::<Company>(in_memory_catalog())
            .register::<Borrower>(in_memory_catalog())
            .register::<Loan>(in_memory_catalog());

        Self {
            authorization_repository: Arc::new(InMemoryAuthorizationRepository::new()),
            pending_change_repository: Arc::new(InMemoryPendingChangeRepository::new()),
            audit_repository: Arc::new(InMemoryAuditRepository::new()),
            event_publisher: Arc::new(TracingChangeEventPublisher),
            gateway_registry,
        }
    }

    pub fn postgres(pool: &PgPool) -> Self {
        let gateway_registry = EntityGatewayRegistry::new()
            .register::<Item>(postgres_catalog(pool))
            .register::<Location>(postgres_catalog(pool))
            .register::<Container>(postgres_catalog(pool))
            .register::<Category>(postgres_catalog(pool))
            .register::<Label>(postgres_catalog(pool))
            .register::<Company>(postgres_catalog(pool))
            .register::<Borrower>(postgres_catalog(pool))
            .register::<Loan>(postgres_catalog(pool));

        Self {
            authorization_repository: Arc::new(PostgresAuthorizationRepository::new(pool.clone())),
            pending_change_repository: Arc::new(PostgresPendingChangeRepository::new(
                pool.clone(),
            )),
            audit_repository: Arc::new(PostgresAuditRepository::new(pool.clone())),
            event_publisher: Arc::new(TracingChangeEventPublisher),
            gateway_registry,
        }
    }
}

fn in_memory_catalog<E: CatalogEntity>() -> Arc<dyn EntityRepository<E>> {
    Arc::new(InMemoryEntityRepository::<E>::new())
}

fn postgres_catalog<E: CatalogEntity>(pool: &PgPool) -> Arc<dyn EntityRepository<E>> {
    Arc::new(PostgresEntityRepository::<E>::new(pool.clone()))
}
