//! Application services and ports.

#![forbid(unsafe_code)]

mod approval_service;
mod authorization_service;
mod batch_service;
mod catalog_ports;
mod change_ports;
mod change_router;
mod clock;
mod conflict;
mod entity_gateway;

#[cfg(test)]
mod test_support;

pub use approval_service::{
    ApprovalError, ApprovalErrorCode, ApprovalService, ApprovedChange, SubmitChangeInput,
};
pub use authorization_service::{AuthorizationRepository, AuthorizationService};
pub use batch_service::{
    BatchCancellation, BatchCancellationHandle, BatchProcessor, BatchResult, BatchSyncService,
    MAX_BATCH_OPERATIONS, validate_batch_size,
};
pub use catalog_ports::EntityRepository;
pub use change_ports::{
    AuditEvent, AuditRepository, ChangeEvent, ChangeEventKind, ChangeEventPublisher,
    PendingChangeQuery, PendingChangeRepository,
};
pub use change_router::{
    ChangeRequest, ChangeRouter, OperationErrorCode, OperationResult, OperationStatus,
};
pub use conflict::has_conflict;
pub use entity_gateway::{
    CatalogGateway, EntityGateway, EntityGatewayRegistry, EntitySnapshot, GatewayError,
};
