use inventra_core::{AppError, AppResult, UserIdentity, WorkspaceId};
use inventra_domain::Permission;
use tokio::sync::watch;
use tracing::info;

use crate::AuthorizationService;
use crate::change_router::{ChangeRequest, ChangeRouter, OperationResult, OperationStatus};

/// Largest batch accepted by [`BatchSyncService::sync`].
pub const MAX_BATCH_OPERATIONS: usize = 100;

/// Rejects empty and oversized batches before anything is processed.
pub fn validate_batch_size(operations: usize) -> AppResult<()> {
    if operations == 0 {
        return Err(AppError::Validation(
            "batch must contain at least one operation".to_owned(),
        ));
    }
    if operations > MAX_BATCH_OPERATIONS {
        return Err(AppError::Validation(format!(
            "batch contains {operations} operations, the maximum is {MAX_BATCH_OPERATIONS}"
        )));
    }

    Ok(())
}

/// Index-aligned results of a processed batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    /// One result per request, in request order.
    pub results: Vec<OperationResult>,
    /// Applied operations.
    pub succeeded: usize,
    /// Failed or skipped operations.
    pub failed: usize,
    /// Operations refused because of a version conflict.
    pub conflicts: usize,
}

impl BatchResult {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    fn record(&mut self, result: OperationResult) {
        match result.status {
            OperationStatus::Success => self.succeeded += 1,
            OperationStatus::Conflict => self.conflicts += 1,
            OperationStatus::Error | OperationStatus::Skipped => self.failed += 1,
        }
        self.results.push(result);
    }
}

/// Read side of a batch cancellation signal.
#[derive(Debug, Clone)]
pub struct BatchCancellation {
    receiver: watch::Receiver<bool>,
}

/// Owning side of a batch cancellation signal. Dropping it cancels the batch.
#[derive(Debug)]
pub struct BatchCancellationHandle {
    sender: watch::Sender<bool>,
}

impl BatchCancellation {
    /// Creates a linked handle and signal.
    #[must_use]
    pub fn pair() -> (BatchCancellationHandle, Self) {
        let (sender, receiver) = watch::channel(false);
        (BatchCancellationHandle { sender }, Self { receiver })
    }

    /// Signal that is never cancelled.
    #[must_use]
    pub fn never() -> Self {
        let (_, receiver) = watch::channel(false);
        Self { receiver }
    }

    /// Returns whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }
}

impl BatchCancellationHandle {
    /// Requests cancellation. Operations already started finish normally.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl Drop for BatchCancellationHandle {
    fn drop(&mut self) {
        self.sender.send_replace(true);
    }
}

/// Runs batch requests through the router in input order.
#[derive(Clone)]
pub struct BatchProcessor {
    router: ChangeRouter,
}

impl BatchProcessor {
    /// Creates a processor over a router.
    #[must_use]
    pub fn new(router: ChangeRouter) -> Self {
        Self { router }
    }

    /// Processes each request once. Earlier successes are never undone and one
    /// failure never stops the rest.
    pub async fn process(
        &self,
        workspace_id: WorkspaceId,
        requests: Vec<ChangeRequest>,
        cancellation: &BatchCancellation,
    ) -> BatchResult {
        let mut batch = BatchResult::with_capacity(requests.len());

        for request in requests {
            let result = if cancellation.is_cancelled() {
                OperationResult::skipped(request.index, request.entity_id)
            } else {
                self.router.route(workspace_id, request).await
            };
            batch.record(result);
        }

        batch
    }
}

/// Batch synchronization entry point.
#[derive(Clone)]
pub struct BatchSyncService {
    authorization_service: AuthorizationService,
    processor: BatchProcessor,
}

impl BatchSyncService {
    /// Creates a batch sync service.
    #[must_use]
    pub fn new(authorization_service: AuthorizationService, router: ChangeRouter) -> Self {
        Self {
            authorization_service,
            processor: BatchProcessor::new(router),
        }
    }

    /// Validates and applies a batch on behalf of the actor.
    pub async fn sync(
        &self,
        actor: &UserIdentity,
        requests: Vec<ChangeRequest>,
        cancellation: &BatchCancellation,
    ) -> AppResult<BatchResult> {
        validate_batch_size(requests.len())?;
        self.authorization_service
            .require_permission(actor.workspace_id(), actor.subject(), Permission::CatalogWrite)
            .await?;

        let operations = requests.len();
        let result = self
            .processor
            .process(actor.workspace_id(), requests, cancellation)
            .await;

        info!(
            workspace_id = %actor.workspace_id(),
            subject = actor.subject(),
            operations,
            succeeded = result.succeeded,
            failed = result.failed,
            conflicts = result.conflicts,
            cancelled = cancellation.is_cancelled(),
            "batch sync processed"
        );

        Ok(result)
    }
}
