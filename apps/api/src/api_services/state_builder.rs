use inventra_application::{
    ApprovalService, AuthorizationService, BatchSyncService, ChangeRouter,
};
use inventra_core::AppError;
use inventra_domain::WorkspaceRole;
use tracing::info;

use crate::api_config::BootstrapOwner;
use crate::state::AppState;

mod repositories;

pub use repositories::RepositorySet;

pub fn build_app_state(repositories: RepositorySet) -> AppState {
    let authorization_service =
        AuthorizationService::new(repositories.authorization_repository.clone());
    let router = ChangeRouter::new(repositories.gateway_registry);

    AppState {
        batch_sync_service: BatchSyncService::new(authorization_service.clone(), router.clone()),
        approval_service: ApprovalService::new(
            authorization_service,
            repositories.pending_change_repository,
            router,
            repositories.event_publisher,
            repositories.audit_repository,
        ),
    }
}

pub async fn seed_bootstrap_owner(
    repositories: &RepositorySet,
    owner: &BootstrapOwner,
) -> Result<(), AppError> {
    repositories
        .authorization_repository
        .save_member_role(owner.workspace_id, owner.subject.as_str(), WorkspaceRole::Owner)
        .await?;

    info!(
        workspace_id = %owner.workspace_id,
        subject = owner.subject.as_str(),
        "bootstrap owner membership saved"
    );

    Ok(())
}
