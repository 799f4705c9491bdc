use super::*;

impl ApprovalService {
    /// Lists the changes awaiting review. Reviewers only.
    pub async fn list_pending(
        &self,
        actor: &UserIdentity,
    ) -> Result<Vec<PendingChange>, ApprovalError> {
        self.list(actor, Some(PendingChangeStatus::Pending)).await
    }

    /// Lists all changes in the workspace, optionally by status. Reviewers only.
    pub async fn list(
        &self,
        actor: &UserIdentity,
        status: Option<PendingChangeStatus>,
    ) -> Result<Vec<PendingChange>, ApprovalError> {
        self.require(actor, Permission::ChangeReview).await?;

        Ok(self
            .repository
            .list(
                actor.workspace_id(),
                PendingChangeQuery {
                    status,
                    requester: None,
                },
            )
            .await?)
    }

    /// Lists the actor's own submissions, whatever their role.
    pub async fn list_mine(
        &self,
        actor: &UserIdentity,
        status: Option<PendingChangeStatus>,
    ) -> AppResult<Vec<PendingChange>> {
        self.repository
            .list(
                actor.workspace_id(),
                PendingChangeQuery {
                    status,
                    requester: Some(actor.subject().to_owned()),
                },
            )
            .await
    }

    /// Returns one change to a reviewer or to its submitter.
    pub async fn get(
        &self,
        actor: &UserIdentity,
        change_id: &str,
    ) -> Result<PendingChange, ApprovalError> {
        let change = self.load(actor, change_id).await?;
        if change.requester() == actor.subject() {
            return Ok(change);
        }

        self.require(actor, Permission::ChangeReview).await?;
        Ok(change)
    }
}
