use super::*;

impl ApprovalService {
    /// Queues a proposed mutation for review instead of applying it.
    pub async fn submit(
        &self,
        actor: &UserIdentity,
        input: SubmitChangeInput,
    ) -> Result<PendingChange, ApprovalError> {
        self.require(actor, Permission::ChangeSubmit).await?;

        let entity_kind = input
            .entity_type
            .trim()
            .parse::<EntityKind>()
            .ok()
            .filter(|kind| self.router.supports(*kind))
            .ok_or_else(|| {
                ApprovalError::refused(
                    ApprovalErrorCode::InvalidEntityType,
                    format!("unsupported entity type '{}'", input.entity_type),
                )
            })?;
        let action = input.action.trim().parse::<ChangeAction>().map_err(|_| {
            ApprovalError::refused(
                ApprovalErrorCode::InvalidAction,
                format!("unknown change action '{}'", input.action),
            )
        })?;

        let change = PendingChange::submit(
            NewPendingChange {
                id: Uuid::new_v4().to_string(),
                workspace_id: actor.workspace_id(),
                requester: actor.subject().to_owned(),
                entity_kind,
                entity_id: input.entity_id,
                action,
                payload: input.payload,
            },
            current_time(),
        )
        .map_err(|error| ApprovalError::refused(ApprovalErrorCode::InvalidData, error.detail()))?;

        self.repository.insert(&change).await?;

        info!(
            workspace_id = %change.workspace_id(),
            subject = actor.subject(),
            change_id = change.id(),
            entity_kind = %entity_kind,
            action = %action,
            "pending change submitted"
        );

        self.notify(ChangeEventKind::Created, &change, None, actor);
        self.audit(AuditAction::PendingChangeSubmitted, &change, actor)
            .await;

        Ok(change)
    }

    /// Approves a pending change and applies it to the catalog.
    ///
    /// The approved status is persisted only after the mutation succeeded. A
    /// failed mutation leaves the change pending. A create is applied under
    /// the change id, so concurrent approvals of one create insert a single
    /// record.
    pub async fn approve(
        &self,
        actor: &UserIdentity,
        change_id: &str,
    ) -> Result<ApprovedChange, ApprovalError> {
        let change = self.load(actor, change_id).await?;
        self.require(actor, Permission::ChangeReview).await?;

        let approved = change
            .approve(actor.subject(), current_time())
            .map_err(|already| already_reviewed(change_id, already.status))?;

        let applied = self
            .router
            .apply(
                approved.workspace_id(),
                approved.entity_kind(),
                approved.action(),
                approved.entity_id(),
                approved.payload(),
            )
            .await;
        let entity_id = match applied {
            Ok(entity_id) => entity_id,
            Err(error) => {
                // Losing a race against another reviewer surfaces as a failed write.
                let current = self.load(actor, change_id).await?;
                if !current.is_pending() {
                    return Err(already_reviewed(change_id, current.status()));
                }
                warn!(
                    error = %error,
                    change_id,
                    entity_kind = %change.entity_kind(),
                    "approved change could not be applied, leaving it pending"
                );
                return Err(ApprovalError::from(error));
            }
        };

        if !self.repository.save_review(&approved).await? {
            // Another reviewer finished first; the mutation above is already applied.
            warn!(
                workspace_id = %change.workspace_id(),
                change_id,
                entity_id = %entity_id,
                "pending change was reviewed concurrently after its mutation was applied"
            );
            let current = self.load(actor, change_id).await?;
            return Err(already_reviewed(change_id, current.status()));
        }

        info!(
            workspace_id = %approved.workspace_id(),
            reviewer = actor.subject(),
            change_id,
            entity_id = %entity_id,
            "pending change approved"
        );

        self.notify(
            ChangeEventKind::Approved,
            &approved,
            Some(entity_id.clone()),
            actor,
        );
        self.audit(AuditAction::PendingChangeApproved, &approved, actor)
            .await;

        Ok(ApprovedChange {
            change: approved,
            entity_id,
        })
    }

    /// Rejects a pending change without touching the catalog.
    pub async fn reject(
        &self,
        actor: &UserIdentity,
        change_id: &str,
        reason: &str,
    ) -> Result<PendingChange, ApprovalError> {
        let reason = NonEmptyString::new(reason).map_err(|_| {
            ApprovalError::refused(
                ApprovalErrorCode::ReasonRequired,
                "a rejection reason is required",
            )
        })?;
        let change = self.load(actor, change_id).await?;
        self.require(actor, Permission::ChangeReview).await?;

        let rejected = change
            .reject(actor.subject(), reason, current_time())
            .map_err(|already| already_reviewed(change_id, already.status))?;

        if !self.repository.save_review(&rejected).await? {
            let current = self.load(actor, change_id).await?;
            return Err(already_reviewed(change_id, current.status()));
        }

        info!(
            workspace_id = %rejected.workspace_id(),
            reviewer = actor.subject(),
            change_id,
            "pending change rejected"
        );

        self.notify(ChangeEventKind::Rejected, &rejected, None, actor);
        self.audit(AuditAction::PendingChangeRejected, &rejected, actor)
            .await;

        Ok(rejected)
    }

    /// Removes a change regardless of its status. Administrative only.
    pub async fn delete(&self, actor: &UserIdentity, change_id: &str) -> Result<(), ApprovalError> {
        self.require(actor, Permission::ChangeAdminister).await?;
        let change = self.load(actor, change_id).await?;

        if !self
            .repository
            .delete(actor.workspace_id(), change_id)
            .await?
        {
            return Err(ApprovalError::refused(
                ApprovalErrorCode::NotFound,
                format!("pending change '{change_id}' does not exist"),
            ));
        }

        self.audit(AuditAction::PendingChangeDeleted, &change, actor)
            .await;

        Ok(())
    }
}

fn already_reviewed(change_id: &str, status: PendingChangeStatus) -> ApprovalError {
    ApprovalError::refused(
        ApprovalErrorCode::AlreadyReviewed,
        format!("pending change '{change_id}' was already {status}"),
    )
}
