use serde::{Deserialize, Serialize};

use crate::WorkspaceId;

/// Caller identity resolved by the upstream authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    subject: String,
    display_name: String,
    email: Option<String>,
    workspace_id: WorkspaceId,
}

impl UserIdentity {
    /// Creates a user identity from authentication and workspace data.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        display_name: impl Into<String>,
        email: Option<String>,
        workspace_id: WorkspaceId,
    ) -> Self {
        Self {
            subject: subject.into(),
            display_name: display_name.into(),
            email,
            workspace_id,
        }
    }

    /// Returns the stable subject claim from the identity provider.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the email, if the provider returned one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the workspace the identity is acting in.
    #[must_use]
    pub fn workspace_id(&self) -> WorkspaceId {
        self.workspace_id
    }
}
