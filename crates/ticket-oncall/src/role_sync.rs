//! Bounded-retry role synchronization
//!
//! ```text
//! NoRole ──► Creating ──► Assigning ──► Assigned
//!   ▲                        │
//!   └──── role not found ────┘
//! ```
//!
//! At most [`MAX_ATTEMPTS`] assignments are made: one race against an
//! out-of-band deletion is tolerated, a second yields
//! [`RoleSyncError::RetryLimitExceeded`].

use std::fmt;
use std::sync::Arc;
use ticket_command::CommandError;
use ticket_model::{ExternalError, GuildId, RoleId, TeamId, User};

/// Maximum assignment attempts per sync
pub const MAX_ATTEMPTS: u32 = 2;

/// Which on-call role a sync concerns
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoleTarget {
    /// Guild-wide on-call role
    Guild,
    /// A support team's on-call role
    Team {
        /// Team id
        id: TeamId,
        /// Team name, used when creating the role
        name: String,
    },
}

impl RoleTarget {
    /// Name given to a newly created role
    #[must_use]
    pub fn role_name(&self) -> String {
        match self {
            Self::Guild => "On Call".to_owned(),
            Self::Team { name, .. } => format!("On Call - {name}"),
        }
    }
}

impl fmt::Display for RoleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guild => f.write_str("guild"),
            Self::Team { id, .. } => write!(f, "{id}"),
        }
    }
}

/// A target with its recorded role id, which may be stale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignmentTarget {
    /// Guild-wide or team role
    pub target: RoleTarget,
    /// Recorded role id
    pub role_id: Option<RoleId>,
}

impl RoleAssignmentTarget {
    /// Guild-wide target
    #[must_use]
    pub fn guild(role_id: Option<RoleId>) -> Self {
        Self {
            target: RoleTarget::Guild,
            role_id,
        }
    }

    /// Team target
    #[must_use]
    pub fn team(id: TeamId, name: impl Into<String>, role_id: Option<RoleId>) -> Self {
        Self {
            target: RoleTarget::Team {
                id,
                name: name.into(),
            },
            role_id,
        }
    }
}

/// Sync progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleSyncState {
    /// No usable role recorded
    NoRole,
    /// Creating the role externally
    Creating,
    /// Assigning the role to the actor
    Assigning,
    /// Actor holds the role
    Assigned,
}

/// Role sync failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoleSyncError {
    /// The role kept disappearing
    #[error("reached retry limit after {attempts} attempts")]
    RetryLimitExceeded {
        /// Assignments made
        attempts: u32,
    },

    /// External failure other than a missing role
    #[error(transparent)]
    External(#[from] ExternalError),
}

impl From<RoleSyncError> for CommandError {
    fn from(err: RoleSyncError) -> Self {
        match err {
            RoleSyncError::External(inner) => Self::External(inner),
            retry @ RoleSyncError::RetryLimitExceeded { .. } => Self::internal(retry.to_string()),
        }
    }
}

/// Guild role operations
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RoleProvider: Send + Sync {
    /// Create a role
    async fn create_role(&self, guild_id: GuildId, name: &str) -> Result<RoleId, ExternalError>;

    /// Give `role_id` to `user`; fails with an unknown-role error if it was deleted
    async fn assign_role(
        &self,
        guild_id: GuildId,
        user: &User,
        role_id: RoleId,
        audit_reason: &str,
    ) -> Result<(), ExternalError>;

    /// Take `role_id` from `user`
    async fn unassign_role(
        &self,
        guild_id: GuildId,
        user: &User,
        role_id: RoleId,
        audit_reason: &str,
    ) -> Result<(), ExternalError>;
}

/// Persisted role ids
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RoleStateStore: Send + Sync {
    /// Record (or clear) the role id for `target`
    async fn set_role_id(
        &self,
        guild_id: GuildId,
        target: &RoleTarget,
        role_id: Option<RoleId>,
    ) -> Result<(), ExternalError>;
}

/// Drives the role-sync state machine
#[derive(Clone)]
pub struct RoleSynchronizer {
    roles: Arc<dyn RoleProvider>,
    state: Arc<dyn RoleStateStore>,
}

impl RoleSynchronizer {
    /// Synchronizer over the given collaborators
    #[must_use]
    pub fn new(roles: Arc<dyn RoleProvider>, state: Arc<dyn RoleStateStore>) -> Self {
        Self { roles, state }
    }

    /// Make sure `actor` holds the role for `target`, creating it if needed
    ///
    /// `target.role_id` is updated to reflect what was persisted.
    ///
    /// # Errors
    ///
    /// [`RoleSyncError::RetryLimitExceeded`] after [`MAX_ATTEMPTS`] assignments
    /// found the role missing; [`RoleSyncError::External`] for anything else.
    pub async fn ensure_assigned(
        &self,
        guild_id: GuildId,
        actor: &User,
        target: &mut RoleAssignmentTarget,
    ) -> Result<RoleId, RoleSyncError> {
        let reason = format!("Added on-call role to {}", actor.username);
        let mut attempts = 0;
        let mut state = if target.role_id.is_some() {
            RoleSyncState::Assigning
        } else {
            RoleSyncState::NoRole
        };

        loop {
            tracing::trace!(target = %target.target, ?state, attempts, "Role sync step");
            state = match (state, target.role_id) {
                (RoleSyncState::Assigned, Some(role_id)) => return Ok(role_id),
                (_, _) if attempts >= MAX_ATTEMPTS => {
                    return Err(RoleSyncError::RetryLimitExceeded { attempts });
                }
                (RoleSyncState::Creating, _) => {
                    let role_id = self
                        .roles
                        .create_role(guild_id, &target.target.role_name())
                        .await?;
                    self.state
                        .set_role_id(guild_id, &target.target, Some(role_id))
                        .await?;
                    target.role_id = Some(role_id);
                    RoleSyncState::Assigning
                }
                (RoleSyncState::Assigning, Some(role_id)) => {
                    attempts += 1;
                    match self
                        .roles
                        .assign_role(guild_id, actor, role_id, &reason)
                        .await
                    {
                        Ok(()) => RoleSyncState::Assigned,
                        Err(err) if err.is_unknown_role() => {
                            tracing::warn!(
                                guild_id = %guild_id,
                                target = %target.target,
                                role_id = %role_id,
                                attempt = attempts,
                                "On-call role was deleted, clearing and recreating"
                            );
                            self.state.set_role_id(guild_id, &target.target, None).await?;
                            target.role_id = None;
                            RoleSyncState::NoRole
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                (_, _) => RoleSyncState::Creating,
            };
        }
    }

    /// Make sure `actor` no longer holds the role for `target`
    ///
    /// A role that no longer exists counts as removed; its stale id is cleared.
    ///
    /// # Errors
    ///
    /// [`RoleSyncError::External`] for failures other than a missing role.
    pub async fn ensure_unassigned(
        &self,
        guild_id: GuildId,
        actor: &User,
        target: &mut RoleAssignmentTarget,
    ) -> Result<(), RoleSyncError> {
        let Some(role_id) = target.role_id else {
            return Ok(());
        };

        let reason = match target.target {
            RoleTarget::Guild => format!("Removed on-call role from {}", actor.username),
            RoleTarget::Team { .. } => {
                format!("Removed team on-call role from {}", actor.username)
            }
        };

        match self
            .roles
            .unassign_role(guild_id, actor, role_id, &reason)
            .await
        {
            Ok(()) => Ok(()),
            Err(err) if err.is_unknown_role() => {
                tracing::warn!(
                    guild_id = %guild_id,
                    target = %target.target,
                    role_id = %role_id,
                    "On-call role was already deleted, clearing"
                );
                self.state.set_role_id(guild_id, &target.target, None).await?;
                target.role_id = None;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl fmt::Debug for RoleSynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleSynchronizer").finish_non_exhaustive()
    }
}
