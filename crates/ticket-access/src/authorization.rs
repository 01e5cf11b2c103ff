//! Concurrent permission and premium lookup
//!
//! Both facts are fetched concurrently under one lookup deadline that is
//! shorter than, and independent of, the invocation deadline. A failed
//! premium lookup degrades to `PremiumTier::None`; a failed permission
//! lookup aborts the invocation. When the lookup deadline elapses both
//! facts keep their fail-closed defaults and dispatch continues.

use std::sync::Arc;
use std::time::Duration;
use ticket_model::{
    AuthorizationFacts, ExternalError, GuildId, Member, PermissionLevel, PremiumTier,
};

/// Default lookup deadline
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Resolves a member's permission level
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Permission level of `member` in `guild_id`
    async fn permission_level(
        &self,
        guild_id: GuildId,
        member: &Member,
    ) -> Result<PermissionLevel, ExternalError>;
}

/// Resolves a guild's premium tier
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PremiumProvider: Send + Sync {
    /// Premium tier of `guild_id`
    async fn premium_tier(&self, guild_id: GuildId) -> Result<PremiumTier, ExternalError>;
}

/// Authorization failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthorizationError {
    /// Permission level could not be resolved
    #[error("permission lookup failed: {0}")]
    PermissionLookup(#[source] ExternalError),
}

/// Fetches [`AuthorizationFacts`] for guild invocations
#[derive(Clone)]
pub struct AuthorizationResolver {
    permissions: Arc<dyn PermissionProvider>,
    premium: Arc<dyn PremiumProvider>,
    lookup_timeout: Duration,
}

impl AuthorizationResolver {
    /// Resolver with the default 2s lookup deadline
    #[must_use]
    pub fn new(permissions: Arc<dyn PermissionProvider>, premium: Arc<dyn PremiumProvider>) -> Self {
        Self {
            permissions,
            premium,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Builder: lookup deadline
    #[must_use]
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Resolve facts for an invocation
    ///
    /// `target` is `None` outside guild context, in which case no provider
    /// is called and the fail-closed defaults are returned.
    ///
    /// # Errors
    ///
    /// [`AuthorizationError::PermissionLookup`] when the permission provider fails.
    pub async fn resolve(
        &self,
        target: Option<(GuildId, &Member)>,
    ) -> Result<AuthorizationFacts, AuthorizationError> {
        let Some((guild_id, member)) = target else {
            return Ok(AuthorizationFacts::default());
        };

        let premium = async {
            let tier = self
                .premium
                .premium_tier(guild_id)
                .await
                .unwrap_or_else(|err| {
                    tracing::warn!(
                        guild_id = %guild_id,
                        error = %err,
                        "Premium lookup failed, defaulting to no premium"
                    );
                    PremiumTier::None
                });
            Ok::<_, AuthorizationError>(tier)
        };
        let permission = async {
            self.permissions
                .permission_level(guild_id, member)
                .await
                .map_err(AuthorizationError::PermissionLookup)
        };

        match tokio::time::timeout(self.lookup_timeout, async {
            tokio::try_join!(permission, premium)
        })
        .await
        {
            Ok(Ok((permission_level, premium_tier))) => {
                Ok(AuthorizationFacts::new(permission_level, premium_tier))
            }
            Ok(Err(err)) => Err(err),
            Err(_) => {
                tracing::warn!(
                    guild_id = %guild_id,
                    user_id = %member.user.id,
                    timeout_ms = u64::try_from(self.lookup_timeout.as_millis()).unwrap_or(u64::MAX),
                    "Authorization lookup deadline elapsed, using defaults"
                );
                Ok(AuthorizationFacts::default())
            }
        }
    }

    /// Resolve only the permission level, bounded by `timeout`
    ///
    /// # Errors
    ///
    /// [`AuthorizationError::PermissionLookup`] on provider failure or when
    /// `timeout` elapses.
    pub async fn permission_level(
        &self,
        guild_id: GuildId,
        member: &Member,
        timeout: Duration,
    ) -> Result<PermissionLevel, AuthorizationError> {
        match tokio::time::timeout(timeout, self.permissions.permission_level(guild_id, member))
            .await
        {
            Ok(result) => result.map_err(AuthorizationError::PermissionLookup),
            Err(_) => Err(AuthorizationError::PermissionLookup(
                ExternalError::DeadlineExceeded,
            )),
        }
    }
}

impl std::fmt::Debug for AuthorizationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationResolver")
            .field("lookup_timeout", &self.lookup_timeout)
            .finish_non_exhaustive()
    }
}
