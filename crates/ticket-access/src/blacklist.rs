//! Guild and user blacklist with a read-through cache
//!
//! Reads on the dispatch path go through a moka cache keyed by guild or
//! user id; negative results are cached too. Writes update the repository
//! first, then the cache.
//!
//! Every write bumps a per-key generation. A read only caches what it
//! fetched when no write to that key landed in between, so a slow read
//! can never overwrite a newer blacklist entry with a stale miss.

use dashmap::DashMap;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use ticket_model::{ExternalError, GuildId, RoleId, UserId};

/// Default cache capacity per key space
pub const DEFAULT_CACHE_CAPACITY: u64 = 100_000;

/// Why and on whose behalf a guild or user was blacklisted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistRecord {
    /// Free-text reason
    #[serde(default)]
    pub reason: Option<String>,
    /// Platform-reported guild owner at blacklist time
    #[serde(default)]
    pub owner_id: Option<UserId>,
    /// Beneficiary distinct from the reported owner
    #[serde(default)]
    pub real_owner_id: Option<UserId>,
}

impl BlacklistRecord {
    /// Record with a reason only
    #[must_use]
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// Blacklist store failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlacklistError {
    /// Backing repository failed
    #[error("blacklist repository error: {0}")]
    Repository(#[from] ExternalError),
}

impl From<BlacklistError> for ticket_command::CommandError {
    fn from(err: BlacklistError) -> Self {
        match err {
            BlacklistError::Repository(inner) => Self::External(inner),
        }
    }
}

/// Persistent blacklist storage
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait BlacklistRepository: Send + Sync {
    /// Record for a blacklisted guild
    async fn guild_record(&self, guild_id: GuildId)
        -> Result<Option<BlacklistRecord>, ExternalError>;

    /// Record for a globally blacklisted user
    async fn user_record(&self, user_id: UserId) -> Result<Option<BlacklistRecord>, ExternalError>;

    /// Whether a guild blacklisted this user or one of their roles
    async fn is_member_blacklisted(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        roles: &[RoleId],
    ) -> Result<bool, ExternalError>;

    /// Insert or replace a guild record
    async fn put_guild(&self, guild_id: GuildId, record: BlacklistRecord)
        -> Result<(), ExternalError>;

    /// Remove a guild record; returns whether one existed
    async fn delete_guild(&self, guild_id: GuildId) -> Result<bool, ExternalError>;

    /// Insert or replace a user record
    async fn put_user(&self, user_id: UserId, record: BlacklistRecord) -> Result<(), ExternalError>;

    /// Remove a user record; returns whether one existed
    async fn delete_user(&self, user_id: UserId) -> Result<bool, ExternalError>;

    /// Guild records naming `user_id` as (recorded owner, real owner)
    async fn owner_counts(&self, user_id: UserId) -> Result<(usize, usize), ExternalError>;
}

/// In-memory repository
#[derive(Debug, Default)]
pub struct InMemoryBlacklistRepository {
    guilds: DashMap<GuildId, BlacklistRecord>,
    users: DashMap<UserId, BlacklistRecord>,
    members: DashMap<GuildId, HashSet<UserId>>,
    roles: DashMap<GuildId, HashSet<RoleId>>,
}

impl InMemoryBlacklistRepository {
    /// Empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blacklist a user within one guild
    pub fn add_member(&self, guild_id: GuildId, user_id: UserId) {
        self.members.entry(guild_id).or_default().insert(user_id);
    }

    /// Blacklist a role within one guild
    pub fn add_role(&self, guild_id: GuildId, role_id: RoleId) {
        self.roles.entry(guild_id).or_default().insert(role_id);
    }
}

#[async_trait::async_trait]
impl BlacklistRepository for InMemoryBlacklistRepository {
    async fn guild_record(
        &self,
        guild_id: GuildId,
    ) -> Result<Option<BlacklistRecord>, ExternalError> {
        Ok(self.guilds.get(&guild_id).map(|r| r.value().clone()))
    }

    async fn user_record(&self, user_id: UserId) -> Result<Option<BlacklistRecord>, ExternalError> {
        Ok(self.users.get(&user_id).map(|r| r.value().clone()))
    }

    async fn is_member_blacklisted(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        roles: &[RoleId],
    ) -> Result<bool, ExternalError> {
        let by_user = self
            .members
            .get(&guild_id)
            .is_some_and(|set| set.contains(&user_id));
        let by_role = self
            .roles
            .get(&guild_id)
            .is_some_and(|set| roles.iter().any(|r| set.contains(r)));
        Ok(by_user || by_role)
    }

    async fn put_guild(
        &self,
        guild_id: GuildId,
        record: BlacklistRecord,
    ) -> Result<(), ExternalError> {
        self.guilds.insert(guild_id, record);
        Ok(())
    }

    async fn delete_guild(&self, guild_id: GuildId) -> Result<bool, ExternalError> {
        Ok(self.guilds.remove(&guild_id).is_some())
    }

    async fn put_user(&self, user_id: UserId, record: BlacklistRecord) -> Result<(), ExternalError> {
        self.users.insert(user_id, record);
        Ok(())
    }

    async fn delete_user(&self, user_id: UserId) -> Result<bool, ExternalError> {
        Ok(self.users.remove(&user_id).is_some())
    }

    async fn owner_counts(&self, user_id: UserId) -> Result<(usize, usize), ExternalError> {
        let mut owner = 0;
        let mut real_owner = 0;
        for entry in &self.guilds {
            if entry.owner_id == Some(user_id) {
                owner += 1;
            }
            if entry.real_owner_id == Some(user_id) {
                real_owner += 1;
            }
        }
        Ok((owner, real_owner))
    }
}

type CachedRecord = Option<Arc<BlacklistRecord>>;

/// Read-through cache for one key space
#[derive(Clone)]
struct RecordCache<K> {
    entries: Cache<K, CachedRecord>,
    generations: Arc<DashMap<K, u64>>,
}

impl<K> RecordCache<K>
where
    K: Hash + Eq + Copy + Send + Sync + 'static,
{
    fn new(entries: Cache<K, CachedRecord>) -> Self {
        Self {
            entries,
            generations: Arc::new(DashMap::new()),
        }
    }

    fn generation(&self, key: &K) -> u64 {
        self.generations.get(key).map_or(0, |g| *g)
    }

    async fn get(&self, key: &K) -> Option<CachedRecord> {
        self.entries.get(key).await
    }

    /// Cache a fetched record unless a write to `key` happened since `seen`
    async fn fill(&self, key: K, seen: u64, record: CachedRecord) {
        if self.generation(&key) != seen {
            return;
        }
        self.entries.insert(key, record).await;
        if self.generation(&key) != seen {
            self.entries.invalidate(&key).await;
        }
    }

    async fn write(&self, key: K, record: CachedRecord) {
        *self.generations.entry(key).or_insert(0) += 1;
        self.entries.insert(key, record).await;
    }

    fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

/// Cached blacklist facade used by the gates
#[derive(Clone)]
pub struct BlacklistStore {
    repository: Arc<dyn BlacklistRepository>,
    guilds: RecordCache<GuildId>,
    users: RecordCache<UserId>,
}

impl BlacklistStore {
    /// Store with a size-bounded cache
    #[must_use]
    pub fn new(repository: Arc<dyn BlacklistRepository>, max_capacity: u64) -> Self {
        Self {
            repository,
            guilds: RecordCache::new(Cache::new(max_capacity)),
            users: RecordCache::new(Cache::new(max_capacity)),
        }
    }

    /// Store with a size-bounded, time-expiring cache
    #[must_use]
    pub fn with_ttl(
        repository: Arc<dyn BlacklistRepository>,
        max_capacity: u64,
        ttl: Duration,
    ) -> Self {
        Self {
            repository,
            guilds: RecordCache::new(
                Cache::builder()
                    .max_capacity(max_capacity)
                    .time_to_live(ttl)
                    .build(),
            ),
            users: RecordCache::new(
                Cache::builder()
                    .max_capacity(max_capacity)
                    .time_to_live(ttl)
                    .build(),
            ),
        }
    }

    /// Record for `guild_id`, if blacklisted
    ///
    /// # Errors
    ///
    /// Repository failure on a cache miss.
    pub async fn guild_record(
        &self,
        guild_id: GuildId,
    ) -> Result<Option<Arc<BlacklistRecord>>, BlacklistError> {
        if let Some(cached) = self.guilds.get(&guild_id).await {
            return Ok(cached);
        }

        let seen = self.guilds.generation(&guild_id);
        let record = self.repository.guild_record(guild_id).await?.map(Arc::new);
        self.guilds.fill(guild_id, seen, record.clone()).await;
        Ok(record)
    }

    /// Record for `user_id`, if globally blacklisted
    ///
    /// # Errors
    ///
    /// Repository failure on a cache miss.
    pub async fn user_record(
        &self,
        user_id: UserId,
    ) -> Result<Option<Arc<BlacklistRecord>>, BlacklistError> {
        if let Some(cached) = self.users.get(&user_id).await {
            return Ok(cached);
        }

        let seen = self.users.generation(&user_id);
        let record = self.repository.user_record(user_id).await?.map(Arc::new);
        self.users.fill(user_id, seen, record.clone()).await;
        Ok(record)
    }

    /// Whether the guild is blacklisted
    ///
    /// # Errors
    ///
    /// Repository failure on a cache miss.
    pub async fn is_guild_blacklisted(&self, guild_id: GuildId) -> Result<bool, BlacklistError> {
        Ok(self.guild_record(guild_id).await?.is_some())
    }

    /// Whether the user is globally blacklisted
    ///
    /// # Errors
    ///
    /// Repository failure on a cache miss.
    pub async fn is_user_blacklisted(&self, user_id: UserId) -> Result<bool, BlacklistError> {
        Ok(self.user_record(user_id).await?.is_some())
    }

    /// Whether the guild blacklisted this member (by user or role); not cached
    ///
    /// # Errors
    ///
    /// Repository failure.
    pub async fn is_member_blacklisted(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        roles: &[RoleId],
    ) -> Result<bool, BlacklistError> {
        Ok(self
            .repository
            .is_member_blacklisted(guild_id, user_id, roles)
            .await?)
    }

    /// Blacklist a guild
    ///
    /// # Errors
    ///
    /// Repository failure; the cache is left untouched.
    pub async fn add_guild(
        &self,
        guild_id: GuildId,
        record: BlacklistRecord,
    ) -> Result<(), BlacklistError> {
        self.repository.put_guild(guild_id, record.clone()).await?;
        self.guilds.write(guild_id, Some(Arc::new(record))).await;
        tracing::info!(guild_id = %guild_id, "Guild blacklisted");
        Ok(())
    }

    /// Remove a guild from the blacklist
    ///
    /// # Errors
    ///
    /// Repository failure; the cache is left untouched.
    pub async fn remove_guild(&self, guild_id: GuildId) -> Result<bool, BlacklistError> {
        let existed = self.repository.delete_guild(guild_id).await?;
        self.guilds.write(guild_id, None).await;
        Ok(existed)
    }

    /// Blacklist a user globally
    ///
    /// # Errors
    ///
    /// Repository failure; the cache is left untouched.
    pub async fn add_user(
        &self,
        user_id: UserId,
        record: BlacklistRecord,
    ) -> Result<(), BlacklistError> {
        self.repository.put_user(user_id, record.clone()).await?;
        self.users.write(user_id, Some(Arc::new(record))).await;
        tracing::info!(user_id = %user_id, "User blacklisted");
        Ok(())
    }

    /// Remove a user from the global blacklist
    ///
    /// # Errors
    ///
    /// Repository failure; the cache is left untouched.
    pub async fn remove_user(&self, user_id: UserId) -> Result<bool, BlacklistError> {
        let existed = self.repository.delete_user(user_id).await?;
        self.users.write(user_id, None).await;
        Ok(existed)
    }

    /// Blacklisted guilds naming `user_id` as (recorded owner, real owner)
    ///
    /// # Errors
    ///
    /// Repository failure.
    pub async fn blacklisted_owner_counts(
        &self,
        user_id: UserId,
    ) -> Result<(usize, usize), BlacklistError> {
        Ok(self.repository.owner_counts(user_id).await?)
    }
}

impl std::fmt::Debug for BlacklistStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlacklistStore")
            .field("cached_guilds", &self.guilds.entry_count())
            .field("cached_users", &self.users.entry_count())
            .finish_non_exhaustive()
    }
}
