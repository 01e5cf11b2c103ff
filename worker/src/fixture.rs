//! In-memory collaborators seeded from a JSON fixture
//!
//! Used by `replay` to run an interaction end to end without a platform
//! connection. Anything a fixture leaves out behaves like a fresh guild:
//! members are `Everyone`, guilds have no premium, nothing is blacklisted.

#![allow(missing_docs)]

use crate::commands::GuildDirectory;
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use ticket_access::{
    BlacklistRecord, BlacklistRepository, InMemoryBlacklistRepository, PermissionProvider,
    PremiumProvider,
};
use ticket_command::{AliasResolver, Tag};
use ticket_model::{
    CommandId, ExternalError, GuildId, Member, PermissionLevel, PremiumTier, RoleId, TeamId,
    UnknownResource, User, UserId,
};
use ticket_oncall::{InMemoryOnCallRepository, RoleProvider, SupportTeam};

/// First id handed out for roles created during a replay
pub const FIRST_CREATED_ROLE: u64 = 1_000_000;

/// Permission level of one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub level: PermissionLevel,
}

/// Premium tier of one guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumGrant {
    pub guild_id: GuildId,
    pub tier: PremiumTier,
}

/// Tag reachable as a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAlias {
    pub guild_id: GuildId,
    pub command_id: CommandId,
    pub tag: Tag,
}

/// Blacklisted guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildEntry {
    pub guild_id: GuildId,
    #[serde(flatten)]
    pub record: BlacklistRecord,
}

/// Globally blacklisted user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    pub user_id: UserId,
    #[serde(flatten)]
    pub record: BlacklistRecord,
}

/// Guild-scoped (guild, user) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildUser {
    pub guild_id: GuildId,
    pub user_id: UserId,
}

/// Guild-scoped (guild, role) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRole {
    pub guild_id: GuildId,
    pub role_id: RoleId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlacklistFixture {
    pub guilds: Vec<GuildEntry>,
    pub users: Vec<UserEntry>,
    pub members: Vec<GuildUser>,
    pub roles: Vec<GuildRole>,
}

/// Team with its guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamEntry {
    pub guild_id: GuildId,
    #[serde(flatten)]
    pub team: SupportTeam,
}

/// Team membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub team_id: TeamId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnCallFixture {
    /// Guilds using thread mode
    pub thread_mode: Vec<GuildId>,
    pub teams: Vec<TeamEntry>,
    pub default_team: Vec<GuildUser>,
    pub team_members: Vec<TeamMember>,
    /// Recorded guild-wide on-call roles
    pub guild_roles: Vec<GuildRole>,
}

/// Guild owner as the platform reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildOwner {
    pub guild_id: GuildId,
    pub owner_id: UserId,
}

/// Seed data for [`FixtureServices`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub permissions: Vec<PermissionGrant>,
    pub premium: Vec<PremiumGrant>,
    pub tags: Vec<TagAlias>,
    pub blacklist: BlacklistFixture,
    pub on_call: OnCallFixture,
    /// Roles that exist on the platform
    pub roles: Vec<GuildRole>,
    pub guild_owners: Vec<GuildOwner>,
}

impl Fixture {
    /// Read a JSON fixture
    ///
    /// # Errors
    ///
    /// I/O or decoding failure.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Every external collaborator the worker needs, held in memory
#[derive(Debug, Default)]
pub struct FixtureServices {
    permissions: DashMap<(GuildId, UserId), PermissionLevel>,
    premium: DashMap<GuildId, PremiumTier>,
    tags: DashMap<(GuildId, CommandId), Tag>,
    owners: DashMap<GuildId, UserId>,
    platform_roles: DashSet<(GuildId, RoleId)>,
    assignments: DashSet<(GuildId, UserId, RoleId)>,
    next_role: AtomicU64,
    blacklist: Arc<InMemoryBlacklistRepository>,
    on_call: Arc<InMemoryOnCallRepository>,
}

impl FixtureServices {
    /// Services seeded from `fixture`
    ///
    /// # Errors
    ///
    /// Seeding the blacklist repository failed.
    pub async fn seed(fixture: Fixture) -> Result<Self, ExternalError> {
        let services = Self {
            next_role: AtomicU64::new(FIRST_CREATED_ROLE),
            ..Self::default()
        };

        for grant in fixture.permissions {
            services
                .permissions
                .insert((grant.guild_id, grant.user_id), grant.level);
        }
        for grant in fixture.premium {
            services.premium.insert(grant.guild_id, grant.tier);
        }
        for alias in fixture.tags {
            services
                .tags
                .insert((alias.guild_id, alias.command_id), alias.tag);
        }
        for owner in fixture.guild_owners {
            services.owners.insert(owner.guild_id, owner.owner_id);
        }
        for role in fixture.roles {
            services.platform_roles.insert((role.guild_id, role.role_id));
        }

        let blacklist = fixture.blacklist;
        for entry in blacklist.guilds {
            services.blacklist.put_guild(entry.guild_id, entry.record).await?;
        }
        for entry in blacklist.users {
            services.blacklist.put_user(entry.user_id, entry.record).await?;
        }
        for member in blacklist.members {
            services.blacklist.add_member(member.guild_id, member.user_id);
        }
        for role in blacklist.roles {
            services.blacklist.add_role(role.guild_id, role.role_id);
        }

        let on_call = fixture.on_call;
        for guild_id in on_call.thread_mode {
            services.on_call.set_thread_mode(guild_id, true);
        }
        for entry in on_call.teams {
            services.on_call.put_team(entry.guild_id, entry.team);
        }
        for member in on_call.default_team {
            services
                .on_call
                .add_default_team_member(member.guild_id, member.user_id);
        }
        for member in on_call.team_members {
            services
                .on_call
                .add_team_member(member.guild_id, member.user_id, member.team_id);
        }
        for role in on_call.guild_roles {
            services.on_call.set_guild_role(role.guild_id, Some(role.role_id));
        }

        Ok(services)
    }

    /// Blacklist repository
    #[must_use]
    pub fn blacklist(&self) -> Arc<InMemoryBlacklistRepository> {
        Arc::clone(&self.blacklist)
    }

    /// On-call repository
    #[must_use]
    pub fn on_call(&self) -> Arc<InMemoryOnCallRepository> {
        Arc::clone(&self.on_call)
    }

    /// Whether `user_id` currently holds `role_id`
    #[must_use]
    pub fn has_role(&self, guild_id: GuildId, user_id: UserId, role_id: RoleId) -> bool {
        self.assignments.contains(&(guild_id, user_id, role_id))
    }

    /// Delete a role out-of-band
    pub fn delete_role(&self, guild_id: GuildId, role_id: RoleId) {
        self.platform_roles.remove(&(guild_id, role_id));
        self.assignments.retain(|(g, _, r)| !(*g == guild_id && *r == role_id));
    }
}

#[async_trait::async_trait]
impl PermissionProvider for FixtureServices {
    async fn permission_level(
        &self,
        guild_id: GuildId,
        member: &Member,
    ) -> Result<PermissionLevel, ExternalError> {
        if self.owners.get(&guild_id).is_some_and(|o| *o == member.user.id) {
            return Ok(PermissionLevel::Admin);
        }
        Ok(self
            .permissions
            .get(&(guild_id, member.user.id))
            .map(|l| *l)
            .unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl PremiumProvider for FixtureServices {
    async fn premium_tier(&self, guild_id: GuildId) -> Result<PremiumTier, ExternalError> {
        Ok(self.premium.get(&guild_id).map(|t| *t).unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl AliasResolver for FixtureServices {
    async fn lookup_alias(
        &self,
        guild_id: GuildId,
        command_id: CommandId,
    ) -> Result<Option<Tag>, ExternalError> {
        Ok(self
            .tags
            .get(&(guild_id, command_id))
            .map(|t| t.value().clone()))
    }
}

#[async_trait::async_trait]
impl RoleProvider for FixtureServices {
    async fn create_role(&self, guild_id: GuildId, name: &str) -> Result<RoleId, ExternalError> {
        let role_id = RoleId(self.next_role.fetch_add(1, Ordering::SeqCst));
        self.platform_roles.insert((guild_id, role_id));
        tracing::debug!(guild_id = %guild_id, role_id = %role_id, name, "Created role");
        Ok(role_id)
    }

    async fn assign_role(
        &self,
        guild_id: GuildId,
        user: &User,
        role_id: RoleId,
        audit_reason: &str,
    ) -> Result<(), ExternalError> {
        if !self.platform_roles.contains(&(guild_id, role_id)) {
            return Err(ExternalError::NotFound(UnknownResource::Role));
        }
        self.assignments.insert((guild_id, user.id, role_id));
        tracing::debug!(guild_id = %guild_id, role_id = %role_id, audit_reason, "Assigned role");
        Ok(())
    }

    async fn unassign_role(
        &self,
        guild_id: GuildId,
        user: &User,
        role_id: RoleId,
        audit_reason: &str,
    ) -> Result<(), ExternalError> {
        if !self.platform_roles.contains(&(guild_id, role_id)) {
            return Err(ExternalError::NotFound(UnknownResource::Role));
        }
        self.assignments.remove(&(guild_id, user.id, role_id));
        tracing::debug!(guild_id = %guild_id, role_id = %role_id, audit_reason, "Removed role");
        Ok(())
    }
}

#[async_trait::async_trait]
impl GuildDirectory for FixtureServices {
    async fn owner_id(&self, guild_id: GuildId) -> Result<Option<UserId>, ExternalError> {
        Ok(self.owners.get(&guild_id).map(|o| *o))
    }
}
