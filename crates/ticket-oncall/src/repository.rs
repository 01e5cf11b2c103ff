//! On-call persistence

use crate::role_sync::{RoleStateStore, RoleTarget};
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ticket_model::{ExternalError, GuildId, Member, RoleId, TeamId, UserId};

/// Support team with its on-call role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportTeam {
    /// Team id
    pub id: TeamId,
    /// Display name
    pub name: String,
    /// Recorded on-call role
    #[serde(default)]
    pub on_call_role: Option<RoleId>,
}

/// Teams a member belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberTeams {
    /// Member of the guild's default team
    pub default_team: bool,
    /// Other teams, in membership order
    pub team_ids: Vec<TeamId>,
}

/// Settings, on-call flags and team data
#[async_trait::async_trait]
pub trait OnCallRepository: Send + Sync {
    /// Whether the guild uses thread mode
    async fn uses_threads(&self, guild_id: GuildId) -> Result<bool, ExternalError>;

    /// Flip the member's on-call flag; returns the new value
    async fn toggle_on_call(&self, guild_id: GuildId, user_id: UserId)
        -> Result<bool, ExternalError>;

    /// Teams the member belongs to, directly or through one of their roles
    async fn member_teams(
        &self,
        guild_id: GuildId,
        member: &Member,
    ) -> Result<MemberTeams, ExternalError>;

    /// Teams by id; unknown ids are omitted
    async fn teams(
        &self,
        guild_id: GuildId,
        team_ids: &[TeamId],
    ) -> Result<HashMap<TeamId, SupportTeam>, ExternalError>;

    /// Guild-wide on-call role
    async fn guild_on_call_role(&self, guild_id: GuildId) -> Result<Option<RoleId>, ExternalError>;
}

/// In-memory repository, also the role state store
#[derive(Debug, Default)]
pub struct InMemoryOnCallRepository {
    thread_mode: DashSet<GuildId>,
    on_call: DashSet<(GuildId, UserId)>,
    default_team: DashSet<(GuildId, UserId)>,
    memberships: DashMap<(GuildId, UserId), Vec<TeamId>>,
    role_teams: DashMap<(GuildId, RoleId), Vec<TeamId>>,
    teams: DashMap<(GuildId, TeamId), SupportTeam>,
    guild_roles: DashMap<GuildId, RoleId>,
}

impl InMemoryOnCallRepository {
    /// Empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable thread mode
    pub fn set_thread_mode(&self, guild_id: GuildId, enabled: bool) {
        if enabled {
            self.thread_mode.insert(guild_id);
        } else {
            self.thread_mode.remove(&guild_id);
        }
    }

    /// Add a member to the default team
    pub fn add_default_team_member(&self, guild_id: GuildId, user_id: UserId) {
        self.default_team.insert((guild_id, user_id));
    }

    /// Create or replace a team
    pub fn put_team(&self, guild_id: GuildId, team: SupportTeam) {
        self.teams.insert((guild_id, team.id), team);
    }

    /// Add a member to a team
    pub fn add_team_member(&self, guild_id: GuildId, user_id: UserId, team_id: TeamId) {
        self.memberships
            .entry((guild_id, user_id))
            .or_default()
            .push(team_id);
    }

    /// Grant team membership to everyone holding `role_id`
    pub fn add_team_role(&self, guild_id: GuildId, role_id: RoleId, team_id: TeamId) {
        self.role_teams
            .entry((guild_id, role_id))
            .or_default()
            .push(team_id);
    }

    /// Set the guild-wide on-call role
    pub fn set_guild_role(&self, guild_id: GuildId, role_id: Option<RoleId>) {
        match role_id {
            Some(role_id) => self.guild_roles.insert(guild_id, role_id),
            None => self.guild_roles.remove(&guild_id).map(|(_, r)| r),
        };
    }

    /// Recorded role for a team
    #[must_use]
    pub fn team_role(&self, guild_id: GuildId, team_id: TeamId) -> Option<RoleId> {
        self.teams
            .get(&(guild_id, team_id))
            .and_then(|t| t.on_call_role)
    }

    /// Recorded guild-wide role
    #[must_use]
    pub fn guild_role(&self, guild_id: GuildId) -> Option<RoleId> {
        self.guild_roles.get(&guild_id).map(|r| *r)
    }

    /// Current on-call flag
    #[must_use]
    pub fn is_on_call(&self, guild_id: GuildId, user_id: UserId) -> bool {
        self.on_call.contains(&(guild_id, user_id))
    }
}

#[async_trait::async_trait]
impl OnCallRepository for InMemoryOnCallRepository {
    async fn uses_threads(&self, guild_id: GuildId) -> Result<bool, ExternalError> {
        Ok(self.thread_mode.contains(&guild_id))
    }

    async fn toggle_on_call(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<bool, ExternalError> {
        let key = (guild_id, user_id);
        if self.on_call.remove(&key).is_some() {
            Ok(false)
        } else {
            self.on_call.insert(key);
            Ok(true)
        }
    }

    async fn member_teams(
        &self,
        guild_id: GuildId,
        member: &Member,
    ) -> Result<MemberTeams, ExternalError> {
        let key = (guild_id, member.user.id);
        let mut team_ids = self
            .memberships
            .get(&key)
            .map(|ids| ids.clone())
            .unwrap_or_default();

        for role_id in &member.roles {
            if let Some(ids) = self.role_teams.get(&(guild_id, *role_id)) {
                for id in ids.iter() {
                    if !team_ids.contains(id) {
                        team_ids.push(*id);
                    }
                }
            }
        }

        Ok(MemberTeams {
            default_team: self.default_team.contains(&key),
            team_ids,
        })
    }

    async fn teams(
        &self,
        guild_id: GuildId,
        team_ids: &[TeamId],
    ) -> Result<HashMap<TeamId, SupportTeam>, ExternalError> {
        Ok(team_ids
            .iter()
            .filter_map(|id| self.teams.get(&(guild_id, *id)).map(|t| (*id, t.clone())))
            .collect())
    }

    async fn guild_on_call_role(
        &self,
        guild_id: GuildId,
    ) -> Result<Option<RoleId>, ExternalError> {
        Ok(self.guild_role(guild_id))
    }
}

#[async_trait::async_trait]
impl RoleStateStore for InMemoryOnCallRepository {
    async fn set_role_id(
        &self,
        guild_id: GuildId,
        target: &RoleTarget,
        role_id: Option<RoleId>,
    ) -> Result<(), ExternalError> {
        match target {
            RoleTarget::Guild => self.set_guild_role(guild_id, role_id),
            RoleTarget::Team { id, .. } => {
                if let Some(mut team) = self.teams.get_mut(&(guild_id, *id)) {
                    team.on_call_role = role_id;
                }
            }
        }
        Ok(())
    }
}
