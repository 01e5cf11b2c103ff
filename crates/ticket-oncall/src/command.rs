//! The `on-call` command

use crate::repository::OnCallRepository;
use crate::role_sync::{RoleAssignmentTarget, RoleSynchronizer};
use std::sync::Arc;
use std::time::Duration;
use ticket_command::prelude::*;
use ticket_model::{Colour, ExternalError, GuildId, Member, PermissionLevel};

/// Teams considered per toggle
pub const MAX_TEAMS: usize = 5;

const ON_CALL_TIMEOUT: Duration = Duration::from_secs(8);

/// Toggles the actor's on-call status and syncs their roles
pub struct OnCallCommand {
    repository: Arc<dyn OnCallRepository>,
    roles: RoleSynchronizer,
    docs_url: String,
}

impl OnCallCommand {
    /// Command over the given repository and role synchronizer
    #[must_use]
    pub fn new(
        repository: Arc<dyn OnCallRepository>,
        roles: RoleSynchronizer,
        docs_url: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            roles,
            docs_url: docs_url.into(),
        }
    }

    async fn targets(
        &self,
        guild_id: GuildId,
        member: &Member,
    ) -> Result<Vec<RoleAssignmentTarget>, CommandError> {
        let membership = self.repository.member_teams(guild_id, member).await?;
        let team_ids: Vec<_> = membership.team_ids.into_iter().take(MAX_TEAMS).collect();
        let teams = self.repository.teams(guild_id, &team_ids).await?;

        let mut targets = Vec::with_capacity(team_ids.len() + 1);
        if membership.default_team {
            let role_id = self.repository.guild_on_call_role(guild_id).await?;
            targets.push(RoleAssignmentTarget::guild(role_id));
        }
        targets.extend(team_ids.iter().filter_map(|id| {
            teams
                .get(id)
                .map(|team| RoleAssignmentTarget::team(team.id, team.name.clone(), team.on_call_role))
        }));
        Ok(targets)
    }
}

/// Stop between role mutations once the invocation is out of time
fn check_remaining(ctx: &CommandContext) -> Result<(), CommandError> {
    if ctx.remaining().is_zero() {
        return Err(ExternalError::DeadlineExceeded.into());
    }
    Ok(())
}

#[async_trait::async_trait]
impl CommandExecutor for OnCallCommand {
    fn descriptor(&self) -> CommandDescriptor {
        CommandDescriptor::new("on-call", "Toggle whether you are on call for tickets")
            .permission(PermissionLevel::Support)
            .default_ephemeral()
            .timeout(ON_CALL_TIMEOUT)
    }

    async fn execute(&self, ctx: &CommandContext, _args: BoundArguments) -> Result<(), CommandError> {
        let (Some(guild_id), Some(member)) = (ctx.guild_id(), ctx.member()) else {
            return Err(CommandError::internal("on-call invoked outside a guild"));
        };

        if !self.repository.uses_threads(guild_id).await? {
            ctx.reply_embed(
                Colour::Red,
                "Error",
                format!(
                    "`/on-call` is only available in thread mode. See {}/features/thread-mode",
                    self.docs_url
                ),
            )?;
            return Ok(());
        }

        let on_call = self.repository.toggle_on_call(guild_id, member.user.id).await?;
        let targets = self.targets(guild_id, member).await?;
        tracing::debug!(
            guild_id = %guild_id,
            user_id = %member.user.id,
            on_call,
            targets = targets.len(),
            "Toggled on-call"
        );

        if on_call {
            for mut target in targets {
                check_remaining(ctx)?;
                self.roles
                    .ensure_assigned(guild_id, &member.user, &mut target)
                    .await?;
            }
            ctx.reply_embed(
                Colour::Green,
                "Success",
                "You are now on call, and will be added to new tickets",
            )?;
        } else {
            for mut target in targets {
                check_remaining(ctx)?;
                self.roles
                    .ensure_unassigned(guild_id, &member.user, &mut target)
                    .await?;
            }
            ctx.reply_embed(
                Colour::Green,
                "Success",
                "You are no longer on call, and will not be added to new tickets",
            )?;
        }

        Ok(())
    }
}

impl std::fmt::Debug for OnCallCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnCallCommand")
            .field("docs_url", &self.docs_url)
            .finish_non_exhaustive()
    }
}
