//! Bot-admin blacklist management

use std::sync::Arc;
use std::time::Duration;
use ticket_access::{BlacklistRecord, BlacklistStore};
use ticket_command::prelude::*;
use ticket_model::{Colour, ExternalError, GuildId, InvocationKind, UserId};

const ADMIN_TIMEOUT: Duration = Duration::from_secs(10);
const TITLE: &str = "Admin - Blacklist";
const NO_REASON: &str = "No reason provided";

/// Looks up guild ownership on the platform
#[async_trait::async_trait]
pub trait GuildDirectory: Send + Sync {
    /// Owner of `guild_id`; `None` when the bot is not in the guild
    async fn owner_id(&self, guild_id: GuildId) -> Result<Option<UserId>, ExternalError>;
}

fn admin_descriptor(name: &str, description: &str) -> CommandDescriptor {
    CommandDescriptor::new(name, description)
        .admin_only()
        .contexts([InvocationKind::Guild])
        .timeout(ADMIN_TIMEOUT)
}

/// The `admin` group with its blacklist subcommands
#[must_use]
pub fn admin_group(
    blacklist: Arc<BlacklistStore>,
    directory: Arc<dyn GuildDirectory>,
) -> RegisteredCommand {
    RegisteredCommand::group(
        admin_descriptor("admin", "Bot administration"),
        vec![
            RegisteredCommand::new(BlacklistGuildCommand {
                blacklist: Arc::clone(&blacklist),
                directory,
            }),
            RegisteredCommand::new(UnblacklistGuildCommand {
                blacklist: Arc::clone(&blacklist),
            }),
            RegisteredCommand::new(OwnerCountsCommand { blacklist }),
        ],
    )
}

fn parse_id<T: std::str::FromStr>(raw: &str) -> Option<T> {
    raw.parse().ok()
}

struct BlacklistGuildCommand {
    blacklist: Arc<BlacklistStore>,
    directory: Arc<dyn GuildDirectory>,
}

#[async_trait::async_trait]
impl CommandExecutor for BlacklistGuildCommand {
    fn descriptor(&self) -> CommandDescriptor {
        admin_descriptor("blacklist", "Blacklist a guild")
            .argument(ArgumentSpec::required("guild_id", ArgumentKind::String))
            .argument(ArgumentSpec::optional("reason", ArgumentKind::String))
            .argument(ArgumentSpec::optional("real_owner_id", ArgumentKind::String))
    }

    async fn execute(&self, ctx: &CommandContext, args: BoundArguments) -> Result<(), CommandError> {
        let Some(guild_id) = args.string("guild_id").and_then(parse_id::<GuildId>) else {
            ctx.reply_embed(Colour::Red, "Error", "Invalid guild ID provided")?;
            return Ok(());
        };

        let real_owner_id = match args.string("real_owner_id").filter(|s| !s.is_empty()) {
            Some(raw) => match parse_id::<UserId>(raw) {
                Some(id) => Some(id),
                None => {
                    ctx.reply_embed(Colour::Red, "Error", "Invalid real owner ID provided")?;
                    return Ok(());
                }
            },
            None => None,
        };

        if let Some(existing) = self.blacklist.guild_record(guild_id).await? {
            ctx.reply_embed(
                Colour::Orange,
                TITLE,
                format!(
                    "Guild is already blacklisted.\n\n**Guild ID:** `{guild_id}`\n**Reason**: `{}`",
                    existing.reason.as_deref().unwrap_or(NO_REASON)
                ),
            )?;
            return Ok(());
        }

        let owner_id = self.directory.owner_id(guild_id).await?;
        let record = BlacklistRecord {
            reason: args.string("reason").map(str::to_owned),
            owner_id,
            real_owner_id,
        };

        let mut lines = vec![
            format!("**Guild ID:** `{guild_id}`"),
            format!(
                "**Reason:** {}",
                record.reason.as_deref().unwrap_or(NO_REASON)
            ),
        ];
        lines.push(match owner_id {
            Some(id) => format!("**Server Owner:** <@{id}> (`{id}`)"),
            None => "**Server Owner:** Unknown (bot not in server)".to_owned(),
        });
        if let Some(id) = real_owner_id {
            lines.push(format!("**Real Owner:** <@{id}> (`{id}`)"));
        }

        self.blacklist.add_guild(guild_id, record).await?;
        ctx.reply_embed_permanent(
            Colour::Orange,
            TITLE,
            format!(
                "Guild has been blacklisted successfully.\n\n{}",
                lines.join("\n")
            ),
        )?;
        Ok(())
    }
}

struct UnblacklistGuildCommand {
    blacklist: Arc<BlacklistStore>,
}

#[async_trait::async_trait]
impl CommandExecutor for UnblacklistGuildCommand {
    fn descriptor(&self) -> CommandDescriptor {
        admin_descriptor("unblacklist", "Remove a guild from the blacklist")
            .argument(ArgumentSpec::required("guild_id", ArgumentKind::String))
    }

    async fn execute(&self, ctx: &CommandContext, args: BoundArguments) -> Result<(), CommandError> {
        let Some(guild_id) = args.string("guild_id").and_then(parse_id::<GuildId>) else {
            ctx.reply_embed(Colour::Red, "Error", "Invalid guild ID provided")?;
            return Ok(());
        };

        if self.blacklist.remove_guild(guild_id).await? {
            ctx.reply_embed(
                Colour::Green,
                TITLE,
                format!("Guild `{guild_id}` has been removed from the blacklist."),
            )?;
        } else {
            ctx.reply_embed(
                Colour::Orange,
                TITLE,
                format!("Guild `{guild_id}` is not blacklisted."),
            )?;
        }
        Ok(())
    }
}

struct OwnerCountsCommand {
    blacklist: Arc<BlacklistStore>,
}

#[async_trait::async_trait]
impl CommandExecutor for OwnerCountsCommand {
    fn descriptor(&self) -> CommandDescriptor {
        admin_descriptor("owner-counts", "Count blacklisted guilds owned by a user")
            .argument(ArgumentSpec::required("user", ArgumentKind::User))
    }

    async fn execute(&self, ctx: &CommandContext, args: BoundArguments) -> Result<(), CommandError> {
        let user_id = args
            .user("user")
            .ok_or_else(|| CommandError::internal("user argument was not bound"))?;
        let (owner, real_owner) = self.blacklist.blacklisted_owner_counts(user_id).await?;

        ctx.reply_embed(
            Colour::Orange,
            TITLE,
            format!(
                "<@{user_id}> owns {owner} blacklisted server(s) and is the real owner of {real_owner}."
            ),
        )?;
        Ok(())
    }
}
