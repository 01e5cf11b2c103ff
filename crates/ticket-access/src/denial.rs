//! Admission denials and their user-facing replies

use serde::{Deserialize, Serialize};
use std::fmt;
use ticket_model::{Colour, Embed, InvocationKind, PermissionLevel, ResponseEnvelope};

/// Links embedded in denial replies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenialLinks {
    /// Where premium can be purchased
    pub premium_url: String,
    /// Where premium can be unlocked by voting
    pub vote_url: String,
}

impl Default for DenialLinks {
    fn default() -> Self {
        Self {
            premium_url: "https://www.patreon.com/ticketsbot-cloud".to_owned(),
            vote_url: "https://vote.ticketsbot.cloud".to_owned(),
        }
    }
}

/// Reason an invocation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Denial {
    /// Invoked in a context the command doesn't allow
    ContextNotAllowed {
        /// Where it was invoked
        invoked_in: InvocationKind,
    },
    /// The guild is blacklisted
    GuildBlacklisted,
    /// Permission level too low
    PermissionDenied {
        /// Level the command requires
        required: PermissionLevel,
    },
    /// Not a bot admin
    AdminOnly,
    /// Not a bot helper
    HelperOnly,
    /// Guild has no premium
    PremiumRequired,
    /// Actor is blacklisted globally (or invoked from a direct message)
    UserBlacklisted,
    /// Actor is blacklisted by this guild
    MemberBlacklisted,
}

impl Denial {
    /// Whether this is a blacklist denial
    #[inline]
    #[must_use]
    pub fn is_blacklist(self) -> bool {
        matches!(
            self,
            Self::GuildBlacklisted | Self::UserBlacklisted | Self::MemberBlacklisted
        )
    }

    /// Whether this is a permission denial
    #[inline]
    #[must_use]
    pub fn is_permission(self) -> bool {
        matches!(
            self,
            Self::PermissionDenied { .. } | Self::AdminOnly | Self::HelperOnly
        )
    }

    /// Short machine-readable code for logs
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::ContextNotAllowed { .. } => "context_not_allowed",
            Self::GuildBlacklisted => "guild_blacklisted",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::AdminOnly => "admin_only",
            Self::HelperOnly => "helper_only",
            Self::PremiumRequired => "premium_required",
            Self::UserBlacklisted => "user_blacklisted",
            Self::MemberBlacklisted => "member_blacklisted",
        }
    }

    /// Reply shown to the actor
    #[must_use]
    pub fn to_envelope(self, links: &DenialLinks) -> ResponseEnvelope {
        let (title, body) = match self {
            Self::ContextNotAllowed {
                invoked_in: InvocationKind::DirectMessage,
            } => {
                return ResponseEnvelope::ephemeral_text("This command can only be used in servers.")
            }
            Self::ContextNotAllowed {
                invoked_in: InvocationKind::Guild,
            } => return ResponseEnvelope::ephemeral_text("This command can only be used in DMs."),
            Self::GuildBlacklisted => (
                "Blacklisted",
                "This server is blacklisted from using the bot.".to_owned(),
            ),
            Self::PermissionDenied { .. } | Self::HelperOnly => (
                "Error",
                "You do not have permission for this command.".to_owned(),
            ),
            Self::AdminOnly => (
                "Error",
                "This command is reserved for the bot owner only.".to_owned(),
            ),
            Self::PremiumRequired => (
                "Premium Only Command",
                format!(
                    "This command is only available to premium servers. You can purchase premium at {} or unlock it for free by voting at {}.",
                    links.premium_url, links.vote_url
                ),
            ),
            Self::UserBlacklisted => (
                "Blacklisted",
                "You are blacklisted from using the bot.".to_owned(),
            ),
            Self::MemberBlacklisted => (
                "Blacklisted",
                "You are blacklisted in this server.".to_owned(),
            ),
        };

        ResponseEnvelope::ephemeral_embed(Embed::new(Colour::Red, title, body))
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContextNotAllowed { invoked_in } => {
                write!(f, "command not allowed in {invoked_in}")
            }
            Self::PermissionDenied { required } => write!(f, "requires {required} permission"),
            other => f.write_str(other.code()),
        }
    }
}
