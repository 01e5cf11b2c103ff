//! Inbound application-command interactions

use crate::ids::{CommandId, GuildId, RoleId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id
    pub id: UserId,
    /// Account username
    pub username: String,
}

impl User {
    /// Create a user
    #[must_use]
    pub fn new(id: impl Into<UserId>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

/// Guild member snapshot taken when the interaction was created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Underlying user
    pub user: User,
    /// Role ids held at invocation time
    #[serde(default)]
    pub roles: Vec<RoleId>,
    /// Guild nickname
    #[serde(default)]
    pub nick: Option<String>,
}

impl Member {
    /// Member with no roles and no nickname
    #[must_use]
    pub fn new(user: User) -> Self {
        Self {
            user,
            roles: Vec::new(),
            nick: None,
        }
    }

    /// Builder: add roles
    #[must_use]
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = RoleId>) -> Self {
        self.roles.extend(roles);
        self
    }

    /// Whether the snapshot holds `role`
    #[must_use]
    pub fn has_role(&self, role: RoleId) -> bool {
        self.roles.contains(&role)
    }
}

/// Where an interaction was invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationKind {
    /// Inside a guild channel
    Guild,
    /// Inside a direct message
    DirectMessage,
}

impl fmt::Display for InvocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guild => f.write_str("guild"),
            Self::DirectMessage => f.write_str("direct_message"),
        }
    }
}

/// Typed option value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum OptionValue {
    /// Free text
    String(String),
    /// Integer
    Integer(i64),
    /// Floating point number
    Number(f64),
    /// Boolean
    Boolean(bool),
    /// User mention
    User(UserId),
    /// Role mention
    Role(RoleId),
    /// Channel mention
    Channel(u64),
}

impl OptionValue {
    /// Short name of the value's type, used in diagnostics
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::User(_) => "user",
            Self::Role(_) => "role",
            Self::Channel(_) => "channel",
        }
    }
}

/// One node of the option tree
///
/// A node carries either a value (leaf argument) or child options
/// (subcommand / subcommand group), never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOption {
    /// Option or subcommand name
    pub name: String,
    /// Leaf value
    #[serde(default)]
    pub value: Option<OptionValue>,
    /// Nested options
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

impl CommandOption {
    /// Leaf argument
    #[must_use]
    pub fn value(name: impl Into<String>, value: OptionValue) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
            options: Vec::new(),
        }
    }

    /// Subcommand node
    #[must_use]
    pub fn subcommand(name: impl Into<String>, options: Vec<CommandOption>) -> Self {
        Self {
            name: name.into(),
            value: None,
            options,
        }
    }
}

/// Application-command interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// Platform command id (used for alias lookup)
    pub command_id: CommandId,
    /// Top-level command name
    pub command_name: String,
    /// Option tree
    #[serde(default)]
    pub options: Vec<CommandOption>,
    /// Invoking guild
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    /// Invoking member; absent in direct messages
    #[serde(default)]
    pub member: Option<Member>,
    /// Invoking user
    pub user: User,
}

impl InteractionEvent {
    /// Guild-context invocation
    #[must_use]
    pub fn in_guild(
        command_id: impl Into<CommandId>,
        command_name: impl Into<String>,
        guild_id: GuildId,
        member: Member,
    ) -> Self {
        Self {
            command_id: command_id.into(),
            command_name: command_name.into(),
            options: Vec::new(),
            guild_id: Some(guild_id),
            user: member.user.clone(),
            member: Some(member),
        }
    }

    /// Direct-message invocation
    #[must_use]
    pub fn in_direct_message(
        command_id: impl Into<CommandId>,
        command_name: impl Into<String>,
        user: User,
    ) -> Self {
        Self {
            command_id: command_id.into(),
            command_name: command_name.into(),
            options: Vec::new(),
            guild_id: None,
            member: None,
            user,
        }
    }

    /// Builder: set the option tree
    #[must_use]
    pub fn with_options(mut self, options: Vec<CommandOption>) -> Self {
        self.options = options;
        self
    }

    /// Guild context requires both a guild id and a member snapshot
    #[must_use]
    pub fn kind(&self) -> InvocationKind {
        match (self.guild_id, &self.member) {
            (Some(guild_id), Some(_)) if guild_id.get() != 0 => InvocationKind::Guild,
            _ => InvocationKind::DirectMessage,
        }
    }

    /// Id of the invoking user
    #[must_use]
    pub fn actor_id(&self) -> UserId {
        self.member.as_ref().map_or(self.user.id, |m| m.user.id)
    }

    /// Guild id and member, present only in guild context
    #[must_use]
    pub fn guild_member(&self) -> Option<(GuildId, &Member)> {
        match self.kind() {
            InvocationKind::Guild => self.guild_id.zip(self.member.as_ref()),
            InvocationKind::DirectMessage => None,
        }
    }
}
