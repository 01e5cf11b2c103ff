//! Immutable command properties

use crate::arguments::ArgumentSpec;
use serde::{Serialize, Serializer};
use std::time::Duration;
use ticket_model::{InvocationKind, PermissionLevel};

/// Default execution timeout for commands that don't declare one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Static properties of a command or subcommand
///
/// Built once at registration and never mutated while dispatching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandDescriptor {
    /// Command name as registered with the platform
    pub name: String,
    /// Short help text
    pub description: String,
    /// Minimum permission level
    pub permission_level: PermissionLevel,
    /// Restricted to the bot-admin allowlist
    pub admin_only: bool,
    /// Restricted to the helper allowlist
    pub helper_only: bool,
    /// Requires a premium guild
    pub premium_only: bool,
    /// Skips the user blacklist check
    pub ignore_blacklist: bool,
    /// Allowed invocation contexts; empty means guild only
    pub contexts: Vec<InvocationKind>,
    /// Per-invocation deadline
    #[serde(serialize_with = "serialize_millis")]
    pub timeout: Duration,
    /// Caller must not acknowledge ahead of the handler
    pub disable_auto_defer: bool,
    /// Deferred acknowledgement should be ephemeral
    pub default_ephemeral: bool,
    /// Declared leaf arguments, in order
    pub arguments: Vec<ArgumentSpec>,
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl CommandDescriptor {
    /// Descriptor with the defaults: `Everyone`, guild only, 5s timeout
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            permission_level: PermissionLevel::Everyone,
            admin_only: false,
            helper_only: false,
            premium_only: false,
            ignore_blacklist: false,
            contexts: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            disable_auto_defer: false,
            default_ephemeral: false,
            arguments: Vec::new(),
        }
    }

    /// Builder: required permission level
    #[must_use]
    pub fn permission(mut self, level: PermissionLevel) -> Self {
        self.permission_level = level;
        self
    }

    /// Builder: bot admins only
    #[must_use]
    pub fn admin_only(mut self) -> Self {
        self.admin_only = true;
        self
    }

    /// Builder: helpers only
    #[must_use]
    pub fn helper_only(mut self) -> Self {
        self.helper_only = true;
        self
    }

    /// Builder: premium guilds only
    #[must_use]
    pub fn premium_only(mut self) -> Self {
        self.premium_only = true;
        self
    }

    /// Builder: skip the user blacklist
    #[must_use]
    pub fn ignore_blacklist(mut self) -> Self {
        self.ignore_blacklist = true;
        self
    }

    /// Builder: allowed invocation contexts
    #[must_use]
    pub fn contexts(mut self, contexts: impl IntoIterator<Item = InvocationKind>) -> Self {
        self.contexts = contexts.into_iter().collect();
        self
    }

    /// Builder: execution timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder: disable auto-defer
    #[must_use]
    pub fn disable_auto_defer(mut self) -> Self {
        self.disable_auto_defer = true;
        self
    }

    /// Builder: ephemeral deferral
    #[must_use]
    pub fn default_ephemeral(mut self) -> Self {
        self.default_ephemeral = true;
        self
    }

    /// Builder: append an argument
    #[must_use]
    pub fn argument(mut self, spec: ArgumentSpec) -> Self {
        self.arguments.push(spec);
        self
    }

    /// Whether the command may run in `kind`
    #[must_use]
    pub fn allows(&self, kind: InvocationKind) -> bool {
        if self.contexts.is_empty() {
            kind == InvocationKind::Guild
        } else {
            self.contexts.contains(&kind)
        }
    }
}
