//! Testing utilities for the ticket worker workspace
//!
//! Counting fakes for the external collaborators, recording executors and
//! interaction builders.

#![allow(missing_docs)]

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use ticket_access::{AuthorizationResolver, PermissionProvider, PremiumProvider};
use ticket_command::{
    AliasResolver, BoundArguments, CommandContext, CommandDescriptor, CommandError,
    CommandExecutor, Tag,
};
use ticket_model::{
    CommandId, ExternalError, GuildId, InteractionEvent, Member, PermissionLevel, PremiumTier,
    RoleId, User,
};

pub const TEST_GUILD: GuildId = GuildId(1_000);

pub fn user(id: u64, name: &str) -> User {
    User::new(id, name)
}

pub fn member(id: u64, name: &str) -> Member {
    Member::new(user(id, name))
}

pub fn member_with_roles(id: u64, name: &str, roles: &[u64]) -> Member {
    member(id, name).with_roles(roles.iter().copied().map(RoleId))
}

pub fn guild_event(name: &str, member: Member) -> InteractionEvent {
    InteractionEvent::in_guild(1, name, TEST_GUILD, member)
}

pub fn dm_event(name: &str, user: User) -> InteractionEvent {
    InteractionEvent::in_direct_message(1, name, user)
}

/// Permission provider with a canned answer, optional delay and call count
#[derive(Debug)]
pub struct FakePermissions {
    result: Result<PermissionLevel, ExternalError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakePermissions {
    pub fn fixed(level: PermissionLevel) -> Self {
        Self {
            result: Ok(level),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: ExternalError) -> Self {
        Self {
            result: Err(err),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PermissionProvider for FakePermissions {
    async fn permission_level(
        &self,
        _guild_id: GuildId,
        _member: &Member,
    ) -> Result<PermissionLevel, ExternalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }
}

/// Premium provider with a canned answer, optional delay and call count
#[derive(Debug)]
pub struct FakePremium {
    result: Result<PremiumTier, ExternalError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl Default for FakePremium {
    fn default() -> Self {
        Self::fixed(PremiumTier::None)
    }
}

impl FakePremium {
    pub fn fixed(tier: PremiumTier) -> Self {
        Self {
            result: Ok(tier),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: ExternalError) -> Self {
        Self {
            result: Err(err),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PremiumProvider for FakePremium {
    async fn premium_tier(&self, _guild_id: GuildId) -> Result<PremiumTier, ExternalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }
}

pub fn authorization(
    permissions: Arc<FakePermissions>,
    premium: Arc<FakePremium>,
) -> AuthorizationResolver {
    AuthorizationResolver::new(permissions, premium)
}

/// Alias resolver backed by a fixed table
#[derive(Debug, Default)]
pub struct StaticAliases {
    tags: HashMap<(GuildId, CommandId), Tag>,
    calls: AtomicUsize,
}

impl StaticAliases {
    pub fn with_tag(mut self, guild_id: GuildId, command_id: u64, tag: Tag) -> Self {
        self.tags.insert((guild_id, CommandId(command_id)), tag);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AliasResolver for StaticAliases {
    async fn lookup_alias(
        &self,
        guild_id: GuildId,
        command_id: CommandId,
    ) -> Result<Option<Tag>, ExternalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tags.get(&(guild_id, command_id)).cloned())
    }
}

pub fn text_tag(id: &str, content: &str) -> Tag {
    Tag {
        id: id.to_owned(),
        content: Some(content.to_owned()),
        embed: None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    /// Reply with the configured text
    Reply,
    /// Return without replying
    Silent,
    Panic,
    /// Sleep longer than any test deadline
    Hang,
    Fail,
}

/// Executor that records invocations and behaves as configured
#[derive(Debug)]
pub struct RecordingExecutor {
    descriptor: CommandDescriptor,
    behaviour: Behaviour,
    reply: String,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<BoundArguments>>>,
}

impl RecordingExecutor {
    pub fn new(descriptor: CommandDescriptor) -> Self {
        Self {
            descriptor,
            behaviour: Behaviour::Reply,
            reply: "ok".to_owned(),
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn behaving(mut self, behaviour: Behaviour) -> Self {
        self.behaviour = behaviour;
        self
    }

    pub fn replying(mut self, reply: &str) -> Self {
        reply.clone_into(&mut self.reply);
        self
    }

    /// Shared handle on the call counter, usable after the executor is registered
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn arguments(&self) -> Arc<Mutex<Vec<BoundArguments>>> {
        Arc::clone(&self.seen)
    }
}

#[async_trait::async_trait]
impl CommandExecutor for RecordingExecutor {
    fn descriptor(&self) -> CommandDescriptor {
        self.descriptor.clone()
    }

    async fn execute(&self, ctx: &CommandContext, args: BoundArguments) -> Result<(), CommandError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(args);
        match self.behaviour {
            Behaviour::Reply => {
                ctx.reply_plain(self.reply.clone())?;
                Ok(())
            }
            Behaviour::Silent => Ok(()),
            Behaviour::Panic => panic!("executor panicked on purpose"),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                Ok(())
            }
            Behaviour::Fail => Err(CommandError::internal("executor failed on purpose")),
        }
    }
}
