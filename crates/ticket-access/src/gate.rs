//! Gate trait and the ordered pipeline that runs gates

use crate::blacklist::{BlacklistError, BlacklistStore};
use crate::denial::Denial;
use crate::gates::{
    AdminOnlyGate, GuildBlacklistGate, HelperOnlyGate, PermissionLevelGate, PremiumOnlyGate,
    UserBlacklistGate,
};
use crate::staff::StaffAllowlist;
use std::sync::Arc;
use ticket_command::{CommandContext, CommandDescriptor};
use ticket_model::{AuthorizationFacts, GuildId, InvocationKind, RoleId, UserId};

/// Everything a gate may inspect
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    /// Resolved command properties
    pub descriptor: &'a CommandDescriptor,
    /// Resolved authorization facts
    pub facts: AuthorizationFacts,
    /// Invocation context
    pub kind: InvocationKind,
    /// Invoking guild (guild context only)
    pub guild_id: Option<GuildId>,
    /// Invoking user
    pub user_id: UserId,
    /// Member roles at invocation time
    pub roles: &'a [RoleId],
}

impl<'a> GateInput<'a> {
    /// Input for the invocation behind `ctx`
    #[must_use]
    pub fn from_context(descriptor: &'a CommandDescriptor, ctx: &'a CommandContext) -> Self {
        Self {
            descriptor,
            facts: ctx.facts(),
            kind: ctx.kind(),
            guild_id: ctx.guild_id(),
            user_id: ctx.user_id(),
            roles: ctx.member().map_or(&[][..], |m| m.roles.as_slice()),
        }
    }
}

/// Gate outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Continue to the next gate
    Allow,
    /// Stop with this denial
    Deny(Denial),
}

impl Verdict {
    /// Deny unless `cond` holds
    #[inline]
    #[must_use]
    pub fn require(cond: bool, denial: Denial) -> Self {
        if cond {
            Self::Allow
        } else {
            Self::Deny(denial)
        }
    }

    /// Whether the verdict allows
    #[inline]
    #[must_use]
    pub fn is_allow(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Gate failure (not a denial)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GateError {
    /// Blacklist status could not be read
    #[error(transparent)]
    Blacklist(#[from] BlacklistError),
}

impl From<GateError> for ticket_command::CommandError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Blacklist(inner) => inner.into(),
        }
    }
}

/// One admission check
#[async_trait::async_trait]
pub trait Gate: Send + Sync {
    /// Name for logs
    fn name(&self) -> &'static str;

    /// Evaluate the check
    async fn check(&self, input: &GateInput<'_>) -> Result<Verdict, GateError>;
}

/// Context restriction, checked before any asynchronous work
#[must_use]
pub fn check_context(descriptor: &CommandDescriptor, kind: InvocationKind) -> Verdict {
    Verdict::require(
        descriptor.allows(kind),
        Denial::ContextNotAllowed { invoked_in: kind },
    )
}

/// Ordered, short-circuiting sequence of gates
#[derive(Clone, Default)]
pub struct GatePipeline {
    gates: Vec<Arc<dyn Gate>>,
}

impl GatePipeline {
    /// Empty pipeline
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append a gate
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<dyn Gate>) -> Self {
        self.gates.push(gate);
        self
    }

    /// Guild blacklist, permission level, admin-only, helper-only,
    /// premium-only, user blacklist
    #[must_use]
    pub fn standard(blacklist: Arc<BlacklistStore>, staff: Arc<StaffAllowlist>) -> Self {
        Self::new()
            .with_gate(Arc::new(GuildBlacklistGate::new(Arc::clone(&blacklist))))
            .with_gate(Arc::new(PermissionLevelGate))
            .with_gate(Arc::new(AdminOnlyGate::new(Arc::clone(&staff))))
            .with_gate(Arc::new(HelperOnlyGate::new(staff)))
            .with_gate(Arc::new(PremiumOnlyGate))
            .with_gate(Arc::new(UserBlacklistGate::new(blacklist)))
    }

    /// Gate names, in order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.gates.iter().map(|g| g.name()).collect()
    }

    /// Run gates in order until one denies or fails
    ///
    /// # Errors
    ///
    /// The first [`GateError`]; later gates don't run.
    pub async fn admit(&self, input: &GateInput<'_>) -> Result<Verdict, GateError> {
        for gate in &self.gates {
            if let Verdict::Deny(denial) = gate.check(input).await? {
                tracing::debug!(
                    gate = gate.name(),
                    reason = denial.code(),
                    command = %input.descriptor.name,
                    user_id = %input.user_id,
                    "Invocation denied"
                );
                return Ok(Verdict::Deny(denial));
            }
        }
        Ok(Verdict::Allow)
    }
}

impl std::fmt::Debug for GatePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatePipeline")
            .field("gates", &self.names())
            .finish()
    }
}
