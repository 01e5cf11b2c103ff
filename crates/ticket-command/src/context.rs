//! Per-invocation context and the single-use response channel

use parking_lot::Mutex;
use std::time::Duration;
use ticket_model::{
    AuthorizationFacts, Colour, Embed, GuildId, InteractionEvent, InvocationKind, Member,
    ResponseEnvelope, User, UserId,
};
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Reply delivery failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReplyError {
    /// An envelope was already sent for this invocation
    #[error("reply limit reached")]
    LimitReached,

    /// The caller stopped listening
    #[error("response receiver dropped")]
    ReceiverDropped,
}

/// Create the response channel for one invocation
#[must_use]
pub fn response_channel() -> (ResponseSender, oneshot::Receiver<ResponseEnvelope>) {
    let (tx, rx) = oneshot::channel();
    (
        ResponseSender {
            inner: Mutex::new(Some(tx)),
        },
        rx,
    )
}

/// Write half of the response channel
///
/// Accepts at most one envelope. Sending consumes the underlying sender, so
/// the channel is closed exactly once: either by the send or by [`close`]
/// (or drop) when nothing was sent.
///
/// [`close`]: ResponseSender::close
#[derive(Debug)]
pub struct ResponseSender {
    inner: Mutex<Option<oneshot::Sender<ResponseEnvelope>>>,
}

impl ResponseSender {
    /// Deliver the envelope and close the channel
    ///
    /// # Errors
    ///
    /// [`ReplyError::LimitReached`] if the channel was already used or closed,
    /// [`ReplyError::ReceiverDropped`] if the caller dropped its receiver.
    pub fn send(&self, envelope: ResponseEnvelope) -> Result<(), ReplyError> {
        let tx = self.inner.lock().take().ok_or(ReplyError::LimitReached)?;
        tx.send(envelope).map_err(|_| ReplyError::ReceiverDropped)
    }

    /// Close without sending
    pub fn close(&self) {
        self.inner.lock().take();
    }

    /// Whether the channel has been used or closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().is_none()
    }
}

/// State owned by a single invocation
#[derive(Debug)]
pub struct CommandContext {
    guild_id: Option<GuildId>,
    member: Option<Member>,
    user: User,
    kind: InvocationKind,
    facts: AuthorizationFacts,
    deadline: Instant,
    responder: ResponseSender,
}

impl CommandContext {
    /// Context for `event` with fail-closed facts
    #[must_use]
    pub fn new(event: &InteractionEvent, timeout: Duration, responder: ResponseSender) -> Self {
        let kind = event.kind();
        let user = event
            .member
            .as_ref()
            .map_or_else(|| event.user.clone(), |m| m.user.clone());

        Self {
            guild_id: event.guild_id.filter(|_| kind == InvocationKind::Guild),
            member: event.member.clone(),
            user,
            kind,
            facts: AuthorizationFacts::default(),
            deadline: Instant::now() + timeout,
            responder,
        }
    }

    /// Record resolved authorization facts
    pub fn set_facts(&mut self, facts: AuthorizationFacts) {
        self.facts = facts;
    }

    /// Invoking guild (guild context only)
    #[must_use]
    pub fn guild_id(&self) -> Option<GuildId> {
        self.guild_id
    }

    /// Member snapshot
    #[must_use]
    pub fn member(&self) -> Option<&Member> {
        self.member.as_ref()
    }

    /// Invoking user
    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Invoking user's id
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    /// Invocation context
    #[must_use]
    pub fn kind(&self) -> InvocationKind {
        self.kind
    }

    /// Resolved authorization facts
    #[must_use]
    pub fn facts(&self) -> AuthorizationFacts {
        self.facts
    }

    /// Time left before the deadline
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Send the invocation's single reply
    ///
    /// # Errors
    ///
    /// See [`ResponseSender::send`].
    pub fn reply(&self, envelope: ResponseEnvelope) -> Result<(), ReplyError> {
        self.responder.send(envelope)
    }

    /// Ephemeral embed reply
    ///
    /// # Errors
    ///
    /// See [`ResponseSender::send`].
    pub fn reply_embed(
        &self,
        colour: Colour,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<(), ReplyError> {
        self.reply(ResponseEnvelope::ephemeral_embed(Embed::new(
            colour,
            title,
            description,
        )))
    }

    /// Public embed reply
    ///
    /// # Errors
    ///
    /// See [`ResponseSender::send`].
    pub fn reply_embed_permanent(
        &self,
        colour: Colour,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<(), ReplyError> {
        self.reply(ResponseEnvelope::embed(Embed::new(colour, title, description)))
    }

    /// Ephemeral plain reply
    ///
    /// # Errors
    ///
    /// See [`ResponseSender::send`].
    pub fn reply_plain(&self, content: impl Into<String>) -> Result<(), ReplyError> {
        self.reply(ResponseEnvelope::ephemeral_text(content))
    }

    /// Whether a reply was already sent (or the channel closed)
    #[must_use]
    pub fn has_replied(&self) -> bool {
        self.responder.is_closed()
    }

    /// Close the channel if nothing was sent
    pub fn close(&self) {
        self.responder.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticket_model::{PermissionLevel, PremiumTier};

    fn event() -> InteractionEvent {
        InteractionEvent::in_guild(1, "open", GuildId(10), Member::new(User::new(7, "ryan")))
    }

    #[tokio::test]
    async fn second_reply_hits_limit() {
        let (tx, rx) = response_channel();
        let ctx = CommandContext::new(&event(), Duration::from_secs(5), tx);

        ctx.reply_plain("first").unwrap();
        assert_eq!(ctx.reply_plain("second"), Err(ReplyError::LimitReached));
        assert!(ctx.has_replied());

        let received = rx.await.unwrap();
        assert_eq!(received.content.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn close_without_reply_ends_receiver() {
        let (tx, rx) = response_channel();
        let ctx = CommandContext::new(&event(), Duration::from_secs(5), tx);
        ctx.close();
        assert!(rx.await.is_err());
        assert_eq!(ctx.reply_plain("late"), Err(ReplyError::LimitReached));
    }

    #[test]
    fn dropped_receiver_is_reported() {
        let (tx, rx) = response_channel();
        drop(rx);
        assert_eq!(
            tx.send(ResponseEnvelope::text("x")),
            Err(ReplyError::ReceiverDropped)
        );
    }

    #[tokio::test]
    async fn context_starts_fail_closed() {
        let (tx, _rx) = response_channel();
        let mut ctx = CommandContext::new(&event(), Duration::from_secs(5), tx);
        assert_eq!(ctx.facts(), AuthorizationFacts::default());
        assert_eq!(ctx.guild_id(), Some(GuildId(10)));

        ctx.set_facts(AuthorizationFacts::new(
            PermissionLevel::Support,
            PremiumTier::Premium,
        ));
        assert_eq!(ctx.facts().permission_level, PermissionLevel::Support);
        assert!(ctx.remaining() <= Duration::from_secs(5));
    }
}
