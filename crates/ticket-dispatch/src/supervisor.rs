//! Dispatch entry point

use crate::reporter::ErrorReporter;
use crate::settings::DispatchSettings;
use crate::unit::InvocationUnit;
use std::sync::Arc;
use ticket_access::{check_context, AuthorizationResolver, GatePipeline, Verdict};
use ticket_command::{response_channel, CommandResolver, ResolveError};
use ticket_model::{InteractionEvent, ResponseEnvelope};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Failure before any asynchronous work started
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    /// The command or subcommand could not be resolved
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl DispatchError {
    /// Diagnostic reply for the caller to send, if it chooses to
    #[must_use]
    pub fn to_envelope(&self) -> ResponseEnvelope {
        ResponseEnvelope::ephemeral_text(self.to_string())
    }
}

/// What the caller gets back synchronously
#[derive(Debug)]
pub struct DispatchOutcome {
    /// Caller may acknowledge the interaction before the reply arrives
    pub should_auto_defer: bool,
    /// The acknowledgement should be ephemeral
    pub default_ephemeral: bool,
    /// Receives at most one envelope, then closes
    pub responses: oneshot::Receiver<ResponseEnvelope>,
    /// Spawned unit; `None` when the invocation was refused up front
    pub task: Option<JoinHandle<()>>,
}

impl DispatchOutcome {
    /// Wait for the reply; `None` when the channel closed without one
    pub async fn response(self) -> Option<ResponseEnvelope> {
        self.responses.await.ok()
    }

    /// Wait for the unit to finish, then take the reply
    pub async fn join(self) -> Option<ResponseEnvelope> {
        if let Some(task) = self.task {
            // Panics are contained inside the unit
            let _ = task.await;
        }
        self.responses.await.ok()
    }
}

/// Dispatches interactions to isolated, supervised units
#[derive(Debug, Clone)]
pub struct Dispatcher {
    resolver: CommandResolver,
    authorization: AuthorizationResolver,
    gates: GatePipeline,
    reporter: ErrorReporter,
    settings: Arc<DispatchSettings>,
}

impl Dispatcher {
    /// Create a dispatcher
    #[must_use]
    pub fn new(
        resolver: CommandResolver,
        authorization: AuthorizationResolver,
        gates: GatePipeline,
        settings: DispatchSettings,
    ) -> Self {
        let settings = Arc::new(settings);
        Self {
            reporter: ErrorReporter::new(Arc::clone(&settings), authorization.clone()),
            resolver,
            authorization,
            gates,
            settings,
        }
    }

    /// Command resolver
    #[must_use]
    pub fn resolver(&self) -> &CommandResolver {
        &self.resolver
    }

    /// Resolve `event`, check its context and spawn the invocation unit
    ///
    /// A context denial is written to the response channel before this
    /// returns, with both flags false.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Resolve`] when the command or subcommand is unknown
    /// or the alias service fails.
    pub async fn dispatch(&self, event: InteractionEvent) -> Result<DispatchOutcome, DispatchError> {
        let resolved = self.resolver.resolve(&event).await.map_err(|err| {
            tracing::warn!(
                command = %event.command_name,
                guild_id = ?event.guild_id,
                error = %err,
                "Command resolution failed"
            );
            err
        })?;

        let descriptor = resolved.descriptor();
        let (sender, responses) = response_channel();

        if let Verdict::Deny(denial) = check_context(descriptor, event.kind()) {
            tracing::debug!(
                command = %resolved.qualified_name(),
                reason = denial.code(),
                "Invocation denied"
            );
            // The receiver is held locally, so delivery cannot fail
            let _ = sender.send(denial.to_envelope(&self.settings.links));
            return Ok(DispatchOutcome {
                should_auto_defer: false,
                default_ephemeral: false,
                responses,
                task: None,
            });
        }

        let should_auto_defer = !descriptor.disable_auto_defer;
        let default_ephemeral = descriptor.default_ephemeral;

        tracing::info!(
            command = %resolved.qualified_name(),
            guild_id = ?event.guild_id,
            user_id = %event.actor_id(),
            "Dispatching command"
        );

        let unit = InvocationUnit {
            resolved,
            event,
            sender,
            authorization: self.authorization.clone(),
            gates: self.gates.clone(),
            reporter: self.reporter.clone(),
            settings: Arc::clone(&self.settings),
        };
        let task = tokio::spawn(unit.run_contained());

        Ok(DispatchOutcome {
            should_auto_defer,
            default_ephemeral,
            responses,
            task: Some(task),
        })
    }
}
