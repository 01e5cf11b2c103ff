//! The isolated per-invocation unit of work

use crate::reporter::{deliver, ErrorReporter};
use crate::settings::DispatchSettings;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use ticket_access::{AuthorizationResolver, GateInput, GatePipeline, Verdict};
use ticket_command::{
    bind_arguments, ArgumentError, CommandContext, CommandError, ResolvedCommand, ResponseSender,
};
use ticket_model::{
    Colour, Embed, ExternalError, InteractionEvent, PremiumTier, ResponseEnvelope,
};
use ulid::Ulid;

const OUTDATED_COMMAND: &str = "This command registration is outdated. Please ask the server administrators to visit the whitelabel dashboard and press \"Create Slash Commands\" again.";

pub(crate) struct InvocationUnit {
    pub(crate) resolved: ResolvedCommand,
    pub(crate) event: InteractionEvent,
    pub(crate) sender: ResponseSender,
    pub(crate) authorization: AuthorizationResolver,
    pub(crate) gates: GatePipeline,
    pub(crate) reporter: ErrorReporter,
    pub(crate) settings: Arc<DispatchSettings>,
}

impl InvocationUnit {
    /// Run the unit, containing any panic
    ///
    /// The response channel lives inside the unit, so it closes when the
    /// unit returns or unwinds.
    pub(crate) async fn run_contained(self) {
        let command = self.resolved.qualified_name();
        if let Err(payload) = AssertUnwindSafe(self.run()).catch_unwind().await {
            tracing::error!(
                command = %command,
                panic = panic_message(payload.as_ref()),
                "Recovered panicking command"
            );
        }
    }

    async fn run(self) {
        let Self {
            resolved,
            event,
            sender,
            authorization,
            gates,
            reporter,
            settings,
        } = self;

        let descriptor = resolved.descriptor();
        let command = resolved.qualified_name();
        let mut ctx = CommandContext::new(&event, descriptor.timeout, sender);

        let outcome = tokio::time::timeout(
            descriptor.timeout,
            admit_and_execute(&resolved, &event, &mut ctx, &authorization, &gates, &settings),
        )
        .await;

        let result = match outcome {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    command = %command,
                    timeout_ms = u64::try_from(descriptor.timeout.as_millis()).unwrap_or(u64::MAX),
                    "Command deadline elapsed"
                );
                Err(CommandError::External(ExternalError::DeadlineExceeded))
            }
        };

        if let Err(err) = result {
            reporter.report(&ctx, &command, &err).await;
        }
        ctx.close();
    }
}

async fn admit_and_execute(
    resolved: &ResolvedCommand,
    event: &InteractionEvent,
    ctx: &mut CommandContext,
    authorization: &AuthorizationResolver,
    gates: &GatePipeline,
    settings: &DispatchSettings,
) -> Result<(), CommandError> {
    let facts = match authorization.resolve(event.guild_member()).await {
        Ok(facts) => facts,
        Err(err) => {
            let correlation_id = Ulid::new();
            tracing::error!(
                correlation_id = %correlation_id,
                guild_id = ?event.guild_id,
                user_id = %event.actor_id(),
                error = %err,
                "Authorization resolution failed"
            );
            deliver(
                ctx,
                ResponseEnvelope::ephemeral_text(format!(
                    "An error occurred while processing this request (Error ID `{correlation_id}`)"
                )),
                correlation_id,
            );
            return Ok(());
        }
    };
    ctx.set_facts(facts);

    if settings.premium_only && facts.premium_tier == PremiumTier::None {
        tracing::debug!(guild_id = ?event.guild_id, "Dropping invocation from non-premium guild");
        return Ok(());
    }

    let descriptor = resolved.descriptor();
    let input = GateInput::from_context(descriptor, ctx);
    if let Verdict::Deny(denial) = gates.admit(&input).await? {
        ctx.reply(denial.to_envelope(&settings.links))?;
        return Ok(());
    }

    let args = match bind_arguments(&descriptor.arguments, resolved.options()) {
        Ok(args) => args,
        Err(err) => {
            ctx.reply(binding_reply(&err, settings.whitelabel))?;
            return Ok(());
        }
    };

    resolved.handler().execute(ctx, args).await
}

fn binding_reply(err: &ArgumentError, whitelabel: bool) -> ResponseEnvelope {
    if whitelabel {
        return ResponseEnvelope::ephemeral_embed(Embed::new(
            Colour::Red,
            "Outdated Command",
            OUTDATED_COMMAND,
        ));
    }

    match err {
        ArgumentError::Missing { .. } => ResponseEnvelope::ephemeral_text("argument is missing"),
        ArgumentError::TypeMismatch { .. } => ResponseEnvelope::ephemeral_text(err.to_string()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}
