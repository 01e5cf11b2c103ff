//! Registry assembly and event replay

use crate::commands::admin_group;
use crate::config::{ConfigError, WorkerConfig};
use crate::fixture::FixtureServices;
use serde::Serialize;
use std::sync::Arc;
use ticket_access::{AuthorizationResolver, BlacklistStore, GatePipeline};
use ticket_command::{
    CommandDescriptor, CommandRegistry, CommandResolver, RegisteredCommand, RegistryError,
};
use ticket_dispatch::Dispatcher;
use ticket_model::{InteractionEvent, ResponseEnvelope};
use ticket_oncall::{OnCallCommand, RoleSynchronizer};

/// Registry listing entry
#[derive(Debug, Clone, Serialize)]
pub struct CommandSummary {
    /// Declared properties
    #[serde(flatten)]
    pub descriptor: CommandDescriptor,
    /// Subcommands
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CommandSummary>,
}

impl CommandSummary {
    fn from_command(command: &RegisteredCommand) -> Self {
        Self {
            descriptor: command.descriptor().clone(),
            children: command
                .children()
                .iter()
                .map(|c| Self::from_command(c))
                .collect(),
        }
    }

    /// One line per command, children indented
    #[must_use]
    pub fn render(&self, depth: usize) -> String {
        let d = &self.descriptor;
        let mut flags = Vec::new();
        if d.admin_only {
            flags.push("admin-only");
        }
        if d.helper_only {
            flags.push("helper-only");
        }
        if d.premium_only {
            flags.push("premium");
        }
        if d.default_ephemeral {
            flags.push("ephemeral");
        }
        if d.disable_auto_defer {
            flags.push("no-defer");
        }

        let mut out = format!(
            "{:indent$}{} [{}] {}ms{}{}",
            "",
            d.name,
            d.permission_level,
            d.timeout.as_millis(),
            if flags.is_empty() { "" } else { " " },
            flags.join(","),
            indent = depth * 2
        );
        for child in &self.children {
            out.push('\n');
            out.push_str(&child.render(depth + 1));
        }
        out
    }
}

/// What a replayed interaction produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayOutcome {
    /// Caller would defer
    pub should_auto_defer: bool,
    /// Deferral would be ephemeral
    pub default_ephemeral: bool,
    /// Delivered envelope, if any
    pub response: Option<ResponseEnvelope>,
    /// Dispatch failure, if the command could not be resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Worker assembly failure
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Two commands share a name
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A command deadline conflicts with the configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Fully assembled worker over in-memory collaborators
#[derive(Debug)]
pub struct Worker {
    registry: Arc<CommandRegistry>,
    dispatcher: Dispatcher,
    services: Arc<FixtureServices>,
}

impl Worker {
    /// Assemble registry, gates and dispatcher
    ///
    /// # Errors
    ///
    /// Duplicate command names, or a command whose timeout is not longer
    /// than the authorization deadline.
    pub fn build(config: &WorkerConfig, services: Arc<FixtureServices>) -> Result<Self, BuildError> {
        let blacklist = Arc::new(BlacklistStore::with_ttl(
            services.blacklist(),
            config.blacklist_cache.capacity,
            config.cache_ttl(),
        ));
        let registry = Arc::new(build_registry(config, &services, Arc::clone(&blacklist))?);
        check_timeouts(config, &mut registry.iter().map(|c| c.as_ref()))?;

        let resolver = CommandResolver::new(Arc::clone(&registry))
            .with_aliases(Arc::clone(&services) as _);
        let authorization = AuthorizationResolver::new(
            Arc::clone(&services) as _,
            Arc::clone(&services) as _,
        )
        .with_lookup_timeout(config.authorization_timeout());
        let gates = GatePipeline::standard(blacklist, Arc::new(config.staff()));

        let dispatcher = Dispatcher::new(
            resolver,
            authorization,
            gates,
            config.dispatch_settings(),
        );

        tracing::info!(commands = registry.len(), "Worker assembled");
        Ok(Self {
            registry,
            dispatcher,
            services,
        })
    }

    /// Command registry
    #[must_use]
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Collaborators
    #[must_use]
    pub fn services(&self) -> &FixtureServices {
        &self.services
    }

    /// Registry listing
    #[must_use]
    pub fn commands(&self) -> Vec<CommandSummary> {
        self.registry
            .iter()
            .map(|c| CommandSummary::from_command(c))
            .collect()
    }

    /// Dispatch `event` and wait for the unit to finish
    pub async fn replay(&self, event: InteractionEvent) -> ReplayOutcome {
        match self.dispatcher.dispatch(event).await {
            Ok(outcome) => ReplayOutcome {
                should_auto_defer: outcome.should_auto_defer,
                default_ephemeral: outcome.default_ephemeral,
                response: outcome.join().await,
                error: None,
            },
            Err(err) => ReplayOutcome {
                should_auto_defer: false,
                default_ephemeral: false,
                response: Some(err.to_envelope()),
                error: Some(err.to_string()),
            },
        }
    }
}

fn check_timeouts<'a>(
    config: &WorkerConfig,
    commands: &mut dyn Iterator<Item = &'a RegisteredCommand>,
) -> Result<(), ConfigError> {
    for command in commands {
        let descriptor = command.descriptor();
        config.check_command_timeout(&descriptor.name, descriptor.timeout)?;
        check_timeouts(config, &mut command.children().iter().map(|c| c.as_ref()))?;
    }
    Ok(())
}

/// Every command the worker serves
///
/// # Errors
///
/// Duplicate command names.
pub fn build_registry(
    config: &WorkerConfig,
    services: &Arc<FixtureServices>,
    blacklist: Arc<BlacklistStore>,
) -> Result<CommandRegistry, RegistryError> {
    let roles = RoleSynchronizer::new(Arc::clone(services) as _, services.on_call());
    CommandRegistry::new()
        .with(RegisteredCommand::new(OnCallCommand::new(
            services.on_call(),
            roles,
            config.bot.docs_url.clone(),
        )))?
        .with(admin_group(blacklist, Arc::clone(services) as _))
}
