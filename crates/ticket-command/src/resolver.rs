//! Command resolution: registry, tag-alias fallback, subcommand descent

use crate::descriptor::CommandDescriptor;
use crate::executor::CommandHandler;
use crate::registry::{CommandRegistry, RegisteredCommand};
use crate::tag::Tag;
use std::sync::Arc;
use ticket_model::{CommandId, CommandOption, ExternalError, GuildId, InteractionEvent};

/// Resolution failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    /// Neither the registry nor the alias service knows the command
    #[error("command {0} does not exist")]
    CommandNotFound(String),

    /// An option node named a subcommand the parent doesn't declare
    #[error("subcommand {child} does not exist for command {parent}")]
    SubcommandNotFound {
        /// Parent command name
        parent: String,
        /// Requested subcommand name
        child: String,
    },

    /// The alias service failed
    #[error("alias lookup failed: {0}")]
    AliasLookup(#[source] ExternalError),
}

/// Tag-to-command mapping service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AliasResolver: Send + Sync {
    /// Tag registered as `command_id` in `guild_id`, if any
    async fn lookup_alias(
        &self,
        guild_id: GuildId,
        command_id: CommandId,
    ) -> Result<Option<Tag>, ExternalError>;
}

/// Alias resolver that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAliases;

#[async_trait::async_trait]
impl AliasResolver for NoAliases {
    async fn lookup_alias(
        &self,
        _guild_id: GuildId,
        _command_id: CommandId,
    ) -> Result<Option<Tag>, ExternalError> {
        Ok(None)
    }
}

/// Concrete command selected for an invocation
#[derive(Debug, Clone)]
pub struct ResolvedCommand {
    command: Arc<RegisteredCommand>,
    path: Vec<String>,
    options: Vec<CommandOption>,
}

impl ResolvedCommand {
    /// Properties of the selected (sub)command
    #[must_use]
    pub fn descriptor(&self) -> &CommandDescriptor {
        self.command.descriptor()
    }

    /// Handler of the selected (sub)command
    #[must_use]
    pub fn handler(&self) -> &CommandHandler {
        self.command.handler()
    }

    /// Names from the top-level command down to the selected one
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Space-joined path, as typed by the user
    #[must_use]
    pub fn qualified_name(&self) -> String {
        self.path.join(" ")
    }

    /// Leaf options left for argument binding
    #[must_use]
    pub fn options(&self) -> &[CommandOption] {
        &self.options
    }
}

/// Walk the option tree from `root` down to the selected subcommand
///
/// Descends while the first option node carries no value, matching its
/// name against the current command's children.
///
/// # Errors
///
/// [`ResolveError::SubcommandNotFound`] on the first unmatched name.
pub fn descend(
    root: Arc<RegisteredCommand>,
    options: &[CommandOption],
) -> Result<ResolvedCommand, ResolveError> {
    let mut command = root;
    let mut path = vec![command.name().to_owned()];
    let mut options = options;

    while let Some(node) = options.first().filter(|node| node.value.is_none()) {
        let child = command
            .child(&node.name)
            .cloned()
            .ok_or_else(|| ResolveError::SubcommandNotFound {
                parent: command.name().to_owned(),
                child: node.name.clone(),
            })?;

        path.push(child.name().to_owned());
        command = child;
        options = &node.options;
    }

    Ok(ResolvedCommand {
        command,
        path,
        options: options.to_vec(),
    })
}

/// Maps inbound events to runnable commands
#[derive(Clone)]
pub struct CommandResolver {
    registry: Arc<CommandRegistry>,
    aliases: Arc<dyn AliasResolver>,
}

impl CommandResolver {
    /// Resolver over `registry` with no alias service
    #[must_use]
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self {
            registry,
            aliases: Arc::new(NoAliases),
        }
    }

    /// Builder: alias service
    #[must_use]
    pub fn with_aliases(mut self, aliases: Arc<dyn AliasResolver>) -> Self {
        self.aliases = aliases;
        self
    }

    /// Underlying registry
    #[must_use]
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Resolve the handler and properties for `event`
    ///
    /// # Errors
    ///
    /// [`ResolveError::CommandNotFound`], [`ResolveError::SubcommandNotFound`],
    /// or [`ResolveError::AliasLookup`] when the alias service fails.
    pub async fn resolve(&self, event: &InteractionEvent) -> Result<ResolvedCommand, ResolveError> {
        let root = match self.registry.get(&event.command_name) {
            Some(command) => Arc::clone(command),
            None => self.resolve_alias(event).await?,
        };

        descend(root, &event.options)
    }

    async fn resolve_alias(
        &self,
        event: &InteractionEvent,
    ) -> Result<Arc<RegisteredCommand>, ResolveError> {
        let not_found = || ResolveError::CommandNotFound(event.command_name.clone());

        let guild_id = event.guild_id.ok_or_else(not_found)?;
        let tag = self
            .aliases
            .lookup_alias(guild_id, event.command_id)
            .await
            .map_err(ResolveError::AliasLookup)?
            .ok_or_else(not_found)?;

        tracing::debug!(
            command = %event.command_name,
            tag = %tag.id,
            guild_id = %guild_id,
            "Resolved command via tag alias"
        );
        Ok(Arc::new(RegisteredCommand::tag(tag)))
    }
}

impl std::fmt::Debug for CommandResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandResolver")
            .field("commands", &self.registry.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticket_model::{Member, OptionValue, User};

    fn registry() -> Arc<CommandRegistry> {
        let panel = RegisteredCommand::group(
            CommandDescriptor::new("panel", "Manage panels"),
            vec![RegisteredCommand::group(
                CommandDescriptor::new("create", "Create a panel"),
                vec![],
            )],
        );
        Arc::new(CommandRegistry::new().with(panel).unwrap())
    }

    fn event(name: &str) -> InteractionEvent {
        InteractionEvent::in_guild(55, name, GuildId(10), Member::new(User::new(7, "ryan")))
    }

    #[tokio::test]
    async fn resolves_registered_subcommand() {
        let resolver = CommandResolver::new(registry());
        let event = event("panel").with_options(vec![CommandOption::subcommand(
            "create",
            vec![CommandOption::value("title", OptionValue::String("x".into()))],
        )]);

        let resolved = resolver.resolve(&event).await.unwrap();
        assert_eq!(resolved.qualified_name(), "panel create");
        assert_eq!(resolved.options().len(), 1);
    }

    #[tokio::test]
    async fn unknown_subcommand() {
        let resolver = CommandResolver::new(registry());
        let event =
            event("panel").with_options(vec![CommandOption::subcommand("delete", vec![])]);

        assert_eq!(
            resolver.resolve(&event).await.unwrap_err(),
            ResolveError::SubcommandNotFound {
                parent: "panel".into(),
                child: "delete".into()
            }
        );
    }

    #[tokio::test]
    async fn falls_back_to_alias() {
        let mut aliases = MockAliasResolver::new();
        aliases
            .expect_lookup_alias()
            .withf(|guild, cmd| *guild == GuildId(10) && *cmd == CommandId(55))
            .times(1)
            .returning(|_, _| {
                Ok(Some(Tag {
                    id: "rules".into(),
                    content: Some("Be nice".into()),
                    embed: None,
                }))
            });

        let resolver = CommandResolver::new(registry()).with_aliases(Arc::new(aliases));
        let resolved = resolver.resolve(&event("rules")).await.unwrap();
        assert_eq!(resolved.descriptor().name, "rules");
        assert_eq!(resolved.handler().kind(), "tag");
    }

    #[tokio::test]
    async fn missing_alias_is_not_found() {
        let mut aliases = MockAliasResolver::new();
        aliases.expect_lookup_alias().returning(|_, _| Ok(None));

        let resolver = CommandResolver::new(registry()).with_aliases(Arc::new(aliases));
        assert_eq!(
            resolver.resolve(&event("nope")).await.unwrap_err(),
            ResolveError::CommandNotFound("nope".into())
        );
    }

    #[tokio::test]
    async fn alias_failure_propagates() {
        let mut aliases = MockAliasResolver::new();
        aliases
            .expect_lookup_alias()
            .returning(|_, _| Err(ExternalError::transient("db down")));

        let resolver = CommandResolver::new(registry()).with_aliases(Arc::new(aliases));
        assert!(matches!(
            resolver.resolve(&event("nope")).await,
            Err(ResolveError::AliasLookup(ExternalError::Transient(_)))
        ));
    }

    #[tokio::test]
    async fn direct_message_skips_alias_service() {
        let mut aliases = MockAliasResolver::new();
        aliases.expect_lookup_alias().times(0);

        let resolver = CommandResolver::new(registry()).with_aliases(Arc::new(aliases));
        let event = InteractionEvent::in_direct_message(55, "rules", User::new(7, "ryan"));
        assert!(matches!(
            resolver.resolve(&event).await,
            Err(ResolveError::CommandNotFound(_))
        ));
    }
}
