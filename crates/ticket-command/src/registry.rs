//! Read-only command table

use crate::descriptor::CommandDescriptor;
use crate::executor::{CommandExecutor, CommandHandler};
use crate::tag::Tag;
use indexmap::IndexMap;
use std::sync::Arc;

/// Registration failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Two commands share a name
    #[error("command {0} registered twice")]
    Duplicate(String),
}

/// A command with its descriptor, handler and subcommands
#[derive(Debug, Clone)]
pub struct RegisteredCommand {
    descriptor: CommandDescriptor,
    handler: CommandHandler,
    children: Vec<Arc<RegisteredCommand>>,
}

impl RegisteredCommand {
    /// Wrap an executor, taking its descriptor
    #[must_use]
    pub fn new<E: CommandExecutor + 'static>(executor: E) -> Self {
        Self::from_executor(Arc::new(executor))
    }

    /// Wrap a shared executor
    #[must_use]
    pub fn from_executor(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            descriptor: executor.descriptor(),
            handler: CommandHandler::Executor(executor),
            children: Vec::new(),
        }
    }

    /// Group holding only subcommands
    #[must_use]
    pub fn group(descriptor: CommandDescriptor, children: Vec<RegisteredCommand>) -> Self {
        Self {
            descriptor,
            handler: CommandHandler::Group,
            children: children.into_iter().map(Arc::new).collect(),
        }
    }

    /// Command generated from a guild tag
    #[must_use]
    pub fn tag(tag: Tag) -> Self {
        Self {
            descriptor: tag.descriptor(),
            handler: CommandHandler::Tag(Arc::new(tag)),
            children: Vec::new(),
        }
    }

    /// Command properties
    #[must_use]
    pub fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    /// Command name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Handler variant
    #[must_use]
    pub fn handler(&self) -> &CommandHandler {
        &self.handler
    }

    /// Subcommands, in declaration order
    #[must_use]
    pub fn children(&self) -> &[Arc<RegisteredCommand>] {
        &self.children
    }

    /// Subcommand by name
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Arc<RegisteredCommand>> {
        self.children.iter().find(|c| c.name() == name)
    }
}

/// Name → command table, populated at startup and read-only afterwards
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: IndexMap<String, Arc<RegisteredCommand>>,
}

impl CommandRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a top-level command
    ///
    /// # Errors
    ///
    /// [`RegistryError::Duplicate`] if the name is taken.
    pub fn register(&mut self, command: RegisteredCommand) -> Result<(), RegistryError> {
        let name = command.name().to_owned();
        if self.commands.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.commands.insert(name, Arc::new(command));
        Ok(())
    }

    /// Builder form of [`register`](Self::register)
    ///
    /// # Errors
    ///
    /// [`RegistryError::Duplicate`] if the name is taken.
    pub fn with(mut self, command: RegisteredCommand) -> Result<Self, RegistryError> {
        self.register(command)?;
        Ok(self)
    }

    /// Look up by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<RegisteredCommand>> {
        self.commands.get(name)
    }

    /// Registered commands, in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RegisteredCommand>> {
        self.commands.values()
    }

    /// Number of top-level commands
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// No commands registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
