//! Command handler trait and the handler variants the registry stores

use crate::arguments::BoundArguments;
use crate::context::CommandContext;
use crate::descriptor::CommandDescriptor;
use crate::error::CommandError;
use crate::tag::Tag;
use std::fmt;
use std::sync::Arc;

/// Executes a command
///
/// Implementations reply through [`CommandContext::reply`] at most once.
#[async_trait::async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Static properties of the command
    fn descriptor(&self) -> CommandDescriptor;

    /// Run the command
    async fn execute(&self, ctx: &CommandContext, args: BoundArguments)
        -> Result<(), CommandError>;
}

/// Handler stored for a resolved command
#[derive(Clone)]
pub enum CommandHandler {
    /// Registered executor
    Executor(Arc<dyn CommandExecutor>),
    /// Guild tag exposed as a command
    Tag(Arc<Tag>),
    /// Container for subcommands; not runnable on its own
    Group,
}

impl CommandHandler {
    /// Run the handler
    ///
    /// # Errors
    ///
    /// Whatever the handler returns. Invoking a bare group is an internal error.
    pub async fn execute(
        &self,
        ctx: &CommandContext,
        args: BoundArguments,
    ) -> Result<(), CommandError> {
        match self {
            Self::Executor(executor) => executor.execute(ctx, args).await,
            Self::Tag(tag) => tag.send(ctx),
            Self::Group => Err(CommandError::internal(
                "command group invoked without a subcommand",
            )),
        }
    }

    /// Short variant name for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Executor(_) => "executor",
            Self::Tag(_) => "tag",
            Self::Group => "group",
        }
    }
}

impl fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) => f.debug_tuple("Tag").field(&tag.id).finish(),
            other => f.write_str(other.kind()),
        }
    }
}
