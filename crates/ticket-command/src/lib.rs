//! Ticket Worker Commands
//!
//! Everything needed to turn an inbound interaction into a concrete,
//! runnable handler:
//! - [`CommandDescriptor`]: immutable per-command properties
//! - [`CommandRegistry`]: read-only name → command table
//! - [`CommandResolver`]: registry lookup, tag-alias fallback, subcommand descent
//! - [`bind_arguments`]: option tree → typed [`BoundArguments`]
//! - [`CommandContext`] / [`ResponseSender`]: per-invocation state and the
//!   single-use response channel

#![warn(unreachable_pub)]

pub mod arguments;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod registry;
pub mod resolver;
pub mod tag;

pub use arguments::{bind_arguments, ArgumentError, ArgumentKind, ArgumentSpec, BoundArguments};
pub use context::{response_channel, CommandContext, ReplyError, ResponseSender};
pub use descriptor::CommandDescriptor;
pub use error::CommandError;
pub use executor::{CommandExecutor, CommandHandler};
pub use registry::{CommandRegistry, RegisteredCommand, RegistryError};
pub use resolver::{descend, AliasResolver, CommandResolver, NoAliases, ResolveError, ResolvedCommand};
pub use tag::{Tag, TAG_TIMEOUT};

/// Commonly used types
pub mod prelude {
    pub use crate::{
        ArgumentKind, ArgumentSpec, BoundArguments, CommandContext, CommandDescriptor,
        CommandError, CommandExecutor, RegisteredCommand,
    };
}
