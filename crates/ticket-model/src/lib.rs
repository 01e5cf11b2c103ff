//! Ticket Worker Model
//!
//! Plain data shared by every stage of the interaction pipeline:
//! - Snowflake identifiers (`GuildId`, `UserId`, `RoleId`, ...)
//! - Ordered authorization scales (`PermissionLevel`, `PremiumTier`)
//! - Inbound interaction events and their option trees
//! - Outbound response envelopes
//! - Platform REST failure taxonomy

#![warn(unreachable_pub)]

pub mod error;
pub mod event;
pub mod ids;
pub mod level;
pub mod response;

pub use error::{ExternalError, UnknownResource};
pub use event::{CommandOption, InteractionEvent, InvocationKind, Member, OptionValue, User};
pub use ids::{CommandId, GuildId, RoleId, TeamId, UserId};
pub use level::{AuthorizationFacts, PermissionLevel, PremiumTier};
pub use response::{Colour, Component, Embed, ResponseEnvelope};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
