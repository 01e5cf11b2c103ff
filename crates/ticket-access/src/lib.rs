//! Ticket Worker Access Control
//!
//! Decides whether an invocation may reach its handler:
//! - [`AuthorizationResolver`]: concurrent permission/premium lookup under a deadline
//! - [`BlacklistStore`]: read-through cached guild/user blacklist
//! - [`GatePipeline`]: ordered, short-circuiting admission checks

#![warn(unreachable_pub)]

pub mod authorization;
pub mod blacklist;
pub mod denial;
pub mod gate;
pub mod gates;
pub mod staff;

pub use authorization::{
    AuthorizationError, AuthorizationResolver, PermissionProvider, PremiumProvider,
    DEFAULT_LOOKUP_TIMEOUT,
};
pub use blacklist::{
    BlacklistError, BlacklistRecord, BlacklistRepository, BlacklistStore,
    InMemoryBlacklistRepository,
};
pub use denial::{Denial, DenialLinks};
pub use gate::{check_context, Gate, GateError, GateInput, GatePipeline, Verdict};
pub use staff::StaffAllowlist;
