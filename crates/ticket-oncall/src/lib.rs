//! Ticket Worker On-Call
//!
//! The `on-call` command and the role-sync state machine it drives.
//! Role sync creates or reuses an externally managed role, assigns it,
//! and heals persisted state when the role was deleted out-of-band.

#![warn(unreachable_pub)]

pub mod command;
pub mod repository;
pub mod role_sync;

pub use command::OnCallCommand;
pub use repository::{InMemoryOnCallRepository, MemberTeams, OnCallRepository, SupportTeam};
pub use role_sync::{
    RoleAssignmentTarget, RoleProvider, RoleStateStore, RoleSyncError, RoleSyncState,
    RoleSynchronizer, RoleTarget, MAX_ATTEMPTS,
};
