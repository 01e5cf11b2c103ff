//! Ticket Worker Dispatch
//!
//! [`Dispatcher`] turns one inbound interaction into one isolated task:
//! resolve synchronously, check the invocation context, then spawn a
//! panic-contained, deadline-scoped unit that resolves authorization,
//! runs the gates, binds arguments and invokes the handler. At most one
//! [`ResponseEnvelope`](ticket_model::ResponseEnvelope) is delivered per
//! invocation.

#![warn(unreachable_pub)]

pub mod reporter;
pub mod settings;
pub mod supervisor;
mod unit;

pub use reporter::{ErrorReporter, StaffStatus};
pub use settings::DispatchSettings;
pub use supervisor::{DispatchError, DispatchOutcome, Dispatcher};
