//! Ticket Worker
//!
//! Configuration, logging bootstrap, registry assembly and the in-memory
//! collaborators behind `ticket-worker replay`.

pub mod app;
pub mod commands;
pub mod config;
pub mod fixture;
pub mod logging;

pub use app::{build_registry, BuildError, CommandSummary, ReplayOutcome, Worker};
pub use config::{ConfigError, WorkerConfig};
pub use fixture::{Fixture, FixtureServices};
