//! Commands assembled into the worker's registry

pub mod admin;

pub use admin::{admin_group, GuildDirectory};
