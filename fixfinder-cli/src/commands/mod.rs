//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`compare`] - Evaluate the fix comparator on two fixes
//! - [`config`] - Configuration management (path, show, init)
//! - [`locate`] - Run one acquisition against the simulated host

pub mod common;
pub mod compare;
pub mod config;
pub mod locate;
