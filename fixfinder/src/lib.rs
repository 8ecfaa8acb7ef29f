//! fixfinder - best-effort current-location acquisition
//!
//! Finds the device's current position by combining cached fixes with live
//! updates from several positioning sources, under a permission policy, a
//! provider-enablement policy and an optional deadline.
//!
//! The host supplies its positioning stack, permission system and UI through
//! the traits in [`platform`]; [`engine::AcquisitionEngine`] does the rest and
//! reports one outcome per request through a [`listener::AcquisitionListener`].

pub mod availability;
pub mod clock;
pub mod comparator;
pub mod config;
pub mod engine;
pub mod error;
pub mod fix;
pub mod listener;
pub mod logging;
pub mod permission;
pub mod platform;
pub mod sim;
pub mod subscription;

pub use engine::{AcquisitionEngine, CacheMode, EngineConfig, EngineHandle, Phase, StartOutcome};
pub use error::{AcquisitionError, EngineError, HostError};
pub use fix::{Fix, FixSource, FixTime};
pub use listener::{AcquisitionEvent, AcquisitionListener, ChannelListener};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
