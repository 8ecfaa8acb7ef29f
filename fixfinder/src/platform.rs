//! Host collaborator interfaces.
//!
//! The acquisition engine never talks to a positioning stack, a permission
//! system or a UI directly. Hosts implement these traits:
//!
//! - [`LocationPlatform`] - enabled sources, cached fixes, live subscriptions
//! - [`PermissionService`] - permission checks and asynchronous requests
//! - [`HostUi`] - fire-and-forget prompts and settings screens
//!
//! Every call is synchronous and must return promptly. Outcomes of
//! asynchronous workflows (a permission dialog, a settings screen, a prompt)
//! flow back into the engine through its `handle_*` methods, keyed by the
//! [`RequestId`] passed to the host here.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::HostError;
use crate::fix::{Fix, FixSource};
use crate::subscription::FixSink;

/// Default minimum interval between live updates requested from a source.
pub const DEFAULT_MIN_UPDATE_INTERVAL: Duration = Duration::from_secs(60);

/// Default minimum distance (meters) between live updates.
pub const DEFAULT_MIN_UPDATE_DISTANCE_METERS: f64 = 10.0;

// =============================================================================
// Correlation
// =============================================================================

/// Per-request correlation identifier.
///
/// Unique within the process. Hosts echo it back when reporting the outcome
/// of a permission request or prompt so that results for a superseded
/// request can be recognised and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

impl RequestId {
    /// Allocate a fresh identifier.
    pub(crate) fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value (e.g. to use as a platform request code).
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Rebuild an identifier from a value previously obtained via [`as_u64`](Self::as_u64).
    pub fn from_u64(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

// =============================================================================
// Positioning
// =============================================================================

/// Snapshot of which sources are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnabledSources {
    pub precise: bool,
    pub network: bool,
    pub passive: bool,
}

impl EnabledSources {
    /// Every source enabled.
    pub const ALL: Self = Self {
        precise: true,
        network: true,
        passive: true,
    };

    /// No source enabled.
    pub const NONE: Self = Self {
        precise: false,
        network: false,
        passive: false,
    };

    /// Whether `source` is enabled.
    pub fn is_enabled(&self, source: FixSource) -> bool {
        match source {
            FixSource::Precise => self.precise,
            FixSource::Network => self.network,
            FixSource::Passive => self.passive,
        }
    }

    /// Whether at least one of the required sources (precise, network) is on.
    pub fn has_required(&self) -> bool {
        self.precise || self.network
    }

    /// Sources to subscribe to for a live fix.
    ///
    /// Precise and network when either is enabled; otherwise passive alone
    /// if enabled; otherwise nothing.
    pub fn live_sources(&self) -> Vec<FixSource> {
        if self.has_required() {
            [FixSource::Precise, FixSource::Network]
                .into_iter()
                .filter(|s| self.is_enabled(*s))
                .collect()
        } else if self.passive {
            vec![FixSource::Passive]
        } else {
            Vec::new()
        }
    }
}

/// Parameters for a live-update registration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubscriptionParams {
    /// Minimum interval between updates.
    pub min_interval: Duration,
    /// Minimum distance between updates, in meters.
    pub min_distance_meters: f64,
}

impl Default for SubscriptionParams {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_UPDATE_INTERVAL,
            min_distance_meters: DEFAULT_MIN_UPDATE_DISTANCE_METERS,
        }
    }
}

/// Opaque handle for a live-update registration, chosen by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// The host's positioning subsystem.
pub trait LocationPlatform: Send + Sync {
    /// Which sources are currently enabled. Never cached by the engine.
    fn enabled_sources(&self) -> Result<EnabledSources, HostError>;

    /// Last cached fix for `source`, if any.
    fn last_known_fix(&self, source: FixSource) -> Result<Option<Fix>, HostError>;

    /// Register for live fixes from `source`.
    ///
    /// Fixes are delivered through `sink`, from any thread, possibly before
    /// this call returns.
    fn subscribe(
        &self,
        source: FixSource,
        params: SubscriptionParams,
        sink: FixSink,
    ) -> Result<SubscriptionHandle, HostError>;

    /// Cancel a registration. Must be idempotent.
    fn unsubscribe(&self, handle: SubscriptionHandle);
}

// =============================================================================
// Permissions
// =============================================================================

/// Permission scopes required for location acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionScope {
    /// Fine-grained (precise) location.
    Fine,
    /// Coarse (approximate) location.
    Coarse,
}

impl PermissionScope {
    /// Both scopes, requested together.
    pub const REQUIRED: [PermissionScope; 2] = [PermissionScope::Fine, PermissionScope::Coarse];
}

/// Current grant state of a permission scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// The host's permission system.
pub trait PermissionService: Send + Sync {
    /// Current grant state for `scope`.
    fn check(&self, scope: PermissionScope) -> Result<PermissionStatus, HostError>;

    /// Show the permission dialog for `scopes`. Returns immediately.
    ///
    /// The outcome is reported later via
    /// `AcquisitionEngine::handle_permission_result(correlation, ..)`.
    fn request(&self, scopes: &[PermissionScope], correlation: RequestId) -> Result<(), HostError>;
}

// =============================================================================
// UI
// =============================================================================

/// User's answer to the "enable high accuracy" prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptResponse {
    /// User wants to enable the network source; open the location settings.
    Accepted,
    /// User declined; continue with the sources that are on.
    Declined,
}

/// Fire-and-forget UI surfaces owned by the host.
pub trait HostUi: Send + Sync {
    /// Ask the user to enable network positioning in addition to precise.
    ///
    /// The answer is reported via `AcquisitionEngine::handle_prompt_response`.
    fn prompt_enable_high_accuracy(&self, correlation: RequestId) -> Result<(), HostError>;

    /// Open the system location settings.
    ///
    /// The user's return is reported via `AcquisitionEngine::handle_settings_return`.
    fn open_location_settings(&self, correlation: RequestId) -> Result<(), HostError>;

    /// Open this application's settings page (permission recovery).
    fn open_app_settings(&self) -> Result<(), HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_sources_prefers_required() {
        let enabled = EnabledSources::ALL;
        assert_eq!(
            enabled.live_sources(),
            vec![FixSource::Precise, FixSource::Network]
        );

        let precise_only = EnabledSources {
            precise: true,
            network: false,
            passive: true,
        };
        assert_eq!(precise_only.live_sources(), vec![FixSource::Precise]);
    }

    #[test]
    fn test_live_sources_falls_back_to_passive() {
        let passive_only = EnabledSources {
            precise: false,
            network: false,
            passive: true,
        };
        assert_eq!(passive_only.live_sources(), vec![FixSource::Passive]);
        assert!(EnabledSources::NONE.live_sources().is_empty());
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestId::next();
        let b = RequestId::next();

        assert_ne!(a, b);
        assert_eq!(RequestId::from_u64(a.as_u64()), a);
        assert!(a.to_string().starts_with("req-"));
    }
}
