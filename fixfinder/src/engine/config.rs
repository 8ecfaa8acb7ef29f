//! Engine configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::availability::DEFAULT_PROMPT_DEBOUNCE_WINDOW;
use crate::platform::SubscriptionParams;

// ==================== Acquisition Defaults ====================

/// Default maximum age for a cached fix to be returned without going live.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(60);

/// How the engine treats cached (last-known) fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Accept a cached fix younger than the freshness window.
    #[default]
    Fresh,
    /// Accept any cached fix regardless of age.
    AcceptAny,
    /// Ignore the cache and always wait for a live fix.
    LiveOnly,
}

impl CacheMode {
    /// Configuration-file spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheMode::Fresh => "fresh",
            CacheMode::AcceptAny => "any",
            CacheMode::LiveOnly => "live",
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fresh" => Ok(CacheMode::Fresh),
            "any" | "accept_any" => Ok(CacheMode::AcceptAny),
            "live" | "live_only" => Ok(CacheMode::LiveOnly),
            other => Err(format!(
                "unknown cache mode '{}' (expected fresh, any or live)",
                other
            )),
        }
    }
}

/// Configuration for [`AcquisitionEngine`](super::AcquisitionEngine).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    // ==================== Cache ====================
    /// Maximum age of a cached fix accepted in [`CacheMode::Fresh`].
    ///
    /// Default: 60 seconds.
    pub freshness_window: Duration,

    /// Cache policy.
    pub cache_mode: CacheMode,

    // ==================== Live Updates ====================
    /// Parameters passed to every live-update subscription.
    pub subscription: SubscriptionParams,

    // ==================== Prompting ====================
    /// Minimum time between two high-accuracy prompts.
    ///
    /// With the default window engines share the process-wide debounce;
    /// any other value gives the engine a dedicated one.
    pub prompt_debounce_window: Duration,

    // ==================== Hosts ====================
    /// Deadline used by hosts that do not pass one explicitly.
    ///
    /// The engine itself never applies it; `start(None)` means no deadline.
    pub default_deadline: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            cache_mode: CacheMode::default(),
            subscription: SubscriptionParams::default(),
            prompt_debounce_window: DEFAULT_PROMPT_DEBOUNCE_WINDOW,
            default_deadline: None,
        }
    }
}

impl EngineConfig {
    /// Set the freshness window.
    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    /// Set the cache mode.
    pub fn with_cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = mode;
        self
    }

    /// Set the subscription parameters.
    pub fn with_subscription(mut self, params: SubscriptionParams) -> Self {
        self.subscription = params;
        self
    }

    /// Set the prompt debounce window.
    pub fn with_prompt_debounce_window(mut self, window: Duration) -> Self {
        self.prompt_debounce_window = window;
        self
    }

    /// Set the host default deadline.
    pub fn with_default_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.default_deadline = deadline;
        self
    }
}
