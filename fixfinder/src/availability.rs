//! Provider availability and prompt debounce.
//!
//! [`ProviderAvailability`] reads the enabled-source snapshot from the host
//! platform and applies the provider policy:
//!
//! ```text
//! !precise && !network          -> OpenSettings      (suspend until settings return)
//!  precise && !network          -> PromptHighAccuracy (if debounce allows)
//!                               -> Usable            (otherwise)
//!  network                      -> Usable
//! ```
//!
//! The high-accuracy prompt is debounced process-wide through
//! [`PromptDebounce`] so that several engines cannot stack prompts on top of
//! each other.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::HostError;
use crate::fix::FixTime;
use crate::platform::{EnabledSources, LocationPlatform};

/// Default minimum time between two high-accuracy prompts.
pub const DEFAULT_PROMPT_DEBOUNCE_WINDOW: Duration = Duration::from_secs(60);

// =============================================================================
// Prompt Debounce
// =============================================================================

/// Rolling-window debounce for the "enable high accuracy" prompt.
///
/// # Scope
///
/// [`PromptDebounce::shared`] returns a debounce backed by the process-wide
/// last-prompt record, so every engine built without an explicit debounce
/// sees prompts shown by every other one, whatever window each is
/// configured with. [`PromptDebounce::new`] creates an isolated instance for
/// injection (tests, multi-tenant hosts).
///
/// Access is single-writer: the last-prompt time is read and updated under
/// one mutex acquisition.
#[derive(Debug)]
pub struct PromptDebounce {
    window: Duration,
    last_prompt: Arc<Mutex<Option<FixTime>>>,
}

static GLOBAL_LAST_PROMPT: OnceLock<Arc<Mutex<Option<FixTime>>>> = OnceLock::new();
static GLOBAL_DEBOUNCE: OnceLock<Arc<PromptDebounce>> = OnceLock::new();

fn global_last_prompt() -> Arc<Mutex<Option<FixTime>>> {
    GLOBAL_LAST_PROMPT
        .get_or_init(|| Arc::new(Mutex::new(None)))
        .clone()
}

impl PromptDebounce {
    /// Create a debounce with the given window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_prompt: Arc::new(Mutex::new(None)),
        }
    }

    /// A debounce with `window` over the process-wide last-prompt record.
    pub fn shared(window: Duration) -> Arc<PromptDebounce> {
        Arc::new(Self {
            window,
            last_prompt: global_last_prompt(),
        })
    }

    /// The process-wide debounce (60 second window).
    pub fn global() -> Arc<PromptDebounce> {
        GLOBAL_DEBOUNCE
            .get_or_init(|| PromptDebounce::shared(DEFAULT_PROMPT_DEBOUNCE_WINDOW))
            .clone()
    }

    /// True if both debounces record prompts in the same place.
    pub fn shares_state_with(&self, other: &PromptDebounce) -> bool {
        Arc::ptr_eq(&self.last_prompt, &other.last_prompt)
    }

    /// The debounce window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Claim the right to show a prompt at `now`.
    ///
    /// Returns true (and records `now`) when no prompt was shown within the
    /// window; false otherwise.
    pub fn try_acquire(&self, now: FixTime) -> bool {
        let mut last = self.last_prompt.lock();
        let allowed = match *last {
            None => true,
            Some(previous) => now.since(previous) >= self.window,
        };
        if allowed {
            *last = Some(now);
        }
        allowed
    }

    /// Time of the last prompt, if any.
    pub fn last_prompt(&self) -> Option<FixTime> {
        *self.last_prompt.lock()
    }
}

impl Default for PromptDebounce {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT_DEBOUNCE_WINDOW)
    }
}

// =============================================================================
// Provider Availability
// =============================================================================

/// Outcome of the provider policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderVerdict {
    /// Acquisition can proceed with these sources.
    Usable(EnabledSources),
    /// Only precise is on; ask the user to enable network too.
    PromptHighAccuracy(EnabledSources),
    /// Neither required source is on; send the user to location settings.
    OpenSettings,
}

/// Provider policy over a host platform.
pub struct ProviderAvailability {
    platform: Arc<dyn LocationPlatform>,
    debounce: Arc<PromptDebounce>,
}

impl ProviderAvailability {
    /// Create a policy over `platform` using `debounce` for prompts.
    pub fn new(platform: Arc<dyn LocationPlatform>, debounce: Arc<PromptDebounce>) -> Self {
        Self { platform, debounce }
    }

    /// Fresh snapshot of enabled sources.
    pub fn enabled(&self) -> Result<EnabledSources, HostError> {
        self.platform.enabled_sources()
    }

    /// Apply the provider policy at `now`.
    ///
    /// A `PromptHighAccuracy` verdict consumes the debounce window.
    pub fn evaluate(&self, now: FixTime) -> Result<ProviderVerdict, HostError> {
        let enabled = self.enabled()?;

        let verdict = if !enabled.has_required() {
            ProviderVerdict::OpenSettings
        } else if enabled.precise && !enabled.network {
            if self.debounce.try_acquire(now) {
                ProviderVerdict::PromptHighAccuracy(enabled)
            } else {
                tracing::debug!("High-accuracy prompt suppressed by debounce");
                ProviderVerdict::Usable(enabled)
            }
        } else {
            ProviderVerdict::Usable(enabled)
        };

        tracing::debug!(
            precise = enabled.precise,
            network = enabled.network,
            passive = enabled.passive,
            verdict = ?verdict,
            "Provider availability evaluated"
        );
        Ok(verdict)
    }
}

impl std::fmt::Debug for ProviderAvailability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderAvailability")
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fix::{Fix, FixSource};
    use crate::platform::{SubscriptionHandle, SubscriptionParams};
    use crate::subscription::FixSink;

    struct FixedSources(Result<EnabledSources, HostError>);

    impl LocationPlatform for FixedSources {
        fn enabled_sources(&self) -> Result<EnabledSources, HostError> {
            self.0.clone()
        }

        fn last_known_fix(&self, _source: FixSource) -> Result<Option<Fix>, HostError> {
            Ok(None)
        }

        fn subscribe(
            &self,
            _source: FixSource,
            _params: SubscriptionParams,
            _sink: FixSink,
        ) -> Result<SubscriptionHandle, HostError> {
            Ok(SubscriptionHandle(0))
        }

        fn unsubscribe(&self, _handle: SubscriptionHandle) {}
    }

    fn availability(enabled: EnabledSources) -> ProviderAvailability {
        ProviderAvailability::new(
            Arc::new(FixedSources(Ok(enabled))),
            Arc::new(PromptDebounce::default()),
        )
    }

    fn sources(precise: bool, network: bool, passive: bool) -> EnabledSources {
        EnabledSources {
            precise,
            network,
            passive,
        }
    }

    #[test]
    fn test_debounce_allows_first_prompt() {
        let debounce = PromptDebounce::new(Duration::from_secs(60));

        assert!(debounce.try_acquire(FixTime::from_millis(0)));
        assert_eq!(debounce.last_prompt(), Some(FixTime::from_millis(0)));
    }

    #[test]
    fn test_debounce_window_is_inclusive_at_boundary() {
        let debounce = PromptDebounce::new(Duration::from_secs(60));

        assert!(debounce.try_acquire(FixTime::from_millis(1_000)));
        assert!(!debounce.try_acquire(FixTime::from_millis(60_999)));
        assert!(debounce.try_acquire(FixTime::from_millis(61_000)));
    }

    #[test]
    fn test_rejected_attempt_does_not_extend_window() {
        let debounce = PromptDebounce::new(Duration::from_secs(60));

        assert!(debounce.try_acquire(FixTime::from_millis(0)));
        assert!(!debounce.try_acquire(FixTime::from_millis(30_000)));
        assert_eq!(debounce.last_prompt(), Some(FixTime::from_millis(0)));
    }

    #[test]
    fn test_global_debounce_is_shared() {
        assert!(Arc::ptr_eq(&PromptDebounce::global(), &PromptDebounce::global()));
    }

    #[test]
    fn test_shared_debounce_uses_global_record_with_own_window() {
        let short = PromptDebounce::shared(Duration::from_secs(30));
        let long = PromptDebounce::shared(Duration::from_secs(90));

        assert_eq!(short.window(), Duration::from_secs(30));
        assert_eq!(long.window(), Duration::from_secs(90));
        assert!(short.shares_state_with(&long));
        assert!(short.shares_state_with(&PromptDebounce::global()));
        assert!(!short.shares_state_with(&PromptDebounce::new(Duration::from_secs(30))));
    }

    #[test]
    fn test_no_required_source_opens_settings() {
        let verdict = availability(sources(false, false, true))
            .evaluate(FixTime::from_millis(0))
            .unwrap();

        assert_eq!(verdict, ProviderVerdict::OpenSettings);
    }

    #[test]
    fn test_precise_only_prompts_once_per_window() {
        let availability = availability(sources(true, false, false));

        let first = availability.evaluate(FixTime::from_millis(0)).unwrap();
        let second = availability.evaluate(FixTime::from_millis(10_000)).unwrap();

        assert!(matches!(first, ProviderVerdict::PromptHighAccuracy(_)));
        assert!(matches!(second, ProviderVerdict::Usable(_)));
    }

    #[test]
    fn test_network_enabled_is_usable() {
        let enabled = sources(false, true, false);
        let verdict = availability(enabled)
            .evaluate(FixTime::from_millis(0))
            .unwrap();

        assert_eq!(verdict, ProviderVerdict::Usable(enabled));
    }

    #[test]
    fn test_platform_failure_propagates() {
        let availability = ProviderAvailability::new(
            Arc::new(FixedSources(Err(HostError::ServiceUnavailable("boom".into())))),
            Arc::new(PromptDebounce::default()),
        );

        assert!(availability.evaluate(FixTime::from_millis(0)).is_err());
    }
}
