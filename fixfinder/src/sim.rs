//! Scripted host for demos and tests.
//!
//! [`SimulatedPlatform`] implements [`LocationPlatform`], [`PermissionService`]
//! and [`HostUi`] from a [`Scenario`]. Host-side answers (permission dialog
//! results, prompt answers, returns from settings) are delivered from spawned
//! tasks through an [`EngineHandle`], the way a real UI would report them.
//!
//! # Usage
//!
//! ```ignore
//! let sim = SimulatedPlatform::new(scenario, clock.clone(), Handle::current());
//! let engine = AcquisitionEngine::builder(sim.clone(), sim.clone(), sim.clone())
//!     .clock(clock)
//!     .build()?;
//! sim.attach(engine.handle());
//! engine.start(Some(Duration::from_secs(5)));
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::engine::EngineHandle;
use crate::error::HostError;
use crate::fix::{Fix, FixSource};
use crate::platform::{
    EnabledSources, HostUi, LocationPlatform, PermissionScope, PermissionService,
    PermissionStatus, PromptResponse, RequestId, SubscriptionHandle, SubscriptionParams,
};
use crate::subscription::FixSink;

// =============================================================================
// Scenario
// =============================================================================

/// How the simulated user answers permission dialogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionScript {
    /// Permission is already granted.
    #[default]
    Granted,
    /// Not granted yet; the first dialog grants it.
    GrantOnRequest,
    /// The first dialog is denied (can ask again); the second grants.
    DenyOnce,
    /// Every dialog is denied permanently.
    DenyForever,
}

/// A cached fix of a given age.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedFix {
    pub source: FixSource,
    pub age: Duration,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
}

/// A live fix produced `delay` after subscribing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveFix {
    pub source: FixSource,
    pub delay: Duration,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
}

/// Script for a [`SimulatedPlatform`].
#[derive(Debug, Clone)]
pub struct Scenario {
    pub permission: PermissionScript,
    pub enabled: EnabledSources,
    /// Sources enabled once the user visits the location settings screen.
    pub enabled_after_settings: Option<EnabledSources>,
    pub prompt: PromptResponse,
    pub cached: Vec<CachedFix>,
    pub live: Vec<LiveFix>,
    /// Delay before any host-side answer is reported.
    pub response_delay: Duration,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            permission: PermissionScript::default(),
            enabled: EnabledSources::ALL,
            enabled_after_settings: None,
            prompt: PromptResponse::Declined,
            cached: Vec::new(),
            live: Vec::new(),
            response_delay: Duration::ZERO,
        }
    }
}

impl Scenario {
    pub fn with_permission(mut self, permission: PermissionScript) -> Self {
        self.permission = permission;
        self
    }

    pub fn with_enabled(mut self, enabled: EnabledSources) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_enabled_after_settings(mut self, enabled: EnabledSources) -> Self {
        self.enabled_after_settings = Some(enabled);
        self
    }

    pub fn with_prompt(mut self, prompt: PromptResponse) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_cached(mut self, cached: CachedFix) -> Self {
        self.cached.push(cached);
        self
    }

    pub fn with_live(mut self, live: LiveFix) -> Self {
        self.live.push(live);
        self
    }

    pub fn with_response_delay(mut self, delay: Duration) -> Self {
        self.response_delay = delay;
        self
    }
}

// =============================================================================
// Simulated Platform
// =============================================================================

/// Counters of host-facing calls, for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    pub permission_requests: usize,
    pub prompts: usize,
    pub settings_opened: usize,
    pub app_settings_opened: usize,
    pub subscriptions: usize,
    pub unsubscriptions: usize,
}

/// Scripted implementation of every host collaborator.
pub struct SimulatedPlatform {
    scenario: Scenario,
    clock: Arc<dyn Clock>,
    runtime: Handle,
    engine: Mutex<EngineHandle>,
    enabled: Mutex<EnabledSources>,
    granted: Mutex<bool>,
    live: Mutex<HashMap<u64, CancellationToken>>,
    next_handle: AtomicU64,
    permission_requests: AtomicUsize,
    prompts: AtomicUsize,
    settings_opened: AtomicUsize,
    app_settings_opened: AtomicUsize,
    subscriptions: AtomicUsize,
    unsubscriptions: AtomicUsize,
}

impl SimulatedPlatform {
    /// Create a simulator. Spawned answers and live fixes run on `runtime`.
    pub fn new(scenario: Scenario, clock: Arc<dyn Clock>, runtime: Handle) -> Arc<Self> {
        Arc::new(Self {
            enabled: Mutex::new(scenario.enabled),
            granted: Mutex::new(scenario.permission == PermissionScript::Granted),
            scenario,
            clock,
            runtime,
            engine: Mutex::new(EngineHandle::default()),
            live: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
            permission_requests: AtomicUsize::new(0),
            prompts: AtomicUsize::new(0),
            settings_opened: AtomicUsize::new(0),
            app_settings_opened: AtomicUsize::new(0),
            subscriptions: AtomicUsize::new(0),
            unsubscriptions: AtomicUsize::new(0),
        })
    }

    /// Route host-side answers to `engine`. Must be called before `start`.
    pub fn attach(&self, engine: EngineHandle) {
        *self.engine.lock() = engine;
    }

    /// Call counters so far.
    pub fn stats(&self) -> SimStats {
        SimStats {
            permission_requests: self.permission_requests.load(Ordering::Relaxed),
            prompts: self.prompts.load(Ordering::Relaxed),
            settings_opened: self.settings_opened.load(Ordering::Relaxed),
            app_settings_opened: self.app_settings_opened.load(Ordering::Relaxed),
            subscriptions: self.subscriptions.load(Ordering::Relaxed),
            unsubscriptions: self.unsubscriptions.load(Ordering::Relaxed),
        }
    }

    /// Number of live registrations still active.
    pub fn active_subscriptions(&self) -> usize {
        self.live.lock().len()
    }

    /// Report an answer to the engine after the scenario's response delay.
    fn respond<F>(&self, answer: F)
    where
        F: FnOnce(&EngineHandle) -> bool + Send + 'static,
    {
        let engine = self.engine.lock().clone();
        let delay = self.scenario.response_delay;
        self.runtime.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if !answer(&engine) {
                tracing::debug!("Simulated answer ignored by engine");
            }
        });
    }
}

impl LocationPlatform for SimulatedPlatform {
    fn enabled_sources(&self) -> Result<EnabledSources, HostError> {
        Ok(*self.enabled.lock())
    }

    fn last_known_fix(&self, source: FixSource) -> Result<Option<Fix>, HostError> {
        let now = self.clock.now();
        Ok(self
            .scenario
            .cached
            .iter()
            .find(|c| c.source == source)
            .map(|c| Fix::new(c.latitude, c.longitude, c.accuracy, source, now.minus(c.age))))
    }

    fn subscribe(
        &self,
        source: FixSource,
        params: SubscriptionParams,
        sink: FixSink,
    ) -> Result<SubscriptionHandle, HostError> {
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let token = CancellationToken::new();
        self.live.lock().insert(handle.0, token.clone());
        self.subscriptions.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            %source,
            handle = handle.0,
            min_interval_ms = params.min_interval.as_millis() as u64,
            min_distance_m = params.min_distance_meters,
            "Simulated subscription opened"
        );

        for plan in self.scenario.live.iter().filter(|l| l.source == source).copied() {
            let sink = sink.clone();
            let clock = Arc::clone(&self.clock);
            let token = token.clone();
            self.runtime.spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(plan.delay) => {
                        let fix = Fix::new(plan.latitude, plan.longitude, plan.accuracy, source, clock.now());
                        sink.deliver(fix);
                    }
                    _ = token.cancelled() => {}
                }
            });
        }

        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        if let Some(token) = self.live.lock().remove(&handle.0) {
            token.cancel();
            self.unsubscriptions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl PermissionService for SimulatedPlatform {
    fn check(&self, _scope: PermissionScope) -> Result<PermissionStatus, HostError> {
        Ok(if *self.granted.lock() {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        })
    }

    fn request(&self, _scopes: &[PermissionScope], correlation: RequestId) -> Result<(), HostError> {
        let attempt = self.permission_requests.fetch_add(1, Ordering::Relaxed) + 1;

        let (granted, can_ask_again) = match self.scenario.permission {
            PermissionScript::Granted | PermissionScript::GrantOnRequest => (true, true),
            PermissionScript::DenyOnce if attempt > 1 => (true, true),
            PermissionScript::DenyOnce => (false, true),
            PermissionScript::DenyForever => (false, false),
        };
        if granted {
            *self.granted.lock() = true;
        }

        tracing::debug!(request_id = %correlation, attempt, granted, "Simulated permission dialog");
        self.respond(move |engine| {
            engine.handle_permission_result(correlation, granted, can_ask_again)
        });
        Ok(())
    }
}

impl HostUi for SimulatedPlatform {
    fn prompt_enable_high_accuracy(&self, correlation: RequestId) -> Result<(), HostError> {
        self.prompts.fetch_add(1, Ordering::Relaxed);
        let response = self.scenario.prompt;
        self.respond(move |engine| engine.handle_prompt_response(correlation, response));
        Ok(())
    }

    fn open_location_settings(&self, _correlation: RequestId) -> Result<(), HostError> {
        self.settings_opened.fetch_add(1, Ordering::Relaxed);
        if let Some(after) = self.scenario.enabled_after_settings {
            *self.enabled.lock() = after;
        }
        self.respond(|engine| engine.handle_settings_return());
        Ok(())
    }

    fn open_app_settings(&self) -> Result<(), HostError> {
        self.app_settings_opened.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl std::fmt::Debug for SimulatedPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedPlatform")
            .field("scenario", &self.scenario)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
