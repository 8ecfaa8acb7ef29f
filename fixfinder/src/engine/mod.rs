//! Best-effort current-location acquisition.
//!
//! [`AcquisitionEngine`] drives one request at a time through permission,
//! provider, cache and live-update stages and reports exactly one outcome
//! through an [`AcquisitionListener`].
//!
//! # Design
//!
//! - Host collaborators are trait objects ([`LocationPlatform`],
//!   [`PermissionService`], [`HostUi`]) so the engine can be driven by a real
//!   platform, the simulator in [`crate::sim`] or test fakes.
//! - Asynchronous host workflows report back through the `handle_*` methods,
//!   correlated by [`RequestId`]. Results for superseded requests are ignored.
//! - Live fixes and deadlines share one dispatch queue drained by a single
//!   Tokio task, so the first of them to be processed decides the outcome.
//!
//! # Usage
//!
//! ```ignore
//! use fixfinder::engine::AcquisitionEngine;
//! use fixfinder::listener::ChannelListener;
//!
//! let (listener, mut events) = ChannelListener::new();
//! let engine = AcquisitionEngine::builder(platform, permissions, ui)
//!     .listener(Arc::new(listener))
//!     .build()?;
//!
//! engine.start(Some(Duration::from_secs(15)));
//! ```

mod config;
mod dispatch;
mod machine;
mod state;

pub use config::{CacheMode, EngineConfig, DEFAULT_FRESHNESS_WINDOW};
pub use dispatch::EngineEvent;
pub use state::{Phase, RequestInfo, StartOutcome, Suspension, TaskKind};

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::availability::{PromptDebounce, ProviderAvailability, DEFAULT_PROMPT_DEBOUNCE_WINDOW};
use crate::clock::{Clock, SystemClock};
use crate::error::EngineError;
use crate::fix::{Fix, FixSource};
use crate::listener::{AcquisitionListener, NoopListener};
use crate::permission::PermissionGate;
use crate::platform::{HostUi, LocationPlatform, PermissionService, PromptResponse, RequestId};

use machine::EngineInner;
use state::EngineState;

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`AcquisitionEngine`].
pub struct EngineBuilder {
    platform: Arc<dyn LocationPlatform>,
    permissions: Arc<dyn PermissionService>,
    ui: Arc<dyn HostUi>,
    listener: Option<Arc<dyn AcquisitionListener>>,
    clock: Option<Arc<dyn Clock>>,
    debounce: Option<Arc<PromptDebounce>>,
    config: EngineConfig,
    runtime: Option<Handle>,
}

impl EngineBuilder {
    /// Receiver of outcomes. Defaults to a listener that ignores them.
    pub fn listener(mut self, listener: Arc<dyn AcquisitionListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Time source. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Prompt debounce.
    ///
    /// Defaults to the process-wide record ([`PromptDebounce::shared`]) with
    /// the configured window.
    pub fn debounce(mut self, debounce: Arc<PromptDebounce>) -> Self {
        self.debounce = Some(debounce);
        self
    }

    /// Engine configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Runtime for the dispatcher and deadline timers.
    ///
    /// Defaults to the runtime of the calling context.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Build the engine and spawn its dispatcher.
    pub fn build(self) -> Result<AcquisitionEngine, EngineError> {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| EngineError::NoRuntime(e.to_string()))?,
        };

        let debounce = match self.debounce {
            Some(debounce) => debounce,
            None if self.config.prompt_debounce_window == DEFAULT_PROMPT_DEBOUNCE_WINDOW => {
                PromptDebounce::global()
            }
            None => PromptDebounce::shared(self.config.prompt_debounce_window),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(EngineInner {
            gate: PermissionGate::new(self.permissions),
            availability: ProviderAvailability::new(Arc::clone(&self.platform), debounce),
            platform: self.platform,
            ui: self.ui,
            listener: self.listener.unwrap_or_else(|| Arc::new(NoopListener)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            config: self.config,
            runtime: runtime.clone(),
            events: tx,
            state: Mutex::new(EngineState::default()),
        });

        let shutdown = CancellationToken::new();
        runtime.spawn(dispatch::run_dispatcher(
            Arc::downgrade(&inner),
            rx,
            shutdown.clone(),
        ));

        tracing::debug!(cache_mode = %inner.config.cache_mode, "Acquisition engine built");
        Ok(AcquisitionEngine { inner, shutdown })
    }
}

impl std::fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Best-effort location acquisition engine.
///
/// At most one request is in flight. Dropping the engine cancels it silently
/// and stops the dispatcher.
pub struct AcquisitionEngine {
    inner: Arc<EngineInner>,
    shutdown: CancellationToken,
}

impl AcquisitionEngine {
    /// Start building an engine over the given host collaborators.
    pub fn builder(
        platform: Arc<dyn LocationPlatform>,
        permissions: Arc<dyn PermissionService>,
        ui: Arc<dyn HostUi>,
    ) -> EngineBuilder {
        EngineBuilder {
            platform,
            permissions,
            ui,
            listener: None,
            clock: None,
            debounce: None,
            config: EngineConfig::default(),
            runtime: None,
        }
    }

    /// Begin acquiring a location.
    ///
    /// `deadline` bounds the whole request, including time spent waiting for
    /// the user. Calling `start` while a request is suspended re-checks it
    /// from the permission step; calling it while the request is running
    /// changes nothing.
    pub fn start(&self, deadline: Option<Duration>) -> StartOutcome {
        self.inner.start(deadline)
    }

    /// Report the outcome of a permission request.
    ///
    /// Returns false if `request` is not waiting for a permission result.
    pub fn handle_permission_result(
        &self,
        request: RequestId,
        granted: bool,
        can_ask_again: bool,
    ) -> bool {
        self.inner
            .handle_permission_result(request, granted, can_ask_again)
    }

    /// Report that the user came back from the location settings screen.
    ///
    /// Returns false if no request is waiting for it.
    pub fn handle_settings_return(&self) -> bool {
        self.inner.handle_settings_return()
    }

    /// Report the user's answer to the high-accuracy prompt.
    ///
    /// Returns false if `request` is not waiting for a prompt response.
    pub fn handle_prompt_response(&self, request: RequestId, response: PromptResponse) -> bool {
        self.inner.handle_prompt_response(request, response)
    }

    /// Abandon the in-flight request without any terminal callback.
    ///
    /// Returns false if nothing was in flight.
    pub fn cancel(&self) -> bool {
        self.inner.cancel()
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.inner.phase()
    }

    /// The in-flight request, if any.
    pub fn current_request(&self) -> Option<RequestInfo> {
        self.inner.current_request()
    }

    /// Sources with an open live-update subscription.
    pub fn open_subscriptions(&self) -> Vec<FixSource> {
        self.inner.open_subscriptions()
    }

    /// The fix delivered by the most recent successful request.
    pub fn last_result(&self) -> Option<Fix> {
        self.inner.last_result()
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// A weak handle for hosts that report outcomes asynchronously.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl Drop for AcquisitionEngine {
    fn drop(&mut self) {
        self.inner.cancel();
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for AcquisitionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionEngine")
            .field("phase", &self.phase())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Weak reference to an engine.
///
/// Hosts that answer permission dialogs, prompts or settings screens from
/// another task keep one of these instead of the engine itself. Every method
/// returns false once the engine has been dropped.
#[derive(Clone, Default)]
pub struct EngineHandle {
    inner: Weak<EngineInner>,
}

impl EngineHandle {
    /// See [`AcquisitionEngine::handle_permission_result`].
    pub fn handle_permission_result(
        &self,
        request: RequestId,
        granted: bool,
        can_ask_again: bool,
    ) -> bool {
        self.inner
            .upgrade()
            .map(|inner| inner.handle_permission_result(request, granted, can_ask_again))
            .unwrap_or(false)
    }

    /// See [`AcquisitionEngine::handle_settings_return`].
    pub fn handle_settings_return(&self) -> bool {
        self.inner
            .upgrade()
            .map(|inner| inner.handle_settings_return())
            .unwrap_or(false)
    }

    /// See [`AcquisitionEngine::handle_prompt_response`].
    pub fn handle_prompt_response(&self, request: RequestId, response: PromptResponse) -> bool {
        self.inner
            .upgrade()
            .map(|inner| inner.handle_prompt_response(request, response))
            .unwrap_or(false)
    }

    /// Whether the engine is still alive.
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}
