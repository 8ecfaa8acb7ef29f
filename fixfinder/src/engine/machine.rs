//! Acquisition state machine.
//!
//! # State Machine
//!
//! ```text
//! Idle --start--> CheckingPermission --granted--> CheckingProviders
//!   CheckingPermission --denied--> Suspended(AwaitingPermission)
//!   CheckingProviders --none--> Suspended(AwaitingSettings)
//!   CheckingProviders --precise only, debounce open--> Suspended(AwaitingPrompt)
//!   CheckingProviders --usable--> InspectingCache
//! InspectingCache --accepted--> Finalizing --> Idle
//! InspectingCache --stale/missing--> AwaitingLiveFix
//! AwaitingLiveFix --fix--> Finalizing --> Idle
//! any active phase --deadline--> TimedOut --> Idle
//! any active phase --error--> Failed --> Idle
//! ```
//!
//! Every resumption re-enters at `CheckingPermission`; each step is an
//! idempotent check against fresh host state.
//!
//! # Locking
//!
//! Transitions run under one `parking_lot::Mutex`. Platform queries and
//! subscription changes happen under the lock; everything that can call back
//! into the engine (permission dialogs, UI, listener) is collected as an
//! [`Effect`] and executed after the lock is released.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::config::{CacheMode, EngineConfig};
use super::dispatch::{arm_deadline, EngineEvent};
use super::state::{
    AcquisitionRequest, Effect, EngineState, Phase, RequestInfo, StartOutcome, Suspension,
    Terminal,
};
use crate::availability::{ProviderAvailability, ProviderVerdict};
use crate::clock::Clock;
use crate::comparator;
use crate::error::{AcquisitionError, HostError};
use crate::fix::{Fix, FixSource, FixTime};
use crate::listener::AcquisitionListener;
use crate::permission::{PermissionDecision, PermissionGate};
use crate::platform::{HostUi, LocationPlatform, PromptResponse, RequestId};
use crate::subscription::FixSink;

/// Shared engine internals.
pub(crate) struct EngineInner {
    pub(crate) platform: Arc<dyn LocationPlatform>,
    pub(crate) gate: PermissionGate,
    pub(crate) availability: ProviderAvailability,
    pub(crate) ui: Arc<dyn HostUi>,
    pub(crate) listener: Arc<dyn AcquisitionListener>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: EngineConfig,
    pub(crate) runtime: Handle,
    pub(crate) events: mpsc::UnboundedSender<EngineEvent>,
    pub(crate) state: Mutex<EngineState>,
}

/// Where a drive from `CheckingPermission` stopped.
enum Drive {
    /// Parked; waiting for the host.
    Suspended,
    /// Subscriptions open; waiting for the dispatcher.
    Live,
    /// The request ended.
    Done(Terminal),
}

impl EngineInner {
    // =========================================================================
    // Entry Points
    // =========================================================================

    pub(crate) fn start(&self, deadline: Option<Duration>) -> StartOutcome {
        let mut effects = Vec::new();

        let outcome = {
            let mut state = self.state.lock();
            match (state.active_id(), state.phase) {
                (Some(id), Phase::Suspended(suspension)) => {
                    debug!(request_id = %id, ?suspension, "Resuming suspended request");
                    self.drive(&mut state, &mut effects);
                    StartOutcome::Resumed(id)
                }
                (Some(id), phase) => {
                    debug!(request_id = %id, %phase, "Request already in flight");
                    StartOutcome::InFlight(id)
                }
                (None, _) => {
                    let id = RequestId::next();
                    let begin = self.clock.now();
                    let timer = deadline
                        .map(|d| arm_deadline(&self.runtime, self.events.clone(), id, d));
                    state.request = Some(AcquisitionRequest::new(id, deadline, begin, timer));

                    info!(
                        request_id = %id,
                        deadline_ms = deadline.map(|d| d.as_millis() as u64),
                        "Location request started"
                    );
                    effects.push(Effect::Started(id));
                    self.drive(&mut state, &mut effects);
                    StartOutcome::Started(id)
                }
            }
        };

        self.execute(effects);
        outcome
    }

    pub(crate) fn handle_permission_result(
        &self,
        id: RequestId,
        granted: bool,
        can_ask_again: bool,
    ) -> bool {
        let mut effects = Vec::new();

        {
            let mut state = self.state.lock();
            if !self.is_suspended(&mut state, id, Suspension::AwaitingPermission) {
                debug!(request_id = %id, granted, "Ignoring stale permission result");
                return false;
            }

            match PermissionGate::decide(granted, can_ask_again) {
                PermissionDecision::Recheck => {
                    debug!(request_id = %id, "Permission result received, re-checking");
                    self.drive(&mut state, &mut effects);
                }
                PermissionDecision::AskAgain => {
                    debug!(request_id = %id, "Permission denied, asking again");
                    effects.push(Effect::RequestPermission(id));
                }
                PermissionDecision::Denied => {
                    info!(request_id = %id, "Permission permanently denied");
                    effects.push(Effect::OpenAppSettings);
                    self.terminate(
                        &mut state,
                        Terminal::Failed(AcquisitionError::PermissionDenied),
                        &mut effects,
                    );
                }
            }
        }

        self.execute(effects);
        true
    }

    pub(crate) fn handle_settings_return(&self) -> bool {
        let mut effects = Vec::new();

        {
            let mut state = self.state.lock();
            if state.phase != Phase::Suspended(Suspension::AwaitingSettings) {
                debug!(phase = %state.phase, "Ignoring settings return");
                return false;
            }
            let Some(request) = state.request.as_mut() else {
                return false;
            };
            request.settings_visited = true;
            debug!(request_id = %request.id, "Returned from location settings");
            self.drive(&mut state, &mut effects);
        }

        self.execute(effects);
        true
    }

    pub(crate) fn handle_prompt_response(&self, id: RequestId, response: PromptResponse) -> bool {
        let mut effects = Vec::new();

        {
            let mut state = self.state.lock();
            if !self.is_suspended(&mut state, id, Suspension::AwaitingPrompt) {
                debug!(request_id = %id, ?response, "Ignoring stale prompt response");
                return false;
            }

            match response {
                PromptResponse::Accepted => {
                    debug!(request_id = %id, "High-accuracy prompt accepted");
                    self.set_phase(&mut state, Phase::Suspended(Suspension::AwaitingSettings));
                    effects.push(Effect::OpenLocationSettings(id));
                }
                PromptResponse::Declined => {
                    debug!(request_id = %id, "High-accuracy prompt declined");
                    self.drive(&mut state, &mut effects);
                }
            }
        }

        self.execute(effects);
        true
    }

    pub(crate) fn cancel(&self) -> bool {
        let mut state = self.state.lock();
        let Some(mut request) = state.request.take() else {
            return false;
        };
        request.teardown();
        self.set_phase(&mut state, Phase::Idle);
        info!(request_id = %request.id, "Location request cancelled");
        true
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub(crate) fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    pub(crate) fn current_request(&self) -> Option<RequestInfo> {
        self.state.lock().request.as_ref().map(|r| r.info())
    }

    pub(crate) fn open_subscriptions(&self) -> Vec<FixSource> {
        self.state
            .lock()
            .request
            .as_ref()
            .map(|r| r.subscriptions.open_sources())
            .unwrap_or_default()
    }

    pub(crate) fn last_result(&self) -> Option<Fix> {
        self.state.lock().last_result.clone()
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Apply a batch of dispatch-queue events.
    pub(crate) fn process_batch(&self, batch: Vec<EngineEvent>) {
        let mut effects = Vec::new();

        {
            let mut state = self.state.lock();
            for event in batch {
                match event {
                    EngineEvent::Fix {
                        request,
                        source,
                        fix,
                    } => self.accept_fix(&mut state, request, source, fix),
                    EngineEvent::Deadline { request } => {
                        // A fix queued ahead of the deadline wins.
                        self.flush_pending(&mut state, &mut effects);
                        if state.request_for(request).is_some() {
                            info!(request_id = %request, "Location request timed out");
                            self.terminate(&mut state, Terminal::TimedOut, &mut effects);
                        } else {
                            debug!(request_id = %request, "Ignoring stale deadline");
                        }
                    }
                }
            }
            self.flush_pending(&mut state, &mut effects);
        }

        self.execute(effects);
    }

    fn accept_fix(&self, state: &mut EngineState, id: RequestId, source: FixSource, fix: Fix) {
        if state.phase != Phase::AwaitingLiveFix {
            debug!(request_id = %id, %source, phase = %state.phase, "Ignoring fix outside live phase");
            return;
        }
        let Some(request) = state.request_for(id) else {
            debug!(request_id = %id, %source, "Ignoring stale fix");
            return;
        };

        if comparator::is_better(&fix, request.best.as_ref()) {
            debug!(
                request_id = %id,
                %source,
                accuracy_m = fix.accuracy(),
                "Live fix accepted as best"
            );
            request.best = Some(fix);
        } else {
            debug!(
                request_id = %id,
                %source,
                accuracy_m = fix.accuracy(),
                "Live fix ranked worse than held best"
            );
        }

        request.subscriptions.cancel(source);
        request.finalize_pending = true;
    }

    fn flush_pending(&self, state: &mut EngineState, effects: &mut Vec<Effect>) {
        let best = match state.request.as_mut() {
            Some(request) if request.finalize_pending => request.best.take(),
            _ => return,
        };
        match best {
            Some(fix) => self.terminate(state, Terminal::Success(fix), effects),
            None => {
                if let Some(request) = state.request.as_mut() {
                    request.finalize_pending = false;
                }
            }
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    fn is_suspended(&self, state: &mut EngineState, id: RequestId, on: Suspension) -> bool {
        state.phase == Phase::Suspended(on) && state.request_for(id).is_some()
    }

    fn set_phase(&self, state: &mut EngineState, phase: Phase) {
        if state.phase != phase {
            debug!(from = %state.phase, to = %phase, "Phase transition");
            state.phase = phase;
        }
    }

    /// Run the request from `CheckingPermission` as far as it goes.
    fn drive(&self, state: &mut EngineState, effects: &mut Vec<Effect>) {
        match self.evaluate(state, effects) {
            Drive::Suspended | Drive::Live => {}
            Drive::Done(terminal) => self.terminate(state, terminal, effects),
        }
    }

    fn evaluate(&self, state: &mut EngineState, effects: &mut Vec<Effect>) -> Drive {
        let Some(id) = state.active_id() else {
            return Drive::Suspended;
        };

        // Permission
        self.set_phase(state, Phase::CheckingPermission);
        match self.gate.is_granted() {
            Ok(true) => {}
            Ok(false) => {
                self.set_phase(state, Phase::Suspended(Suspension::AwaitingPermission));
                effects.push(Effect::RequestPermission(id));
                return Drive::Suspended;
            }
            Err(e) => return Drive::Done(Terminal::Failed(e.into())),
        }

        // Providers
        self.set_phase(state, Phase::CheckingProviders);
        let now = self.clock.now();
        match self.availability.evaluate(now) {
            Ok(ProviderVerdict::Usable(_)) => {}
            Ok(ProviderVerdict::PromptHighAccuracy(_)) => {
                self.set_phase(state, Phase::Suspended(Suspension::AwaitingPrompt));
                effects.push(Effect::PromptHighAccuracy(id));
                return Drive::Suspended;
            }
            Ok(ProviderVerdict::OpenSettings) => {
                let visited = state
                    .request
                    .as_ref()
                    .map(|r| r.settings_visited)
                    .unwrap_or(false);
                if visited {
                    return Drive::Done(Terminal::Failed(AcquisitionError::NoProviderAvailable));
                }
                self.set_phase(state, Phase::Suspended(Suspension::AwaitingSettings));
                effects.push(Effect::OpenLocationSettings(id));
                return Drive::Suspended;
            }
            Err(e) => return Drive::Done(Terminal::Failed(e.into())),
        }

        // Cache
        self.set_phase(state, Phase::InspectingCache);
        match self.inspect_cache(now) {
            Ok(Some(fix)) => return Drive::Done(Terminal::Success(fix)),
            Ok(None) => {}
            Err(e) => return Drive::Done(Terminal::Failed(e.into())),
        }

        // Live
        match self.go_live(state, id) {
            Ok(()) => Drive::Live,
            Err(err) => Drive::Done(Terminal::Failed(err)),
        }
    }

    fn inspect_cache(&self, now: FixTime) -> Result<Option<Fix>, HostError> {
        if self.config.cache_mode == CacheMode::LiveOnly {
            debug!("Cache bypassed");
            return Ok(None);
        }

        let precise = self.platform.last_known_fix(FixSource::Precise)?;
        let network = self.platform.last_known_fix(FixSource::Network)?;

        let newest = match (precise, network) {
            // Precise only when strictly newer; a tie goes to network.
            (Some(p), Some(n)) => Some(if p.timestamp() > n.timestamp() { p } else { n }),
            (p, n) => p.or(n),
        };
        let Some(fix) = newest else {
            debug!("No cached fix");
            return Ok(None);
        };

        let age = fix.age(now);
        let accepted = match self.config.cache_mode {
            CacheMode::AcceptAny => true,
            _ => age < self.config.freshness_window,
        };
        debug!(
            source = %fix.source(),
            age_ms = age.as_millis() as u64,
            accepted,
            "Cached fix inspected"
        );
        Ok(accepted.then_some(fix))
    }

    fn go_live(&self, state: &mut EngineState, id: RequestId) -> Result<(), AcquisitionError> {
        let enabled = self.platform.enabled_sources()?;
        let sources = enabled.live_sources();
        if sources.is_empty() {
            return Err(AcquisitionError::NoProviderAvailable);
        }

        self.set_phase(state, Phase::AwaitingLiveFix);
        let Some(request) = state.request_for(id) else {
            return Ok(());
        };
        for source in sources {
            let sink = FixSink::new(id, source, self.events.clone());
            if let Err(e) = request.subscriptions.open(
                Arc::clone(&self.platform),
                source,
                self.config.subscription,
                sink,
            ) {
                warn!(request_id = %id, %source, error = %e, "Subscription failed");
                request.subscriptions.cancel_all();
                return Err(e.into());
            }
        }

        info!(
            request_id = %id,
            sources = ?request.subscriptions.open_sources(),
            "Waiting for live fix"
        );
        Ok(())
    }

    /// End the active request with `terminal`.
    fn terminate(&self, state: &mut EngineState, terminal: Terminal, effects: &mut Vec<Effect>) {
        let Some(mut request) = state.request.take() else {
            return;
        };
        request.teardown();
        let id = request.id;

        match terminal {
            Terminal::Success(fix) => {
                self.set_phase(state, Phase::Finalizing);
                let elapsed = self.clock.now().since(request.begin);
                let fix = fix.with_request_duration(elapsed);
                info!(
                    request_id = %id,
                    source = %fix.source(),
                    accuracy_m = fix.accuracy(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Location found"
                );
                state.last_result = Some(fix.clone());
                effects.push(Effect::Success(id, fix));
            }
            Terminal::Failed(error) => {
                self.set_phase(state, Phase::Failed);
                info!(request_id = %id, error = %error, kind = error.kind(), "Location request failed");
                effects.push(Effect::Failure(id, error));
            }
            Terminal::TimedOut => {
                self.set_phase(state, Phase::TimedOut);
                effects.push(Effect::Timeout(id));
            }
        }

        self.set_phase(state, Phase::Idle);
    }

    /// Fail `id` if it is still the active request.
    fn abort(&self, id: RequestId, error: AcquisitionError) {
        let mut effects = Vec::new();
        {
            let mut state = self.state.lock();
            if state.request_for(id).is_none() {
                return;
            }
            self.terminate(&mut state, Terminal::Failed(error), &mut effects);
        }
        self.execute(effects);
    }

    // =========================================================================
    // Effects
    // =========================================================================

    fn execute(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Started(id) => self.listener.on_request_start(id),
                Effect::RequestPermission(id) => {
                    if let Err(e) = self.gate.request_grant(id) {
                        warn!(request_id = %id, error = %e, "Permission request failed");
                        self.abort(id, e.into());
                    }
                }
                Effect::PromptHighAccuracy(id) => {
                    if let Err(e) = self.ui.prompt_enable_high_accuracy(id) {
                        warn!(request_id = %id, error = %e, "High-accuracy prompt could not be shown");
                        self.handle_prompt_response(id, PromptResponse::Declined);
                    }
                }
                Effect::OpenLocationSettings(id) => {
                    if let Err(e) = self.ui.open_location_settings(id) {
                        warn!(request_id = %id, error = %e, "Location settings could not be opened");
                        self.abort(id, e.into());
                    }
                }
                Effect::OpenAppSettings => {
                    if let Err(e) = self.ui.open_app_settings() {
                        warn!(error = %e, "Application settings could not be opened");
                    }
                }
                Effect::Success(id, fix) => self.listener.on_success(id, &fix),
                Effect::Failure(id, error) => self.listener.on_error(id, &error),
                Effect::Timeout(id) => self.listener.on_timeout(id),
            }
        }
    }
}
