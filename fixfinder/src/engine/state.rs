//! Request state and phases.

use std::fmt;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::AcquisitionError;
use crate::fix::{Fix, FixTime};
use crate::platform::RequestId;
use crate::subscription::SubscriptionSet;

/// Why a request is parked waiting for the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suspension {
    /// Waiting for `handle_permission_result`.
    AwaitingPermission,
    /// Waiting for `handle_settings_return`.
    AwaitingSettings,
    /// Waiting for `handle_prompt_response`.
    AwaitingPrompt,
}

/// Engine phase.
///
/// `Finalizing`, `TimedOut` and `Failed` are transient: they are entered and
/// left within one transition, so observers only ever see them in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    CheckingPermission,
    CheckingProviders,
    InspectingCache,
    AwaitingLiveFix,
    Suspended(Suspension),
    Finalizing,
    TimedOut,
    Failed,
}

impl Phase {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::CheckingPermission => "checking_permission",
            Phase::CheckingProviders => "checking_providers",
            Phase::InspectingCache => "inspecting_cache",
            Phase::AwaitingLiveFix => "awaiting_live_fix",
            Phase::Suspended(Suspension::AwaitingPermission) => "awaiting_permission",
            Phase::Suspended(Suspension::AwaitingSettings) => "awaiting_settings",
            Phase::Suspended(Suspension::AwaitingPrompt) => "awaiting_prompt",
            Phase::Finalizing => "finalizing",
            Phase::TimedOut => "timed_out",
            Phase::Failed => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Task tag of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// No deadline.
    Simple,
    /// Bounded by a deadline.
    WithDeadline,
}

/// Result of [`AcquisitionEngine::start`](super::AcquisitionEngine::start).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A fresh request was created.
    Started(RequestId),
    /// A suspended request was re-checked from the permission step.
    Resumed(RequestId),
    /// A request is already running; nothing changed.
    InFlight(RequestId),
}

impl StartOutcome {
    /// The request this call refers to.
    pub fn request_id(&self) -> RequestId {
        match self {
            StartOutcome::Started(id) | StartOutcome::Resumed(id) | StartOutcome::InFlight(id) => {
                *id
            }
        }
    }
}

/// Public view of the in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestInfo {
    pub id: RequestId,
    pub task: TaskKind,
    pub deadline: Option<Duration>,
    pub begin: FixTime,
}

// =============================================================================
// Internal State
// =============================================================================

/// One logical acquisition.
#[derive(Debug)]
pub(crate) struct AcquisitionRequest {
    pub id: RequestId,
    pub task: TaskKind,
    pub deadline: Option<Duration>,
    pub begin: FixTime,
    pub best: Option<Fix>,
    pub settings_visited: bool,
    pub finalize_pending: bool,
    pub subscriptions: SubscriptionSet,
    pub timer: Option<CancellationToken>,
}

impl AcquisitionRequest {
    pub fn new(
        id: RequestId,
        deadline: Option<Duration>,
        begin: FixTime,
        timer: Option<CancellationToken>,
    ) -> Self {
        Self {
            id,
            task: if deadline.is_some() {
                TaskKind::WithDeadline
            } else {
                TaskKind::Simple
            },
            deadline,
            begin,
            best: None,
            settings_visited: false,
            finalize_pending: false,
            subscriptions: SubscriptionSet::new(),
            timer,
        }
    }

    pub fn info(&self) -> RequestInfo {
        RequestInfo {
            id: self.id,
            task: self.task,
            deadline: self.deadline,
            begin: self.begin,
        }
    }

    /// Remove every subscription and disarm the deadline.
    pub fn teardown(&mut self) {
        let removed = self.subscriptions.cancel_all();
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        tracing::debug!(request_id = %self.id, subscriptions = removed, "Request torn down");
    }
}

/// Everything behind the engine lock.
#[derive(Debug, Default)]
pub(crate) struct EngineState {
    pub phase: Phase,
    pub request: Option<AcquisitionRequest>,
    pub last_result: Option<Fix>,
}

impl EngineState {
    /// The active request if its id matches `id`.
    pub fn request_for(&mut self, id: RequestId) -> Option<&mut AcquisitionRequest> {
        self.request.as_mut().filter(|r| r.id == id)
    }

    pub fn active_id(&self) -> Option<RequestId> {
        self.request.as_ref().map(|r| r.id)
    }
}

/// How a request ends.
#[derive(Debug)]
pub(crate) enum Terminal {
    Success(Fix),
    Failed(AcquisitionError),
    TimedOut,
}

/// Host-facing side effect, executed after the state lock is released.
#[derive(Debug)]
pub(crate) enum Effect {
    Started(RequestId),
    RequestPermission(RequestId),
    PromptHighAccuracy(RequestId),
    OpenLocationSettings(RequestId),
    OpenAppSettings,
    Success(RequestId, Fix),
    Failure(RequestId, AcquisitionError),
    Timeout(RequestId),
}
