//! Live-update subscriptions.
//!
//! A [`SourceSubscription`] represents one active registration with the host
//! platform. It is owned by the engine's current request and cancelled
//! exactly once: when its source yields a fix, when another source wins the
//! race, or when the request ends for any reason. Cancellation is idempotent
//! and also happens on drop.
//!
//! Platforms deliver fixes through a [`FixSink`]. Every sink is tagged with
//! the request and source it was created for, so all three sources share a
//! single dispatch point in the engine.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::engine::EngineEvent;
use crate::error::HostError;
use crate::fix::{Fix, FixSource};
use crate::platform::{LocationPlatform, RequestId, SubscriptionHandle, SubscriptionParams};

// =============================================================================
// Fix Sink
// =============================================================================

/// Delivery endpoint handed to [`LocationPlatform::subscribe`].
///
/// Cheap to clone and safe to call from any thread. Deliveries after the
/// request has ended are discarded by the engine.
#[derive(Debug, Clone)]
pub struct FixSink {
    request: RequestId,
    source: FixSource,
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl FixSink {
    pub(crate) fn new(
        request: RequestId,
        source: FixSource,
        tx: mpsc::UnboundedSender<EngineEvent>,
    ) -> Self {
        Self {
            request,
            source,
            tx,
        }
    }

    /// Deliver a fix to the engine.
    ///
    /// Returns false if the engine has shut down.
    pub fn deliver(&self, fix: Fix) -> bool {
        self.tx
            .send(EngineEvent::Fix {
                request: self.request,
                source: self.source,
                fix,
            })
            .is_ok()
    }

    /// Request this sink belongs to.
    pub fn request_id(&self) -> RequestId {
        self.request
    }

    /// Source this sink was registered for.
    pub fn source(&self) -> FixSource {
        self.source
    }
}

// =============================================================================
// Source Subscription
// =============================================================================

/// One active live-update registration.
pub struct SourceSubscription {
    source: FixSource,
    handle: SubscriptionHandle,
    platform: Arc<dyn LocationPlatform>,
    active: bool,
}

impl SourceSubscription {
    /// Register with the platform.
    pub fn open(
        platform: Arc<dyn LocationPlatform>,
        source: FixSource,
        params: SubscriptionParams,
        sink: FixSink,
    ) -> Result<Self, HostError> {
        let handle = platform.subscribe(source, params, sink)?;
        tracing::debug!(%source, handle = handle.0, "Live updates requested");
        Ok(Self {
            source,
            handle,
            platform,
            active: true,
        })
    }

    /// Source of this registration.
    pub fn source(&self) -> FixSource {
        self.source
    }

    /// Platform handle.
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle
    }

    /// Whether the registration is still active.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Unregister. Returns true if this call performed the cancellation.
    pub fn cancel(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.platform.unsubscribe(self.handle);
        tracing::debug!(source = %self.source, handle = self.handle.0, "Live updates removed");
        true
    }
}

impl Drop for SourceSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for SourceSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSubscription")
            .field("source", &self.source)
            .field("handle", &self.handle)
            .field("active", &self.active)
            .finish()
    }
}

// =============================================================================
// Subscription Set
// =============================================================================

/// The (at most three) subscriptions of one request.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    subscriptions: Vec<SourceSubscription>,
}

impl SubscriptionSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a subscription for `source` unless one is already active.
    ///
    /// Returns true if a new registration was made.
    pub fn open(
        &mut self,
        platform: Arc<dyn LocationPlatform>,
        source: FixSource,
        params: SubscriptionParams,
        sink: FixSink,
    ) -> Result<bool, HostError> {
        if self.is_open(source) {
            return Ok(false);
        }
        let subscription = SourceSubscription::open(platform, source, params, sink)?;
        self.subscriptions.push(subscription);
        Ok(true)
    }

    /// Whether an active subscription exists for `source`.
    pub fn is_open(&self, source: FixSource) -> bool {
        self.subscriptions
            .iter()
            .any(|s| s.source() == source && s.is_active())
    }

    /// Sources with an active subscription.
    pub fn open_sources(&self) -> Vec<FixSource> {
        self.subscriptions
            .iter()
            .filter(|s| s.is_active())
            .map(|s| s.source())
            .collect()
    }

    /// Number of active subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.iter().filter(|s| s.is_active()).count()
    }

    /// True when no subscription is active.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancel the subscription for `source`, if active.
    pub fn cancel(&mut self, source: FixSource) -> bool {
        let mut cancelled = false;
        for subscription in self.subscriptions.iter_mut().filter(|s| s.source() == source) {
            cancelled |= subscription.cancel();
        }
        self.subscriptions.retain(|s| s.is_active());
        cancelled
    }

    /// Cancel everything. Returns the number of registrations removed.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self
            .subscriptions
            .iter_mut()
            .map(|s| s.cancel())
            .filter(|c| *c)
            .count();
        self.subscriptions.clear();
        cancelled
    }
}
