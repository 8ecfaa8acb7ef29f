//! Outcome callbacks.
//!
//! Every request started with [`AcquisitionEngine::start`](crate::engine::AcquisitionEngine::start)
//! produces one `on_request_start` and then exactly one terminal callback:
//! `on_success`, `on_error` or `on_timeout`. A cancelled request produces no
//! terminal callback.
//!
//! Callbacks run on whichever thread drove the transition (the caller of a
//! `handle_*` method or the engine's dispatcher task) and never while the
//! engine's state lock is held, so a listener may call back into the engine.

use tokio::sync::mpsc;

use crate::error::AcquisitionError;
use crate::fix::Fix;
use crate::platform::RequestId;

/// Receiver of acquisition outcomes.
pub trait AcquisitionListener: Send + Sync {
    /// A fresh request has begun.
    fn on_request_start(&self, _request: RequestId) {}

    /// The request finished with a fix.
    fn on_success(&self, request: RequestId, fix: &Fix);

    /// The request failed.
    fn on_error(&self, request: RequestId, error: &AcquisitionError);

    /// The deadline expired before a fix was found.
    fn on_timeout(&self, request: RequestId);
}

/// Listener that ignores every outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl AcquisitionListener for NoopListener {
    fn on_success(&self, _request: RequestId, _fix: &Fix) {}
    fn on_error(&self, _request: RequestId, _error: &AcquisitionError) {}
    fn on_timeout(&self, _request: RequestId) {}
}

// =============================================================================
// Channel Listener
// =============================================================================

/// Outcome forwarded by [`ChannelListener`].
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionEvent {
    Started(RequestId),
    Success(RequestId, Fix),
    Error(RequestId, AcquisitionError),
    Timeout(RequestId),
}

impl AcquisitionEvent {
    /// Request the event belongs to.
    pub fn request_id(&self) -> RequestId {
        match self {
            AcquisitionEvent::Started(id)
            | AcquisitionEvent::Success(id, _)
            | AcquisitionEvent::Error(id, _)
            | AcquisitionEvent::Timeout(id) => *id,
        }
    }

    /// True for success, error and timeout.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AcquisitionEvent::Started(_))
    }
}

/// Forwards outcomes over a Tokio channel so hosts can await them.
///
/// # Usage
///
/// ```ignore
/// let (listener, mut events) = ChannelListener::new();
/// let engine = AcquisitionEngine::builder(platform, permissions, ui)
///     .listener(Arc::new(listener))
///     .build()?;
///
/// engine.start(Some(Duration::from_secs(10)));
/// while let Some(event) = events.recv().await {
///     if event.is_terminal() {
///         break;
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<AcquisitionEvent>,
}

impl ChannelListener {
    /// Create a listener and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AcquisitionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: AcquisitionEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Acquisition event dropped, receiver closed");
        }
    }
}

impl AcquisitionListener for ChannelListener {
    fn on_request_start(&self, request: RequestId) {
        self.forward(AcquisitionEvent::Started(request));
    }

    fn on_success(&self, request: RequestId, fix: &Fix) {
        self.forward(AcquisitionEvent::Success(request, fix.clone()));
    }

    fn on_error(&self, request: RequestId, error: &AcquisitionError) {
        self.forward(AcquisitionEvent::Error(request, error.clone()));
    }

    fn on_timeout(&self, request: RequestId) {
        self.forward(AcquisitionEvent::Timeout(request));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fix::{FixSource, FixTime};

    #[test]
    fn test_channel_listener_forwards_in_order() {
        let (listener, mut rx) = ChannelListener::new();
        let id = RequestId::from_u64(3);
        let fix = Fix::new(48.1, 11.5, 12.0, FixSource::Network, FixTime::from_millis(5));

        listener.on_request_start(id);
        listener.on_success(id, &fix);

        assert_eq!(rx.try_recv().unwrap(), AcquisitionEvent::Started(id));
        let terminal = rx.try_recv().unwrap();
        assert!(terminal.is_terminal());
        assert_eq!(terminal, AcquisitionEvent::Success(id, fix));
    }

    #[test]
    fn test_closed_receiver_is_tolerated() {
        let (listener, rx) = ChannelListener::new();
        drop(rx);

        listener.on_timeout(RequestId::from_u64(1));
        listener.on_error(RequestId::from_u64(1), &AcquisitionError::PermissionDenied);
    }

    #[test]
    fn test_event_request_id() {
        let id = RequestId::from_u64(9);
        assert_eq!(AcquisitionEvent::Timeout(id).request_id(), id);
        assert!(!AcquisitionEvent::Started(id).is_terminal());
    }
}
