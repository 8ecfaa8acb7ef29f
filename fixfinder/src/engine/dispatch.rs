//! Single dispatch queue for fixes and deadlines.
//!
//! Every live fix (from any source, on any thread) and every deadline expiry
//! is sent as an [`EngineEvent`] into one unbounded channel. A single
//! dispatcher task drains it in batches:
//!
//! ```text
//! recv() ──► batch = [event, try_recv()...] ──► EngineInner::process_batch
//! ```
//!
//! Fixes that arrive together are all ranked by the comparator before the
//! request is finalized once. Whichever of {fix, deadline} is processed first
//! ends the request; the loser finds no matching request and is dropped.

use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::machine::EngineInner;
use crate::fix::{Fix, FixSource};
use crate::platform::RequestId;

/// Event funnelled through the dispatch queue.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A live fix delivered by a platform subscription.
    Fix {
        request: RequestId,
        source: FixSource,
        fix: Fix,
    },
    /// The request's deadline elapsed.
    Deadline { request: RequestId },
}

impl EngineEvent {
    /// Request the event is addressed to.
    pub fn request_id(&self) -> RequestId {
        match self {
            EngineEvent::Fix { request, .. } | EngineEvent::Deadline { request } => *request,
        }
    }
}

/// Drain the dispatch queue until shutdown or until the engine is dropped.
pub(crate) async fn run_dispatcher(
    inner: Weak<EngineInner>,
    mut rx: mpsc::UnboundedReceiver<EngineEvent>,
    shutdown: CancellationToken,
) {
    debug!("Dispatcher started");

    loop {
        let first = tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,

            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let mut batch = vec![first];
        while let Ok(event) = rx.try_recv() {
            batch.push(event);
        }

        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.process_batch(batch);
    }

    debug!("Dispatcher stopped");
}

/// Arm a deadline timer for `request`.
///
/// The returned token disarms it; a timer that fires after its request ended
/// produces a stale event.
pub(crate) fn arm_deadline(
    runtime: &Handle,
    tx: mpsc::UnboundedSender<EngineEvent>,
    request: RequestId,
    deadline: Duration,
) -> CancellationToken {
    let token = CancellationToken::new();
    let disarmed = token.clone();

    runtime.spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(deadline) => {
                debug!(request_id = %request, deadline_ms = deadline.as_millis() as u64, "Deadline elapsed");
                let _ = tx.send(EngineEvent::Deadline { request });
            }
            _ = disarmed.cancelled() => {}
        }
    });

    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = RequestId::from_u64(11);

        let _token = arm_deadline(&Handle::current(), tx, id, Duration::from_millis(10));

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, EngineEvent::Deadline { request } if request == id));
    }

    #[tokio::test]
    async fn test_disarmed_deadline_is_silent() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let token = arm_deadline(
            &Handle::current(),
            tx,
            RequestId::from_u64(12),
            Duration::from_millis(20),
        );
        token.cancel();

        // The timer task drops its sender once disarmed.
        let next = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert!(next.is_none());
    }
}
