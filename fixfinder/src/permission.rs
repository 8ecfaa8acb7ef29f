//! Permission gate.
//!
//! Wraps the host [`PermissionService`] with the acquisition policy:
//!
//! - Both fine and coarse scopes must be granted.
//! - A request is non-blocking; the engine suspends until the host reports a
//!   result.
//! - A denial that can still be asked again is re-requested immediately.
//! - A permanent denial escalates to the application settings screen and
//!   fails the request.
//!
//! The gate holds no grant state of its own. A "granted" result is never
//! trusted directly; the engine re-runs [`PermissionGate::is_granted`].

use std::sync::Arc;

use crate::error::HostError;
use crate::platform::{PermissionScope, PermissionService, PermissionStatus, RequestId};

/// What the engine should do after a permission result arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    /// Re-run the request from the permission check.
    Recheck,
    /// Issue the permission request again and keep waiting.
    AskAgain,
    /// Permanently denied: open app settings and fail.
    Denied,
}

/// Permission policy over a host permission service.
pub struct PermissionGate {
    service: Arc<dyn PermissionService>,
}

impl PermissionGate {
    /// Create a gate over the host permission service.
    pub fn new(service: Arc<dyn PermissionService>) -> Self {
        Self { service }
    }

    /// True when every required scope is currently granted.
    pub fn is_granted(&self) -> Result<bool, HostError> {
        for scope in PermissionScope::REQUIRED {
            if self.service.check(scope)? == PermissionStatus::Denied {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Show the permission dialog for the required scopes.
    pub fn request_grant(&self, correlation: RequestId) -> Result<(), HostError> {
        tracing::debug!(request_id = %correlation, "Requesting location permission");
        self.service.request(&PermissionScope::REQUIRED, correlation)
    }

    /// Interpret a host permission result.
    pub fn decide(granted: bool, can_ask_again: bool) -> PermissionDecision {
        if granted {
            PermissionDecision::Recheck
        } else if can_ask_again {
            PermissionDecision::AskAgain
        } else {
            PermissionDecision::Denied
        }
    }
}

impl std::fmt::Debug for PermissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGate").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct ScopedPermissions {
        fine: PermissionStatus,
        coarse: PermissionStatus,
        requests: Mutex<Vec<RequestId>>,
    }

    impl PermissionService for ScopedPermissions {
        fn check(&self, scope: PermissionScope) -> Result<PermissionStatus, HostError> {
            Ok(match scope {
                PermissionScope::Fine => self.fine,
                PermissionScope::Coarse => self.coarse,
            })
        }

        fn request(
            &self,
            scopes: &[PermissionScope],
            correlation: RequestId,
        ) -> Result<(), HostError> {
            assert_eq!(scopes, &PermissionScope::REQUIRED);
            self.requests.lock().push(correlation);
            Ok(())
        }
    }

    fn gate(fine: PermissionStatus, coarse: PermissionStatus) -> (PermissionGate, Arc<ScopedPermissions>) {
        let service = Arc::new(ScopedPermissions {
            fine,
            coarse,
            requests: Mutex::new(Vec::new()),
        });
        (PermissionGate::new(service.clone()), service)
    }

    #[test]
    fn test_both_scopes_required() {
        use PermissionStatus::*;

        assert!(gate(Granted, Granted).0.is_granted().unwrap());
        assert!(!gate(Granted, Denied).0.is_granted().unwrap());
        assert!(!gate(Denied, Granted).0.is_granted().unwrap());
        assert!(!gate(Denied, Denied).0.is_granted().unwrap());
    }

    #[test]
    fn test_request_forwards_correlation() {
        let (gate, service) = gate(PermissionStatus::Denied, PermissionStatus::Denied);
        let id = RequestId::from_u64(42);

        gate.request_grant(id).unwrap();

        assert_eq!(*service.requests.lock(), vec![id]);
    }

    #[test]
    fn test_decision_policy() {
        assert_eq!(PermissionGate::decide(true, false), PermissionDecision::Recheck);
        assert_eq!(PermissionGate::decide(true, true), PermissionDecision::Recheck);
        assert_eq!(PermissionGate::decide(false, true), PermissionDecision::AskAgain);
        assert_eq!(PermissionGate::decide(false, false), PermissionDecision::Denied);
    }
}
