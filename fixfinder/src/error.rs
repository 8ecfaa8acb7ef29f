//! Error types for location acquisition.

use thiserror::Error;

/// Terminal failure reasons reported through `on_error`.
///
/// A deadline expiring is not an error; it is reported through `on_timeout`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    /// The user declined the location permission and cannot be asked again.
    ///
    /// Recoverable only through the application settings screen.
    #[error("Location permission denied")]
    PermissionDenied,

    /// Neither the precise nor the network source is enabled.
    #[error("No location provider available (precise and network sources disabled)")]
    NoProviderAvailable,

    /// The host has no UI context to show a permission or settings screen.
    #[error("Host UI context unavailable")]
    ContextUnavailable,

    /// The positioning service is absent or failed while being queried.
    #[error("Positioning service unavailable: {0}")]
    PlatformServiceUnavailable(String),
}

impl AcquisitionError {
    /// Short machine-friendly identifier for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AcquisitionError::PermissionDenied => "permission_denied",
            AcquisitionError::NoProviderAvailable => "no_provider_available",
            AcquisitionError::ContextUnavailable => "context_unavailable",
            AcquisitionError::PlatformServiceUnavailable(_) => "platform_service_unavailable",
        }
    }
}

/// Failures raised by host collaborators (platform, permission service, UI).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// No activity/window is available to anchor a dialog or settings screen.
    #[error("No UI context available")]
    ContextUnavailable,

    /// The underlying service is missing or threw while being queried.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<HostError> for AcquisitionError {
    fn from(e: HostError) -> Self {
        match e {
            HostError::ContextUnavailable => AcquisitionError::ContextUnavailable,
            HostError::ServiceUnavailable(reason) => {
                AcquisitionError::PlatformServiceUnavailable(reason)
            }
        }
    }
}

/// Errors constructing an acquisition engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine needs a Tokio runtime for its dispatcher and deadline timers.
    #[error("No Tokio runtime available: {0}")]
    NoRuntime(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_error_translation() {
        let err: AcquisitionError = HostError::ContextUnavailable.into();
        assert_eq!(err, AcquisitionError::ContextUnavailable);

        let err: AcquisitionError = HostError::ServiceUnavailable("gps daemon gone".into()).into();
        assert_eq!(
            err,
            AcquisitionError::PlatformServiceUnavailable("gps daemon gone".to_string())
        );
    }

    #[test]
    fn test_display_includes_reason() {
        let err = AcquisitionError::PlatformServiceUnavailable("status read threw".into());
        assert!(err.to_string().contains("status read threw"));
        assert_eq!(err.kind(), "platform_service_unavailable");
    }
}
