//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;
use std::time::Duration;

use fixfinder::config::ConfigFileError;
use fixfinder::{AcquisitionError, EngineError};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to read or write the configuration file
    ConfigFile(ConfigFileError),
    /// Invalid command-line argument
    InvalidArgument(String),
    /// Failed to start the async runtime
    Runtime(String),
    /// Failed to build the acquisition engine
    Engine(EngineError),
    /// The acquisition ended with an error
    Acquisition(AcquisitionError),
    /// The deadline expired before a fix was found
    TimedOut(Duration),
    /// Interrupted by the user
    Interrupted,
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::TimedOut(_) => 2,
            CliError::Interrupted => 130,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Acquisition(AcquisitionError::PermissionDenied) => {
                eprintln!();
                eprintln!("Location permission was denied permanently.");
                eprintln!("  Simulate a grant by omitting --deny-permission.");
            }
            CliError::Acquisition(AcquisitionError::NoProviderAvailable) => {
                eprintln!();
                eprintln!("Precise and network sources are both disabled.");
                eprintln!("  Re-enable one, or pass --enable-in-settings.");
            }
            CliError::TimedOut(_) => {
                eprintln!();
                eprintln!("No live fix arrived in time. Try a longer --deadline-ms");
                eprintln!("or a shorter --live-delay-ms.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Runtime(msg) => write!(f, "Failed to start runtime: {}", msg),
            CliError::Engine(e) => write!(f, "Failed to create acquisition engine: {}", e),
            CliError::Acquisition(e) => write!(f, "Location request failed: {}", e),
            CliError::TimedOut(deadline) => write!(
                f,
                "Location request timed out after {} ms",
                deadline.as_millis()
            ),
            CliError::Interrupted => write!(f, "Interrupted"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Engine(e) => Some(e),
            CliError::Acquisition(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        CliError::Engine(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::TimedOut(Duration::from_secs(1)).exit_code(), 2);
        assert_eq!(CliError::Interrupted.exit_code(), 130);
        assert_eq!(
            CliError::Acquisition(AcquisitionError::PermissionDenied).exit_code(),
            1
        );
    }

    #[test]
    fn test_timeout_message() {
        let msg = CliError::TimedOut(Duration::from_millis(250)).to_string();
        assert_eq!(msg, "Location request timed out after 250 ms");
    }
}
