//! Error types for privsh.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for privsh operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Privilege navigation errors
    #[error("Privilege error: {0}")]
    Privilege(#[from] PrivilegeError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Platform/vendor errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl Error {
    /// True if a read on the session channel hit its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Channel(ChannelError::Timeout(_)))
    }

    /// True if the transport went away underneath the session.
    pub fn is_channel_closed(&self) -> bool {
        matches!(self, Error::Channel(ChannelError::Closed))
    }

    /// Whether this error leaves the session at an indeterminate privilege
    /// level.
    ///
    /// Configuration errors (unknown level, bad pattern) and prompt
    /// discovery failures leave the session usable; anything that happened
    /// after a command reached the device does not.
    pub fn poisons_session(&self) -> bool {
        match self {
            Error::Channel(ChannelError::InvalidPattern(_)) => false,
            Error::Channel(_) => true,
            Error::Privilege(PrivilegeError::AuthFailure { .. })
            | Error::Privilege(PrivilegeError::FailedCommand { .. }) => true,
            _ => false,
        }
    }
}

/// Channel layer errors (reading, writing, pattern compilation).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// No candidate matched before the read deadline
    #[error("Pattern not found within {0:?}")]
    Timeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// I/O error from the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Privilege navigation errors.
#[derive(Error, Debug)]
pub enum PrivilegeError {
    /// A level name that is not part of the configured graph
    #[error("Unknown privilege level '{name}'")]
    UnknownLevel { name: String },

    /// No configured prompt matched while discovering the current level
    #[error("Could not determine privilege level from prompt: '{prompt}'")]
    UnresolvablePrompt { prompt: String },

    /// More than one configured prompt matched the same output
    #[error("Prompt '{prompt}' matches multiple privilege levels: {levels:?}")]
    AmbiguousPrompt { prompt: String, levels: Vec<String> },

    /// Escalation authentication was not accepted
    #[error("Authentication failed escalating to '{level}': {reason}")]
    AuthFailure { level: String, reason: String },

    /// A failure trigger showed up in the device output
    #[error("Command '{command}' failed: output contains '{trigger}'")]
    FailedCommand {
        command: String,
        trigger: String,
        output: String,
    },
}

/// Driver layer errors (lifecycle and command execution).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Driver not opened
    #[error("Driver not connected - call open() first")]
    NotConnected,

    /// Driver already opened
    #[error("Driver already connected")]
    AlreadyConnected,

    /// A previous navigation failure left the session unusable
    #[error("Session failed and must be closed")]
    SessionFailed,

    /// Invalid configuration in the driver builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Platform/vendor definition errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Invalid platform definition
    #[error("Invalid platform definition: {message}")]
    InvalidDefinition { message: String },

    /// Unknown platform name
    #[error("Unknown platform: {name}")]
    UnknownPlatform { name: String },

    /// Platform already registered
    #[error("Platform already registered: {name}")]
    AlreadyRegistered { name: String },
}

/// Result type alias using privsh's Error.
pub type Result<T> = std::result::Result<T, Error>;
