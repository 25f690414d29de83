//! Error types for netxact.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::command::CommandKind;
use crate::init::InitState;

/// Main error type for netxact operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel framing errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Command execution errors
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    /// Session initialization errors
    #[error("Initialization error: {0}")]
    Init(#[from] InitError),

    /// Device profile errors
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Device facade errors
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Host not present in known_hosts while verification is strict
    #[error("Unknown host key for {host}:{port} (strict verification)")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts file could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection attempt timed out
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (prompt framing, byte stream operations).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// No prompt match within the deadline. Partial output stays buffered
    /// and is attributed to the next read.
    #[error("No prompt match within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// I/O error on the channel
    #[error("Channel I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid regex pattern
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Errors from the error-classifying executor.
#[derive(Error, Debug)]
pub enum ExecError {
    /// No prompt within the deadline. The caller decides whether to retry;
    /// only safe for Show commands.
    #[error("No prompt within {timeout:?} after '{command}'")]
    Timeout { command: String, timeout: Duration },

    /// The response matched a configured failure pattern.
    #[error("Device rejected '{command}' (pattern: {pattern})")]
    DeviceRejected {
        command: String,
        pattern: String,
        output: String,
    },

    /// Execution was cancelled. The session has been closed; a partially
    /// consumed byte stream cannot be resynchronized.
    #[error("'{command}' cancelled before completion")]
    Cancelled { command: String },

    /// Underlying channel failure
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl ExecError {
    /// Whether re-issuing the command is safe after this error.
    ///
    /// Only a timeout is retryable, and only for idempotent Show commands.
    /// A timed-out Write's effect on the device is unknown, so retrying
    /// risks double-application.
    pub fn is_retryable_for(&self, kind: CommandKind) -> bool {
        matches!(self, ExecError::Timeout { .. }) && kind == CommandKind::Show
    }
}

/// Session initialization errors. All are terminal for the connection
/// attempt; the session is closed and must be reopened from scratch.
#[derive(Error, Debug)]
pub enum InitError {
    /// Expected prompt never arrived
    #[error("Timed out in {state:?} waiting for '{expected}'")]
    Timeout { state: InitState, expected: String },

    /// Device refused the supplied credentials or enable secret
    #[error("Credentials rejected in {state:?}")]
    CredentialsRejected { state: InitState, output: String },

    /// Escalation step defined but no enable secret supplied
    #[error("Privilege escalation requires an enable secret")]
    MissingEnableSecret,

    /// A terminal-setup command was rejected or timed out
    #[error("Setup command failed in {state:?}: {source}")]
    Setup {
        state: InitState,
        #[source]
        source: ExecError,
    },

    /// Channel failure during initialization
    #[error("Channel failed in {state:?}: {source}")]
    Channel {
        state: InitState,
        #[source]
        source: ChannelError,
    },
}

/// Device profile definition errors.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// A pattern in the profile does not compile
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A prompt mode name is referenced but not defined
    #[error("Unknown prompt mode '{name}'")]
    UnknownMode { name: String },

    /// Profile fields are inconsistent
    #[error("Invalid profile: {message}")]
    InvalidDefinition { message: String },
}

/// Device facade errors.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Device not connected
    #[error("Device not connected - call open() first")]
    NotConnected,

    /// Device already connected
    #[error("Device already connected")]
    AlreadyConnected,

    /// Invalid configuration in the device builder
    #[error("Invalid device configuration: {message}")]
    InvalidConfig { message: String },
}

/// Result type alias using netxact's Error.
pub type Result<T> = std::result::Result<T, Error>;
