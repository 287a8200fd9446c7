//! Error types for driftwatch.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for driftwatch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level errors (connection, authentication)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Interactive session errors (marker matching, protocol state)
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Dialect driver errors
    #[error("Dialect error: {0}")]
    Dialect(#[from] DialectError),

    /// Snapshot store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Diff engine errors
    #[error("Diff error: {0}")]
    Diff(#[from] DiffError),

    /// Report artifact errors
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Notification errors
    #[error("Notify error: {0}")]
    Notify(#[from] NotifyError),

    /// Inventory loading errors
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Transport layer errors (TCP/SSH connection, authentication).
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

    /// Host key not present in known_hosts under strict verification
    #[error("Unknown host key for {host}:{port}")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts lookup failed or the recorded key changed
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Connection attempt timed out
    #[error("Connect timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Session layer errors (marker matching, prompt protocol).
#[derive(Error, Debug)]
pub enum SessionError {
    /// The expected marker did not arrive within the bound
    #[error("Marker {marker:?} not seen within {timeout:?}")]
    MarkerTimeout { marker: String, timeout: Duration },

    /// The device produced output that violates the dialect's assumptions
    #[error("Protocol mismatch: expected {expected:?}, got {got:?}")]
    ProtocolMismatch { expected: String, got: String },

    /// Session closed while output was still expected
    #[error("Session closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// Invalid marker pattern
    #[error("Invalid marker pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// I/O error on the byte stream
    #[error("Session I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Dialect driver errors.
#[derive(Error, Debug)]
pub enum DialectError {
    /// Inventory names a dialect no driver is registered for
    #[error("Unknown dialect '{id}'")]
    UnknownDialect { id: String },

    /// Hostname could not be located in the captured text
    #[error("Hostname not found in output from {host}")]
    HostnameNotFound { host: String },
}

/// Snapshot store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem error against a specific snapshot path
    #[error("Snapshot I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No previous snapshot and no baseline to diff against
    #[error("No prior snapshot for {host}")]
    NoPriorSnapshot { host: String },
}

/// Diff engine errors.
#[derive(Error, Debug)]
pub enum DiffError {
    /// A configured noise pattern failed to compile
    #[error("Invalid noise pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Report artifact errors.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Filesystem error against a report artifact
    #[error("Report I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Notification delivery errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// HTTP error talking to the webhook endpoint
    #[error("Webhook error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Inventory loading errors.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// Inventory file could not be read
    #[error("Inventory I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed inventory record
    #[error("Inventory parse error: {0}")]
    Csv(#[from] csv::Error),
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Config I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed TOML
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Result type alias using driftwatch's Error.
pub type Result<T> = std::result::Result<T, Error>;
