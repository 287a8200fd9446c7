//! Session connection configuration.

use std::time::Duration;

use secrecy::SecretString;

use super::TransportKind;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default)]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys. Connection fails if the host
    /// is not already in known_hosts.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    /// This is the default and matches common SSH client behavior.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For lab fleets only.
    Disabled,
}

/// Connection configuration for one device session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// Port (22 for SSH, 23 for Telnet by default).
    pub port: u16,

    /// Transport primitive to use.
    pub transport: TransportKind,

    /// Username for authentication.
    pub username: String,

    /// Password for authentication. For Telnet the dialect driver sends it
    /// explicitly; for SSH it is consumed by the handshake.
    pub password: SecretString,

    /// Privilege elevation secret. When present, the SSH transport performs
    /// the elevation step as part of `open`.
    pub enable_secret: Option<SecretString>,

    /// Connection establishment timeout.
    pub connect_timeout: Duration,

    /// Per-read marker timeout.
    pub read_timeout: Duration,

    /// Terminal width for the PTY request.
    pub terminal_width: u32,

    /// Terminal height for the PTY request.
    pub terminal_height: u32,

    /// Host key verification mode (SSH only).
    pub host_key_verification: HostKeyVerification,
}

impl SessionConfig {
    /// Build a config for `host` with transport defaults.
    pub fn new(
        host: impl Into<String>,
        transport: TransportKind,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            host: host.into(),
            port: transport.default_port(),
            transport,
            username: username.into(),
            password,
            enable_secret: None,
            connect_timeout: Duration::from_secs(20),
            read_timeout: Duration::from_secs(30),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
        }
    }

    /// Set the elevation secret.
    pub fn with_enable_secret(mut self, secret: Option<SecretString>) -> Self {
        self.enable_secret = secret;
        self
    }

    /// Set connect and read timeouts.
    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }
}
