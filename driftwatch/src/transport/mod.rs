//! Transport layer: interactive request/response byte channels.
//!
//! Two implementations share the [`Session`] contract: a negotiated SSH
//! channel ([`SshSession`]) that performs authentication — and privilege
//! elevation when a secret is configured — as part of `open`, and a raw
//! Telnet socket ([`TelnetSession`]) where the dialect driver drives the
//! full login dialogue explicitly.
//!
//! Sessions never retry; retry policy belongs to the caller. Every read is
//! bounded by an explicit timeout.

pub mod config;
mod ssh;
mod telnet;

use std::time::Duration;

use async_trait::async_trait;

pub use config::{HostKeyVerification, SessionConfig};
pub use ssh::SshSession;
pub use telnet::TelnetSession;

use crate::channel::Marker;
use crate::error::Result;

/// Which transport primitive a dialect speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Negotiated SSH channel (authentication handled in `open`).
    Ssh,
    /// Raw Telnet byte stream (caller drives the login dialogue).
    Telnet,
}

impl TransportKind {
    /// Default port for this transport.
    pub fn default_port(self) -> u16 {
        match self {
            TransportKind::Ssh => 22,
            TransportKind::Telnet => 23,
        }
    }
}

/// One live interactive connection to a device.
///
/// A session is owned exclusively by the dialect driver that opened it and
/// must be closed on every exit path before the driver returns.
#[async_trait]
pub trait Session: Send {
    /// Send a line of text followed by the transport's line terminator.
    async fn send_line(&mut self, line: &str) -> Result<()>;

    /// Send raw bytes without a terminator (pagination probes).
    async fn send_raw(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read until `marker` is observed, returning everything up to and
    /// including the marker. Fails with a timeout error if the marker does
    /// not arrive within `timeout`.
    async fn read_until(&mut self, marker: &Marker, timeout: Duration) -> Result<Vec<u8>>;

    /// Tear the connection down.
    async fn close(&mut self) -> Result<()>;
}

/// Opens sessions for dialect drivers.
///
/// The indirection exists so the run coordinator can hand drivers a real
/// network factory while tests hand them scripted sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Open a session according to `config`, including any negotiated
    /// authentication/elevation the transport performs itself.
    async fn open(&self, config: SessionConfig) -> Result<Box<dyn Session>>;
}

/// Factory producing real network sessions.
pub struct NetworkSessionFactory;

#[async_trait]
impl SessionFactory for NetworkSessionFactory {
    async fn open(&self, config: SessionConfig) -> Result<Box<dyn Session>> {
        match config.transport {
            TransportKind::Ssh => Ok(Box::new(SshSession::open(config).await?)),
            TransportKind::Telnet => Ok(Box::new(TelnetSession::open(config).await?)),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted sessions for driver and coordinator tests.

    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use super::*;
    use crate::error::{SessionError, TransportError};

    /// A session that replays canned read responses and records writes.
    pub(crate) struct ScriptedSession {
        reads: VecDeque<Vec<u8>>,
        /// Chunk replayed forever once `reads` is exhausted (pagination tests).
        repeat: Option<Vec<u8>>,
        pub(crate) sent: Vec<String>,
        pub(crate) closed: bool,
    }

    impl ScriptedSession {
        pub(crate) fn new(reads: Vec<&[u8]>) -> Self {
            Self {
                reads: reads.into_iter().map(|r| r.to_vec()).collect(),
                repeat: None,
                sent: Vec::new(),
                closed: false,
            }
        }

        pub(crate) fn with_repeat(mut self, chunk: &[u8]) -> Self {
            self.repeat = Some(chunk.to_vec());
            self
        }
    }

    #[async_trait]
    impl Session for ScriptedSession {
        async fn send_line(&mut self, line: &str) -> Result<()> {
            self.sent.push(line.to_string());
            Ok(())
        }

        async fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
            self.sent.push(String::from_utf8_lossy(bytes).into_owned());
            Ok(())
        }

        async fn read_until(&mut self, marker: &Marker, timeout: Duration) -> Result<Vec<u8>> {
            if let Some(chunk) = self.reads.pop_front() {
                return Ok(chunk);
            }
            if let Some(chunk) = &self.repeat {
                return Ok(chunk.clone());
            }
            Err(SessionError::MarkerTimeout {
                marker: marker.to_string(),
                timeout,
            }
            .into())
        }

        async fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    /// Per-host queue of scripted sessions (or open failures).
    pub(crate) struct ScriptedFactory {
        scripts: Mutex<HashMap<String, VecDeque<ScriptOutcome>>>,
    }

    pub(crate) enum ScriptOutcome {
        Session(ScriptedSession),
        ConnectTimeout,
    }

    impl ScriptedFactory {
        pub(crate) fn new() -> Self {
            Self {
                scripts: Mutex::new(HashMap::new()),
            }
        }

        pub(crate) fn push(&self, host: &str, outcome: ScriptOutcome) {
            self.scripts
                .lock()
                .unwrap()
                .entry(host.to_string())
                .or_default()
                .push_back(outcome);
        }
    }

    #[async_trait]
    impl SessionFactory for ScriptedFactory {
        async fn open(&self, config: SessionConfig) -> Result<Box<dyn Session>> {
            let outcome = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(&config.host)
                .and_then(|queue| queue.pop_front());
            match outcome {
                Some(ScriptOutcome::Session(session)) => Ok(Box::new(session)),
                Some(ScriptOutcome::ConnectTimeout) => {
                    Err(TransportError::Timeout(config.connect_timeout).into())
                }
                None => Err(TransportError::Disconnected.into()),
            }
        }
    }
}
