//! Vendor dialect drivers.
//!
//! One fixed, hand-written session script per vendor CLI dialect. Every
//! driver implements the same capability — open a session, run the
//! dialect's login/query sequence, and return the configuration text plus
//! the device hostname — and a new vendor is supported by adding a new
//! variant, never by branching inside a shared function.
//!
//! Marker byte sequences and extraction patterns are named constants on
//! each driver module; several dialects require literal matches including
//! trailing punctuation.

mod arista;
mod cisco;
mod mypower;
mod oring;
mod registry;
mod rubytech;
mod zyxel;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use regex::Regex;

pub use registry::DialectRegistry;

use crate::channel::Marker;
use crate::error::Result;
use crate::inventory::DeviceRecord;
use crate::transport::{Session, SessionConfig, SessionFactory, TransportKind};

/// The vendor dialects this fleet contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectId {
    Cisco,
    Zyxel,
    MyPower,
    Oring,
    Rubytech,
    Arista,
}

impl DialectId {
    /// Map an inventory `dialect_id` string to a dialect.
    ///
    /// Matching is by prefix, case-insensitive, so legacy inventory values
    /// like `cisco_ios_telnet`, `zte_zxros_telnet`, or `Oring_os` resolve
    /// to the right driver.
    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("cisco") {
            Some(DialectId::Cisco)
        } else if lower.starts_with("zyxel") {
            Some(DialectId::Zyxel)
        } else if lower.starts_with("mypower") || lower.starts_with("zte") {
            Some(DialectId::MyPower)
        } else if lower.starts_with("oring") {
            Some(DialectId::Oring)
        } else if lower.starts_with("ruby") {
            Some(DialectId::Rubytech)
        } else if lower.starts_with("arista") {
            Some(DialectId::Arista)
        } else {
            None
        }
    }

    /// Canonical name of the dialect.
    pub fn as_str(self) -> &'static str {
        match self {
            DialectId::Cisco => "cisco",
            DialectId::Zyxel => "zyxel",
            DialectId::MyPower => "mypower",
            DialectId::Oring => "oring",
            DialectId::Rubytech => "rubytech",
            DialectId::Arista => "arista",
        }
    }
}

impl fmt::Display for DialectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful capture: the configuration text and the identity extracted
/// from it.
#[derive(Debug, Clone)]
pub struct Capture {
    /// Cleaned configuration text.
    pub text: String,

    /// Hostname extracted from the captured output.
    pub hostname: String,

    /// The inventory host the capture came from.
    pub host: String,
}

/// Tunables every driver receives from the run configuration.
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// Connection establishment timeout.
    pub connect_timeout: Duration,

    /// Per-read marker timeout.
    pub read_timeout: Duration,

    /// Maximum number of blank continuation probes sent to exhaust a
    /// pagination prompt before the output is accepted as complete.
    pub probe_budget: usize,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(20),
            read_timeout: Duration::from_secs(30),
            probe_budget: 50,
        }
    }
}

/// Capability every dialect driver implements.
#[async_trait]
pub trait DialectDriver: Send + Sync {
    /// Which dialect this driver speaks.
    fn id(&self) -> DialectId;

    /// Which transport primitive the dialect uses.
    fn transport(&self) -> TransportKind;

    /// Run the full capture: open a session, drive the dialect's login and
    /// query sequence, extract the hostname, and clean the text.
    ///
    /// The session is closed on every exit path. Any failure aborts only
    /// this device.
    async fn capture(
        &self,
        device: &DeviceRecord,
        factory: &dyn SessionFactory,
        settings: &CaptureSettings,
    ) -> Result<Capture>;
}

/// Build the session config a driver hands to the factory.
///
/// `elevate` controls whether the SSH transport runs the elevation step
/// during open (only meaningful when the descriptor carries a secret).
pub(crate) fn session_config(
    device: &DeviceRecord,
    settings: &CaptureSettings,
    transport: TransportKind,
    elevate: bool,
) -> SessionConfig {
    let secret = if elevate { device.secret.clone() } else { None };
    SessionConfig::new(
        device.host.clone(),
        transport,
        device.username.clone(),
        device.password.clone(),
    )
    .with_enable_secret(secret)
    .with_timeouts(settings.connect_timeout, settings.read_timeout)
}

/// Strip the echoed command from the start and the trailing prompt line
/// from the end of a raw query response.
pub(crate) fn strip_echo_and_prompt(raw: &str, command: &str) -> String {
    let mut text = raw;

    if let Some(idx) = text.find('\n') {
        if text[..idx].contains(command) {
            text = &text[idx + 1..];
        }
    }

    match text.rfind('\n') {
        Some(idx) if is_prompt_line(&text[idx + 1..]) => text[..idx + 1].to_string(),
        _ => text.to_string(),
    }
}

fn is_prompt_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && (trimmed.ends_with('#') || trimmed.ends_with('>'))
}

/// First capture group of `pattern` in `text`, trimmed of `\r` and spaces.
pub(crate) fn first_capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_matches(['\r', ' ', '\t']).to_string())
}

/// Read paged output: keep reading until the terminal marker arrives,
/// answering each continuation marker with `probe`, up to `budget` probes.
///
/// Absence of further continuation markers after the budget is treated as
/// end-of-output, not as an error — the accumulated text is returned with
/// `complete = false`.
pub(crate) async fn read_paged(
    session: &mut dyn Session,
    done: &Marker,
    more: &[u8],
    probe: &[u8],
    budget: usize,
    timeout: Duration,
) -> Result<(Vec<u8>, bool)> {
    let gate = Marker::any(vec![done.clone(), Marker::literal(more)]);
    let mut out = Vec::new();
    let mut probes = 0;

    loop {
        let chunk = session.read_until(&gate, timeout).await?;
        let paused = chunk.ends_with(more);
        out.extend_from_slice(&chunk);

        if !paused {
            return Ok((out, true));
        }
        if probes >= budget {
            debug!("pagination probe budget ({budget}) exhausted; accepting output");
            return Ok((out, false));
        }
        probes += 1;
        session.send_raw(probe).await?;
    }
}

/// Close a session, logging rather than propagating teardown failures so
/// the capture result (or its error) is what the caller sees.
pub(crate) async fn close_quietly(session: &mut dyn Session, host: &str) {
    if let Err(e) = session.close().await {
        debug!("session close failed for {host}: {e}");
    }
}
