//! Rubytech dialect.
//!
//! Raw Telnet. The platform has no `show running-config`; the
//! configuration is assembled by walking its mode contexts and issuing
//! each one's show command(s). Each context is entered with its mode word
//! and left with `exit`, and the prompt reflects the context:
//!
//! ```text
//! Login: admin
//! Password: *****
//! RUBY-SW#ip
//! RUBY-SW(ip)#show
//! ...
//! RUBY-SW(ip)#exit
//! RUBY-SW#
//! ```
//!
//! The hostname is parsed from the first prompt after login and then used
//! to anchor every section's closing prompt, so a context that fails to
//! echo its prompt back is detected as a protocol mismatch.

use async_trait::async_trait;
use regex::Regex;

use super::{
    close_quietly, read_paged, session_config, Capture, CaptureSettings, DialectDriver,
    DialectId,
};
use crate::channel::Marker;
use crate::error::{Result, SessionError};
use crate::inventory::DeviceRecord;
use crate::transport::{Session, SessionFactory, TransportKind};
use secrecy::ExposeSecret;

/// Login cue. No space before the colon on this platform.
const LOGIN_MARKER: &[u8] = b"Login:";

/// Password cue.
const PASSWORD_MARKER: &[u8] = b"Password:";

/// Every prompt ends with this single byte; reads stop at the first one.
const PROMPT_MARKER: &[u8] = b"#";

/// Pagination line used by the longer tables.
const PAGE_MARKER: &[u8] = b"...(q to quit)";

/// A single space advances the pager.
const CONTINUATION_PROBE: &[u8] = b" ";

const EXIT_COMMAND: &str = "exit";

/// First prompt after login: the hostname on its own line before `#`.
const HOSTNAME_FROM_PROMPT: &str = r"(?m)^\s*([\w.\-]+)#";

/// One show command inside a mode context.
struct Query {
    command: &'static str,
    /// Whether this table is long enough to page.
    paged: bool,
}

/// A mode context walk: enter every mode in `path`, run the queries, then
/// exit back out. `label` is the context name echoed inside the prompt.
struct ModeQuery {
    path: &'static [&'static str],
    label: &'static str,
    queries: &'static [Query],
}

/// The full capture walk, in the order the fleet has always collected it:
/// ip, spanning-tree, trunk/LACP, VLAN, port, QoS, security, system, SNMP,
/// MAC table, management.
const MODE_QUERIES: &[ModeQuery] = &[
    ModeQuery {
        path: &["ip"],
        label: "ip",
        queries: &[Query { command: "show", paged: false }],
    },
    ModeQuery {
        path: &["stp"],
        label: "stp",
        queries: &[Query { command: "show config", paged: false }],
    },
    ModeQuery {
        path: &["trunk"],
        label: "trunk",
        queries: &[
            Query { command: "show aggtr-view", paged: true },
            Query { command: "show lacp-config", paged: false },
        ],
    },
    ModeQuery {
        path: &["vlan"],
        label: "vlan",
        queries: &[
            Query { command: "show conf", paged: false },
            Query { command: "show group", paged: false },
            Query { command: "show mgt-vlan", paged: false },
            Query { command: "show pvid", paged: false },
        ],
    },
    ModeQuery {
        path: &["port"],
        label: "port",
        queries: &[Query { command: "show conf", paged: false }],
    },
    ModeQuery {
        path: &["qos"],
        label: "qos",
        queries: &[Query { command: "show port", paged: false }],
    },
    ModeQuery {
        path: &["security", "isolated-group"],
        label: "security-isolated-group",
        queries: &[Query { command: "show", paged: false }],
    },
    ModeQuery {
        path: &["security", "mirror"],
        label: "security-mirror",
        queries: &[Query { command: "show", paged: false }],
    },
    ModeQuery {
        path: &["system"],
        label: "system",
        queries: &[Query { command: "show", paged: false }],
    },
    ModeQuery {
        path: &["snmp"],
        label: "snmp",
        queries: &[Query { command: "show", paged: false }],
    },
    ModeQuery {
        path: &["mac-table", "port-security"],
        label: "mac-table-port-security",
        queries: &[Query { command: "show", paged: true }],
    },
    ModeQuery {
        path: &["mac-table", "static-mac"],
        label: "mac-table-static-mac",
        queries: &[Query { command: "show", paged: false }],
    },
    ModeQuery {
        path: &["management"],
        label: "management",
        queries: &[Query { command: "show", paged: false }],
    },
];

pub(super) struct RubytechDriver;

#[async_trait]
impl DialectDriver for RubytechDriver {
    fn id(&self) -> DialectId {
        DialectId::Rubytech
    }

    fn transport(&self) -> TransportKind {
        TransportKind::Telnet
    }

    async fn capture(
        &self,
        device: &DeviceRecord,
        factory: &dyn SessionFactory,
        settings: &CaptureSettings,
    ) -> Result<Capture> {
        let config = session_config(device, settings, TransportKind::Telnet, false);
        let mut session = factory.open(config).await?;
        let outcome = script(session.as_mut(), device, settings).await;
        close_quietly(session.as_mut(), &device.host).await;
        let (text, hostname) = outcome?;
        Ok(Capture {
            text,
            hostname,
            host: device.host.clone(),
        })
    }
}

async fn script(
    session: &mut dyn Session,
    device: &DeviceRecord,
    settings: &CaptureSettings,
) -> Result<(String, String)> {
    let timeout = settings.read_timeout;
    let prompt = Marker::literal(PROMPT_MARKER);

    session
        .read_until(&Marker::literal(LOGIN_MARKER), timeout)
        .await?;
    session.send_line(&device.username).await?;
    session
        .read_until(&Marker::literal(PASSWORD_MARKER), timeout)
        .await?;
    session.send_line(device.password.expose_secret()).await?;

    let first = session.read_until(&prompt, timeout).await?;
    let first = String::from_utf8_lossy(&first);
    let hostname = extract_hostname(&first).ok_or_else(|| {
        crate::error::DialectError::HostnameNotFound {
            host: device.host.clone(),
        }
    })?;

    let mut config_text = String::new();
    for mode in MODE_QUERIES {
        for step in mode.path {
            enter_mode(session, step, &prompt, timeout).await?;
        }
        for query in mode.queries {
            session.send_line(query.command).await?;
            let raw = if query.paged {
                let (raw, _complete) = read_paged(
                    session,
                    &prompt,
                    PAGE_MARKER,
                    CONTINUATION_PROBE,
                    settings.probe_budget,
                    timeout,
                )
                .await?;
                raw
            } else {
                session.read_until(&prompt, timeout).await?
            };
            let raw = String::from_utf8_lossy(&raw);
            let section = extract_section(&raw, &hostname, mode.label)?;
            config_text.push_str(&section);
        }
        for _ in mode.path {
            exit_mode(session, &prompt, timeout).await?;
        }
    }

    Ok((config_text, hostname))
}

async fn enter_mode(
    session: &mut dyn Session,
    mode: &str,
    prompt: &Marker,
    timeout: std::time::Duration,
) -> Result<()> {
    session.send_line(mode).await?;
    session.read_until(prompt, timeout).await?;
    Ok(())
}

async fn exit_mode(
    session: &mut dyn Session,
    prompt: &Marker,
    timeout: std::time::Duration,
) -> Result<()> {
    session.send_line(EXIT_COMMAND).await?;
    session.read_until(prompt, timeout).await?;
    Ok(())
}

/// Hostname from the first prompt after login.
fn extract_hostname(first_prompt: &str) -> Option<String> {
    let pattern = Regex::new(HOSTNAME_FROM_PROMPT).unwrap();
    pattern
        .captures(first_prompt)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Body of one query response: everything between the echoed show command
/// and the context prompt `hostname(label)#`.
fn extract_section(raw: &str, hostname: &str, label: &str) -> Result<String> {
    let pattern = format!(
        r"(?s)show[^\r\n]*\r?\n(.*?){}\({}\)#",
        regex::escape(hostname),
        regex::escape(label)
    );
    let re = Regex::new(&pattern).map_err(SessionError::InvalidPattern)?;
    let body = re.captures(raw).and_then(|c| c.get(1)).ok_or_else(|| {
        SessionError::ProtocolMismatch {
            expected: format!("{hostname}({label})# after show output"),
            got: tail_snippet(raw),
        }
    })?;
    let page_artifact = core::str::from_utf8(PAGE_MARKER).unwrap();
    Ok(body.as_str().replace(page_artifact, ""))
}

fn tail_snippet(raw: &str) -> String {
    let tail: String = raw.chars().rev().take(60).collect();
    tail.chars().rev().collect()
}
