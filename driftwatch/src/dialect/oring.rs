//! O-Ring dialect.
//!
//! Raw Telnet; the driver performs the whole login dialogue against
//! literal byte markers. Note the exact login cues — a space *before* the
//! colon and none after:
//!
//! ```text
//! Username :admin
//! Password :*****
//! switch>show config
//! ...
//! ---- More (q/Q to quit) ----
//! ...
//! switch>
//! ```
//!
//! `show config` interleaves the volatile `Interface Statistics` section
//! (packet counters) into otherwise stable output; that section is excised
//! before the capture is stored so counters never show up as drift.

use async_trait::async_trait;
use regex::Regex;

use super::{
    close_quietly, first_capture, read_paged, session_config, Capture, CaptureSettings,
    DialectDriver, DialectId,
};
use crate::channel::Marker;
use crate::error::{DialectError, Result};
use crate::inventory::DeviceRecord;
use crate::transport::{Session, SessionFactory, TransportKind};
use secrecy::ExposeSecret;

/// Login cue. Exact bytes: capital U, space before the colon.
const LOGIN_MARKER: &[u8] = b"Username :";

/// Password cue. Same shape as the login cue.
const PASSWORD_MARKER: &[u8] = b"Password :";

/// Fixed prompt; the device does not put its hostname in the prompt.
const PROMPT_MARKER: &[u8] = b"switch>";

/// Pagination line, exact bytes including the dashes.
const MORE_MARKER: &[u8] = b"---- More (q/Q to quit) ----";

/// Blank line advances the pager.
const CONTINUATION_PROBE: &[u8] = b"\r\n";

const SHOW_CONFIG: &str = "show config";

/// Hostname field after whitespace collapsing.
const NAME_FIELD: &str = r"(?m)^Name:(.+)$";

/// Start of the volatile counters section excised from the capture.
const EXCISE_FROM: &str = "Interface Statistics";

/// First stable heading after the counters; the excision ends here.
const EXCISE_TO: &str = "VLAN Configuration";

pub(super) struct OringDriver;

#[async_trait]
impl DialectDriver for OringDriver {
    fn id(&self) -> DialectId {
        DialectId::Oring
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

    session
        .read_until(&Marker::literal(LOGIN_MARKER), timeout)
        .await?;
    session.send_line(&device.username).await?;
    session
        .read_until(&Marker::literal(PASSWORD_MARKER), timeout)
        .await?;
    session.send_line(device.password.expose_secret()).await?;
    session
        .read_until(&Marker::literal(PROMPT_MARKER), timeout)
        .await?;

    session.send_line(SHOW_CONFIG).await?;
    let (raw, _complete) = read_paged(
        session,
        &Marker::literal(PROMPT_MARKER),
        MORE_MARKER,
        CONTINUATION_PROBE,
        settings.probe_budget,
        timeout,
    )
    .await?;
    let raw = String::from_utf8_lossy(&raw);

    let hostname = extract_name(&raw).ok_or_else(|| DialectError::HostnameNotFound {
        host: device.host.clone(),
    })?;

    Ok((cleanup(&raw), hostname))
}

/// `Name:` field, tolerant of the device's column padding.
fn extract_name(raw: &str) -> Option<String> {
    let collapsed: String = raw.chars().filter(|c| !matches!(c, ' ' | '\r')).collect();
    let field = Regex::new(NAME_FIELD).unwrap();
    first_capture(&field, &collapsed).filter(|name| !name.is_empty())
}

/// Drop pagination artifacts, the counters section, and the echo/prompt.
fn cleanup(raw: &str) -> String {
    let more = core::str::from_utf8(MORE_MARKER).unwrap();
    let mut text = raw.replace(more, "");

    if let (Some(from), Some(to)) = (text.find(EXCISE_FROM), text.find(EXCISE_TO)) {
        if from < to {
            text = format!("{}{}", &text[..from], &text[to..]);
        }
    }

    super::strip_echo_and_prompt(&text, SHOW_CONFIG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::ScriptedSession;
    use secrecy::SecretString;

    fn device() -> DeviceRecord {
        DeviceRecord {
            host: "10.0.4.1".into(),
            username: "admin".into(),
            password: SecretString::from("pw".to_string()),
            secret: None,
            dialect_id: "Oring_os".into(),
        }
    }

    #[test]
    fn test_excise_counters_section() {
        let raw = "System Configuration\nInterface Statistics\nrx: 123456\ntx: 654321\nVLAN Configuration\nvlan 1\n";
        let cleaned = cleanup(raw);
        assert!(cleaned.contains("System Configuration"));
        assert!(cleaned.contains("VLAN Configuration"));
        assert!(!cleaned.contains("rx: 123456"));
    }

    #[test]
    fn test_extract_name_with_padding() {
        let raw = "Model  : RGS-7244\r\nName   : RING-SW-02\r\n";
        assert_eq!(extract_name(raw), Some("RING-SW-02".to_string()));
    }

    #[tokio::test]
    async fn test_full_login_and_capture() {
        let mut session = ScriptedSession::new(vec![
            b"\r\nUsername :",
            b"Password :",
            b"\r\nswitch>",
            b"show config\r\nName : RING-SW-02\r\nsome config\r\n---- More (q/Q to quit) ----",
            b"\r\nmore config\r\nswitch>",
        ]);

        let (text, hostname) = script(&mut session, &device(), &CaptureSettings::default())
            .await
            .unwrap();

        assert_eq!(hostname, "RING-SW-02");
        assert!(text.contains("some config"));
        assert!(text.contains("more config"));
        assert!(!text.contains("More (q/Q to quit)"));
        // username, password, show config, one pagination probe
        assert_eq!(session.sent.len(), 4);
        assert_eq!(session.sent[0], "admin");
    }
}
