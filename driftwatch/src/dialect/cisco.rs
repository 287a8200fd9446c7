//! Cisco IOS dialect.
//!
//! SSH session; elevation runs during transport open when the descriptor
//! carries an enable secret. Pagination is disabled up front with
//! `terminal length 0`, so the single `show running-config` query returns
//! in one piece.
//!
//! ```text
//! SW-CORE-01#terminal length 0
//! SW-CORE-01#show running-config
//! Building configuration...
//!
//! hostname SW-CORE-01
//! ...
//! end
//! SW-CORE-01#
//! ```

use async_trait::async_trait;
use regex::Regex;

use super::{
    close_quietly, first_capture, session_config, strip_echo_and_prompt, Capture,
    CaptureSettings, DialectDriver, DialectId,
};
use crate::channel::Marker;
use crate::error::{DialectError, Result, SessionError};
use crate::inventory::DeviceRecord;
use crate::transport::{Session, SessionFactory, TransportKind};

/// Prompt at either privilege level: `hostname>` or `hostname#`.
const PROMPT: &str = r"(?m)^[\w.\-@()/:]{1,63}[>#]\s?$";

/// Issued first so no `--More--` prompt ever appears.
const DISABLE_PAGING: &str = "terminal length 0";

const SHOW_RUNNING: &str = "show running-config";

/// Hostname line inside the running configuration.
const HOSTNAME_FIELD: &str = r"(?m)^hostname (\S+)";

pub(super) struct CiscoDriver;

#[async_trait]
impl DialectDriver for CiscoDriver {
    fn id(&self) -> DialectId {
        DialectId::Cisco
    }

    fn transport(&self) -> TransportKind {
        TransportKind::Ssh
    }

    async fn capture(
        &self,
        device: &DeviceRecord,
        factory: &dyn SessionFactory,
        settings: &CaptureSettings,
    ) -> Result<Capture> {
        let config = session_config(device, settings, TransportKind::Ssh, true);
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
    let prompt = Marker::pattern(PROMPT).map_err(SessionError::InvalidPattern)?;

    session.send_line(DISABLE_PAGING).await?;
    session.read_until(&prompt, settings.read_timeout).await?;

    session.send_line(SHOW_RUNNING).await?;
    let raw = session.read_until(&prompt, settings.read_timeout).await?;
    let raw = String::from_utf8_lossy(&raw);

    let text = strip_echo_and_prompt(&raw, SHOW_RUNNING);
    let hostname_field = Regex::new(HOSTNAME_FIELD).unwrap();
    let hostname =
        first_capture(&hostname_field, &text).ok_or_else(|| DialectError::HostnameNotFound {
            host: device.host.clone(),
        })?;

    Ok((text, hostname))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::ScriptedSession;
    use secrecy::SecretString;

    fn device() -> DeviceRecord {
        DeviceRecord {
            host: "10.0.0.1".into(),
            username: "admin".into(),
            password: SecretString::from("pw".to_string()),
            secret: None,
            dialect_id: "cisco_ios".into(),
        }
    }

    #[test]
    fn test_prompt_pattern() {
        let prompt = regex::bytes::Regex::new(PROMPT).unwrap();
        assert!(prompt.is_match(b"SW-CORE-01#"));
        assert!(prompt.is_match(b"output\nSW-CORE-01# "));
        assert!(prompt.is_match(b"router>"));
        assert!(!prompt.is_match(b"mid-line # comment"));
    }

    #[tokio::test]
    async fn test_script_extracts_hostname_and_cleans() {
        let mut session = ScriptedSession::new(vec![
            b"terminal length 0\r\nSW1#",
            b"show running-config\r\nBuilding configuration...\n\nhostname SW1\ninterface Gi0/1\n description uplink\nend\nSW1#",
        ]);

        let (text, hostname) = script(&mut session, &device(), &CaptureSettings::default())
            .await
            .unwrap();

        assert_eq!(hostname, "SW1");
        assert!(text.contains("hostname SW1"));
        assert!(!text.starts_with("show running-config"));
        assert!(!text.trim_end().ends_with("SW1#"));
        assert_eq!(session.sent, vec!["terminal length 0", "show running-config"]);
    }

    #[tokio::test]
    async fn test_missing_hostname_is_extraction_error() {
        let mut session = ScriptedSession::new(vec![
            b"terminal length 0\r\nSW1#",
            b"show running-config\r\ninterface Gi0/1\nend\nSW1#",
        ]);

        let err = script(&mut session, &device(), &CaptureSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Dialect(DialectError::HostnameNotFound { .. })
        ));
    }
}
