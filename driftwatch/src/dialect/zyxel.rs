//! ZyXEL dialect.
//!
//! SSH session, no elevation. Two queries: the running configuration and
//! `show system-information`, which carries the `SystemName:` field the
//! hostname is read from.
//!
//! These switches inject a literal `7` into captured output through a
//! pager/terminal artifact. The character is stripped from both the
//! configuration text and the hostname to keep snapshots stable. This is a
//! workaround for a display artifact, not intentional data removal — a
//! hostname genuinely containing a `7` would be mangled, which matches the
//! long-observed fleet behavior this tool preserves.

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

/// ZyXEL prompt: bare hostname followed by `#` or `>`.
const PROMPT: &str = r"(?m)^[\w.\-]{1,63}[>#]\s?$";

const SHOW_RUNNING: &str = "show running-config";

const SHOW_SYSTEM: &str = "show system-information";

/// Literal character the pager injects into output. Suspect artifact;
/// stripped to keep captures stable across runs.
const PAGER_ARTIFACT: char = '7';

/// `SystemName:` field after whitespace collapsing.
const SYSTEM_NAME_FIELD: &str = r"(?m)^SystemName:(.+)$";

pub(super) struct ZyxelDriver;

#[async_trait]
impl DialectDriver for ZyxelDriver {
    fn id(&self) -> DialectId {
        DialectId::Zyxel
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
        // No elevation step on these devices
        let config = session_config(device, settings, TransportKind::Ssh, false);
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

    session.send_line(SHOW_RUNNING).await?;
    let raw_config = session.read_until(&prompt, settings.read_timeout).await?;
    let raw_config = String::from_utf8_lossy(&raw_config);

    session.send_line(SHOW_SYSTEM).await?;
    let raw_info = session.read_until(&prompt, settings.read_timeout).await?;
    let raw_info = String::from_utf8_lossy(&raw_info);

    let text = strip_echo_and_prompt(&raw_config, SHOW_RUNNING)
        .replace(PAGER_ARTIFACT, "");

    let hostname = extract_system_name(&raw_info).ok_or_else(|| {
        DialectError::HostnameNotFound {
            host: device.host.clone(),
        }
    })?;

    Ok((text, hostname))
}

/// Pull the system name out of `show system-information` output.
///
/// The field value is separated from the label by a variable run of spaces
/// and tabs, so whitespace (and the pager artifact) is collapsed first.
fn extract_system_name(info: &str) -> Option<String> {
    let collapsed: String = info
        .chars()
        .filter(|c| !matches!(c, ' ' | '\t') && *c != PAGER_ARTIFACT)
        .collect();
    let field = Regex::new(SYSTEM_NAME_FIELD).unwrap();
    first_capture(&field, &collapsed).filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::ScriptedSession;
    use secrecy::SecretString;

    #[test]
    fn test_extract_system_name() {
        let info = "Product Model\t: GS1920\nSystemName  :  ACC-SW-03\nSystemLocation: closet\n";
        // The collapse removes the device's column padding before matching
        assert_eq!(extract_system_name(info), Some("ACC-SW-03".to_string()));
    }

    #[test]
    fn test_pager_artifact_stripped_from_name() {
        let info = "SystemName: ACC7-SW\n";
        assert_eq!(extract_system_name(info), Some("ACC-SW".to_string()));
    }

    #[tokio::test]
    async fn test_script_strips_artifact_from_config() {
        let device = DeviceRecord {
            host: "10.0.2.1".into(),
            username: "admin".into(),
            password: SecretString::from("pw".to_string()),
            secret: None,
            dialect_id: "zyxel_os".into(),
        };
        let mut session = ScriptedSession::new(vec![
            b"show running-config\r\nvlan 10\n name user7-vlan\nexit\nACC-SW#",
            b"show system-information\r\nSystemName: ACC-SW\nACC-SW#",
        ]);

        let (text, hostname) = script(&mut session, &device, &CaptureSettings::default())
            .await
            .unwrap();
        assert_eq!(hostname, "ACC-SW");
        assert!(text.contains("name user-vlan"));
        assert!(!text.contains('7'));
    }
}
