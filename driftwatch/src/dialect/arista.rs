//! Arista EOS dialect.
//!
//! Same session shape as Cisco — SSH, elevation during open, pagination
//! disabled with `terminal length 0` — kept as its own variant because the
//! fleet tracks it separately and EOS prompts allow a wider character set.

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

/// EOS prompt, either privilege level.
const PROMPT: &str = r"(?m)^[\w.\-@()/: ]{1,63}[>#]\s?$";

const DISABLE_PAGING: &str = "terminal length 0";

const SHOW_RUNNING: &str = "show running-config";

/// Hostname line inside the running configuration.
const HOSTNAME_FIELD: &str = r"(?m)^hostname (.+)$";

pub(super) struct AristaDriver;

#[async_trait]
impl DialectDriver for AristaDriver {
    fn id(&self) -> DialectId {
        DialectId::Arista
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
