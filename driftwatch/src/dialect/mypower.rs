//! MyPower dialect (ZTE ZXROS-like CLI).
//!
//! SSH session with optional elevation. The platform has no way to disable
//! its pager, so `show running-config` pauses on a `---MORE---` line that
//! must be answered with blank probes until the prompt returns.
//!
//! ```text
//! AGG-SW#show running-config
//! hostname AGG-SW
//! ...
//! ---MORE---
//! ...
//! AGG-SW#
//! ```

use async_trait::async_trait;
use regex::Regex;

use super::{
    close_quietly, first_capture, read_paged, session_config, strip_echo_and_prompt, Capture,
    CaptureSettings, DialectDriver, DialectId,
};
use crate::channel::Marker;
use crate::error::{DialectError, Result, SessionError};
use crate::inventory::DeviceRecord;
use crate::transport::{Session, SessionFactory, TransportKind};

/// Prompt after login/elevation: `hostname#`.
const PROMPT: &str = r"(?m)^[\w.\-]{1,63}#\s?$";

/// Exact pagination marker, no surrounding dashes or spaces beyond these.
const MORE_MARKER: &[u8] = b"---MORE---";

/// Probe answering the pager. The device advances on spaces; newline would
/// echo an extra prompt into the capture.
const CONTINUATION_PROBE: &[u8] = b"                         ";

const SHOW_RUNNING: &str = "show running-config";

/// Hostname line inside the running configuration.
const HOSTNAME_FIELD: &str = r"(?m)^hostname (.+)$";

pub(super) struct MyPowerDriver;

#[async_trait]
impl DialectDriver for MyPowerDriver {
    fn id(&self) -> DialectId {
        DialectId::MyPower
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

    session.send_line(SHOW_RUNNING).await?;
    let (raw, _complete) = read_paged(
        session,
        &prompt,
        MORE_MARKER,
        CONTINUATION_PROBE,
        settings.probe_budget,
        settings.read_timeout,
    )
    .await?;
    let raw = String::from_utf8_lossy(&raw);

    let text = cleanup(&raw);

    let hostname_field = Regex::new(HOSTNAME_FIELD).unwrap();
    let hostname =
        first_capture(&hostname_field, &text).ok_or_else(|| DialectError::HostnameNotFound {
            host: device.host.clone(),
        })?;

    Ok((text, hostname))
}

/// Remove pagination artifacts and every echoed prompt line, then the
/// leading command echo.
fn cleanup(raw: &str) -> String {
    let no_more = raw.replace(core::str::from_utf8(MORE_MARKER).unwrap(), "");
    let prompt_line = Regex::new(PROMPT).unwrap();
    let no_prompts = prompt_line.replace_all(&no_more, "");
    strip_echo_and_prompt(&no_prompts, SHOW_RUNNING)
}
