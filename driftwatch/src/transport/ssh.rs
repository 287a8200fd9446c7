//! SSH session implementation using russh.
//!
//! `open` performs the full negotiated handshake: TCP connect, host key
//! check, password authentication, PTY + shell request, and — when the
//! device descriptor carries a privilege secret — the `enable` elevation
//! dialogue. Dialect drivers receive a session that is already sitting at
//! an (elevated, if requested) prompt.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use russh::{Channel, ChannelMsg};
use secrecy::{ExposeSecret, SecretString};

use super::config::{HostKeyVerification, SessionConfig};
use super::Session;
use crate::channel::{Marker, MarkerBuffer};
use crate::error::{Result, SessionError, TransportError};

/// Command sent to request privilege elevation.
const ELEVATE_COMMAND: &str = "enable";

/// Prompt observed right after login: `>` unprivileged, `#` elevated.
const LOGIN_PROMPT: &str = r"(?m)[>#]\s?$";

/// Password cue printed by the elevation dialogue.
const ELEVATE_PASSWORD_PROMPT: &str = r"(?mi)password[: ]*$";

/// Prompt confirming the elevated mode was reached.
const ELEVATED_PROMPT: &str = r"(?m)#\s?$";

/// SSH session wrapping a russh shell channel.
pub struct SshSession {
    session: Handle<SshHandler>,
    channel: Channel<Msg>,
    buffer: MarkerBuffer,
}

impl SshSession {
    /// Connect, authenticate, open a PTY shell, and elevate if configured.
    pub async fn open(config: SessionConfig) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(config.connect_timeout),
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
            host_key_verification: config.host_key_verification.clone(),
            host_key_error: host_key_error.clone(),
        };

        let mut session = tokio::time::timeout(
            config.connect_timeout,
            client::connect(ssh_config, (config.host.as_str(), config.port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.connect_timeout))?
        .map_err(|e| {
            // If check_server_key stored a detailed error, surface that
            // instead of the generic russh::Error::UnknownKey
            if let Some(hk_err) = host_key_error.lock().unwrap().take() {
                hk_err
            } else {
                TransportError::Ssh(e)
            }
        })?;

        Self::authenticate(&mut session, &config).await?;

        let channel = session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_pty(
                true,
                "xterm",
                config.terminal_width,
                config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_shell(true)
            .await
            .map_err(TransportError::Ssh)?;

        let mut this = Self {
            session,
            channel,
            buffer: MarkerBuffer::default(),
        };

        // Consume the login banner up to the first prompt so the caller's
        // send/read pairs stay in sync with the device's echo.
        if let Some(secret) = config.enable_secret.clone() {
            this.elevate(&secret, config.read_timeout).await?;
        } else {
            let login = Marker::pattern(LOGIN_PROMPT).map_err(SessionError::InvalidPattern)?;
            this.read_until(&login, config.read_timeout).await?;
        }

        Ok(this)
    }

    /// Authenticate with the server using the inventory password.
    async fn authenticate(
        session: &mut Handle<SshHandler>,
        config: &SessionConfig,
    ) -> Result<()> {
        let success = session
            .authenticate_password(&config.username, config.password.expose_secret())
            .await
            .map_err(TransportError::Ssh)?
            .success();

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        Ok(())
    }

    /// Run the elevation dialogue: wait for the login prompt, send `enable`,
    /// answer the password cue with the secret, and confirm the `#` prompt.
    async fn elevate(&mut self, secret: &SecretString, timeout: Duration) -> Result<()> {
        let login = Marker::pattern(LOGIN_PROMPT).map_err(SessionError::InvalidPattern)?;
        let banner = self.read_until(&login, timeout).await?;

        if ends_with_elevated_prompt(&banner) {
            debug!("session already elevated at login");
            return Ok(());
        }

        self.send_line(ELEVATE_COMMAND).await?;

        // Some devices skip the password cue when the account is exempt
        let gate = Marker::any(vec![
            Marker::pattern(ELEVATE_PASSWORD_PROMPT).map_err(SessionError::InvalidPattern)?,
            Marker::pattern(ELEVATED_PROMPT).map_err(SessionError::InvalidPattern)?,
        ]);
        let reply = self.read_until(&gate, timeout).await?;
        if ends_with_elevated_prompt(&reply) {
            return Ok(());
        }

        self.send_line(secret.expose_secret()).await?;
        let confirm = Marker::pattern(ELEVATED_PROMPT).map_err(SessionError::InvalidPattern)?;
        self.read_until(&confirm, timeout).await?;
        debug!("privilege elevation complete");
        Ok(())
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.channel
            .data(bytes)
            .await
            .map_err(SessionError::Ssh)?;
        Ok(())
    }
}

fn ends_with_elevated_prompt(data: &[u8]) -> bool {
    data.trim_ascii_end().ends_with(b"#")
}

#[async_trait]
impl Session for SshSession {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        let payload = format!("{line}\n");
        self.write_bytes(payload.as_bytes()).await
    }

    async fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_bytes(bytes).await
    }

    async fn read_until(&mut self, marker: &Marker, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some((_, end)) = self.buffer.find_tail(marker) {
                return Ok(self.buffer.drain_to(end));
            }

            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| SessionError::MarkerTimeout {
                    marker: marker.to_string(),
                    timeout,
                })?;

            match msg {
                Some(ChannelMsg::Data { ref data }) => self.buffer.extend(data),
                Some(ChannelMsg::ExtendedData { ref data, .. }) => self.buffer.extend(data),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(SessionError::Closed.into());
                }
                Some(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Err(e) = self.channel.eof().await {
            debug!("channel eof failed during close: {}", e);
        }
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> std::result::Result<bool, TransportError> {
        russh::keys::check_known_hosts(&self.host, self.port, pubkey)
            .map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
            .map_err(|e| TransportError::KnownHosts(e.to_string()))
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key for {}: {}", self.host, e);
                    }
                    Ok(true)
                }
                Err(e) => {
                    *self.host_key_error.lock().unwrap() = Some(e);
                    Ok(false)
                }
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    *self.host_key_error.lock().unwrap() = Some(TransportError::HostKeyUnknown {
                        host: self.host.clone(),
                        port: self.port,
                    });
                    Ok(false)
                }
                Err(e) => {
                    *self.host_key_error.lock().unwrap() = Some(e);
                    Ok(false)
                }
            },
        }
    }
}
