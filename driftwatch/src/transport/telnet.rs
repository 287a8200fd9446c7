//! Raw Telnet session over a TCP socket.
//!
//! No handshake is negotiated here: the dialect driver drives the entire
//! login dialogue through `send_line`/`read_until` against literal markers.
//! The only protocol work this layer does is refusing Telnet option
//! negotiation (IAC sequences) and keeping those bytes out of the data
//! stream.

use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use log::debug;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::config::SessionConfig;
use super::Session;
use crate::channel::{Marker, MarkerBuffer};
use crate::error::{Result, SessionError, TransportError};

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

/// Negotiation parser state; IAC sequences can span read chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IacState {
    Data,
    Iac,
    Opt(u8),
    Subnegotiation,
    SubnegotiationIac,
}

/// Separate option negotiation from data.
///
/// Every DO is answered WONT and every WILL answered DONT — the fleet's
/// switches all fall back to plain NVT when options are refused.
/// Returns the cleaned data bytes; refusals are queued into `replies`.
fn scrub_iac(state: &mut IacState, input: &[u8], replies: &mut Vec<u8>) -> Vec<u8> {
    let mut data = Vec::with_capacity(input.len());
    for &byte in input {
        *state = match (*state, byte) {
            (IacState::Data, IAC) => IacState::Iac,
            (IacState::Data, b) => {
                data.push(b);
                IacState::Data
            }
            (IacState::Iac, IAC) => {
                // Escaped 0xFF literal
                data.push(IAC);
                IacState::Data
            }
            (IacState::Iac, SB) => IacState::Subnegotiation,
            (IacState::Iac, cmd @ (DO | DONT | WILL | WONT)) => IacState::Opt(cmd),
            (IacState::Iac, _) => IacState::Data,
            (IacState::Opt(cmd), opt) => {
                match cmd {
                    DO => replies.extend_from_slice(&[IAC, WONT, opt]),
                    WILL => replies.extend_from_slice(&[IAC, DONT, opt]),
                    _ => {}
                }
                IacState::Data
            }
            (IacState::Subnegotiation, IAC) => IacState::SubnegotiationIac,
            (IacState::Subnegotiation, _) => IacState::Subnegotiation,
            (IacState::SubnegotiationIac, SE) => IacState::Data,
            (IacState::SubnegotiationIac, _) => IacState::Subnegotiation,
        };
    }
    data
}

/// Raw Telnet session.
pub struct TelnetSession {
    stream: TcpStream,
    buffer: MarkerBuffer,
    read_buf: BytesMut,
    iac_state: IacState,
}

impl TelnetSession {
    /// Connect the socket. The caller performs the login dialogue.
    pub async fn open(config: SessionConfig) -> Result<Self> {
        let stream = tokio::time::timeout(
            config.connect_timeout,
            TcpStream::connect((config.host.as_str(), config.port)),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.connect_timeout))?
        .map_err(|e| TransportError::ConnectionFailed {
            host: config.host.clone(),
            port: config.port,
            source: e,
        })?;

        debug!("telnet connected to {}:{}", config.host, config.port);

        Ok(Self {
            stream,
            buffer: MarkerBuffer::default(),
            read_buf: BytesMut::with_capacity(4096),
            iac_state: IacState::Data,
        })
    }

    async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream
            .write_all(bytes)
            .await
            .map_err(SessionError::Io)?;
        self.stream.flush().await.map_err(SessionError::Io)?;
        Ok(())
    }
}

#[async_trait]
impl Session for TelnetSession {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        let payload = format!("{line}\r\n");
        self.write_all(payload.as_bytes()).await
    }

    async fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_all(bytes).await
    }

    async fn read_until(&mut self, marker: &Marker, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some((_, end)) = self.buffer.find_tail(marker) {
                return Ok(self.buffer.drain_to(end));
            }

            let n = tokio::time::timeout_at(deadline, self.stream.read_buf(&mut self.read_buf))
                .await
                .map_err(|_| SessionError::MarkerTimeout {
                    marker: marker.to_string(),
                    timeout,
                })?
                .map_err(SessionError::Io)?;

            if n == 0 {
                return Err(SessionError::Closed.into());
            }

            let chunk = self.read_buf.split().freeze();
            let mut replies = Vec::new();
            let data = scrub_iac(&mut self.iac_state, &chunk, &mut replies);
            if !replies.is_empty() {
                self.write_all(&replies).await?;
            }
            self.buffer.extend(&data);
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.shutdown().await.map_err(SessionError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrub(input: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut state = IacState::Data;
        let mut replies = Vec::new();
        let data = scrub_iac(&mut state, input, &mut replies);
        (data, replies)
    }

    #[test]
    fn test_sequence_split_across_chunks() {
        let mut state = IacState::Data;
        let mut replies = Vec::new();
        let first = scrub_iac(&mut state, &[b'a', IAC], &mut replies);
        let second = scrub_iac(&mut state, &[DO, 1, b'b'], &mut replies);
        assert_eq!(first, b"a");
        assert_eq!(second, b"b");
        assert_eq!(replies, vec![IAC, WONT, 1]);
    }

    #[test]
    fn test_do_refused_with_wont() {
        let (data, replies) = scrub(&[IAC, DO, 1, b'h', b'i']);
        assert_eq!(data, b"hi");
        assert_eq!(replies, vec![IAC, WONT, 1]);
    }

    #[test]
    fn test_will_refused_with_dont() {
        let (data, replies) = scrub(&[IAC, WILL, 3]);
        assert!(data.is_empty());
        assert_eq!(replies, vec![IAC, DONT, 3]);
    }

    #[test]
    fn test_subnegotiation_skipped() {
        let (data, replies) = scrub(&[b'a', IAC, SB, 24, 0, 1, IAC, SE, b'b']);
        assert_eq!(data, b"ab");
        assert!(replies.is_empty());
    }

    #[test]
    fn test_escaped_iac_literal() {
        let (data, _) = scrub(&[b'x', IAC, IAC, b'y']);
        assert_eq!(data, vec![b'x', IAC, b'y']);
    }
}
