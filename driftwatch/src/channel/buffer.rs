//! Marker buffer with efficient tail-search optimization.
//!
//! Only the last N bytes of the accumulated output are searched for session
//! markers; for large captures (full running configurations) this keeps
//! marker detection cheap as the buffer grows.
//!
//! Incoming bytes pass through a `vte` parser so ANSI escape sequences and
//! stray control bytes never reach marker matching or the stored capture.

use vte::{Parser, Perform};

use super::marker::Marker;

/// Collects printable output from the terminal stream, discarding escape
/// sequences and control bytes other than `\r`, `\n`, and `\t`.
#[derive(Debug, Default)]
struct Scrubber {
    out: Vec<u8>,
}

impl Perform for Scrubber {
    fn print(&mut self, c: char) {
        let mut encoded = [0u8; 4];
        self.out.extend_from_slice(c.encode_utf8(&mut encoded).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\r' | b'\n' | b'\t') {
            self.out.push(byte);
        }
    }

    fn hook(&mut self, _: &vte::Params, _: &[u8], _: bool, _: char) {}

    fn put(&mut self, _: u8) {}

    fn unhook(&mut self) {}

    fn osc_dispatch(&mut self, _: &[&[u8]], _: bool) {}

    fn csi_dispatch(&mut self, _: &vte::Params, _: &[u8], _: bool, _: char) {}

    fn esc_dispatch(&mut self, _: &[u8], _: bool, _: u8) {}
}

/// Buffer for accumulating session output and searching it for markers.
pub struct MarkerBuffer {
    /// The accumulated, scrubbed output.
    buffer: Vec<u8>,

    /// How many bytes from the end to search for markers.
    search_depth: usize,

    parser: Parser,
    scrubber: Scrubber,
}

impl MarkerBuffer {
    /// Create a new buffer with the specified tail search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
            parser: Parser::new(),
            scrubber: Scrubber::default(),
        }
    }

    /// Feed raw transport bytes through the scrubber into the buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.parser.advance(&mut self.scrubber, data);
        self.buffer.append(&mut self.scrubber.out);
    }

    /// Search the tail of the buffer for the marker.
    ///
    /// Returns `(start, end)` offsets relative to the full buffer.
    pub fn find_tail(&self, marker: &Marker) -> Option<(usize, usize)> {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        marker
            .find(&self.buffer[start..])
            .map(|(s, e)| (start + s, start + e))
    }

    /// Remove and return everything up to and including `end`.
    pub fn drain_to(&mut self, end: usize) -> Vec<u8> {
        let rest = self.buffer.split_off(end);
        std::mem::replace(&mut self.buffer, rest)
    }

    /// Take ownership of the full buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for MarkerBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl std::fmt::Debug for MarkerBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerBuffer")
            .field("len", &self.buffer.len())
            .field("search_depth", &self.search_depth)
            .finish()
    }
}
