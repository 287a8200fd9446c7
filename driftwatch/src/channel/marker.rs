//! Session markers — the exact byte sequences a dialect driver waits for.
//!
//! Some devices require literal matches including trailing punctuation and
//! whitespace (e.g. the O-Ring login banner ends in `b"Username :"`, space
//! before the colon and no trailing space), so literal markers are matched
//! byte-for-byte rather than through a normalizing regex.

use std::fmt;

use memchr::memmem;
use regex::bytes::Regex;

/// A marker the session waits for: a prompt, a login cue, or a pagination
/// continuation line.
#[derive(Debug, Clone)]
pub enum Marker {
    /// Exact byte sequence, matched literally.
    Literal(Vec<u8>),

    /// Regex over raw bytes, for prompts that embed a variable hostname.
    Pattern(Regex),

    /// Earliest match among several markers wins.
    AnyOf(Vec<Marker>),
}

impl Marker {
    /// Create a literal marker from an exact byte sequence.
    pub fn literal(bytes: impl AsRef<[u8]>) -> Self {
        Marker::Literal(bytes.as_ref().to_vec())
    }

    /// Create a pattern marker from a regex string.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Marker::Pattern(Regex::new(pattern)?))
    }

    /// Combine markers; the one matching earliest in the stream wins.
    pub fn any(markers: Vec<Marker>) -> Self {
        Marker::AnyOf(markers)
    }

    /// Find the earliest match in `haystack`, returning `(start, end)`
    /// byte offsets.
    pub fn find(&self, haystack: &[u8]) -> Option<(usize, usize)> {
        match self {
            Marker::Literal(needle) => {
                memmem::find(haystack, needle).map(|start| (start, start + needle.len()))
            }
            Marker::Pattern(re) => re.find(haystack).map(|m| (m.start(), m.end())),
            Marker::AnyOf(markers) => markers
                .iter()
                .filter_map(|m| m.find(haystack))
                .min_by_key(|&(start, _)| start),
        }
    }

    /// Check whether the marker occurs anywhere in `haystack`.
    pub fn is_match(&self, haystack: &[u8]) -> bool {
        self.find(haystack).is_some()
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Literal(bytes) => write!(f, "{:?}", String::from_utf8_lossy(bytes)),
            Marker::Pattern(re) => write!(f, "/{}/", re.as_str()),
            Marker::AnyOf(markers) => {
                let parts: Vec<String> = markers.iter().map(|m| m.to_string()).collect();
                write!(f, "{}", parts.join(" | "))
            }
        }
    }
}
