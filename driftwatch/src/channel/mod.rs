//! Channel layer for marker matching over interactive byte streams.
//!
//! This module handles output accumulation, ANSI/control stripping,
//! and detection of the session markers dialect drivers wait for.

mod buffer;
mod marker;

pub use buffer::MarkerBuffer;
pub use marker::Marker;
