//! Error types for framing and envelope encoding.

use std::io;

use thiserror::Error;

/// Errors produced while reading or writing length-prefixed frames.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FrameError {
    /// The underlying connection failed, or closed mid-frame.
    #[error("frame i/o failed: {0}")]
    Io(#[from] io::Error),

    /// A single read or write did not complete within the per-I/O deadline.
    #[error("frame i/o deadline exceeded")]
    Timeout,

    /// The header declared a total length smaller than the header itself.
    #[error("frame header declares total length {0}, minimum is {min}", min = crate::framing::HEADER_LEN)]
    InvalidLength(u32),

    /// The payload cannot be represented in a 32-bit total length.
    #[error("payload of {size} bytes exceeds the maximum frame payload of {max} bytes", max = crate::framing::MAX_PAYLOAD_LEN)]
    TooLarge {
        /// Payload size the caller attempted to write.
        size: usize,
    },
}

impl FrameError {
    /// Returns `true` if the error is a per-I/O deadline expiry.
    ///
    /// Timeouts on a frame in progress are terminal for the connection;
    /// this predicate exists so callers can log them distinctly.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// Errors produced while encoding an XML envelope.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnvelopeError {
    /// The payload could not be serialized to XML.
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] quick_xml::SeError),

    /// The serialized payload did not parse back as well-formed XML.
    #[error("provisional document is not well-formed: {0}")]
    Parse(#[from] roxmltree::Error),

    /// Writing the final document failed.
    #[error("envelope writing failed: {0}")]
    Write(#[from] io::Error),
}
