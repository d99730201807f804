//! Error types for the Farcast wire format.
//!
//! All errors are structured, testable, and carry enough context to log a
//! single human-readable event.

use thiserror::Error;

/// Protocol-level errors that can occur while encoding or decoding
/// messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Message carried an opcode this implementation does not know.
    ///
    /// Not fatal: the opcode space may evolve, so callers should skip the
    /// message rather than abort the connection.
    #[error("unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),

    /// Message body was empty (a valid message is at least one opcode
    /// byte).
    #[error("empty message body")]
    EmptyMessage,

    /// Input ended in the middle of a value.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A game string violated its chunk framing.
    #[error("malformed game string: {0}")]
    MalformedGameString(&'static str),

    /// A discovery datagram violated its layout.
    #[error("malformed discovery packet: {0}")]
    MalformedDiscovery(&'static str),

    /// Failed to encode a payload as CBOR.
    #[error("failed to encode CBOR: {0}")]
    CborEncode(String),

    /// Failed to decode a CBOR payload.
    #[error("failed to decode CBOR: {0}")]
    CborDecode(String),
}

/// Convenient Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
