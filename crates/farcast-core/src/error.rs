//! Error types for the Farcast connection layers.
//!
//! The taxonomy separates what must tear a connection down from what must
//! not:
//!
//! - handshake failures abort the attempt before any session key exists;
//! - an authentication failure on one frame is retryable noise;
//! - size-limit violations and transport I/O failures are fatal;
//! - unknown opcodes are swallowed at the codec layer (see
//!   `farcast-proto`);
//! - local cancellation is graceful and never surfaces as a failure.

use std::io;

use thiserror::Error;

/// Errors while establishing a session, before keys are derived.
#[derive(Error, Debug)]
pub enum HandshakeError {
    /// The peer did not open with the protocol magic bytes.
    #[error("bad protocol preamble from peer")]
    BadMagic,

    /// The peer did not complete the preamble within the accept window.
    #[error("timed out waiting for protocol preamble")]
    PreambleTimeout,

    /// The peer's public key is a low-order point; no secure channel can
    /// be built on it.
    #[error("peer public key is a low-order point")]
    WeakPeerKey,

    /// The transport failed mid-handshake (includes short public-key
    /// reads).
    #[error("handshake I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Errors on the authenticated frame channel.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// A frame's ciphertext would exceed (send) or claims to exceed
    /// (receive) the frame limit. Fatal protocol violation.
    #[error("frame of {size} bytes exceeds the {max}-byte limit")]
    MessageTooLarge {
        /// Offending ciphertext size in bytes.
        size: usize,
        /// The enforced limit.
        max: usize,
    },

    /// The frame failed to decrypt under the session key.
    ///
    /// Retryable: stray non-protocol traffic can produce this and must
    /// not be able to disconnect a legitimate session. Receive loops log
    /// it and issue a fresh read. Whether repeated failures should
    /// eventually disconnect is deliberately left open; this
    /// implementation keeps listening.
    #[error("frame failed authentication")]
    Authentication,

    /// The transport failed. Fatal.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ChannelError {
    /// Whether this error must tear the connection down.
    ///
    /// Only [`ChannelError::Authentication`] is survivable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Authentication)
    }
}

/// Errors surfaced by the connection engines.
///
/// Only failures before the active phase reach the caller this way; once
/// a session is active, fatal errors are logged, the bounded-grace
/// shutdown runs, and the session ends without a panic or a propagated
/// error.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The handshake failed.
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// The secure channel failed fatally.
    #[error("channel failed: {0}")]
    Channel(#[from] ChannelError),

    /// A payload could not be encoded or decoded.
    #[error("codec failed: {0}")]
    Protocol(#[from] farcast_proto::ProtocolError),

    /// The remote public key was rejected at the trust check.
    #[error("remote public key was rejected")]
    Rejected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_failures_are_survivable() {
        assert!(!ChannelError::Authentication.is_fatal());
    }

    #[test]
    fn everything_else_is_fatal() {
        assert!(ChannelError::MessageTooLarge { size: 200_000, max: 128_000 }.is_fatal());
        assert!(ChannelError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "gone")).is_fatal());
    }
}
