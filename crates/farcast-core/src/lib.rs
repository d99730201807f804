//! Farcast secure transport and connection engines.
//!
//! This crate turns the wire format from `farcast-proto` into live
//! sessions: key exchange and session-key derivation, the authenticated
//! length-framed channel, backlog chunking and reassembly, the
//! trust-on-first-use store interface, and the client/server connection
//! engines that multiplex sending, receiving and cancellation over a
//! single duplex stream.
//!
//! # Architecture
//!
//! ```text
//! raw bytes <-> channel (AEAD frames) <-> proto codec <-> engine/session
//!                                                          |
//!                                            events / queues / seams
//!                                        (UI, trust prompt, game input)
//! ```
//!
//! The engines never touch a socket type directly: both sides run over
//! any `AsyncRead + AsyncWrite` duplex stream, so a TCP connection and a
//! relay tunnel look the same, and tests drive them over in-memory pipes.
//!
//! # Concurrency Model
//!
//! Each active connection is a small set of tasks sharing one transport:
//! a receive loop (sole reader), a send loop (sole writer) draining one
//! unbounded multi-producer queue, and a cooperative cancellation token.
//! The steady-state loop is a fair `select!` over "frame ready",
//! "outgoing queued" and "cancelled" — exactly one source is serviced per
//! iteration and each source is a FIFO, so none can starve the others.
//!
//! # Error Policy
//!
//! A frame that fails authentication is retryable noise (stray traffic
//! probing the port must not be able to disconnect a legitimate session);
//! everything else on the transport is fatal. On any fatal error or local
//! cancellation the engines still attempt a bounded-grace shutdown
//! message so the peer learns about the disconnect when possible.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backlog;
pub mod channel;
pub mod chat_input;
pub mod engine;
pub mod error;
pub mod kex;
pub mod server;
mod session;
pub mod trust;

pub use backlog::{chunk_backlog, BacklogHistory, BacklogReassembler};
pub use channel::{read_message, send_message, MAX_FRAME_LEN};
pub use engine::{ConnectionEngine, ConnectionEvent, ConnectionHandle, ConnectionState, EngineConfig};
pub use error::{ChannelError, EngineError, HandshakeError};
pub use kex::{client_handshake, server_handshake, HandshakeInfo, KeyPair, SessionKeys};
pub use server::{ChatServer, ServerConfig, ServerEvent};
pub use trust::{AlwaysAllow, AlwaysDeny, MemoryTrustStore, TrustPrompt, TrustStore};

/// The fixed preamble a client writes before the handshake.
pub const MAGIC: [u8; 3] = [14, 20, 67];
