//! # Farcast Protocol: Wire Format
//!
//! This crate implements the binary message layer for the Farcast chat
//! streaming protocol: the opcode tables, the typed payloads and their
//! codec, the legacy packed-integer format embedded in game strings, and
//! the LAN discovery datagram layout.
//!
//! ## Protocol Design
//!
//! A protocol message is a single opcode byte followed by a CBOR-encoded
//! payload:
//!
//! ```text
//! [opcode: u8] + [payload: variable CBOR bytes, possibly empty]
//! ```
//!
//! Messages with no payload (Ping, Pong, Shutdown) are exactly one opcode
//! byte on the wire. The opcode space is split into two independent
//! tables, one per direction ([`ClientOpcode`], [`ServerOpcode`]), because
//! the same numeric value means different things depending on who sent it.
//!
//! ## Implementation Notes
//!
//! - **CBOR for Payloads**: Structured payloads use CBOR maps with string
//!   field names. Field names are the schema and are frozen: renaming a
//!   struct field in this crate is a wire-protocol break.
//!
//! - **Forward Compatibility**: Decoding an unrecognized opcode yields
//!   [`ProtocolError::UnknownOpcode`]. Callers skip such messages instead
//!   of tearing down the connection, so the opcode table can grow without
//!   breaking old peers.
//!
//! - **Legacy Game Strings**: Sender and content fields of chat messages
//!   carry the game's own string encoding, which embeds binary payload
//!   chunks and a packed variable-length integer format. [`game_integer`]
//!   and [`game_text`] decode these without ever panicking on truncated
//!   input.
//!
//! This crate performs no I/O and contains no cryptography; the secure
//! framing that carries these messages lives in `farcast-core`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chat;
pub mod discovery;
pub mod error;
pub mod game_integer;
pub mod game_text;
pub mod opcodes;
pub mod payloads;
pub mod timestamp;

pub use chat::{ChatType, InputChannel, Player, PlayerListType, PlayerStatus};
pub use error::{ProtocolError, Result};
pub use opcodes::{ClientOpcode, ServerOpcode};
pub use payloads::{ClientMessage, ServerMessage};
