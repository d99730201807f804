//! Operation codes for Farcast protocol messages.
//!
//! The first byte of every decrypted message identifies its type. The two
//! directions use independent tables: opcode 2 is a chat submission from a
//! client but a chat broadcast from a server.
//!
//! # Representation
//!
//! Opcodes are serialized as a single `u8`. The `#[repr(u8)]` ensures
//! stable numeric values for wire compatibility.
//!
//! # Unknown Opcodes
//!
//! `from_u8` is total and returns `None` for unknown values. Unknown
//! opcodes are skipped by dispatch loops, not treated as fatal, so the
//! table can grow without breaking old peers.

use serde_repr::{Deserialize_repr, Serialize_repr};

/// Operations a client may send to a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum ClientOpcode {
    /// Liveness probe; the server answers with Pong.
    Ping = 1,
    /// Chat text to deliver to the game.
    Message = 2,
    /// Graceful disconnect.
    Shutdown = 3,
    /// Request the most recent N historical messages.
    Backlog = 4,
    /// Request historical messages after a timestamp (reconnect).
    CatchUp = 5,
    /// Request a player list (friends, party, ...).
    PlayerList = 6,
    /// Reserved for linkshell roster support.
    LinkshellList = 7,
    /// Negotiated per-connection preferences.
    Preferences = 8,
    /// Change the active chat input channel.
    Channel = 9,
}

impl ClientOpcode {
    /// Convert to the raw wire byte.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Convert from a raw wire byte.
    ///
    /// Returns `None` if the value doesn't correspond to a known opcode.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Ping),
            2 => Some(Self::Message),
            3 => Some(Self::Shutdown),
            4 => Some(Self::Backlog),
            5 => Some(Self::CatchUp),
            6 => Some(Self::PlayerList),
            7 => Some(Self::LinkshellList),
            8 => Some(Self::Preferences),
            9 => Some(Self::Channel),
            _ => None,
        }
    }
}

/// Operations a server may send to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum ServerOpcode {
    /// Liveness answer to Ping.
    Pong = 1,
    /// A chat message extracted from the game.
    Message = 2,
    /// Server is shutting the session down.
    Shutdown = 3,
    /// Current character data (empty payload when logged out).
    PlayerData = 4,
    /// Whether the game can currently accept input.
    Availability = 5,
    /// The active chat input channel changed.
    Channel = 6,
    /// One chunk of a backlog or catch-up response.
    Backlog = 7,
    /// A player list response.
    PlayerList = 8,
    /// Reserved for linkshell roster support.
    LinkshellList = 9,
    /// The character's current housing location.
    HousingLocation = 10,
}

impl ServerOpcode {
    /// Convert to the raw wire byte.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Convert from a raw wire byte.
    ///
    /// Returns `None` if the value doesn't correspond to a known opcode.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Pong),
            2 => Some(Self::Message),
            3 => Some(Self::Shutdown),
            4 => Some(Self::PlayerData),
            5 => Some(Self::Availability),
            6 => Some(Self::Channel),
            7 => Some(Self::Backlog),
            8 => Some(Self::PlayerList),
            9 => Some(Self::LinkshellList),
            10 => Some(Self::HousingLocation),
            _ => None,
        }
    }
}
