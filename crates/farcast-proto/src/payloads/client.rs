//! Client-originated payload types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::{InputChannel, PlayerListType};

/// Chat text submitted for delivery to the game.
///
/// The server sanitizes embedded newlines and splits over-long content
/// into game-command-sized pieces before delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatInput {
    /// The raw text as typed, including any leading slash command.
    pub content: String,
}

/// Request for the most recent historical messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogRequest {
    /// How many messages to send, newest first from the server's buffer.
    pub amount: u16,
}

/// Request for historical messages after a timestamp.
///
/// Sent on reconnect to the same host instead of a count-bounded backlog,
/// so only the gap since the newest locally-held message is transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatchUpRequest {
    /// Timestamp of the newest message the client already holds.
    #[serde(with = "crate::timestamp::millis")]
    pub after: DateTime<Utc>,
}

/// Request for a roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerListRequest {
    /// Which roster to fetch.
    pub list_type: PlayerListType,
}

/// Per-connection negotiated preferences.
///
/// Serialized as a CBOR map; fields absent on the wire decode to their
/// defaults, so preferences can be added without breaking old peers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Order backlog and catch-up responses newest message first.
    #[serde(default)]
    pub backlog_newest_first: bool,
    /// The client understands housing-location updates.
    #[serde(default)]
    pub housing_location: bool,
}

/// Change the active chat input channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSelect {
    /// The channel subsequent unprefixed input should go to.
    pub channel: InputChannel,
}
