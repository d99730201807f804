//! Server-originated payload types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    chat::{ChatType, InputChannel, Player, PlayerListType},
    error::Result,
    game_text::{self, SenderPlayer},
};

/// One styled span of a chat message's rich-text rendering.
///
/// Serialized with serde's externally-tagged enum representation
/// (`{"Text": {...}}` / `{"Icon": {...}}`); the tag names are part of the
/// wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Chunk {
    /// A run of text with optional styling.
    Text(TextChunk),
    /// An inline game icon.
    Icon(IconChunk),
}

/// A run of text with optional styling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Channel default colour (RGBA), used when no explicit foreground is
    /// set.
    pub fallback_colour: Option<u32>,
    /// Explicit foreground colour (RGBA).
    pub foreground: Option<u32>,
    /// Glow/outline colour (RGBA).
    pub glow: Option<u32>,
    /// Whether the run is italicized.
    pub italic: bool,
    /// The text itself.
    pub content: String,
}

/// An inline game icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconChunk {
    /// Sprite index in the game's icon font.
    pub index: u8,
}

/// A chat message extracted from the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// When the message was seen, millisecond precision.
    #[serde(with = "crate::timestamp::millis")]
    pub timestamp: DateTime<Utc>,
    /// The chat log channel it arrived on.
    pub channel: ChatType,
    /// Sender metadata in the game's embedded-payload string encoding.
    pub sender: Vec<u8>,
    /// Message content in the game's embedded-payload string encoding.
    pub content: Vec<u8>,
    /// Pre-rendered rich-text spans for display.
    pub chunks: Vec<Chunk>,
}

impl ChatMessage {
    /// The message content as plain text.
    ///
    /// # Errors
    ///
    /// Fails if the content bytes violate the game-string framing.
    pub fn content_text(&self) -> Result<String> {
        game_text::plain_text(&self.content)
    }

    /// The sender metadata as plain text.
    ///
    /// # Errors
    ///
    /// Fails if the sender bytes violate the game-string framing.
    pub fn sender_text(&self) -> Result<String> {
        game_text::plain_text(&self.sender)
    }

    /// The sending player, if the sender metadata names one.
    ///
    /// # Errors
    ///
    /// Fails if the sender bytes violate the game-string framing.
    pub fn sender_player(&self) -> Result<Option<SenderPlayer>> {
        game_text::sender_player(&self.sender)
    }
}

/// Current character data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerData {
    /// Home world name.
    pub home_world: String,
    /// Current world name.
    pub current_world: String,
    /// Current zone name.
    pub location: String,
    /// Character name.
    pub name: String,
}

/// Whether the game can currently accept chat input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    /// True while a character is logged in.
    pub available: bool,
}

/// The active chat input channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelState {
    /// The channel identifier.
    pub channel: InputChannel,
    /// Its localized display name.
    pub name: String,
}

/// One chunk of a backlog or catch-up response.
///
/// A logical response may span several chunks; all of them carry the
/// request's sequence number so the receiver can splice them contiguously
/// at one insertion point even when live messages arrive in between.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacklogChunk {
    /// Sequence number of the logical request this chunk belongs to.
    pub sequence: u32,
    /// The messages of this chunk, in the negotiated order.
    pub messages: Vec<ChatMessage>,
}

/// A roster response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerList {
    /// Which roster this is.
    pub list_type: PlayerListType,
    /// Its entries.
    pub players: Vec<Player>,
}

/// The character's current housing location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HousingLocation {
    /// Ward number, if inside a housing district.
    pub ward: Option<u16>,
    /// Plot number, if at a plot.
    pub plot: Option<u16>,
    /// Whether the character is outside the building on the plot.
    pub plot_exterior: bool,
    /// Apartment wing, if inside an apartment building.
    pub apartment_wing: Option<u8>,
}
