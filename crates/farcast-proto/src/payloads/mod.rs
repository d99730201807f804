//! CBOR-encoded message payloads and the message codec.
//!
//! Each opcode has a corresponding payload type. The [`ClientMessage`] and
//! [`ServerMessage`] enums provide type-safe handling with automatic CBOR
//! serialization.
//!
//! # Design Rationale
//!
//! ## No Variant Tag
//!
//! The opcode byte already identifies the payload type, so the enums
//! serialize only the inner struct content. This keeps one-byte messages
//! (Ping, Pong, Shutdown) exactly one byte and prevents mismatched
//! opcode/payload pairs.
//!
//! ## Why CBOR?
//!
//! - **Forward Compatibility**: fields can be added without breaking old
//!   peers; absent optional fields decode to their defaults.
//! - **Frozen Schema**: field names are the wire contract. Renaming a
//!   field in this module is a protocol break.
//!
//! ## Unknown Opcodes
//!
//! [`ClientMessage::decode`] and [`ServerMessage::decode`] return
//! [`ProtocolError::UnknownOpcode`] for opcodes outside their tables.
//! Dispatch loops skip these messages; they are not connection-fatal.

pub mod client;
pub mod server;

use bytes::BufMut;
use serde::de::DeserializeOwned;

use crate::{
    error::{ProtocolError, Result},
    opcodes::{ClientOpcode, ServerOpcode},
};

pub use client::{
    BacklogRequest, CatchUpRequest, ChannelSelect, ChatInput, PlayerListRequest, Preferences,
};
pub use server::{
    Availability, BacklogChunk, ChannelState, ChatMessage, Chunk, HousingLocation, IconChunk,
    PlayerData, PlayerList, TextChunk,
};

fn encode_cbor(value: &impl serde::Serialize, dst: &mut impl BufMut) -> Result<()> {
    ciborium::ser::into_writer(value, dst.writer())
        .map_err(|e| ProtocolError::CborEncode(e.to_string()))
}

fn decode_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::CborDecode(e.to_string()))
}

/// All messages a client can send.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Liveness probe.
    Ping,
    /// Chat text to deliver to the game.
    Chat(ChatInput),
    /// Graceful disconnect.
    Shutdown,
    /// Request the most recent N historical messages.
    Backlog(BacklogRequest),
    /// Request historical messages after a timestamp.
    CatchUp(CatchUpRequest),
    /// Request a roster.
    PlayerList(PlayerListRequest),
    /// Reserved; carries no payload and is ignored by servers.
    LinkshellList,
    /// Per-connection preferences.
    Preferences(Preferences),
    /// Change the active input channel.
    Channel(ChannelSelect),
}

impl ClientMessage {
    /// The opcode identifying this message's variant.
    #[must_use]
    pub const fn opcode(&self) -> ClientOpcode {
        match self {
            Self::Ping => ClientOpcode::Ping,
            Self::Chat(_) => ClientOpcode::Message,
            Self::Shutdown => ClientOpcode::Shutdown,
            Self::Backlog(_) => ClientOpcode::Backlog,
            Self::CatchUp(_) => ClientOpcode::CatchUp,
            Self::PlayerList(_) => ClientOpcode::PlayerList,
            Self::LinkshellList => ClientOpcode::LinkshellList,
            Self::Preferences(_) => ClientOpcode::Preferences,
            Self::Channel(_) => ClientOpcode::Channel,
        }
    }

    /// Encode as `[opcode][payload]` into `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::CborEncode`] if serialization fails.
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        dst.put_u8(self.opcode().to_u8());

        match self {
            Self::Ping | Self::Shutdown | Self::LinkshellList => Ok(()),
            Self::Chat(inner) => encode_cbor(inner, dst),
            Self::Backlog(inner) => encode_cbor(inner, dst),
            Self::CatchUp(inner) => encode_cbor(inner, dst),
            Self::PlayerList(inner) => encode_cbor(inner, dst),
            Self::Preferences(inner) => encode_cbor(inner, dst),
            Self::Channel(inner) => encode_cbor(inner, dst),
        }
    }

    /// Encode into a fresh buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::CborEncode`] if serialization fails.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(&mut out)?;
        Ok(out)
    }

    /// Decode a full message body (opcode byte plus payload).
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::EmptyMessage`] for a zero-length body.
    /// - [`ProtocolError::UnknownOpcode`] for an opcode outside the client
    ///   table; callers skip the message.
    /// - [`ProtocolError::CborDecode`] for a malformed payload.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (&op, payload) = bytes.split_first().ok_or(ProtocolError::EmptyMessage)?;
        let opcode = ClientOpcode::from_u8(op).ok_or(ProtocolError::UnknownOpcode(op))?;

        Ok(match opcode {
            ClientOpcode::Ping => Self::Ping,
            ClientOpcode::Message => Self::Chat(decode_cbor(payload)?),
            ClientOpcode::Shutdown => Self::Shutdown,
            ClientOpcode::Backlog => Self::Backlog(decode_cbor(payload)?),
            ClientOpcode::CatchUp => Self::CatchUp(decode_cbor(payload)?),
            ClientOpcode::PlayerList => Self::PlayerList(decode_cbor(payload)?),
            ClientOpcode::LinkshellList => Self::LinkshellList,
            ClientOpcode::Preferences => Self::Preferences(decode_cbor(payload)?),
            ClientOpcode::Channel => Self::Channel(decode_cbor(payload)?),
        })
    }
}

/// All messages a server can send.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Liveness answer.
    Pong,
    /// A chat message extracted from the game.
    Chat(ChatMessage),
    /// Session is being shut down.
    Shutdown,
    /// Current character data; `None` while logged out.
    PlayerData(Option<PlayerData>),
    /// Whether the game can accept input.
    Availability(Availability),
    /// The active input channel changed.
    Channel(ChannelState),
    /// One chunk of a backlog or catch-up response.
    Backlog(BacklogChunk),
    /// A roster response.
    PlayerList(PlayerList),
    /// Reserved; carries no payload and is ignored by clients.
    LinkshellList,
    /// The character's housing location.
    HousingLocation(HousingLocation),
}

impl ServerMessage {
    /// The opcode identifying this message's variant.
    #[must_use]
    pub const fn opcode(&self) -> ServerOpcode {
        match self {
            Self::Pong => ServerOpcode::Pong,
            Self::Chat(_) => ServerOpcode::Message,
            Self::Shutdown => ServerOpcode::Shutdown,
            Self::PlayerData(_) => ServerOpcode::PlayerData,
            Self::Availability(_) => ServerOpcode::Availability,
            Self::Channel(_) => ServerOpcode::Channel,
            Self::Backlog(_) => ServerOpcode::Backlog,
            Self::PlayerList(_) => ServerOpcode::PlayerList,
            Self::LinkshellList => ServerOpcode::LinkshellList,
            Self::HousingLocation(_) => ServerOpcode::HousingLocation,
        }
    }

    /// Encode as `[opcode][payload]` into `dst`.
    ///
    /// An absent [`PlayerData`] encodes as the bare opcode byte, matching
    /// the logged-out broadcast.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::CborEncode`] if serialization fails.
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        dst.put_u8(self.opcode().to_u8());

        match self {
            Self::Pong | Self::Shutdown | Self::LinkshellList | Self::PlayerData(None) => Ok(()),
            Self::Chat(inner) => encode_cbor(inner, dst),
            Self::PlayerData(Some(inner)) => encode_cbor(inner, dst),
            Self::Availability(inner) => encode_cbor(inner, dst),
            Self::Channel(inner) => encode_cbor(inner, dst),
            Self::Backlog(inner) => encode_cbor(inner, dst),
            Self::PlayerList(inner) => encode_cbor(inner, dst),
            Self::HousingLocation(inner) => encode_cbor(inner, dst),
        }
    }

    /// Encode into a fresh buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::CborEncode`] if serialization fails.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(&mut out)?;
        Ok(out)
    }

    /// Decode a full message body (opcode byte plus payload).
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::EmptyMessage`] for a zero-length body.
    /// - [`ProtocolError::UnknownOpcode`] for an opcode outside the server
    ///   table; callers skip the message.
    /// - [`ProtocolError::CborDecode`] for a malformed payload.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (&op, payload) = bytes.split_first().ok_or(ProtocolError::EmptyMessage)?;
        let opcode = ServerOpcode::from_u8(op).ok_or(ProtocolError::UnknownOpcode(op))?;

        Ok(match opcode {
            ServerOpcode::Pong => Self::Pong,
            ServerOpcode::Message => Self::Chat(decode_cbor(payload)?),
            ServerOpcode::Shutdown => Self::Shutdown,
            ServerOpcode::PlayerData if payload.is_empty() => Self::PlayerData(None),
            ServerOpcode::PlayerData => Self::PlayerData(Some(decode_cbor(payload)?)),
            ServerOpcode::Availability => Self::Availability(decode_cbor(payload)?),
            ServerOpcode::Channel => Self::Channel(decode_cbor(payload)?),
            ServerOpcode::Backlog => Self::Backlog(decode_cbor(payload)?),
            ServerOpcode::PlayerList => Self::PlayerList(decode_cbor(payload)?),
            ServerOpcode::LinkshellList => Self::LinkshellList,
            ServerOpcode::HousingLocation => Self::HousingLocation(decode_cbor(payload)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::chat::{ChatType, InputChannel, Player, PlayerListType};

    fn sample_chat_message(text: &str) -> ChatMessage {
        ChatMessage {
            timestamp: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            channel: ChatType::Say,
            sender: b"Aza Lindqvist".to_vec(),
            content: text.as_bytes().to_vec(),
            chunks: vec![
                Chunk::Text(TextChunk {
                    fallback_colour: Some(0xF7F7_F7FF),
                    foreground: None,
                    glow: None,
                    italic: false,
                    content: text.to_owned(),
                }),
                Chunk::Icon(IconChunk { index: 54 }),
            ],
        }
    }

    #[test]
    fn empty_payload_messages_are_one_byte() {
        assert_eq!(ClientMessage::Ping.to_vec().unwrap(), vec![1]);
        assert_eq!(ClientMessage::Shutdown.to_vec().unwrap(), vec![3]);
        assert_eq!(ServerMessage::Pong.to_vec().unwrap(), vec![1]);
        assert_eq!(ServerMessage::Shutdown.to_vec().unwrap(), vec![3]);
        assert_eq!(ServerMessage::PlayerData(None).to_vec().unwrap(), vec![4]);
    }

    #[test]
    fn one_opcode_byte_is_a_complete_message() {
        assert_eq!(ClientMessage::decode(&[1]).unwrap(), ClientMessage::Ping);
        assert_eq!(ServerMessage::decode(&[1]).unwrap(), ServerMessage::Pong);
        assert_eq!(ServerMessage::decode(&[4]).unwrap(), ServerMessage::PlayerData(None));
    }

    #[test]
    fn unknown_opcode_is_skippable_not_fatal() {
        assert_eq!(ClientMessage::decode(&[0xAA, 1, 2]), Err(ProtocolError::UnknownOpcode(0xAA)));
        assert_eq!(ServerMessage::decode(&[0xAA]), Err(ProtocolError::UnknownOpcode(0xAA)));
    }

    #[test]
    fn empty_body_is_rejected() {
        assert_eq!(ClientMessage::decode(&[]), Err(ProtocolError::EmptyMessage));
        assert_eq!(ServerMessage::decode(&[]), Err(ProtocolError::EmptyMessage));
    }

    #[test]
    fn client_messages_round_trip() {
        let messages = [
            ClientMessage::Ping,
            ClientMessage::Chat(ChatInput { content: "hello there".to_owned() }),
            ClientMessage::Shutdown,
            ClientMessage::Backlog(BacklogRequest { amount: 500 }),
            ClientMessage::CatchUp(CatchUpRequest {
                after: Utc.timestamp_millis_opt(1_699_999_000_000).unwrap(),
            }),
            ClientMessage::PlayerList(PlayerListRequest { list_type: PlayerListType::Friend }),
            ClientMessage::LinkshellList,
            ClientMessage::Preferences(Preferences {
                backlog_newest_first: true,
                housing_location: false,
            }),
            ClientMessage::Channel(ChannelSelect { channel: InputChannel::Party }),
        ];

        for message in messages {
            let wire = message.to_vec().unwrap();
            assert_eq!(wire[0], message.opcode().to_u8());
            assert_eq!(ClientMessage::decode(&wire).unwrap(), message);
        }
    }

    #[test]
    fn server_messages_round_trip() {
        let messages = [
            ServerMessage::Pong,
            ServerMessage::Chat(sample_chat_message("hello")),
            ServerMessage::Shutdown,
            ServerMessage::PlayerData(Some(PlayerData {
                home_world: "Ragnarok".to_owned(),
                current_world: "Ragnarok".to_owned(),
                location: "Limsa Lominsa".to_owned(),
                name: "Aza Lindqvist".to_owned(),
            })),
            ServerMessage::PlayerData(None),
            ServerMessage::Availability(Availability { available: true }),
            ServerMessage::Channel(ChannelState {
                channel: InputChannel::Say,
                name: "Say".to_owned(),
            }),
            ServerMessage::Backlog(BacklogChunk {
                sequence: 3,
                messages: vec![sample_chat_message("a"), sample_chat_message("b")],
            }),
            ServerMessage::PlayerList(PlayerList {
                list_type: PlayerListType::Friend,
                players: vec![Player { name: Some("Aza".to_owned()), ..Player::default() }],
            }),
            ServerMessage::LinkshellList,
            ServerMessage::HousingLocation(HousingLocation {
                ward: Some(12),
                plot: Some(4),
                plot_exterior: false,
                apartment_wing: None,
            }),
        ];

        for message in messages {
            let wire = message.to_vec().unwrap();
            assert_eq!(wire[0], message.opcode().to_u8());
            assert_eq!(ServerMessage::decode(&wire).unwrap(), message);
        }
    }

    #[test]
    fn preferences_default_when_fields_absent() {
        // A CBOR empty map decodes with every preference off.
        let mut wire = vec![ClientOpcode::Preferences.to_u8()];
        ciborium::ser::into_writer(
            &std::collections::BTreeMap::<String, bool>::new(),
            &mut wire,
        )
        .unwrap();

        match ClientMessage::decode(&wire).unwrap() {
            ClientMessage::Preferences(prefs) => {
                assert!(!prefs.backlog_newest_first);
                assert!(!prefs.housing_location);
            }
            other => panic!("expected Preferences, got {other:?}"),
        }
    }
}
