//! Decoding of the game's embedded-payload string format.
//!
//! Sender and content fields of chat messages are not plain UTF-8: the
//! game interleaves binary payload chunks with text bytes. A chunk is
//! framed as
//!
//! ```text
//! [0x02] [kind: u8] [len: packed integer] [data: len bytes] [0x03]
//! ```
//!
//! Everything outside chunk framing is UTF-8 text. This module extracts
//! the plain text and, for sender metadata, the player link embedded in an
//! interactive chunk (kind `0x27`, subtype `0x01`).

use bytes::Buf;

use crate::{
    error::{ProtocolError, Result},
    game_integer,
};

/// Chunk framing start byte.
const CHUNK_START: u8 = 0x02;
/// Chunk framing end byte.
const CHUNK_END: u8 = 0x03;
/// Interactive payload kind.
const KIND_INTERACTIVE: u8 = 0x27;
/// Interactive subtype carrying a player reference.
const SUBTYPE_PLAYER: u8 = 0x01;

/// Party-position glyphs the game prepends to party members' names
/// (private-use range U+E090..=U+E097).
const PARTY_GLYPHS: [char; 8] =
    ['\u{e090}', '\u{e091}', '\u{e092}', '\u{e093}', '\u{e094}', '\u{e095}', '\u{e096}', '\u{e097}'];

/// The player identity embedded in a message's sender metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SenderPlayer {
    /// Character name.
    pub name: String,
    /// Home world id, `0` when the metadata carried no player link.
    pub world: u16,
}

/// Extract the plain text of a game string, skipping payload chunks.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedGameString`] when chunk framing is
/// violated and [`ProtocolError::UnexpectedEof`] when the input ends
/// mid-chunk.
pub fn plain_text(bytes: &[u8]) -> Result<String> {
    let mut cursor = bytes;
    let mut text = Vec::new();

    while cursor.has_remaining() {
        let b = cursor.get_u8();
        if b != CHUNK_START {
            text.push(b);
            continue;
        }

        skip_chunk(&mut cursor)?;
    }

    Ok(String::from_utf8_lossy(&text).into_owned())
}

/// Extract the sending player from a message's sender metadata.
///
/// Prefers the embedded interactive player link (which carries the home
/// world id); otherwise falls back to the surrounding plain text with any
/// leading party-position glyph removed. Returns `None` when the metadata
/// contains no text at all.
///
/// # Errors
///
/// Same failure modes as [`plain_text`].
pub fn sender_player(bytes: &[u8]) -> Result<Option<SenderPlayer>> {
    let mut cursor = bytes;
    let mut text = Vec::new();

    while cursor.has_remaining() {
        let b = cursor.get_u8();
        if b != CHUNK_START {
            text.push(b);
            continue;
        }

        let (kind, data) = read_chunk(&mut cursor)?;
        if kind != KIND_INTERACTIVE {
            continue;
        }

        if let Some(player) = decode_player_link(data)? {
            return Ok(Some(player));
        }
    }

    if text.is_empty() {
        return Ok(None);
    }

    let mut name = String::from_utf8_lossy(&text).into_owned();
    if let Some(first) = name.chars().next() {
        if PARTY_GLYPHS.contains(&first) {
            name = name[first.len_utf8()..].to_owned();
        }
    }

    Ok(Some(SenderPlayer { name, world: 0 }))
}

/// Read one chunk body after its start byte, returning `(kind, data)`.
fn read_chunk<'a>(cursor: &mut &'a [u8]) -> Result<(u8, &'a [u8])> {
    if !cursor.has_remaining() {
        return Err(ProtocolError::UnexpectedEof);
    }
    let kind = cursor.get_u8();

    let len = game_integer::decode(cursor)? as usize;
    let rest: &'a [u8] = *cursor;
    if rest.len() < len {
        return Err(ProtocolError::UnexpectedEof);
    }
    let data = &rest[..len];
    *cursor = &rest[len..];

    if !cursor.has_remaining() {
        return Err(ProtocolError::UnexpectedEof);
    }
    if cursor.get_u8() != CHUNK_END {
        return Err(ProtocolError::MalformedGameString("missing chunk terminator"));
    }

    Ok((kind, data))
}

fn skip_chunk(cursor: &mut &[u8]) -> Result<()> {
    read_chunk(cursor).map(|_| ())
}

/// Decode a player reference from an interactive chunk's data, if it is
/// one.
fn decode_player_link(data: &[u8]) -> Result<Option<SenderPlayer>> {
    let mut cursor = data;

    if !cursor.has_remaining() {
        return Ok(None);
    }
    if cursor.get_u8() != SUBTYPE_PLAYER {
        return Ok(None);
    }

    // one unknown byte, then the packed world id
    if !cursor.has_remaining() {
        return Err(ProtocolError::UnexpectedEof);
    }
    cursor.advance(1);

    let world = game_integer::decode(&mut cursor)? as u16;

    // two unknown bytes, then the packed name length
    if cursor.remaining() < 2 {
        return Err(ProtocolError::UnexpectedEof);
    }
    cursor.advance(2);

    let name_len = game_integer::decode(&mut cursor)? as usize;
    if cursor.remaining() < name_len {
        return Err(ProtocolError::UnexpectedEof);
    }
    let name = String::from_utf8_lossy(&cursor[..name_len]).into_owned();

    Ok(Some(SenderPlayer { name, world }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_integer::encode_to_vec;

    fn chunk(kind: u8, data: &[u8]) -> Vec<u8> {
        let mut out = vec![CHUNK_START, kind];
        out.extend_from_slice(&encode_to_vec(data.len() as u32));
        out.extend_from_slice(data);
        out.push(CHUNK_END);
        out
    }

    fn player_link(world: u16, name: &str) -> Vec<u8> {
        let mut data = vec![SUBTYPE_PLAYER, 0x00];
        data.extend_from_slice(&encode_to_vec(u32::from(world)));
        data.extend_from_slice(&[0x00, 0x00]);
        data.extend_from_slice(&encode_to_vec(name.len() as u32));
        data.extend_from_slice(name.as_bytes());
        chunk(KIND_INTERACTIVE, &data)
    }

    #[test]
    fn plain_text_passes_through_bare_utf8() {
        assert_eq!(plain_text(b"hello world").unwrap(), "hello world");
    }

    #[test]
    fn plain_text_skips_chunks() {
        let mut bytes = b"before ".to_vec();
        bytes.extend_from_slice(&chunk(0x1A, &[0x02])); // italics toggle
        bytes.extend_from_slice(b"after");

        assert_eq!(plain_text(&bytes).unwrap(), "before after");
    }

    #[test]
    fn plain_text_rejects_bad_terminator() {
        let mut bytes = chunk(0x1A, &[0x02]);
        *bytes.last_mut().unwrap() = 0x07;

        assert_eq!(
            plain_text(&bytes),
            Err(ProtocolError::MalformedGameString("missing chunk terminator"))
        );
    }

    #[test]
    fn plain_text_truncated_chunk_is_eof() {
        let mut bytes = chunk(0x12, &[1, 2, 3]);
        bytes.truncate(bytes.len() - 2);

        assert_eq!(plain_text(&bytes), Err(ProtocolError::UnexpectedEof));
    }

    #[test]
    fn sender_from_player_link() {
        let bytes = player_link(73, "Aza Lindqvist");

        let sender = sender_player(&bytes).unwrap().unwrap();
        assert_eq!(sender.name, "Aza Lindqvist");
        assert_eq!(sender.world, 73);
    }

    #[test]
    fn sender_falls_back_to_text() {
        let sender = sender_player(b"Aza Lindqvist").unwrap().unwrap();
        assert_eq!(sender.name, "Aza Lindqvist");
        assert_eq!(sender.world, 0);
    }

    #[test]
    fn sender_strips_party_glyph() {
        let mut bytes = "\u{e091}".as_bytes().to_vec();
        bytes.extend_from_slice(b"Aza Lindqvist");

        let sender = sender_player(&bytes).unwrap().unwrap();
        assert_eq!(sender.name, "Aza Lindqvist");
    }

    #[test]
    fn sender_of_empty_metadata_is_none() {
        assert_eq!(sender_player(b"").unwrap(), None);
    }

    #[test]
    fn sender_ignores_non_player_interactive_chunks() {
        // interactive chunk with an item subtype, then text
        let mut bytes = chunk(KIND_INTERACTIVE, &[0x03, 0x01, 0x02]);
        bytes.extend_from_slice(b"Aza");

        let sender = sender_player(&bytes).unwrap().unwrap();
        assert_eq!(sender.name, "Aza");
        assert_eq!(sender.world, 0);
    }
}
