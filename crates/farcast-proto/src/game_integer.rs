//! The game's packed unsigned-integer format.
//!
//! Game strings embed lengths and numeric parameters using a
//! variable-length encoding driven by a single leading marker byte:
//!
//! - Markers below `0xD0` encode the value directly as `marker - 1`
//!   (so `0x01..=0xCF` covers `0..=206` in one byte).
//! - Markers at or above `0xD0` select which of the four little-endian
//!   bytes of the value are present explicitly: `mask = (marker + 1) & 0xF`
//!   where bit *i* of the mask means "byte *i* of the value follows".
//!   Present bytes are written highest-index first; absent bytes are zero.
//!
//! The mask form covers the whole-byte, `byte * 256`, shifted-16/24,
//! 16-bit, 24-bit and 32-bit patterns as well as the "hole" patterns where
//! interior bytes are implicitly zero. Canonical encodings use markers
//! `0xF0..=0xFE`; decoding accepts the full `0xD0..=0xFF` range the same
//! way the game does.
//!
//! Only decoding is exercised by the live protocol (historical sender
//! metadata), but [`encode`] mirrors the marker table exactly so fixtures
//! can be generated and round-tripped.

use bytes::{Buf, BufMut};

use crate::error::{ProtocolError, Result};

/// Decode one packed integer from the front of `buf`.
///
/// Advances the cursor past the consumed bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::UnexpectedEof`] if the input ends before the
/// value is complete. Never panics on truncated input.
pub fn decode(buf: &mut impl Buf) -> Result<u32> {
    if !buf.has_remaining() {
        return Err(ProtocolError::UnexpectedEof);
    }

    let marker = buf.get_u8();
    if marker < 0xD0 {
        // Single-byte form, biased by one. Matches the game's unsigned
        // arithmetic for the (never legitimately produced) zero marker.
        return Ok((u32::from(marker)).wrapping_sub(1));
    }

    let mask = marker.wrapping_add(1) & 0x0F;
    let mut bytes = [0u8; 4];
    for i in (0..4).rev() {
        if mask & (1 << i) != 0 {
            if !buf.has_remaining() {
                return Err(ProtocolError::UnexpectedEof);
            }
            bytes[i] = buf.get_u8();
        }
    }

    Ok(u32::from_le_bytes(bytes))
}

/// Encode `value` in canonical form.
///
/// Values up to `0xCE` use the single biased byte; larger values use the
/// `0xF0`-range marker whose mask names exactly the nonzero bytes.
pub fn encode(value: u32, buf: &mut impl BufMut) {
    if value <= 0xCE {
        #[allow(clippy::cast_possible_truncation)]
        buf.put_u8((value + 1) as u8);
        return;
    }

    let bytes = value.to_le_bytes();
    let mut mask = 0u8;
    for (i, byte) in bytes.iter().enumerate() {
        if *byte != 0 {
            mask |= 1 << i;
        }
    }

    // value > 0xCE guarantees at least one nonzero byte.
    buf.put_u8(0xF0 + mask - 1);
    for i in (0..4).rev() {
        if mask & (1 << i) != 0 {
            buf.put_u8(bytes[i]);
        }
    }
}

/// Encode `value` into a fresh buffer.
#[must_use]
pub fn encode_to_vec(value: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(5);
    encode(value, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn single_byte_markers() {
        // marker = value + 1 for the whole biased range
        for value in 0..=0xCEu32 {
            let encoded = encode_to_vec(value);
            assert_eq!(encoded, vec![(value + 1) as u8]);
            assert_eq!(decode(&mut encoded.as_slice()).unwrap(), value);
        }
    }

    /// One fixture per distinct multi-byte marker, exercising every
    /// byte-presence mask.
    #[test]
    fn marker_table_fixtures() {
        // (wire bytes, decoded value)
        let fixtures: &[(&[u8], u32)] = &[
            (&[0xF0, 0xCF], 0x0000_00CF),             // b0
            (&[0xF1, 0xAB], 0x0000_AB00),             // b1 (byte * 256)
            (&[0xF2, 0x12, 0x34], 0x0000_1234),       // b1 b0 (16-bit)
            (&[0xF3, 0xAB], 0x00AB_0000),             // b2 (shift 16)
            (&[0xF4, 0xAB, 0xCD], 0x00AB_00CD),       // b2 b0 (hole)
            (&[0xF5, 0xAB, 0xCD], 0x00AB_CD00),       // b2 b1 (hole)
            (&[0xF6, 0x12, 0x34, 0x56], 0x0012_3456), // b2 b1 b0 (24-bit)
            (&[0xF7, 0xAB], 0xAB00_0000),             // b3 (shift 24)
            (&[0xF8, 0xAB, 0xCD], 0xAB00_00CD),       // b3 b0 (hole)
            (&[0xF9, 0xAB, 0xCD], 0xAB00_CD00),       // b3 b1 (hole)
            (&[0xFA, 0xAB, 0xCD, 0xEF], 0xAB00_CDEF), // b3 b1 b0 (hole)
            (&[0xFB, 0xAB, 0xCD], 0xABCD_0000),       // b3 b2 (hole)
            (&[0xFC, 0xAB, 0xCD, 0xEF], 0xABCD_00EF), // b3 b2 b0 (hole)
            (&[0xFD, 0xAB, 0xCD, 0xEF], 0xABCD_EF00), // b3 b2 b1 (hole)
            (&[0xFE, 0x12, 0x34, 0x56, 0x78], 0x1234_5678), // 32-bit
        ];

        for (wire, expected) in fixtures {
            let mut cursor = *wire;
            assert_eq!(decode(&mut cursor).unwrap(), *expected, "wire {wire:02X?}");
            assert!(!cursor.has_remaining(), "wire {wire:02X?} left trailing bytes");
        }
    }

    #[test]
    fn canonical_encoding_matches_fixture_bytes() {
        // Values whose nonzero-byte masks span the whole table.
        let cases: &[(u32, &[u8])] = &[
            (0x0000_00CF, &[0xF0, 0xCF]),
            (0x0000_AB00, &[0xF1, 0xAB]),
            (0x0000_1234, &[0xF2, 0x12, 0x34]),
            (0x00AB_0000, &[0xF3, 0xAB]),
            (0x1234_5678, &[0xFE, 0x12, 0x34, 0x56, 0x78]),
        ];

        for (value, wire) in cases {
            assert_eq!(encode_to_vec(*value), *wire, "value {value:#010X}");
        }
    }

    #[test]
    fn truncated_input_is_an_error_not_a_panic() {
        // marker promising four bytes, delivering two
        let mut cursor: &[u8] = &[0xFE, 0x12, 0x34];
        assert_eq!(decode(&mut cursor), Err(ProtocolError::UnexpectedEof));

        let mut empty: &[u8] = &[];
        assert_eq!(decode(&mut empty), Err(ProtocolError::UnexpectedEof));
    }

    #[test]
    fn nonstandard_markers_decode_like_the_game() {
        // The 0xD0 range is undocumented but shares the mask math.
        let mut cursor: &[u8] = &[0xD0, 0x42]; // mask 1 -> b0
        assert_eq!(decode(&mut cursor).unwrap(), 0x42);
    }

    proptest! {
        #[test]
        fn encode_decode_round_trip(value in any::<u32>()) {
            let wire = encode_to_vec(value);
            let mut cursor = wire.as_slice();
            prop_assert_eq!(decode(&mut cursor).unwrap(), value);
            prop_assert!(!cursor.has_remaining());
        }
    }
}
