//! The authenticated, length-framed secure channel.
//!
//! One frame on the wire is
//!
//! ```text
//! [ciphertext length: u32 LE] [nonce: 24 bytes] [ciphertext: length bytes]
//! ```
//!
//! sealed with XChaCha20-Poly1305 under one directional session key and a
//! fresh random nonce per frame; the ciphertext includes the 16-byte
//! authentication tag. Frames are capped at 128,000 bytes of ciphertext
//! in both directions: oversized sends are rejected before anything is
//! written, and an announced length over the cap aborts the receive
//! before the claimed ciphertext is read.
//!
//! The channel is deliberately a pair of free functions over stream
//! halves rather than a locked object: an active connection has exactly
//! one reader task and one writer task, so the stream needs no lock.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::RngCore;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ChannelError;

/// Maximum ciphertext length of one frame.
pub const MAX_FRAME_LEN: usize = 128_000;

/// Nonce length of the XChaCha20-Poly1305 construction.
pub const NONCE_LEN: usize = 24;

/// Authentication tag length included in the ciphertext.
pub const TAG_LEN: usize = 16;

/// Length of the frame header (ciphertext length plus nonce).
pub const HEADER_LEN: usize = 4 + NONCE_LEN;

/// Seal `plaintext` under `key` and write one frame to `stream`.
///
/// # Errors
///
/// - [`ChannelError::MessageTooLarge`] if the ciphertext would exceed
///   [`MAX_FRAME_LEN`]; nothing is written in that case.
/// - [`ChannelError::Io`] if the transport fails.
pub async fn send_message<W>(
    stream: &mut W,
    key: &[u8; 32],
    plaintext: &[u8],
) -> Result<(), ChannelError>
where
    W: AsyncWrite + Unpin,
{
    let ciphertext_len = plaintext.len() + TAG_LEN;
    if ciphertext_len > MAX_FRAME_LEN {
        return Err(ChannelError::MessageTooLarge { size: ciphertext_len, max: MAX_FRAME_LEN });
    }

    let mut nonce = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|_| ChannelError::MessageTooLarge { size: ciphertext_len, max: MAX_FRAME_LEN })?;

    #[allow(clippy::cast_possible_truncation)]
    let len = (ciphertext.len() as u32).to_le_bytes();

    stream.write_all(&len).await?;
    stream.write_all(&nonce).await?;
    stream.write_all(&ciphertext).await?;
    stream.flush().await?;

    Ok(())
}

/// Read one frame from `stream` and open it under `key`.
///
/// Blocks until a full frame header and the announced ciphertext have
/// arrived.
///
/// # Errors
///
/// - [`ChannelError::MessageTooLarge`] if the announced length exceeds
///   [`MAX_FRAME_LEN`]; the claimed ciphertext is not read. Fatal.
/// - [`ChannelError::Authentication`] if the ciphertext fails to
///   decrypt. Retryable: the caller should issue a fresh read.
/// - [`ChannelError::Io`] if the transport fails. Fatal.
pub async fn read_message<R>(stream: &mut R, key: &[u8; 32]) -> Result<Vec<u8>, ChannelError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    stream.read_exact(&mut header).await?;

    let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    if length > MAX_FRAME_LEN {
        return Err(ChannelError::MessageTooLarge { size: length, max: MAX_FRAME_LEN });
    }

    let nonce = XNonce::from_slice(&header[4..]);

    let mut ciphertext = vec![0u8; length];
    stream.read_exact(&mut ciphertext).await?;

    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(nonce, ciphertext.as_slice())
        .map_err(|_| ChannelError::Authentication)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    async fn round_trip(key: &[u8; 32], payload: &[u8]) -> Vec<u8> {
        let (mut tx, mut rx) = tokio::io::duplex(MAX_FRAME_LEN + HEADER_LEN);
        send_message(&mut tx, key, payload).await.unwrap();
        read_message(&mut rx, key).await.unwrap()
    }

    #[tokio::test]
    async fn seals_and_opens() {
        let key = [7u8; 32];
        assert_eq!(round_trip(&key, b"hello").await, b"hello");
        assert_eq!(round_trip(&key, b"").await, b"");
    }

    #[tokio::test]
    async fn largest_allowed_payload_round_trips() {
        let key = [1u8; 32];
        let payload = vec![0xAB; MAX_FRAME_LEN - TAG_LEN];
        assert_eq!(round_trip(&key, &payload).await, payload);
    }

    #[tokio::test]
    async fn oversized_send_writes_nothing() {
        let key = [1u8; 32];
        let payload = vec![0u8; MAX_FRAME_LEN - TAG_LEN + 1];
        let (mut tx, mut rx) = tokio::io::duplex(64);

        let err = send_message(&mut tx, &key, &payload).await.unwrap_err();
        assert!(matches!(err, ChannelError::MessageTooLarge { .. }));

        // The writer half is still untouched; closing it lets the reader
        // observe a clean EOF rather than a partial frame.
        drop(tx);
        let read = read_message(&mut rx, &key).await;
        assert!(matches!(read, Err(ChannelError::Io(_))));
    }

    #[tokio::test]
    async fn wrong_key_fails_authentication() {
        let (mut tx, mut rx) = tokio::io::duplex(1024);
        send_message(&mut tx, &[1u8; 32], b"secret").await.unwrap();

        let err = read_message(&mut rx, &[2u8; 32]).await.unwrap_err();
        assert!(matches!(err, ChannelError::Authentication));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn tampered_ciphertext_fails_authentication() {
        let key = [9u8; 32];
        let (mut tx, mut rx) = tokio::io::duplex(1024);
        send_message(&mut tx, &key, b"secret").await.unwrap();

        // Corrupt one ciphertext byte in transit.
        let mut wire = Vec::new();
        let mut buf = [0u8; 256];
        let n = tokio::io::AsyncReadExt::read(&mut rx, &mut buf).await.unwrap();
        wire.extend_from_slice(&buf[..n]);
        let last = wire.len() - 1;
        wire[last] ^= 0x01;

        let err = read_message(&mut wire.as_slice(), &key).await.unwrap_err();
        assert!(matches!(err, ChannelError::Authentication));
    }

    #[tokio::test]
    async fn announced_oversize_is_fatal_before_reading_body() {
        let key = [1u8; 32];
        let mut header = Vec::new();
        header.extend_from_slice(&(MAX_FRAME_LEN as u32 + 1).to_le_bytes());
        header.extend_from_slice(&[0u8; NONCE_LEN]);
        // No ciphertext follows; the length check must fire first.

        let err = read_message(&mut header.as_slice(), &key).await.unwrap_err();
        assert!(matches!(err, ChannelError::MessageTooLarge { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn fresh_nonce_per_frame() {
        let key = [3u8; 32];
        let (mut tx, mut rx) = tokio::io::duplex(4096);

        send_message(&mut tx, &key, b"same payload").await.unwrap();
        send_message(&mut tx, &key, b"same payload").await.unwrap();

        let mut first = [0u8; HEADER_LEN];
        rx.read_exact(&mut first).await.unwrap();
        let len = u32::from_le_bytes([first[0], first[1], first[2], first[3]]) as usize;
        let mut body = vec![0u8; len];
        rx.read_exact(&mut body).await.unwrap();

        let mut second = [0u8; HEADER_LEN];
        rx.read_exact(&mut second).await.unwrap();

        assert_ne!(first[4..], second[4..], "nonces must not repeat");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn round_trips_arbitrary_payloads(
            key in any::<[u8; 32]>(),
            payload in prop::collection::vec(any::<u8>(), 0..4096),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let opened = rt.block_on(round_trip(&key, &payload));
            prop_assert_eq!(opened, payload);
        }
    }
}
