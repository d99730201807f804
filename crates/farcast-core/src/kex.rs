//! Key exchange and session-key derivation.
//!
//! Each party holds a long-term X25519 key pair; a connection derives one
//! pair of 32-byte session keys, one per direction, and never reuses them
//! across connections.
//!
//! # Derivation
//!
//! Both sides hash `shared_secret ∥ client_public ∥ server_public` with
//! Blake2b-512 and split the 64-byte digest in half. **Role matters**: the
//! client takes the first half as its receive key and the second as its
//! transmit key; the server assigns the same halves the other way round,
//! so `client.tx == server.rx` and `client.rx == server.tx` byte for
//! byte. Swapping the assignment makes both sides derive unrelated key
//! sets and every frame fails authentication — this invariant is pinned
//! by tests.
//!
//! # Handshake
//!
//! Over the duplex stream, each side writes its own 32-byte public key
//! and then reads the peer's (send-then-receive on both sides, not
//! turn-taking). No key material other than public keys crosses the wire.

use blake2::{Blake2b512, Digest};
use rand::rngs::OsRng;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::HandshakeError;

/// Length of an X25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length of one session key.
pub const SESSION_KEY_LEN: usize = 32;

/// A party's long-term identity key pair.
///
/// Created once per identity and persisted by the external configuration
/// layer; the secret half is zeroed when dropped.
pub struct KeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh key pair from the OS entropy pool.
    #[must_use]
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Rebuild a key pair from persisted secret bytes.
    #[must_use]
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// The public half, as sent on the wire and stored by trust stores.
    #[must_use]
    pub fn public_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        *self.public.as_bytes()
    }
}

/// The per-connection directional keys.
///
/// Owned exclusively by the connection that derived them and zeroed on
/// drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    /// Key under which incoming frames authenticate.
    pub rx: [u8; SESSION_KEY_LEN],
    /// Key under which outgoing frames are sealed.
    pub tx: [u8; SESSION_KEY_LEN],
}

/// The result of a completed handshake.
pub struct HandshakeInfo {
    /// The peer's public key, for the trust check.
    pub remote_public: [u8; PUBLIC_KEY_LEN],
    /// The derived directional keys.
    pub keys: SessionKeys,
}

/// Derive session keys in the client role.
///
/// # Errors
///
/// Rejects a low-order peer public key (all-zero shared secret).
pub fn client_session_keys(
    pair: &KeyPair,
    server_public: &[u8; PUBLIC_KEY_LEN],
) -> Result<SessionKeys, HandshakeError> {
    let halves = derive_halves(pair, server_public, &pair.public_bytes(), server_public)?;
    Ok(SessionKeys { rx: halves.0, tx: halves.1 })
}

/// Derive session keys in the server role.
///
/// Same digest as the client role, with the halves assigned in the
/// opposite order.
///
/// # Errors
///
/// Rejects a low-order peer public key (all-zero shared secret).
pub fn server_session_keys(
    pair: &KeyPair,
    client_public: &[u8; PUBLIC_KEY_LEN],
) -> Result<SessionKeys, HandshakeError> {
    let halves = derive_halves(pair, client_public, client_public, &pair.public_bytes())?;
    Ok(SessionKeys { tx: halves.0, rx: halves.1 })
}

/// Hash `secret ∥ client_public ∥ server_public` and split the digest.
fn derive_halves(
    pair: &KeyPair,
    peer_public: &[u8; PUBLIC_KEY_LEN],
    client_public: &[u8; PUBLIC_KEY_LEN],
    server_public: &[u8; PUBLIC_KEY_LEN],
) -> Result<([u8; 32], [u8; 32]), HandshakeError> {
    let shared = pair.secret.diffie_hellman(&PublicKey::from(*peer_public));
    if shared.as_bytes() == &[0u8; 32] {
        return Err(HandshakeError::WeakPeerKey);
    }

    let mut hasher = Blake2b512::new();
    hasher.update(shared.as_bytes());
    hasher.update(client_public);
    hasher.update(server_public);
    let mut digest = hasher.finalize();

    let mut first = [0u8; 32];
    let mut second = [0u8; 32];
    first.copy_from_slice(&digest[..32]);
    second.copy_from_slice(&digest[32..]);
    digest.zeroize();

    Ok((first, second))
}

/// Run the client side of the handshake over a duplex stream.
///
/// Writes our public key, reads the peer's, derives keys locally.
///
/// # Errors
///
/// Any transport failure (including a short key read) or a low-order
/// peer key aborts the attempt before any session key exists.
pub async fn client_handshake<S>(
    pair: &KeyPair,
    stream: &mut S,
) -> Result<HandshakeInfo, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(&pair.public_bytes()).await?;
    stream.flush().await?;

    let mut remote_public = [0u8; PUBLIC_KEY_LEN];
    stream.read_exact(&mut remote_public).await?;

    let keys = client_session_keys(pair, &remote_public)?;
    Ok(HandshakeInfo { remote_public, keys })
}

/// Run the server side of the handshake over a duplex stream.
///
/// # Errors
///
/// Same failure modes as [`client_handshake`].
pub async fn server_handshake<S>(
    pair: &KeyPair,
    stream: &mut S,
) -> Result<HandshakeInfo, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream.write_all(&pair.public_bytes()).await?;
    stream.flush().await?;

    let mut remote_public = [0u8; PUBLIC_KEY_LEN];
    stream.read_exact(&mut remote_public).await?;

    let keys = server_session_keys(pair, &remote_public)?;
    Ok(HandshakeInfo { remote_public, keys })
}
