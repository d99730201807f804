//! Trust-on-first-use key store and prompt seams.
//!
//! The engines only ever *consult* trust: lookup and persistence belong
//! to the external configuration layer, and the accept/reject decision
//! for an unknown key belongs to the external UI. Both seams are traits
//! here; [`MemoryTrustStore`] is the in-memory implementation used by
//! tests and throwaway sessions.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

/// Lookup and persistence of known remote public keys.
///
/// Methods take `&self`; implementations provide their own interior
/// mutability so a store can be shared across sessions.
pub trait TrustStore: Send + Sync {
    /// Whether this public key has been accepted before.
    fn is_trusted(&self, public_key: &[u8; 32]) -> bool;

    /// Remember an accepted public key.
    fn trust(&self, public_key: [u8; 32]);
}

/// The suspended accept/reject decision for an unknown peer key.
///
/// The engine calls this once per connection at most, after the handshake
/// and before any protocol traffic; the implementation typically shows a
/// fingerprint dialog and waits for the user.
#[async_trait]
pub trait TrustPrompt: Send + Sync {
    /// Decide whether to accept a previously unknown public key.
    async fn allow_unknown(&self, public_key: &[u8; 32]) -> bool;
}

/// In-memory trust store.
#[derive(Clone, Default)]
pub struct MemoryTrustStore {
    inner: Arc<Mutex<HashSet<[u8; 32]>>>,
}

impl MemoryTrustStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already trusts the given keys.
    #[must_use]
    pub fn with_keys(keys: impl IntoIterator<Item = [u8; 32]>) -> Self {
        Self { inner: Arc::new(Mutex::new(keys.into_iter().collect())) }
    }
}

impl TrustStore for MemoryTrustStore {
    fn is_trusted(&self, public_key: &[u8; 32]) -> bool {
        self.inner.lock().expect("trust store lock poisoned").contains(public_key)
    }

    fn trust(&self, public_key: [u8; 32]) {
        self.inner.lock().expect("trust store lock poisoned").insert(public_key);
    }
}

/// A prompt that accepts every unknown key. Test use.
pub struct AlwaysAllow;

#[async_trait]
impl TrustPrompt for AlwaysAllow {
    async fn allow_unknown(&self, _public_key: &[u8; 32]) -> bool {
        true
    }
}

/// A prompt that rejects every unknown key.
pub struct AlwaysDeny;

#[async_trait]
impl TrustPrompt for AlwaysDeny {
    async fn allow_unknown(&self, _public_key: &[u8; 32]) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembers_trusted_keys() {
        let store = MemoryTrustStore::new();
        let key = [5u8; 32];

        assert!(!store.is_trusted(&key));
        store.trust(key);
        assert!(store.is_trusted(&key));
    }

    #[test]
    fn clones_share_state() {
        let store = MemoryTrustStore::new();
        let clone = store.clone();

        store.trust([9u8; 32]);
        assert!(clone.is_trusted(&[9u8; 32]));
    }

    #[tokio::test]
    async fn canned_prompts() {
        assert!(AlwaysAllow.allow_unknown(&[0u8; 32]).await);
        assert!(!AlwaysDeny.allow_unknown(&[0u8; 32]).await);
    }
}
