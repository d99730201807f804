//! LAN pairing datagram layout.
//!
//! Servers answer a one-byte multicast query with their advertised name,
//! port and public key so a viewer on the same network can pair without
//! typing an address. Only the packet codec lives here; the UDP multicast
//! flow is the caller's concern.
//!
//! ```text
//! query:    [14]
//! response: [14] [name_len: u8] [name: name_len bytes] [port: u16 BE] [public_key: 32 bytes]
//! ```

use crate::error::{ProtocolError, Result};

/// First byte of both query and response datagrams.
pub const DISCOVERY_MAGIC: u8 = 14;

/// Length of the advertised public key.
pub const PUBLIC_KEY_LEN: usize = 32;

/// A server's answer to a discovery query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryResponse {
    /// Advertised server name (typically the character name).
    pub name: String,
    /// TCP port the server listens on.
    pub port: u16,
    /// The server's long-term public key, for trust-on-first-use pairing.
    pub public_key: [u8; PUBLIC_KEY_LEN],
}

/// The one-byte discovery query.
#[must_use]
pub const fn query() -> [u8; 1] {
    [DISCOVERY_MAGIC]
}

/// Whether a received datagram is a discovery query.
#[must_use]
pub fn is_query(datagram: &[u8]) -> bool {
    datagram == [DISCOVERY_MAGIC]
}

impl DiscoveryResponse {
    /// Encode this response into a datagram.
    ///
    /// # Errors
    ///
    /// Returns an error if the name does not fit the one-byte length
    /// prefix.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let name = self.name.as_bytes();
        let name_len =
            u8::try_from(name.len()).map_err(|_| ProtocolError::MalformedDiscovery("name too long"))?;

        let mut out = Vec::with_capacity(1 + 1 + name.len() + 2 + PUBLIC_KEY_LEN);
        out.push(DISCOVERY_MAGIC);
        out.push(name_len);
        out.extend_from_slice(name);
        out.extend_from_slice(&self.port.to_be_bytes());
        out.extend_from_slice(&self.public_key);
        Ok(out)
    }

    /// Decode a response datagram.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedDiscovery`] on any layout
    /// violation; stray datagrams on the multicast group are expected and
    /// must not panic the listener.
    pub fn decode(datagram: &[u8]) -> Result<Self> {
        if datagram.len() < 2 {
            return Err(ProtocolError::MalformedDiscovery("too short"));
        }
        if datagram[0] != DISCOVERY_MAGIC {
            return Err(ProtocolError::MalformedDiscovery("bad magic"));
        }

        let name_len = datagram[1] as usize;
        let expected = 2 + name_len + 2 + PUBLIC_KEY_LEN;
        if datagram.len() != expected {
            return Err(ProtocolError::MalformedDiscovery("length mismatch"));
        }

        let name = String::from_utf8_lossy(&datagram[2..2 + name_len]).into_owned();
        let port = u16::from_be_bytes([datagram[2 + name_len], datagram[3 + name_len]]);
        let mut public_key = [0u8; PUBLIC_KEY_LEN];
        public_key.copy_from_slice(&datagram[4 + name_len..]);

        Ok(Self { name, port, public_key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_round_trip() {
        let response = DiscoveryResponse {
            name: "Aza Lindqvist".to_owned(),
            port: 14777,
            public_key: [7u8; PUBLIC_KEY_LEN],
        };

        let wire = response.encode().unwrap();
        assert_eq!(wire[0], DISCOVERY_MAGIC);
        assert_eq!(DiscoveryResponse::decode(&wire).unwrap(), response);
    }

    #[test]
    fn query_shape() {
        assert!(is_query(&query()));
        assert!(!is_query(&[DISCOVERY_MAGIC, 0]));
        assert!(!is_query(&[15]));
    }

    #[test]
    fn rejects_truncated_response() {
        let response = DiscoveryResponse {
            name: "srv".to_owned(),
            port: 1,
            public_key: [0u8; PUBLIC_KEY_LEN],
        };
        let mut wire = response.encode().unwrap();
        wire.pop();

        assert!(DiscoveryResponse::decode(&wire).is_err());
    }

    #[test]
    fn rejects_oversized_name() {
        let response = DiscoveryResponse {
            name: "x".repeat(300),
            port: 1,
            public_key: [0u8; PUBLIC_KEY_LEN],
        };

        assert!(response.encode().is_err());
    }
}
