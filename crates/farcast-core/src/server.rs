//! Host-side chat server.
//!
//! [`ChatServer`] owns everything sessions share: the listener accept
//! loop, the bounded backlog history, the connected-client registry, the
//! current presence/channel state, and the event stream the host process
//! (the game plugin) consumes. Per-connection protocol work lives in
//! [`crate::session`].
//!
//! The host process drives the server from the outside: it records chat
//! messages as they are extracted from the game, updates presence and
//! channel state, answers roster requests, and drains the game-input
//! queue. None of that machinery lives here — only the seams.

use std::{
    collections::HashMap,
    sync::{atomic::AtomicU64, Arc, Mutex},
    time::Duration,
};

use farcast_proto::{
    payloads::{Availability, ChannelState, ChatMessage, HousingLocation, PlayerData, PlayerList},
    InputChannel, ServerMessage,
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    backlog::BacklogHistory,
    kex::KeyPair,
    session,
    trust::{TrustPrompt, TrustStore},
};

/// How long queued shutdown notifications get before sessions are cut.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Server behavior knobs.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Whether unknown public keys may be presented to the trust prompt
    /// at all. When off, unknown clients are dropped right after the
    /// handshake.
    pub accept_new_clients: bool,
    /// How many messages the backlog history retains.
    pub backlog_capacity: usize,
    /// Whether battle-log channels are recorded and forwarded.
    pub forward_battle: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { accept_new_clients: true, backlog_capacity: 1000, forward_battle: false }
    }
}

/// What the server surfaces to the host process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// One game-command-sized piece of client chat input, sanitized and
    /// split, ready for the game's chat box.
    GameInput(String),
    /// A client asked for the friend roster; answer with
    /// [`ChatServer::send_player_list`].
    FriendListRequested {
        /// The requesting client.
        client: u64,
    },
    /// A client asked to switch the game's active input channel.
    ChannelChangeRequested(InputChannel),
    /// A client completed handshake and trust checks.
    ClientConnected {
        /// Registry id of the client.
        client: u64,
        /// Its public key.
        remote_public: [u8; 32],
    },
    /// A client session ended.
    ClientDisconnected {
        /// Registry id of the client.
        client: u64,
    },
}

/// One registered client session.
pub(crate) struct ClientEntry {
    pub(crate) queue: mpsc::UnboundedSender<ServerMessage>,
    pub(crate) prefs: Arc<Mutex<farcast_proto::payloads::Preferences>>,
    pub(crate) cancel: CancellationToken,
}

/// Character presence mirrored to connecting clients.
#[derive(Default)]
pub(crate) struct Presence {
    pub(crate) available: bool,
    pub(crate) player: Option<PlayerData>,
    pub(crate) housing: Option<HousingLocation>,
}

/// State shared between the server handle and its sessions.
pub(crate) struct ServerShared {
    pub(crate) keys: KeyPair,
    pub(crate) config: ServerConfig,
    pub(crate) trust: Arc<dyn TrustStore>,
    pub(crate) prompt: Arc<dyn TrustPrompt>,
    pub(crate) history: Mutex<BacklogHistory>,
    pub(crate) clients: Mutex<HashMap<u64, ClientEntry>>,
    pub(crate) next_client: AtomicU64,
    pub(crate) channel_state: Mutex<ChannelState>,
    pub(crate) presence: Mutex<Presence>,
    pub(crate) events: mpsc::UnboundedSender<ServerEvent>,
    pub(crate) cancel: CancellationToken,
}

/// The host-side chat server. Cheap to clone.
#[derive(Clone)]
pub struct ChatServer {
    shared: Arc<ServerShared>,
}

impl ChatServer {
    /// Build a server plus its host event stream.
    #[must_use]
    pub fn new(
        keys: KeyPair,
        config: ServerConfig,
        trust: Arc<dyn TrustStore>,
        prompt: Arc<dyn TrustPrompt>,
    ) -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(ServerShared {
            history: Mutex::new(BacklogHistory::new(config.backlog_capacity)),
            keys,
            config,
            trust,
            prompt,
            clients: Mutex::new(HashMap::new()),
            next_client: AtomicU64::new(1),
            channel_state: Mutex::new(ChannelState {
                channel: InputChannel::Say,
                name: "Say".to_owned(),
            }),
            presence: Mutex::new(Presence::default()),
            events: events_tx,
            cancel: CancellationToken::new(),
        });

        (Self { shared }, events_rx)
    }

    /// The server's public key, as advertised for pairing.
    #[must_use]
    pub fn public_key(&self) -> [u8; 32] {
        self.shared.keys.public_bytes()
    }

    /// Accept connections until [`ChatServer::shutdown`] runs.
    ///
    /// # Errors
    ///
    /// Returns the listener's I/O error if accepting fails.
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        loop {
            tokio::select! {
                () = self.shared.cancel.cancelled() => return Ok(()),
                accepted = listener.accept() => {
                    let (stream, addr) = accepted?;
                    debug!(%addr, "accepted connection");
                    tokio::spawn(session::run_session(Arc::clone(&self.shared), stream));
                }
            }
        }
    }

    /// Run a session over an externally established duplex stream (a
    /// relay tunnel). The magic preamble and handshake are still
    /// required.
    pub fn spawn_session<S>(&self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        tokio::spawn(session::run_session(Arc::clone(&self.shared), stream));
    }

    /// Record one chat message from the game: history plus broadcast.
    ///
    /// Battle-log channels are dropped unless configured on.
    pub fn record_message(&self, message: ChatMessage) {
        if !self.shared.config.forward_battle && message.channel.is_battle() {
            return;
        }

        self.shared.history.lock().expect("history lock poisoned").push(message.clone());
        self.broadcast(ServerMessage::Chat(message));
    }

    /// Queue a message for every connected client.
    pub fn broadcast(&self, message: ServerMessage) {
        let clients = self.shared.clients.lock().expect("client registry lock poisoned");
        for entry in clients.values() {
            let _ = entry.queue.send(message.clone());
        }
    }

    /// Queue a message for one client, if it is still connected.
    pub fn send_to(&self, client: u64, message: ServerMessage) {
        let clients = self.shared.clients.lock().expect("client registry lock poisoned");
        if let Some(entry) = clients.get(&client) {
            let _ = entry.queue.send(message);
        }
    }

    /// Answer a [`ServerEvent::FriendListRequested`].
    pub fn send_player_list(&self, client: u64, list: PlayerList) {
        self.send_to(client, ServerMessage::PlayerList(list));
    }

    /// Update availability and tell every client.
    pub fn set_availability(&self, available: bool) {
        self.shared.presence.lock().expect("presence lock poisoned").available = available;
        self.broadcast(ServerMessage::Availability(Availability { available }));
    }

    /// Update character data and tell every client. `None` while logged
    /// out.
    pub fn set_player_data(&self, player: Option<PlayerData>) {
        self.shared.presence.lock().expect("presence lock poisoned").player = player.clone();
        self.broadcast(ServerMessage::PlayerData(player));
    }

    /// Update the active input channel and tell every client, unless
    /// nothing changed.
    pub fn set_channel(&self, channel: InputChannel, name: impl Into<String>) {
        let state = ChannelState { channel, name: name.into() };
        {
            let mut current = self.shared.channel_state.lock().expect("channel lock poisoned");
            if *current == state {
                return;
            }
            *current = state.clone();
        }
        self.broadcast(ServerMessage::Channel(state));
    }

    /// Update the housing location and tell the clients that negotiated
    /// housing support.
    pub fn set_housing_location(&self, location: HousingLocation) {
        {
            let mut presence = self.shared.presence.lock().expect("presence lock poisoned");
            if presence.housing == Some(location) {
                return;
            }
            presence.housing = Some(location);
        }

        let clients = self.shared.clients.lock().expect("client registry lock poisoned");
        for entry in clients.values() {
            let wants_housing =
                entry.prefs.lock().expect("preferences lock poisoned").housing_location;
            if wants_housing {
                let _ = entry.queue.send(ServerMessage::HousingLocation(location));
            }
        }
    }

    /// Number of connected clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.shared.clients.lock().expect("client registry lock poisoned").len()
    }

    /// Cut one client session immediately.
    pub fn disconnect_client(&self, client: u64) {
        let clients = self.shared.clients.lock().expect("client registry lock poisoned");
        if let Some(entry) = clients.get(&client) {
            entry.cancel.cancel();
        }
    }

    /// Tell every client the server is going away, give the
    /// notifications a bounded grace period, then cut all sessions and
    /// the accept loop.
    pub async fn shutdown(&self) {
        debug!("server shutting down");
        {
            let clients = self.shared.clients.lock().expect("client registry lock poisoned");
            for entry in clients.values() {
                let _ = entry.queue.send(ServerMessage::Shutdown);
            }
        }

        tokio::time::sleep(SHUTDOWN_GRACE).await;
        self.shared.cancel.cancel();
    }
}
