//! Client-role connection engine.
//!
//! Drives one connection to a chat server through its whole lifecycle:
//!
//! ```text
//! Connecting -> Handshaking -> TrustCheck
//!     -> (CatchingUp | RequestingBacklog | Skipped)
//!     -> Active -> Disconnecting -> Closed
//! ```
//!
//! The engine is transport-agnostic: the caller opens the duplex stream
//! (TCP, or a relay tunnel that looks like one) and hands it to
//! [`ConnectionEngine::run`]. Application code talks to the engine
//! through a [`ConnectionHandle`] for outgoing traffic and an event
//! channel for incoming traffic; there is no UI coupling in here.
//!
//! During the active phase a dedicated receive task is the only reader of
//! the stream and the engine loop is the only writer, so the stream needs
//! no lock. The loop is a fair `select!` over the decrypted-frame queue,
//! the outgoing queue, and cancellation; each is a FIFO and exactly one
//! is serviced per iteration.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use farcast_proto::{
    payloads::{
        BacklogChunk, BacklogRequest, CatchUpRequest, ChannelSelect, ChannelState, ChatInput,
        ChatMessage, HousingLocation, PlayerData, PlayerList, PlayerListRequest, Preferences,
    },
    ClientMessage, InputChannel, PlayerListType, ProtocolError, ServerMessage,
};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::{
    channel,
    error::{EngineError, HandshakeError},
    kex::{self, KeyPair},
    trust::{TrustPrompt, TrustStore},
    MAGIC,
};

/// How long a closing connection waits for the shutdown message to go
/// out before the transport is dropped regardless.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Lifecycle states of a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Opening the transport and writing the protocol preamble.
    Connecting,
    /// Exchanging public keys and deriving session keys.
    Handshaking,
    /// Waiting on the trust decision for an unknown remote key.
    TrustCheck,
    /// Requesting messages since the newest locally-held timestamp.
    CatchingUp,
    /// Requesting the most recent N messages.
    RequestingBacklog,
    /// Steady-state multiplexed traffic.
    Active,
    /// Best-effort shutdown notification under the grace period.
    Disconnecting,
    /// Terminal; socket closed, keys dropped.
    Closed,
}

/// What the engine surfaces to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// Handshake and trust check completed; traffic may flow.
    Connected {
        /// The server's public key.
        remote_public: [u8; 32],
    },
    /// A live chat message arrived.
    Message(ChatMessage),
    /// One chunk of a backlog or catch-up response arrived. Feed it to a
    /// [`crate::BacklogReassembler`].
    Backlog(BacklogChunk),
    /// The game's input availability changed.
    Availability(bool),
    /// Character data changed; `None` while logged out.
    PlayerData(Option<PlayerData>),
    /// The active input channel changed.
    Channel(ChannelState),
    /// A roster response arrived.
    PlayerList(PlayerList),
    /// The character's housing location changed.
    HousingLocation(HousingLocation),
    /// Terminal: the session ended (locally or remotely).
    Disconnected,
}

/// How the engine fills in history after connecting.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    /// Number of historical messages to request from a server we have no
    /// local history for. Zero skips the backlog phase.
    pub backlog_amount: u16,
    /// Timestamp of the newest locally-held message when reconnecting to
    /// the same host; takes precedence over `backlog_amount`.
    pub catch_up_after: Option<DateTime<Utc>>,
}

/// The application's grip on a running connection.
///
/// Cheap to clone; every producer shares the same FIFO outgoing queue.
#[derive(Clone)]
pub struct ConnectionHandle {
    outgoing: mpsc::UnboundedSender<ClientMessage>,
    cancel: CancellationToken,
}

impl ConnectionHandle {
    /// Queue an arbitrary protocol message.
    pub fn send(&self, message: ClientMessage) {
        let _ = self.outgoing.send(message);
    }

    /// Queue chat text for delivery to the game.
    pub fn send_chat(&self, content: impl Into<String>) {
        self.send(ClientMessage::Chat(ChatInput { content: content.into() }));
    }

    /// Queue a liveness probe.
    pub fn ping(&self) {
        self.send(ClientMessage::Ping);
    }

    /// Ask the server for the friend roster.
    pub fn request_friend_list(&self) {
        self.send(ClientMessage::PlayerList(PlayerListRequest {
            list_type: PlayerListType::Friend,
        }));
    }

    /// Ask the game to switch the active input channel.
    pub fn change_channel(&self, channel: InputChannel) {
        self.send(ClientMessage::Channel(ChannelSelect { channel }));
    }

    /// Request a graceful disconnect.
    ///
    /// The engine proceeds to the shutdown notification and closes; this
    /// never abandons the session without telling the peer when the
    /// transport still works.
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }
}

/// The client-role connection engine. See the module docs for the
/// lifecycle.
pub struct ConnectionEngine {
    config: EngineConfig,
    keys: KeyPair,
    trust: Arc<dyn TrustStore>,
    prompt: Arc<dyn TrustPrompt>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    outgoing: mpsc::UnboundedReceiver<ClientMessage>,
    cancel: CancellationToken,
}

impl ConnectionEngine {
    /// Build an engine plus its handle and event stream.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        keys: KeyPair,
        trust: Arc<dyn TrustStore>,
        prompt: Arc<dyn TrustPrompt>,
    ) -> (Self, ConnectionHandle, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let handle = ConnectionHandle { outgoing: outgoing_tx, cancel: cancel.clone() };
        let engine = Self {
            config,
            keys,
            trust,
            prompt,
            events: events_tx,
            outgoing: outgoing_rx,
            cancel,
        };

        (engine, handle, events_rx)
    }

    /// Drive one connection over `stream` to completion.
    ///
    /// Returns when the session ends. Fatal failures before the active
    /// phase surface as errors without internal retries; once active,
    /// fatal transport errors are logged, the bounded-grace shutdown
    /// notification is attempted, and the call returns `Ok`.
    ///
    /// # Errors
    ///
    /// [`EngineError::Handshake`] / [`EngineError::Channel`] /
    /// [`EngineError::Protocol`] for pre-active failures,
    /// [`EngineError::Rejected`] when the trust prompt declines the
    /// remote key.
    pub async fn run<S>(self, mut stream: S) -> Result<(), EngineError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let Self { config, keys, trust, prompt, events, mut outgoing, cancel } = self;

        debug!(state = ?ConnectionState::Connecting, "opening session");
        stream.write_all(&MAGIC).await.map_err(HandshakeError::Io)?;
        stream.flush().await.map_err(HandshakeError::Io)?;

        debug!(state = ?ConnectionState::Handshaking, "exchanging keys");
        let handshake = kex::client_handshake(&keys, &mut stream).await?;

        debug!(state = ?ConnectionState::TrustCheck, "checking remote key");
        if !trust.is_trusted(&handshake.remote_public) {
            if !prompt.allow_unknown(&handshake.remote_public).await {
                debug!("remote key rejected; closing without traffic");
                let _ = events.send(ConnectionEvent::Disconnected);
                return Err(EngineError::Rejected);
            }
            trust.trust(handshake.remote_public);
        }

        let tx_key = handshake.keys.tx;
        let rx_key = handshake.keys.rx;

        // Preference exchange, then the history decision: catch-up beats
        // backlog, and a zero amount skips the phase entirely.
        let preferences = ClientMessage::Preferences(Preferences {
            backlog_newest_first: true,
            housing_location: true,
        });
        channel::send_message(&mut stream, &tx_key, &preferences.to_vec()?).await?;

        if let Some(after) = config.catch_up_after {
            debug!(state = ?ConnectionState::CatchingUp, %after, "requesting catch-up");
            let request = ClientMessage::CatchUp(CatchUpRequest { after });
            channel::send_message(&mut stream, &tx_key, &request.to_vec()?).await?;
        } else if config.backlog_amount > 0 {
            debug!(
                state = ?ConnectionState::RequestingBacklog,
                amount = config.backlog_amount,
                "requesting backlog",
            );
            let request = ClientMessage::Backlog(BacklogRequest { amount: config.backlog_amount });
            channel::send_message(&mut stream, &tx_key, &request.to_vec()?).await?;
        }

        let _ = events.send(ConnectionEvent::Connected { remote_public: handshake.remote_public });

        debug!(state = ?ConnectionState::Active, "session active");
        let (read_half, mut write_half) = tokio::io::split(stream);
        let (frames_tx, mut frames) = mpsc::unbounded_channel::<Vec<u8>>();

        // Sole reader of the stream. Authentication failures are noise
        // (stray traffic probing the port) and must not end the session;
        // anything else fatal ends the reader, which the main loop
        // observes as a closed frame queue.
        let reader_cancel = cancel.clone();
        let reader = tokio::spawn(async move {
            let mut read_half = read_half;
            let mut auth_failures: u64 = 0;
            loop {
                tokio::select! {
                    () = reader_cancel.cancelled() => break,
                    result = channel::read_message(&mut read_half, &rx_key) => match result {
                        Ok(frame) => {
                            if frames_tx.send(frame).is_err() {
                                break;
                            }
                        }
                        Err(err) if !err.is_fatal() => {
                            auth_failures += 1;
                            debug!(auth_failures, "dropping frame that failed authentication");
                        }
                        Err(err) => {
                            error!(%err, "receive failed");
                            break;
                        }
                    },
                }
            }
        });

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("cancellation requested");
                    break;
                }
                maybe_frame = frames.recv() => {
                    let Some(raw) = maybe_frame else {
                        debug!("receive loop ended");
                        break;
                    };
                    match ServerMessage::decode(&raw) {
                        Ok(ServerMessage::Shutdown) => {
                            debug!("server shut the session down");
                            break;
                        }
                        Ok(message) => dispatch(&events, message),
                        Err(ProtocolError::UnknownOpcode(opcode)) => {
                            debug!(opcode, "skipping message with unknown opcode");
                        }
                        Err(err) => warn!(%err, "dropping undecodable message"),
                    }
                }
                maybe_outgoing = outgoing.recv() => {
                    let Some(message) = maybe_outgoing else {
                        debug!("all handles dropped");
                        break;
                    };
                    let body = match message.to_vec() {
                        Ok(body) => body,
                        Err(err) => {
                            warn!(%err, "dropping unencodable outgoing message");
                            continue;
                        }
                    };
                    if let Err(err) = channel::send_message(&mut write_half, &tx_key, &body).await {
                        error!(%err, "send failed");
                        break;
                    }
                }
            }
        }

        debug!(state = ?ConnectionState::Disconnecting, "notifying peer");
        cancel.cancel();

        if let Ok(shutdown) = ClientMessage::Shutdown.to_vec() {
            let notify = channel::send_message(&mut write_half, &tx_key, &shutdown);
            if tokio::time::timeout(SHUTDOWN_GRACE, notify).await.is_err() {
                debug!("shutdown notification timed out");
            }
        }

        let _ = reader.await;
        let _ = events.send(ConnectionEvent::Disconnected);
        debug!(state = ?ConnectionState::Closed, "session closed");

        Ok(())
    }
}

/// Forward one decoded server message to the application.
fn dispatch(events: &mpsc::UnboundedSender<ConnectionEvent>, message: ServerMessage) {
    let event = match message {
        ServerMessage::Pong => return,
        ServerMessage::Chat(message) => ConnectionEvent::Message(message),
        ServerMessage::PlayerData(player) => ConnectionEvent::PlayerData(player),
        ServerMessage::Availability(availability) => {
            ConnectionEvent::Availability(availability.available)
        }
        ServerMessage::Channel(state) => ConnectionEvent::Channel(state),
        ServerMessage::Backlog(chunk) => ConnectionEvent::Backlog(chunk),
        ServerMessage::PlayerList(list) => ConnectionEvent::PlayerList(list),
        ServerMessage::HousingLocation(location) => ConnectionEvent::HousingLocation(location),
        // Shutdown is intercepted by the loop; the reserved opcode has no
        // application meaning.
        ServerMessage::Shutdown | ServerMessage::LinkshellList => return,
    };

    let _ = events.send(event);
}
