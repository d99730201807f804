//! Server-role client session.
//!
//! One task pair per accepted connection: a reader that decrypts,
//! decodes and dispatches incoming messages, and a writer that drains
//! the session's outgoing queue. Everything a session shares with the
//! rest of the server (history, presence, the host event stream) comes
//! in through [`ServerShared`].
//!
//! The accept path is deliberately quiet about failures: a connection
//! that never sends the preamble, fails the handshake, or is rejected at
//! the trust gate is dropped with a debug log and nothing else — port
//! scanners don't deserve protocol traffic.

use std::{
    sync::{atomic::Ordering, Arc, Mutex},
    time::Duration,
};

use farcast_proto::{
    payloads::{Availability, ChatMessage, Preferences},
    ClientMessage, PlayerListType, ProtocolError, ServerMessage,
};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    backlog::chunk_backlog,
    channel, chat_input, kex,
    server::{ClientEntry, ServerEvent, ServerShared},
    MAGIC,
};

/// How long a new connection gets to produce the protocol preamble.
const MAGIC_WINDOW: Duration = Duration::from_secs(5);

/// Drive one accepted connection to completion.
pub(crate) async fn run_session<S>(shared: Arc<ServerShared>, mut stream: S)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    // Preamble within the accept window, or silence.
    let mut magic = [0u8; MAGIC.len()];
    match tokio::time::timeout(MAGIC_WINDOW, stream.read_exact(&mut magic)).await {
        Ok(Ok(_)) => {}
        Ok(Err(err)) => {
            debug!(%err, "connection dropped before preamble");
            return;
        }
        Err(_) => {
            debug!("preamble window elapsed");
            return;
        }
    }
    if magic != MAGIC {
        debug!("bad preamble");
        return;
    }

    let handshake = match kex::server_handshake(&shared.keys, &mut stream).await {
        Ok(handshake) => handshake,
        Err(err) => {
            debug!(%err, "handshake failed");
            return;
        }
    };

    if !shared.trust.is_trusted(&handshake.remote_public) {
        if !shared.config.accept_new_clients {
            info!("dropping unknown client: new clients are not accepted");
            return;
        }
        if !shared.prompt.allow_unknown(&handshake.remote_public).await {
            info!("unknown client rejected at the trust prompt");
            return;
        }
        shared.trust.trust(handshake.remote_public);
    }

    let id = shared.next_client.fetch_add(1, Ordering::Relaxed);
    let (queue_tx, mut queue_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let prefs = Arc::new(Mutex::new(Preferences::default()));
    let cancel = shared.cancel.child_token();

    shared.clients.lock().expect("client registry lock poisoned").insert(
        id,
        ClientEntry {
            queue: queue_tx.clone(),
            prefs: Arc::clone(&prefs),
            cancel: cancel.clone(),
        },
    );
    let _ = shared
        .events
        .send(ServerEvent::ClientConnected { client: id, remote_public: handshake.remote_public });
    debug!(client = id, "session established");

    // Seed the new client with current state before any live traffic.
    {
        let channel_state =
            shared.channel_state.lock().expect("channel lock poisoned").clone();
        let _ = queue_tx.send(ServerMessage::Channel(channel_state));

        let presence = shared.presence.lock().expect("presence lock poisoned");
        let _ = queue_tx
            .send(ServerMessage::Availability(Availability { available: presence.available }));
        let _ = queue_tx.send(ServerMessage::PlayerData(presence.player.clone()));
    }

    let tx_key = handshake.keys.tx;
    let rx_key = handshake.keys.rx;
    let (read_half, mut write_half) = tokio::io::split(stream);

    // Sole reader; dispatches in place and enqueues responses. A fatal
    // receive error cancels the session so the writer ends too.
    let reader_shared = Arc::clone(&shared);
    let reader_prefs = Arc::clone(&prefs);
    let reader_cancel = cancel.clone();
    let reader = tokio::spawn(async move {
        let mut read_half = read_half;
        let mut backlog_sequence: u32 = 0;
        let mut auth_failures: u64 = 0;
        loop {
            tokio::select! {
                () = reader_cancel.cancelled() => break,
                result = channel::read_message(&mut read_half, &rx_key) => match result {
                    Ok(raw) => dispatch(
                        &reader_shared,
                        id,
                        &reader_prefs,
                        &queue_tx,
                        &reader_cancel,
                        &mut backlog_sequence,
                        &raw,
                    ),
                    Err(err) if !err.is_fatal() => {
                        auth_failures += 1;
                        debug!(auth_failures, "dropping frame that failed authentication");
                    }
                    Err(err) => {
                        debug!(%err, "receive failed");
                        break;
                    }
                },
            }
        }
        reader_cancel.cancel();
    });

    // Sole writer, draining the session queue one frame at a time.
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            maybe = queue_rx.recv() => {
                let Some(message) = maybe else { break };
                let body = match message.to_vec() {
                    Ok(body) => body,
                    Err(err) => {
                        warn!(%err, "dropping unencodable message");
                        continue;
                    }
                };
                if let Err(err) = channel::send_message(&mut write_half, &tx_key, &body).await {
                    debug!(%err, "send failed");
                    break;
                }
                if matches!(message, ServerMessage::Shutdown) {
                    break;
                }
            }
        }
    }

    cancel.cancel();
    let _ = reader.await;

    shared.clients.lock().expect("client registry lock poisoned").remove(&id);
    let _ = shared.events.send(ServerEvent::ClientDisconnected { client: id });
    debug!(client = id, "session ended");
}

/// Handle one decoded client message.
fn dispatch(
    shared: &Arc<ServerShared>,
    id: u64,
    prefs: &Arc<Mutex<Preferences>>,
    queue: &mpsc::UnboundedSender<ServerMessage>,
    cancel: &CancellationToken,
    backlog_sequence: &mut u32,
    raw: &[u8],
) {
    let message = match ClientMessage::decode(raw) {
        Ok(message) => message,
        Err(ProtocolError::UnknownOpcode(opcode)) => {
            debug!(opcode, "skipping message with unknown opcode");
            return;
        }
        Err(err) => {
            warn!(%err, "dropping undecodable message");
            return;
        }
    };

    match message {
        ClientMessage::Ping => {
            let _ = queue.send(ServerMessage::Pong);
        }
        ClientMessage::Chat(input) => {
            let sanitized = chat_input::sanitize(&input.content);
            for piece in chat_input::split_input(&sanitized) {
                let _ = shared.events.send(ServerEvent::GameInput(piece));
            }
        }
        ClientMessage::Shutdown => {
            debug!(client = id, "client requested shutdown");
            cancel.cancel();
        }
        ClientMessage::Backlog(request) => {
            let newest_first =
                prefs.lock().expect("preferences lock poisoned").backlog_newest_first;
            let mut messages = shared
                .history
                .lock()
                .expect("history lock poisoned")
                .most_recent(request.amount as usize);
            if !newest_first {
                messages.reverse();
            }
            send_chunks(queue, messages, backlog_sequence);
        }
        ClientMessage::CatchUp(request) => {
            // One-millisecond bias so the boundary message the client
            // already holds is not re-sent.
            let after = request.after + chrono::Duration::milliseconds(1);
            let newest_first =
                prefs.lock().expect("preferences lock poisoned").backlog_newest_first;
            let mut messages =
                shared.history.lock().expect("history lock poisoned").after(after);
            if newest_first {
                messages.reverse();
            }
            send_chunks(queue, messages, backlog_sequence);
        }
        ClientMessage::PlayerList(request) => {
            if request.list_type == PlayerListType::Friend {
                let _ = shared.events.send(ServerEvent::FriendListRequested { client: id });
            }
        }
        ClientMessage::LinkshellList => {}
        ClientMessage::Preferences(new_prefs) => {
            *prefs.lock().expect("preferences lock poisoned") = new_prefs;

            // A client that just negotiated housing support gets the
            // current location immediately.
            if new_prefs.housing_location {
                let housing = shared.presence.lock().expect("presence lock poisoned").housing;
                if let Some(location) = housing {
                    let _ = queue.send(ServerMessage::HousingLocation(location));
                }
            }
        }
        ClientMessage::Channel(select) => {
            let _ = shared.events.send(ServerEvent::ChannelChangeRequested(select.channel));
        }
    }
}

/// Chunk one logical backlog response and queue every chunk under a
/// freshly incremented sequence number.
fn send_chunks(
    queue: &mpsc::UnboundedSender<ServerMessage>,
    messages: Vec<ChatMessage>,
    sequence: &mut u32,
) {
    *sequence += 1;
    match chunk_backlog(messages, *sequence) {
        Ok(chunks) => {
            for chunk in chunks {
                let _ = queue.send(ServerMessage::Backlog(chunk));
            }
        }
        Err(err) => warn!(%err, "could not chunk backlog response"),
    }
}
