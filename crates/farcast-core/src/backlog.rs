//! Backlog history, chunking, and ordered reassembly.
//!
//! A server keeps a bounded ring of recent chat messages. Responding to a
//! backlog or catch-up request means packing a possibly large message set
//! into frames that fit under the channel's size cap; the receiving side
//! must splice those frames back together without ever interleaving them
//! with live traffic or with another logical response.
//!
//! The contract that makes this work: every chunk of one logical response
//! carries the same sequence number, and a receiver pins one insertion
//! point per sequence number.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use farcast_proto::{
    payloads::{BacklogChunk, ChatMessage},
    ProtocolError,
};

use crate::channel::{HEADER_LEN, TAG_LEN};

/// Fixed per-frame cost budgeted when packing chunks: the frame header,
/// the authentication tag, the opcode byte, and slack for the chunk
/// envelope (sequence number and array framing).
const CHUNK_OVERHEAD: usize = HEADER_LEN + TAG_LEN + 1 + 16;

/// Ceiling for one packed chunk's serialized payload.
const CHUNK_BUDGET: usize = crate::channel::MAX_FRAME_LEN - CHUNK_OVERHEAD;

/// Bounded ring of recent chat messages.
///
/// Eviction is O(1) from the front once the capacity is reached.
pub struct BacklogHistory {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl BacklogHistory {
    /// Create a history retaining at most `capacity` messages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { messages: VecDeque::with_capacity(capacity.min(1024)), capacity }
    }

    /// Record a message, evicting the oldest beyond capacity.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
    }

    /// The most recent `amount` messages, newest first.
    #[must_use]
    pub fn most_recent(&self, amount: usize) -> Vec<ChatMessage> {
        self.messages.iter().rev().take(amount).cloned().collect()
    }

    /// All buffered messages strictly after `after`, oldest first.
    #[must_use]
    pub fn after(&self, after: DateTime<Utc>) -> Vec<ChatMessage> {
        self.messages.iter().filter(|msg| msg.timestamp > after).cloned().collect()
    }

    /// Number of buffered messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Pack `messages` into size-bounded chunks sharing one sequence number.
///
/// Messages are packed greedily in the given order; a chunk is flushed
/// when adding the next message would push its serialized size plus
/// framing overhead past the frame cap. The sequence number identifies
/// the logical request: the caller increments its per-connection counter
/// once per request, not once per chunk.
///
/// # Errors
///
/// Fails only if a message cannot be serialized for measurement.
pub fn chunk_backlog(
    messages: Vec<ChatMessage>,
    sequence: u32,
) -> Result<Vec<BacklogChunk>, ProtocolError> {
    let mut chunks = Vec::new();
    let mut current = Vec::new();
    let mut size = 0usize;

    for message in messages {
        let mut encoded = Vec::new();
        ciborium::ser::into_writer(&message, &mut encoded)
            .map_err(|e| ProtocolError::CborEncode(e.to_string()))?;
        let len = encoded.len();

        if !current.is_empty() && size + len >= CHUNK_BUDGET {
            chunks.push(BacklogChunk { sequence, messages: std::mem::take(&mut current) });
            size = 0;
        }

        size += len;
        current.push(message);
    }

    if !current.is_empty() {
        chunks.push(BacklogChunk { sequence, messages: current });
    }

    Ok(chunks)
}

/// Client-side reconstruction of chunked backlog responses into a single
/// ordered message list.
///
/// Chunks are expected newest-message-first within each chunk (the order
/// the engine negotiates); each chunk is reversed and spliced in at the
/// insertion point pinned when its sequence number was first seen. Live
/// messages appended between chunk arrivals land after the pinned point
/// and are never interleaved with the response.
#[derive(Default)]
pub struct BacklogReassembler {
    messages: Vec<ChatMessage>,
    last_sequence: Option<u32>,
    insert_at: usize,
}

impl BacklogReassembler {
    /// Create an empty reassembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a live message at the end of the list.
    pub fn push_live(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Splice in one backlog chunk (newest message first).
    ///
    /// A sequence number different from the previous chunk's starts a new
    /// logical response and pins the current end of the list as its
    /// insertion point.
    pub fn insert_chunk(&mut self, chunk: BacklogChunk) {
        if self.last_sequence != Some(chunk.sequence) {
            self.last_sequence = Some(chunk.sequence);
            self.insert_at = self.messages.len();
        }

        // Later chunks of the same response are older and belong before
        // earlier ones, so the pin stays fixed and each splice shifts the
        // previously inserted chunks right.
        let mut incoming = chunk.messages;
        incoming.reverse();
        self.messages.splice(self.insert_at..self.insert_at, incoming);
    }

    /// The reconstructed, ordered message list.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Timestamp of the newest held message, for catch-up requests.
    #[must_use]
    pub fn newest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.messages.iter().map(|msg| msg.timestamp).max()
    }
}
