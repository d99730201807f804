//! Backlog chunking and reconstruction across frame-size limits.
//!
//! The binding property: a logical backlog response split across several
//! frames reassembles contiguously and in order on the receiving side,
//! even when live messages arrive between chunks.

use chrono::{TimeZone, Utc};
use farcast_core::{chunk_backlog, BacklogHistory, BacklogReassembler, MAX_FRAME_LEN};
use farcast_proto::{payloads::ChatMessage, ChatType, ServerMessage};

const BASE_MS: i64 = 1_700_000_000_000;

/// A message sized so that 250 of them need exactly three frames.
fn bulky_message(n: i64) -> ChatMessage {
    ChatMessage {
        timestamp: Utc.timestamp_millis_opt(BASE_MS + n).unwrap(),
        channel: ChatType::Say,
        sender: b"Sender".to_vec(),
        content: vec![1u8; 1230],
        chunks: Vec::new(),
    }
}

fn small_message(n: i64) -> ChatMessage {
    ChatMessage {
        timestamp: Utc.timestamp_millis_opt(BASE_MS + n).unwrap(),
        channel: ChatType::Say,
        sender: b"Sender".to_vec(),
        content: format!("live {n}").into_bytes(),
        chunks: Vec::new(),
    }
}

fn offsets(messages: &[ChatMessage]) -> Vec<i64> {
    messages.iter().map(|m| m.timestamp.timestamp_millis() - BASE_MS).collect()
}

#[test]
fn two_hundred_fifty_messages_reassemble_across_three_chunks() {
    // Server side: history in chronological order, response requested
    // newest first (the order the client negotiates).
    let mut history = BacklogHistory::new(500);
    for n in 0..250 {
        history.push(bulky_message(n));
    }
    let newest_first = history.most_recent(250);
    assert_eq!(newest_first.len(), 250);

    let chunks = chunk_backlog(newest_first, 1).unwrap();
    assert_eq!(chunks.len(), 3, "250 bulky messages must need exactly three frames");
    assert!(chunks.iter().all(|chunk| chunk.sequence == 1));

    // Every chunk must actually fit in a frame once wrapped in a message.
    for chunk in &chunks {
        let encoded = ServerMessage::Backlog(chunk.clone()).to_vec().unwrap();
        assert!(
            encoded.len() + 16 <= MAX_FRAME_LEN,
            "chunk of {} bytes cannot be sealed under the frame cap",
            encoded.len()
        );
    }

    // Client side: a live message already exists, another fires between
    // chunk arrivals; the response must stay contiguous and ordered.
    let mut reassembler = BacklogReassembler::new();
    reassembler.push_live(small_message(900));

    let mut chunks = chunks.into_iter();
    reassembler.insert_chunk(chunks.next().unwrap());
    reassembler.push_live(small_message(901));
    for chunk in chunks {
        reassembler.insert_chunk(chunk);
    }

    let got = offsets(reassembler.messages());
    let mut expected = vec![900];
    expected.extend(0..250);
    expected.push(901);
    assert_eq!(got, expected);
}

#[test]
fn catch_up_uses_the_millisecond_bias() {
    let mut history = BacklogHistory::new(100);
    for n in 0..10 {
        history.push(small_message(n));
    }

    // The client holds everything through n=4; the +1 ms bias on the
    // server keeps the boundary message from being re-sent.
    let boundary = Utc.timestamp_millis_opt(BASE_MS + 4).unwrap();
    let after = boundary + chrono::Duration::milliseconds(1);

    assert_eq!(offsets(&history.after(after)), vec![6, 7, 8, 9]);
}

#[test]
fn empty_response_produces_no_chunks() {
    let chunks = chunk_backlog(Vec::new(), 5).unwrap();
    assert!(chunks.is_empty());
}

#[test]
fn sequences_separate_logical_responses() {
    let first = chunk_backlog(vec![bulky_message(0)], 1).unwrap();
    let second = chunk_backlog(vec![bulky_message(1)], 2).unwrap();

    let mut reassembler = BacklogReassembler::new();
    reassembler.insert_chunk(first.into_iter().next().unwrap());
    reassembler.push_live(small_message(800));
    reassembler.insert_chunk(second.into_iter().next().unwrap());

    assert_eq!(offsets(reassembler.messages()), vec![0, 800, 1]);
}
