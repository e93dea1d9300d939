//! Incremental decoder for `data:`-framed streaming bodies.
//!
//! Frames are newline-delimited. Only lines starting with `data:` matter; the
//! `[DONE]` sentinel and malformed JSON are skipped. What text a JSON payload
//! carries is decided by a vendor-supplied extractor.

use futures_util::{Stream, StreamExt};
use std::collections::VecDeque;
use std::time::Duration;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Turns a byte stream into a lazy stream of text deltas.
///
/// Bytes are buffered across chunk boundaries, so frames and multi-byte
/// characters may be split arbitrarily by the transport. A stream that closes
/// without a sentinel simply ends; an unterminated final line is still decoded.
/// Transport errors are passed through and end the stream.
pub fn text_deltas<S, B, E, F>(byte_stream: S, extract: F) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    F: Fn(&serde_json::Value) -> Option<String>,
{
    let state = DecoderState {
        stream: byte_stream,
        buffer: Vec::new(),
        ready: VecDeque::new(),
        closed: false,
        extract,
    };

    futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(delta) = state.ready.pop_front() {
                return Some((Ok(delta), state));
            }
            if state.closed {
                return None;
            }
            match state.stream.next().await {
                Some(Ok(chunk)) => state.push(chunk.as_ref()),
                Some(Err(e)) => {
                    state.closed = true;
                    state.buffer.clear();
                    return Some((Err(e), state));
                }
                None => {
                    state.closed = true;
                    state.flush();
                }
            }
        }
    })
}

/// Ends `stream` with `on_idle` when no item arrives within `idle` of the
/// previous one. The inner stream is dropped at that point, which aborts the
/// underlying transfer and discards anything partially read.
pub fn idle_timeout<S, T, E>(stream: S, idle: Duration, on_idle: E) -> impl Stream<Item = Result<T, E>>
where
    S: Stream<Item = Result<T, E>> + Unpin,
    E: Clone,
{
    futures_util::stream::unfold(Some(stream), move |state| {
        let on_idle = on_idle.clone();
        async move {
            let mut stream = state?;
            match tokio::time::timeout(idle, stream.next()).await {
                Ok(Some(item)) => Some((item, Some(stream))),
                Ok(None) => None,
                Err(_) => Some((Err(on_idle), None)),
            }
        }
    })
}

/// Drives `deltas` to completion, handing each fragment to `on_chunk` in
/// arrival order, and returns the concatenated text.
pub async fn accumulate<S, E>(deltas: S, mut on_chunk: impl FnMut(&str)) -> Result<String, E>
where
    S: Stream<Item = Result<String, E>>,
{
    let mut deltas = std::pin::pin!(deltas);
    let mut full = String::new();
    while let Some(delta) = deltas.next().await {
        let delta = delta?;
        on_chunk(&delta);
        full.push_str(&delta);
    }
    Ok(full)
}

/// `choices[0].delta.content`, as sent by OpenAI-compatible APIs.
pub fn openai_delta(v: &serde_json::Value) -> Option<String> {
    v.pointer("/choices/0/delta/content")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}

struct DecoderState<S, F> {
    stream: S,
    buffer: Vec<u8>,
    ready: VecDeque<String>,
    closed: bool,
    extract: F,
}

impl<S, F> DecoderState<S, F>
where
    F: Fn(&serde_json::Value) -> Option<String>,
{
    fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.decode_line(&line[..line.len() - 1]);
        }
    }

    fn flush(&mut self) {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.decode_line(&line);
        }
    }

    fn decode_line(&mut self, raw: &[u8]) {
        let line = String::from_utf8_lossy(raw);
        if let Some(delta) = parse_frame(line.trim_end_matches('\r'), &self.extract) {
            self.ready.push_back(delta);
        }
    }
}

fn parse_frame<F>(line: &str, extract: &F) -> Option<String>
where
    F: Fn(&serde_json::Value) -> Option<String>,
{
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();
    if payload.is_empty() || payload == DONE_SENTINEL {
        return None;
    }
    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            tracing::trace!(%e, "skipping malformed stream frame");
            return None;
        }
    };
    extract(&value).filter(|s| !s.is_empty())
}
