//! Server-Sent Events decoding.
//!
//! Bytes are buffered until a full line is available so that chunk boundaries (including ones
//! inside a multi-byte character) never corrupt a payload.

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use futures::{Stream, StreamExt};
use log::{debug, warn};

use super::{ApiError, EventStream, StreamEvent};
use crate::models::log::LogLevel;
use crate::models::responses::WireEvent;

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns the `data` payload of every event completed by this chunk.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(payload) = self.process_line(&line) {
                events.push(payload);
            }
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            let payload = self.data.join("\n");
            self.data.clear();
            return Some(payload);
        }
        if line.starts_with(':') {
            // heartbeat
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }
}

/// Turn one `data` payload into an event. Undecodable payloads are logged and skipped.
pub fn decode_event(payload: &str) -> Option<StreamEvent> {
    let wire: WireEvent = match serde_json::from_str(payload) {
        Ok(wire) => wire,
        Err(e) => {
            warn!("[PHASE: stream] [STEP: decode] Skipping undecodable event: {}", e);
            return None;
        }
    };

    if wire.kind == "status" {
        return match wire.status {
            Some(status) => Some(StreamEvent::Status(status)),
            None => {
                debug!("[PHASE: stream] [STEP: decode] Status event without status field");
                None
            }
        };
    }

    Some(StreamEvent::Log {
        level: LogLevel::from_wire(&wire.kind),
        message: wire.message.unwrap_or_default(),
    })
}

struct DecodeState<S> {
    inner: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<StreamEvent>,
    finished: bool,
}

/// Adapt a byte stream (e.g. `reqwest::Response::bytes_stream`) into typed events. A transport
/// error is yielded once as `ApiError::Stream` and ends the stream.
pub fn decode_stream<S, B, E>(bytes: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        inner: Box::pin(bytes),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(event) = st.pending.pop_front() {
                return Some((Ok(event), st));
            }
            if st.finished {
                return None;
            }
            match st.inner.next().await {
                Some(Ok(chunk)) => {
                    for payload in st.decoder.feed(chunk.as_ref()) {
                        if let Some(event) = decode_event(&payload) {
                            st.pending.push_back(event);
                        }
                    }
                }
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(ApiError::Stream(e.to_string())), st));
                }
                None => st.finished = true,
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_split_across_chunks() {
        let mut d = SseDecoder::new();
        assert!(d.feed(b"data: {\"type\":\"sta").is_empty());
        assert!(d.feed(b"tus\",\"status\":\"running\"}\n").is_empty());
        let out = d.feed(b"\n");
        assert_eq!(out, vec![r#"{"type":"status","status":"running"}"#.to_string()]);
    }

    #[test]
    fn heartbeats_and_other_fields_are_ignored() {
        let mut d = SseDecoder::new();
        let out = d.feed(b": heartbeat\n\nevent: message\nid: 7\nretry: 1000\ndata: x\n\n");
        assert_eq!(out, vec!["x".to_string()]);
    }

    #[test]
    fn crlf_and_multiline_data() {
        let mut d = SseDecoder::new();
        let out = d.feed(b"data: one\r\ndata:two\r\n\r\n");
        assert_eq!(out, vec!["one\ntwo".to_string()]);
    }

    #[test]
    fn multibyte_character_split_between_chunks() {
        let mut d = SseDecoder::new();
        let text = "data: caf\u{e9}\n\n".as_bytes();
        let split = text.len() - 3;
        assert!(d.feed(&text[..split]).is_empty());
        assert_eq!(d.feed(&text[split..]), vec!["caf\u{e9}".to_string()]);
    }

    #[test]
    fn event_decoding() {
        assert_eq!(
            decode_event(r#"{"type":"status","status":"completed"}"#),
            Some(StreamEvent::Status("completed".into()))
        );
        assert_eq!(
            decode_event(r#"{"type":"warning","message":"slow relay"}"#),
            Some(StreamEvent::Log {
                level: LogLevel::Warning,
                message: "slow relay".into()
            })
        );
        assert_eq!(decode_event("not json"), None);
    }

    #[tokio::test]
    async fn stream_skips_garbage_and_surfaces_transport_error() {
        let chunks: Vec<Result<Vec<u8>, String>> = vec![
            Ok(b"data: {\"type\":\"info\",\"message\":\"hello\"}\n\n".to_vec()),
            Ok(b"data: garbage\n\n".to_vec()),
            Ok(b"data: {\"type\":\"status\",\"status\":\"failed\"}\n\n".to_vec()),
            Err("connection reset".to_string()),
        ];
        let events: Vec<_> = decode_stream(futures::stream::iter(chunks)).collect().await;
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[0],
            Ok(StreamEvent::Log {
                level: LogLevel::Info,
                message: "hello".into()
            })
        );
        assert_eq!(events[1], Ok(StreamEvent::Status("failed".into())));
        assert_eq!(
            events[2],
            Err(ApiError::Stream("connection reset".into()))
        );
    }
}
