//! Execution progress stream decoding
//!
//! The executor answers `POST /api/execute` with a `text/event-stream` body in
//! which every event is one `data: <json>` line. Network reads do not respect
//! line boundaries, so [`FrameDecoder`] carries any unterminated tail over to
//! the next read and only ever parses lines whose `\n` has been seen.

use crate::error::{ProgressError, TransportError};
use bytes::Bytes;
use codeforge_types::ExecutionEvent;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use tracing::{debug, warn};

const DATA_MARKER: &str = "data:";

/// Longest line held back waiting for its terminator
pub const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

/// Incremental line decoder for the progress stream.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already searched for a terminator
    scanned: usize,
}

impl FrameDecoder {
    /// Feed one network read and drain every complete line it finishes.
    ///
    /// Results come back in wire order; a malformed line yields an `Err` in
    /// its position without hiding the events decoded before it. A line
    /// longer than [`MAX_FRAME_BYTES`] is discarded as malformed.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Result<ExecutionEvent, ProgressError>> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;

        while let Some(offset) = self.buffer[from..].iter().position(|byte| *byte == b'\n') {
            let newline = from + offset;
            if let Some(decoded) = decode_line(&self.buffer[start..newline]) {
                events.push(decoded);
            }
            start = newline + 1;
            from = start;
        }

        self.buffer.drain(..start);
        self.scanned = self.buffer.len();

        if self.buffer.len() > MAX_FRAME_BYTES {
            warn!(
                "Progress frame exceeds {} bytes without a terminator",
                MAX_FRAME_BYTES
            );
            events.push(Err(ProgressError::MalformedFrame(format!(
                "frame exceeds {} bytes",
                MAX_FRAME_BYTES
            ))));
            self.buffer.clear();
            self.scanned = 0;
        }

        events
    }

    /// Bytes held back waiting for a line terminator
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// End of stream: an unterminated tail is never parsed.
    pub fn finish(&mut self) -> usize {
        let dropped = self.buffer.len();
        if dropped > 0 {
            warn!("Discarding {} bytes of unterminated progress frame", dropped);
            self.buffer.clear();
        }
        self.scanned = 0;
        dropped
    }
}

/// Decode one complete line (terminator already removed).
///
/// Returns `None` for lines that carry no event: blank separators, other SSE
/// fields, comments and event types this client does not know.
fn decode_line(line: &[u8]) -> Option<Result<ExecutionEvent, ProgressError>> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let line = match std::str::from_utf8(line) {
        Ok(line) => line,
        Err(_) => return Some(Err(ProgressError::InvalidUtf8)),
    };

    let payload = line.strip_prefix(DATA_MARKER)?;
    let payload = payload.strip_prefix(' ').unwrap_or(payload).trim();
    if payload.is_empty() {
        return None;
    }

    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => return Some(Err(ProgressError::MalformedFrame(format!("{}: {}", e, payload)))),
    };

    let event_type = match value.get("type").and_then(Value::as_str) {
        Some(event_type) => event_type,
        None => {
            return Some(Err(ProgressError::MalformedFrame(format!(
                "missing event type: {}",
                payload
            ))))
        }
    };

    if !ExecutionEvent::KNOWN_TYPES.contains(&event_type) {
        debug!("Skipping unknown progress event type: {}", event_type);
        return None;
    }

    Some(
        serde_json::from_value(value)
            .map_err(|e| ProgressError::MalformedFrame(format!("{}: {}", e, payload))),
    )
}

/// Lazy, ordered sequence of execution events read from a response body.
///
/// The sequence is finite and not restartable. It ends when the body ends,
/// right after an `error` event, or right after the first decoding or
/// transport failure.
pub struct ProgressStreamReader<S> {
    stream: S,
    decoder: FrameDecoder,
    pending: VecDeque<Result<ExecutionEvent, ProgressError>>,
    finished: bool,
}

impl<S> ProgressStreamReader<S>
where
    S: Stream<Item = Result<Bytes, TransportError>> + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            decoder: FrameDecoder::default(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Next decoded event, suspending on the underlying body as needed
    pub async fn next_event(&mut self) -> Option<Result<ExecutionEvent, ProgressError>> {
        loop {
            if self.finished {
                return None;
            }

            if let Some(item) = self.pending.pop_front() {
                if matches!(item, Err(_) | Ok(ExecutionEvent::Error { .. })) {
                    self.finished = true;
                    self.pending.clear();
                }
                return Some(item);
            }

            match self.stream.next().await {
                Some(Ok(chunk)) => {
                    let decoded = self.decoder.feed(&chunk);
                    self.pending.extend(decoded);
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(ProgressError::Transport(e)));
                }
                None => {
                    self.decoder.finish();
                    self.finished = true;
                    return None;
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Adapt the reader into a `Stream`
    pub fn into_stream(self) -> impl Stream<Item = Result<ExecutionEvent, ProgressError>> {
        futures::stream::unfold(self, |mut reader| async move {
            reader.next_event().await.map(|event| (event, reader))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeforge_types::{ActionResult, ProgressStatus};
    use futures::stream;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes, TransportError>> + Unpin {
        let owned: Vec<Result<Bytes, TransportError>> = parts
            .iter()
            .map(|part| Ok(Bytes::from(part.to_string())))
            .collect();
        stream::iter(owned)
    }

    async fn collect<S>(mut reader: ProgressStreamReader<S>) -> Vec<Result<ExecutionEvent, ProgressError>>
    where
        S: Stream<Item = Result<Bytes, TransportError>> + Unpin,
    {
        let mut out = Vec::new();
        while let Some(event) = reader.next_event().await {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn test_line_split_across_reads_decodes_once() {
        let reader = ProgressStreamReader::new(chunks(&[
            "data: {\"type\":\"progress\",\"action_",
            "index\":0,\"status\":\"executing\"}\n\n",
        ]));

        let events = collect(reader).await;
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            Ok(ExecutionEvent::progress(0, ProgressStatus::Executing))
        );
    }

    #[test]
    fn test_split_right_before_terminator() {
        let mut decoder = FrameDecoder::default();
        assert!(decoder
            .feed(b"data: {\"type\":\"complete\",\"preview_url\":\"http://p\"}")
            .is_empty());
        assert!(decoder.buffered() > 0);

        let events = decoder.feed(b"\n");
        assert_eq!(
            events,
            vec![Ok(ExecutionEvent::Complete {
                preview_url: Some("http://p".to_string())
            })]
        );
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_line_fed_one_byte_at_a_time() {
        let line = b"data: {\"type\":\"progress\",\"action_index\":3,\"status\":\"waiting_for_server\"}\n";
        let mut decoder = FrameDecoder::default();
        let mut events = Vec::new();
        for (fed, byte) in line.iter().enumerate() {
            events.extend(decoder.feed(std::slice::from_ref(byte)));
            if fed + 1 < line.len() {
                assert_eq!(decoder.buffered(), fed + 1);
            }
        }

        assert_eq!(
            events,
            vec![Ok(ExecutionEvent::progress(3, ProgressStatus::WaitingForServer))]
        );
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_oversized_frame_is_rejected() {
        let mut decoder = FrameDecoder::default();
        assert!(decoder.feed(b"data: {\"type\":\"progress\",").is_empty());

        let filler = vec![b'x'; MAX_FRAME_BYTES];
        let events = decoder.feed(&filler);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(ProgressError::MalformedFrame(_))));
        assert_eq!(decoder.buffered(), 0);

        let events = decoder.feed(b"data: {\"type\":\"complete\",\"preview_url\":null}\n");
        assert_eq!(events, vec![Ok(ExecutionEvent::Complete { preview_url: None })]);
    }

    #[tokio::test]
    async fn test_many_events_in_one_read_keep_order() {
        let reader = ProgressStreamReader::new(chunks(&[concat!(
            "data: {\"type\":\"progress\",\"action_index\":0,\"status\":\"executing\"}\n\n",
            "data: {\"type\":\"progress\",\"action_index\":0,\"status\":\"completed\",\"result\":{\"status\":\"created\"}}\n\n",
            "data: {\"type\":\"progress\",\"action_index\":1,\"status\":\"waiting_for_server\"}\n\n",
        )]));

        let events: Vec<_> = collect(reader).await.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            events,
            vec![
                ExecutionEvent::progress(0, ProgressStatus::Executing),
                ExecutionEvent::completed(
                    0,
                    ActionResult {
                        status: "created".to_string(),
                        ..Default::default()
                    }
                ),
                ExecutionEvent::progress(1, ProgressStatus::WaitingForServer),
            ]
        );
    }

    #[tokio::test]
    async fn test_crlf_and_marker_without_space() {
        let reader = ProgressStreamReader::new(chunks(&[
            "data:{\"type\":\"error\",\"message\":\"sandbox died\"}\r\n\r\n",
        ]));
        let events = collect(reader).await;
        assert_eq!(
            events,
            vec![Ok(ExecutionEvent::Error {
                message: "sandbox died".to_string()
            })]
        );
    }

    #[tokio::test]
    async fn test_reading_stops_after_error_event() {
        let reader = ProgressStreamReader::new(chunks(&[
            "data: {\"type\":\"progress\",\"action_index\":0,\"status\":\"executing\"}\n\n",
            "data: {\"type\":\"error\",\"message\":\"boom\"}\n\ndata: {\"type\":\"progress\",\"action_index\":1,\"status\":\"executing\"}\n\n",
            "data: {\"type\":\"complete\",\"preview_url\":null}\n\n",
        ]));

        let events = collect(reader).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Ok(ExecutionEvent::Error { .. })));
    }

    #[tokio::test]
    async fn test_ignores_non_data_lines_and_unknown_types() {
        let reader = ProgressStreamReader::new(chunks(&[
            ": keep-alive\n",
            "event: progress\n",
            "data: {\"type\":\"heartbeat\"}\n\n",
            "data:\n",
            "data: {\"type\":\"complete\",\"preview_url\":\"http://sandbox/preview\"}\n\n",
        ]));
        let events = collect(reader).await;
        assert_eq!(
            events,
            vec![Ok(ExecutionEvent::Complete {
                preview_url: Some("http://sandbox/preview".to_string())
            })]
        );
    }

    #[tokio::test]
    async fn test_malformed_frame_surfaces_after_earlier_events() {
        let reader = ProgressStreamReader::new(chunks(&[
            "data: {\"type\":\"progress\",\"action_index\":0,\"status\":\"executing\"}\n\ndata: {not json}\n\n",
        ]));
        let events = collect(reader).await;
        assert_eq!(events.len(), 2);
        assert!(events[0].is_ok());
        assert!(matches!(events[1], Err(ProgressError::MalformedFrame(_))));
    }

    #[test]
    fn test_known_type_with_wrong_shape_is_malformed() {
        let mut decoder = FrameDecoder::default();
        let events = decoder.feed(b"data: {\"type\":\"progress\",\"status\":\"executing\"}\n");
        assert!(matches!(events.as_slice(), [Err(ProgressError::MalformedFrame(_))]));
    }

    #[tokio::test]
    async fn test_unterminated_tail_is_never_parsed() {
        let reader = ProgressStreamReader::new(chunks(&[
            "data: {\"type\":\"progress\",\"action_index\":0,\"status\":\"executing\"}\n\n",
            "data: {\"type\":\"complete\",\"preview_url\":\"http://late\"}",
        ]));
        let events = collect(reader).await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_multibyte_character_split_between_reads() {
        let line = "data: {\"type\":\"error\",\"message\":\"échec\"}\n".as_bytes();
        let split = line.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let parts: Vec<Result<Bytes, TransportError>> = vec![
            Ok(Bytes::copy_from_slice(&line[..split])),
            Ok(Bytes::copy_from_slice(&line[split..])),
        ];

        let events = collect(ProgressStreamReader::new(stream::iter(parts))).await;
        assert_eq!(
            events,
            vec![Ok(ExecutionEvent::Error {
                message: "échec".to_string()
            })]
        );
    }

    #[tokio::test]
    async fn test_transport_failure_mid_stream() {
        let parts: Vec<Result<Bytes, TransportError>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"type\":\"progress\",\"action_index\":0,\"status\":\"executing\"}\n\n",
            )),
            Err(TransportError::Connection("connection reset".to_string())),
            Ok(Bytes::from_static(b"data: {\"type\":\"complete\"}\n\n")),
        ];
        let mut reader = ProgressStreamReader::new(stream::iter(parts));

        assert!(matches!(reader.next_event().await, Some(Ok(_))));
        assert!(matches!(
            reader.next_event().await,
            Some(Err(ProgressError::Transport(_)))
        ));
        assert!(reader.next_event().await.is_none());
        assert!(reader.is_finished());
    }

    #[tokio::test]
    async fn test_into_stream_yields_same_sequence() {
        let reader = ProgressStreamReader::new(chunks(&[
            "data: {\"type\":\"progress\",\"action_index\":2,\"status\":\"executing\"}\n",
            "data: {\"type\":\"complete\",\"preview_url\":null}\n",
        ]));
        let events: Vec<_> = reader.into_stream().collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], Ok(ExecutionEvent::Complete { preview_url: None }));
    }
}
