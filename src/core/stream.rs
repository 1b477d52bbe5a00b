use std::fmt;

use futures_util::{Stream, StreamExt};
use memchr::memchr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::api::{GenerateRequest, StreamChunk};

/// Marker that makes a response line significant. Everything else that is
/// not blank is reported as malformed rather than silently dropped.
const DATA_PREFIX: &str = "data: ";

/// Capacity of the worker-to-UI event channel. Bounded so a stalled UI
/// task applies backpressure to the network read instead of buffering the
/// whole response.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// A fragment of generated text, in arrival order.
    Token(String),
    /// A non-blank line the parser could not decode. Recoverable; the
    /// stream continues.
    Malformed(String),
    /// Transport ended without error.
    Done,
    /// Transport-level fault: connection reset, DNS failure, non-2xx
    /// status. Terminates the generation.
    NetworkError(String),
}

/// Decode one line of the response stream.
///
/// Blank lines and decodable records without a `token` field produce
/// nothing. A missing `data: ` prefix or an undecodable payload yields
/// [`StreamEvent::Malformed`] carrying the raw line; one bad line never
/// aborts the stream.
pub fn parse_stream_line(line: &str) -> Option<StreamEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Some(StreamEvent::Malformed(line.to_string()));
    };

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(StreamChunk { token: Some(token) }) => Some(StreamEvent::Token(token)),
        Ok(StreamChunk { token: None }) => {
            tracing::debug!(payload, "stream record without token field");
            None
        }
        Err(_) => Some(StreamEvent::Malformed(line.to_string())),
    }
}

/// Everything a generation task needs. Built by the caller so the service
/// itself stays free of config and credential concerns.
pub struct GenerationParams {
    pub client: reqwest::Client,
    pub endpoint: String,
    pub api_key: String,
    pub request: GenerateRequest,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

/// Spawns one cancellable generation task at a time and feeds its events
/// into a channel the UI task drains on its own schedule. Events carry the
/// stream id they belong to so a consumer can discard stragglers from a
/// superseded generation.
#[derive(Clone)]
pub struct GenerationService {
    tx: mpsc::Sender<(StreamEvent, u64)>,
}

impl GenerationService {
    pub fn new() -> (Self, mpsc::Receiver<(StreamEvent, u64)>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (Self { tx }, rx)
    }

    pub fn spawn_generation(&self, params: GenerationParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let GenerationParams {
                client,
                endpoint,
                api_key,
                request,
                cancel_token,
                stream_id,
            } = params;

            tracing::debug!(stream_id, model = %request.model, "generation task started");

            tokio::select! {
                _ = run_generation(&client, &endpoint, &api_key, &request, &tx, &cancel_token, stream_id) => {}
                _ = cancel_token.cancelled() => {
                    tracing::debug!(stream_id, "generation cancelled");
                }
            }
        });
    }
}

async fn run_generation(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &str,
    request: &GenerateRequest,
    tx: &mpsc::Sender<(StreamEvent, u64)>,
    cancel_token: &CancellationToken,
    stream_id: u64,
) {
    let response = client
        .post(endpoint)
        .header("Authorization", format!("Bearer {api_key}"))
        .header("Content-Type", "application/json")
        .json(request)
        .send()
        .await;

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            if !cancel_token.is_cancelled() {
                let _ = tx.send((StreamEvent::NetworkError(e.to_string()), stream_id)).await;
            }
            return;
        }
    };

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        if !cancel_token.is_cancelled() {
            let _ = tx
                .send((
                    StreamEvent::NetworkError(format!(
                        "API request failed with status {status}: {body}"
                    )),
                    stream_id,
                ))
                .await;
        }
        return;
    }

    pump_lines(response.bytes_stream(), tx, cancel_token, stream_id).await;
}

/// Drive the chunked response body to completion, splitting it into lines
/// and emitting one event per significant line.
///
/// The cancellation token is checked once per buffered line; a fault or an
/// end-of-stream observed after cancellation emits nothing. Generic over
/// the chunk stream so tests can feed it synthetic transports.
pub(crate) async fn pump_lines<S, B, E>(
    mut stream: S,
    tx: &mpsc::Sender<(StreamEvent, u64)>,
    cancel_token: &CancellationToken,
    stream_id: u64,
) where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk_bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                // A fault after the user asked to stop is not news.
                if !cancel_token.is_cancelled() {
                    let _ = tx.send((StreamEvent::NetworkError(e.to_string()), stream_id)).await;
                }
                return;
            }
        };

        buffer.extend_from_slice(chunk_bytes.as_ref());

        while let Some(newline_pos) = memchr(b'\n', &buffer) {
            if cancel_token.is_cancelled() {
                return;
            }

            match std::str::from_utf8(&buffer[..newline_pos]) {
                Ok(line) => {
                    if let Some(event) = parse_stream_line(line) {
                        let _ = tx.send((event, stream_id)).await;
                    }
                }
                Err(e) => {
                    tracing::debug!(stream_id, error = %e, "skipping non-UTF-8 stream line");
                }
            }
            buffer.drain(..=newline_pos);
        }
    }

    if !cancel_token.is_cancelled() {
        let _ = tx.send((StreamEvent::Done, stream_id)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn collect_events(rx: &mut mpsc::Receiver<(StreamEvent, u64)>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Ok((event, _)) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn ok_chunks(chunks: &[&str]) -> Vec<Result<Vec<u8>, io::Error>> {
        chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect()
    }

    #[test]
    fn line_without_prefix_is_malformed_never_token() {
        assert_eq!(
            parse_stream_line("not-data-prefixed"),
            Some(StreamEvent::Malformed("not-data-prefixed".to_string()))
        );
    }

    #[test]
    fn blank_lines_produce_nothing() {
        assert_eq!(parse_stream_line(""), None);
        assert_eq!(parse_stream_line("   "), None);
        assert_eq!(parse_stream_line("\r"), None);
    }

    #[test]
    fn token_lines_decode_in_order() {
        let lines = [
            r#"data: {"token":"Hel"}"#,
            r#"data: {"token":"lo"}"#,
            r#"data: {"token":" world"}"#,
        ];
        let events: Vec<_> = lines.iter().filter_map(|l| parse_stream_line(l)).collect();
        assert_eq!(
            events,
            vec![
                StreamEvent::Token("Hel".to_string()),
                StreamEvent::Token("lo".to_string()),
                StreamEvent::Token(" world".to_string()),
            ]
        );
    }

    #[test]
    fn record_without_token_field_is_a_no_op() {
        assert_eq!(parse_stream_line(r#"data: {"finish_reason":"stop"}"#), None);
    }

    #[test]
    fn undecodable_payload_is_malformed_with_raw_line() {
        assert_eq!(
            parse_stream_line(r#"data: {"bad json"#),
            Some(StreamEvent::Malformed(r#"data: {"bad json"#.to_string()))
        );
    }

    #[tokio::test]
    async fn pump_emits_tokens_then_done() {
        let (tx, mut rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        let chunks = futures_util::stream::iter(ok_chunks(&[
            "data: {\"token\":\"Hel\"}\n",
            "data: {\"token\":\"lo\"}\n",
            "\n",
        ]));

        pump_lines(chunks, &tx, &cancel, 1).await;

        assert_eq!(
            collect_events(&mut rx),
            vec![
                StreamEvent::Token("Hel".to_string()),
                StreamEvent::Token("lo".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn pump_reassembles_lines_split_across_chunks() {
        let (tx, mut rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        let chunks = futures_util::stream::iter(ok_chunks(&[
            "data: {\"tok",
            "en\":\"Hel\"}\ndata: {\"token\":",
            "\"lo\"}\n",
        ]));

        pump_lines(chunks, &tx, &cancel, 1).await;

        assert_eq!(
            collect_events(&mut rx),
            vec![
                StreamEvent::Token("Hel".to_string()),
                StreamEvent::Token("lo".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn pump_survives_malformed_lines() {
        let (tx, mut rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        let chunks = futures_util::stream::iter(ok_chunks(&[
            "not-data-prefixed\n",
            "data: {\"bad json\n",
            "data: {\"token\":\"still going\"}\n",
        ]));

        pump_lines(chunks, &tx, &cancel, 1).await;

        assert_eq!(
            collect_events(&mut rx),
            vec![
                StreamEvent::Malformed("not-data-prefixed".to_string()),
                StreamEvent::Malformed("data: {\"bad json".to_string()),
                StreamEvent::Token("still going".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn pump_reports_transport_fault_without_done() {
        let (tx, mut rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        let chunks = futures_util::stream::iter(vec![
            Ok("data: {\"token\":\"Hel\"}\n".as_bytes().to_vec()),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
        ]);

        pump_lines(chunks, &tx, &cancel, 1).await;

        let events = collect_events(&mut rx);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], StreamEvent::Token("Hel".to_string()));
        match &events[1] {
            StreamEvent::NetworkError(msg) => assert!(msg.contains("connection reset")),
            other => panic!("expected network error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancel_before_first_line_emits_nothing() {
        let (tx, mut rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let chunks = futures_util::stream::iter(ok_chunks(&["data: {\"token\":\"Hel\"}\n"]));

        pump_lines(chunks, &tx, &cancel, 1).await;

        assert!(collect_events(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn cancel_mid_stream_stops_at_observation_point() {
        let (tx, mut rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        let cancel_in_stream = cancel.clone();

        let chunks = futures_util::stream::unfold(0u32, move |state| {
            let cancel = cancel_in_stream.clone();
            async move {
                match state {
                    0 => Some((
                        Ok::<_, io::Error>("data: {\"token\":\"Hel\"}\n".as_bytes().to_vec()),
                        1,
                    )),
                    1 => {
                        cancel.cancel();
                        Some((Ok("data: {\"token\":\"lo\"}\n".as_bytes().to_vec()), 2))
                    }
                    _ => None,
                }
            }
        })
        .boxed();

        pump_lines(chunks, &tx, &cancel, 1).await;

        // Only the token parsed before cancellation was observed; no Done.
        assert_eq!(
            collect_events(&mut rx),
            vec![StreamEvent::Token("Hel".to_string())]
        );
    }

    #[tokio::test]
    async fn cancelled_transport_fault_is_suppressed() {
        let (tx, mut rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let chunks = futures_util::stream::iter(vec![Err::<Vec<u8>, _>(io::Error::other(
            "dns failure",
        ))]);

        pump_lines(chunks, &tx, &cancel, 1).await;

        assert!(collect_events(&mut rx).is_empty());
    }
}
