//! # WebSocket Capture Handler
//!
//! Accepts one inbound audio stream per WebSocket connection. The client
//! declares its format as query parameters on the upgrade request, then sends
//! binary audio frames at real-time cadence and finishes with a
//! `{"type": "CloseStream"}` control frame.
//!
//! ## WebSocket Protocol:
//! 1. **Connection**: format parameters travel as query parameters
//!    (`encoding`, `sample_rate`, `channels`)
//! 2. **Acknowledgment**: the server answers with two informational status
//!    frames (connection opened + expected format)
//! 3. **Audio streaming**: every non-control frame is appended verbatim to
//!    the session buffer; each append is acknowledged with a byte-count
//!    status frame, and a warning frame is sent whenever the stream runs
//!    faster than real time
//! 4. **Termination**: `CloseStream` flushes the buffer to storage and the
//!    server reports the artifact location and total byte count before
//!    closing normally; any other decodable control frame closes the
//!    connection with an abnormal code and nothing is flushed
//!
//! ## Actor Model:
//! Each connection is an independent Actix actor that exclusively owns its
//! [`CaptureSession`]. The actor mailbox processes frames in strict arrival
//! order, which is what makes the accumulated buffer's byte order
//! authoritative.

use crate::audio::encoding::{AudioEncoding, StreamParams};
use crate::audio::session::CaptureSession;
use crate::protocol::{classify_frame, ControlMessage, FrameKind, StatusMessage};
use crate::state::AppState;
use crate::storage;

use actix::prelude::*;
use actix_web::{web, HttpRequest, HttpResponse, Result as ActixResult};
use actix_web_actors::ws;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Close description sent when a connection violates the protocol.
const INVALID_FRAME_CLOSE: &str = "Invalid frame sent";

/// WebSocket actor for one inbound capture stream.
pub struct CaptureSocket {
    /// Per-connection accumulation state, exclusively owned by this actor
    session: CaptureSession,

    /// Shared configuration and metrics
    app_state: web::Data<AppState>,

    /// Heartbeat bookkeeping
    heartbeat_interval: Duration,
    client_timeout: Duration,
    last_heartbeat: Instant,

    /// Set once the stream has been flushed; distinguishes a graceful stop
    /// from an abrupt disconnect in `stopped()`
    finished: bool,
}

impl CaptureSocket {
    pub fn new(params: StreamParams, app_state: web::Data<AppState>) -> Self {
        let stream_config = app_state.get_config().stream;
        Self {
            session: CaptureSession::new(params),
            app_state,
            heartbeat_interval: Duration::from_secs(stream_config.heartbeat_interval_secs),
            client_timeout: Duration::from_secs(stream_config.client_timeout_secs),
            last_heartbeat: Instant::now(),
            finished: false,
        }
    }

    /// Log a message and mirror it to the client as a `{"msg": …}` frame.
    fn notify(&self, ctx: &mut ws::WebsocketContext<Self>, message: String) {
        info!("{}", message);
        self.send_status(ctx, StatusMessage::Info { msg: message });
    }

    fn send_status(&self, ctx: &mut ws::WebsocketContext<Self>, status: StatusMessage) {
        match serde_json::to_string(&status) {
            Ok(json) => ctx.text(json),
            Err(err) => error!("failed to serialize status frame: {}", err),
        }
    }

    /// Classify and dispatch one inbound frame, text and binary alike.
    ///
    /// Classification is independent per frame and needs no session history;
    /// the transport delivers whole frames only.
    fn handle_frame(&mut self, payload: &[u8], ctx: &mut ws::WebsocketContext<Self>) {
        match classify_frame(payload) {
            Ok(FrameKind::Control(ControlMessage::CloseStream)) => self.finish_stream(ctx),
            Ok(FrameKind::Audio) => self.append_audio(payload, ctx),
            Err(err) => {
                warn!("closing connection: {}", err);
                self.app_state.record_protocol_violation();
                ctx.close(Some(ws::CloseReason {
                    code: ws::CloseCode::Error,
                    description: Some(INVALID_FRAME_CLOSE.to_string()),
                }));
                ctx.stop();
            }
        }
    }

    /// Accumulate one binary audio frame and run the rate check.
    fn append_audio(&mut self, data: &[u8], ctx: &mut ws::WebsocketContext<Self>) {
        let total = self.session.append(data);
        self.app_state.record_bytes_received(data.len() as u64);

        if self.session.is_faster_than_realtime(self.session.elapsed()) {
            self.notify(
                ctx,
                "Warning: stream may be faster than real time!".to_string(),
            );
        }

        self.notify(ctx, format!("Received {} bytes of data", total));
    }

    /// The termination protocol: flush, acknowledge, close normally.
    ///
    /// An empty buffer is still flushed; an empty artifact is valid. On a
    /// flush failure the connection closes without the acknowledgment
    /// round-trip.
    fn finish_stream(&mut self, ctx: &mut ws::WebsocketContext<Self>) {
        self.finished = true;
        let data = self.session.take_buffer();
        let data_dir = self.app_state.get_config().storage.data_dir;

        match storage::write_raw(Path::new(&data_dir), "", &data) {
            Ok(saved) => {
                self.app_state.record_stream_persisted();
                let filename = saved.path.display().to_string();
                info!(
                    filename = %filename,
                    total_bytes = saved.total_bytes,
                    "stream flushed to storage"
                );
                self.send_status(ctx, StatusMessage::Stored { filename });
                self.send_status(
                    ctx,
                    StatusMessage::TotalBytes {
                        total_bytes: saved.total_bytes,
                    },
                );
                ctx.close(Some(ws::CloseReason {
                    code: ws::CloseCode::Normal,
                    description: None,
                }));
            }
            Err(err) => {
                error!("failed to persist capture: {}", err);
                ctx.close(Some(ws::CloseReason {
                    code: ws::CloseCode::Error,
                    description: Some("capture flush failed".to_string()),
                }));
            }
        }

        ctx.stop();
    }
}

impl Actor for CaptureSocket {
    type Context = ws::WebsocketContext<Self>;

    /// Called when the WebSocket connection starts.
    fn started(&mut self, ctx: &mut Self::Context) {
        self.app_state.session_opened();

        self.notify(ctx, "New websocket connection opened".to_string());
        let params = *self.session.params();
        self.notify(
            ctx,
            format!(
                "Expecting audio data with encoding {}, {} sample rate, and {} channel(s)",
                params.encoding.map(|e| e.as_str()).unwrap_or(""),
                params.sample_rate,
                params.channels
            ),
        );

        // Protocol-level pings keep dead connections from pinning their
        // session state forever. Connections persist until explicit close
        // or transport failure otherwise.
        let timeout = self.client_timeout;
        ctx.run_interval(self.heartbeat_interval, move |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > timeout {
                warn!("websocket heartbeat timeout, closing connection");
                ctx.stop();
            } else {
                ctx.ping(b"");
            }
        });
    }

    /// Called on every exit path: graceful close, protocol violation,
    /// transport error, abrupt disconnect.
    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.app_state.session_closed();

        let pending = self.session.buffered_len();
        if !self.finished && pending > 0 {
            // Persistence happens only on an explicit CloseStream; a drop
            // mid-stream discards the partial capture.
            info!(
                discarded_bytes = pending,
                "connection closed without CloseStream, partial capture discarded"
            );
        } else {
            info!("websocket session closed");
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for CaptureSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => self.handle_frame(text.as_bytes(), ctx),
            Ok(ws::Message::Binary(data)) => self.handle_frame(&data, ctx),
            Ok(ws::Message::Ping(data)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&data);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Close(reason)) => {
                info!("client closed connection: {:?}", reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) => {
                // Whole frames only; partial frames are not part of the
                // protocol.
                warn!("received unexpected continuation frame");
            }
            Ok(ws::Message::Nop) => {}
            Err(err) => {
                error!("websocket protocol error: {}", err);
                ctx.stop();
            }
        }
    }
}

/// Build the session's format parameters from handshake query parameters.
///
/// ## Defaults:
/// Missing or unrecognized `encoding` stays unknown (chunk-size fallback and
/// no rate checks), missing or unparsable `sample_rate` becomes 0, missing,
/// unparsable, or zero `channels` becomes 1.
pub(crate) fn params_from_query(query: &HashMap<String, String>) -> StreamParams {
    let encoding = query
        .get("encoding")
        .and_then(|raw| raw.parse::<AudioEncoding>().ok());
    let sample_rate = query
        .get("sample_rate")
        .and_then(|raw| raw.parse::<u32>().ok())
        .unwrap_or(0);
    let channels = query
        .get("channels")
        .and_then(|raw| raw.parse::<u16>().ok())
        .filter(|&channels| channels > 0)
        .unwrap_or(1);

    StreamParams::new(encoding, sample_rate, channels)
}

/// WebSocket endpoint handler.
///
/// Handles the HTTP upgrade, applies the concurrent-session limit, and hands
/// the connection to a fresh [`CaptureSocket`] actor.
pub async fn capture_websocket(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let query =
        web::Query::<HashMap<String, String>>::from_query(req.query_string())
            .unwrap_or_else(|_| web::Query(HashMap::new()));
    let params = params_from_query(&query);

    let limit = app_state.get_config().stream.max_concurrent_sessions;
    if app_state.active_sessions() as usize >= limit {
        warn!(limit, "rejecting connection: session limit reached");
        return Ok(HttpResponse::ServiceUnavailable().json(json!({
            "error": {
                "type": "session_limit",
                "message": format!("maximum concurrent sessions ({}) reached", limit),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        })));
    }

    info!(
        peer = ?req.connection_info().peer_addr(),
        format = %params,
        "new websocket connection request"
    );

    ws::start(CaptureSocket::new(params, app_state), &req, stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_params_from_full_query() {
        let params = params_from_query(&query(&[
            ("encoding", "linear16"),
            ("sample_rate", "8000"),
            ("channels", "2"),
        ]));
        assert_eq!(params.encoding, Some(AudioEncoding::Linear16));
        assert_eq!(params.sample_rate, 8000);
        assert_eq!(params.channels, 2);
    }

    #[test]
    fn test_params_defaults_for_missing_query() {
        let params = params_from_query(&HashMap::new());
        assert_eq!(params.encoding, None);
        assert_eq!(params.sample_rate, 0);
        assert_eq!(params.channels, 1);
    }

    #[test]
    fn test_params_degrade_on_unparsable_values() {
        let params = params_from_query(&query(&[
            ("encoding", "mp3"),
            ("sample_rate", "fast"),
            ("channels", "0"),
        ]));
        // Unknown encoding fails silently into the fallback behavior.
        assert_eq!(params.encoding, None);
        assert_eq!(params.sample_rate, 0);
        // Zero channels degrades to 1 rather than poisoning the byte-rate.
        assert_eq!(params.channels, 1);
    }
}
