//! # Streaming Client Session
//!
//! The producer half of the system: connects to the capture server, declares
//! its audio format on the handshake, slices a raw payload file into
//! real-time chunks, and sends them at paced intervals before signaling the
//! end of the stream with a `CloseStream` control frame.
//!
//! ## Session Lifecycle:
//! `Connecting → Open → Streaming → Closing → Closed`, with an absorbing
//! `Error` state reachable from anywhere. One invocation is one session:
//! there is no retry or reconnect policy.
//!
//! ## Reverse Channel:
//! The same connection is listened on concurrently. Status frames from the
//! server are logged; anything that doesn't decode as a status frame is
//! buffered as opaque binary and persisted to a `received_…​.raw` file when
//! the connection closes, mirroring the server's own accumulation discipline.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::audio::chunker::{chunk_size_bytes, ChunkIter, REALTIME_RESOLUTION};
use crate::audio::encoding::{AudioEncoding, StreamParams};
use crate::error::{AppError, AppResult};
use crate::protocol::{classify_server_frame, ControlMessage, ServerFrame, StatusMessage};
use crate::storage;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Lifecycle states of one streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport handshake in progress
    Connecting,
    /// Connection established, ready to stream
    Open,
    /// Chunks are being transmitted at real-time cadence
    Streaming,
    /// All chunks and the CloseStream frame sent, awaiting server close
    Closing,
    /// Transport closed
    Closed,
    /// Terminal failure state, reachable from anywhere, never left
    Error,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Connecting => "connecting",
            SessionState::Open => "open",
            SessionState::Streaming => "streaming",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
            SessionState::Error => "error",
        }
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        if self == SessionState::Error {
            return false;
        }
        if next == SessionState::Error {
            return true;
        }
        matches!(
            (self, next),
            (SessionState::Connecting, SessionState::Open)
                | (SessionState::Open, SessionState::Streaming)
                | (SessionState::Streaming, SessionState::Closing)
                | (SessionState::Closing, SessionState::Closed)
        )
    }
}

/// Everything needed to run one streaming session.
#[derive(Debug, Clone)]
pub struct StreamerOptions {
    /// WebSocket endpoint, e.g. `ws://localhost:5000`
    pub endpoint: String,
    /// Path of the raw audio payload to stream
    pub input: PathBuf,
    pub encoding: AudioEncoding,
    pub sample_rate: u32,
    pub channels: u16,
    /// Where reverse-channel audio is saved on close
    pub output_dir: PathBuf,
}

/// A one-shot streaming session over a single duplex connection.
#[derive(Debug)]
pub struct AudioStreamer {
    options: StreamerOptions,
    state: SessionState,
    /// Reverse-channel binary accumulation, shared with the receive task
    received: Arc<Mutex<Vec<u8>>>,
}

impl AudioStreamer {
    /// Validate the options and build a session.
    ///
    /// Fails fast, before any connection attempt: a missing input file or
    /// degenerate format parameters are configuration errors.
    pub fn new(options: StreamerOptions) -> AppResult<Self> {
        if !options.input.exists() {
            return Err(AppError::Config(format!(
                "{} is an invalid file path",
                options.input.display()
            )));
        }
        if options.sample_rate == 0 {
            return Err(AppError::Config(
                "sample rate must be a positive integer".to_string(),
            ));
        }
        if options.channels == 0 {
            return Err(AppError::Config(
                "channel count must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            options,
            state: SessionState::Connecting,
            received: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn params(&self) -> StreamParams {
        StreamParams::new(
            Some(self.options.encoding),
            self.options.sample_rate,
            self.options.channels,
        )
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid session transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(from = self.state.as_str(), to = next.as_str(), "session state change");
        self.state = next;
    }

    /// The handshake URL with format parameters attached as query pairs.
    fn handshake_url(&self) -> AppResult<Url> {
        let mut url = Url::parse(&self.options.endpoint).map_err(|err| {
            AppError::Config(format!(
                "invalid endpoint '{}': {}",
                self.options.endpoint, err
            ))
        })?;

        url.query_pairs_mut()
            .append_pair("encoding", self.options.encoding.as_str())
            .append_pair("sample_rate", &self.options.sample_rate.to_string())
            .append_pair("channels", &self.options.channels.to_string());

        Ok(url)
    }

    /// Run the session to completion.
    ///
    /// ## Termination paths:
    /// - **Graceful**: all chunks sent, `CloseStream` sent, server closes,
    ///   reverse-channel data flushed
    /// - **Error**: any transport or payload-read failure aborts the session
    ///   (the reverse-channel buffer is still flushed; the connection close
    ///   is the only cancellation primitive)
    pub async fn run(mut self) -> AppResult<()> {
        let url = self.handshake_url()?;
        info!(url = %url, "connecting to capture server");

        let (ws_stream, _response) = match connect_async(url.as_str()).await {
            Ok(connected) => connected,
            Err(err) => {
                self.transition(SessionState::Error);
                return Err(AppError::Connection(format!(
                    "could not connect to {}: {}",
                    self.options.endpoint, err
                )));
            }
        };
        self.transition(SessionState::Open);
        info!("successfully opened streaming connection");

        let (mut sink, source) = ws_stream.split();
        let receive_task = tokio::spawn(drain_incoming(source, Arc::clone(&self.received)));

        self.transition(SessionState::Streaming);
        match self.stream_payload(&mut sink).await {
            Ok(()) => {
                let close_frame = serde_json::to_string(&ControlMessage::CloseStream)
                    .map_err(|err| AppError::Internal(err.to_string()))?;
                sink.send(Message::Text(close_frame)).await?;
                self.transition(SessionState::Closing);
                info!("successfully closed stream, waiting for final messages");
            }
            Err(err) => {
                error!("streaming aborted: {}", err);
                self.transition(SessionState::Error);
                let _ = sink.send(Message::Close(None)).await;
                let _ = receive_task.await;
                if let Err(flush_err) = self.flush_received() {
                    error!("could not save received audio data: {}", flush_err);
                }
                return Err(err);
            }
        }

        // The server acknowledges with filename and total_bytes frames, then
        // closes; the receive task drains until the transport goes away.
        if receive_task.await.is_err() {
            warn!("receive task terminated abnormally");
        }
        self.transition(SessionState::Closed);
        info!("connection closed");

        self.flush_received()?;
        Ok(())
    }

    /// Read the payload and send it as paced chunks.
    ///
    /// A zero-length payload sends no chunks; the caller still emits the
    /// CloseStream frame.
    async fn stream_payload(&mut self, sink: &mut WsSink) -> AppResult<()> {
        let payload = fs::read(&self.options.input).map_err(|err| {
            AppError::Config(format!(
                "could not read input file {}: {}",
                self.options.input.display(),
                err
            ))
        })?;

        let params = self.params();
        let chunk_size = chunk_size_bytes(&params);
        let chunks = ChunkIter::new(payload, chunk_size);
        info!(
            chunk_size,
            chunks = chunks.chunk_count(),
            format = %params,
            "streaming payload at real-time cadence"
        );

        for chunk in chunks {
            sink.send(Message::Binary(chunk)).await?;
            // One chunk covers REALTIME_RESOLUTION of audio, so wait that
            // long after every send, the final chunk included.
            tokio::time::sleep(REALTIME_RESOLUTION).await;
        }

        Ok(())
    }

    /// Persist reverse-channel binary data, if any arrived.
    ///
    /// Runs on every close path. An empty buffer writes nothing; unlike the
    /// server's flush there is nothing to report for an empty capture here.
    fn flush_received(&self) -> AppResult<()> {
        let data = {
            let mut buffer = self.received.lock().unwrap();
            std::mem::take(&mut *buffer)
        };

        if data.is_empty() {
            return Ok(());
        }

        let saved = storage::write_raw(&self.options.output_dir, "received_", &data)?;
        info!(
            path = %saved.path.display(),
            bytes = saved.total_bytes,
            "saved received audio data"
        );
        Ok(())
    }
}

/// Drain inbound frames until the transport closes.
///
/// Runs as its own task so pacing sleeps never delay inbound handling.
async fn drain_incoming(mut source: WsSource, received: Arc<Mutex<Vec<u8>>>) {
    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Close(reason)) => {
                info!("server closed connection: {:?}", reason);
                break;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(message) => handle_server_payload(&message.into_data(), &received),
            Err(err) => {
                error!("receive error: {}", err);
                break;
            }
        }
    }
}

/// Classify one server frame: log recognized statuses, buffer binary audio.
fn handle_server_payload(payload: &[u8], received: &Mutex<Vec<u8>>) {
    match classify_server_frame(payload) {
        ServerFrame::Status(StatusMessage::Info { msg }) => {
            info!("Server message: {}", msg);
        }
        ServerFrame::Status(StatusMessage::Stored { filename }) => {
            info!("Sent audio data was stored in {}", filename);
        }
        ServerFrame::Status(StatusMessage::TotalBytes { total_bytes }) => {
            info!("Server captured {} bytes in total", total_bytes);
        }
        ServerFrame::Unrecognized => {
            debug!("ignoring unrecognized server frame");
        }
        ServerFrame::Audio => {
            received.lock().unwrap().extend_from_slice(payload);
        }
    }
}
