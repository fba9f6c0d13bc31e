//! # Audio Capture Backend
//!
//! A bidirectional real-time audio streaming system built from two halves that
//! share this library crate:
//!
//! - **capture-server**: an Actix-web WebSocket server that accepts a stream
//!   of binary audio frames, accumulates them, watches the inbound data rate,
//!   and persists the captured payload to disk when the client signals the end
//!   of the stream.
//! - **audio-streamer**: a one-shot CLI client that reads a raw audio file,
//!   slices it into fixed-duration chunks, and sends them over the same
//!   WebSocket connection at real-time cadence, emulating a live microphone.
//!
//! ## Wire Protocol:
//! - **Binary frames**: raw audio bytes, one chunk per frame, no header
//! - **Control frames (client → server)**: JSON with a `type` field; only
//!   `{"type": "CloseStream"}` is defined
//! - **Status frames (server → client)**: JSON carrying exactly one of
//!   `msg`, `filename`, or `total_bytes`
//!
//! ## Module Layout:
//! - **config**: layered configuration (defaults, config.toml, environment)
//! - **error**: the application error taxonomy and HTTP mapping
//! - **state**: shared server state and capture metrics
//! - **audio**: encoding registry, chunking, and per-connection sessions
//! - **protocol**: control/status message types and frame classification
//! - **storage**: raw-artifact persistence
//! - **websocket**: the per-connection capture actor (server side)
//! - **streamer**: the paced streaming session (client side)

pub mod audio;
pub mod config;
pub mod error;
pub mod health;
pub mod middleware;
pub mod protocol;
pub mod state;
pub mod storage;
pub mod streamer;
pub mod websocket;
