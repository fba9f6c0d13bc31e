//! # Audio Streaming Primitives
//!
//! The format- and payload-level building blocks shared by both halves of
//! the system:
//!
//! - **encoding**: the static registry mapping encoding names to sample
//!   byte-widths, and the per-stream format parameters
//! - **chunker**: payload slicing and real-time chunk sizing (streamer side)
//! - **session**: per-connection accumulation and rate monitoring (server
//!   side)
//!
//! The WebSocket handlers themselves live in src/websocket.rs (server) and
//! src/streamer.rs (client) at the crate root.

pub mod chunker;
pub mod encoding;
pub mod session;
