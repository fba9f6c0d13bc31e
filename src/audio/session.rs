//! # Capture Session State
//!
//! Per-connection state on the server side: the accumulated audio buffer, a
//! running byte count, the session clock, and the rate monitor that compares
//! observed throughput against the rate implied by the declared format.
//!
//! ## Ownership:
//! One session belongs to exactly one WebSocket actor and is mutated only by
//! that actor's message handler, so no locking is needed. Frames arrive and
//! are applied in strict connection order, which makes the buffer's byte
//! order authoritative for the persisted artifact.

use std::time::{Duration, Instant};

use crate::audio::encoding::StreamParams;

/// Mutable state for one inbound audio stream.
///
/// ## Lifecycle:
/// Created when the connection opens, destroyed when the stream is flushed
/// (explicit `CloseStream`) or the connection goes away. The buffer strictly
/// grows between those two points; nothing is dropped or reordered.
pub struct CaptureSession {
    params: StreamParams,
    started: Instant,
    bytes_received: u64,
    buffer: Vec<u8>,
}

impl CaptureSession {
    pub fn new(params: StreamParams) -> Self {
        Self {
            params,
            started: Instant::now(),
            bytes_received: 0,
            buffer: Vec::new(),
        }
    }

    /// The format declared on the handshake. Immutable for the session.
    pub fn params(&self) -> &StreamParams {
        &self.params
    }

    /// Append one binary frame verbatim and return the new running total.
    ///
    /// Vec's amortized growth keeps repeated small appends linear overall.
    pub fn append(&mut self, frame: &[u8]) -> u64 {
        self.buffer.extend_from_slice(frame);
        self.bytes_received += frame.len() as u64;
        self.bytes_received
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whether the stream has delivered more bytes than real time allows.
    ///
    /// ## Semantics:
    /// - Unknown byte-rate (compressed or missing encoding): never fires.
    /// - Zero elapsed time: not yet measurable, the check is skipped.
    /// - Otherwise fires iff bytesReceived / elapsedSeconds exceeds
    ///   byteWidth × sampleRate × channels.
    ///
    /// This is a soft signal only; the caller may warn but never throttles
    /// or rejects the stream. Elapsed time is a parameter so the comparison
    /// stays a pure function of its inputs.
    pub fn is_faster_than_realtime(&self, elapsed: Duration) -> bool {
        let Some(expected) = self.params.byte_rate() else {
            return false;
        };

        let elapsed_secs = elapsed.as_secs_f64();
        if elapsed_secs <= 0.0 {
            return false;
        }

        self.bytes_received as f64 / elapsed_secs > expected as f64
    }

    /// Consume the session's buffer for flushing.
    ///
    /// The session is spent after this; the actor stops right after the
    /// flush, so the emptied buffer is never observed again.
    pub fn take_buffer(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Bytes currently buffered (equals bytes_received until the flush).
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::encoding::AudioEncoding;

    fn linear16_session() -> CaptureSession {
        // linear16 @ 8000 Hz mono: expected rate 16_000 bytes/second.
        CaptureSession::new(StreamParams::new(Some(AudioEncoding::Linear16), 8000, 1))
    }

    #[test]
    fn test_append_accumulates_in_order() {
        let mut session = linear16_session();
        assert_eq!(session.append(&[1, 2, 3]), 3);
        assert_eq!(session.append(&[4, 5]), 5);
        assert_eq!(session.bytes_received(), 5);
        assert_eq!(session.buffered_len(), 5);
        assert_eq!(session.take_buffer(), vec![1, 2, 3, 4, 5]);
        assert_eq!(session.buffered_len(), 0);
        // The running total survives the flush; it backs the final report.
        assert_eq!(session.bytes_received(), 5);
    }

    #[test]
    fn test_rate_monitor_fires_only_above_expected() {
        let mut session = linear16_session();
        session.append(&vec![0u8; 10_000]);

        // 10_000 bytes in 0.5 s = 20_000 B/s > 16_000 B/s
        assert!(session.is_faster_than_realtime(Duration::from_millis(500)));

        // 10_000 bytes in 1 s = 10_000 B/s < 16_000 B/s
        assert!(!session.is_faster_than_realtime(Duration::from_secs(1)));

        // Exactly at the expected rate does not fire; the check is strict.
        assert!(!session.is_faster_than_realtime(Duration::from_millis(625)));
    }

    #[test]
    fn test_rate_monitor_skips_zero_elapsed() {
        let mut session = linear16_session();
        session.append(&vec![0u8; 10_000]);
        assert!(!session.is_faster_than_realtime(Duration::ZERO));
    }

    #[test]
    fn test_rate_monitor_never_fires_for_unknown_encodings() {
        for params in [
            StreamParams::new(Some(AudioEncoding::Opus), 48_000, 2),
            StreamParams::new(None, 8000, 1),
        ] {
            let mut session = CaptureSession::new(params);
            session.append(&vec![0u8; 1_000_000]);
            assert!(!session.is_faster_than_realtime(Duration::from_millis(1)));
        }
    }

    #[test]
    fn test_empty_session_flushes_empty_buffer() {
        let mut session = linear16_session();
        assert_eq!(session.bytes_received(), 0);
        assert!(session.take_buffer().is_empty());
    }
}
