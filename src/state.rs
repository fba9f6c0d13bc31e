//! # Application State Management
//!
//! Shared state for the capture server. Every WebSocket connection and HTTP
//! request handler holds a clone of [`AppState`]; the interesting mutable
//! pieces live behind `Arc<RwLock<…>>`.
//!
//! ## What is (and isn't) shared:
//! Only the configuration and the process-wide counters are shared. Each
//! connection's capture session (buffer, byte count, clock) is exclusively
//! owned by that connection's actor and never crosses this boundary, so the
//! locks here guard nothing but cheap counter updates.

use crate::config::AppConfig;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// The state shared across all connections and request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration, loaded once at startup
    pub config: Arc<RwLock<AppConfig>>,

    /// Capture counters, updated by every connection
    pub metrics: Arc<RwLock<CaptureMetrics>>,

    /// When the server started (immutable, safe to read directly)
    pub start_time: Instant,
}

/// Counters describing the server's capture activity since startup.
#[derive(Debug, Default, Clone)]
pub struct CaptureMetrics {
    /// WebSocket connections accepted since startup
    pub connections_total: u64,

    /// Currently open capture sessions
    pub active_sessions: u32,

    /// Binary audio bytes accumulated across all sessions
    pub bytes_received: u64,

    /// Streams flushed to storage after an explicit CloseStream
    pub streams_persisted: u64,

    /// Connections torn down for sending an invalid control frame
    pub protocol_violations: u64,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(CaptureMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// Get a copy of the current configuration.
    ///
    /// Cloning releases the read lock immediately; AppConfig is cheap to
    /// clone.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Called when a connection is accepted and its session created.
    pub fn session_opened(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.connections_total += 1;
        metrics.active_sessions += 1;
    }

    /// Called when a connection's actor stops, on every exit path.
    pub fn session_closed(&self) {
        let mut metrics = self.metrics.write().unwrap();
        // Guard against underflow if a stop races a failed open.
        if metrics.active_sessions > 0 {
            metrics.active_sessions -= 1;
        }
    }

    /// Account for one accumulated binary frame.
    pub fn record_bytes_received(&self, bytes: u64) {
        self.metrics.write().unwrap().bytes_received += bytes;
    }

    /// Account for one successful flush to storage.
    pub fn record_stream_persisted(&self) {
        self.metrics.write().unwrap().streams_persisted += 1;
    }

    /// Account for one connection closed on an invalid control frame.
    pub fn record_protocol_violation(&self) {
        self.metrics.write().unwrap().protocol_violations += 1;
    }

    /// Number of sessions currently open (used for the upgrade-time limit).
    pub fn active_sessions(&self) -> u32 {
        self.metrics.read().unwrap().active_sessions
    }

    /// Snapshot the counters without holding the lock during serialization.
    pub fn get_metrics_snapshot(&self) -> CaptureMetrics {
        self.metrics.read().unwrap().clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_counters_balance() {
        let state = AppState::new(AppConfig::default());

        state.session_opened();
        state.session_opened();
        assert_eq!(state.active_sessions(), 2);

        state.session_closed();
        state.session_closed();
        // An extra close must not underflow.
        state.session_closed();
        assert_eq!(state.active_sessions(), 0);

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.connections_total, 2);
    }

    #[test]
    fn test_byte_and_flush_accounting() {
        let state = AppState::new(AppConfig::default());

        state.record_bytes_received(4000);
        state.record_bytes_received(2000);
        state.record_stream_persisted();
        state.record_protocol_violation();

        let snapshot = state.get_metrics_snapshot();
        assert_eq!(snapshot.bytes_received, 6000);
        assert_eq!(snapshot.streams_persisted, 1);
        assert_eq!(snapshot.protocol_violations, 1);
    }
}
