//! # Wire Protocol
//!
//! Message types and frame classification for the duplex audio stream. One
//! WebSocket connection carries two kinds of traffic in each direction:
//!
//! - **Client → Server**: binary audio frames, plus one JSON control frame
//!   `{"type": "CloseStream"}` that ends the stream
//! - **Server → Client**: JSON status frames carrying exactly one of `msg`
//!   (informational), `filename` (where the capture was stored), or
//!   `total_bytes` (size of the stored capture); servers may also relay
//!   binary audio on the reverse channel
//!
//! ## Classification:
//! Every inbound frame is classified independently and atomically, with no
//! knowledge of frame boundaries or session history: attempt a structured
//! decode first, fall back to opaque binary on failure. A frame is
//! "decodable" when its bytes are a UTF-8 JSON object. On the server a
//! decodable frame that is not a recognized control message is a protocol
//! violation and tears the connection down; the client is lenient and simply
//! ignores status objects it doesn't recognize.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Control messages sent by the streaming client.
///
/// `CloseStream` carries no payload; receiving it triggers the server's
/// termination protocol (flush, acknowledge, close).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    CloseStream,
}

/// Status frames sent by the server, one field per frame.
///
/// Serialized untagged so each variant appears on the wire as a bare
/// single-field object: `{"msg": …}`, `{"filename": …}`, `{"total_bytes": …}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusMessage {
    Info { msg: String },
    Stored { filename: String },
    TotalBytes { total_bytes: u64 },
}

/// What one inbound frame turned out to be, on the server side.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameKind {
    /// A recognized control message
    Control(ControlMessage),
    /// Opaque binary audio, to be appended verbatim
    Audio,
}

/// Classify one client frame.
///
/// ## Returns:
/// - **Ok(Control)**: a recognized control message
/// - **Ok(Audio)**: not a JSON object; treat the bytes as audio payload
/// - **Err(Protocol)**: a JSON object with an unrecognized or missing `type`
///   field; the connection must be closed with an abnormal code
pub fn classify_frame(payload: &[u8]) -> AppResult<FrameKind> {
    let Ok(text) = std::str::from_utf8(payload) else {
        return Ok(FrameKind::Audio);
    };

    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return Ok(FrameKind::Audio);
    };

    if !value.is_object() {
        // Bare JSON scalars and arrays can occur in raw audio bytes; only
        // objects are candidate control messages.
        return Ok(FrameKind::Audio);
    }

    match serde_json::from_value::<ControlMessage>(value) {
        Ok(message) => Ok(FrameKind::Control(message)),
        Err(err) => Err(AppError::Protocol(format!(
            "unrecognized control message: {}",
            err
        ))),
    }
}

/// What one inbound frame turned out to be, on the client side.
#[derive(Debug, PartialEq)]
pub enum ServerFrame {
    /// A recognized status frame
    Status(StatusMessage),
    /// A JSON object the client doesn't recognize; logged and dropped
    Unrecognized,
    /// Opaque binary audio for the client's receive buffer
    Audio,
}

/// Classify one server frame. Never fails: the client has no violation path.
pub fn classify_server_frame(payload: &[u8]) -> ServerFrame {
    let Ok(text) = std::str::from_utf8(payload) else {
        return ServerFrame::Audio;
    };

    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return ServerFrame::Audio;
    };

    if !value.is_object() {
        return ServerFrame::Audio;
    }

    match serde_json::from_value::<StatusMessage>(value) {
        Ok(message) => ServerFrame::Status(message),
        Err(_) => ServerFrame::Unrecognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_stream_wire_format() {
        let json = serde_json::to_string(&ControlMessage::CloseStream).unwrap();
        assert_eq!(json, r#"{"type":"CloseStream"}"#);

        let parsed: ControlMessage = serde_json::from_str(r#"{"type":"CloseStream"}"#).unwrap();
        assert_eq!(parsed, ControlMessage::CloseStream);
    }

    #[test]
    fn test_status_frames_carry_one_field() {
        let info = StatusMessage::Info {
            msg: "Received 4000 bytes of data".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&info).unwrap(),
            r#"{"msg":"Received 4000 bytes of data"}"#
        );

        let stored = StatusMessage::Stored {
            filename: "data/20250101_120000_ab12.raw".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&stored).unwrap(),
            r#"{"filename":"data/20250101_120000_ab12.raw"}"#
        );

        let total = StatusMessage::TotalBytes { total_bytes: 10_000 };
        assert_eq!(
            serde_json::to_string(&total).unwrap(),
            r#"{"total_bytes":10000}"#
        );
    }

    #[test]
    fn test_classify_close_stream() {
        let kind = classify_frame(br#"{"type":"CloseStream"}"#).unwrap();
        assert_eq!(kind, FrameKind::Control(ControlMessage::CloseStream));
    }

    #[test]
    fn test_classify_bogus_type_is_violation() {
        assert!(classify_frame(br#"{"type":"Bogus"}"#).is_err());
        assert!(classify_frame(br#"{"note":"no type at all"}"#).is_err());
    }

    #[test]
    fn test_classify_non_json_is_audio() {
        assert_eq!(classify_frame(b"raw pcm bytes").unwrap(), FrameKind::Audio);
        // Invalid UTF-8 can never be a control frame.
        assert_eq!(
            classify_frame(&[0xff, 0xfe, 0x00, 0x80]).unwrap(),
            FrameKind::Audio
        );
        // JSON scalars and arrays are audio too; only objects are control
        // candidates.
        assert_eq!(classify_frame(b"123").unwrap(), FrameKind::Audio);
        assert_eq!(classify_frame(b"[1,2,3]").unwrap(), FrameKind::Audio);
    }

    /// The same bytes classify the same way no matter how often or when they
    /// are presented.
    #[test]
    fn test_classification_is_idempotent() {
        let frames: [&[u8]; 3] = [br#"{"type":"CloseStream"}"#, b"\x01\x02\x03", b"plain text"];
        for payload in frames {
            let first = classify_frame(payload).map(|k| matches!(k, FrameKind::Audio));
            for _ in 0..3 {
                let again = classify_frame(payload).map(|k| matches!(k, FrameKind::Audio));
                assert_eq!(first.is_ok(), again.is_ok());
                if let (Ok(a), Ok(b)) = (&first, &again) {
                    assert_eq!(a, b);
                }
            }
        }
    }

    #[test]
    fn test_classify_server_frames() {
        assert_eq!(
            classify_server_frame(br#"{"msg":"hello"}"#),
            ServerFrame::Status(StatusMessage::Info {
                msg: "hello".to_string()
            })
        );
        assert_eq!(
            classify_server_frame(br#"{"total_bytes":42}"#),
            ServerFrame::Status(StatusMessage::TotalBytes { total_bytes: 42 })
        );
        // Unknown objects are dropped, not treated as audio.
        assert_eq!(
            classify_server_frame(br#"{"transcript":"..."}"#),
            ServerFrame::Unrecognized
        );
        // Everything non-JSON lands in the receive buffer.
        assert_eq!(classify_server_frame(b"\x00\x01"), ServerFrame::Audio);
    }
}
