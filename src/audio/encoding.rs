//! # Encoding Registry
//!
//! Static mapping from audio encoding identifiers to sample byte-widths.
//! Both ends of the stream use it to derive a byte-rate from the declared
//! format: the streamer to size its chunks, the server to judge whether the
//! inbound stream is running faster than real time.
//!
//! Only `linear16` and `mulaw` have a known byte-width. The remaining
//! encodings are compressed, so their byte-rate cannot be derived without
//! decoding; callers fall back to fixed defaults for them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// The audio encodings accepted on the stream handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioEncoding {
    Linear16,
    Mulaw,
    Flac,
    AmrNb,
    AmrWb,
    Opus,
    Speex,
}

impl AudioEncoding {
    /// Bytes per sample, where the encoding makes that knowable.
    ///
    /// Returns None for compressed encodings.
    pub fn sample_width(&self) -> Option<u32> {
        match self {
            AudioEncoding::Linear16 => Some(2),
            AudioEncoding::Mulaw => Some(1),
            _ => None,
        }
    }

    /// The identifier used on the wire and the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioEncoding::Linear16 => "linear16",
            AudioEncoding::Mulaw => "mulaw",
            AudioEncoding::Flac => "flac",
            AudioEncoding::AmrNb => "amr-nb",
            AudioEncoding::AmrWb => "amr-wb",
            AudioEncoding::Opus => "opus",
            AudioEncoding::Speex => "speex",
        }
    }
}

impl fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioEncoding {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear16" => Ok(AudioEncoding::Linear16),
            "mulaw" => Ok(AudioEncoding::Mulaw),
            "flac" => Ok(AudioEncoding::Flac),
            "amr-nb" => Ok(AudioEncoding::AmrNb),
            "amr-wb" => Ok(AudioEncoding::AmrWb),
            "opus" => Ok(AudioEncoding::Opus),
            "speex" => Ok(AudioEncoding::Speex),
            other => Err(AppError::Config(format!(
                "'{}' is not a supported encoding",
                other
            ))),
        }
    }
}

/// The audio format negotiated for one stream.
///
/// Carried as query parameters on the WebSocket handshake and immutable for
/// the lifetime of the session. `encoding` is None when the client omitted
/// the parameter or sent a name the registry doesn't know; byte-rate lookups
/// then fail silently and callers use their fallback behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    pub encoding: Option<AudioEncoding>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl StreamParams {
    pub fn new(encoding: Option<AudioEncoding>, sample_rate: u32, channels: u16) -> Self {
        Self {
            encoding,
            sample_rate,
            channels,
        }
    }

    /// Expected bytes per second of real-time audio in this format.
    ///
    /// None when the encoding (or its byte-width) is unknown.
    pub fn byte_rate(&self) -> Option<u64> {
        let width = self.encoding?.sample_width()?;
        Some(width as u64 * self.sample_rate as u64 * self.channels as u64)
    }
}

impl fmt::Display for StreamParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoding = self
            .encoding
            .map(|e| e.as_str())
            .unwrap_or("unknown");
        write!(
            f,
            "{} @ {} Hz, {} channel(s)",
            encoding, self.sample_rate, self.channels
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_widths() {
        assert_eq!(AudioEncoding::Linear16.sample_width(), Some(2));
        assert_eq!(AudioEncoding::Mulaw.sample_width(), Some(1));
        assert_eq!(AudioEncoding::Flac.sample_width(), None);
        assert_eq!(AudioEncoding::Opus.sample_width(), None);
    }

    #[test]
    fn test_parse_encoding_names() {
        assert_eq!(
            "linear16".parse::<AudioEncoding>().unwrap(),
            AudioEncoding::Linear16
        );
        assert_eq!(
            "AMR-WB".parse::<AudioEncoding>().unwrap(),
            AudioEncoding::AmrWb
        );
        assert!("mp3".parse::<AudioEncoding>().is_err());
        assert!("".parse::<AudioEncoding>().is_err());
    }

    #[test]
    fn test_wire_names_round_trip() {
        for encoding in [
            AudioEncoding::Linear16,
            AudioEncoding::Mulaw,
            AudioEncoding::Flac,
            AudioEncoding::AmrNb,
            AudioEncoding::AmrWb,
            AudioEncoding::Opus,
            AudioEncoding::Speex,
        ] {
            assert_eq!(encoding.as_str().parse::<AudioEncoding>().unwrap(), encoding);
        }
    }

    #[test]
    fn test_byte_rate() {
        let params = StreamParams::new(Some(AudioEncoding::Linear16), 8000, 1);
        assert_eq!(params.byte_rate(), Some(16_000));

        let stereo = StreamParams::new(Some(AudioEncoding::Mulaw), 16_000, 2);
        assert_eq!(stereo.byte_rate(), Some(32_000));

        let compressed = StreamParams::new(Some(AudioEncoding::Opus), 48_000, 2);
        assert_eq!(compressed.byte_rate(), None);

        let unknown = StreamParams::new(None, 8000, 1);
        assert_eq!(unknown.byte_rate(), None);
    }
}
