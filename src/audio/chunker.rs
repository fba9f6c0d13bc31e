//! # Payload Chunking
//!
//! Slices a finite audio payload into the fixed-duration chunks the streamer
//! sends as individual binary frames. Chunks are contiguous, non-overlapping,
//! and partition the payload exactly; the last chunk may be shorter.
//!
//! ## Chunk Sizing:
//! When the declared encoding has a known byte-width, one chunk holds
//! `REALTIME_RESOLUTION_MS` worth of audio:
//! floor(byteWidth × sampleRate × channels × resolution / 1000).
//! For compressed or unknown encodings the byte-rate cannot be derived, so a
//! fixed fallback size is used instead.

use std::time::Duration;

use crate::audio::encoding::StreamParams;

/// Pacing interval between chunk sends. One chunk covers this much audio.
pub const REALTIME_RESOLUTION_MS: u64 = 250;

/// Chunk size in bytes when the declared format has no known byte-rate.
pub const FALLBACK_CHUNK_SIZE: usize = 5000;

/// The pacing interval as a Duration, for the streamer's sleep.
pub const REALTIME_RESOLUTION: Duration = Duration::from_millis(REALTIME_RESOLUTION_MS);

/// Compute the chunk size for a declared stream format.
///
/// ## Edge cases:
/// A known byte-width with a declared sample rate of 0 would compute a chunk
/// size of 0 and the chunker could never make progress, so a computed size of
/// 0 also falls back to [`FALLBACK_CHUNK_SIZE`].
pub fn chunk_size_bytes(params: &StreamParams) -> usize {
    match params.byte_rate() {
        // Integer math: byte_rate * 250 / 1000 == floor(byte_rate * 0.25).
        Some(byte_rate) => {
            let size = (byte_rate * REALTIME_RESOLUTION_MS as u64 / 1000) as usize;
            if size == 0 {
                FALLBACK_CHUNK_SIZE
            } else {
                size
            }
        }
        None => FALLBACK_CHUNK_SIZE,
    }
}

/// A lazy, finite, non-restartable iterator over the chunks of one payload.
///
/// An empty payload yields no chunks; a payload shorter than one chunk yields
/// exactly one short chunk.
pub struct ChunkIter {
    payload: Vec<u8>,
    chunk_size: usize,
    offset: usize,
}

impl ChunkIter {
    /// ## Panics:
    /// Debug-asserts that `chunk_size` is non-zero; [`chunk_size_bytes`]
    /// guarantees that for every declared format.
    pub fn new(payload: Vec<u8>, chunk_size: usize) -> Self {
        debug_assert!(chunk_size > 0, "chunk size must be positive");
        Self {
            payload,
            chunk_size,
            offset: 0,
        }
    }

    /// Number of chunks this iterator will yield in total: ceil(len / size).
    pub fn chunk_count(&self) -> usize {
        self.payload.len().div_ceil(self.chunk_size)
    }
}

impl Iterator for ChunkIter {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.payload.len() {
            return None;
        }

        let end = usize::min(self.offset + self.chunk_size, self.payload.len());
        let chunk = self.payload[self.offset..end].to_vec();
        self.offset = end;
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::encoding::AudioEncoding;

    fn params(encoding: Option<AudioEncoding>, rate: u32, channels: u16) -> StreamParams {
        StreamParams::new(encoding, rate, channels)
    }

    #[test]
    fn test_chunk_size_known_width() {
        // 2 bytes/sample * 8000 Hz * 1 channel * 0.25 s = 4000 bytes
        let p = params(Some(AudioEncoding::Linear16), 8000, 1);
        assert_eq!(chunk_size_bytes(&p), 4000);

        // 1 byte/sample * 8000 Hz * 2 channels * 0.25 s = 4000 bytes
        let p = params(Some(AudioEncoding::Mulaw), 8000, 2);
        assert_eq!(chunk_size_bytes(&p), 4000);

        // floor() applies: 1 * 1001 * 1 * 0.25 = 250.25 -> 250
        let p = params(Some(AudioEncoding::Mulaw), 1001, 1);
        assert_eq!(chunk_size_bytes(&p), 250);
    }

    #[test]
    fn test_chunk_size_fallback_for_unknown_encodings() {
        // Compressed encodings fall back regardless of rate and channels.
        let p = params(Some(AudioEncoding::Opus), 48_000, 2);
        assert_eq!(chunk_size_bytes(&p), FALLBACK_CHUNK_SIZE);

        let p = params(Some(AudioEncoding::Flac), 44_100, 1);
        assert_eq!(chunk_size_bytes(&p), FALLBACK_CHUNK_SIZE);

        let p = params(None, 8000, 1);
        assert_eq!(chunk_size_bytes(&p), FALLBACK_CHUNK_SIZE);
    }

    #[test]
    fn test_chunk_size_guards_degenerate_rate() {
        // linear16 with a declared sample rate of 0 computes to 0; the
        // fallback keeps the chunker able to make progress.
        let p = params(Some(AudioEncoding::Linear16), 0, 1);
        assert_eq!(chunk_size_bytes(&p), FALLBACK_CHUNK_SIZE);
    }

    #[test]
    fn test_partition_is_exact() {
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let chunks: Vec<Vec<u8>> = ChunkIter::new(payload.clone(), 4000).collect();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 4000);
        assert_eq!(chunks[1].len(), 4000);
        assert_eq!(chunks[2].len(), 2000);

        let rejoined: Vec<u8> = chunks.concat();
        assert_eq!(rejoined, payload);
    }

    #[test]
    fn test_chunk_count_matches_ceil() {
        for (len, size, expected) in [
            (0usize, 4000usize, 0usize),
            (1, 4000, 1),
            (4000, 4000, 1),
            (4001, 4000, 2),
            (10_000, 4000, 3),
            (12_000, 4000, 3),
        ] {
            let iter = ChunkIter::new(vec![0u8; len], size);
            assert_eq!(iter.chunk_count(), expected, "len={} size={}", len, size);
            assert_eq!(iter.count(), expected, "len={} size={}", len, size);
        }
    }

    #[test]
    fn test_empty_payload_yields_no_chunks() {
        let mut iter = ChunkIter::new(Vec::new(), FALLBACK_CHUNK_SIZE);
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_short_payload_yields_single_short_chunk() {
        let chunks: Vec<Vec<u8>> = ChunkIter::new(vec![1, 2, 3], 4000).collect();
        assert_eq!(chunks, vec![vec![1, 2, 3]]);
    }
}
