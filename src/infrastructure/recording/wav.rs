//! Streaming WAV output
//!
//! The header is emitted before the first PCM bytes, when the final length
//! is not known yet. Both size fields carry the "unknown length" value
//! 0xFFFFFFFF, which streaming readers treat as "read to end of file".

use super::flac_encoder::{BITS_PER_SAMPLE, TARGET_CHANNELS, TARGET_SAMPLE_RATE};

/// Size of the canonical PCM header
pub const HEADER_LEN: usize = 44;

const PCM_FORMAT: u16 = 1;
const UNKNOWN_LENGTH: u32 = u32::MAX;
const BLOCK_ALIGN: u16 = TARGET_CHANNELS * BITS_PER_SAMPLE / 8;
const BYTE_RATE: u32 = TARGET_SAMPLE_RATE * BLOCK_ALIGN as u32;

/// 44-byte RIFF/WAVE header for 48kHz stereo s16le of unknown length
pub fn streaming_header() -> Vec<u8> {
    let mut header = Vec::with_capacity(HEADER_LEN);

    // RIFF chunk
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&UNKNOWN_LENGTH.to_le_bytes());
    header.extend_from_slice(b"WAVE");

    // fmt subchunk
    header.extend_from_slice(b"fmt ");
    header.extend_from_slice(&16u32.to_le_bytes());
    header.extend_from_slice(&PCM_FORMAT.to_le_bytes());
    header.extend_from_slice(&TARGET_CHANNELS.to_le_bytes());
    header.extend_from_slice(&TARGET_SAMPLE_RATE.to_le_bytes());
    header.extend_from_slice(&BYTE_RATE.to_le_bytes());
    header.extend_from_slice(&BLOCK_ALIGN.to_le_bytes());
    header.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data subchunk
    header.extend_from_slice(b"data");
    header.extend_from_slice(&UNKNOWN_LENGTH.to_le_bytes());

    header
}

/// Little-endian PCM bytes
pub fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Cuts captured samples into WAV chunks, header first
#[derive(Debug, Default)]
pub struct WavSlicer {
    header_sent: bool,
    pending: Vec<i16>,
}

impl WavSlicer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, samples: &[i16]) {
        self.pending.extend_from_slice(samples);
    }

    /// Everything buffered since the last call, or `None` if nothing is
    pub fn take_chunk(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            return None;
        }

        let mut chunk = if self.header_sent {
            Vec::with_capacity(self.pending.len() * 2)
        } else {
            self.header_sent = true;
            streaming_header()
        };
        chunk.extend(pcm_bytes(&self.pending));
        self.pending.clear();
        Some(chunk)
    }
}
