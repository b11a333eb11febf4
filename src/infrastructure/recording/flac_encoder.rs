//! Streaming FLAC encoding of captured takes
//!
//! Settings:
//! - 48kHz sample rate
//! - Interleaved stereo
//! - 16-bit samples
//! - Fixed 4096-sample blocks, the last one may be shorter
//!
//! The STREAMINFO header is written before any frame is known, so frame
//! sizes, total samples and the MD5 digest are left as "unknown".

use flacenc::bitsink::ByteSink;
use flacenc::component::{BitRepr, Stream, StreamInfo};
use flacenc::config;
use flacenc::constant::{DEFAULT_BLOCK_SIZE, MIN_BLOCK_SIZE};
use flacenc::error::{Verified, Verify};
use flacenc::source::{Fill, FrameBuf};

/// Sample rate every take is encoded at
pub const TARGET_SAMPLE_RATE: u32 = 48_000;

/// Channels every take is encoded with
pub const TARGET_CHANNELS: u16 = 2;

/// Bits per sample (16-bit audio)
pub const BITS_PER_SAMPLE: u16 = 16;

/// Length of `fLaC` plus the STREAMINFO block
pub const HEADER_LEN: usize = 42;

/// Encodes interleaved stereo PCM into FLAC frames as it arrives.
///
/// At most one block of samples is buffered.
pub struct FlacStreamEncoder {
    config: Verified<config::Encoder>,
    stream_info: StreamInfo,
    block_size: usize,
    pending: Vec<i32>,
    frame_number: usize,
    header_written: bool,
}

impl FlacStreamEncoder {
    pub fn new() -> Result<Self, EncodingError> {
        let config = config::Encoder::default()
            .into_verified()
            .map_err(|(_, e)| EncodingError::Config(format!("{:?}", e)))?;
        let block_size = DEFAULT_BLOCK_SIZE;

        let mut stream_info = StreamInfo::new(
            TARGET_SAMPLE_RATE as usize,
            TARGET_CHANNELS as usize,
            BITS_PER_SAMPLE as usize,
        )
        .map_err(|e| EncodingError::Config(e.to_string()))?;
        stream_info
            .set_block_sizes(block_size, block_size)
            .map_err(|e| EncodingError::Config(e.to_string()))?;
        stream_info
            .set_frame_sizes(0, 0)
            .map_err(|e| EncodingError::Config(e.to_string()))?;

        Ok(Self {
            config,
            stream_info,
            block_size,
            pending: Vec::with_capacity(block_size * TARGET_CHANNELS as usize),
            frame_number: 0,
            header_written: false,
        })
    }

    /// Add samples and return the bytes of every block completed by them.
    ///
    /// The header goes out with the first completed block.
    pub fn push(&mut self, samples: &[i16]) -> Result<Vec<u8>, EncodingError> {
        let block_len = self.block_size * TARGET_CHANNELS as usize;
        let mut out = Vec::new();

        for &sample in samples {
            self.pending.push(i32::from(sample));
            if self.pending.len() == block_len {
                self.encode_pending(self.block_size, &mut out)?;
            }
        }
        Ok(out)
    }

    /// Encode whatever is buffered as the final, possibly shorter, block.
    ///
    /// A take that never produced a sample yields no bytes at all.
    pub fn finish(mut self) -> Result<Vec<u8>, EncodingError> {
        let mut out = Vec::new();
        if self.pending.is_empty() {
            return Ok(out);
        }

        let frames = self.pending.len() / TARGET_CHANNELS as usize;
        // Blocks shorter than the format minimum are padded with silence
        let size = frames.max(MIN_BLOCK_SIZE);
        self.pending.resize(size * TARGET_CHANNELS as usize, 0);
        self.encode_pending(size, &mut out)?;
        Ok(out)
    }

    fn encode_pending(&mut self, size: usize, out: &mut Vec<u8>) -> Result<(), EncodingError> {
        if !self.header_written {
            out.extend(self.header()?);
            self.header_written = true;
        }

        let mut framebuf = FrameBuf::with_size(TARGET_CHANNELS as usize, size)
            .map_err(|e| EncodingError::Encode(e.to_string()))?;
        framebuf
            .fill_interleaved(&self.pending)
            .map_err(|e| EncodingError::Encode(e.to_string()))?;
        self.pending.clear();

        let frame = flacenc::encode_fixed_size_frame(
            &self.config,
            &framebuf,
            self.frame_number,
            &self.stream_info,
        )
        .map_err(|e| EncodingError::Encode(format!("{:?}", e)))?;
        self.frame_number += 1;

        let mut sink = ByteSink::new();
        frame
            .write(&mut sink)
            .map_err(|e| EncodingError::Write(e.to_string()))?;
        out.extend(sink.into_inner());
        Ok(())
    }

    fn header(&self) -> Result<Vec<u8>, EncodingError> {
        let stream = Stream::with_stream_info(self.stream_info.clone());
        let mut sink = ByteSink::new();
        stream
            .write(&mut sink)
            .map_err(|e| EncodingError::Write(e.to_string()))?;
        Ok(sink.into_inner())
    }
}

/// FLAC encoding errors
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("FLAC config error: {0}")]
    Config(String),

    #[error("FLAC encoding failed: {0}")]
    Encode(String),

    #[error("FLAC write failed: {0}")]
    Write(String),
}
