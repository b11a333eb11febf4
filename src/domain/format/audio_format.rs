//! Audio format value object

use std::fmt;

/// Extension of every take, whatever format was negotiated.
///
/// The watchdog matches `<N>.webm` and identifies the stream by its content.
pub const OUTPUT_EXTENSION: &str = "webm";

/// Container an encoder writes into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    Ogg,
    Flac,
    Wav,
}

/// A candidate audio encoding.
/// Lower priority number means more preferred.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    pub mime_type: &'static str,
    pub display_name: &'static str,
    pub priority: u32,
    pub container: Container,
}

impl AudioFormat {
    /// Static candidate list, in priority order
    pub const CANDIDATES: &'static [AudioFormat] = &[
        AudioFormat {
            mime_type: "audio/ogg; codecs=opus",
            display_name: "OGG Opus",
            priority: 1,
            container: Container::Ogg,
        },
        AudioFormat {
            mime_type: "audio/flac",
            display_name: "FLAC",
            priority: 2,
            container: Container::Flac,
        },
        AudioFormat {
            mime_type: "audio/wav",
            display_name: "WAV",
            priority: 3,
            container: Container::Wav,
        },
    ];
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name)
    }
}
