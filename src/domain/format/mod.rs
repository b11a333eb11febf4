//! Audio format domain module

mod audio_format;

pub use audio_format::{AudioFormat, Container, OUTPUT_EXTENSION};
