//! # Symphonia Codec Backend
//!
//! Default [`CodecBackend`](crate::backend::CodecBackend) built on the
//! Symphonia pure-Rust audio library.
//!
//! ## Supported Formats
//!
//! | Format | Codec | Feature Flag |
//! |--------|-------|--------------|
//! | MP3 | MPEG-1/2 Audio Layer III | `decoder-mp3` |
//! | FLAC | Free Lossless Audio Codec | `decoder-flac` |
//! | Vorbis | Ogg Vorbis | `decoder-vorbis` |
//! | AAC | Advanced Audio Coding (MP4) | `decoder-aac` |
//! | WAV | PCM in RIFF | `decoder-wav` |
//! | ALAC | Apple Lossless (MP4) | `decoder-alac` |
//! | MKV/WebM | Matroska container | `decoder-mkv` |
//!
//! ## Architecture
//!
//! ```text
//! AudioSource → MediaSourceStream → FormatReader → Decoder → RawFrame
//!               (SymphoniaBackend)  (SymphoniaContainer)  (SymphoniaStreamDecoder)
//! ```
//!
//! Symphonia always produces planar buffers. 24-bit integer buffers are
//! widened to 32-bit and 64-bit float buffers narrowed to 32-bit before
//! they leave the backend.

mod format_detector;
mod symphonia;

pub use self::symphonia::{SymphoniaBackend, SymphoniaContainer, SymphoniaStreamDecoder};
pub use format_detector::FormatDetector;
