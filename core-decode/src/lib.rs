//! # Audio Decode Module
//!
//! Decodes the best audio track of a media container into normalized mono
//! `f32` samples, optionally windowed to a start offset and maximum
//! duration and optionally resampled.
//!
//! ## Overview
//!
//! This module handles:
//! - Stream discovery and decoder setup ([`StreamOpener`])
//! - Seek, packet/frame decode loop and sample budget ([`DecodeController`])
//! - Bit-depth and layout independent mono mix-down ([`SampleNormalizer`])
//! - Optional sample-rate conversion ([`RubatoResampler`])
//! - Property queries without decoding ([`get_properties`])
//!
//! Container parsing and codecs sit behind [`CodecBackend`];
//! [`SymphoniaBackend`] is the default.
//!
//! ## Usage
//!
//! ```rust,no_run
//! let properties = core_decode::get_properties("/music/song.flac");
//! println!("{} at {} Hz", properties.encoding, properties.sample_rate);
//!
//! let result = core_decode::decode_audio("/music/song.flac", 0.0, -1.0);
//! assert!(result.samples.iter().all(|s| (-1.0..=1.0).contains(s)));
//! ```

pub mod api;
pub mod backend;
pub mod config;
pub mod controller;
pub mod decoder;
pub mod error;
pub mod normalizer;
pub mod opener;
pub mod properties;
pub mod resampler;
pub mod types;

#[cfg(test)]
mod testing;

pub use api::{decode_audio, decode_with, get_properties, AudioFileDecoder};
pub use backend::{
    CodecBackend, MediaContainer, Packet, RawFrame, ReceiveStatus, SendStatus, StreamCandidate,
    StreamDecoder,
};
pub use config::{DecoderConfig, Interpolation, ResamplerConfig};
pub use controller::{DecodeController, DecodeState, DecodeStats, ResamplerFactory};
pub use decoder::{FormatDetector, SymphoniaBackend};
pub use error::{DecodeError, Result, StatusCode};
pub use normalizer::{PcmSample, SampleNormalizer};
pub use opener::{OpenedStream, StreamOpener};
pub use properties::query_properties;
pub use resampler::{Resampler, RubatoResampler};
pub use types::{
    AudioCodec, AudioProperties, AudioSource, AudioStreamDescriptor, DecodeRequest, DecodeResult,
    SampleEncoding, SampleFormat, SampleLayout, TimeBase,
};
