//! # Decode Data Model
//!
//! Backend-independent types shared by the pipeline stages: sources,
//! sample formats, stream descriptors, requests and results.

use crate::error::{DecodeError, Result, StatusCode};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Audio Codec Types
// ============================================================================

/// Audio codecs recognised by the backend.
///
/// Use [`AudioCodec::Other`] for codecs the backend knows by name only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    /// MPEG-1/2 Audio Layer 3
    Mp3,
    /// Advanced Audio Coding (AAC/M4A)
    Aac,
    /// Free Lossless Audio Codec
    Flac,
    /// Ogg Vorbis
    Vorbis,
    /// Opus
    Opus,
    /// Uncompressed PCM (WAV, AIFF, raw)
    Pcm,
    /// Apple Lossless Audio Codec
    Alac,
    /// Codec not recognized
    Unknown,
    /// Codec known to the backend but not listed above
    Other(String),
}

impl AudioCodec {
    /// Returns `true` if this is a lossless codec.
    pub fn is_lossless(&self) -> bool {
        matches!(self, AudioCodec::Flac | AudioCodec::Pcm | AudioCodec::Alac)
    }
}

// ============================================================================
// Audio Source Types
// ============================================================================

/// Where the encoded audio comes from.
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Audio file on the local filesystem.
    LocalFile {
        /// Path to the audio file
        path: PathBuf,
    },

    /// Encoded audio already held in memory (e.g. an uploaded file).
    Memory {
        /// Raw container bytes (encoded, not PCM)
        data: Bytes,
        /// Optional file extension used as a probe hint (e.g. `"mp3"`)
        extension_hint: Option<String>,
    },
}

impl AudioSource {
    /// Source backed by a file path.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        AudioSource::LocalFile { path: path.into() }
    }

    /// Source backed by an in-memory buffer.
    pub fn memory(data: impl Into<Bytes>, extension_hint: Option<&str>) -> Self {
        AudioSource::Memory {
            data: data.into(),
            extension_hint: extension_hint.map(str::to_string),
        }
    }

    /// Short human-readable label used in logs and error messages.
    pub fn describe(&self) -> String {
        match self {
            AudioSource::LocalFile { path } => path.display().to_string(),
            AudioSource::Memory { data, .. } => format!("memory buffer ({} bytes)", data.len()),
        }
    }
}

// ============================================================================
// Sample Format Types
// ============================================================================

/// Numeric encoding of one raw sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleEncoding {
    U8,
    S8,
    U16,
    S16,
    /// Packed 24-bit signed integer
    S24,
    U32,
    S32,
    F32,
    F64,
}

impl SampleEncoding {
    /// Size of one sample in bytes.
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleEncoding::U8 | SampleEncoding::S8 => 1,
            SampleEncoding::U16 | SampleEncoding::S16 => 2,
            SampleEncoding::S24 => 3,
            SampleEncoding::U32 | SampleEncoding::S32 | SampleEncoding::F32 => 4,
            SampleEncoding::F64 => 8,
        }
    }
}

/// Memory layout of a multi-channel sample buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleLayout {
    /// One buffer, channels interleaved (LRLRLR...).
    Interleaved,
    /// One contiguous buffer per channel (LLL...RRR...).
    Planar,
}

/// Full description of a raw sample buffer's format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleFormat {
    pub encoding: SampleEncoding,
    pub layout: SampleLayout,
}

impl SampleFormat {
    pub fn new(encoding: SampleEncoding, layout: SampleLayout) -> Self {
        Self { encoding, layout }
    }

    pub fn interleaved(encoding: SampleEncoding) -> Self {
        Self::new(encoding, SampleLayout::Interleaved)
    }

    pub fn planar(encoding: SampleEncoding) -> Self {
        Self::new(encoding, SampleLayout::Planar)
    }

    pub fn is_planar(&self) -> bool {
        self.layout == SampleLayout::Planar
    }
}

impl std::fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let layout = if self.is_planar() { "p" } else { "" };
        write!(f, "{:?}{}", self.encoding, layout)
    }
}

// ============================================================================
// Stream Descriptor
// ============================================================================

/// Rational time base of a stream's timestamps (seconds per tick =
/// `numer / denom`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeBase {
    pub numer: u32,
    pub denom: u32,
}

impl TimeBase {
    pub fn new(numer: u32, denom: u32) -> Self {
        Self { numer, denom }
    }

    /// Convert a position in seconds to timestamp ticks, rounding to the
    /// nearest tick.
    pub fn seconds_to_ticks(&self, seconds: f64) -> Result<u64> {
        if self.numer == 0 || self.denom == 0 {
            return Err(DecodeError::Seek(format!(
                "degenerate time base {}/{}",
                self.numer, self.denom
            )));
        }
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(DecodeError::Seek(format!(
                "cannot rescale position {} s",
                seconds
            )));
        }

        let ticks = (seconds * self.denom as f64 / self.numer as f64).round();
        if ticks >= u64::MAX as f64 {
            return Err(DecodeError::Seek(format!(
                "position {} s overflows the stream time base",
                seconds
            )));
        }
        Ok(ticks as u64)
    }

    /// Convert timestamp ticks back to seconds.
    pub fn ticks_to_seconds(&self, ticks: u64) -> f64 {
        if self.denom == 0 {
            return 0.0;
        }
        ticks as f64 * self.numer as f64 / self.denom as f64
    }
}

/// Immutable description of the selected audio stream, derived once per
/// request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioStreamDescriptor {
    /// Index of the stream within the container
    pub stream_index: usize,
    /// Time base of the stream's packet timestamps
    pub time_base: TimeBase,
    /// Source sample rate in Hz (always > 0)
    pub sample_rate: u32,
    /// Source channel count (always >= 1)
    pub channel_count: usize,
    /// Native sample format, when the backend knows it before decoding
    pub sample_format: Option<SampleFormat>,
    /// Codec family
    pub codec: AudioCodec,
    /// Backend's short codec name (e.g. `"mp3"`, `"pcm_s16le"`)
    pub codec_name: String,
}

// ============================================================================
// Requests and Results
// ============================================================================

/// One bounded decode request.
#[derive(Debug, Clone)]
pub struct DecodeRequest {
    /// Encoded audio to decode
    pub source: AudioSource,
    /// Position to start decoding at, in seconds (>= 0)
    pub start_offset_seconds: f64,
    /// Maximum length to decode, in seconds; negative means "to the end"
    pub duration_seconds: f64,
    /// Output sample rate; `None` keeps the source rate
    pub target_sample_rate: Option<u32>,
}

impl DecodeRequest {
    /// Decode the whole source at its native rate.
    pub fn new(source: AudioSource) -> Self {
        Self {
            source,
            start_offset_seconds: 0.0,
            duration_seconds: -1.0,
            target_sample_rate: None,
        }
    }

    pub fn with_start(mut self, seconds: f64) -> Self {
        self.start_offset_seconds = seconds;
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    pub fn with_target_sample_rate(mut self, sample_rate: Option<u32>) -> Self {
        self.target_sample_rate = sample_rate;
        self
    }

    /// Returns `true` when a finite duration was requested.
    pub fn is_bounded(&self) -> bool {
        self.duration_seconds >= 0.0
    }

    /// Maximum number of output samples at `sample_rate`, or `None` when
    /// the request is unbounded.
    pub fn sample_budget(&self, sample_rate: u32) -> Option<usize> {
        if !self.is_bounded() {
            return None;
        }
        Some((self.duration_seconds * sample_rate as f64).ceil() as usize)
    }

    /// Reject parameters the pipeline cannot honour.
    pub fn validate(&self) -> Result<()> {
        if !self.start_offset_seconds.is_finite() || self.start_offset_seconds < 0.0 {
            return Err(DecodeError::InvalidRequest(format!(
                "start offset must be a finite number >= 0, got {}",
                self.start_offset_seconds
            )));
        }
        if self.duration_seconds.is_nan() || self.duration_seconds == f64::INFINITY {
            return Err(DecodeError::InvalidRequest(format!(
                "duration must be finite or negative, got {}",
                self.duration_seconds
            )));
        }
        if self.target_sample_rate == Some(0) {
            return Err(DecodeError::InvalidRequest(
                "target sample rate must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a decode request.
///
/// Callers must check [`DecodeResult::is_success`] before reading
/// `samples`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeResult {
    /// `0` on success, a negative [`DecodeError`] code otherwise
    pub status: StatusCode,
    /// Empty on success
    pub error_message: String,
    /// Rate of `samples` in Hz (0 when nothing was decoded)
    pub sample_rate: u32,
    /// Mono samples, each in `[-1.0, 1.0]`
    pub samples: Vec<f32>,
}

impl DecodeResult {
    pub fn success(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            status: StatusCode::OK,
            error_message: String::new(),
            sample_rate,
            samples,
        }
    }

    pub fn failure(err: &DecodeError) -> Self {
        Self {
            status: err.status_code(),
            error_message: err.to_string(),
            sample_rate: 0,
            samples: Vec::new(),
        }
    }

    /// Failure that keeps the samples decoded before the error.
    pub fn partial(err: &DecodeError, samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            status: err.status_code(),
            error_message: err.to_string(),
            sample_rate,
            samples,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_ok()
    }

    /// Number of decoded samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length of the decoded audio in seconds.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Stream properties reported without decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioProperties {
    pub status: StatusCode,
    pub error_message: String,
    /// Backend codec name (e.g. `"mp3"`)
    pub encoding: String,
    pub codec: AudioCodec,
    pub sample_rate: u32,
    pub channel_count: usize,
    /// Container duration in seconds, `0.0` when unknown
    pub duration_seconds: f64,
}

impl AudioProperties {
    pub fn from_descriptor(descriptor: &AudioStreamDescriptor, duration: Option<f64>) -> Self {
        Self {
            status: StatusCode::OK,
            error_message: String::new(),
            encoding: descriptor.codec_name.clone(),
            codec: descriptor.codec.clone(),
            sample_rate: descriptor.sample_rate,
            channel_count: descriptor.channel_count,
            duration_seconds: duration.unwrap_or(0.0),
        }
    }

    pub fn failure(err: &DecodeError) -> Self {
        Self {
            status: err.status_code(),
            error_message: err.to_string(),
            encoding: String::new(),
            codec: AudioCodec::Unknown,
            sample_rate: 0,
            channel_count: 0,
            duration_seconds: 0.0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_base_rescale() {
        let tb = TimeBase::new(1, 44100);
        assert_eq!(tb.seconds_to_ticks(0.0).unwrap(), 0);
        assert_eq!(tb.seconds_to_ticks(1.5).unwrap(), 66150);
        assert!((tb.ticks_to_seconds(22050) - 0.5).abs() < 1e-12);

        let mpeg = TimeBase::new(1, 90000);
        assert_eq!(mpeg.seconds_to_ticks(2.0).unwrap(), 180000);
    }

    #[test]
    fn test_time_base_rejects_bad_input() {
        assert!(TimeBase::new(0, 1).seconds_to_ticks(1.0).is_err());
        assert!(TimeBase::new(1, 48000).seconds_to_ticks(-1.0).is_err());
        assert!(TimeBase::new(1, 48000).seconds_to_ticks(f64::NAN).is_err());
    }

    #[test]
    fn test_lossless_codecs() {
        assert!(AudioCodec::Flac.is_lossless());
        assert!(AudioCodec::Pcm.is_lossless());
        assert!(!AudioCodec::Mp3.is_lossless());
        assert!(!AudioCodec::Other("wmav2".into()).is_lossless());
    }

    #[test]
    fn test_sample_budget() {
        let unbounded = DecodeRequest::new(AudioSource::file("a.wav"));
        assert_eq!(unbounded.sample_budget(44100), None);

        let bounded = unbounded.clone().with_duration(0.5);
        assert_eq!(bounded.sample_budget(44100), Some(22050));

        // Rounds up to the next whole sample
        let fractional = DecodeRequest::new(AudioSource::file("a.wav")).with_duration(0.00001);
        assert_eq!(fractional.sample_budget(44100), Some(1));

        let zero = DecodeRequest::new(AudioSource::file("a.wav")).with_duration(0.0);
        assert_eq!(zero.sample_budget(44100), Some(0));
    }

    #[test]
    fn test_request_validation() {
        let base = DecodeRequest::new(AudioSource::file("a.wav"));
        assert!(base.validate().is_ok());
        assert!(base.clone().with_start(-0.1).validate().is_err());
        assert!(base.clone().with_start(f64::NAN).validate().is_err());
        assert!(base.clone().with_duration(f64::NAN).validate().is_err());
        assert!(base.clone().with_target_sample_rate(Some(0)).validate().is_err());
        assert!(base.with_duration(-5.0).validate().is_ok());
    }

    #[test]
    fn test_result_constructors() {
        let ok = DecodeResult::success(vec![0.0, 0.5], 8000);
        assert!(ok.is_success());
        assert!(ok.error_message.is_empty());
        assert!((ok.duration_seconds() - 0.00025).abs() < 1e-12);

        let err = DecodeError::NoAudioStream("video.mkv".into());
        let failed = DecodeResult::failure(&err);
        assert!(!failed.is_success());
        assert!(failed.is_empty());
        assert_eq!(failed.status, err.status_code());
        assert!(!failed.error_message.is_empty());
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = DecodeResult::success(vec![0.25], 16000);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], 0);
        assert_eq!(json["errorMessage"], "");
        assert_eq!(json["sampleRate"], 16000);
    }

    #[test]
    fn test_sample_format_display() {
        assert_eq!(SampleFormat::planar(SampleEncoding::S16).to_string(), "S16p");
        assert_eq!(SampleFormat::interleaved(SampleEncoding::F32).to_string(), "F32");
        assert_eq!(SampleEncoding::S24.bytes_per_sample(), 3);
    }
}
