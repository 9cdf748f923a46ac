//! # Public Entry Points
//!
//! Value-returning functions for embedding hosts, plus [`AudioFileDecoder`]
//! for decoding several windows of the same source.
//!
//! None of these return `Err`: failures come back as a nonzero
//! [`StatusCode`](crate::StatusCode) with a message, and callers check
//! `is_success()` before reading samples.

use crate::backend::CodecBackend;
use crate::config::DecoderConfig;
use crate::controller::DecodeController;
use crate::decoder::SymphoniaBackend;
use crate::error::{DecodeError, Result};
use crate::opener::StreamOpener;
use crate::properties::query_properties;
use crate::types::{AudioProperties, AudioSource, DecodeRequest, DecodeResult};
use core_runtime::logging::strip_path;
use std::path::Path;
use tracing::{info, instrument};

/// File name only, for log fields.
fn file_label(path: &Path) -> String {
    strip_path(&path.to_string_lossy()).to_string()
}

/// Decode a file to mono samples in `[-1.0, 1.0]` at its native rate.
///
/// `duration < 0.0` decodes to the end of the stream. A `start` past the
/// end of the stream yields an empty successful result.
///
/// # Example
///
/// ```rust,no_run
/// let result = core_decode::decode_audio("/music/song.mp3", 10.0, 2.5);
/// if result.is_success() {
///     println!("{} samples at {} Hz", result.len(), result.sample_rate);
/// } else {
///     eprintln!("decode failed ({}): {}", result.status, result.error_message);
/// }
/// ```
#[instrument(skip(path), fields(file = %file_label(path.as_ref())))]
pub fn decode_audio(path: impl AsRef<Path>, start: f64, duration: f64) -> DecodeResult {
    let request = DecodeRequest::new(AudioSource::file(path.as_ref()))
        .with_start(start)
        .with_duration(duration);
    decode_with(&SymphoniaBackend::new(), &DecoderConfig::default(), &request)
}

/// Report codec name, sample rate, channel count and duration of a file
/// without decoding it.
#[instrument(skip(path), fields(file = %file_label(path.as_ref())))]
pub fn get_properties(path: impl AsRef<Path>) -> AudioProperties {
    query_properties(&SymphoniaBackend::new(), &AudioSource::file(path.as_ref()))
}

/// Run `request` against any backend and configuration.
pub fn decode_with(
    backend: &dyn CodecBackend,
    config: &DecoderConfig,
    request: &DecodeRequest,
) -> DecodeResult {
    if let Err(message) = config.validate() {
        return DecodeResult::failure(&DecodeError::InvalidRequest(message));
    }
    DecodeController::new(backend, config).run(request)
}

/// A source opened once, with its properties cached, serving repeated
/// decode windows.
///
/// Every call to [`AudioFileDecoder::decode`] is an independent request
/// that opens and releases its own backend resources.
///
/// # Example
///
/// ```rust,no_run
/// use core_decode::AudioFileDecoder;
///
/// # fn main() -> core_decode::Result<()> {
/// let decoder = AudioFileDecoder::open("/music/podcast.ogg")?;
/// let rate = decoder.properties().sample_rate;
///
/// for minute in 0..3 {
///     let window = decoder.decode(minute as f64 * 60.0, 1.0);
///     println!("minute {}: {} samples at {} Hz", minute, window.len(), rate);
/// }
/// # Ok(())
/// # }
/// ```
pub struct AudioFileDecoder {
    source: AudioSource,
    config: DecoderConfig,
    backend: Box<dyn CodecBackend>,
    properties: AudioProperties,
}

impl AudioFileDecoder {
    /// Open a local file with the default backend and configuration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_source(AudioSource::file(path.as_ref()), DecoderConfig::default())
    }

    /// Open any source with the default backend.
    pub fn from_source(source: AudioSource, config: DecoderConfig) -> Result<Self> {
        Self::with_backend(source, config, Box::new(SymphoniaBackend::new()))
    }

    /// Open `source` with an explicit backend.
    ///
    /// # Errors
    ///
    /// [`DecodeError::InvalidRequest`] for an invalid configuration, or any
    /// error [`StreamOpener::open`] reports for the source.
    pub fn with_backend(
        source: AudioSource,
        config: DecoderConfig,
        backend: Box<dyn CodecBackend>,
    ) -> Result<Self> {
        config.validate().map_err(DecodeError::InvalidRequest)?;

        let properties = {
            let stream = StreamOpener::open(backend.as_ref(), &source)?;
            AudioProperties::from_descriptor(stream.descriptor(), stream.duration_seconds())
        };

        info!(
            "Opened {}: {} {} Hz x{}",
            source.describe(),
            properties.encoding,
            properties.sample_rate,
            properties.channel_count
        );

        Ok(Self {
            source,
            config,
            backend,
            properties,
        })
    }

    pub fn properties(&self) -> &AudioProperties {
        &self.properties
    }

    pub fn source(&self) -> &AudioSource {
        &self.source
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode `duration` seconds from `start` (negative duration: to the
    /// end).
    pub fn decode(&self, start: f64, duration: f64) -> DecodeResult {
        self.run(
            DecodeRequest::new(self.source.clone())
                .with_start(start)
                .with_duration(duration),
        )
    }

    /// Decode the whole source.
    pub fn decode_all(&self) -> DecodeResult {
        self.run(DecodeRequest::new(self.source.clone()))
    }

    /// Decode a window resampled to `sample_rate`.
    pub fn decode_resampled(&self, start: f64, duration: f64, sample_rate: u32) -> DecodeResult {
        self.run(
            DecodeRequest::new(self.source.clone())
                .with_start(start)
                .with_duration(duration)
                .with_target_sample_rate(Some(sample_rate)),
        )
    }

    fn run(&self, request: DecodeRequest) -> DecodeResult {
        DecodeController::new(self.backend.as_ref(), &self.config).run(&request)
    }
}

impl std::fmt::Debug for AudioFileDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFileDecoder")
            .field("source", &self.source.describe())
            .field("config", &self.config)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBackend, Script};

    #[test]
    fn test_decode_with_rejects_invalid_config() {
        let backend = FakeBackend::new(Script::mono_f32(1, 10));
        let config = DecoderConfig::default().with_target_sample_rate(0);

        let result = decode_with(&backend, &config, &DecodeRequest::new(AudioSource::file("a.wav")));

        assert_eq!(result.status.0, -11);
        assert_eq!(backend.tracker.containers_opened.get(), 0);
    }

    #[test]
    fn test_file_decoder_caches_properties() {
        let backend = FakeBackend::new(Script::mono_f32(10, 100));
        let tracker = backend.tracker.clone();

        let decoder = AudioFileDecoder::with_backend(
            AudioSource::file("a.wav"),
            DecoderConfig::default(),
            Box::new(backend),
        )
        .unwrap();

        assert_eq!(decoder.properties().sample_rate, 1000);
        assert_eq!(decoder.properties().duration_seconds, 1.0);
        assert_eq!(tracker.containers_opened.get(), 1);
        assert!(tracker.all_released());

        let first = decoder.decode(0.0, 0.2);
        let second = decoder.decode(0.5, -1.0);
        assert_eq!(first.len(), 200);
        assert_eq!(second.len(), 500);
        assert_eq!(decoder.decode_all().len(), 1000);
        assert_eq!(tracker.containers_opened.get(), 4);
        assert!(tracker.all_released());
    }

    #[test]
    fn test_file_decoder_open_failure() {
        let backend = FakeBackend::new(Script {
            has_audio: false,
            ..Default::default()
        });

        let err = AudioFileDecoder::with_backend(
            AudioSource::file("video.mp4"),
            DecoderConfig::default(),
            Box::new(backend),
        )
        .unwrap_err();

        assert!(matches!(err, DecodeError::NoAudioStream(_)));
    }

    #[test]
    fn test_file_label_strips_directories() {
        assert_eq!(file_label(Path::new("/home/someone/Music/song.mp3")), "song.mp3");
    }
}
