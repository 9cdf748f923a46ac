//! # Stream Opener
//!
//! Opens a source through a [`CodecBackend`], selects its best audio stream
//! and builds a decoder for it.
//!
//! The opened container and decoder are owned by [`OpenedStream`]. Dropping
//! it releases both exactly once, decoder first, on every exit path.

use crate::backend::{CodecBackend, MediaContainer, StreamDecoder};
use crate::error::{DecodeError, Result};
use crate::types::{AudioSource, AudioStreamDescriptor, TimeBase};
use tracing::{debug, error, trace};

/// An open container with a decoder bound to its selected audio stream.
pub struct OpenedStream {
    // Field order is drop order: the decoder goes before its container.
    decoder: Box<dyn StreamDecoder>,
    container: Box<dyn MediaContainer>,
    descriptor: AudioStreamDescriptor,
    duration_seconds: Option<f64>,
    label: String,
}

impl OpenedStream {
    pub fn descriptor(&self) -> &AudioStreamDescriptor {
        &self.descriptor
    }

    /// Container duration in seconds, if the container reports one.
    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration_seconds
    }

    /// Last valid timestamp of the selected stream, derived from the
    /// container duration.
    pub fn max_timestamp(&self) -> Option<u64> {
        self.duration_seconds
            .and_then(|seconds| self.descriptor.time_base.seconds_to_ticks(seconds).ok())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Container and decoder, borrowed together for the decode loop.
    pub fn parts_mut(&mut self) -> (&mut dyn MediaContainer, &mut dyn StreamDecoder) {
        (self.container.as_mut(), self.decoder.as_mut())
    }
}

impl Drop for OpenedStream {
    fn drop(&mut self) {
        trace!("Releasing decoder and container for {}", self.label);
    }
}

impl std::fmt::Debug for OpenedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedStream")
            .field("descriptor", &self.descriptor)
            .field("duration_seconds", &self.duration_seconds)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Opens sources and resolves their audio stream.
pub struct StreamOpener;

impl StreamOpener {
    /// Open `source` and prepare a decoder for its best audio stream.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::Open`] if the source is unreadable or unrecognised
    /// - [`DecodeError::Metadata`] if stream headers cannot be read, or the
    ///   stream reports no sample rate or channel count
    /// - [`DecodeError::NoAudioStream`] if there is no audio stream
    /// - [`DecodeError::UnsupportedCodec`] / [`DecodeError::DecoderInit`] if
    ///   no decoder can be built
    ///
    /// Anything allocated before a failure is released before returning.
    pub fn open(backend: &dyn CodecBackend, source: &AudioSource) -> Result<OpenedStream> {
        let label = source.describe();

        let mut container = backend.open(source)?;
        container.find_stream_info()?;

        let candidate = container.find_best_audio_stream()?;
        debug!(
            "Selected stream {} ({:?}) of {}",
            candidate.stream_index, candidate.codec, label
        );

        let decoder = container.open_decoder(candidate.stream_index)?;

        let sample_rate = decoder
            .sample_rate()
            .or(candidate.sample_rate)
            .filter(|&rate| rate > 0)
            .ok_or_else(|| {
                error!("Stream {} of {} has no sample rate", candidate.stream_index, label);
                DecodeError::Metadata(format!("{}: stream reports no sample rate", label))
            })?;

        let channel_count = decoder
            .channel_count()
            .or(candidate.channel_count)
            .filter(|&channels| channels > 0)
            .ok_or_else(|| {
                error!("Stream {} of {} has no channel layout", candidate.stream_index, label);
                DecodeError::Metadata(format!("{}: stream reports no channels", label))
            })?;

        let time_base = candidate
            .time_base
            .filter(|tb| tb.numer > 0 && tb.denom > 0)
            .unwrap_or_else(|| TimeBase::new(1, sample_rate));

        let descriptor = AudioStreamDescriptor {
            stream_index: candidate.stream_index,
            time_base,
            sample_rate,
            channel_count,
            sample_format: candidate.sample_format,
            codec: candidate.codec,
            codec_name: decoder.codec_name().to_string(),
        };

        debug!(
            "Opened {}: {} Hz, {} channel(s), codec {}",
            label, descriptor.sample_rate, descriptor.channel_count, descriptor.codec_name
        );

        Ok(OpenedStream {
            duration_seconds: container.duration_seconds(),
            decoder,
            container,
            descriptor,
            label,
        })
    }
}
