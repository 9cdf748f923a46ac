//! # Codec Backend Capability
//!
//! The pipeline never talks to a container parser or codec directly. It
//! drives three object-safe traits instead:
//!
//! ```text
//! CodecBackend::open ─► MediaContainer ─► read_packet ─► StreamDecoder
//!                           │  seek                     send_packet / receive_frame
//!                           └─ find_best_audio_stream         │
//!                                                             ▼
//!                                                          RawFrame
//! ```
//!
//! [`crate::decoder::SymphoniaBackend`] is the default implementation.
//! Tests plug in scripted fakes.

use crate::error::{DecodeError, Result};
use crate::normalizer::PcmSample;
use crate::types::{AudioCodec, AudioSource, SampleFormat, SampleLayout, TimeBase};

/// Opens media sources.
pub trait CodecBackend {
    /// Open `source` as a container. Fails with [`DecodeError::Open`].
    fn open(&self, source: &AudioSource) -> Result<Box<dyn MediaContainer>>;
}

/// An open container. Dropping it releases the underlying source.
pub trait MediaContainer {
    /// Read stream headers. Fails with [`DecodeError::Metadata`].
    fn find_stream_info(&mut self) -> Result<()>;

    /// Pick the best audio stream. Fails with [`DecodeError::NoAudioStream`].
    fn find_best_audio_stream(&self) -> Result<StreamCandidate>;

    /// Build a decoder for the stream at `stream_index`. Fails with
    /// [`DecodeError::UnsupportedCodec`] or [`DecodeError::DecoderInit`].
    fn open_decoder(&mut self, stream_index: usize) -> Result<Box<dyn StreamDecoder>>;

    /// Container duration in seconds, if known.
    fn duration_seconds(&self) -> Option<f64>;

    /// Reposition reading at `timestamp` (in the stream's time base).
    /// Fails with [`DecodeError::Seek`].
    fn seek(&mut self, stream_index: usize, timestamp: u64) -> Result<()>;

    /// Next compressed packet from any stream, or `None` at end of input.
    fn read_packet(&mut self) -> Result<Option<Packet>>;
}

/// A codec instance bound to one stream. Dropping it releases the codec
/// context.
pub trait StreamDecoder {
    /// Backend short name of the codec (e.g. `"flac"`).
    fn codec_name(&self) -> &str;

    /// Sample rate the decoder will produce, if known before decoding.
    fn sample_rate(&self) -> Option<u32>;

    /// Channel count the decoder will produce, if known before decoding.
    fn channel_count(&self) -> Option<usize>;

    /// Submit one compressed packet.
    fn send_packet(&mut self, packet: Packet) -> Result<SendStatus>;

    /// Pull the next decoded frame, if one is ready.
    fn receive_frame(&mut self) -> Result<ReceiveStatus>;
}

/// Stream chosen by the backend's selection heuristic.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamCandidate {
    pub stream_index: usize,
    pub codec: AudioCodec,
    pub time_base: Option<TimeBase>,
    pub sample_rate: Option<u32>,
    pub channel_count: Option<usize>,
    pub sample_format: Option<SampleFormat>,
}

/// Non-fatal outcome of [`StreamDecoder::send_packet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// Packet consumed; frames may now be available.
    Accepted,
    /// Decoder is full; drain frames and try again later.
    TryAgain,
    /// Decoder has been flushed and takes no more input.
    EndOfStream,
}

impl SendStatus {
    /// Returns `true` for the "no progress this round" signals.
    pub fn is_transient(&self) -> bool {
        !matches!(self, SendStatus::Accepted)
    }
}

/// Non-fatal outcome of [`StreamDecoder::receive_frame`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiveStatus {
    /// One decoded frame.
    Frame(RawFrame),
    /// No more output until another packet is sent.
    TryAgain,
    /// Decoder fully drained.
    EndOfStream,
}

/// One compressed unit of stream data.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Stream this packet belongs to
    pub stream_index: usize,
    /// Presentation timestamp in the stream's time base
    pub timestamp: u64,
    /// Duration in the stream's time base
    pub duration: u64,
    /// Encoded payload
    pub data: Box<[u8]>,
}

impl Packet {
    pub fn new(stream_index: usize, timestamp: u64, duration: u64, data: impl Into<Box<[u8]>>) -> Self {
        Self {
            stream_index,
            timestamp,
            duration,
            data: data.into(),
        }
    }
}

/// One decoded frame of raw samples in the codec's native format.
///
/// Planes hold native-endian bytes: a single plane for interleaved
/// layouts, one plane per channel for planar layouts. Construction checks
/// that the planes are large enough for `frames` samples per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    format: SampleFormat,
    channels: usize,
    frames: usize,
    planes: Vec<Vec<u8>>,
}

impl RawFrame {
    /// Build a frame from raw planes.
    ///
    /// Fails with [`DecodeError::FrameDecode`] if `channels` is zero or the
    /// plane count/sizes do not match the format.
    pub fn new(
        format: SampleFormat,
        channels: usize,
        frames: usize,
        planes: Vec<Vec<u8>>,
    ) -> Result<Self> {
        if channels == 0 {
            return Err(DecodeError::FrameDecode(
                "frame reports zero channels".to_string(),
            ));
        }

        let width = format.encoding.bytes_per_sample();
        let (expected_planes, samples_per_plane) = match format.layout {
            SampleLayout::Interleaved => (1, frames * channels),
            SampleLayout::Planar => (channels, frames),
        };

        if planes.len() != expected_planes {
            return Err(DecodeError::FrameDecode(format!(
                "{} frame with {} channels needs {} plane(s), got {}",
                format,
                channels,
                expected_planes,
                planes.len()
            )));
        }

        if let Some(short) = planes.iter().find(|p| p.len() < samples_per_plane * width) {
            return Err(DecodeError::FrameDecode(format!(
                "plane holds {} bytes, {} frames of {} need {}",
                short.len(),
                frames,
                format,
                samples_per_plane * width
            )));
        }

        Ok(Self {
            format,
            channels,
            frames,
            planes,
        })
    }

    /// Build an interleaved frame from typed samples.
    pub fn from_interleaved<T: PcmSample>(channels: usize, samples: &[T]) -> Result<Self> {
        let frames = if channels == 0 { 0 } else { samples.len() / channels };
        Self::new(
            SampleFormat::interleaved(T::ENCODING),
            channels,
            frames,
            vec![bytemuck::cast_slice(samples).to_vec()],
        )
    }

    /// Build a planar frame from one typed slice per channel.
    pub fn from_planar<T: PcmSample>(planes: &[&[T]]) -> Result<Self> {
        let frames = planes.iter().map(|p| p.len()).min().unwrap_or(0);
        Self::new(
            SampleFormat::planar(T::ENCODING),
            planes.len(),
            frames,
            planes
                .iter()
                .map(|p| bytemuck::cast_slice(&p[..frames]).to_vec())
                .collect(),
        )
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn planes(&self) -> &[Vec<u8>] {
        &self.planes
    }
}
