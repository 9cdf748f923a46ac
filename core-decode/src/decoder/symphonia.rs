//! # Symphonia Backend Implementation
//!
//! Adapts Symphonia's probe, format reader and codec registry to the
//! backend traits.

use crate::backend::{
    CodecBackend, MediaContainer, Packet, RawFrame, ReceiveStatus, SendStatus, StreamCandidate,
    StreamDecoder,
};
use crate::decoder::format_detector::FormatDetector;
use crate::error::{DecodeError, Result};
use crate::normalizer::PcmSample;
use crate::types::{AudioSource, SampleEncoding, SampleFormat, TimeBase};
use std::io::{Cursor, ErrorKind};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::{Error as SymphoniaError, SeekErrorKind};
use symphonia::core::formats::{
    FormatOptions, FormatReader, Packet as SymphoniaPacket, SeekMode, SeekTo, Track,
};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::sample::{
    i24, u24, Sample, SampleFormat as SymphoniaSampleFormat,
};
use tracing::{debug, error, info, warn};

// ============================================================================
// Backend
// ============================================================================

/// Codec backend using Symphonia's default probe and codec registry.
///
/// Which containers and codecs are available depends on the crate's
/// `decoder-*` features.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaBackend {
    enable_gapless: bool,
}

impl SymphoniaBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trim encoder delay and padding where the container records them.
    pub fn with_gapless(mut self, enable: bool) -> Self {
        self.enable_gapless = enable;
        self
    }
}

impl CodecBackend for SymphoniaBackend {
    fn open(&self, source: &AudioSource) -> Result<Box<dyn MediaContainer>> {
        let label = source.describe();
        let hint = FormatDetector::hint_from_source(source);

        let media: Box<dyn MediaSource> = match source {
            AudioSource::LocalFile { path } => {
                let file = std::fs::File::open(path).map_err(|e| {
                    error!("Failed to open file {:?}: {}", path, e);
                    DecodeError::Open(format!("{}: {}", label, e))
                })?;
                Box::new(file)
            }
            AudioSource::Memory { data, .. } => Box::new(Cursor::new(data.clone())),
        };

        let stream = MediaSourceStream::new(media, Default::default());
        let format_options = FormatOptions {
            enable_gapless: self.enable_gapless,
            ..Default::default()
        };

        let probed = symphonia::default::get_probe()
            .format(&hint, stream, &format_options, &MetadataOptions::default())
            .map_err(|e| {
                error!("Format probe failed for {}: {}", label, e);
                DecodeError::Open(format!("{}: unrecognised container ({})", label, e))
            })?;

        info!("Opened {}", label);
        Ok(Box::new(SymphoniaContainer::new(probed.format, label)))
    }
}

// ============================================================================
// Container
// ============================================================================

/// An open Symphonia format reader.
pub struct SymphoniaContainer {
    reader: Box<dyn FormatReader>,
    label: String,
    /// Packets on this track ending at or before this timestamp are dropped
    /// after an accurate seek.
    skip_until: Option<(u32, u64)>,
    packets_read: u64,
    exhausted: bool,
}

impl SymphoniaContainer {
    fn new(reader: Box<dyn FormatReader>, label: String) -> Self {
        Self {
            reader,
            label,
            skip_until: None,
            packets_read: 0,
            exhausted: false,
        }
    }

    fn is_decodable_audio(track: &Track) -> bool {
        track.codec_params.codec != CODEC_TYPE_NULL && track.codec_params.sample_rate.is_some()
    }

    /// Default track when it is decodable audio, otherwise the first track
    /// that is.
    fn select_track(&self) -> Option<usize> {
        let tracks = self.reader.tracks();

        self.reader
            .default_track()
            .filter(|t| Self::is_decodable_audio(t))
            .and_then(|default| tracks.iter().position(|t| t.id == default.id))
            .or_else(|| tracks.iter().position(Self::is_decodable_audio))
    }

    fn track(&self, stream_index: usize) -> Result<&Track> {
        self.reader.tracks().get(stream_index).ok_or_else(|| {
            DecodeError::InvalidRequest(format!(
                "{} has no stream at index {}",
                self.label, stream_index
            ))
        })
    }

    /// Timestamp one past the last frame, when the track length is known.
    fn end_timestamp(track: &Track) -> Option<u64> {
        track
            .codec_params
            .n_frames
            .map(|frames| track.codec_params.start_ts + frames)
    }

    fn track_duration(track: &Track) -> Option<f64> {
        let params = &track.codec_params;
        let frames = params.n_frames?;

        match (params.time_base, params.sample_rate) {
            (Some(time_base), _) => {
                let time = time_base.calc_time(frames);
                Some(time.seconds as f64 + time.frac)
            }
            (None, Some(rate)) if rate > 0 => Some(frames as f64 / rate as f64),
            _ => None,
        }
    }
}

impl MediaContainer for SymphoniaContainer {
    fn find_stream_info(&mut self) -> Result<()> {
        let tracks = self.reader.tracks();
        if tracks.is_empty() {
            error!("{} exposes no streams", self.label);
            return Err(DecodeError::Metadata(format!(
                "{} exposes no streams",
                self.label
            )));
        }

        for (index, track) in tracks.iter().enumerate() {
            debug!(
                "Stream {}: codec {:?}, {:?} Hz, {:?} channels, {:?} frames",
                index,
                track.codec_params.codec,
                track.codec_params.sample_rate,
                track.codec_params.channels.map(|c| c.count()),
                track.codec_params.n_frames
            );
        }

        Ok(())
    }

    fn find_best_audio_stream(&self) -> Result<StreamCandidate> {
        let stream_index = self.select_track().ok_or_else(|| {
            error!("No decodable audio stream in {}", self.label);
            DecodeError::NoAudioStream(format!(
                "{} has {} stream(s), none of them decodable audio",
                self.label,
                self.reader.tracks().len()
            ))
        })?;

        let params = &self.reader.tracks()[stream_index].codec_params;
        Ok(StreamCandidate {
            stream_index,
            codec: FormatDetector::detect_codec(params.codec),
            time_base: params
                .time_base
                .map(|tb| TimeBase::new(tb.numer, tb.denom)),
            sample_rate: params.sample_rate,
            channel_count: params.channels.map(|c| c.count()),
            sample_format: params.sample_format.map(planar_format),
        })
    }

    fn open_decoder(&mut self, stream_index: usize) -> Result<Box<dyn StreamDecoder>> {
        let track = self.track(stream_index)?;
        let registry = symphonia::default::get_codecs();

        let descriptor = registry.get_codec(track.codec_params.codec).ok_or_else(|| {
            error!("No decoder registered for {:?}", track.codec_params.codec);
            DecodeError::UnsupportedCodec(format!(
                "no decoder for codec {:?} in this build",
                track.codec_params.codec
            ))
        })?;

        let decoder = registry
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| {
                error!("Failed to create {} decoder: {}", descriptor.short_name, e);
                DecodeError::DecoderInit(format!("{}: {}", descriptor.short_name, e))
            })?;

        debug!("Created {} decoder for stream {}", descriptor.short_name, stream_index);
        Ok(Box::new(SymphoniaStreamDecoder {
            decoder,
            track_id: track.id,
            codec_name: descriptor.short_name.to_string(),
            pending: None,
        }))
    }

    fn duration_seconds(&self) -> Option<f64> {
        let index = self.select_track()?;
        Self::track_duration(&self.reader.tracks()[index])
    }

    fn seek(&mut self, stream_index: usize, timestamp: u64) -> Result<()> {
        let track = self.track(stream_index)?;
        let track_id = track.id;
        let end = Self::end_timestamp(track);

        if timestamp == 0 && self.packets_read == 0 {
            return Ok(());
        }

        if matches!(end, Some(end) if timestamp >= end) {
            debug!("Seek to {} is at or past the end of {}", timestamp, self.label);
            self.exhausted = true;
            return Ok(());
        }

        match self.reader.seek(
            SeekMode::Accurate,
            SeekTo::TimeStamp {
                ts: timestamp,
                track_id,
            },
        ) {
            Ok(seeked) => {
                debug!(
                    "Seeked to {} (required {})",
                    seeked.actual_ts, seeked.required_ts
                );
                self.exhausted = false;
                self.skip_until = (seeked.required_ts > seeked.actual_ts)
                    .then_some((seeked.track_id, seeked.required_ts));
                Ok(())
            }
            Err(SymphoniaError::SeekError(SeekErrorKind::OutOfRange)) => {
                debug!("Seek to {} out of range, treating as end of input", timestamp);
                self.exhausted = true;
                Ok(())
            }
            // Readers without an index scan forward and run off the end
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                debug!("Seek to {} ran past the end of {}", timestamp, self.label);
                self.exhausted = true;
                Ok(())
            }
            Err(e) => {
                error!("Seek failed in {}: {}", self.label, e);
                Err(DecodeError::Seek(format!(
                    "{}: seek to {} failed: {}",
                    self.label, timestamp, e
                )))
            }
        }
    }

    fn read_packet(&mut self) -> Result<Option<Packet>> {
        if self.exhausted {
            return Ok(None);
        }

        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    debug!("End of input after {} packets", self.packets_read);
                    self.exhausted = true;
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    warn!("Track list of {} changed mid-stream, stopping", self.label);
                    self.exhausted = true;
                    return Ok(None);
                }
                Err(e) => {
                    error!("Failed to read packet from {}: {}", self.label, e);
                    return Err(DecodeError::PacketDecode(format!(
                        "{}: read failed: {}",
                        self.label, e
                    )));
                }
            };
            self.packets_read += 1;

            if let Some((track_id, required_ts)) = self.skip_until {
                if packet.track_id() == track_id {
                    if packet.ts() + packet.dur() <= required_ts {
                        continue;
                    }
                    self.skip_until = None;
                }
            }

            let stream_index = self
                .reader
                .tracks()
                .iter()
                .position(|t| t.id == packet.track_id())
                .unwrap_or(usize::MAX);

            return Ok(Some(Packet::new(
                stream_index,
                packet.ts(),
                packet.dur(),
                packet.data,
            )));
        }
    }
}

// ============================================================================
// Stream Decoder
// ============================================================================

/// Symphonia codec bound to one track.
///
/// Each accepted packet yields at most one frame, which is held until
/// [`StreamDecoder::receive_frame`] collects it.
pub struct SymphoniaStreamDecoder {
    decoder: Box<dyn Decoder>,
    track_id: u32,
    codec_name: String,
    pending: Option<RawFrame>,
}

impl StreamDecoder for SymphoniaStreamDecoder {
    fn codec_name(&self) -> &str {
        &self.codec_name
    }

    fn sample_rate(&self) -> Option<u32> {
        self.decoder.codec_params().sample_rate
    }

    fn channel_count(&self) -> Option<usize> {
        self.decoder.codec_params().channels.map(|c| c.count())
    }

    fn send_packet(&mut self, packet: Packet) -> Result<SendStatus> {
        if self.pending.is_some() {
            return Ok(SendStatus::TryAgain);
        }

        let packet = SymphoniaPacket::new_from_boxed_slice(
            self.track_id,
            packet.timestamp,
            packet.duration,
            packet.data,
        );

        match self.decoder.decode(&packet) {
            Ok(buffer) => {
                let frame = raw_frame_from(buffer)?;
                self.pending = Some(frame);
                Ok(SendStatus::Accepted)
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                Ok(SendStatus::EndOfStream)
            }
            Err(e) => {
                error!("{} decoder rejected packet at {}: {}", self.codec_name, packet.ts(), e);
                Err(DecodeError::PacketDecode(format!(
                    "{} packet at {}: {}",
                    self.codec_name,
                    packet.ts(),
                    e
                )))
            }
        }
    }

    fn receive_frame(&mut self) -> Result<ReceiveStatus> {
        Ok(match self.pending.take() {
            Some(frame) => ReceiveStatus::Frame(frame),
            None => ReceiveStatus::TryAgain,
        })
    }
}

// ============================================================================
// Buffer Conversion
// ============================================================================

/// Native format a Symphonia sample format arrives in after conversion.
fn planar_format(format: SymphoniaSampleFormat) -> SampleFormat {
    let encoding = match format {
        SymphoniaSampleFormat::U8 => SampleEncoding::U8,
        SymphoniaSampleFormat::S8 => SampleEncoding::S8,
        SymphoniaSampleFormat::U16 => SampleEncoding::U16,
        SymphoniaSampleFormat::S16 => SampleEncoding::S16,
        SymphoniaSampleFormat::U24 | SymphoniaSampleFormat::U32 => SampleEncoding::U32,
        SymphoniaSampleFormat::S24 | SymphoniaSampleFormat::S32 => SampleEncoding::S32,
        SymphoniaSampleFormat::F32 | SymphoniaSampleFormat::F64 => SampleEncoding::F32,
    };
    SampleFormat::planar(encoding)
}

fn raw_frame_from(buffer: AudioBufferRef<'_>) -> Result<RawFrame> {
    match buffer {
        AudioBufferRef::U8(buf) => copy_planes(&*buf),
        AudioBufferRef::S8(buf) => copy_planes(&*buf),
        AudioBufferRef::U16(buf) => copy_planes(&*buf),
        AudioBufferRef::S16(buf) => copy_planes(&*buf),
        AudioBufferRef::U32(buf) => copy_planes(&*buf),
        AudioBufferRef::S32(buf) => copy_planes(&*buf),
        AudioBufferRef::F32(buf) => copy_planes(&*buf),
        AudioBufferRef::U24(buf) => convert_planes(&*buf, |s: u24| s.inner() << 8),
        AudioBufferRef::S24(buf) => convert_planes(&*buf, |s: i24| s.inner() << 8),
        AudioBufferRef::F64(buf) => convert_planes(&*buf, |s: f64| s as f32),
    }
}

fn copy_planes<S: Sample + PcmSample>(buf: &AudioBuffer<S>) -> Result<RawFrame> {
    let planes: Vec<&[S]> = (0..buf.spec().channels.count())
        .map(|ch| buf.chan(ch))
        .collect();
    RawFrame::from_planar(&planes)
}

fn convert_planes<S, T, F>(buf: &AudioBuffer<S>, convert: F) -> Result<RawFrame>
where
    S: Sample,
    T: PcmSample,
    F: Fn(S) -> T,
{
    let owned: Vec<Vec<T>> = (0..buf.spec().channels.count())
        .map(|ch| buf.chan(ch).iter().map(|&s| convert(s)).collect())
        .collect();
    let planes: Vec<&[T]> = owned.iter().map(Vec::as_slice).collect();
    RawFrame::from_planar(&planes)
}
