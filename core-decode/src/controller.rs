//! # Decode Controller
//!
//! Drives one decode request from open to teardown:
//!
//! ```text
//! Opening ─► Seeking ─► Decoding ─► Draining ─► Closed
//!    │          │           │           │
//!    └──────────┴───────────┴───────────┴─► Error ─► Closed
//! ```
//!
//! The opened container and decoder live in a single [`OpenedStream`]
//! scoped to the request, so they are released exactly once whichever
//! state the request ends in.

use crate::backend::{CodecBackend, RawFrame, ReceiveStatus, StreamDecoder};
use crate::config::{DecoderConfig, ResamplerConfig};
use crate::error::Result;
use crate::normalizer::SampleNormalizer;
use crate::opener::{OpenedStream, StreamOpener};
use crate::resampler::{Resampler, RubatoResampler};
use crate::types::{DecodeRequest, DecodeResult};
use tracing::{debug, error, trace, warn};

// ============================================================================
// State
// ============================================================================

/// Lifecycle state of a decode request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// Opening the source and its decoder.
    Opening,
    /// Positioning at the start offset.
    Seeking,
    /// Reading packets and collecting samples.
    Decoding,
    /// Input finished or budget reached; finalizing the result.
    Draining,
    /// Resources released.
    Closed,
    /// Request failed.
    Error,
}

impl DecodeState {
    /// Returns `true` while backend resources may be held.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Opening | Self::Seeking | Self::Decoding | Self::Draining
        )
    }

    /// Returns `true` once the request has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Counters for the last request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeStats {
    /// Packets read from the container, any stream.
    pub packets_read: u64,
    /// Packets dropped because they belong to another stream.
    pub packets_skipped: u64,
    /// Submissions the decoder answered with a transient signal.
    pub packets_deferred: u64,
    /// Frames received from the decoder.
    pub frames_decoded: u64,
    /// Samples before budget truncation.
    pub samples_produced: u64,
    /// Whether decoding stopped because the sample budget was reached.
    pub budget_reached: bool,
}

/// Builds a resampler for `(source_rate, target_rate)`.
pub type ResamplerFactory<'a> =
    Box<dyn Fn(u32, u32, &ResamplerConfig) -> Result<Box<dyn Resampler>> + 'a>;

fn rubato_factory(
    source_rate: u32,
    target_rate: u32,
    config: &ResamplerConfig,
) -> Result<Box<dyn Resampler>> {
    Ok(Box::new(RubatoResampler::new(source_rate, target_rate, config)?))
}

// ============================================================================
// Controller
// ============================================================================

/// Runs decode requests against a backend.
///
/// # Example
///
/// ```rust,no_run
/// use core_decode::{AudioSource, DecodeController, DecodeRequest, DecoderConfig, SymphoniaBackend};
///
/// let backend = SymphoniaBackend::new();
/// let config = DecoderConfig::default();
/// let mut controller = DecodeController::new(&backend, &config);
///
/// let request = DecodeRequest::new(AudioSource::file("/music/song.flac"))
///     .with_start(30.0)
///     .with_duration(5.0);
/// let result = controller.run(&request);
/// if result.is_success() {
///     println!("{} samples at {} Hz", result.len(), result.sample_rate);
/// }
/// ```
pub struct DecodeController<'a> {
    backend: &'a dyn CodecBackend,
    config: &'a DecoderConfig,
    make_resampler: ResamplerFactory<'a>,
    state: DecodeState,
    history: Vec<DecodeState>,
    stats: DecodeStats,
}

impl<'a> DecodeController<'a> {
    pub fn new(backend: &'a dyn CodecBackend, config: &'a DecoderConfig) -> Self {
        Self {
            backend,
            config,
            make_resampler: Box::new(rubato_factory),
            state: DecodeState::Closed,
            history: Vec::new(),
            stats: DecodeStats::default(),
        }
    }

    /// Replace the resampler used when the output rate differs from the
    /// source rate.
    pub fn with_resampler_factory(mut self, factory: ResamplerFactory<'a>) -> Self {
        self.make_resampler = factory;
        self
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// States visited by the last request, in order.
    pub fn history(&self) -> &[DecodeState] {
        &self.history
    }

    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    /// Run one request to completion.
    ///
    /// Never fails: errors are reported through the result's status and
    /// message. Samples decoded before a mid-stream error are dropped
    /// unless [`DecoderConfig::preserve_partial_on_error`] is set.
    pub fn run(&mut self, request: &DecodeRequest) -> DecodeResult {
        self.history.clear();
        self.stats = DecodeStats::default();
        self.transition(DecodeState::Opening);

        let mut samples = Vec::new();
        let mut output_rate = 0;
        let outcome = self.execute(request, &mut samples, &mut output_rate);

        let result = match outcome {
            Ok(()) => DecodeResult::success(samples, output_rate),
            Err(err) => {
                error!("Decoding {} failed: {}", request.source.describe(), err);
                self.transition(DecodeState::Error);
                if self.config.preserve_partial_on_error && err.is_decode_error() {
                    DecodeResult::partial(&err, samples, output_rate)
                } else {
                    DecodeResult::failure(&err)
                }
            }
        };

        self.transition(DecodeState::Closed);
        result
    }

    fn transition(&mut self, next: DecodeState) {
        debug!("Decode state: {:?} -> {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    /// Everything from opening to the end of draining. The opened stream is
    /// dropped on return, before the caller moves to `Closed`.
    fn execute(
        &mut self,
        request: &DecodeRequest,
        samples: &mut Vec<f32>,
        output_rate: &mut u32,
    ) -> Result<()> {
        request.validate()?;
        let mut stream = StreamOpener::open(self.backend, &request.source)?;

        self.transition(DecodeState::Seeking);
        Self::seek_to_start(&mut stream, request.start_offset_seconds)?;

        let source_rate = stream.descriptor().sample_rate;
        let target_rate = request
            .target_sample_rate
            .or(self.config.target_sample_rate)
            .filter(|&rate| rate != source_rate);
        let mut resampler = match target_rate {
            Some(rate) => {
                debug!("Resampling {} Hz -> {} Hz", source_rate, rate);
                Some((self.make_resampler)(source_rate, rate, &self.config.resampler)?)
            }
            None => None,
        };

        *output_rate = resampler
            .as_ref()
            .map_or(source_rate, |r| r.output_rate());
        let budget = request.sample_budget(*output_rate);

        self.transition(DecodeState::Decoding);
        self.decode_loop(&mut stream, &mut resampler, budget, samples)?;

        self.transition(DecodeState::Draining);
        if let Some(resampler) = resampler.as_mut() {
            samples.extend(resampler.flush()?);
        }
        self.stats.samples_produced = samples.len() as u64;
        if let Some(budget) = budget {
            samples.truncate(budget);
        }

        debug!(
            "Decoded {} samples at {} Hz from {}",
            samples.len(),
            output_rate,
            stream.label()
        );
        Ok(())
    }

    fn seek_to_start(stream: &mut OpenedStream, start_seconds: f64) -> Result<()> {
        let stream_index = stream.descriptor().stream_index;
        let mut timestamp = stream.descriptor().time_base.seconds_to_ticks(start_seconds)?;

        if let Some(max) = stream.max_timestamp() {
            if timestamp > max {
                warn!(
                    "Start offset {}s is past the end of {}, clamping to {:.3}s",
                    start_seconds,
                    stream.label(),
                    stream.descriptor().time_base.ticks_to_seconds(max)
                );
                timestamp = max;
            }
        }

        let (container, _) = stream.parts_mut();
        container.seek(stream_index, timestamp)
    }

    fn decode_loop(
        &mut self,
        stream: &mut OpenedStream,
        resampler: &mut Option<Box<dyn Resampler>>,
        budget: Option<usize>,
        samples: &mut Vec<f32>,
    ) -> Result<()> {
        let stream_index = stream.descriptor().stream_index;
        let (container, decoder) = stream.parts_mut();
        let mut scratch = Vec::new();

        while let Some(packet) = container.read_packet()? {
            self.stats.packets_read += 1;

            if packet.stream_index != stream_index {
                self.stats.packets_skipped += 1;
                continue;
            }

            let status = decoder.send_packet(packet)?;
            if status.is_transient() {
                trace!("Decoder deferred packet: {:?}", status);
                self.stats.packets_deferred += 1;
            }

            self.drain_frames(decoder, resampler, &mut scratch, samples)?;

            if let Some(budget) = budget {
                if samples.len() >= budget {
                    debug!("Sample budget of {} reached", budget);
                    self.stats.budget_reached = true;
                    return Ok(());
                }
            }
        }

        debug!("End of input after {} packets", self.stats.packets_read);
        Ok(())
    }

    fn drain_frames(
        &mut self,
        decoder: &mut dyn StreamDecoder,
        resampler: &mut Option<Box<dyn Resampler>>,
        scratch: &mut Vec<f32>,
        samples: &mut Vec<f32>,
    ) -> Result<()> {
        loop {
            let frame = match decoder.receive_frame()? {
                ReceiveStatus::Frame(frame) => frame,
                ReceiveStatus::TryAgain | ReceiveStatus::EndOfStream => return Ok(()),
            };
            self.stats.frames_decoded += 1;
            Self::append(&frame, resampler, scratch, samples)?;
        }
    }

    fn append(
        frame: &RawFrame,
        resampler: &mut Option<Box<dyn Resampler>>,
        scratch: &mut Vec<f32>,
        samples: &mut Vec<f32>,
    ) -> Result<()> {
        match resampler {
            Some(resampler) => {
                scratch.clear();
                SampleNormalizer::normalize_into(frame, scratch)?;
                samples.extend(resampler.process(scratch)?);
            }
            None => {
                SampleNormalizer::normalize_into(frame, samples)?;
            }
        }
        Ok(())
    }
}
