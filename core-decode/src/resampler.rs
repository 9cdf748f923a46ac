//! # Resampling Stage
//!
//! Optional stage that converts the normalized mono stream to a requested
//! output rate. The controller only builds one when the requested rate
//! differs from the source rate.

use crate::config::{Interpolation, ResamplerConfig};
use crate::error::{DecodeError, Result};
use rubato::{
    Resampler as _, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};
use tracing::debug;

/// Streaming mono sample-rate converter.
#[cfg_attr(test, mockall::automock)]
pub trait Resampler {
    /// Rate of the samples passed to [`Resampler::process`].
    fn input_rate(&self) -> u32;

    /// Rate of the samples returned.
    fn output_rate(&self) -> u32;

    /// Feed input samples, returning whatever output is ready.
    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>>;

    /// Drain buffered input at end of stream.
    fn flush(&mut self) -> Result<Vec<f32>>;
}

/// Windowed-sinc resampler backed by rubato's `SincFixedIn`.
///
/// Input is buffered into fixed-size chunks. The filter delay is trimmed
/// from the front of the output, and [`Resampler::flush`] pads the tail so
/// that exactly `round(input_len * output_rate / input_rate)` samples are
/// produced overall.
pub struct RubatoResampler {
    inner: SincFixedIn<f32>,
    input_rate: u32,
    output_rate: u32,
    pending: Vec<f32>,
    delay_remaining: usize,
    frames_in: u64,
    frames_out: u64,
}

impl RubatoResampler {
    pub fn new(input_rate: u32, output_rate: u32, config: &ResamplerConfig) -> Result<Self> {
        if input_rate == 0 || output_rate == 0 {
            return Err(DecodeError::Resample(format!(
                "invalid rates {} Hz -> {} Hz",
                input_rate, output_rate
            )));
        }

        let params = SincInterpolationParameters {
            sinc_len: config.sinc_len,
            f_cutoff: config.f_cutoff,
            interpolation: match config.interpolation {
                Interpolation::Nearest => SincInterpolationType::Nearest,
                Interpolation::Linear => SincInterpolationType::Linear,
                Interpolation::Quadratic => SincInterpolationType::Quadratic,
                Interpolation::Cubic => SincInterpolationType::Cubic,
            },
            oversampling_factor: config.oversampling_factor,
            window: WindowFunction::BlackmanHarris2,
        };

        let inner = SincFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0,
            params,
            config.chunk_frames,
            1,
        )
        .map_err(|e| DecodeError::Resample(format!("Failed to create resampler: {}", e)))?;

        let delay_remaining = inner.output_delay();

        Ok(Self {
            inner,
            input_rate,
            output_rate,
            pending: Vec::with_capacity(config.chunk_frames),
            delay_remaining,
            frames_in: 0,
            frames_out: 0,
        })
    }

    fn expected_output(&self) -> u64 {
        (self.frames_in as f64 * self.output_rate as f64 / self.input_rate as f64).round() as u64
    }

    fn emit(&mut self, mut channels: Vec<Vec<f32>>, dest: &mut Vec<f32>) {
        if channels.is_empty() {
            return;
        }
        let out = channels.swap_remove(0);
        let skip = self.delay_remaining.min(out.len());
        self.delay_remaining -= skip;
        self.frames_out += (out.len() - skip) as u64;
        // Sinc interpolation rings past full scale on steep edges.
        dest.extend(out[skip..].iter().map(|s| s.clamp(-1.0, 1.0)));
    }
}

impl Resampler for RubatoResampler {
    fn input_rate(&self) -> u32 {
        self.input_rate
    }

    fn output_rate(&self) -> u32 {
        self.output_rate
    }

    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        self.pending.extend_from_slice(input);
        self.frames_in += input.len() as u64;

        let mut output = Vec::new();
        loop {
            let needed = self.inner.input_frames_next();
            if self.pending.len() < needed {
                break;
            }
            let chunk: Vec<f32> = self.pending.drain(..needed).collect();
            let resampled = self
                .inner
                .process(std::slice::from_ref(&chunk), None)
                .map_err(|e| DecodeError::Resample(e.to_string()))?;
            self.emit(resampled, &mut output);
        }

        Ok(output)
    }

    fn flush(&mut self) -> Result<Vec<f32>> {
        let expected = self.expected_output();
        let mut output = Vec::new();

        if !self.pending.is_empty() {
            let tail = std::mem::take(&mut self.pending);
            let resampled = self
                .inner
                .process_partial(Some(std::slice::from_ref(&tail)), None)
                .map_err(|e| DecodeError::Resample(e.to_string()))?;
            self.emit(resampled, &mut output);
        }

        // Push silence through until the delayed tail has come out.
        while self.frames_out < expected {
            let before = self.frames_out;
            let resampled = self
                .inner
                .process_partial(None::<&[Vec<f32>]>, None)
                .map_err(|e| DecodeError::Resample(e.to_string()))?;
            self.emit(resampled, &mut output);
            if self.frames_out == before && self.delay_remaining == 0 {
                break;
            }
        }

        if self.frames_out > expected {
            let excess = (self.frames_out - expected) as usize;
            output.truncate(output.len().saturating_sub(excess));
            self.frames_out = expected;
        }

        debug!(
            "Resampler flushed: {} in, {} out",
            self.frames_in, self.frames_out
        );
        Ok(output)
    }
}
