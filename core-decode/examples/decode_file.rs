//! # Decode a File
//!
//! Prints the properties of an audio file, then decodes a window of it and
//! reports simple level statistics.
//!
//! Run with:
//! ```bash
//! cargo run --example decode_file --package core-decode -- song.flac
//!
//! # 2.5 seconds starting at 30s, resampled to 16 kHz, JSON logs
//! cargo run --example decode_file --package core-decode -- song.flac 30 2.5 16000 json
//! ```

use anyhow::{bail, Context};
use core_decode::{decode_with, get_properties, AudioSource, DecodeRequest, DecoderConfig, SymphoniaBackend};
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
use std::env;
use tracing::info;

fn parse_arg<T: std::str::FromStr>(args: &[String], index: usize, name: &str) -> anyhow::Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    args.get(index)
        .map(|raw| raw.parse::<T>().with_context(|| format!("invalid {}: {}", name, raw)))
        .transpose()
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(path) = args.first() else {
        bail!("usage: decode_file <path> [start] [duration] [rate] [pretty|json|compact]");
    };

    let start = parse_arg::<f64>(&args, 1, "start")?.unwrap_or(0.0);
    let duration = parse_arg::<f64>(&args, 2, "duration")?.unwrap_or(-1.0);
    let rate = parse_arg::<u32>(&args, 3, "rate")?;
    let format = match args.get(4).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        _ => LogFormat::Pretty,
    };

    init_logging(
        LoggingConfig::default()
            .with_format(format)
            .with_level(LogLevel::Debug),
    )?;

    let properties = get_properties(path);
    if !properties.is_success() {
        bail!(
            "cannot read {} (status {}): {}",
            path,
            properties.status,
            properties.error_message
        );
    }
    info!(
        codec = %properties.encoding,
        lossless = properties.codec.is_lossless(),
        sample_rate = properties.sample_rate,
        channels = properties.channel_count,
        duration = properties.duration_seconds,
        "Properties"
    );

    let request = DecodeRequest::new(AudioSource::file(path))
        .with_start(start)
        .with_duration(duration)
        .with_target_sample_rate(rate);
    let backend = SymphoniaBackend::new().with_gapless(true);
    let result = decode_with(&backend, &DecoderConfig::default(), &request);
    if !result.is_success() {
        bail!("decode failed (status {}): {}", result.status, result.error_message);
    }

    let peak = result.samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
    let rms = if result.is_empty() {
        0.0
    } else {
        (result.samples.iter().map(|s| s * s).sum::<f32>() / result.len() as f32).sqrt()
    };

    println!(
        "{} samples at {} Hz ({:.3}s), peak {:.3}, rms {:.3}",
        result.len(),
        result.sample_rate,
        result.duration_seconds(),
        peak,
        rms
    );
    Ok(())
}
