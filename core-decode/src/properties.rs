//! # Audio Properties Query
//!
//! Reports a source's codec, sample rate, channel count and duration
//! without decoding any samples.

use crate::backend::CodecBackend;
use crate::opener::StreamOpener;
use crate::types::{AudioProperties, AudioSource};
use tracing::{debug, warn};

/// Open `source`, describe its selected audio stream, then release it.
///
/// Failures mirror [`StreamOpener::open`] and are reported through the
/// returned status and message.
pub fn query_properties(backend: &dyn CodecBackend, source: &AudioSource) -> AudioProperties {
    match StreamOpener::open(backend, source) {
        Ok(stream) => {
            let properties =
                AudioProperties::from_descriptor(stream.descriptor(), stream.duration_seconds());
            debug!(
                "Properties of {}: {} at {} Hz, {} channel(s), {:.3}s",
                stream.label(),
                properties.encoding,
                properties.sample_rate,
                properties.channel_count,
                properties.duration_seconds
            );
            properties
        }
        Err(err) => {
            warn!("Cannot read properties of {}: {}", source.describe(), err);
            AudioProperties::failure(&err)
        }
    }
}
