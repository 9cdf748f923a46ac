//! # Format Detection Module
//!
//! Probe hints and codec identification for the Symphonia backend.

use crate::types::{AudioCodec, AudioSource};
use std::path::Path;
use symphonia::core::codecs::CodecType;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Format detector for audio sources.
///
/// Builds hints for Symphonia's probe from file extensions and MIME types,
/// and maps Symphonia codec identifiers to [`AudioCodec`].
pub struct FormatDetector;

impl FormatDetector {
    /// Create a probe hint from file path.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_decode::FormatDetector;
    /// use std::path::Path;
    ///
    /// let hint = FormatDetector::hint_from_path(Path::new("/music/song.mp3"));
    /// // Hint will contain extension "mp3"
    /// ```
    pub fn hint_from_path(path: &Path) -> Hint {
        let mut hint = Hint::new();

        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            debug!("Setting probe hint extension: {}", extension);
            hint.with_extension(extension);
        } else {
            debug!("No file extension found, probe will auto-detect");
        }

        hint
    }

    /// Create a probe hint from MIME type (e.g. `"audio/mpeg"`).
    pub fn hint_from_mime_type(mime_type: &str) -> Hint {
        let mut hint = Hint::new();

        debug!("Creating probe hint from MIME type: {}", mime_type);
        hint.mime_type(mime_type);

        hint
    }

    /// Create the best available probe hint for a source.
    pub fn hint_from_source(source: &AudioSource) -> Hint {
        match source {
            AudioSource::LocalFile { path } => Self::hint_from_path(path),
            AudioSource::Memory {
                extension_hint: Some(ext),
                ..
            } if ext.contains('/') => Self::hint_from_mime_type(ext),
            AudioSource::Memory {
                extension_hint: Some(ext),
                ..
            } => {
                let mut hint = Hint::new();
                hint.with_extension(ext.trim_start_matches('.'));
                hint
            }
            AudioSource::Memory { .. } => Hint::new(),
        }
    }

    /// Map a Symphonia codec identifier to [`AudioCodec`].
    pub fn detect_codec(codec_type: CodecType) -> AudioCodec {
        use symphonia::core::codecs::*;

        if codec_type == CODEC_TYPE_NULL {
            AudioCodec::Unknown
        } else if codec_type == CODEC_TYPE_MP3
            || codec_type == CODEC_TYPE_MP2
            || codec_type == CODEC_TYPE_MP1
        {
            AudioCodec::Mp3
        } else if codec_type == CODEC_TYPE_AAC {
            AudioCodec::Aac
        } else if codec_type == CODEC_TYPE_FLAC {
            AudioCodec::Flac
        } else if codec_type == CODEC_TYPE_VORBIS {
            AudioCodec::Vorbis
        } else if codec_type == CODEC_TYPE_OPUS {
            AudioCodec::Opus
        } else if codec_type == CODEC_TYPE_ALAC {
            AudioCodec::Alac
        } else if Self::is_pcm(codec_type) {
            AudioCodec::Pcm
        } else {
            AudioCodec::Other(format!("{:?}", codec_type))
        }
    }

    fn is_pcm(codec_type: CodecType) -> bool {
        use symphonia::core::codecs::*;

        [
            CODEC_TYPE_PCM_U8,
            CODEC_TYPE_PCM_S8,
            CODEC_TYPE_PCM_S16LE,
            CODEC_TYPE_PCM_S16BE,
            CODEC_TYPE_PCM_U16LE,
            CODEC_TYPE_PCM_U16BE,
            CODEC_TYPE_PCM_S24LE,
            CODEC_TYPE_PCM_S24BE,
            CODEC_TYPE_PCM_U24LE,
            CODEC_TYPE_PCM_U24BE,
            CODEC_TYPE_PCM_S32LE,
            CODEC_TYPE_PCM_S32BE,
            CODEC_TYPE_PCM_U32LE,
            CODEC_TYPE_PCM_U32BE,
            CODEC_TYPE_PCM_F32LE,
            CODEC_TYPE_PCM_F32BE,
            CODEC_TYPE_PCM_F64LE,
            CODEC_TYPE_PCM_F64BE,
            CODEC_TYPE_PCM_ALAW,
            CODEC_TYPE_PCM_MULAW,
        ]
        .contains(&codec_type)
    }

    /// Common file extension for a codec, used to hint in-memory sources.
    pub fn codec_extension(codec: &AudioCodec) -> &'static str {
        match codec {
            AudioCodec::Mp3 => "mp3",
            AudioCodec::Aac => "m4a",
            AudioCodec::Flac => "flac",
            AudioCodec::Vorbis => "ogg",
            AudioCodec::Opus => "opus",
            AudioCodec::Pcm => "wav",
            AudioCodec::Alac => "m4a",
            AudioCodec::Unknown => "bin",
            AudioCodec::Other(_) => "bin",
        }
    }
}
