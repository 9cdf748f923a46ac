//! # Sample Normalizer
//!
//! Collapses one decoded frame of any supported integer or float encoding,
//! planar or interleaved, into unit-range mono `f32` samples.
//!
//! Integer samples are centred on their zero offset (the midpoint for
//! unsigned encodings, `0` for signed ones), scaled by the distance from
//! that offset to the largest representable value, then averaged across
//! channels. Float samples skip the centring and scaling.

use crate::backend::RawFrame;
use crate::error::{DecodeError, Result};
use crate::types::{SampleEncoding, SampleLayout};
use bytemuck::Pod;
use std::mem::size_of;

/// A raw sample type the normalizer can read.
pub trait PcmSample: Pod {
    /// Encoding tag matching this type.
    const ENCODING: SampleEncoding;

    /// Raw value that represents silence.
    const ZERO_OFFSET: f64;

    /// Distance from [`PcmSample::ZERO_OFFSET`] to the largest value.
    const FULL_SCALE: f64;

    fn to_f64(self) -> f64;
}

macro_rules! impl_integer_sample {
    ($($ty:ty => $encoding:ident),* $(,)?) => {
        $(
            impl PcmSample for $ty {
                const ENCODING: SampleEncoding = SampleEncoding::$encoding;
                const ZERO_OFFSET: f64 = if <$ty>::MIN == 0 {
                    (<$ty>::MAX / 2 + 1) as f64
                } else {
                    0.0
                };
                const FULL_SCALE: f64 = <$ty>::MAX as f64 - Self::ZERO_OFFSET;

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_integer_sample! {
    u8 => U8,
    i8 => S8,
    u16 => U16,
    i16 => S16,
    u32 => U32,
    i32 => S32,
}

impl PcmSample for f32 {
    const ENCODING: SampleEncoding = SampleEncoding::F32;
    const ZERO_OFFSET: f64 = 0.0;
    const FULL_SCALE: f64 = 1.0;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
}

/// Converts raw decoded frames into mono unit-range floats.
pub struct SampleNormalizer;

impl SampleNormalizer {
    /// Normalize one frame into a new vector of `frame.frames()` samples.
    ///
    /// NaN float samples contribute silence (`0.0`) to the mix.
    ///
    /// # Errors
    ///
    /// [`DecodeError::UnsupportedSampleFormat`] for encodings outside
    /// {8, 16, 32-bit integer, 32-bit float}.
    pub fn normalize(frame: &RawFrame) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(frame.frames());
        Self::normalize_into(frame, &mut out)?;
        Ok(out)
    }

    /// Normalize one frame, appending to `dest`. Returns the number of
    /// samples appended.
    pub fn normalize_into(frame: &RawFrame, dest: &mut Vec<f32>) -> Result<usize> {
        match frame.format().encoding {
            SampleEncoding::U8 => mix_down::<u8>(frame, dest),
            SampleEncoding::S8 => mix_down::<i8>(frame, dest),
            SampleEncoding::U16 => mix_down::<u16>(frame, dest),
            SampleEncoding::S16 => mix_down::<i16>(frame, dest),
            SampleEncoding::U32 => mix_down::<u32>(frame, dest),
            SampleEncoding::S32 => mix_down::<i32>(frame, dest),
            SampleEncoding::F32 => mix_down::<f32>(frame, dest),
            SampleEncoding::S24 | SampleEncoding::F64 => {
                return Err(DecodeError::UnsupportedSampleFormat(
                    frame.format().to_string(),
                ))
            }
        }
        Ok(frame.frames())
    }
}

/// Per-channel contribution of one raw sample, clamped to the unit range.
#[inline]
fn unit_term<T: PcmSample>(raw: T) -> f64 {
    let term = (raw.to_f64() - T::ZERO_OFFSET) / T::FULL_SCALE;
    if term.is_nan() {
        return 0.0;
    }
    // The most negative integer sits one step below -FULL_SCALE.
    term.clamp(-1.0, 1.0)
}

fn mix_down<T: PcmSample>(frame: &RawFrame, dest: &mut Vec<f32>) {
    let channels = frame.channels();
    let width = size_of::<T>();
    let planes = frame.planes();
    let planar = frame.format().layout == SampleLayout::Planar;

    dest.reserve(frame.frames());

    for i in 0..frame.frames() {
        let mut sum = 0.0f64;
        for ch in 0..channels {
            let (plane, index) = if planar {
                (&planes[ch], i)
            } else {
                (&planes[0], i * channels + ch)
            };
            let start = index * width;
            let raw: T = bytemuck::pod_read_unaligned(&plane[start..start + width]);
            sum += unit_term(raw);
        }
        dest.push((sum / channels as f64) as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SampleFormat;

    fn assert_close(a: &[f32], b: &[f32]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-6, "{} != {}", x, y);
        }
    }

    fn assert_unit_range(samples: &[f32]) {
        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)), "{:?}", samples);
    }

    #[test]
    fn test_zero_offsets() {
        assert_eq!(<u8 as PcmSample>::ZERO_OFFSET, 128.0);
        assert_eq!(<u16 as PcmSample>::ZERO_OFFSET, 32768.0);
        assert_eq!(<u32 as PcmSample>::ZERO_OFFSET, 2147483648.0);
        assert_eq!(<i16 as PcmSample>::ZERO_OFFSET, 0.0);
        assert_eq!(<u8 as PcmSample>::FULL_SCALE, 127.0);
        assert_eq!(<i16 as PcmSample>::FULL_SCALE, 32767.0);
    }

    #[test]
    fn test_unsigned_midpoint_is_silence() {
        let u8_frame = RawFrame::from_interleaved::<u8>(2, &[128; 8]).unwrap();
        assert!(SampleNormalizer::normalize(&u8_frame).unwrap().iter().all(|&s| s == 0.0));

        let plane = [32768u16; 4];
        let u16_frame = RawFrame::from_planar(&[&plane[..], &plane[..]]).unwrap();
        assert!(SampleNormalizer::normalize(&u16_frame).unwrap().iter().all(|&s| s == 0.0));

        let u32_frame = RawFrame::from_interleaved::<u32>(1, &[2147483648; 4]).unwrap();
        assert!(SampleNormalizer::normalize(&u32_frame).unwrap().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_extremes_stay_in_unit_range() {
        let cases = [
            SampleNormalizer::normalize(&RawFrame::from_interleaved::<u8>(1, &[0, 255, 128]).unwrap()),
            SampleNormalizer::normalize(&RawFrame::from_interleaved::<i8>(1, &[i8::MIN, i8::MAX, 0]).unwrap()),
            SampleNormalizer::normalize(&RawFrame::from_interleaved::<u16>(1, &[0, u16::MAX]).unwrap()),
            SampleNormalizer::normalize(&RawFrame::from_interleaved::<i16>(1, &[i16::MIN, i16::MAX]).unwrap()),
            SampleNormalizer::normalize(&RawFrame::from_interleaved::<u32>(1, &[0, u32::MAX]).unwrap()),
            SampleNormalizer::normalize(&RawFrame::from_interleaved::<i32>(1, &[i32::MIN, i32::MAX]).unwrap()),
            SampleNormalizer::normalize(&RawFrame::from_interleaved::<f32>(1, &[-1.5, 1.5, f32::NAN]).unwrap()),
        ];

        for samples in cases {
            assert_unit_range(&samples.unwrap());
        }
    }

    #[test]
    fn test_full_scale_maps_to_one() {
        let samples =
            SampleNormalizer::normalize(&RawFrame::from_interleaved::<i16>(1, &[i16::MAX, i16::MIN, 0]).unwrap())
                .unwrap();
        assert_eq!(samples, vec![1.0, -1.0, 0.0]);

        let samples =
            SampleNormalizer::normalize(&RawFrame::from_interleaved::<u8>(1, &[255, 0]).unwrap()).unwrap();
        assert_eq!(samples, vec![1.0, -1.0]);
    }

    #[test]
    fn test_identical_channels_match_mono() {
        let values: Vec<i16> = vec![-32000, -1200, 0, 7, 16384, 32767];
        let mono = SampleNormalizer::normalize(&RawFrame::from_interleaved(1, &values).unwrap()).unwrap();

        for channels in 2..=6 {
            let interleaved: Vec<i16> = values
                .iter()
                .flat_map(|&v| std::iter::repeat(v).take(channels))
                .collect();
            let multi =
                SampleNormalizer::normalize(&RawFrame::from_interleaved(channels, &interleaved).unwrap())
                    .unwrap();
            assert_close(&multi, &mono);
        }
    }

    #[test]
    fn test_planar_matches_interleaved() {
        let left: Vec<u8> = vec![0, 64, 128, 200, 255];
        let right: Vec<u8> = vec![255, 10, 128, 90, 1];
        let interleaved: Vec<u8> = left.iter().zip(&right).flat_map(|(&l, &r)| [l, r]).collect();

        let planar = SampleNormalizer::normalize(&RawFrame::from_planar(&[&left[..], &right[..]]).unwrap()).unwrap();
        let packed = SampleNormalizer::normalize(&RawFrame::from_interleaved(2, &interleaved).unwrap()).unwrap();
        assert_eq!(planar, packed);

        let left: Vec<f32> = vec![0.1, -0.9, 0.5];
        let right: Vec<f32> = vec![0.3, 0.9, -0.25];
        let interleaved: Vec<f32> = left.iter().zip(&right).flat_map(|(&l, &r)| [l, r]).collect();

        let planar = SampleNormalizer::normalize(&RawFrame::from_planar(&[&left[..], &right[..]]).unwrap()).unwrap();
        let packed = SampleNormalizer::normalize(&RawFrame::from_interleaved(2, &interleaved).unwrap()).unwrap();
        assert_eq!(planar, packed);
        assert_close(&planar, &[0.2, 0.0, 0.125]);
    }

    #[test]
    fn test_channels_are_averaged() {
        let frame = RawFrame::from_interleaved::<i32>(2, &[i32::MAX, 0, i32::MAX, i32::MAX]).unwrap();
        let samples = SampleNormalizer::normalize(&frame).unwrap();
        assert_close(&samples, &[0.5, 1.0]);
    }

    #[test]
    fn test_float_bypasses_scaling() {
        let frame = RawFrame::from_interleaved::<f32>(1, &[0.25, -0.75]).unwrap();
        assert_eq!(SampleNormalizer::normalize(&frame).unwrap(), vec![0.25, -0.75]);
    }

    #[test]
    fn test_nan_float_is_silence() {
        let frame = RawFrame::from_interleaved::<f32>(2, &[f32::NAN, 0.5]).unwrap();
        assert_eq!(SampleNormalizer::normalize(&frame).unwrap(), vec![0.25]);
    }

    #[test]
    fn test_unsupported_formats_rejected() {
        let s24 = RawFrame::new(SampleFormat::interleaved(SampleEncoding::S24), 1, 2, vec![vec![0; 6]]).unwrap();
        assert!(matches!(
            SampleNormalizer::normalize(&s24),
            Err(DecodeError::UnsupportedSampleFormat(_))
        ));

        let f64_frame = RawFrame::new(SampleFormat::planar(SampleEncoding::F64), 1, 1, vec![vec![0; 8]]).unwrap();
        assert!(matches!(
            SampleNormalizer::normalize(&f64_frame),
            Err(DecodeError::UnsupportedSampleFormat(_))
        ));
    }

    #[test]
    fn test_normalize_into_appends() {
        let mut dest = vec![0.5f32];
        let frame = RawFrame::from_interleaved::<i16>(1, &[0, 0, 0]).unwrap();
        let appended = SampleNormalizer::normalize_into(&frame, &mut dest).unwrap();
        assert_eq!(appended, 3);
        assert_eq!(dest, vec![0.5, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unaligned_planes_are_readable() {
        // Planes built from raw bytes carry no alignment guarantee for i32
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(&i32::MAX.to_ne_bytes());
        let plane = bytes[1..].to_vec();
        let frame = RawFrame::new(SampleFormat::interleaved(SampleEncoding::S32), 1, 1, vec![plane]).unwrap();
        assert_eq!(SampleNormalizer::normalize(&frame).unwrap(), vec![1.0]);
    }
}
