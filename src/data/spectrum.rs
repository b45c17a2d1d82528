//! Accumulated spectrum and its wire decoding.
//!
//! Spectrum payload layout:
//! - Duration(4, LE u32 seconds) + Calibration(3 × LE f32) + Counts
//!
//! Counts are run-length groups. Each group starts with a LE u16 whose
//! upper 12 bits are the run length and lower 4 bits the value encoding:
//!
//! | kind | bytes | value                    |
//! |------|-------|--------------------------|
//! | 0    | 0     | 0                        |
//! | 1    | 1     | u8                       |
//! | 2    | 1     | previous + i8            |
//! | 3    | 2     | previous + i16           |
//! | 4    | 3     | previous + i24           |
//! | 5    | 4     | previous + i32           |

use bytes::Buf;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;

use super::calibration::Calibration;
use crate::error::{Error, Result};

/// Detector resolution: the most channels a spectrum can hold.
pub const MAX_CHANNELS: usize = 1024;

/// Size of the fixed part preceding the counts.
pub const SPECTRUM_HEADER_SIZE: usize = 16;

/// An accumulated gamma spectrum.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Spectrum {
    /// Accumulation time in seconds.
    pub duration_secs: u32,
    /// Calibration the device stored alongside the spectrum.
    pub calibration: Calibration,
    /// Event count per channel.
    pub counts: Vec<u32>,
    /// When the spectrum was read from the device.
    pub captured_at: DateTime<Utc>,
}

impl Spectrum {
    /// Decode a spectrum payload read at `captured_at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DecodeError`] if the payload is truncated, uses an
    /// unknown value encoding, produces a negative count, or holds more
    /// than [`MAX_CHANNELS`] channels.
    pub fn decode(mut data: &[u8], captured_at: DateTime<Utc>) -> Result<Self> {
        if data.len() < SPECTRUM_HEADER_SIZE {
            return Err(Error::decode(format!(
                "Spectrum header needs {} bytes, got {}",
                SPECTRUM_HEADER_SIZE,
                data.len()
            )));
        }

        let duration_secs = data.get_u32_le();
        let calibration = Calibration::decode(&data[..12])?;
        data.advance(12);

        let counts = decode_counts(data)?;

        Ok(Self {
            duration_secs,
            calibration,
            counts,
            captured_at,
        })
    }

    /// Number of channels.
    pub fn channel_count(&self) -> usize {
        self.counts.len()
    }

    /// Sum of all channel counts.
    pub fn total_counts(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// Accumulation time.
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs as u64)
    }

    /// Estimated start of accumulation.
    pub fn start_time(&self) -> DateTime<Utc> {
        self.captured_at - ChronoDuration::seconds(self.duration_secs as i64)
    }

    /// End of accumulation (the capture time).
    pub fn end_time(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Average counts per second, `None` for a zero-length accumulation.
    pub fn count_rate(&self) -> Option<f64> {
        if self.duration_secs == 0 {
            return None;
        }
        Some(self.total_counts() as f64 / self.duration_secs as f64)
    }
}

/// Decode run-length encoded channel counts.
fn decode_counts(mut data: &[u8]) -> Result<Vec<u32>> {
    let mut counts = Vec::with_capacity(MAX_CHANNELS);
    let mut last: i64 = 0;

    while data.has_remaining() {
        if data.remaining() < 2 {
            return Err(Error::decode(format!(
                "Dangling byte after channel {}",
                counts.len()
            )));
        }

        let word = data.get_u16_le();
        let run = (word >> 4) as usize;
        let kind = word & 0x0F;

        let width = match kind {
            0 => 0,
            1 | 2 => 1,
            3 => 2,
            4 => 3,
            5 => 4,
            _ => {
                return Err(Error::decode(format!(
                    "Unknown value encoding {} at channel {}",
                    kind,
                    counts.len()
                )))
            }
        };

        if counts.len() + run > MAX_CHANNELS {
            return Err(Error::decode(format!(
                "Spectrum exceeds {} channels",
                MAX_CHANNELS
            )));
        }

        if data.remaining() < run * width {
            return Err(Error::decode(format!(
                "Spectrum truncated: run of {} at channel {} needs {} bytes, have {}",
                run,
                counts.len(),
                run * width,
                data.remaining()
            )));
        }

        for _ in 0..run {
            let value = match kind {
                0 => 0,
                1 => data.get_u8() as i64,
                2 => last + data.get_i8() as i64,
                3 => last + data.get_i16_le() as i64,
                4 => {
                    let raw = data.get_uint_le(3) as i64;
                    last + ((raw << 40) >> 40)
                }
                _ => last + data.get_i32_le() as i64,
            };

            let count = u32::try_from(value).map_err(|_| {
                Error::decode(format!(
                    "Count {} out of range at channel {}",
                    value,
                    counts.len()
                ))
            })?;

            counts.push(count);
            last = value;
        }
    }

    Ok(counts)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Encode counts the way the firmware does: absolute bytes for small
    /// values, i32 deltas otherwise, zero runs collapsed.
    pub(crate) fn encode_counts(counts: &[u32]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut last: i64 = 0;
        let mut i = 0;

        while i < counts.len() {
            if counts[i] == 0 {
                let run = counts[i..].iter().take(0xFFF).take_while(|&&c| c == 0).count();
                out.extend_from_slice(&((run as u16) << 4).to_le_bytes());
                last = 0;
                i += run;
                continue;
            }

            let value = counts[i] as i64;
            if value <= 0xFF {
                out.extend_from_slice(&((1u16 << 4) | 1).to_le_bytes());
                out.push(value as u8);
            } else {
                out.extend_from_slice(&((1u16 << 4) | 5).to_le_bytes());
                out.extend_from_slice(&((value - last) as i32).to_le_bytes());
            }
            last = value;
            i += 1;
        }

        out
    }

    /// Build a full spectrum payload.
    pub(crate) fn spectrum_payload(duration: u32, coefficients: [f32; 3], counts: &[u32]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&duration.to_le_bytes());
        for c in coefficients {
            out.extend_from_slice(&c.to_le_bytes());
        }
        out.extend_from_slice(&encode_counts(counts));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_decode_header_and_counts() {
        let payload = spectrum_payload(300, [0.0, 3.0, 0.0], &[0, 5, 10, 0]);
        let spectrum = Spectrum::decode(&payload, at()).unwrap();

        assert_eq!(spectrum.duration_secs, 300);
        assert_eq!(spectrum.calibration.coefficients(), &[0.0, 3.0, 0.0]);
        assert_eq!(spectrum.counts, vec![0, 5, 10, 0]);
        assert_eq!(spectrum.total_counts(), 15);
    }

    #[test]
    fn test_decode_every_encoding() {
        let mut payload = spectrum_payload(60, [1.0, 2.0, 3.0], &[]);
        // kind 1 absolute: 200
        payload.extend_from_slice(&[0x11, 0x00, 200]);
        // kind 2 i8 delta: 200 - 50 = 150
        payload.extend_from_slice(&[0x12, 0x00, (-50i8) as u8]);
        // kind 3 i16 delta: 150 + 1000 = 1150
        payload.extend_from_slice(&[0x13, 0x00]);
        payload.extend_from_slice(&1000i16.to_le_bytes());
        // kind 4 i24 delta: 1150 - 1000 = 150
        payload.extend_from_slice(&[0x14, 0x00]);
        payload.extend_from_slice(&(-1000i32).to_le_bytes()[..3]);
        // kind 5 i32 delta, run of two: 150 + 100000, then + 1
        payload.extend_from_slice(&[0x25, 0x00]);
        payload.extend_from_slice(&100000i32.to_le_bytes());
        payload.extend_from_slice(&1i32.to_le_bytes());
        // kind 0, run of three
        payload.extend_from_slice(&[0x30, 0x00]);

        let spectrum = Spectrum::decode(&payload, at()).unwrap();
        assert_eq!(
            spectrum.counts,
            vec![200, 150, 1150, 150, 100150, 100151, 0, 0, 0]
        );
    }

    #[test]
    fn test_truncated_run_is_decode_error() {
        let mut payload = spectrum_payload(10, [0.0, 1.0, 0.0], &[]);
        // Run of 4 one-byte values, only two present.
        payload.extend_from_slice(&[0x41, 0x00, 1, 2]);
        let result = Spectrum::decode(&payload, at());
        assert!(matches!(result, Err(Error::DecodeError { .. })));
    }

    #[test]
    fn test_truncated_header_is_decode_error() {
        let result = Spectrum::decode(&[0u8; 10], at());
        assert!(matches!(result, Err(Error::DecodeError { .. })));
    }

    #[test]
    fn test_dangling_byte_is_decode_error() {
        let mut payload = spectrum_payload(10, [0.0, 1.0, 0.0], &[1]);
        payload.push(0x11);
        assert!(matches!(
            Spectrum::decode(&payload, at()),
            Err(Error::DecodeError { .. })
        ));
    }

    #[test]
    fn test_unknown_encoding_is_decode_error() {
        let mut payload = spectrum_payload(10, [0.0, 1.0, 0.0], &[]);
        payload.extend_from_slice(&[0x16, 0x00, 0]);
        assert!(matches!(
            Spectrum::decode(&payload, at()),
            Err(Error::DecodeError { .. })
        ));
    }

    #[test]
    fn test_negative_count_is_decode_error() {
        let mut payload = spectrum_payload(10, [0.0, 1.0, 0.0], &[]);
        payload.extend_from_slice(&[0x12, 0x00, (-1i8) as u8]);
        assert!(matches!(
            Spectrum::decode(&payload, at()),
            Err(Error::DecodeError { .. })
        ));
    }

    #[test]
    fn test_too_many_channels_is_decode_error() {
        let mut payload = spectrum_payload(10, [0.0, 1.0, 0.0], &[]);
        payload.extend_from_slice(&(((MAX_CHANNELS as u16) + 1) << 4).to_le_bytes());
        assert!(matches!(
            Spectrum::decode(&payload, at()),
            Err(Error::DecodeError { .. })
        ));
    }

    #[test]
    fn test_times() {
        let payload = spectrum_payload(3600, [0.0, 1.0, 0.0], &[4, 4]);
        let spectrum = Spectrum::decode(&payload, at()).unwrap();
        assert_eq!(
            spectrum.start_time(),
            Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap()
        );
        assert_eq!(spectrum.end_time(), at());
        assert_eq!(spectrum.duration(), Duration::from_secs(3600));
        assert!((spectrum.count_rate().unwrap() - 8.0 / 3600.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn decode_reproduces_counts(
            duration in any::<u32>(),
            counts in prop::collection::vec(0u32..5_000_000, 0..MAX_CHANNELS),
        ) {
            let payload = spectrum_payload(duration, [0.0, 2.5, 0.001], &counts);
            let spectrum = Spectrum::decode(&payload, at()).unwrap();
            prop_assert_eq!(spectrum.duration_secs, duration);
            prop_assert_eq!(spectrum.counts, counts);
        }
    }
}
