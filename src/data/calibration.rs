//! Energy calibration.

use bytes::Buf;

use crate::error::{Error, Result};

/// Minimum number of coefficients a calibration carries.
pub const MIN_COEFFICIENTS: usize = 3;

/// Polynomial mapping channel index to energy in keV:
/// `E(ch) = c0 + c1·ch + c2·ch² + …`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Calibration {
    coefficients: Vec<f32>,
}

impl Calibration {
    /// Create a calibration from coefficients, lowest order first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] with fewer than three coefficients.
    pub fn new(coefficients: Vec<f32>) -> Result<Self> {
        if coefficients.len() < MIN_COEFFICIENTS {
            return Err(Error::InvalidParameter {
                name: "coefficients".to_string(),
                value: format!("{:?}", coefficients),
            });
        }
        Ok(Self { coefficients })
    }

    /// Decode consecutive little-endian `f32` coefficients.
    pub fn decode(mut data: &[u8]) -> Result<Self> {
        if data.len() % 4 != 0 || data.len() < MIN_COEFFICIENTS * 4 {
            return Err(Error::decode(format!(
                "Calibration payload must hold at least {} f32 values, got {} bytes",
                MIN_COEFFICIENTS,
                data.len()
            )));
        }

        let mut coefficients = Vec::with_capacity(data.len() / 4);
        while data.has_remaining() {
            coefficients.push(data.get_f32_le());
        }

        Ok(Self { coefficients })
    }

    /// Coefficients, lowest order first.
    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }

    /// Degree of the polynomial.
    pub fn polynomial_order(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Energy in keV at a (possibly fractional) channel position.
    pub fn energy_at(&self, channel: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * channel + c as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_decode_three_coefficients() {
        let cal = Calibration::decode(&encode(&[-6.5, 2.45, 0.0004])).unwrap();
        assert_eq!(cal.coefficients(), &[-6.5, 2.45, 0.0004]);
        assert_eq!(cal.polynomial_order(), 2);
    }

    #[test]
    fn test_decode_more_coefficients() {
        let cal = Calibration::decode(&encode(&[1.0, 2.0, 3.0, 4.0])).unwrap();
        assert_eq!(cal.polynomial_order(), 3);
    }

    #[test]
    fn test_decode_rejects_short_or_ragged() {
        assert!(matches!(
            Calibration::decode(&encode(&[1.0, 2.0])),
            Err(Error::DecodeError { .. })
        ));
        let mut ragged = encode(&[1.0, 2.0, 3.0]);
        ragged.push(0);
        assert!(matches!(
            Calibration::decode(&ragged),
            Err(Error::DecodeError { .. })
        ));
    }

    #[test]
    fn test_new_requires_three() {
        assert!(Calibration::new(vec![0.0, 3.0]).is_err());
        assert!(Calibration::new(vec![0.0, 3.0, 0.0]).is_ok());
    }

    #[test]
    fn test_energy_at() {
        let cal = Calibration::new(vec![1.0, 3.0, 0.5]).unwrap();
        assert!((cal.energy_at(0.0) - 1.0).abs() < 1e-9);
        assert!((cal.energy_at(2.0) - 9.0).abs() < 1e-9);
    }
}
