//! Data types for spectra and calibration.
//!
//! This module contains all the data structures used to represent
//! what is read from a RadiaCode device.

pub mod calibration;
pub mod spectrum;

pub use calibration::Calibration;
pub use spectrum::{Spectrum, MAX_CHANNELS};
