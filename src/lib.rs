// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # radiacode-spectrum-ble
//!
//! A cross-platform Rust library and command-line tool for downloading
//! gamma-ray spectra from RadiaCode radiation detectors over Bluetooth
//! Low Energy.
//!
//! ## Features
//!
//! - **Device Discovery**: Find RadiaCode devices by advertised name,
//!   optionally narrowed down by serial number
//! - **Spectrum Download**: Read the accumulated spectrum, its
//!   accumulation time and the energy calibration
//! - **XML Export**: Save spectra in the BecqMoni `ResultDataFile` format
//!   understood by InterSpec and other analysis tools
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use radiacode_spectrum_ble::{DeviceManager, Result, SessionConfig, SpectrumDocument};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let manager = DeviceManager::new(SessionConfig::default()).await?;
//!
//!     // Pick the only RadiaCode in range
//!     let device = manager.discover(None).await?;
//!     println!("Found {}", device.info);
//!
//!     // Connect, read, disconnect
//!     let capture = manager.capture(device).await?;
//!     println!(
//!         "{} channels over {} s",
//!         capture.spectrum.channel_count(),
//!         capture.spectrum.duration_secs
//!     );
//!
//!     SpectrumDocument::from_capture(&capture).write_to("output.xml")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.
//!
//! The device accepts one central at a time: close the RadiaCode phone
//! app before running.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for data types

// Public modules
pub mod ble;
pub mod config;
pub mod data;
pub mod device_manager;
pub mod error;
pub mod export;
pub mod protocol;
pub mod session;
pub mod utils;

// Re-exports for convenience
pub use config::SessionConfig;
pub use device_manager::DeviceManager;
pub use error::{Error, Result};
pub use export::{export, SpectrumDocument, DEFAULT_SPECTRUM_NAME};
pub use session::{download, download_then, Capture, DeviceSession};
pub use utils::format_duration;

// Re-export commonly used types from submodules
pub use ble::advertising::DeviceInfo;
pub use ble::connection::ConnectionState;
pub use ble::scanner::{select_device, DeviceCandidate};
pub use ble::transport::{BleTransport, Transport};
pub use data::{Calibration, Spectrum, MAX_CHANNELS};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that key types are exported
        let _ = std::any::TypeId::of::<DeviceManager>();
        let _ = std::any::TypeId::of::<DeviceSession<BleTransport>>();
        let _ = std::any::TypeId::of::<Error>();
        let _ = std::any::TypeId::of::<Capture>();
        let _ = std::any::TypeId::of::<Spectrum>();
        let _ = std::any::TypeId::of::<Calibration>();
        let _ = std::any::TypeId::of::<DeviceInfo>();
    }

    #[test]
    fn test_duration_formatting() {
        assert_eq!(format_duration(300), "5 minutes");
    }
}
