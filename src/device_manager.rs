//! Device manager for finding a RadiaCode and downloading its spectrum.
//!
//! This module ties scanning, selection, connection and the command
//! session together into one capture run.

use btleplug::platform::Peripheral;
use tracing::{debug, info};

use crate::ble::scanner::{select_device, BleScanner, DeviceCandidate};
use crate::ble::transport::BleTransport;
use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::{download, download_then, Capture};

/// Central manager for one capture run.
pub struct DeviceManager {
    /// BLE scanner.
    scanner: BleScanner,
    /// Timing parameters.
    config: SessionConfig,
}

impl DeviceManager {
    /// Create a new DeviceManager instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or Bluetooth is
    /// not available.
    pub async fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let scanner = BleScanner::new().await?;

        Ok(Self { scanner, config })
    }

    /// The configuration in use.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Scan and return every RadiaCode in range.
    pub async fn scan(&self) -> Result<Vec<DeviceCandidate<Peripheral>>> {
        self.scanner.scan(self.config.scan_duration).await
    }

    /// Scan and select exactly one device.
    ///
    /// # Errors
    ///
    /// - [`Error::DeviceNotFound`](crate::Error::DeviceNotFound) if nothing matches
    /// - [`Error::AmbiguousDevice`](crate::Error::AmbiguousDevice) if several
    ///   devices match and no serial number was given
    pub async fn discover(&self, serial: Option<&str>) -> Result<DeviceCandidate<Peripheral>> {
        let candidates = self.scan().await?;
        debug!("Selecting among {} device(s)", candidates.len());

        let selected = select_device(candidates, serial)?;
        info!("Selected {}", selected.info);

        Ok(selected)
    }

    /// Connect to `device`, read its spectrum and disconnect.
    pub async fn capture(&self, device: DeviceCandidate<Peripheral>) -> Result<Capture> {
        info!("Connecting to {}", device.info);

        let transport = BleTransport::open(device.peripheral, self.config.connect_timeout).await?;

        download(transport, device.info, &self.config).await
    }

    /// Connect to `device`, read its spectrum, hand it to `save` and
    /// disconnect.
    ///
    /// A configured reset is sent only after `save` succeeded.
    pub async fn capture_then<F>(&self, device: DeviceCandidate<Peripheral>, save: F) -> Result<Capture>
    where
        F: FnOnce(&Capture) -> Result<()> + Send,
    {
        info!("Connecting to {}", device.info);

        let transport = BleTransport::open(device.peripheral, self.config.connect_timeout).await?;

        download_then(transport, device.info, &self.config, save).await
    }

    /// Discover a device and capture its spectrum in one call.
    pub async fn capture_spectrum(&self, serial: Option<&str>) -> Result<Capture> {
        let device = self.discover(serial).await?;
        self.capture(device).await
    }
}
