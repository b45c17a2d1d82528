//! BLE scanning functionality.
//!
//! Provides the scanner for discovering RadiaCode devices and the
//! selection rules that pick exactly one of them.

use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::ble::advertising::DeviceInfo;
use crate::ble::uuids::{is_radiacode_service, RADIACODE_SERVICE_UUID};
use crate::error::{Error, Result};

/// A discovered device: a peripheral handle plus its advertised identity.
///
/// Generic over the handle so selection can be exercised without a radio.
#[derive(Debug, Clone)]
pub struct DeviceCandidate<P> {
    /// The peripheral handle.
    pub peripheral: P,
    /// Identity parsed from the advertisement.
    pub info: DeviceInfo,
    /// Signal strength in dBm.
    pub rssi: Option<i16>,
}

/// Pick exactly one device out of the scan results.
///
/// With a serial number, the single case-insensitive match wins. Without
/// one, the scan must have produced exactly one device.
pub fn select_device<P>(
    candidates: Vec<DeviceCandidate<P>>,
    serial: Option<&str>,
) -> Result<DeviceCandidate<P>> {
    let mut matching: Vec<DeviceCandidate<P>> = match serial {
        Some(serial) => candidates
            .into_iter()
            .filter(|c| {
                let hit = c.info.serial_matches(serial);
                if !hit {
                    debug!("Ignoring device with serial {}", c.info.serial_number);
                }
                hit
            })
            .collect(),
        None => candidates,
    };

    match matching.len() {
        0 => Err(Error::DeviceNotFound {
            serial: serial.map(str::to_string),
        }),
        1 => Ok(matching.remove(0)),
        _ => Err(Error::AmbiguousDevice {
            candidates: matching.iter().map(|c| c.info.to_string()).collect(),
        }),
    }
}

/// BLE scanner for discovering RadiaCode devices.
pub struct BleScanner {
    /// The BLE adapter to use for scanning.
    adapter: Adapter,
}

impl BleScanner {
    /// Create a new BLE scanner on the first available adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self { adapter })
    }

    /// Scan for `duration` and return every RadiaCode device seen.
    ///
    /// # Errors
    ///
    /// Returns an error if scanning cannot be started or stopped.
    pub async fn scan(&self, duration: Duration) -> Result<Vec<DeviceCandidate<Peripheral>>> {
        info!("Starting BLE scan for RadiaCode devices ({:?})", duration);

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(Error::Bluetooth)?;

        tokio::time::sleep(duration).await;

        self.adapter.stop_scan().await.map_err(Error::Bluetooth)?;

        let peripherals = self.adapter.peripherals().await.map_err(Error::Bluetooth)?;
        let mut candidates = Vec::new();

        for peripheral in peripherals {
            if let Some(candidate) = Self::process_peripheral(peripheral).await {
                info!("Discovered {} (RSSI {:?})", candidate.info, candidate.rssi);
                candidates.push(candidate);
            }
        }

        debug!("Scan finished with {} candidate(s)", candidates.len());

        Ok(candidates)
    }

    /// Turn a peripheral into a candidate if it looks like a RadiaCode.
    async fn process_peripheral(peripheral: Peripheral) -> Option<DeviceCandidate<Peripheral>> {
        let properties = match peripheral.properties().await {
            Ok(Some(p)) => p,
            Ok(None) => return None,
            Err(e) => {
                trace!("Failed to get properties: {}", e);
                return None;
            }
        };

        let address = peripheral.id().to_string();
        let advertises_service = properties.services.iter().any(is_radiacode_service);

        let info = match properties.local_name.as_deref() {
            Some(name) => DeviceInfo::from_advertisement(name, address.clone()),
            None => None,
        };

        let info = match info {
            Some(info) => info,
            None if advertises_service => {
                trace!(
                    "{} advertises {} without a RadiaCode name",
                    address,
                    RADIACODE_SERVICE_UUID
                );
                DeviceInfo {
                    local_name: properties.local_name.clone().unwrap_or_default(),
                    address,
                    model: "RadiaCode".to_string(),
                    serial_number: String::new(),
                }
            }
            None => return None,
        };

        Some(DeviceCandidate {
            peripheral,
            info,
            rssi: properties.rssi,
        })
    }
}
