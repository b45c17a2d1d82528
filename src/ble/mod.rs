//! BLE communication module.
//!
//! This module provides low-level Bluetooth Low Energy functionality
//! for discovering and talking to RadiaCode devices.

pub mod advertising;
pub mod characteristics;
pub mod connection;
pub mod scanner;
pub mod transport;
pub mod uuids;

pub use advertising::DeviceInfo;
pub use characteristics::CharacteristicHandler;
pub use connection::{ConnectionManager, ConnectionState};
pub use scanner::{select_device, BleScanner, DeviceCandidate};
pub use transport::{BleTransport, Transport, MAX_WRITE_CHUNK};
pub use uuids::*;
