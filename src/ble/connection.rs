//! BLE connection management.
//!
//! Handles connecting to and disconnecting from a RadiaCode device.

use btleplug::api::Peripheral as _;
use btleplug::platform::Peripheral;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

/// Connection state for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Not connected to the device.
    #[default]
    Disconnected,
    /// Currently attempting to connect.
    Connecting,
    /// Connected to the device.
    Connected,
    /// Currently disconnecting.
    Disconnecting,
}

impl ConnectionState {
    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if in a transitional state.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Disconnecting)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

/// Manages the single connection to a RadiaCode device.
///
/// There is no auto-reconnect: a dropped link ends the run.
pub struct ConnectionManager {
    /// The peripheral to manage.
    peripheral: Peripheral,
    /// Current connection state.
    state: ConnectionState,
}

impl ConnectionManager {
    /// Create a new connection manager for a peripheral.
    pub fn new(peripheral: Peripheral) -> Self {
        Self {
            peripheral,
            state: ConnectionState::Disconnected,
        }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Get the peripheral.
    pub fn peripheral(&self) -> &Peripheral {
        &self.peripheral
    }

    /// Connect and discover services, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionError`] when the link cannot be
    /// established or service discovery fails within `timeout`.
    pub async fn connect(&mut self, timeout: Duration) -> Result<()> {
        if self.state.is_connected() {
            debug!("Already connected");
            return Ok(());
        }

        if self.state.is_transitioning() {
            return Err(Error::connection("Connection already in progress"));
        }

        self.set_state(ConnectionState::Connecting);

        let peripheral = self.peripheral.clone();
        let attempt = async move {
            if !peripheral.is_connected().await.unwrap_or(false) {
                peripheral.connect().await?;
            } else {
                info!("Peripheral already connected at BLE level");
            }
            peripheral.discover_services().await
        };

        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(())) => {
                info!("Successfully connected to device");
                self.set_state(ConnectionState::Connected);
                Ok(())
            }
            Ok(Err(e)) => {
                warn!("Connection attempt failed: {}", e);
                self.set_state(ConnectionState::Disconnected);
                Err(Error::connection(e.to_string()))
            }
            Err(_) => {
                warn!("Connection attempt timed out after {:?}", timeout);
                self.set_state(ConnectionState::Disconnected);
                // Drop any half-open link left behind by the abandoned attempt.
                if let Err(e) = self.peripheral.disconnect().await {
                    debug!("Failed to drop half-open link: {}", e);
                }
                Err(Error::connection(format!("timed out after {:?}", timeout)))
            }
        }
    }

    /// Disconnect from the device.
    pub async fn disconnect(&mut self) -> Result<()> {
        if matches!(
            self.state,
            ConnectionState::Disconnected | ConnectionState::Disconnecting
        ) {
            return Ok(());
        }

        self.set_state(ConnectionState::Disconnecting);

        match self.peripheral.disconnect().await {
            Ok(_) => {
                info!("Successfully disconnected from device");
                self.set_state(ConnectionState::Disconnected);
                Ok(())
            }
            Err(e) => {
                error!("Failed to disconnect: {}", e);
                self.set_state(ConnectionState::Disconnected);
                Err(Error::Bluetooth(e))
            }
        }
    }

    fn set_state(&mut self, new_state: ConnectionState) {
        if self.state != new_state {
            debug!("Connection state changed: {} -> {}", self.state, new_state);
            self.state = new_state;
        }
    }
}
