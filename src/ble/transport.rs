//! The byte transport a [`DeviceSession`](crate::session::DeviceSession) runs on.

use async_trait::async_trait;
use btleplug::platform::Peripheral;
use std::time::Duration;
use tracing::{debug, warn};

use crate::ble::characteristics::CharacteristicHandler;
use crate::ble::connection::ConnectionManager;
use crate::error::{Error, Result};

/// Largest chunk the device accepts in a single characteristic write.
pub const MAX_WRITE_CHUNK: usize = 18;

/// A connected command/response channel to a device.
#[async_trait]
pub trait Transport: Send {
    /// Write one chunk of at most [`MAX_WRITE_CHUNK`] bytes.
    async fn write(&mut self, chunk: &[u8]) -> Result<()>;

    /// Wait for the next response chunk.
    async fn recv(&mut self) -> Result<Vec<u8>>;

    /// Release the link. Safe to call more than once.
    async fn disconnect(&mut self) -> Result<()>;
}

/// [`Transport`] over a btleplug peripheral.
pub struct BleTransport {
    connection: ConnectionManager,
    handler: Option<CharacteristicHandler>,
}

impl BleTransport {
    /// Connect to `peripheral` and subscribe to its response characteristic.
    ///
    /// On failure after the link came up, the link is torn down before
    /// the error is returned.
    pub async fn open(peripheral: Peripheral, connect_timeout: Duration) -> Result<Self> {
        let mut connection = ConnectionManager::new(peripheral);
        connection.connect(connect_timeout).await?;

        match Self::subscribe(connection.peripheral().clone()).await {
            Ok(handler) => Ok(Self {
                connection,
                handler: Some(handler),
            }),
            Err(e) => {
                if let Err(err) = connection.disconnect().await {
                    warn!("Failed to disconnect after setup error: {}", err);
                }
                Err(e)
            }
        }
    }

    async fn subscribe(peripheral: Peripheral) -> Result<CharacteristicHandler> {
        let mut handler = CharacteristicHandler::discover(peripheral)?;
        handler.start_notifications().await?;
        Ok(handler)
    }

    fn handler(&mut self) -> Result<&mut CharacteristicHandler> {
        self.handler
            .as_mut()
            .ok_or_else(|| Error::connection("transport already disconnected"))
    }
}

#[async_trait]
impl Transport for BleTransport {
    async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        self.handler()?.write(chunk).await
    }

    async fn recv(&mut self) -> Result<Vec<u8>> {
        self.handler()?.next_notification().await
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut handler) = self.handler.take() {
            if let Err(e) = handler.stop_notifications().await {
                debug!("Failed to unsubscribe before disconnect: {}", e);
            }
        }
        self.connection.disconnect().await
    }
}
