//! GATT characteristic handling.
//!
//! Provides writing to the command characteristic and reading the
//! notification stream of the response characteristic.

use btleplug::api::{Characteristic, Peripheral as _, ValueNotification, WriteType};
use btleplug::platform::Peripheral;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::ble::uuids::*;
use crate::error::{Error, Result};

type NotificationStream = Pin<Box<dyn Stream<Item = ValueNotification> + Send>>;

/// Handler for the RadiaCode command/response characteristic pair.
pub struct CharacteristicHandler {
    /// The peripheral to communicate with.
    peripheral: Peripheral,
    /// Characteristic commands are written to.
    command: Characteristic,
    /// Characteristic responses are notified on.
    response: Characteristic,
    /// Notification stream, present while subscribed.
    notifications: Option<NotificationStream>,
}

impl CharacteristicHandler {
    /// Locate the command and response characteristics.
    ///
    /// Services must be discovered before calling this.
    pub fn discover(peripheral: Peripheral) -> Result<Self> {
        let characteristics = peripheral.characteristics();

        for characteristic in &characteristics {
            debug!(
                "Found characteristic: {} in service {}",
                characteristic.uuid, characteristic.service_uuid
            );
        }

        if !peripheral
            .services()
            .iter()
            .any(|s| is_radiacode_service(&s.uuid))
        {
            return Err(Error::ServiceNotFound {
                uuid: RADIACODE_SERVICE_UUID.to_string(),
            });
        }

        let find = |uuid: Uuid| {
            characteristics
                .iter()
                .find(|c| c.uuid == uuid)
                .cloned()
                .ok_or_else(|| Error::CharacteristicNotFound {
                    uuid: uuid.to_string(),
                })
        };

        let command = find(COMMAND_CHARACTERISTIC_UUID)?;
        let response = find(RESPONSE_CHARACTERISTIC_UUID)?;

        Ok(Self {
            peripheral,
            command,
            response,
            notifications: None,
        })
    }

    /// Subscribe to response notifications.
    ///
    /// The stream is opened here, before any command is written, so no
    /// response chunk can be missed.
    pub async fn start_notifications(&mut self) -> Result<()> {
        if self.notifications.is_some() {
            return Ok(());
        }

        debug!(
            "Subscribing to {}, properties: {:?}",
            self.response.uuid, self.response.properties
        );

        self.peripheral
            .subscribe(&self.response)
            .await
            .map_err(Error::Bluetooth)?;

        let stream = self
            .peripheral
            .notifications()
            .await
            .map_err(Error::Bluetooth)?;
        self.notifications = Some(stream);

        debug!("Successfully subscribed to notifications from {}", self.response.uuid);

        Ok(())
    }

    /// Unsubscribe from response notifications.
    pub async fn stop_notifications(&mut self) -> Result<()> {
        if self.notifications.take().is_none() {
            return Ok(());
        }

        self.peripheral
            .unsubscribe(&self.response)
            .await
            .map_err(Error::Bluetooth)?;

        debug!("Unsubscribed from notifications from {}", self.response.uuid);

        Ok(())
    }

    /// Write one chunk to the command characteristic.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.peripheral
            .write(&self.command, data, WriteType::WithResponse)
            .await
            .map_err(Error::Bluetooth)?;

        trace!("Wrote {} bytes to characteristic {}", data.len(), self.command.uuid);

        Ok(())
    }

    /// Wait for the next notification from the response characteristic.
    ///
    /// Notifications from other characteristics are skipped.
    pub async fn next_notification(&mut self) -> Result<Vec<u8>> {
        let stream = self.notifications.as_mut().ok_or_else(|| {
            Error::connection("not subscribed to response notifications")
        })?;

        while let Some(notification) = stream.next().await {
            if notification.uuid != self.response.uuid {
                trace!("Skipping notification from {}", notification.uuid);
                continue;
            }

            trace!(
                "Notification: {} bytes, data: {:02X?}",
                notification.value.len(),
                &notification.value[..std::cmp::min(notification.value.len(), 20)]
            );

            return Ok(notification.value);
        }

        Err(Error::connection("notification stream closed"))
    }
}
