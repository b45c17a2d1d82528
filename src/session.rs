//! Command/response session with a connected RadiaCode.
//!
//! Exactly one command is in flight at a time: the request is written,
//! then response notifications are consumed until the frame is complete
//! or the response timeout elapses.

use bytes::Bytes;
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::ble::advertising::DeviceInfo;
use crate::ble::transport::{Transport, MAX_WRITE_CHUNK};
use crate::config::SessionConfig;
use crate::data::{Calibration, Spectrum};
use crate::error::{Error, Result};
use crate::protocol::commands::{
    build_read_request, build_reset_spectrum_request, parse_read_response, parse_write_response,
    CommandRequest, VirtualString,
};
use crate::protocol::frame::{encode_request, split_response, FrameHeader, ResponseAssembler};

/// Everything read from the device in one run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Capture {
    /// Device identity.
    pub device: DeviceInfo,
    /// Calibration read from the device.
    pub calibration: Calibration,
    /// The accumulated spectrum.
    pub spectrum: Spectrum,
}

/// A command session over a [`Transport`].
pub struct DeviceSession<T> {
    transport: T,
    counter: u8,
    response_timeout: Duration,
    closed: bool,
}

impl<T: Transport> DeviceSession<T> {
    /// Wrap a connected transport.
    pub fn new(transport: T, response_timeout: Duration) -> Self {
        Self {
            transport,
            counter: 0,
            response_timeout,
            closed: false,
        }
    }

    /// Send one command and return the response body after its header.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if the response is not complete in time
    /// - [`Error::ProtocolError`] if the response is malformed or answers
    ///   a different request
    pub async fn send_command(&mut self, request: &CommandRequest) -> Result<Bytes> {
        if self.closed {
            return Err(Error::connection("session already closed"));
        }

        let header = FrameHeader::new(request.command, self.counter);
        self.counter = (self.counter + 1) % 32;

        let data = encode_request(header, request);
        debug!("Sending {} ({} bytes)", header, data.len());

        let timeout = self.response_timeout;
        let frame = tokio::time::timeout(timeout, self.round_trip(&data))
            .await
            .map_err(|_| {
                warn!("No complete response to {} within {:?}", header, timeout);
                Error::Timeout(timeout)
            })??;

        debug!("Received response to {} ({} bytes)", header, frame.len());

        split_response(header, frame)
    }

    async fn round_trip(&mut self, data: &[u8]) -> Result<Bytes> {
        for chunk in data.chunks(MAX_WRITE_CHUNK) {
            self.transport.write(chunk).await?;
        }

        let mut assembler = ResponseAssembler::new();
        loop {
            let chunk = self.transport.recv().await?;
            if let Some(frame) = assembler.push(&chunk)? {
                return Ok(frame);
            }
        }
    }

    async fn read_virtual_string(&mut self, id: VirtualString) -> Result<Bytes> {
        let body = self.send_command(&build_read_request(id)).await?;
        parse_read_response(body)
    }

    /// Read the device serial number.
    pub async fn read_serial_number(&mut self) -> Result<String> {
        let data = self.read_virtual_string(VirtualString::SerialNumber).await?;
        let serial = String::from_utf8_lossy(&data)
            .trim_end_matches(char::from(0))
            .trim()
            .to_string();
        Ok(serial)
    }

    /// Read the energy calibration coefficients.
    pub async fn read_calibration(&mut self) -> Result<Calibration> {
        let data = self.read_virtual_string(VirtualString::EnergyCalibration).await?;
        Calibration::decode(&data)
    }

    /// Read the accumulated spectrum, stamped with the current time.
    pub async fn read_spectrum(&mut self) -> Result<Spectrum> {
        let data = self.read_virtual_string(VirtualString::Spectrum).await?;
        Spectrum::decode(&data, Utc::now())
    }

    /// Clear the accumulated spectrum on the device.
    pub async fn reset_spectrum(&mut self) -> Result<()> {
        let body = self.send_command(&build_reset_spectrum_request()).await?;
        parse_write_response(body)
    }

    /// Release the transport. Later calls are no-ops.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.transport.disconnect().await
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Read serial, calibration and spectrum over `transport`, then disconnect.
///
/// The transport is disconnected on every path; a disconnect failure is
/// logged and does not replace the outcome of the reads.
pub async fn download<T: Transport>(
    transport: T,
    device: DeviceInfo,
    config: &SessionConfig,
) -> Result<Capture> {
    download_then(transport, device, config, |_| Ok(())).await
}

/// Like [`download`], but runs `save` on the capture while the device is
/// still connected.
///
/// With `reset_after_read` set, the accumulated spectrum is reset only
/// after `save` returned `Ok`. A failing `save` leaves the device
/// untouched and its error is returned.
pub async fn download_then<T, F>(
    transport: T,
    device: DeviceInfo,
    config: &SessionConfig,
    save: F,
) -> Result<Capture>
where
    T: Transport,
    F: FnOnce(&Capture) -> Result<()> + Send,
{
    let mut session = DeviceSession::new(transport, config.response_timeout);

    let result = read_and_save(&mut session, device, config.reset_after_read, save).await;

    if let Err(err) = session.close().await {
        warn!("Failed to disconnect: {}", err);
    }

    result
}

async fn read_and_save<T, F>(
    session: &mut DeviceSession<T>,
    device: DeviceInfo,
    reset_after_read: bool,
    save: F,
) -> Result<Capture>
where
    T: Transport,
    F: FnOnce(&Capture) -> Result<()>,
{
    let capture = read_capture(session, device).await?;

    save(&capture)?;

    if reset_after_read {
        session.reset_spectrum().await?;
        info!("Accumulated spectrum reset");
    }

    Ok(capture)
}

async fn read_capture<T: Transport>(
    session: &mut DeviceSession<T>,
    mut device: DeviceInfo,
) -> Result<Capture> {
    let serial = session.read_serial_number().await?;
    if device.serial_number.is_empty() {
        device.serial_number = serial;
    } else if !device.serial_matches(&serial) {
        warn!(
            "Device reports serial {} but advertised {}",
            serial, device.serial_number
        );
    }

    let calibration = session.read_calibration().await?;
    debug!("Calibration: {:?}", calibration.coefficients());

    let spectrum = session.read_spectrum().await?;
    info!(
        "Read spectrum: {} channels, {} counts over {}s ({:.2} cps)",
        spectrum.channel_count(),
        spectrum.total_counts(),
        spectrum.duration_secs,
        spectrum.count_rate().unwrap_or(0.0)
    );

    Ok(Capture {
        device,
        calibration,
        spectrum,
    })
}
