//! Error types for the radiacode-spectrum-ble crate.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available or is disabled on this system.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// No RadiaCode device matched the discovery criteria.
    #[error("No RadiaCode device found{}", serial_suffix(.serial))]
    DeviceNotFound {
        /// The serial number that was searched for, if any.
        serial: Option<String>,
    },

    /// More than one device matched and no serial number narrowed it down.
    #[error("Found {} RadiaCode devices, please specify a serial number", .candidates.len())]
    AmbiguousDevice {
        /// Display names of all matching devices.
        candidates: Vec<String>,
    },

    /// Failed to establish or keep the BLE connection.
    #[error("Connection failed: {reason}")]
    ConnectionError {
        /// Description of why the connection failed.
        reason: String,
    },

    /// A command round trip did not complete in time.
    #[error("No response from device within {0:?}")]
    Timeout(Duration),

    /// The device answered with a malformed or unexpected frame.
    #[error("Protocol error: {context}")]
    ProtocolError {
        /// Description of what was wrong with the frame.
        context: String,
    },

    /// A response payload did not match its documented layout.
    #[error("Decode error: {context}")]
    DecodeError {
        /// Description of what could not be decoded.
        context: String,
    },

    /// The output document could not be written.
    #[error("Failed to write {}: {source}", .path.display())]
    WriteError {
        /// Destination path of the document.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter {
        /// The name of the parameter.
        name: String,
        /// The invalid value that was provided.
        value: String,
    },

    /// Characteristic not found on the device.
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID of the characteristic that was not found.
        uuid: String,
    },

    /// Service not found on the device.
    #[error("Service not found: {uuid}")]
    ServiceNotFound {
        /// The UUID of the service that was not found.
        uuid: String,
    },
}

fn serial_suffix(serial: &Option<String>) -> String {
    match serial {
        Some(serial) => format!(" with serial {}", serial),
        None => String::new(),
    }
}

impl Error {
    pub(crate) fn protocol(context: impl Into<String>) -> Self {
        Self::ProtocolError {
            context: context.into(),
        }
    }

    pub(crate) fn decode(context: impl Into<String>) -> Self {
        Self::DecodeError {
            context: context.into(),
        }
    }

    pub(crate) fn connection(reason: impl Into<String>) -> Self {
        Self::ConnectionError {
            reason: reason.into(),
        }
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_not_found_message() {
        let err = Error::DeviceNotFound { serial: None };
        assert_eq!(err.to_string(), "No RadiaCode device found");

        let err = Error::DeviceNotFound {
            serial: Some("RC-102-000001".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "No RadiaCode device found with serial RC-102-000001"
        );
    }

    #[test]
    fn test_ambiguous_device_message() {
        let err = Error::AmbiguousDevice {
            candidates: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Found 2 RadiaCode devices, please specify a serial number"
        );
    }

    #[test]
    fn test_write_error_has_source() {
        use std::error::Error as _;

        let err = Error::WriteError {
            path: PathBuf::from("/nonexistent/out.xml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/nonexistent/out.xml"));
        assert!(err.source().is_some());
    }
}
