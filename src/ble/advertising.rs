//! Advertising data parsing.
//!
//! RadiaCode devices advertise a local name of the form
//! `RadiaCode-102#RC-102-001234`: the model before the `#`, the serial
//! number after it.

use crate::ble::uuids::is_radiacode_name;

/// Identity of a RadiaCode device as seen in its advertisement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceInfo {
    /// Full advertised local name.
    pub local_name: String,
    /// BLE address or platform identifier.
    pub address: String,
    /// Model name, e.g. `RadiaCode-102`.
    pub model: String,
    /// Serial number, e.g. `RC-102-001234`. Empty if the name carries none.
    pub serial_number: String,
}

impl DeviceInfo {
    /// Build device info from an advertised local name.
    ///
    /// Returns `None` when the name does not belong to a RadiaCode device.
    pub fn from_advertisement(local_name: &str, address: impl Into<String>) -> Option<Self> {
        if !is_radiacode_name(local_name) {
            return None;
        }

        let (model, serial_number) = match local_name.split_once('#') {
            Some((model, serial)) => (model.trim(), serial.trim()),
            None => (local_name.trim(), ""),
        };

        Some(Self {
            local_name: local_name.to_string(),
            address: address.into(),
            model: model.to_string(),
            serial_number: serial_number.to_string(),
        })
    }

    /// Case-insensitive serial number comparison.
    pub fn serial_matches(&self, serial: &str) -> bool {
        !self.serial_number.is_empty() && self.serial_number.eq_ignore_ascii_case(serial.trim())
    }
}

impl std::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.address, self.local_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_with_serial() {
        let info = DeviceInfo::from_advertisement("RadiaCode-102#RC-102-001234", "AA:BB").unwrap();
        assert_eq!(info.model, "RadiaCode-102");
        assert_eq!(info.serial_number, "RC-102-001234");
        assert_eq!(info.address, "AA:BB");
    }

    #[test]
    fn test_parse_name_without_serial() {
        let info = DeviceInfo::from_advertisement("RadiaCode-101", "AA:BB").unwrap();
        assert_eq!(info.model, "RadiaCode-101");
        assert_eq!(info.serial_number, "");
        assert!(!info.serial_matches(""));
    }

    #[test]
    fn test_reject_foreign_name() {
        assert!(DeviceInfo::from_advertisement("Aranet4#1234", "AA:BB").is_none());
    }

    #[test]
    fn test_serial_matches_ignores_case() {
        let info = DeviceInfo::from_advertisement("RadiaCode-102#RC-102-00ABCD", "AA:BB").unwrap();
        assert!(info.serial_matches("rc-102-00abcd"));
        assert!(info.serial_matches("RC-102-00ABCD"));
        assert!(!info.serial_matches("RC-102-000000"));
    }

    #[test]
    fn test_display() {
        let info = DeviceInfo::from_advertisement("RadiaCode-102#RC-102-001234", "AA:BB").unwrap();
        assert_eq!(info.to_string(), "AA:BB: RadiaCode-102#RC-102-001234");
    }
}
