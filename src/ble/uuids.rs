//! BLE Service and Characteristic UUIDs.
//!
//! Contains the UUID constants used for RadiaCode communication.

use uuid::Uuid;

/// RadiaCode vendor service UUID.
pub const RADIACODE_SERVICE_UUID: Uuid = Uuid::from_u128(0xe632_15e5_7003_49d8_96b0_b024798fb901);
/// Command characteristic UUID (write to device).
pub const COMMAND_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xe632_15e6_7003_49d8_96b0_b024798fb901);
/// Response characteristic UUID (notifications from device).
pub const RESPONSE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xe632_15e7_7003_49d8_96b0_b024798fb901);

/// Prefix of the local name every RadiaCode advertises, e.g. `RadiaCode-102#RC-102-001234`.
pub const RADIACODE_NAME_PREFIX: &str = "radiacode";

/// Check if a service UUID is the RadiaCode vendor service.
pub fn is_radiacode_service(uuid: &Uuid) -> bool {
    *uuid == RADIACODE_SERVICE_UUID
}

/// Check if an advertised local name belongs to a RadiaCode device.
pub fn is_radiacode_name(name: &str) -> bool {
    name.to_lowercase().starts_with(RADIACODE_NAME_PREFIX)
}
