//! Command opcodes and virtual-string identifiers.
//!
//! Configuration and data blocks are exposed by the firmware as numbered
//! "virtual strings" that are read with [`Command::ReadVirtualString`]
//! and written with [`Command::WriteVirtualString`].

use bytes::{Buf, Bytes};

use crate::error::{Error, Result};

/// Return code the device uses for a successful virtual-string access.
pub const RETCODE_OK: u32 = 1;

/// Command opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Command {
    /// Read a virtual string (0x0826).
    ReadVirtualString = 0x0826,
    /// Write a virtual string (0x0827).
    WriteVirtualString = 0x0827,
}

impl Command {
    /// Create from raw opcode value.
    pub fn from_raw(value: u16) -> Option<Self> {
        match value {
            0x0826 => Some(Self::ReadVirtualString),
            0x0827 => Some(Self::WriteVirtualString),
            _ => None,
        }
    }

    /// Convert to raw opcode value.
    pub fn to_raw(&self) -> u16 {
        *self as u16
    }
}

/// Virtual string identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum VirtualString {
    /// ASCII serial number.
    SerialNumber = 0x0008,
    /// Accumulated spectrum.
    Spectrum = 0x0200,
    /// Energy calibration coefficients.
    EnergyCalibration = 0x0202,
}

impl VirtualString {
    /// Convert to raw identifier.
    pub fn to_raw(&self) -> u32 {
        *self as u32
    }
}

/// A command ready to be framed: opcode plus argument bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    /// Opcode.
    pub command: Command,
    /// Argument bytes following the header.
    pub args: Vec<u8>,
}

/// Build a request reading a virtual string.
pub fn build_read_request(id: VirtualString) -> CommandRequest {
    CommandRequest {
        command: Command::ReadVirtualString,
        args: id.to_raw().to_le_bytes().to_vec(),
    }
}

/// Build a request clearing the accumulated spectrum.
///
/// Writing an empty spectrum virtual string resets accumulation.
pub fn build_reset_spectrum_request() -> CommandRequest {
    let mut args = Vec::with_capacity(8);
    args.extend_from_slice(&VirtualString::Spectrum.to_raw().to_le_bytes());
    args.extend_from_slice(&0u32.to_le_bytes());
    CommandRequest {
        command: Command::WriteVirtualString,
        args,
    }
}

/// Extract the data of a virtual-string read response.
///
/// Layout: `retcode(u32) + length(u32) + data[length]`.
pub fn parse_read_response(mut body: Bytes) -> Result<Bytes> {
    if body.len() < 8 {
        return Err(Error::protocol(format!(
            "Read response too short: {} bytes",
            body.len()
        )));
    }

    let retcode = body.get_u32_le();
    if retcode != RETCODE_OK {
        return Err(Error::protocol(format!(
            "Device rejected read, return code {}",
            retcode
        )));
    }

    let length = body.get_u32_le() as usize;
    if body.len() < length {
        return Err(Error::decode(format!(
            "Virtual string truncated: header says {} bytes, have {}",
            length,
            body.len()
        )));
    }

    Ok(body.split_to(length))
}

/// Check a virtual-string write response.
///
/// Layout: `retcode(u32)`.
pub fn parse_write_response(mut body: Bytes) -> Result<()> {
    if body.len() < 4 {
        return Err(Error::protocol(format!(
            "Write response too short: {} bytes",
            body.len()
        )));
    }

    match body.get_u32_le() {
        RETCODE_OK => Ok(()),
        retcode => Err(Error::protocol(format!(
            "Device rejected write, return code {}",
            retcode
        ))),
    }
}
