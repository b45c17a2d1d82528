//! Request framing and response reassembly.
//!
//! Both directions share one frame format:
//! - Frame: Length(4, LE) + Header(4) + Body
//! - Header: Command(2, LE) + Reserved(1) + Sequence(1)
//!
//! `Length` counts everything after itself. The response header echoes
//! the request header byte for byte.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::commands::{Command, CommandRequest};

/// Sequence numbers carry this bit and cycle through 32 values.
const SEQUENCE_BASE: u8 = 0x80;
const SEQUENCE_MODULUS: u8 = 32;

/// Frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Command opcode.
    pub command: u16,
    /// Sequence number (`0x80..=0x9F`).
    pub sequence: u8,
}

impl FrameHeader {
    /// Header size in bytes.
    pub const SIZE: usize = 4;

    /// Create a header for `command` with the `counter`-th sequence number.
    pub fn new(command: Command, counter: u8) -> Self {
        Self {
            command: command.to_raw(),
            sequence: SEQUENCE_BASE + counter % SEQUENCE_MODULUS,
        }
    }

    /// Serialize the header.
    pub fn to_bytes(&self) -> [u8; 4] {
        let command = self.command.to_le_bytes();
        [command[0], command[1], 0x00, self.sequence]
    }

    /// Parse a header from the front of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::protocol(format!(
                "Header too short: {} bytes",
                data.len()
            )));
        }

        Ok(Self {
            command: u16::from_le_bytes([data[0], data[1]]),
            sequence: data[3],
        })
    }
}

impl std::fmt::Display for FrameHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match Command::from_raw(self.command) {
            Some(command) => write!(f, "{:?}#{:#04x}", command, self.sequence),
            None => write!(f, "{:#06x}#{:#04x}", self.command, self.sequence),
        }
    }
}

/// Serialize a request: Length(4) + Header(4) + Args.
pub fn encode_request(header: FrameHeader, request: &CommandRequest) -> Vec<u8> {
    let length = (FrameHeader::SIZE + request.args.len()) as u32;

    let mut data = Vec::with_capacity(4 + length as usize);
    data.extend_from_slice(&length.to_le_bytes());
    data.extend_from_slice(&header.to_bytes());
    data.extend_from_slice(&request.args);

    data
}

/// Check that a reassembled response answers `expected` and return its body.
pub fn split_response(expected: FrameHeader, mut frame: Bytes) -> Result<Bytes> {
    let header = FrameHeader::parse(&frame)?;

    if frame[..FrameHeader::SIZE] != expected.to_bytes()[..] {
        return Err(Error::protocol(format!(
            "Response header {} does not match request {}",
            header, expected
        )));
    }

    frame.advance(FrameHeader::SIZE);
    Ok(frame)
}

/// Collects notification chunks until one complete response frame is present.
#[derive(Debug, Default)]
pub struct ResponseAssembler {
    buffer: BytesMut,
    expected: Option<usize>,
}

impl ResponseAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk.
    ///
    /// Returns the frame (without its length prefix) once complete.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolError`] if the device sends more bytes
    /// than the length prefix announced.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Option<Bytes>> {
        self.buffer.extend_from_slice(chunk);

        if self.expected.is_none() && self.buffer.len() >= 4 {
            let length = u32::from_le_bytes([
                self.buffer[0],
                self.buffer[1],
                self.buffer[2],
                self.buffer[3],
            ]);
            self.expected = Some(4 + length as usize);
        }

        let expected = match self.expected {
            Some(expected) => expected,
            None => return Ok(None),
        };

        if self.buffer.len() > expected {
            return Err(Error::protocol(format!(
                "Response overran its length: expected {} bytes, got {}",
                expected,
                self.buffer.len()
            )));
        }

        if self.buffer.len() < expected {
            return Ok(None);
        }

        let mut frame = std::mem::take(&mut self.buffer).freeze();
        frame.advance(4);
        self.expected = None;

        Ok(Some(frame))
    }
}
