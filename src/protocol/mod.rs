//! Protocol module for building commands and parsing responses.
//!
//! This module contains the implementations for:
//! - Command opcodes and virtual-string access
//! - Request framing and response reassembly

pub mod commands;
pub mod frame;

pub use commands::{Command, CommandRequest, VirtualString};
pub use frame::{FrameHeader, ResponseAssembler};
