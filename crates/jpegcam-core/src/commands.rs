//! Protocol commands
//!
//! Names the device operations of the camera protocol and the fixed
//! codes the module understands for baud rates and capture resolutions.

use serde::{Deserialize, Serialize};

use crate::DEFAULT_TIMEOUT_MS;

/// Device operations of the camera protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Query the byte count of the currently held image (opcode 0x34)
    SizeQuery,

    /// Reset the module and replay its boot banner (opcode 0x26)
    Reset,

    /// Freeze the current frame for readout (opcode 0x36)
    TakePicture,

    /// Resume the video pipeline after readout (opcode 0x36)
    StopPicture,

    /// Read one chunk of image data at an offset (opcode 0x32)
    ReadChunk,

    /// Set the JPEG compression ratio (opcode 0x31)
    SetCompression,

    /// Select the serial baud-rate divisor (opcode 0x24)
    SetBaudRate,

    /// Select the capture resolution (opcode 0x31)
    SetImageSize,

    /// Enter or leave power-saving mode (opcode 0x3E)
    PowerSaving,
}

impl Command {
    /// Protocol opcode byte carried in both command and response
    pub fn opcode(&self) -> u8 {
        match self {
            Command::SizeQuery => 0x34,
            Command::Reset => 0x26,
            Command::TakePicture | Command::StopPicture => 0x36,
            Command::ReadChunk => 0x32,
            Command::SetCompression | Command::SetImageSize => 0x31,
            Command::SetBaudRate => 0x24,
            Command::PowerSaving => 0x3e,
        }
    }

    /// Default response deadline for this operation in milliseconds
    pub fn timeout_ms(&self) -> u64 {
        match self {
            // The module reboots and replays its full boot banner
            Command::Reset => 5000,
            _ => DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Serial baud-rate divisor codes understood by the camera.
///
/// The wire values are device-specific divisors, not literal baud rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaudRate {
    /// 9600 baud
    B9600,
    /// 19200 baud
    B19200,
    /// 38400 baud (factory default)
    B38400,
    /// 57600 baud
    B57600,
    /// 115200 baud
    B115200,
}

impl BaudRate {
    /// Divisor code transmitted in the configuration command
    pub fn code(&self) -> u16 {
        match self {
            BaudRate::B9600 => 0xaec8,
            BaudRate::B19200 => 0x56e4,
            BaudRate::B38400 => 0x2af2,
            BaudRate::B57600 => 0x1c4c,
            BaudRate::B115200 => 0x0da6,
        }
    }

    /// Literal rate in bits per second
    pub fn bps(&self) -> u32 {
        match self {
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
            BaudRate::B57600 => 57600,
            BaudRate::B115200 => 115200,
        }
    }
}

/// Capture resolutions selectable on the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSize {
    /// 640x480
    Vga,
    /// 320x240
    Qvga,
    /// 160x120
    Qqvga,
}

impl ImageSize {
    /// Resolution code transmitted in the configuration command
    pub fn code(&self) -> u8 {
        match self {
            ImageSize::Vga => 0x00,
            ImageSize::Qvga => 0x11,
            ImageSize::Qqvga => 0x22,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcodes() {
        assert_eq!(Command::SizeQuery.opcode(), 0x34);
        assert_eq!(Command::TakePicture.opcode(), 0x36);
        assert_eq!(Command::StopPicture.opcode(), 0x36);
        assert_eq!(Command::ReadChunk.opcode(), 0x32);
        assert_eq!(Command::PowerSaving.opcode(), 0x3e);
    }

    #[test]
    fn test_reset_gets_longer_deadline() {
        assert!(Command::Reset.timeout_ms() > Command::SizeQuery.timeout_ms());
    }

    #[test]
    fn test_baud_codes() {
        assert_eq!(BaudRate::B9600.code(), 0xaec8);
        assert_eq!(BaudRate::B19200.code(), 0x56e4);
        assert_eq!(BaudRate::B38400.code(), 0x2af2);
        assert_eq!(BaudRate::B57600.code(), 0x1c4c);
        assert_eq!(BaudRate::B115200.code(), 0x0da6);
    }

    #[test]
    fn test_image_size_codes() {
        assert_eq!(ImageSize::Vga.code(), 0x00);
        assert_eq!(ImageSize::Qvga.code(), 0x11);
        assert_eq!(ImageSize::Qqvga.code(), 0x22);
    }
}
