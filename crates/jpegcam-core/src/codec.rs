//! Command framing and response validation.
//!
//! Every operation is a fixed byte template; multi-byte fields are
//! big-endian. Responses open with a fixed prefix that must match
//! exactly for the transaction to count as valid.

use byteorder::{BigEndian, ByteOrder};

use crate::commands::{BaudRate, Command, ImageSize};
use crate::error::ProtocolError;

/// Length of the fixed status block framing chunk payloads.
///
/// The device sends it once before the payload and once after the
/// padding; the trailing copy is consumed by the resynchronization
/// drain.
pub const CHUNK_STATUS_LEN: usize = 5;

/// Length of a size-query response; the image size sits in its tail
pub const SIZE_RESPONSE_LEN: usize = 9;

/// A framed command together with its expected response shape
#[derive(Debug, Clone)]
pub struct CommandFrame {
    /// Operation this frame encodes
    pub command: Command,
    /// Raw bytes to transmit
    pub bytes: Vec<u8>,
    /// Fixed prefix the device response must open with
    pub ack: &'static [u8],
    /// Exact response length to wait for before validation
    pub response_len: usize,
}

impl CommandFrame {
    /// Query the byte count of the image currently held by the camera
    pub fn size_query() -> Self {
        Self {
            command: Command::SizeQuery,
            bytes: vec![0x56, 0x00, 0x34, 0x01, 0x00],
            ack: &[0x76, 0x00, 0x34, 0x00, 0x04, 0x00],
            response_len: SIZE_RESPONSE_LEN,
        }
    }

    /// Reset the module; the boot banner follows the 4-byte ack
    pub fn reset() -> Self {
        Self {
            command: Command::Reset,
            bytes: vec![0x56, 0x00, 0x26, 0x00],
            ack: &[0x76, 0x00, 0x26, 0x00],
            response_len: 4,
        }
    }

    /// Freeze the current frame for readout
    pub fn take_picture() -> Self {
        Self {
            command: Command::TakePicture,
            bytes: vec![0x56, 0x00, 0x36, 0x01, 0x00],
            ack: &[0x76, 0x00, 0x36, 0x00, 0x00],
            response_len: 5,
        }
    }

    /// Resume the video pipeline after readout
    pub fn stop_picture() -> Self {
        Self {
            command: Command::StopPicture,
            bytes: vec![0x56, 0x00, 0x36, 0x01, 0x03],
            ack: &[0x76, 0x00, 0x36, 0x00, 0x00],
            response_len: 5,
        }
    }

    /// Read `len` bytes of image data starting at `address`.
    ///
    /// The response is a 5-byte status block, then the payload padded to
    /// `len` bytes, then a trailing status block. Only the status header
    /// is part of `response_len`; the caller collects the payload and
    /// drains the rest.
    pub fn read_chunk(address: u16, len: u16) -> Self {
        let mut bytes = vec![0x56, 0x00, 0x32, 0x0c, 0x00, 0x0a, 0x00, 0x00];
        let mut field = [0u8; 2];
        BigEndian::write_u16(&mut field, address);
        bytes.extend_from_slice(&field);
        bytes.extend_from_slice(&[0x00, 0x00]);
        BigEndian::write_u16(&mut field, len);
        bytes.extend_from_slice(&field);
        // Fixed device-side transfer delay parameter
        bytes.extend_from_slice(&[0x00, 0x0a]);
        Self {
            command: Command::ReadChunk,
            bytes,
            ack: &[0x76, 0x00, 0x32, 0x00, 0x00],
            response_len: CHUNK_STATUS_LEN,
        }
    }

    /// Set the JPEG compression ratio
    pub fn set_compression(ratio: u8) -> Self {
        Self {
            command: Command::SetCompression,
            bytes: vec![0x56, 0x00, 0x31, 0x05, 0x01, 0x01, 0x12, 0x04, ratio],
            ack: &[0x76, 0x00, 0x31, 0x00, 0x00],
            response_len: 5,
        }
    }

    /// Select the serial baud-rate divisor
    pub fn set_baud_rate(rate: BaudRate) -> Self {
        let mut bytes = vec![0x56, 0x00, 0x24, 0x03, 0x01];
        let mut field = [0u8; 2];
        BigEndian::write_u16(&mut field, rate.code());
        bytes.extend_from_slice(&field);
        Self {
            command: Command::SetBaudRate,
            bytes,
            ack: &[0x76, 0x00, 0x24, 0x00, 0x00],
            response_len: 5,
        }
    }

    /// Select the capture resolution; the module must be reset afterwards
    pub fn set_image_size(size: ImageSize) -> Self {
        Self {
            command: Command::SetImageSize,
            bytes: vec![0x56, 0x00, 0x31, 0x05, 0x04, 0x01, 0x00, 0x19, size.code()],
            ack: &[0x76, 0x00, 0x31, 0x00, 0x00],
            response_len: 5,
        }
    }

    /// Enter (`true`) or leave (`false`) power-saving mode
    pub fn power_saving(enter: bool) -> Self {
        let mode = if enter { 0x01 } else { 0x00 };
        Self {
            command: Command::PowerSaving,
            bytes: vec![0x56, 0x00, 0x3e, 0x03, 0x00, 0x01, mode],
            ack: &[0x76, 0x00, 0x3e, 0x00, 0x00],
            response_len: 5,
        }
    }
}

/// Validate the fixed response prefix for a frame.
///
/// A mismatch means the byte stream has lost command/response framing;
/// the caller can realign with a reset or abandon the session.
pub fn check_ack(frame: &CommandFrame, response: &[u8]) -> Result<(), ProtocolError> {
    if response.len() < frame.ack.len() || &response[..frame.ack.len()] != frame.ack {
        return Err(ProtocolError::Desync {
            command: frame.command,
            expected: frame.ack.to_vec(),
            observed: response.to_vec(),
        });
    }
    Ok(())
}

/// Decode the image size from the big-endian tail of a size-query
/// response
pub fn decode_image_size(response: &[u8]) -> Result<u16, ProtocolError> {
    if response.len() < SIZE_RESPONSE_LEN {
        return Err(ProtocolError::Desync {
            command: Command::SizeQuery,
            expected: CommandFrame::size_query().ack.to_vec(),
            observed: response.to_vec(),
        });
    }
    Ok(BigEndian::read_u16(&response[7..9]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fixed_frames_are_byte_exact() {
        assert_eq!(
            CommandFrame::size_query().bytes,
            vec![0x56, 0x00, 0x34, 0x01, 0x00]
        );
        assert_eq!(CommandFrame::reset().bytes, vec![0x56, 0x00, 0x26, 0x00]);
        assert_eq!(
            CommandFrame::take_picture().bytes,
            vec![0x56, 0x00, 0x36, 0x01, 0x00]
        );
        assert_eq!(
            CommandFrame::stop_picture().bytes,
            vec![0x56, 0x00, 0x36, 0x01, 0x03]
        );
    }

    #[test]
    fn test_read_chunk_frame_layout() {
        let frame = CommandFrame::read_chunk(0x1234, 56);
        assert_eq!(
            frame.bytes,
            vec![
                0x56, 0x00, 0x32, 0x0c, 0x00, 0x0a, 0x00, 0x00, // fixed preamble
                0x12, 0x34, 0x00, 0x00, // address, big-endian
                0x00, 0x38, // length, big-endian
                0x00, 0x0a, // transfer delay
            ]
        );
        assert_eq!(frame.response_len, CHUNK_STATUS_LEN);
    }

    #[test]
    fn test_parameter_frames() {
        assert_eq!(
            CommandFrame::set_compression(0x36).bytes,
            vec![0x56, 0x00, 0x31, 0x05, 0x01, 0x01, 0x12, 0x04, 0x36]
        );
        assert_eq!(
            CommandFrame::set_baud_rate(BaudRate::B115200).bytes,
            vec![0x56, 0x00, 0x24, 0x03, 0x01, 0x0d, 0xa6]
        );
        assert_eq!(
            CommandFrame::set_image_size(ImageSize::Qvga).bytes,
            vec![0x56, 0x00, 0x31, 0x05, 0x04, 0x01, 0x00, 0x19, 0x11]
        );
        assert_eq!(
            CommandFrame::power_saving(true).bytes,
            vec![0x56, 0x00, 0x3e, 0x03, 0x00, 0x01, 0x01]
        );
        assert_eq!(
            CommandFrame::power_saving(false).bytes,
            vec![0x56, 0x00, 0x3e, 0x03, 0x00, 0x01, 0x00]
        );
    }

    #[test]
    fn test_check_ack_accepts_matching_prefix() {
        let frame = CommandFrame::take_picture();
        assert!(check_ack(&frame, &[0x76, 0x00, 0x36, 0x00, 0x00]).is_ok());
    }

    #[test]
    fn test_check_ack_rejects_mismatch() {
        let frame = CommandFrame::take_picture();
        let err = check_ack(&frame, &[0x76, 0x00, 0x26, 0x00, 0x00]).unwrap_err();
        match err {
            ProtocolError::Desync {
                command,
                expected,
                observed,
            } => {
                assert_eq!(command, Command::TakePicture);
                assert_eq!(expected, vec![0x76, 0x00, 0x36, 0x00, 0x00]);
                assert_eq!(observed, vec![0x76, 0x00, 0x26, 0x00, 0x00]);
            }
            other => panic!("expected Desync, got {other:?}"),
        }
    }

    #[test]
    fn test_check_ack_rejects_short_response() {
        let frame = CommandFrame::reset();
        assert!(check_ack(&frame, &[0x76, 0x00]).is_err());
    }

    #[test]
    fn test_image_size_roundtrip() {
        for size in [0u16, 1, 56, 130, 0x1234, 0xfffe, 0xffff] {
            let mut response = vec![0x76, 0x00, 0x34, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00];
            BigEndian::write_u16(&mut response[7..9], size);
            assert_eq!(decode_image_size(&response).unwrap(), size);
        }
    }

    #[test]
    fn test_decode_rejects_truncated_response() {
        assert!(decode_image_size(&[0x76, 0x00, 0x34]).is_err());
    }
}
