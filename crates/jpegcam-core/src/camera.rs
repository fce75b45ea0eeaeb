//! Capture session and device operations.
//!
//! Owns the streaming state for chunked image readout: the read offset,
//! total image size, the end-of-image latch, and the per-chunk
//! resynchronization drain that keeps the byte stream aligned for the
//! next command.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::channel::CommandChannel;
use crate::codec::{self, CommandFrame, CHUNK_STATUS_LEN};
use crate::commands::{BaudRate, Command, ImageSize};
use crate::error::ProtocolError;
use crate::serial::open_port;
use crate::stream::{ByteStream, SerialStream};
use crate::{DEFAULT_BAUD_RATE, DEFAULT_CHUNK_SIZE, DEFAULT_TIMEOUT_MS};

/// JPEG end-of-image marker, doubling as the readout termination signal
const END_MARKER: [u8; 2] = [0xff, 0xd9];

/// Line closing the module's boot banner after a reset
const BOOT_SENTINEL: &[u8] = b"Init end\r";

/// Upper bound on one boot-banner line; longer lines are a protocol
/// violation rather than a truncation
const MAX_BANNER_LINE: usize = 64;

/// Capture session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Serial port name
    pub port_name: String,

    /// Baud rate of the physical link
    pub baud_rate: u32,

    /// Transfer granularity in bytes; must be a positive multiple of 8
    pub chunk_size: usize,

    /// Response deadline in milliseconds; overrides the per-command
    /// defaults when set to anything but [`DEFAULT_TIMEOUT_MS`]
    pub timeout_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Readout phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapturePhase {
    /// No frame is frozen for readout
    Idle,
    /// A frame is frozen and image bytes remain
    Capturing,
    /// A padding drain was interrupted; stream alignment is unknown
    Draining,
    /// The end marker has been read; the image is complete
    Complete,
}

/// A session against one camera module on one serial link.
///
/// The protocol is strictly half-duplex with no pipelining; one command
/// is in flight at a time, enforced by `&mut self` on every operation.
/// Operations are only valid in order: chunk reads belong between
/// [`Camera::take_picture`] and end of image.
pub struct Camera {
    channel: CommandChannel,
    chunk_size: usize,
    timeout_ms: u64,
    address: usize,
    image_size: usize,
    eof: bool,
    phase: CapturePhase,
}

impl fmt::Debug for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Camera")
            .field("chunk_size", &self.chunk_size)
            .field("timeout_ms", &self.timeout_ms)
            .field("address", &self.address)
            .field("image_size", &self.image_size)
            .field("eof", &self.eof)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl Camera {
    /// Open the configured serial port and build a session on it
    pub fn open(config: &CameraConfig) -> Result<Self, ProtocolError> {
        let port = open_port(&config.port_name, config.baud_rate)?;
        Self::with_stream(Box::new(SerialStream::new(port)), config)
    }

    /// Build a session on an already-open byte stream
    pub fn with_stream(
        stream: Box<dyn ByteStream>,
        config: &CameraConfig,
    ) -> Result<Self, ProtocolError> {
        check_chunk_size(config.chunk_size)?;
        Ok(Self {
            channel: CommandChannel::new(stream),
            chunk_size: config.chunk_size,
            timeout_ms: config.timeout_ms,
            address: 0,
            image_size: 0,
            eof: false,
            phase: CapturePhase::Idle,
        })
    }

    /// An explicit config timeout overrides the per-command defaults
    fn deadline(&self, command: Command) -> Duration {
        if self.timeout_ms == DEFAULT_TIMEOUT_MS {
            Duration::from_millis(command.timeout_ms())
        } else {
            Duration::from_millis(self.timeout_ms)
        }
    }

    /// Reset the camera and wait for its boot banner to finish.
    ///
    /// Stale bytes from a prior operation are discarded before the
    /// command goes out. The banner is then consumed line by line up to
    /// and including the closing sentinel; nothing past the sentinel
    /// line is read.
    pub fn reset(&mut self) -> Result<(), ProtocolError> {
        self.channel.discard_input()?;

        let deadline = self.deadline(Command::Reset);
        self.channel.transact(&CommandFrame::reset(), deadline)?;

        let start = Instant::now();
        loop {
            let remaining = deadline
                .checked_sub(start.elapsed())
                .ok_or(ProtocolError::Timeout)?;
            let line = self.channel.read_line(MAX_BANNER_LINE, remaining)?;
            debug!(line = %String::from_utf8_lossy(&line), "boot banner");
            if line.starts_with(BOOT_SENTINEL) {
                break;
            }
        }

        self.address = 0;
        self.image_size = 0;
        self.eof = false;
        self.phase = CapturePhase::Idle;
        info!("camera reset complete");
        Ok(())
    }

    /// Query the byte count of the image currently held by the camera
    pub fn query_size(&mut self) -> Result<u16, ProtocolError> {
        let response = self
            .channel
            .transact(&CommandFrame::size_query(), self.deadline(Command::SizeQuery))?;
        let size = codec::decode_image_size(&response)?;
        debug!(size, "image size");
        Ok(size)
    }

    /// Freeze the current frame and begin a readout session
    pub fn take_picture(&mut self) -> Result<(), ProtocolError> {
        self.channel.transact(
            &CommandFrame::take_picture(),
            self.deadline(Command::TakePicture),
        )?;
        self.address = 0;
        self.eof = false;
        self.image_size = self.query_size()? as usize;
        self.phase = CapturePhase::Capturing;
        info!(image_size = self.image_size, "capture started");
        Ok(())
    }

    /// Resume the video pipeline on the device side.
    ///
    /// Readout state is left untouched; only a subsequent
    /// [`Camera::take_picture`] or [`Camera::reset`] starts over.
    pub fn stop_picture(&mut self) -> Result<(), ProtocolError> {
        self.channel.transact(
            &CommandFrame::stop_picture(),
            self.deadline(Command::StopPicture),
        )?;
        Ok(())
    }

    /// Read the next chunk of image data into `buf`.
    ///
    /// Call repeatedly until [`Camera::is_eof`] reports true. `buf` must
    /// hold at least one full chunk. Returns the number of image bytes
    /// copied; the final chunk of an image is shorter than the
    /// configured chunk size unless the size divides evenly.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
        if self.phase != CapturePhase::Capturing {
            return Err(ProtocolError::NotCapturing);
        }
        if buf.len() < self.chunk_size {
            return Err(ProtocolError::BufferTooSmall {
                need: self.chunk_size,
                got: buf.len(),
            });
        }

        let deadline = self.deadline(Command::ReadChunk);
        let frame = CommandFrame::read_chunk(self.address as u16, self.chunk_size as u16);
        self.channel.transact(&frame, deadline)?;

        // Between the ack and the end of the drain the stream carries
        // payload and padding; a failure anywhere in this window leaves
        // alignment unknown, so the phase only returns to Capturing once
        // the residue is fully consumed.
        self.phase = CapturePhase::Draining;

        let to_copy = self.chunk_size.min(self.image_size - self.address);
        self.channel
            .read_exact_deadline(&mut buf[..to_copy], deadline)?;
        self.address += to_copy;

        // The device pads every response to the requested chunk size and
        // closes it with a second status block; the residue must be
        // consumed or the next command reads garbage.
        let residue = self.chunk_size - to_copy + CHUNK_STATUS_LEN;
        self.channel.drain(residue, deadline)?;

        if self.address == self.image_size {
            // The JPEG end marker only terminates the readout on the
            // chunk that exhausts the image; a full mid-stream chunk can
            // end in FF D9 by coincidence and must not latch EOF.
            self.eof = true;
            self.phase = CapturePhase::Complete;
            if to_copy >= 2 && buf[to_copy - 2..to_copy] == END_MARKER {
                info!(total = self.address, "image complete");
            } else {
                warn!(total = self.address, "image exhausted without end marker");
            }
        } else {
            self.phase = CapturePhase::Capturing;
        }

        debug!(
            copied = to_copy,
            address = self.address,
            remaining = self.image_size - self.address,
            "chunk read"
        );
        Ok(to_copy)
    }

    /// Read the remaining image, assembling chunks until the end marker
    pub fn read_image(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let mut image = Vec::with_capacity(self.image_size - self.address);
        let mut chunk = vec![0u8; self.chunk_size];
        while !self.eof {
            let n = self.read_chunk(&mut chunk)?;
            image.extend_from_slice(&chunk[..n]);
        }
        Ok(image)
    }

    /// Set the JPEG compression ratio
    pub fn set_compression_ratio(&mut self, ratio: u8) -> Result<(), ProtocolError> {
        self.channel.transact(
            &CommandFrame::set_compression(ratio),
            self.deadline(Command::SetCompression),
        )?;
        Ok(())
    }

    /// Ask the camera to switch its serial divisor.
    ///
    /// Only the configuration command is sent; reconfiguring the host
    /// side of the link is left to the caller.
    pub fn set_baud_rate(&mut self, rate: BaudRate) -> Result<(), ProtocolError> {
        self.channel.transact(
            &CommandFrame::set_baud_rate(rate),
            self.deadline(Command::SetBaudRate),
        )?;
        Ok(())
    }

    /// Select the capture resolution.
    ///
    /// The module requires re-initialization after a resolution change,
    /// so this performs the reset and boot-banner wait before returning.
    pub fn set_image_size(&mut self, size: ImageSize) -> Result<(), ProtocolError> {
        self.channel.transact(
            &CommandFrame::set_image_size(size),
            self.deadline(Command::SetImageSize),
        )?;
        self.reset()
    }

    /// Enter power-saving mode
    pub fn enter_power_saving(&mut self) -> Result<(), ProtocolError> {
        self.power_saving(true)
    }

    /// Leave power-saving mode
    pub fn quit_power_saving(&mut self) -> Result<(), ProtocolError> {
        self.power_saving(false)
    }

    fn power_saving(&mut self, enter: bool) -> Result<(), ProtocolError> {
        self.channel.transact(
            &CommandFrame::power_saving(enter),
            self.deadline(Command::PowerSaving),
        )?;
        Ok(())
    }

    /// Change the transfer granularity; must be a positive multiple of 8
    pub fn set_chunk_size(&mut self, size: usize) -> Result<(), ProtocolError> {
        check_chunk_size(size)?;
        self.chunk_size = size;
        Ok(())
    }

    /// Configured transfer granularity in bytes
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Whether the end of the current image has been reached
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Byte offset into the image already retrieved
    pub fn address(&self) -> usize {
        self.address
    }

    /// Total byte count of the image under readout
    pub fn image_size(&self) -> usize {
        self.image_size
    }

    /// Current readout phase
    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    /// Cumulative (tx bytes, rx bytes, transactions) on the link
    pub fn counters(&self) -> (u64, u64, u64) {
        self.channel.counters()
    }
}

fn check_chunk_size(size: usize) -> Result<(), ProtocolError> {
    if size == 0 || size % 8 != 0 {
        return Err(ProtocolError::InvalidChunkSize(size));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CameraConfig::default();
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
    }

    #[test]
    fn test_chunk_size_validation() {
        assert!(check_chunk_size(56).is_ok());
        assert!(check_chunk_size(8).is_ok());
        assert!(check_chunk_size(0).is_err());
        assert!(check_chunk_size(13).is_err());
        assert!(check_chunk_size(60).is_err());
    }
}
