//! # jpegcam-core
//!
//! Driver library for LinkSprite LS-Y201 / VC0706 style serial JPEG
//! camera modules.

#![warn(missing_docs)]

//!
//! This library provides:
//! - The fixed binary command/response protocol spoken by the module
//! - Chunked image readout with end-of-image detection and byte-stream
//!   resynchronization after each chunk
//! - Device configuration (compression ratio, resolution, baud-rate
//!   divisor, power-saving mode)
//! - Serial port discovery and setup behind a pluggable transport trait
//!
//! The protocol is strictly synchronous and half-duplex: one command in
//! flight at a time, each answered by a fixed-length response before the
//! next may be issued.
//!
//! ## Example
//!
//! ```rust,ignore
//! use jpegcam_core::{Camera, CameraConfig};
//!
//! let mut camera = Camera::open(&CameraConfig {
//!     port_name: "/dev/ttyUSB0".to_string(),
//!     ..CameraConfig::default()
//! })?;
//!
//! camera.reset()?;
//! camera.take_picture()?;
//! let jpeg = camera.read_image()?;
//! std::fs::write("frame.jpg", &jpeg)?;
//! ```

pub mod camera;
pub mod channel;
pub mod codec;
pub mod commands;
pub mod error;
pub mod serial;
pub mod stream;

pub use camera::{Camera, CameraConfig, CapturePhase};
pub use channel::CommandChannel;
pub use codec::CommandFrame;
pub use commands::{BaudRate, Command, ImageSize};
pub use error::ProtocolError;
pub use serial::{list_ports, open_port, PortInfo};
pub use stream::{ByteStream, SerialStream};

/// Default baud rate of a factory-fresh camera module
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// Default deadline for command responses in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Default image transfer granularity in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 56;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
