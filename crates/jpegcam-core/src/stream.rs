//! Transport abstraction for the camera link.

use serialport::SerialPort;
use std::io::{self, Read, Write};

/// Raw byte transport the protocol runs over.
///
/// `read` may return anywhere between zero and the requested number of
/// bytes per call; callers loop until the required count has arrived.
/// `flush` blocks until previously written bytes are physically sent.
pub trait ByteStream: Read + Write + Send {
    /// Number of buffered unread bytes, polled without blocking
    fn bytes_to_read(&mut self) -> io::Result<u32>;

    /// Discard any buffered input
    fn clear_input(&mut self) -> io::Result<()>;
}

/// Serial port wrapper implementing [`ByteStream`]
pub struct SerialStream {
    port: Box<dyn SerialPort>,
}

impl SerialStream {
    /// Wrap an already-open serial port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl ByteStream for SerialStream {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        self.port
            .bytes_to_read()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}
