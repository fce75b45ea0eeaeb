//! Command transmission and exact-length response accumulation.
//!
//! The channel guarantees two things for every transaction: the full
//! command is physically sent before the response wait begins, and the
//! response is complete and prefix-valid before it is handed back.
//! Content interpretation beyond the prefix stays with the caller.

use std::io::ErrorKind;
use std::time::{Duration, Instant};

use tracing::{trace, warn};

use crate::codec::{check_ack, CommandFrame};
use crate::error::ProtocolError;
use crate::stream::ByteStream;

/// Sleep between availability polls while waiting for device bytes
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Half-duplex command/response channel over a byte stream
pub struct CommandChannel {
    stream: Box<dyn ByteStream>,
    tx_bytes: u64,
    rx_bytes: u64,
    transactions: u64,
}

impl CommandChannel {
    /// Build a channel over any byte stream
    pub fn new(stream: Box<dyn ByteStream>) -> Self {
        Self {
            stream,
            tx_bytes: 0,
            rx_bytes: 0,
            transactions: 0,
        }
    }

    /// Cumulative (tx bytes, rx bytes, completed transactions)
    pub fn counters(&self) -> (u64, u64, u64) {
        (self.tx_bytes, self.rx_bytes, self.transactions)
    }

    /// Discard any stale buffered input
    pub fn discard_input(&mut self) -> Result<(), ProtocolError> {
        self.stream.clear_input()?;
        Ok(())
    }

    /// Send a frame and collect its fixed-length, prefix-checked response
    pub fn transact(
        &mut self,
        frame: &CommandFrame,
        deadline: Duration,
    ) -> Result<Vec<u8>, ProtocolError> {
        trace!(command = ?frame.command, tx = ?frame.bytes, "transact");
        self.send(&frame.bytes)?;

        let mut response = vec![0u8; frame.response_len];
        self.read_exact_deadline(&mut response, deadline)?;
        check_ack(frame, &response)?;
        self.transactions += 1;
        trace!(command = ?frame.command, rx = ?response, "ack");
        Ok(response)
    }

    /// Write all bytes and force physical transmission
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        self.stream.write_all(bytes)?;
        self.stream.flush()?;
        self.tx_bytes += bytes.len() as u64;
        Ok(())
    }

    /// Fill `buf` completely, looping over partial reads.
    ///
    /// Partial reads are normal on the transport and are accumulated;
    /// only deadline expiry turns them into an error.
    pub fn read_exact_deadline(
        &mut self,
        buf: &mut [u8],
        deadline: Duration,
    ) -> Result<(), ProtocolError> {
        let start = Instant::now();
        let mut offset = 0;

        while offset < buf.len() {
            if start.elapsed() > deadline {
                warn!(got = offset, want = buf.len(), "response deadline exceeded");
                return Err(ProtocolError::Timeout);
            }

            let available = self.stream.bytes_to_read()? as usize;
            if available == 0 {
                std::thread::sleep(POLL_INTERVAL);
                continue;
            }

            let want = available.min(buf.len() - offset);
            match self.stream.read(&mut buf[offset..offset + want]) {
                Ok(0) => return Err(ProtocolError::Timeout),
                Ok(n) => {
                    offset += n;
                    self.rx_bytes += n as u64;
                }
                Err(ref e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Read one line terminated by `\n`; the delimiter is consumed but
    /// not returned. Lines longer than `max_len` are a protocol
    /// violation, not a truncation.
    pub fn read_line(
        &mut self,
        max_len: usize,
        deadline: Duration,
    ) -> Result<Vec<u8>, ProtocolError> {
        let start = Instant::now();
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            if start.elapsed() > deadline {
                return Err(ProtocolError::Timeout);
            }

            if self.stream.bytes_to_read()? == 0 {
                std::thread::sleep(POLL_INTERVAL);
                continue;
            }

            match self.stream.read(&mut byte) {
                Ok(0) => return Err(ProtocolError::Timeout),
                Ok(_) => {
                    self.rx_bytes += 1;
                    if byte[0] == b'\n' {
                        return Ok(line);
                    }
                    if line.len() == max_len {
                        return Err(ProtocolError::LineTooLong { limit: max_len });
                    }
                    line.push(byte[0]);
                }
                Err(ref e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Discard exactly `count` padding bytes, polling availability.
    ///
    /// An under-delivering device leaves the stream misaligned; the
    /// deadline turns that into a `Timeout` instead of a hang.
    pub fn drain(&mut self, count: usize, deadline: Duration) -> Result<(), ProtocolError> {
        let start = Instant::now();
        let mut discarded = 0;
        let mut scratch = [0u8; 64];

        while discarded < count {
            if start.elapsed() > deadline {
                warn!(discarded, count, "drain deadline exceeded");
                return Err(ProtocolError::Timeout);
            }

            let available = self.stream.bytes_to_read()? as usize;
            if available == 0 {
                std::thread::sleep(POLL_INTERVAL);
                continue;
            }

            let want = available.min(count - discarded).min(scratch.len());
            match self.stream.read(&mut scratch[..want]) {
                Ok(0) => return Err(ProtocolError::Timeout),
                Ok(n) => {
                    discarded += n;
                    self.rx_bytes += n as u64;
                }
                Err(ref e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {}
                Err(e) => return Err(e.into()),
            }
        }
        trace!(count, "drained");
        Ok(())
    }
}
