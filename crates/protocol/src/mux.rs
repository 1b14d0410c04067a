//! Multiplexing writer and demultiplexing reader.
//!
//! One duplex stream carries both transfer data and diagnostics. On the write
//! side, [`MuxWriter`] prefixes every chunk with a 4-byte header when
//! multiplexing is enabled for that direction. On the read side,
//! [`DemuxReader`] strips the framing back off: log frames are rendered to a
//! [`MessageSink`] and discarded, and a data frame is never surfaced
//! partially. Draining log frames before returning data is what keeps the
//! peer's diagnostic pipe from filling up and deadlocking the transfer.

use std::io::{self, Read, Write};

use logging::{Message, MessageSink, Severity};

use crate::CHUNK_SIZE;
use crate::envelope::{HEADER_LEN, MAX_PAYLOAD_LENGTH, MessageChannel, MessageHeader};

fn invalid_data<E>(error: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, error)
}

/// Framing writer for one direction of the duplex stream.
///
/// Multiplexing starts disabled; the side acting as protocol server enables
/// it immediately after the handshake, the client side only for the
/// directions the handshake negotiated.
#[derive(Debug)]
pub struct MuxWriter<W> {
    inner: W,
    multiplexed: bool,
    bytes_written: u64,
}

impl<W: Write> MuxWriter<W> {
    /// Wraps `inner` with multiplexing disabled.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            multiplexed: false,
            bytes_written: 0,
        }
    }

    /// Enables multiplexed framing for subsequent writes.
    pub fn enable_multiplex(&mut self) {
        self.multiplexed = true;
    }

    /// Reports whether writes are currently framed.
    #[must_use]
    pub const fn is_multiplexed(&self) -> bool {
        self.multiplexed
    }

    /// Total raw bytes pushed to the underlying stream, headers included.
    #[must_use]
    pub const fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Writes `data` to the data channel, chunking as required.
    pub fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        if !self.multiplexed {
            self.inner.write_all(data)?;
            self.bytes_written += data.len() as u64;
            return Ok(());
        }

        for chunk in data.chunks(CHUNK_SIZE.min(MAX_PAYLOAD_LENGTH as usize)) {
            self.write_frame(MessageChannel::Data, chunk)?;
        }
        Ok(())
    }

    /// Sends an out-of-band diagnostic on the channel matching its severity.
    ///
    /// Returns [`io::ErrorKind::InvalidInput`] when multiplexing is disabled
    /// for this direction, since there is no side channel to carry it.
    pub fn write_message(&mut self, message: &Message) -> io::Result<()> {
        if !self.multiplexed {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot send out-of-band message on a non-multiplexed stream",
            ));
        }

        let channel = match message.severity() {
            Severity::Info => MessageChannel::Info,
            Severity::Warning => MessageChannel::Warning,
            Severity::Error => MessageChannel::Error,
            Severity::Log => MessageChannel::Log,
        };
        let mut text = message.text().as_bytes().to_vec();
        text.push(b'\n');
        self.write_frame(channel, &text)
    }

    fn write_frame(&mut self, channel: MessageChannel, payload: &[u8]) -> io::Result<()> {
        let len = u32::try_from(payload.len())
            .ok()
            .filter(|&len| len <= MAX_PAYLOAD_LENGTH)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("multiplex payload of {} bytes exceeds frame limit", payload.len()),
                )
            })?;
        let header = MessageHeader::new(channel, len).map_err(invalid_data)?;
        self.inner.write_all(&header.encode())?;
        self.inner.write_all(payload)?;
        self.bytes_written += (HEADER_LEN + payload.len()) as u64;
        Ok(())
    }

    /// Flushes the underlying stream.
    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    /// Consumes the wrapper and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for MuxWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// De-framing reader for one direction of the duplex stream.
///
/// When demultiplexing is enabled, every read first drains any pending log
/// frames into the diagnostic sink, then returns bytes from the current data
/// frame only. EOF in the middle of a frame is fatal.
pub struct DemuxReader<R> {
    inner: R,
    multiplexed: bool,
    /// Bytes remaining in the data frame currently being consumed.
    remaining: u32,
    sink: MessageSink<Box<dyn Write + Send>>,
    bytes_read: u64,
}

impl<R: Read> DemuxReader<R> {
    /// Wraps `inner` with demultiplexing disabled, logging to stderr.
    pub fn new(inner: R) -> Self {
        Self::with_sink(inner, MessageSink::new(Box::new(io::stderr())))
    }

    /// Wraps `inner` with an explicit diagnostic sink.
    pub fn with_sink(inner: R, sink: MessageSink<Box<dyn Write + Send>>) -> Self {
        Self {
            inner,
            multiplexed: false,
            remaining: 0,
            sink,
            bytes_read: 0,
        }
    }

    /// Enables demultiplexing for subsequent reads.
    pub fn enable_multiplex(&mut self) {
        self.multiplexed = true;
    }

    /// Reports whether reads currently expect framing.
    #[must_use]
    pub const fn is_multiplexed(&self) -> bool {
        self.multiplexed
    }

    /// Total raw bytes consumed from the underlying stream.
    #[must_use]
    pub const fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Bytes left in the data frame currently being consumed.
    ///
    /// Non-zero means data is already committed on the wire and can be read
    /// without blocking on a new frame header.
    #[must_use]
    pub const fn pending_data_len(&self) -> u32 {
        self.remaining
    }

    /// Reads exactly `n` bytes from the data channel.
    pub fn read_bytes(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Consumes the wrapper and returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Advances past log frames until positioned inside a data frame.
    fn next_data_frame(&mut self) -> io::Result<()> {
        loop {
            let mut raw = [0u8; HEADER_LEN];
            self.inner.read_exact(&mut raw)?;
            self.bytes_read += HEADER_LEN as u64;
            let header = MessageHeader::decode(&raw).map_err(invalid_data)?;

            let Some(severity) = header.channel().severity() else {
                self.remaining = header.payload_len();
                if self.remaining == 0 {
                    // Zero-length data frame: keepalive, wait for the next one.
                    continue;
                }
                return Ok(());
            };

            let mut payload = vec![0u8; header.payload_len() as usize];
            self.inner.read_exact(&mut payload)?;
            self.bytes_read += payload.len() as u64;
            self.deliver_log(severity, &payload)?;
        }
    }

    fn deliver_log(&mut self, severity: Severity, payload: &[u8]) -> io::Result<()> {
        let text = String::from_utf8_lossy(payload);
        let text = text.trim_end_matches('\n');
        let message = match severity {
            Severity::Info => Message::info(text),
            Severity::Warning => Message::warning(text),
            Severity::Error => Message::error(23, text),
            Severity::Log => Message::log(text),
        };
        self.sink.write(&message)
    }
}

impl<R: Read> Read for DemuxReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if !self.multiplexed {
            let n = self.inner.read(buf)?;
            self.bytes_read += n as u64;
            return Ok(n);
        }

        if self.remaining == 0 {
            self.next_data_frame()?;
        }

        let want = buf.len().min(self.remaining as usize);
        let n = self.inner.read(&mut buf[..want])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("stream ended with {} bytes left in a data frame", self.remaining),
            ));
        }
        self.remaining -= n as u32;
        self.bytes_read += n as u64;
        Ok(n)
    }
}

impl<R> std::fmt::Debug for DemuxReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemuxReader")
            .field("multiplexed", &self.multiplexed)
            .field("remaining", &self.remaining)
            .field("bytes_read", &self.bytes_read)
            .finish_non_exhaustive()
    }
}
