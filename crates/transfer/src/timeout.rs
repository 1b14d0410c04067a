//! Applying the configured inactivity window to socket transports.
//!
//! The state machines never sleep or poll; a silent peer surfaces as a
//! `TimedOut` or `WouldBlock` read, which [`TransferError::transport`]
//! translates into the fatal [`TransferError::Timeout`]. This module is
//! where [`TransferConfig::io_timeout`] actually reaches the socket.
//!
//! [`TransferError::transport`]: crate::TransferError::transport
//! [`TransferError::Timeout`]: crate::TransferError::Timeout

use std::io;
use std::time::Duration;

use crate::config::TransferConfig;

/// Socket-like transports that support a per-direction inactivity window.
pub trait SetIoTimeout {
    /// Applies `timeout` to both the read and the write direction.
    ///
    /// `None` clears any previously set window.
    fn set_io_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
}

impl SetIoTimeout for std::net::TcpStream {
    fn set_io_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)?;
        self.set_write_timeout(timeout)
    }
}

#[cfg(unix)]
impl SetIoTimeout for std::os::unix::net::UnixStream {
    fn set_io_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)?;
        self.set_write_timeout(timeout)
    }
}

impl TransferConfig {
    /// Arms `stream` with the configured inactivity window.
    ///
    /// Call this on the transport before handing it to the state machines;
    /// with [`io_timeout`](TransferConfig::io_timeout) unset this clears any
    /// existing window.
    pub fn apply_io_timeout<S: SetIoTimeout + ?Sized>(&self, stream: &S) -> io::Result<()> {
        stream.set_io_timeout(self.io_timeout)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    use std::os::unix::net::UnixStream;

    use protocol::{DemuxReader, ProtocolVersion, Session};
    use tempfile::tempdir;

    use crate::downloader::Downloader;
    use crate::error::TransferError;
    use crate::flist::FileEntry;
    use crate::metadata::NoopMetadataApplier;

    #[test]
    fn silent_peer_times_out_fatally() {
        let (ours, _theirs) = UnixStream::pair().unwrap();
        let config = TransferConfig {
            io_timeout: Some(Duration::from_millis(50)),
            ..TransferConfig::default()
        };
        config.apply_io_timeout(&ours).unwrap();

        let dest = tempdir().unwrap();
        let files = [FileEntry::regular("f", 1, 0, 0o644)];
        let session = Session::new(ProtocolVersion::V27, 0);
        let mut downloader = Downloader::new(&files, dest.path(), session, NoopMetadataApplier);

        // The peer end stays open but never writes; the read must expire
        // instead of blocking forever.
        let mut reader = DemuxReader::new(ours);
        let err = downloader.advance(&mut reader).unwrap_err();
        assert!(matches!(err, TransferError::Timeout));
    }
}
