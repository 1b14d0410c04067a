//! The uploader half of the receiver: walks the file list, creates
//! directories and symlinks locally, and writes one checksum request per
//! regular file that needs content.
//!
//! Requests are pipelined: the driver advances the uploader on its own
//! thread while the downloader lags behind, so checksum generation overlaps
//! with reconstruction. Once the list is exhausted the uploader writes the
//! end-of-phase sentinel and goes quiet.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use protocol::integers::write_int;
use protocol::{NDX_DONE, Session};
use signature::FileSignature;

use crate::config::TransferConfig;
use crate::error::{Result, TransferError};
use crate::flist::{FileEntry, FileKind};
use crate::map_file::MapFile;

/// Outcome of one uploader step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UploadStep {
    /// A checksum request for `files[index]` went out on the wire.
    Requested {
        /// Index of the requested file.
        index: usize,
    },
    /// `files[index]` was handled locally; nothing was written.
    Skipped {
        /// Index of the skipped file.
        index: usize,
    },
    /// The list is exhausted and the end-of-phase sentinel has been sent.
    Finished,
}

/// Walks the file list and emits checksum requests.
#[derive(Debug)]
pub struct Uploader<'a> {
    files: &'a [FileEntry],
    dest_root: PathBuf,
    session: Session,
    config: TransferConfig,
    next_index: usize,
    finished: bool,
    requests_sent: u64,
    skipped: u64,
}

impl<'a> Uploader<'a> {
    /// Creates an uploader over the shared file list.
    #[must_use]
    pub fn new(
        files: &'a [FileEntry],
        dest_root: impl Into<PathBuf>,
        session: Session,
        config: TransferConfig,
    ) -> Self {
        Self {
            files,
            dest_root: dest_root.into(),
            session,
            config,
            next_index: 0,
            finished: false,
            requests_sent: 0,
            skipped: 0,
        }
    }

    /// Reports whether the end-of-phase sentinel has been written.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of checksum requests written so far.
    #[must_use]
    pub const fn requests_sent(&self) -> u64 {
        self.requests_sent
    }

    /// Number of entries handled without wire traffic.
    #[must_use]
    pub const fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Handles the next list entry.
    ///
    /// Directories and symlinks are created in place; device and special
    /// entries are skipped; regular files that pass the quick check are
    /// skipped too. The remaining regular files each produce a checksum
    /// request on `writer`. Past the end of the list this writes the
    /// end-of-phase sentinel exactly once.
    pub fn advance<W: Write>(&mut self, writer: &mut W) -> Result<UploadStep> {
        if self.finished {
            return Ok(UploadStep::Finished);
        }
        let Some(entry) = self.files.get(self.next_index) else {
            write_int(writer, NDX_DONE).map_err(TransferError::transport)?;
            writer.flush().map_err(TransferError::transport)?;
            self.finished = true;
            return Ok(UploadStep::Finished);
        };

        let index = self.next_index;
        self.next_index += 1;

        match &entry.kind {
            FileKind::Directory => {
                self.ensure_directory(entry)?;
                self.skipped += 1;
                Ok(UploadStep::Skipped { index })
            }
            FileKind::Symlink { target } => {
                self.ensure_symlink(entry, target)?;
                self.skipped += 1;
                Ok(UploadStep::Skipped { index })
            }
            // Device nodes and named pipes are carried in the list but not
            // materialized; creating them needs privileges this engine does
            // not assume.
            FileKind::Device { .. } | FileKind::Special => {
                self.skipped += 1;
                Ok(UploadStep::Skipped { index })
            }
            FileKind::Regular => {
                if self.config.quick_check && entry.quick_check(&self.dest_root) {
                    self.skipped += 1;
                    return Ok(UploadStep::Skipped { index });
                }
                self.request(entry, index, writer)?;
                self.requests_sent += 1;
                Ok(UploadStep::Requested { index })
            }
        }
    }

    /// Writes the checksum request for one regular file: its list index, the
    /// block layout header, then the per-block checksums of the local basis.
    fn request<W: Write>(&self, entry: &FileEntry, index: usize, writer: &mut W) -> Result<()> {
        let dest = self.dest_root.join(&entry.path);
        let signature = self.basis_signature(&dest)?;

        let ndx = i32::try_from(index).map_err(|_| {
            TransferError::protocol(format!("file index {index} exceeds the wire range"))
        })?;
        write_int(writer, ndx).map_err(TransferError::transport)?;
        signature.head().write(writer).map_err(TransferError::transport)?;
        signature.write_blocks(writer).map_err(TransferError::transport)?;
        writer.flush().map_err(TransferError::transport)?;
        Ok(())
    }

    /// Computes the signature of the basis at `dest`, or the empty signature
    /// when no basis exists yet.
    fn basis_signature(&self, dest: &Path) -> Result<FileSignature> {
        let Some(basis) = MapFile::open(dest).map_err(|e| TransferError::local_io(dest, e))?
        else {
            return Ok(FileSignature::empty(self.config.checksum_length));
        };

        let generated = match self.config.block_length {
            Some(block_length) => FileSignature::generate_with_block_length(
                basis.as_slice(),
                self.session.seed(),
                self.config.checksum_length,
                block_length,
            ),
            None => FileSignature::generate(
                basis.as_slice(),
                self.session.seed(),
                self.config.checksum_length,
            ),
        };
        generated.map_err(|e| TransferError::local_io(dest, io::Error::other(e)))
    }

    fn ensure_directory(&self, entry: &FileEntry) -> Result<()> {
        let dest = self.dest_root.join(&entry.path);
        match fs::symlink_metadata(&dest) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(TransferError::local_io(
                &dest,
                io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "destination exists and is not a directory",
                ),
            )),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&dest).map_err(|e| TransferError::local_io(&dest, e))
            }
            Err(error) => Err(TransferError::local_io(&dest, error)),
        }
    }

    #[cfg(unix)]
    fn ensure_symlink(&self, entry: &FileEntry, target: &Path) -> Result<()> {
        let dest = self.dest_root.join(&entry.path);
        match fs::read_link(&dest) {
            Ok(existing) if existing == target => return Ok(()),
            Ok(_) => {
                // Wrong target: replace the link.
                fs::remove_file(&dest).map_err(|e| TransferError::local_io(&dest, e))?;
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => {
                // Present but not a symlink.
                if fs::symlink_metadata(&dest).is_ok() {
                    fs::remove_file(&dest).map_err(|e| TransferError::local_io(&dest, e))?;
                } else {
                    return Err(TransferError::local_io(&dest, error));
                }
            }
        }
        std::os::unix::fs::symlink(target, &dest).map_err(|e| TransferError::local_io(&dest, e))
    }

    #[cfg(not(unix))]
    fn ensure_symlink(&self, _entry: &FileEntry, _target: &Path) -> Result<()> {
        Ok(())
    }
}
