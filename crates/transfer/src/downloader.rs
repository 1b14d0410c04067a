//! The downloader half of the receiver: rebuilds files from delta streams.
//!
//! Each response is consumed into a hidden temporary file next to the
//! destination: literal runs are written verbatim, copy tokens pull bytes out
//! of the local basis, and everything written also feeds the whole-file
//! digest. Only when that digest matches the sender's trailer is the
//! temporary renamed into place; any earlier failure leaves the destination
//! untouched.

use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::PathBuf;

use checksums::{FileDigest, STRONG_SUM_LEN};
use protocol::integers::read_int;
use protocol::token::{Token, read_token};
use protocol::{NDX_DONE, Session, SumHead};

use crate::error::{Result, TransferError};
use crate::flist::{FileEntry, FileKind};
use crate::map_file::MapFile;
use crate::metadata::MetadataApplier;
use crate::temp_guard::create_temp;

/// Outcome of one downloader step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DownloadStep {
    /// `files[index]` was reconstructed, verified, and renamed into place.
    Completed {
        /// Index of the finished file.
        index: usize,
    },
    /// The sender's end-of-phase sentinel arrived; no more responses follow.
    Finished,
}

/// Consumes delta streams and rebuilds destination files.
#[derive(Debug)]
pub struct Downloader<'a, M> {
    files: &'a [FileEntry],
    dest_root: PathBuf,
    session: Session,
    applier: M,
    finished: bool,
    completed: u64,
    literal_bytes: u64,
    matched_bytes: u64,
}

impl<'a, M: MetadataApplier> Downloader<'a, M> {
    /// Creates a downloader writing under `dest_root`.
    #[must_use]
    pub fn new(
        files: &'a [FileEntry],
        dest_root: impl Into<PathBuf>,
        session: Session,
        applier: M,
    ) -> Self {
        Self {
            files,
            dest_root: dest_root.into(),
            session,
            applier,
            finished: false,
            completed: 0,
            literal_bytes: 0,
            matched_bytes: 0,
        }
    }

    /// Reports whether the end-of-phase sentinel has been read.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of files reconstructed so far.
    #[must_use]
    pub const fn completed(&self) -> u64 {
        self.completed
    }

    /// File content received as literal data.
    #[must_use]
    pub const fn literal_bytes(&self) -> u64 {
        self.literal_bytes
    }

    /// File content reused from local basis files.
    #[must_use]
    pub const fn matched_bytes(&self) -> u64 {
        self.matched_bytes
    }

    /// Reads and applies one complete response from `reader`.
    pub fn advance<R: Read>(&mut self, reader: &mut R) -> Result<DownloadStep> {
        if self.finished {
            return Ok(DownloadStep::Finished);
        }

        let ndx = read_int(reader).map_err(TransferError::transport)?;
        if ndx == NDX_DONE {
            self.finished = true;
            return Ok(DownloadStep::Finished);
        }

        let (index, entry) = self.lookup(ndx)?;
        let head = SumHead::read(reader).map_err(TransferError::transport)?;
        self.reconstruct(entry, head, reader)?;
        self.completed += 1;
        Ok(DownloadStep::Completed { index })
    }

    fn lookup(&self, ndx: i32) -> Result<(usize, &'a FileEntry)> {
        let index = usize::try_from(ndx)
            .ok()
            .filter(|&index| index < self.files.len())
            .ok_or_else(|| {
                TransferError::protocol(format!(
                    "response for file index {ndx} outside list of {} entries",
                    self.files.len()
                ))
            })?;
        let entry = &self.files[index];
        if entry.kind != FileKind::Regular {
            return Err(TransferError::protocol(format!(
                "response for index {ndx}, which is not a regular file"
            )));
        }
        Ok((index, entry))
    }

    /// Consumes one token stream plus trailer, building the file in a
    /// temporary and renaming it over the destination on success.
    fn reconstruct<R: Read>(
        &mut self,
        entry: &FileEntry,
        head: SumHead,
        reader: &mut R,
    ) -> Result<()> {
        let dest = self.dest_root.join(&entry.path);
        let basis = MapFile::open(&dest).map_err(|e| TransferError::local_io(&dest, e))?;

        let (file, mut guard) =
            create_temp(&dest).map_err(|e| TransferError::local_io(&dest, e))?;
        let mut out = BufWriter::new(file);
        let mut digest = FileDigest::new(self.session.seed());

        loop {
            match read_token(reader).map_err(TransferError::transport)? {
                Token::Literal(data) => {
                    out.write_all(&data)
                        .map_err(|e| TransferError::local_io(guard.path(), e))?;
                    digest.update(&data);
                    self.literal_bytes += data.len() as u64;
                }
                Token::Copy(index) => {
                    let chunk = copy_source(&basis, head, index)?;
                    out.write_all(chunk)
                        .map_err(|e| TransferError::local_io(guard.path(), e))?;
                    digest.update(chunk);
                    self.matched_bytes += chunk.len() as u64;
                }
                Token::Done => break,
            }
        }

        let mut remote = [0u8; STRONG_SUM_LEN];
        reader
            .read_exact(&mut remote)
            .map_err(TransferError::transport)?;
        if digest.finalize() != remote {
            return Err(TransferError::Integrity { path: dest });
        }

        let file = out
            .into_inner()
            .map_err(|e| TransferError::local_io(guard.path(), e.into_error()))?;
        // Close the handle before the rename for non-POSIX filesystems.
        drop(file);

        self.applier
            .apply(guard.path(), entry)
            .map_err(|e| TransferError::local_io(guard.path(), e))?;
        fs::rename(guard.path(), &dest).map_err(|e| TransferError::local_io(&dest, e))?;
        guard.keep();
        Ok(())
    }
}

/// Resolves a copy token to its byte range in the basis.
fn copy_source<'b>(basis: &'b Option<MapFile>, head: SumHead, index: u32) -> Result<&'b [u8]> {
    if index >= head.block_count {
        return Err(TransferError::protocol(format!(
            "copy token references block {index} of {}",
            head.block_count
        )));
    }
    let Some(basis) = basis else {
        return Err(TransferError::protocol(format!(
            "copy token for block {index} but no local basis exists"
        )));
    };

    let offset = u64::from(index) * u64::from(head.block_length);
    let len = u64::from(head.block_len_at(index));
    let end = offset + len;
    if end > basis.len() {
        return Err(TransferError::protocol(format!(
            "copy of block {index} ({offset}+{len}) exceeds basis of {} bytes",
            basis.len()
        )));
    }
    Ok(&basis.as_slice()[offset as usize..end as usize])
}
