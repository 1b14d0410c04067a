//! Applying list-entry metadata to reconstructed files.
//!
//! The mtime matters beyond fidelity: the next run's quick check compares it,
//! so failing to set it would force a re-transfer every time.

use std::fs;
use std::io;
use std::path::Path;

use filetime::FileTime;

use crate::flist::{FileEntry, mtime_to_system_time};

/// Applies a [`FileEntry`]'s metadata to a path on the local filesystem.
///
/// A trait so tests can observe or suppress metadata application without
/// touching real permission bits.
pub trait MetadataApplier {
    /// Sets permissions and modification time on `path` from `entry`.
    fn apply(&self, path: &Path, entry: &FileEntry) -> io::Result<()>;
}

/// The default applier: permission bits where the platform has them, then
/// the modification time.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsMetadataApplier;

impl MetadataApplier for FsMetadataApplier {
    fn apply(&self, path: &Path, entry: &FileEntry) -> io::Result<()> {
        set_mode(path, entry.mode)?;
        let mtime = FileTime::from(mtime_to_system_time(entry.mtime));
        filetime::set_file_mtime(path, mtime)
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// An applier that does nothing, for tests exercising transfer logic alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetadataApplier;

impl MetadataApplier for NoopMetadataApplier {
    fn apply(&self, _path: &Path, _entry: &FileEntry) -> io::Result<()> {
        Ok(())
    }
}
