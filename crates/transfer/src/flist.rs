//! The per-run file list.
//!
//! Both peers hold an identical copy of this list for the duration of a run;
//! every wire message that names a file does so by index into it. How the
//! list is built and exchanged is the caller's concern, so the types here are
//! plain data.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// What kind of filesystem object a list entry describes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FileKind {
    /// A regular file, eligible for delta transfer.
    Regular,
    /// A directory, created locally by the receiver.
    Directory,
    /// A symbolic link and its target, recreated locally by the receiver.
    Symlink {
        /// Link target, stored verbatim.
        target: PathBuf,
    },
    /// A character or block device node.
    Device {
        /// Packed major/minor device identifier.
        rdev: u64,
    },
    /// A FIFO or socket.
    Special,
}

/// One entry of the shared file list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileEntry {
    /// Path relative to the transfer root, identical on both sides.
    pub path: PathBuf,
    /// Object kind.
    pub kind: FileKind,
    /// Size in bytes; zero for non-regular entries.
    pub size: u64,
    /// Modification time as seconds since the Unix epoch.
    pub mtime: i64,
    /// Permission bits.
    pub mode: u32,
}

impl FileEntry {
    /// Builds a regular-file entry.
    #[must_use]
    pub fn regular(path: impl Into<PathBuf>, size: u64, mtime: i64, mode: u32) -> Self {
        Self {
            path: path.into(),
            kind: FileKind::Regular,
            size,
            mtime,
            mode,
        }
    }

    /// Builds a directory entry.
    #[must_use]
    pub fn directory(path: impl Into<PathBuf>, mode: u32) -> Self {
        Self {
            path: path.into(),
            kind: FileKind::Directory,
            size: 0,
            mtime: 0,
            mode,
        }
    }

    /// Builds a symlink entry.
    #[must_use]
    pub fn symlink(path: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: FileKind::Symlink {
                target: target.into(),
            },
            size: 0,
            mtime: 0,
            mode: 0o777,
        }
    }

    /// Builds a device-node entry.
    #[must_use]
    pub fn device(path: impl Into<PathBuf>, rdev: u64, mode: u32) -> Self {
        Self {
            path: path.into(),
            kind: FileKind::Device { rdev },
            size: 0,
            mtime: 0,
            mode,
        }
    }

    /// Builds a FIFO or socket entry.
    #[must_use]
    pub fn special(path: impl Into<PathBuf>, mode: u32) -> Self {
        Self {
            path: path.into(),
            kind: FileKind::Special,
            size: 0,
            mtime: 0,
            mode,
        }
    }

    /// Reads an entry from the filesystem at `root.join(path)`.
    ///
    /// Symlinks are not followed; the entry records the link itself.
    pub fn from_fs(root: &Path, path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let full = root.join(&path);
        let meta = fs::symlink_metadata(&full)?;

        let kind = if meta.file_type().is_symlink() {
            FileKind::Symlink {
                target: fs::read_link(&full)?,
            }
        } else if meta.is_dir() {
            FileKind::Directory
        } else if meta.is_file() {
            FileKind::Regular
        } else {
            special_kind(&meta)
        };

        Ok(Self {
            size: if kind == FileKind::Regular { meta.len() } else { 0 },
            mtime: mtime_of(&meta),
            mode: mode_of(&meta),
            path,
            kind,
        })
    }

    /// Reports whether the destination already matches this entry's size and
    /// modification time, making a content transfer unnecessary.
    ///
    /// Only regular files are quick-checked; a missing or non-regular
    /// destination always fails the check.
    #[must_use]
    pub fn quick_check(&self, dest_root: &Path) -> bool {
        if self.kind != FileKind::Regular {
            return false;
        }
        let Ok(meta) = fs::symlink_metadata(dest_root.join(&self.path)) else {
            return false;
        };
        meta.is_file() && meta.len() == self.size && mtime_of(&meta) == self.mtime
    }
}

/// Extracts the mtime as Unix seconds, saturating for pre-epoch times.
fn mtime_of(meta: &fs::Metadata) -> i64 {
    let Ok(modified) = meta.modified() else {
        return 0;
    };
    match modified.duration_since(UNIX_EPOCH) {
        Ok(since) => i64::try_from(since.as_secs()).unwrap_or(i64::MAX),
        Err(before) => -i64::try_from(before.duration().as_secs()).unwrap_or(i64::MAX),
    }
}

/// Classifies a non-file, non-dir, non-symlink object.
#[cfg(unix)]
fn special_kind(meta: &fs::Metadata) -> FileKind {
    use std::os::unix::fs::{FileTypeExt, MetadataExt};

    let file_type = meta.file_type();
    if file_type.is_char_device() || file_type.is_block_device() {
        FileKind::Device { rdev: meta.rdev() }
    } else {
        FileKind::Special
    }
}

#[cfg(not(unix))]
fn special_kind(_meta: &fs::Metadata) -> FileKind {
    FileKind::Special
}

#[cfg(unix)]
fn mode_of(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    meta.mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(meta: &fs::Metadata) -> u32 {
    if meta.permissions().readonly() { 0o444 } else { 0o644 }
}

/// Converts an entry mtime back to a [`SystemTime`].
#[must_use]
pub fn mtime_to_system_time(mtime: i64) -> SystemTime {
    if mtime >= 0 {
        UNIX_EPOCH + Duration::from_secs(mtime as u64)
    } else {
        UNIX_EPOCH - Duration::from_secs(mtime.unsigned_abs())
    }
}
