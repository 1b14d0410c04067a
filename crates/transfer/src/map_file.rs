//! Read-only whole-file views.
//!
//! Signature generation and delta matching both want the file as one
//! contiguous byte slice. On Unix the file is memory-mapped; elsewhere, or
//! when mapping fails, it is read into a heap buffer. Empty files never touch
//! the mapping path since `mmap` rejects zero-length ranges.
//!
//! The mapped file must not be truncated or rewritten while the view is
//! alive; callers hold the view only for the duration of one file's transfer.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

#[derive(Debug)]
enum MapInner {
    #[cfg(unix)]
    Mapped(memmap2::Mmap),
    Buffered(Vec<u8>),
    Empty,
}

/// A read-only view of one file's entire contents.
#[derive(Debug)]
pub struct MapFile {
    inner: MapInner,
}

impl MapFile {
    /// Opens and maps the file at `path`.
    ///
    /// Returns `Ok(None)` when the file does not exist, which the callers
    /// treat as "no basis"; any other error is propagated.
    pub fn open(path: &Path) -> io::Result<Option<Self>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error),
        };
        Self::from_file(&file).map(Some)
    }

    /// Maps an already-open file.
    pub fn from_file(file: &File) -> io::Result<Self> {
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(Self {
                inner: MapInner::Empty,
            });
        }
        Ok(Self {
            inner: map_or_read(file)?,
        })
    }

    /// The file contents as one contiguous slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        match &self.inner {
            #[cfg(unix)]
            MapInner::Mapped(map) => map,
            MapInner::Buffered(buf) => buf,
            MapInner::Empty => &[],
        }
    }

    /// Length of the viewed file in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    /// Reports whether the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn map_or_read(file: &File) -> io::Result<MapInner> {
    // Mapping can fail on filesystems without mmap support; fall back to a
    // plain read rather than failing the file.
    // SAFETY: the map is read-only and dropped before the transfer of this
    // file completes; concurrent truncation is excluded by the caller.
    match unsafe { memmap2::Mmap::map(file) } {
        Ok(map) => Ok(MapInner::Mapped(map)),
        Err(_) => read_to_buffer(file),
    }
}

#[cfg(not(unix))]
fn map_or_read(file: &File) -> io::Result<MapInner> {
    read_to_buffer(file)
}

fn read_to_buffer(mut file: &File) -> io::Result<MapInner> {
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(MapInner::Buffered(buf))
}
