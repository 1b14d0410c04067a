//! Temporary-file creation and cleanup for file reconstruction.
//!
//! Each file is rebuilt into a hidden sibling named `.<file>.XXXXXX` and
//! renamed over the destination only after its digest verifies. The
//! [`TempGuard`] removes the partial file on every other exit path, panics
//! included.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const SUFFIX_LEN: usize = 6;
const MAX_ATTEMPTS: u32 = 100;

const SUFFIX_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Creates the temporary file for rebuilding `dest`.
///
/// The file is created with `O_EXCL` semantics; name collisions retry with a
/// fresh random suffix. Returns the open handle and the guard that owns the
/// path.
pub fn create_temp(dest: &Path) -> io::Result<(fs::File, TempGuard)> {
    let dir = dest.parent().unwrap_or(Path::new("."));
    let stem = hidden_stem(dest);

    for _ in 0..MAX_ATTEMPTS {
        let path = dir.join(format!("{stem}.{}", random_suffix()?));
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((file, TempGuard::new(path))),
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {}
            Err(error) => return Err(error),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!(
            "no unused temporary name for {} after {MAX_ATTEMPTS} attempts",
            dest.display()
        ),
    ))
}

/// Hidden-name stem for `dest`: a leading dot is added, and an existing
/// leading dot is consumed first so dotfiles do not gain a double dot.
fn hidden_stem(dest: &Path) -> String {
    let name = dest
        .file_name()
        .map_or_else(|| "rdsync".to_owned(), |n| n.to_string_lossy().into_owned());
    let name = name.strip_prefix('.').unwrap_or(&name);
    format!(".{name}")
}

fn random_suffix() -> io::Result<String> {
    let mut raw = [0u8; SUFFIX_LEN];
    getrandom::fill(&mut raw).map_err(io::Error::other)?;
    Ok(raw
        .iter()
        .map(|&b| SUFFIX_CHARS[b as usize % SUFFIX_CHARS.len()] as char)
        .collect())
}

/// Owns a temporary file path and removes the file on drop.
///
/// Call [`keep`](Self::keep) after the rename to the final destination; from
/// then on the drop is a no-op.
#[derive(Debug)]
pub struct TempGuard {
    path: PathBuf,
    keep: bool,
}

impl TempGuard {
    const fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    /// The temporary file's path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Disarms the guard; the file survives the drop.
    pub const fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if !self.keep {
            // Best effort: the file may already be gone.
            let _ = fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    #[test]
    fn temp_name_is_a_hidden_sibling() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("report.txt");
        let (_file, guard) = create_temp(&dest).unwrap();

        let name = guard.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".report.txt."));
        assert_eq!(name.len(), ".report.txt.".len() + SUFFIX_LEN);
        assert_eq!(guard.path().parent(), dest.parent());
    }

    #[test]
    fn dotfile_stem_does_not_double_the_dot() {
        assert_eq!(hidden_stem(Path::new("/x/.bashrc")), ".bashrc");
        assert_eq!(hidden_stem(Path::new("/x/plain")), ".plain");
    }

    #[test]
    fn dropped_guard_removes_the_file() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("f");
        let path = {
            let (_file, guard) = create_temp(&dest).unwrap();
            assert!(guard.path().exists());
            guard.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn kept_guard_leaves_the_file() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("f");
        let path = {
            let (_file, mut guard) = create_temp(&dest).unwrap();
            guard.keep();
            guard.path().to_path_buf()
        };
        assert!(path.exists());
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn concurrent_temps_get_distinct_names() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("same");
        let (_a, guard_a) = create_temp(&dest).unwrap();
        let (_b, guard_b) = create_temp(&dest).unwrap();
        assert_ne!(guard_a.path(), guard_b.path());
    }
}
