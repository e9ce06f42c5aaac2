//! Low-level file primitives with security guarantees.
//!
//! Every destination write goes through a temp-file-then-rename sequence so
//! the destination always holds either its old content in full or its new
//! content in full. Paths are checked against symlink substitution before
//! they are touched, and everything this module creates is owner-only
//! (0700 directories, 0600 files) because stored settings may contain
//! credentials.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use thiserror::Error;

/// Errors from the storage layer. `Io` names the operation that failed so
/// a multi-step sequence stays diagnosable.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("refusing to operate on symlink: {}", path.display())]
    SymlinkRefused { path: PathBuf },

    #[error("{op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// True if the underlying failure was a missing file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Optional capability: detect whether a path is a symbolic link.
///
/// Filesystems without an lstat-style primitive can plug in
/// [`NoSymlinkCheck`], which reports every path as safe. That is a
/// documented gap, not a failure.
pub trait SymlinkCheck: Send + Sync {
    fn is_symlink(&self, path: &Path) -> Result<bool, StorageError>;
}

/// "No protection available" fallback.
pub struct NoSymlinkCheck;

impl SymlinkCheck for NoSymlinkCheck {
    fn is_symlink(&self, _path: &Path) -> Result<bool, StorageError> {
        Ok(false)
    }
}

/// Symlink detection via `lstat` (does not follow links).
pub struct OsSymlinkCheck;

impl SymlinkCheck for OsSymlinkCheck {
    fn is_symlink(&self, path: &Path) -> Result<bool, StorageError> {
        match fs::symlink_metadata(path) {
            Ok(meta) => Ok(meta.file_type().is_symlink()),
            // A path that doesn't exist yet is safe to write to.
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io("stat", path, e)),
        }
    }
}

/// File primitives shared by the backup engine and the profile store.
#[derive(Clone)]
pub struct Storage {
    links: Arc<dyn SymlinkCheck>,
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage {
    pub fn new() -> Self {
        Self {
            links: Arc::new(OsSymlinkCheck),
        }
    }

    pub fn with_symlink_check(links: Arc<dyn SymlinkCheck>) -> Self {
        Self { links }
    }

    /// Refuse to touch a path that has been replaced with a symbolic link.
    ///
    /// Non-existent paths and existing regular files/directories are safe.
    pub fn validate_path_safety(&self, path: &Path) -> Result<(), StorageError> {
        if self.links.is_symlink(path)? {
            return Err(StorageError::SymlinkRefused {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Copy `src` onto `dst`, atomically replacing any existing file.
    ///
    /// The content is written to a temp file in `dst`'s directory (same
    /// filesystem, so the final rename is atomic) and renamed over the
    /// destination in one step. At no instant does `dst` hold partial
    /// content or go missing. The temp file is removed on every failure
    /// path.
    pub fn copy_file(&self, src: &Path, dst: &Path) -> Result<(), StorageError> {
        self.validate_path_safety(src)?;
        self.validate_path_safety(dst)?;

        let mut source = File::open(src).map_err(|e| StorageError::io("open source", src, e))?;

        if let Some(parent) = dst.parent() {
            self.ensure_dir(parent)?;
        }

        let tmp = tmp_path(dst);
        let mut dest = open_owner_only(&tmp)
            .map_err(|e| StorageError::io("create temp file", &tmp, e))?;

        let written = io::copy(&mut source, &mut dest).and_then(|_| dest.sync_all());
        drop(dest);
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(StorageError::io("write temp file", &tmp, e));
        }

        if let Err(e) = fs::rename(&tmp, dst) {
            let _ = fs::remove_file(&tmp);
            return Err(StorageError::io("atomic rename", dst, e));
        }
        Ok(())
    }

    /// Atomically write `data` to `path` with owner-only permissions.
    ///
    /// Same temp-file-then-rename discipline as [`Storage::copy_file`].
    pub fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), StorageError> {
        self.validate_path_safety(path)?;

        if let Some(parent) = path.parent() {
            self.ensure_dir(parent)?;
        }

        let tmp = tmp_path(path);
        let result = open_owner_only(&tmp).and_then(|mut f| {
            use io::Write;
            f.write_all(data)?;
            f.sync_all()
        });
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp);
            return Err(StorageError::io("write temp file", &tmp, e));
        }

        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(StorageError::io("atomic rename", path, e));
        }
        Ok(())
    }

    /// Create a directory (and parents) with owner-only permissions.
    pub fn ensure_dir(&self, path: &Path) -> Result<(), StorageError> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder
            .create(path)
            .map_err(|e| StorageError::io("create directory", path, e))
    }

    /// Set a file's modification time. Used by the backup engine to record
    /// "last time this content was observed".
    pub fn set_mtime(&self, path: &Path, mtime: SystemTime) -> Result<(), StorageError> {
        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| StorageError::io("open for mtime update", path, e))?;
        file.set_modified(mtime)
            .map_err(|e| StorageError::io("set mtime", path, e))
    }
}

/// Status of the live settings file, for display purposes.
#[derive(Debug)]
pub enum LiveFileStatus {
    Missing,
    RegularFile,
    Symlink { target: PathBuf },
}

impl LiveFileStatus {
    pub fn detect(path: &Path) -> Self {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.file_type().is_symlink() => {
                let target = fs::read_link(path).unwrap_or_else(|_| PathBuf::from("?"));
                Self::Symlink { target }
            }
            Ok(_) => Self::RegularFile,
            Err(_) => Self::Missing,
        }
    }
}

fn tmp_path(dst: &Path) -> PathBuf {
    let mut name = dst.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn open_owner_only(path: &Path) -> io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    opts.open(path)
}
