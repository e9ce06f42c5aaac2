//! Content-addressed backup engine.
//!
//! Backups are named by the SHA-256 of their content, so bitwise-identical
//! snapshots collapse into a single file. Re-observing known content only
//! refreshes the backup's mtime, which lets pruning operate on recency of
//! relevance instead of age since creation: a snapshot that keeps recurring
//! never ages out.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::paths::PROFILE_EXT;
use crate::storage::{Storage, StorageError};

/// Injectable clock so dedup timestamps and prune cutoffs are testable.
pub type Clock = Arc<dyn Fn() -> SystemTime + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(SystemTime::now)
}

/// Content identity of a file.
///
/// `Empty` is a reserved sentinel distinct from any real digest: a
/// zero-length settings file is still worth backing up before a
/// destructive overwrite (it is usually the result of accidental
/// truncation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    /// The file does not exist; nothing to back up.
    Absent,
    /// The file exists but is zero bytes long.
    Empty,
    /// Hex-encoded SHA-256 of the file content.
    Digest(String),
}

impl Fingerprint {
    /// Backup file name for this fingerprint, or `None` when there is
    /// nothing to store.
    pub fn backup_file_name(&self) -> Option<String> {
        match self {
            Self::Absent => None,
            Self::Empty => Some(format!("empty.{PROFILE_EXT}")),
            Self::Digest(hex) => Some(format!("{hex}.{PROFILE_EXT}")),
        }
    }
}

/// Manages the deduplicated backup directory.
pub struct BackupEngine {
    storage: Storage,
    backup_dir: PathBuf,
    clock: Clock,
}

impl BackupEngine {
    pub fn new(storage: Storage, backup_dir: PathBuf) -> Self {
        Self::with_clock(storage, backup_dir, system_clock())
    }

    pub fn with_clock(storage: Storage, backup_dir: PathBuf, clock: Clock) -> Self {
        Self {
            storage,
            backup_dir,
            clock,
        }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Compute the content fingerprint of `path`.
    ///
    /// A missing file yields [`Fingerprint::Absent`] rather than an error.
    /// A zero-length file yields the [`Fingerprint::Empty`] sentinel and a
    /// warning, instead of being silently skipped.
    pub fn fingerprint(&self, path: &Path) -> Result<Fingerprint, StorageError> {
        self.storage.validate_path_safety(path)?;

        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Fingerprint::Absent),
            Err(e) => return Err(StorageError::io("stat", path, e)),
        };
        if meta.len() == 0 {
            warn!(path = %path.display(), "zero-length file observed while fingerprinting");
            return Ok(Fingerprint::Empty);
        }

        let mut file = File::open(path).map_err(|e| StorageError::io("open source", path, e))?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher).map_err(|e| StorageError::io("hash file", path, e))?;

        let digest = hasher.finalize();
        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(&mut hex, "{byte:02x}");
        }
        Ok(Fingerprint::Digest(hex))
    }

    /// Back up `path` into the content-addressed directory.
    ///
    /// A missing source is a no-op. If a backup with the same fingerprint
    /// already exists, only its mtime is refreshed; no bytes are rewritten.
    pub fn backup(&self, path: &Path) -> Result<(), StorageError> {
        let fingerprint = self.fingerprint(path)?;
        let Some(file_name) = fingerprint.backup_file_name() else {
            return Ok(());
        };
        let backup_path = self.backup_dir.join(&file_name);
        let now = (self.clock)();

        match fs::metadata(&backup_path) {
            Ok(_) => {
                // Dedup hit: identical content already stored.
                self.storage.set_mtime(&backup_path, now)?;
                debug!(
                    source = %path.display(),
                    backup = %backup_path.display(),
                    "backup already exists, refreshed timestamp"
                );
                return Ok(());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::io("stat", &backup_path, e)),
        }

        let data =
            fs::read(path).map_err(|e| StorageError::io("read source for backup", path, e))?;
        self.storage.write_file(&backup_path, &data)?;
        self.storage.set_mtime(&backup_path, now)?;
        info!(
            source = %path.display(),
            backup = %backup_path.display(),
            "backup created"
        );
        Ok(())
    }

    /// Delete backups whose mtime is strictly before `now - older_than`.
    ///
    /// Subdirectories are skipped. Returns the number of files deleted.
    pub fn prune(&self, older_than: Duration) -> Result<usize, StorageError> {
        let cutoff = (self.clock)()
            .checked_sub(older_than)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let entries = fs::read_dir(&self.backup_dir)
            .map_err(|e| StorageError::io("read backup directory", &self.backup_dir, e))?;

        let mut deleted = 0;
        for entry in entries {
            let entry = entry
                .map_err(|e| StorageError::io("read backup directory", &self.backup_dir, e))?;
            let path = entry.path();
            let meta = entry
                .metadata()
                .map_err(|e| StorageError::io("stat", &path, e))?;
            if meta.is_dir() {
                continue;
            }
            let modified = meta
                .modified()
                .map_err(|e| StorageError::io("stat", &path, e))?;
            if modified < cutoff {
                fs::remove_file(&path)
                    .map_err(|e| StorageError::io("delete backup", &path, e))?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);
    const HOUR: Duration = Duration::from_secs(60 * 60);

    fn fixed_clock(t: SystemTime) -> Clock {
        Arc::new(move || t)
    }

    fn engine_at(temp_dir: &TempDir, t: SystemTime) -> BackupEngine {
        let dir = temp_dir.path().join("backups");
        let storage = Storage::new();
        storage.ensure_dir(&dir).unwrap();
        BackupEngine::with_clock(storage, dir, fixed_clock(t))
    }

    fn backup_files(engine: &BackupEngine) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(engine.backup_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("settings.json");
        fs::write(&file, "{\"model\":\"opus\"}").unwrap();

        let engine = engine_at(&temp_dir, SystemTime::now());
        let first = engine.fingerprint(&file).unwrap();
        let second = engine.fingerprint(&file).unwrap();
        assert_eq!(first, second);
        assert!(matches!(first, Fingerprint::Digest(_)));
    }

    #[test]
    fn test_fingerprint_absent_and_empty() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine_at(&temp_dir, SystemTime::now());

        let missing = temp_dir.path().join("missing.json");
        assert_eq!(engine.fingerprint(&missing).unwrap(), Fingerprint::Absent);

        let empty = temp_dir.path().join("empty.json");
        fs::write(&empty, "").unwrap();
        assert_eq!(engine.fingerprint(&empty).unwrap(), Fingerprint::Empty);
    }

    #[test]
    fn test_backup_missing_file_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine_at(&temp_dir, SystemTime::now());
        engine.backup(&temp_dir.path().join("missing.json")).unwrap();
        assert!(backup_files(&engine).is_empty());
    }

    #[test]
    fn test_backup_deduplicates_and_refreshes_mtime() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("settings.json");
        fs::write(&file, "same content").unwrap();

        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let t1 = t0 + HOUR;

        let first = engine_at(&temp_dir, t0);
        first.backup(&file).unwrap();
        let names = backup_files(&first);
        assert_eq!(names.len(), 1);
        let backup_path = first.backup_dir().join(&names[0]);
        assert_eq!(fs::metadata(&backup_path).unwrap().modified().unwrap(), t0);

        // Second observation of identical content: still one file, newer mtime.
        let second = BackupEngine::with_clock(
            Storage::new(),
            first.backup_dir().to_path_buf(),
            fixed_clock(t1),
        );
        second.backup(&file).unwrap();
        assert_eq!(backup_files(&second).len(), 1);
        assert_eq!(fs::metadata(&backup_path).unwrap().modified().unwrap(), t1);
    }

    #[test]
    fn test_backup_distinct_content_gets_distinct_files() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine_at(&temp_dir, SystemTime::now());

        let a = temp_dir.path().join("a.json");
        let b = temp_dir.path().join("b.json");
        fs::write(&a, "content A").unwrap();
        fs::write(&b, "content B").unwrap();

        engine.backup(&a).unwrap();
        engine.backup(&b).unwrap();
        assert_eq!(backup_files(&engine).len(), 2);
    }

    #[test]
    fn test_backup_empty_file_uses_sentinel_name() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine_at(&temp_dir, SystemTime::now());

        let empty = temp_dir.path().join("truncated.json");
        fs::write(&empty, "").unwrap();
        engine.backup(&empty).unwrap();
        assert_eq!(backup_files(&engine), vec!["empty.json".to_string()]);
    }

    #[test]
    fn test_prune_boundary() {
        let temp_dir = TempDir::new().unwrap();
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        let stale_file = temp_dir.path().join("stale.json");
        let fresh_file = temp_dir.path().join("fresh.json");
        fs::write(&stale_file, "stale").unwrap();
        fs::write(&fresh_file, "fresh").unwrap();

        // One backup last observed 48h ago, one 1h ago.
        engine_at(&temp_dir, now - 2 * DAY).backup(&stale_file).unwrap();
        let engine = engine_at(&temp_dir, now - HOUR);
        engine.backup(&fresh_file).unwrap();

        let pruner = BackupEngine::with_clock(
            Storage::new(),
            engine.backup_dir().to_path_buf(),
            fixed_clock(now),
        );
        assert_eq!(pruner.prune(DAY).unwrap(), 1);

        let remaining = backup_files(&pruner);
        assert_eq!(remaining.len(), 1);
        let kept = pruner.backup_dir().join(&remaining[0]);
        assert_eq!(fs::read_to_string(kept).unwrap(), "fresh");
    }

    #[test]
    fn test_prune_skips_subdirectories() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine_at(&temp_dir, SystemTime::now());
        fs::create_dir(engine.backup_dir().join("nested")).unwrap();
        assert_eq!(engine.prune(Duration::ZERO).unwrap(), 0);
        assert!(engine.backup_dir().join("nested").exists());
    }
}
